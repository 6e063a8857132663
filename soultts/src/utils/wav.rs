use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

/// Mono 32-bit IEEE float, the format generated audio is served in.
pub fn float_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Writes mono samples as a float WAV to any seekable writer.
pub fn write_wav<W: Write + Seek>(
    writer: W,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let mut writer = hound::WavWriter::new(writer, float_spec(sample_rate))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

/// Encodes mono samples as an in-memory WAV file.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 4));
    write_wav(&mut cursor, samples, sample_rate)?;
    Ok(cursor.into_inner())
}

pub fn write_wav_file<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    // Ensure parent directory exists
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_wav(file, samples, sample_rate)
}

/// Decodes a WAV stream into mono f32 samples and its sample rate.
///
/// Integer formats are scaled to [-1, 1]; multi-channel audio is averaged
/// down to one channel.
pub fn read_wav_mono<R: Read>(reader: R) -> Result<(Vec<f32>, u32), hound::Error> {
    let mut reader = hound::WavReader::new(reader)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

pub fn read_wav_file<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32), hound::Error> {
    let file = std::io::BufReader::new(std::fs::File::open(path)?);
    read_wav_mono(file)
}

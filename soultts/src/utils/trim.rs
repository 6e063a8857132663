//! Trailing-silence trimming for generated speech.
//!
//! Loudness is estimated with the RMS of fixed-size windows, scanning from
//! the end of the buffer toward the start. Once the last loud window is
//! found, everything after it is dropped except a short pad, but only when
//! the silent tail is longer than a configured minimum.

use serde::{Deserialize, Serialize};

use crate::error::TrimError;

/// Configuration for trailing-silence trimming
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimOptions {
    /// Windows whose RMS does not exceed this level (dBFS) count as silent
    pub threshold_db: f32,
    /// Trailing silence must be longer than this before anything is cut
    pub min_silence_ms: u32,
    /// Length of one RMS window
    pub window_ms: u32,
    /// Audio kept after the end of the last loud window
    pub pad_ms: u32,
}

impl Default for TrimOptions {
    fn default() -> Self {
        TrimOptions {
            threshold_db: -40.0,
            min_silence_ms: 200,
            window_ms: 20,
            pad_ms: 100,
        }
    }
}

impl TrimOptions {
    /// Linear amplitude equivalent of `threshold_db`
    pub fn threshold_amplitude(&self) -> f32 {
        10f32.powf(self.threshold_db / 20.0)
    }
}

/// Returns the trimmed prefix of `audio`.
///
/// The input is never modified; the result borrows from it and is either
/// the whole buffer or a strictly shorter prefix.
pub fn trim_trailing_silence<'a>(
    audio: &'a [f32],
    sample_rate: u32,
    opts: &TrimOptions,
) -> Result<&'a [f32], TrimError> {
    let new_len = trimmed_len(audio, sample_rate, opts)?;
    if new_len < audio.len() {
        log_trim(audio.len(), new_len, sample_rate);
    }
    Ok(&audio[..new_len])
}

/// Same as [`trim_trailing_silence`] but truncates an owned buffer.
pub fn trim_in_place(
    audio: &mut Vec<f32>,
    sample_rate: u32,
    opts: &TrimOptions,
) -> Result<usize, TrimError> {
    let original_len = audio.len();
    let new_len = trimmed_len(audio, sample_rate, opts)?;
    if new_len < original_len {
        audio.truncate(new_len);
        log_trim(original_len, new_len, sample_rate);
    }
    Ok(original_len - new_len)
}

/// Computes the length `audio` should be cut to.
///
/// An empty buffer is always returned as is. When no window is louder than
/// the threshold the whole buffer is treated as silence and, if that is
/// longer than the minimum, only the pad survives.
///
/// A trimmed result ends on the same window grid as its input, so trimming
/// it again removes nothing.
///
/// NaN samples make their window compare as silent; run [`ensure_finite`]
/// first when the source is not trusted.
pub fn trimmed_len(audio: &[f32], sample_rate: u32, opts: &TrimOptions) -> Result<usize, TrimError> {
    if audio.is_empty() {
        return Ok(0);
    }
    if sample_rate == 0 {
        return Err(TrimError::InvalidArgument(
            "sample rate must be positive".to_string(),
        ));
    }

    let window_size = ms_to_samples(sample_rate, opts.window_ms);
    if window_size == 0 {
        return Err(TrimError::InvalidArgument(format!(
            "{} ms window holds no samples at {} Hz",
            opts.window_ms, sample_rate
        )));
    }

    if !opts.threshold_db.is_finite() {
        return Err(TrimError::InvalidArgument(format!(
            "threshold of {} dB is not a finite level",
            opts.threshold_db
        )));
    }
    let threshold = opts.threshold_amplitude();

    // Windows start at index 0 so any trimmed prefix keeps the same grid;
    // only the last one may be short.
    let last_sound = audio
        .chunks(window_size)
        .enumerate()
        .rev()
        .find(|(_, window)| calculate_rms(window) > threshold)
        .map(|(k, window)| k * window_size + window.len())
        .unwrap_or(0);

    let silence_samples = audio.len() - last_sound;
    if silence_samples <= ms_to_samples(sample_rate, opts.min_silence_ms) {
        return Ok(audio.len());
    }

    let pad = ms_to_samples(sample_rate, opts.pad_ms);
    Ok((last_sound + pad).min(audio.len()))
}

/// Rejects buffers containing NaN or infinite samples
pub fn ensure_finite(audio: &[f32]) -> Result<(), TrimError> {
    match audio.iter().position(|s| !s.is_finite()) {
        Some(index) => Err(TrimError::NonFiniteSample { index }),
        None => Ok(()),
    }
}

/// Root mean square of a window of samples
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

fn ms_to_samples(sample_rate: u32, ms: u32) -> usize {
    (f64::from(sample_rate) * f64::from(ms) / 1000.0).round() as usize
}

fn log_trim(original_len: usize, new_len: usize, sample_rate: u32) {
    let sr = f64::from(sample_rate);
    let original_secs = original_len as f64 / sr;
    let new_secs = new_len as f64 / sr;
    tracing::info!(
        trimmed_secs = original_secs - new_secs,
        original_secs,
        new_secs,
        "Trimmed {:.1}s trailing silence ({:.1}s -> {:.1}s)",
        original_secs - new_secs,
        original_secs,
        new_secs
    );
}

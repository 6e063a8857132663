use std::path::{Path, PathBuf};

use crate::error::{SynthesisError, TrimError};
use crate::utils::wav;

/// Longer references slow generation down without improving the clone.
pub const MAX_REFERENCE_SECS: u32 = 10;

/// Voice sample the model imitates, kept in memory for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    source: Option<PathBuf>,
}

impl ReferenceAudio {
    /// Load a WAV file, downmix it to mono and clip it to
    /// [`MAX_REFERENCE_SECS`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SynthesisError> {
        let path = path.as_ref();
        let (samples, sample_rate) = wav::read_wav_file(path)?;
        let mut reference = Self::from_samples(samples, sample_rate)?;
        reference.source = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            sample_rate,
            samples = reference.samples.len(),
            "Ref audio: {}Hz, {} samples ({:.1}s)",
            sample_rate,
            reference.samples.len(),
            reference.duration_secs()
        );
        Ok(reference)
    }

    pub fn from_samples(mut samples: Vec<f32>, sample_rate: u32) -> Result<Self, SynthesisError> {
        if sample_rate == 0 {
            return Err(TrimError::InvalidArgument(
                "reference sample rate must be positive".to_string(),
            )
            .into());
        }
        if samples.is_empty() {
            return Err(SynthesisError::EmptyReference);
        }

        let max_samples = MAX_REFERENCE_SECS as usize * sample_rate as usize;
        if samples.len() > max_samples {
            tracing::debug!(
                from = samples.len(),
                to = max_samples,
                "clipping reference audio"
            );
            samples.truncate(max_samples);
        }

        Ok(Self {
            samples,
            sample_rate,
            source: None,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// File the audio was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{SynthesisError, TrimError};
use crate::tts::reference::ReferenceAudio;
use crate::tts::voice_clone::{Generation, GenerationParams, VoiceCloneModel, VoiceCloneRequest};
use crate::utils::trim::{ensure_finite, trim_in_place, TrimOptions};
use crate::utils::wav::encode_wav;

/// Text used by [`SynthesisContext::probe_consistency`] when none is given.
pub const DEFAULT_PROBE_TEXT: &str = "테스트";

/// Request-handling state: the loaded model, the voice it clones and the
/// transcript of that voice sample.
///
/// Built once at startup and shared by reference; nothing in it changes
/// after construction.
pub struct SynthesisContext {
    model: Arc<dyn VoiceCloneModel>,
    reference: ReferenceAudio,
    ref_text: String,
    params: GenerationParams,
    trim: TrimOptions,
}

/// A finished request: trimmed audio plus its WAV encoding.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub audio: Vec<f32>,
    pub sample_rate: u32,
    pub wav: Vec<u8>,
    /// Samples removed as trailing silence
    pub trimmed_samples: usize,
    pub elapsed: Duration,
}

impl Synthesis {
    pub fn duration_secs(&self) -> f32 {
        self.audio.len() as f32 / self.sample_rate as f32
    }

    /// Seconds of audio produced per second of generation
    pub fn real_time_factor(&self) -> f32 {
        let elapsed = self.elapsed.as_secs_f32();
        if elapsed > 0.0 {
            self.duration_secs() / elapsed
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRun {
    pub run: usize,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProbeOutcome {
    Completed {
        samples: usize,
        duration: f64,
        wavs: usize,
    },
    Failed {
        error: String,
    },
}

impl SynthesisContext {
    pub fn new(
        model: Arc<dyn VoiceCloneModel>,
        reference: ReferenceAudio,
        ref_text: impl Into<String>,
    ) -> Self {
        Self {
            model,
            reference,
            ref_text: ref_text.into(),
            params: GenerationParams::default(),
            trim: TrimOptions::default(),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_trim(mut self, trim: TrimOptions) -> Self {
        self.trim = trim;
        self
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn reference(&self) -> &ReferenceAudio {
        &self.reference
    }

    pub fn ref_text(&self) -> &str {
        &self.ref_text
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn trim_options(&self) -> &TrimOptions {
        &self.trim
    }

    /// Text to WAV: generate, join segments, trim trailing silence, encode.
    pub fn synthesize(&self, text: &str) -> Result<Synthesis, SynthesisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let start_t = Instant::now();
        tracing::info!("Generating: '{}'", preview(text));

        let generation = self.generate(text)?;
        let sample_rate = generation.sample_rate;
        tracing::debug!(wavs = generation.wavs.len(), "generation done");

        let mut audio = generation
            .into_audio()
            .filter(|audio| !audio.is_empty())
            .ok_or(SynthesisError::NoResult)?;

        if sample_rate == 0 {
            return Err(TrimError::InvalidArgument(
                "model reported a zero sample rate".to_string(),
            )
            .into());
        }
        ensure_finite(&audio)?;

        let trimmed_samples = trim_in_place(&mut audio, sample_rate, &self.trim)?;
        let wav = encode_wav(&audio, sample_rate)?;

        let synthesis = Synthesis {
            audio,
            sample_rate,
            wav,
            trimmed_samples,
            elapsed: start_t.elapsed(),
        };

        tracing::info!(
            "\"{}\" -> {:.1}s audio, {:.1}s gen, RTF={:.2}x",
            preview(text),
            synthesis.duration_secs(),
            synthesis.elapsed.as_secs_f32(),
            synthesis.real_time_factor()
        );
        Ok(synthesis)
    }

    /// Generates the same text `runs` times and reports the raw output size
    /// of each run, to check how stable the model's output length is.
    pub fn probe_consistency(&self, text: &str, runs: usize) -> Vec<ProbeRun> {
        let text = match text.trim() {
            "" => DEFAULT_PROBE_TEXT,
            t => t,
        };

        (1..=runs)
            .map(|run| {
                let outcome = match self.generate(text) {
                    Ok(generation) => {
                        let samples = generation.total_samples();
                        let duration = if generation.sample_rate > 0 {
                            samples as f64 / f64::from(generation.sample_rate)
                        } else {
                            0.0
                        };
                        ProbeOutcome::Completed {
                            samples,
                            duration: (duration * 100.0).round() / 100.0,
                            wavs: generation.wavs.len(),
                        }
                    }
                    Err(e) => {
                        tracing::warn!(run, error = %e, "probe run failed");
                        ProbeOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                ProbeRun { run, outcome }
            })
            .collect()
    }

    fn generate(&self, text: &str) -> Result<Generation, SynthesisError> {
        let request = VoiceCloneRequest {
            text,
            reference: &self.reference,
            ref_text: &self.ref_text,
            params: &self.params,
        };
        self.model
            .generate_voice_clone(&request)
            .map_err(SynthesisError::Model)
    }
}

impl fmt::Debug for SynthesisContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisContext")
            .field("model", &self.model.model_id())
            .field("reference", &self.reference.source())
            .field("ref_text", &self.ref_text)
            .field("params", &self.params)
            .field("trim", &self.trim)
            .finish()
    }
}

fn preview(text: &str) -> String {
    text.chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    struct FnModel<F>(F);

    impl<F> VoiceCloneModel for FnModel<F>
    where
        F: Fn(&VoiceCloneRequest<'_>) -> Result<Generation, ModelError> + Send + Sync,
    {
        fn model_id(&self) -> &str {
            "test-model"
        }

        fn generate_voice_clone(
            &self,
            request: &VoiceCloneRequest<'_>,
        ) -> Result<Generation, ModelError> {
            (self.0)(request)
        }
    }

    fn context<F>(f: F) -> SynthesisContext
    where
        F: Fn(&VoiceCloneRequest<'_>) -> Result<Generation, ModelError> + Send + Sync + 'static,
    {
        let reference = ReferenceAudio::from_samples(vec![0.1; 16_000], 16_000).unwrap();
        SynthesisContext::new(Arc::new(FnModel(f)), reference, "안녕")
    }

    fn speech_then_silence() -> Generation {
        let mut audio = vec![0.5f32; 16_000];
        audio.extend(vec![0.0f32; 16_000]);
        Generation {
            wavs: vec![audio],
            sample_rate: 16_000,
        }
    }

    #[test]
    fn test_context_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SynthesisContext>();
    }

    #[test]
    fn test_synthesize_trims_and_encodes() {
        let ctx = context(|_| Ok(speech_then_silence()));
        let synthesis = ctx.synthesize("  안녕하세요  ").unwrap();

        assert_eq!(synthesis.audio.len(), 17_600);
        assert_eq!(synthesis.trimmed_samples, 32_000 - 17_600);
        assert_eq!(synthesis.sample_rate, 16_000);
        assert_eq!(&synthesis.wav[0..4], b"RIFF");
        let (decoded, sr) =
            crate::utils::wav::read_wav_mono(std::io::Cursor::new(&synthesis.wav)).unwrap();
        assert_eq!(sr, 16_000);
        assert_eq!(decoded, synthesis.audio);
        assert!((synthesis.duration_secs() - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_request_carries_reference_and_params() {
        let ctx = context(|request| {
            assert_eq!(request.text, "hello");
            assert_eq!(request.ref_text, "안녕");
            assert_eq!(request.reference.sample_rate(), 16_000);
            assert_eq!(request.params.language, "English");
            Ok(Generation {
                wavs: vec![vec![0.5; 100]],
                sample_rate: 24_000,
            })
        })
        .with_params(GenerationParams {
            language: "English".to_string(),
            ..GenerationParams::default()
        });

        let synthesis = ctx.synthesize("hello").unwrap();
        assert_eq!(synthesis.audio.len(), 100);
        assert_eq!(synthesis.trimmed_samples, 0);
    }

    #[test]
    fn test_segments_are_joined_before_trimming() {
        let ctx = context(|_| {
            Ok(Generation {
                wavs: vec![vec![0.5; 8_000], vec![0.5; 8_000], vec![0.0; 16_000]],
                sample_rate: 16_000,
            })
        });
        let synthesis = ctx.synthesize("text").unwrap();
        assert_eq!(synthesis.audio.len(), 17_600);
    }

    #[test]
    fn test_custom_trim_options() {
        let ctx = context(|_| Ok(speech_then_silence())).with_trim(TrimOptions {
            min_silence_ms: 2_000,
            ..TrimOptions::default()
        });
        let synthesis = ctx.synthesize("text").unwrap();
        assert_eq!(synthesis.audio.len(), 32_000);
        assert_eq!(synthesis.trimmed_samples, 0);
    }

    #[test]
    fn test_empty_text() {
        let ctx = context(|_| panic!("model must not be called"));
        assert!(matches!(ctx.synthesize("   "), Err(SynthesisError::EmptyText)));
    }

    #[test]
    fn test_no_result() {
        let ctx = context(|_| {
            Ok(Generation {
                wavs: Vec::new(),
                sample_rate: 16_000,
            })
        });
        assert!(matches!(ctx.synthesize("text"), Err(SynthesisError::NoResult)));

        let ctx = context(|_| {
            Ok(Generation {
                wavs: vec![Vec::new()],
                sample_rate: 16_000,
            })
        });
        assert!(matches!(ctx.synthesize("text"), Err(SynthesisError::NoResult)));
    }

    #[test]
    fn test_model_failure() {
        let ctx = context(|_| Err("out of memory".into()));
        let err = ctx.synthesize("text").unwrap_err();
        assert!(matches!(err, SynthesisError::Model(_)));
        assert_eq!(err.to_string(), "out of memory");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_non_finite_output_is_rejected() {
        let ctx = context(|_| {
            Ok(Generation {
                wavs: vec![vec![0.5, f32::NAN]],
                sample_rate: 16_000,
            })
        });
        assert!(matches!(
            ctx.synthesize("text"),
            Err(SynthesisError::Trim(TrimError::NonFiniteSample { index: 1 }))
        ));
    }

    #[test]
    fn test_zero_sample_rate_is_rejected() {
        let ctx = context(|_| {
            Ok(Generation {
                wavs: vec![vec![0.5; 10]],
                sample_rate: 0,
            })
        });
        assert!(matches!(
            ctx.synthesize("text"),
            Err(SynthesisError::Trim(TrimError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_probe_reports_each_run() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = AtomicUsize::new(0);
        let ctx = context(move |request| {
            assert_eq!(request.text, DEFAULT_PROBE_TEXT);
            match calls.fetch_add(1, Ordering::SeqCst) {
                1 => Err("cuda error".into()),
                _ => Ok(Generation {
                    wavs: vec![vec![0.0; 12_000], vec![0.0; 12_345]],
                    sample_rate: 24_000,
                }),
            }
        });

        let runs = ctx.probe_consistency("", 3);
        assert_eq!(runs.len(), 3);
        assert_eq!(
            runs[0].outcome,
            ProbeOutcome::Completed {
                samples: 24_345,
                duration: 1.01,
                wavs: 2
            }
        );
        assert_eq!(
            runs[1].outcome,
            ProbeOutcome::Failed {
                error: "cuda error".to_string()
            }
        );
        assert_eq!(runs[2].run, 3);

        let json = serde_json::to_value(&runs).unwrap();
        assert_eq!(json[0]["run"], 1);
        assert_eq!(json[0]["samples"], 24_345);
        assert_eq!(json[1]["error"], "cuda error");
    }

    #[test]
    fn test_debug_shows_model_id() {
        let ctx = context(|_| Ok(speech_then_silence()));
        assert_eq!(ctx.model_id(), "test-model");
        assert!(format!("{ctx:?}").contains("test-model"));
    }
}

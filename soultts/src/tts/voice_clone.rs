use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::tts::reference::ReferenceAudio;

/// Sampling parameters handed to the model on every request.
///
/// The `subtalker_*` fields drive the secondary codebook predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub language: String,
    pub max_new_tokens: usize,
    pub min_new_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: usize,
    pub repetition_penalty: f32,
    pub subtalker_temperature: f32,
    pub subtalker_top_p: f32,
    pub subtalker_top_k: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            language: "Korean".to_string(),
            max_new_tokens: 128,
            min_new_tokens: 20,
            temperature: 0.7,
            top_p: 0.8,
            top_k: 50,
            repetition_penalty: 1.2,
            subtalker_temperature: 0.7,
            subtalker_top_p: 0.8,
            subtalker_top_k: 50,
        }
    }
}

/// Everything a model needs to clone the reference voice for one text.
#[derive(Debug, Clone, Copy)]
pub struct VoiceCloneRequest<'a> {
    pub text: &'a str,
    pub reference: &'a ReferenceAudio,
    pub ref_text: &'a str,
    pub params: &'a GenerationParams,
}

/// Raw model output: one or more mono segments at a shared sample rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub wavs: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl Generation {
    pub fn total_samples(&self) -> usize {
        self.wavs.iter().map(Vec::len).sum()
    }

    /// Joins all segments in order, or `None` if there are none.
    pub fn into_audio(self) -> Option<Vec<f32>> {
        let mut wavs = self.wavs;
        match wavs.len() {
            0 => None,
            1 => wavs.pop(),
            _ => Some(wavs.concat()),
        }
    }
}

/// A pretrained voice-cloning model.
///
/// Implementations are loaded once and shared across requests, so they
/// must be usable from several threads at the same time.
pub trait VoiceCloneModel: Send + Sync {
    fn model_id(&self) -> &str;

    fn generate_voice_clone(&self, request: &VoiceCloneRequest<'_>)
        -> Result<Generation, ModelError>;
}

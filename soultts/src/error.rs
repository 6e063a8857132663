use std::error::Error;

/// Error type produced by a [`crate::tts::voice_clone::VoiceCloneModel`] backend.
pub type ModelError = Box<dyn Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TrimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("non-finite sample at index {index}")]
    NonFiniteSample { index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("text required")]
    EmptyText,

    #[error("reference audio is empty")]
    EmptyReference,

    /// The model returned without producing any audio segment.
    #[error("generation produced no result")]
    NoResult,

    #[error(transparent)]
    Model(ModelError),

    #[error(transparent)]
    Trim(#[from] TrimError),

    #[error(transparent)]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

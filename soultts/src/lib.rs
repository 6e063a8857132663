pub mod error;
pub mod tts;
pub mod utils;

// Re-export key functionality for easy access
pub use error::{ModelError, SynthesisError, TrimError};
pub use tts::context::{Synthesis, SynthesisContext};
pub use utils::trim::{trim_trailing_silence, TrimOptions};

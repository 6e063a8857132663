pub mod context;
pub mod reference;
pub mod voice_clone;

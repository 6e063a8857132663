pub mod trim;
pub mod wav;

pub mod media;

pub use media::{DestroyOutcome, MediaError, MediaStorage};

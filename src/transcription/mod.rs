pub mod client;
pub mod types;

pub use client::{TranscriptionEngine, WhisperHttpEngine};
pub use types::{EngineTranscription, Segment};

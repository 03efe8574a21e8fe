use serde::{Deserialize, Serialize};

/// Per-interval slice of the engine's verbose output. `id` is the sequence
/// index within one response; `start <= end`, both in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Decoded `verbose_json` response from the upstream engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineTranscription {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub language: String,
    pub duration: f64,
    pub text: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

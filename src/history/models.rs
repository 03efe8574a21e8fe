use serde::{Deserialize, Serialize};

/// One completed transcription, as persisted in the recent ledger and served
/// by `GET /recent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRecord {
    pub id: String,
    pub text: String,
    pub duration: f64,
    pub processing_time: f64,
    pub created_at: String,
}

impl TranscriptionRecord {
    pub fn text_preview(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing audio file")]
    MissingAudioFile,

    #[error("upload exceeds {limit_bytes} bytes")]
    PayloadTooLarge { limit_bytes: u64 },

    #[error("audio conversion failed: {0}")]
    AudioConversion(String),

    #[error("audio duration {duration:.1}s exceeds limit {limit:.1}s")]
    AudioTooLong { duration: f64, limit: f64 },

    #[error("upstream engine error: {0}")]
    Upstream(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingAudioFile
            | AppError::AudioConversion(_)
            | AppError::AudioTooLong { .. } => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message safe to hand to the caller. Internal detail stays in logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::MissingAudioFile => "missing audio file".to_owned(),
            AppError::PayloadTooLarge { limit_bytes } => {
                format!("file too large, max {limit_bytes} bytes")
            }
            AppError::AudioConversion(_) => "audio conversion failed".to_owned(),
            AppError::AudioTooLong { limit, .. } => {
                format!("audio too long, max {limit:.0} seconds")
            }
            AppError::Upstream(_) => "transcription failed".to_owned(),
            _ => "server error".to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

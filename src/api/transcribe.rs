use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::state::AppState;
use crate::error::{AppError, AppResult};
use crate::pipeline::TranscriptionOutcome;

pub async fn transcribe_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<TranscriptionOutcome>> {
    let started = Instant::now();
    let (upload_name, payload) = extract_audio_field(multipart, state.max_file_size_bytes).await?;

    tracing::debug!(
        bytes = payload.len(),
        file_name = upload_name.as_deref().unwrap_or("-"),
        "upload admitted"
    );

    // The job runs detached so a dropped connection or a gateway timeout
    // cannot cancel work already in flight.
    let pipeline = Arc::clone(&state.pipeline);
    let job = tokio::spawn(async move { pipeline.run(started, upload_name, payload).await });

    match job.await {
        Ok(outcome) => outcome.map(Json),
        Err(error) => {
            tracing::error!(%error, "transcription task aborted");
            Err(AppError::Internal("transcription task aborted".to_owned()))
        }
    }
}

/// Walks the form until the `file` field shows up; everything else is
/// ignored. No field at all reads as a missing upload.
async fn extract_audio_field(
    mut multipart: Multipart,
    limit_bytes: u64,
) -> AppResult<(Option<String>, Bytes)> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(AppError::MissingAudioFile),
            Err(error) => return Err(map_multipart_error(error, limit_bytes)),
        };

        if field.name() != Some("file") {
            continue;
        }

        let upload_name = field.file_name().map(str::to_owned);
        let payload = field
            .bytes()
            .await
            .map_err(|error| map_multipart_error(error, limit_bytes))?;
        return Ok((upload_name, payload));
    }
}

fn map_multipart_error(error: MultipartError, limit_bytes: u64) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge { limit_bytes };
    }
    tracing::debug!(%error, "multipart extraction failed");
    AppError::MissingAudioFile
}

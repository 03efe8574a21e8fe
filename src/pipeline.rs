use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use chrono::Utc;
use serde::Serialize;
use tempfile::TempPath;
use uuid::Uuid;

use crate::audio::Normalizer;
use crate::config::LimitsConfig;
use crate::error::{AppError, AppResult};
use crate::history::{RecentLedger, TranscriptionRecord};
use crate::transcription::{Segment, TranscriptionEngine};

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionOutcome {
    pub text: String,
    pub duration: f64,
    pub processing_time: f64,
    pub segments: Vec<Segment>,
}

/// Runs one upload through stage -> normalize -> transcribe -> duration check
/// -> best-effort ledger append. Owns no per-request state; safe to share.
pub struct Pipeline {
    normalizer: Arc<dyn Normalizer>,
    engine: Arc<dyn TranscriptionEngine>,
    ledger: Arc<dyn RecentLedger>,
    limits: LimitsConfig,
}

impl Pipeline {
    pub fn new(
        normalizer: Arc<dyn Normalizer>,
        engine: Arc<dyn TranscriptionEngine>,
        ledger: Arc<dyn RecentLedger>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            normalizer,
            engine,
            ledger,
            limits,
        }
    }

    /// `started` is the admission instant; the reported processing time covers
    /// everything from there to the ledger append.
    pub async fn run(
        &self,
        started: Instant,
        upload_name: Option<String>,
        payload: Bytes,
    ) -> AppResult<TranscriptionOutcome> {
        let request_id = Uuid::new_v4().to_string();

        // Both temp paths delete on drop, which covers every exit from this
        // function: early error returns, panics, and the success path.
        let staged = stage_upload(&request_id, upload_name.as_deref(), &payload).await?;
        let normalized = allocate_wav_slot(&request_id)?;

        self.normalizer.normalize(&staged, &normalized).await?;

        let transcription = self.engine.transcribe(&normalized).await?;

        if transcription.duration > self.limits.max_duration_seconds {
            return Err(AppError::AudioTooLong {
                duration: transcription.duration,
                limit: self.limits.max_duration_seconds,
            });
        }

        let processing_time = started.elapsed().as_secs_f64();
        let record = TranscriptionRecord {
            id: request_id,
            text: transcription.text.clone(),
            duration: transcription.duration,
            processing_time,
            created_at: Utc::now().to_rfc3339(),
        };

        // History is best-effort: a failed append is logged, never surfaced.
        let ledger = Arc::clone(&self.ledger);
        match tokio::task::spawn_blocking(move || ledger.append(&record)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::warn!(%error, "failed to record transcription in recent ledger");
            }
            Err(error) => {
                tracing::warn!(%error, "ledger append task did not complete");
            }
        }

        tracing::info!(
            duration_seconds = transcription.duration,
            processing_seconds = processing_time,
            ceil_seconds = self.limits.max_duration_seconds,
            "transcription complete"
        );

        Ok(TranscriptionOutcome {
            text: transcription.text,
            duration: transcription.duration,
            processing_time,
            segments: transcription.segments,
        })
    }
}

async fn stage_upload(
    request_id: &str,
    upload_name: Option<&str>,
    payload: &Bytes,
) -> AppResult<TempPath> {
    let staged = tempfile::Builder::new()
        .prefix(&format!("sema-{request_id}-in-"))
        .suffix(&upload_suffix(upload_name))
        .tempfile()?
        .into_temp_path();

    tokio::fs::write(&staged, payload).await?;
    Ok(staged)
}

fn allocate_wav_slot(request_id: &str) -> AppResult<TempPath> {
    Ok(tempfile::Builder::new()
        .prefix(&format!("sema-{request_id}-out-"))
        .suffix(".wav")
        .tempfile()?
        .into_temp_path())
}

/// Keeps the uploaded extension so ffmpeg can use it as a container hint.
/// Anything odd-looking is dropped rather than sanitized.
fn upload_suffix(upload_name: Option<&str>) -> String {
    upload_name
        .map(Path::new)
        .and_then(|name| name.extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

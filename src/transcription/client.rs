use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;

use crate::config::EngineConfig;
use crate::error::{AppError, AppResult};
use crate::transcription::types::EngineTranscription;

#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// One multipart round trip: the waveform at `wav` goes up, the decoded
    /// verbose response comes back. No retry, no streaming.
    async fn transcribe(&self, wav: &Path) -> AppResult<EngineTranscription>;
}

pub struct WhisperHttpEngine {
    client: reqwest::Client,
    base_url: String,
    language: String,
}

impl WhisperHttpEngine {
    pub fn new(config: &EngineConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|error| AppError::Upstream(format!("client init failed: {error}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_owned(),
            language: config.language.clone(),
        })
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperHttpEngine {
    async fn transcribe(&self, wav: &Path) -> AppResult<EngineTranscription> {
        let bytes = tokio::fs::read(wav).await?;
        let file_name = wav
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio.wav")
            .to_owned();

        let file_part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|error| AppError::Upstream(format!("mime: {error}")))?;

        let form = multipart::Form::new()
            .text("language", self.language.clone())
            .text("response_format", "verbose_json")
            .part("file", file_part);

        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        tracing::debug!(url = %url, language = %self.language, "forwarding waveform to engine");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|error| AppError::Upstream(format!("request: {error}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("status {status}: {body}")));
        }

        response
            .json::<EngineTranscription>()
            .await
            .map_err(|error| AppError::Upstream(format!("decode: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::{TranscriptionEngine, WhisperHttpEngine};
    use crate::config::EngineConfig;
    use crate::error::AppError;
    use axum::extract::{Multipart, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    type SeenFields = Arc<Mutex<Vec<(String, usize)>>>;

    async fn spawn_upstream(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub upstream");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub");
        });
        addr
    }

    fn engine_for(addr: SocketAddr) -> WhisperHttpEngine {
        WhisperHttpEngine::new(&EngineConfig {
            url: format!("http://{addr}"),
            ..EngineConfig::default()
        })
        .expect("engine")
    }

    fn write_wav(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("clip.wav");
        std::fs::write(&path, b"RIFF....WAVEfake").expect("write wav");
        path
    }

    async fn record_fields(
        State(seen): State<SeenFields>,
        mut multipart: Multipart,
    ) -> Json<serde_json::Value> {
        while let Some(field) = multipart.next_field().await.expect("next field") {
            let name = field.name().unwrap_or_default().to_owned();
            let data = field.bytes().await.expect("field bytes");
            seen.lock().expect("lock seen").push((name, data.len()));
        }

        Json(json!({
            "task": "transcribe",
            "language": "am",
            "duration": 3.0,
            "text": "ሰላም",
            "segments": [{"id": 0, "start": 0.0, "end": 3.0, "text": "ሰላም"}]
        }))
    }

    #[tokio::test]
    async fn sends_expected_form_and_decodes_response() {
        let seen: SeenFields = Arc::default();
        let app = Router::new()
            .route("/v1/audio/transcriptions", post(record_fields))
            .with_state(seen.clone());
        let addr = spawn_upstream(app).await;

        let temp = tempfile::TempDir::new().expect("tempdir");
        let wav = write_wav(temp.path());

        let result = engine_for(addr).transcribe(&wav).await.expect("transcribe");
        assert_eq!(result.text, "ሰላም");
        assert_eq!(result.duration, 3.0);
        assert_eq!(result.segments.len(), 1);

        let fields = seen.lock().expect("lock seen").clone();
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        assert!(names.contains(&"language"));
        assert!(names.contains(&"response_format"));
        assert!(names.contains(&"file"));
        assert!(
            !names.contains(&"model"),
            "model name must not be forwarded"
        );

        let (_, file_len) = fields
            .iter()
            .find(|(name, _)| name == "file")
            .expect("file field");
        assert_eq!(*file_len, b"RIFF....WAVEfake".len());
    }

    #[tokio::test]
    async fn non_success_status_becomes_upstream_error_with_body() {
        let app = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { (StatusCode::BAD_GATEWAY, "engine down") }),
        );
        let addr = spawn_upstream(app).await;

        let temp = tempfile::TempDir::new().expect("tempdir");
        let wav = write_wav(temp.path());

        let error = engine_for(addr).transcribe(&wav).await.expect_err("must fail");
        assert!(matches!(
            error,
            AppError::Upstream(ref message) if message.contains("502") && message.contains("engine down")
        ));
    }

    #[tokio::test]
    async fn malformed_success_body_becomes_upstream_error() {
        let app = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { "not json at all" }),
        );
        let addr = spawn_upstream(app).await;

        let temp = tempfile::TempDir::new().expect("tempdir");
        let wav = write_wav(temp.path());

        let error = engine_for(addr).transcribe(&wav).await.expect_err("must fail");
        assert!(matches!(
            error,
            AppError::Upstream(ref message) if message.contains("decode")
        ));
    }

    #[tokio::test]
    async fn unreachable_engine_becomes_upstream_error() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let wav = write_wav(temp.path());

        let engine = WhisperHttpEngine::new(&EngineConfig {
            url: "http://127.0.0.1:1".to_owned(),
            ..EngineConfig::default()
        })
        .expect("engine");

        let error = engine.transcribe(&wav).await.expect_err("must fail");
        assert!(matches!(
            error,
            AppError::Upstream(ref message) if message.contains("request")
        ));
    }

    #[tokio::test]
    async fn trailing_slash_in_engine_url_is_tolerated() {
        let app = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async {
                Json(json!({"duration": 1.0, "text": "ok", "segments": []}))
            }),
        );
        let addr = spawn_upstream(app).await;

        let temp = tempfile::TempDir::new().expect("tempdir");
        let wav = write_wav(temp.path());

        let engine = WhisperHttpEngine::new(&EngineConfig {
            url: format!("http://{addr}/"),
            ..EngineConfig::default()
        })
        .expect("engine");

        let result = engine.transcribe(&wav).await.expect("transcribe");
        assert_eq!(result.text, "ok");
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::api::{build_router, AppState, RateGate};
use crate::audio::{FfmpegNormalizer, Normalizer};
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::history::{RecentLedger, SqliteLedger};
use crate::pipeline::Pipeline;
use crate::transcription::{TranscriptionEngine, WhisperHttpEngine};

/// Binds the listener and serves until ctrl-c or SIGTERM.
pub async fn serve(config: AppConfig) -> AppResult<()> {
    let ledger: Arc<dyn RecentLedger> = Arc::new(SqliteLedger::open(
        config.storage.db_path.clone(),
        config.limits.recent_limit,
    )?);
    let engine: Arc<dyn TranscriptionEngine> = Arc::new(WhisperHttpEngine::new(&config.engine)?);
    let normalizer: Arc<dyn Normalizer> = Arc::new(FfmpegNormalizer::new());

    let pipeline = Arc::new(Pipeline::new(
        normalizer,
        engine,
        Arc::clone(&ledger),
        config.limits.clone(),
    ));

    let state = AppState {
        pipeline,
        ledger,
        rate_gate: Arc::new(RateGate::new(config.server.rate_limit_per_minute)),
        model_name: config.engine.model.clone(),
        max_file_size_bytes: config.limits.max_file_size_bytes,
        started_at: Instant::now(),
    };

    let router = build_router(state, &config.server);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        engine = %config.engine.url,
        model = %config.engine.model,
        db = %config.storage.db_path.display(),
        "gateway listening"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("ctrl-c received, draining"),
        _ = terminate => tracing::info!("SIGTERM received, draining"),
    }
}

pub mod admission;
pub mod health;
pub mod rate;
pub mod recent;
pub mod state;
pub mod transcribe;

pub use rate::RateGate;
pub use state::AppState;

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{middleware, BoxError, Json, Router};
use tower::buffer::BufferLayer;
use tower::limit::ConcurrencyLimitLayer;
use tower::load_shed::LoadShedLayer;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::ErrorBody;

/// Assembles the gateway routes with the full middleware stack: CORS and
/// request tracing on the outside, then timeout, shed-on-full queueing and
/// the concurrency cap, then rate limiting and upload admission.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let backpressure = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_stack_error))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_seconds,
        )))
        .layer(LoadShedLayer::new())
        .layer(BufferLayer::<Request>::new(server.queue_depth))
        .layer(ConcurrencyLimitLayer::new(server.concurrency_limit));

    Router::new()
        .route("/transcribe", post(transcribe::transcribe_handler))
        .route("/recent", get(recent::recent_handler))
        .route("/health", get(health::health_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission::reject_oversize_payloads,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate::enforce_rate_limit,
        ))
        .layer(DefaultBodyLimit::max(state.max_file_size_bytes as usize))
        .layer(backpressure)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(server))
        .with_state(state)
}

/// Errors surfaced by the timeout and queueing layers, translated to the
/// caller's vocabulary.
async fn handle_stack_error(error: BoxError) -> (StatusCode, Json<ErrorBody>) {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (
            StatusCode::GATEWAY_TIMEOUT,
            Json(ErrorBody {
                error: "request timed out".to_owned(),
            }),
        );
    }
    if error.is::<tower::load_shed::error::Overloaded>() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                error: "server is busy".to_owned(),
            }),
        );
    }

    tracing::error!(%error, "middleware stack failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "server error".to_owned(),
        }),
    )
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(300))
}

#[cfg(test)]
mod tests {
    use super::handle_stack_error;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn unknown_stack_errors_read_as_server_error() {
        let (status, body) = handle_stack_error(Box::new(std::io::Error::other("boom"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.0.error, "server error");
    }
}

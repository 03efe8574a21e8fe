use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::state::AppState;
use crate::error::ErrorBody;

/// Newest-first history, at most the retention cap. An empty ledger is an
/// empty array, never null.
pub async fn recent_handler(State(state): State<AppState>) -> Response {
    let ledger = Arc::clone(&state.ledger);
    let listed = tokio::task::spawn_blocking(move || ledger.list_all()).await;

    match listed {
        Ok(Ok(records)) => Json(records).into_response(),
        Ok(Err(error)) => {
            tracing::error!(%error, "failed to read recent transcriptions");
            recent_unavailable()
        }
        Err(error) => {
            tracing::error!(%error, "recent lookup task aborted");
            recent_unavailable()
        }
    }
}

fn recent_unavailable() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "failed to get recent".to_owned(),
        }),
    )
        .into_response()
}

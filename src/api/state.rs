use std::sync::Arc;
use std::time::Instant;

use crate::api::rate::RateGate;
use crate::history::RecentLedger;
use crate::pipeline::Pipeline;

/// Shared handler context. Everything heavy sits behind an Arc, so handing a
/// copy to each request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub ledger: Arc<dyn RecentLedger>,
    pub rate_gate: Arc<RateGate>,
    pub model_name: String,
    pub max_file_size_bytes: u64,
    pub started_at: Instant,
}

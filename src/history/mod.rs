pub mod models;
pub mod store;

pub use models::TranscriptionRecord;
pub use store::{RecentLedger, SqliteLedger};

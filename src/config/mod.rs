pub mod load;
pub mod schema;

pub use load::{load_config, CliOverrides, DEFAULT_CONFIG_PATH};
pub use schema::{AppConfig, EngineConfig, LimitsConfig, ServerConfig, StorageConfig};

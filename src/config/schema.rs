use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
    pub request_timeout_seconds: u64,
    pub concurrency_limit: usize,
    pub queue_depth: usize,
    pub rate_limit_per_minute: u32,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind: "0.0.0.0".to_owned(),
            request_timeout_seconds: 60,
            concurrency_limit: 10,
            queue_depth: 20,
            rate_limit_per_minute: 5,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_owned(),
                "http://localhost:4173".to_owned(),
                "http://localhost:3000".to_owned(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub url: String,
    pub model: String,
    pub language: String,
    pub request_timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_owned(),
            model: "whisper-medium-am-v1-47wer-v2".to_owned(),
            language: "am".to_owned(),
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/sema.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub recent_limit: usize,
    pub max_file_size_bytes: u64,
    pub max_duration_seconds: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            recent_limit: 10,
            max_file_size_bytes: 2 << 20,
            max_duration_seconds: 30.0,
        }
    }
}

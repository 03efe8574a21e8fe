use std::path::PathBuf;

use crate::config::schema::AppConfig;
use crate::error::{AppError, AppResult};

pub const DEFAULT_CONFIG_PATH: &str = "sema.toml";

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub engine_url: Option<String>,
    pub model: Option<String>,
    pub db_path: Option<PathBuf>,
}

pub fn load_config(overrides: &CliOverrides) -> AppResult<AppConfig> {
    let config_path = overrides
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = if config_path.exists() {
        let raw = std::fs::read_to_string(&config_path)?;
        toml::from_str::<AppConfig>(&raw)?
    } else {
        tracing::info!(path = %config_path.display(), "config file not found, using defaults");
        AppConfig::default()
    };

    apply_env_overrides(&mut config);
    apply_cli_overrides(&mut config, overrides);

    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> AppResult<()> {
    if config.server.port == 0 {
        return Err(AppError::Config("server.port must be > 0".to_owned()));
    }

    if config.server.request_timeout_seconds == 0 {
        return Err(AppError::Config(
            "server.request_timeout_seconds must be > 0".to_owned(),
        ));
    }

    if config.server.concurrency_limit == 0 {
        return Err(AppError::Config(
            "server.concurrency_limit must be > 0".to_owned(),
        ));
    }

    if config.server.queue_depth == 0 {
        return Err(AppError::Config("server.queue_depth must be > 0".to_owned()));
    }

    if config.server.rate_limit_per_minute == 0 {
        return Err(AppError::Config(
            "server.rate_limit_per_minute must be > 0".to_owned(),
        ));
    }

    if !config.engine.url.starts_with("http://") && !config.engine.url.starts_with("https://") {
        return Err(AppError::Config(
            "engine.url must start with http:// or https://".to_owned(),
        ));
    }

    if config.engine.request_timeout_seconds == 0 {
        return Err(AppError::Config(
            "engine.request_timeout_seconds must be > 0".to_owned(),
        ));
    }

    if config.limits.recent_limit == 0 {
        return Err(AppError::Config(
            "limits.recent_limit must be > 0".to_owned(),
        ));
    }

    if config.limits.max_file_size_bytes == 0 {
        return Err(AppError::Config(
            "limits.max_file_size_bytes must be > 0".to_owned(),
        ));
    }

    if config.limits.max_duration_seconds <= 0.0 {
        return Err(AppError::Config(
            "limits.max_duration_seconds must be > 0".to_owned(),
        ));
    }

    Ok(())
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(value) = std::env::var("SEMA_API_PORT") {
        if let Ok(parsed) = value.trim().parse::<u16>() {
            config.server.port = parsed;
        }
    }
    if let Ok(value) = std::env::var("SEMA_ENGINE_URL") {
        if !value.trim().is_empty() {
            config.engine.url = value;
        }
    }
    if let Ok(value) = std::env::var("SEMA_MODEL_NAME") {
        if !value.trim().is_empty() {
            config.engine.model = value;
        }
    }
    if let Ok(value) = std::env::var("SEMA_DB_PATH") {
        if !value.trim().is_empty() {
            config.storage.db_path = PathBuf::from(value);
        }
    }
}

fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(value) = overrides.port {
        config.server.port = value;
    }
    if let Some(value) = &overrides.engine_url {
        config.engine.url = value.clone();
    }
    if let Some(value) = &overrides.model {
        config.engine.model = value.clone();
    }
    if let Some(value) = &overrides.db_path {
        config.storage.db_path = value.clone();
    }
}

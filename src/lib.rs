pub mod api;
pub mod audio;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod server;
#[cfg(test)]
mod test_support;
pub mod transcription;

use clap::Parser;

use crate::cli::{Cli, Command};
use crate::config::{load_config, AppConfig};
use crate::doctor::run_doctor;
use crate::error::AppResult;
use crate::history::{RecentLedger, SqliteLedger};

trait CommandExecutor {
    fn serve(&self, config: AppConfig) -> AppResult<()>;
    fn doctor(&self, config: &AppConfig, json: bool) -> AppResult<()>;
    fn recent(&self, config: &AppConfig, json: bool, limit: Option<usize>) -> AppResult<()>;
}

struct DefaultCommandExecutor;

impl CommandExecutor for DefaultCommandExecutor {
    fn serve(&self, config: AppConfig) -> AppResult<()> {
        build_runtime()?.block_on(server::serve(config))
    }

    fn doctor(&self, config: &AppConfig, json: bool) -> AppResult<()> {
        let report = build_runtime()?.block_on(run_doctor(config));
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", report.render_text());
        }
        Ok(())
    }

    fn recent(&self, config: &AppConfig, json: bool, limit: Option<usize>) -> AppResult<()> {
        let ledger = SqliteLedger::open(
            config.storage.db_path.clone(),
            config.limits.recent_limit,
        )?;
        let mut records = ledger.list_all()?;
        if let Some(limit) = limit {
            records.truncate(limit);
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&records)?);
        } else if records.is_empty() {
            println!("No transcriptions stored yet.");
        } else {
            for record in &records {
                println!(
                    "{}  {:>6.1}s  {}",
                    record.created_at,
                    record.duration,
                    record.text_preview(64)
                );
            }
        }
        Ok(())
    }
}

fn build_runtime() -> AppResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn execute_command<E: CommandExecutor>(
    command: Command,
    config: AppConfig,
    executor: &E,
) -> AppResult<()> {
    match command {
        Command::Serve => executor.serve(config),
        Command::Doctor { json } => executor.doctor(&config, json),
        Command::Recent { json, limit } => executor.recent(&config, json, limit),
    }
}

pub fn run() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .with_level(true)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.to_overrides())?;

    execute_command(cli.command, config, &DefaultCommandExecutor)
}

#[cfg(test)]
mod tests {
    use super::{execute_command, CommandExecutor};
    use crate::cli::Command;
    use crate::config::AppConfig;
    use crate::error::AppResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SpyExecutor {
        calls: Mutex<Vec<String>>,
    }

    impl CommandExecutor for SpyExecutor {
        fn serve(&self, _config: AppConfig) -> AppResult<()> {
            self.calls
                .lock()
                .expect("lock calls")
                .push("serve".to_owned());
            Ok(())
        }

        fn doctor(&self, _config: &AppConfig, json: bool) -> AppResult<()> {
            self.calls
                .lock()
                .expect("lock calls")
                .push(format!("doctor:{json}"));
            Ok(())
        }

        fn recent(&self, _config: &AppConfig, json: bool, limit: Option<usize>) -> AppResult<()> {
            self.calls
                .lock()
                .expect("lock calls")
                .push(format!("recent:{json}:{limit:?}"));
            Ok(())
        }
    }

    #[test]
    fn command_dispatch_routes_serve_doctor_and_recent() {
        let config = AppConfig::default();
        let executor = SpyExecutor::default();

        execute_command(Command::Serve, config.clone(), &executor).expect("serve");
        execute_command(Command::Doctor { json: true }, config.clone(), &executor)
            .expect("doctor");
        execute_command(
            Command::Recent {
                json: false,
                limit: Some(3),
            },
            config,
            &executor,
        )
        .expect("recent");

        assert_eq!(
            executor.calls.lock().expect("lock calls").as_slice(),
            ["serve", "doctor:true", "recent:false:Some(3)"]
        );
    }

    #[test]
    fn module_re_exports_are_reachable() {
        let _config_load: fn(
            &crate::config::CliOverrides,
        ) -> crate::error::AppResult<crate::config::AppConfig> = crate::config::load_config;
        let _ledger_open: fn(
            std::path::PathBuf,
            usize,
        )
            -> crate::error::AppResult<crate::history::SqliteLedger> =
            crate::history::SqliteLedger::open;
        let _normalizer_ctor: fn() -> crate::audio::FfmpegNormalizer =
            crate::audio::FfmpegNormalizer::new;
        let _engine_ctor: fn(
            &crate::config::EngineConfig,
        )
            -> crate::error::AppResult<crate::transcription::WhisperHttpEngine> =
            crate::transcription::WhisperHttpEngine::new;
        let _gate_ctor: fn(u32) -> crate::api::RateGate = crate::api::RateGate::new;
    }
}

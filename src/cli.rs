use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CliOverrides;

#[derive(Debug, Parser)]
#[command(name = "sema-gateway")]
#[command(about = "HTTP gateway for Amharic speech transcription")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub engine_url: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Serve,
    Doctor {
        #[arg(long)]
        json: bool,
    },
    Recent {
        #[arg(long)]
        json: bool,

        #[arg(long)]
        limit: Option<usize>,
    },
}

impl Cli {
    pub fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            port: self.port,
            engine_url: self.engine_url.clone(),
            model: self.model.clone(),
            db_path: self.db_path.clone(),
        }
    }
}

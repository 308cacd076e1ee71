mod cli;
mod config;
mod stages;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::config::AppConfig;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; only secrets are expected there
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let config = AppConfig::load(&args.config).context("failed to load configuration")?;

    match args.command {
        Command::Clean(clean) => {
            info!("Stage: clean");
            stages::run_clean(&config, clean).await
        }
        Command::Chunk(chunk) => {
            info!("Stage: chunk");
            stages::run_chunk(&config, chunk).await
        }
        Command::Graph(graph) => {
            info!("Stage: graph");
            stages::run_graph(&config, graph).await
        }
        Command::Factors(factors) => {
            info!("Stage: factors");
            stages::run_factors(&config, factors).await
        }
    }
}

//! hostsync command-line entry point.

mod app;
mod config;
mod project;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "hostsync",
    version,
    about = "Publish static assets and cloud code as versioned deployments"
)]
struct Cli {
    /// Configuration file (defaults to ./hostsync.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: app::Command,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::load(cli.config.as_deref())?;
    tracing::debug!(
        asset_root = %config.asset_root.display(),
        code_root = %config.code_root.display(),
        "configuration ready"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let success = rt.block_on(app::run(cli.command, config))?;
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

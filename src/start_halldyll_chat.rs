//! Startup for the `halldyll-chat` binary.

use std::process::ExitCode;

use clap::Parser;

use crate::cli::{self, Cli};

/// Parse arguments, initialize tracing and run the command on a tokio runtime.
///
/// # Returns
/// `ExitCode::SUCCESS` when the command completes, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e:#}");
            return ExitCode::from(1);
        }
    };
    tracing::debug!("Snapshot database: {}", config.storage.sqlite_path.display());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(cli::execute(cli, config)) {
        tracing::error!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

//! rpdx-frontend - configuration front-end for the rpdx model processor
//!
//! Main entry point for the command-line application.
//!
//! # Execution Flow
//!
//! 1. Parse arguments ([`Cli`])
//! 2. Load settings from the config directory ([`ConfigManager`])
//! 3. Initialize logging → `<config dir>/logs/rpdx-frontend.<date>`
//! 4. Create the tokio runtime for processor subprocesses
//! 5. Run the command, log the session metrics, shut the runtime down
//!
//! The exit code is non-zero when any input was rejected, any file failed,
//! or the command itself errored.

use anyhow::Result;
use clap::Parser;
use rpdx_frontend::cli::{self, Cli, CliContext};
use rpdx_frontend::metrics::Metrics;
use rpdx_frontend::{logging, ConfigManager, APP_NAME, VERSION};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config = ConfigManager::new(&cli.config_dir)?;
    let settings = config.load_settings()?;

    // Held until the end of run so buffered log lines are flushed
    let _guard = logging::setup_logging(
        &config.log_dir(&settings),
        APP_NAME,
        settings.debug_mode || cli.verbose > 0,
        !cli.no_console,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("rpdx-worker")
        .build()?;

    let metrics = Arc::new(Metrics::new());
    let ctx = CliContext {
        config,
        settings,
        metrics: Arc::clone(&metrics),
    };

    let result = runtime.block_on(cli::execute(&ctx, &cli.command));

    metrics.log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));

    tracing::info!("Shutdown complete");
    result
}

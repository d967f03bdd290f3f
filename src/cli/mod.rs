//! Command-line front-end.
//!
//! The CLI is the presentation layer: it fills the option model from presets
//! and `--set` overrides, queues input paths, and prints what the services
//! report through the [`StateManager`](crate::state::StateManager).

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, OptionArgs, PresetCommand, RunArgs};
pub use commands::CliContext;

use anyhow::Result;
use tokio::sync::watch;

/// Run one parsed command.
///
/// # Returns
/// `Ok(true)` on full success, `Ok(false)` when some input was rejected or
/// some file failed
pub async fn execute(ctx: &CliContext, command: &Commands) -> Result<bool> {
    match command {
        Commands::Process(args) => {
            let (cancel_tx, cancel_rx) = watch::channel(false);

            // Ctrl-C stops the batch before the next file and kills a running processor
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, cancelling batch");
                    let _ = cancel_tx.send(true);
                }
            });

            commands::process(ctx, args, cancel_rx).await
        }
        Commands::ShowCommand(args) => commands::show_command(ctx, args),
        Commands::Options(args) => commands::list_options(ctx, args),
        Commands::Preset { action } => commands::preset(ctx, action),
    }
}

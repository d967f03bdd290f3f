// rpdx-frontend - configuration front-end for the rpdx model processor
//
// This is the library crate containing the option model, the config-to-invocation
// pipeline and the state it reports through. The binary crate (main.rs) provides
// the command-line entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{AppState, FrontendSettings, OptionModel};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

//! Data models for the rpdx front-end.
//!
//! This module contains the core data structures used throughout the application:
//! - [`OptionModel`]: The structured processor settings, grouped by section and addressed by dotted paths
//! - [`OptionCatalog`]: Static declaration of every option (kind, allowed set or range, default, required)
//! - [`visibility`]: Declarative show/hide rules for option sub-panels
//! - [`FileQueue`] / [`FileEntry`]: Validated input files waiting to be processed
//! - [`ExportJob`] / [`OutputTree`]: Per-file output layout and `--read_config`/`-e` targets
//! - [`FrontendSettings`]: Front-end preferences loaded from `Frontend Settings.yaml`
//! - [`AppState`]: The central state container for a session
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: Options and settings derive `Serialize`/`Deserialize` for YAML persistence
//! - **Validated**: Every option write goes through the catalog
//! - **Cloneable**: AppState is wrapped in `Arc<RwLock<>>` by [`StateManager`](crate::state::StateManager) for thread-safe access

pub mod app_state;
pub mod catalog;
pub mod config;
pub mod file_entry;
pub mod job;
pub mod options;
pub mod visibility;

pub use app_state::AppState;
pub use catalog::{catalog, OptionCatalog, OptionKind, OptionSpec};
pub use config::{FrontendSettings, RunMode};
pub use file_entry::{FileEntry, FileQueue, InputError, QueueReport, RejectedFile, SUPPORTED_EXTENSIONS};
pub use job::{ExportFormat, ExportJob, ExportTarget, JobStage, JobStatus, OutputTree};
pub use options::{OptionError, OptionModel, OptionSection, OptionValue};
pub use visibility::{is_visible, Condition, VisibilityRule};

//! Services module - the config-to-invocation pipeline.
//!
//! Everything here is independent of the presentation layer. The CLI, or any
//! other front-end, fills an [`OptionModel`](crate::models::OptionModel) and a
//! file queue, then hands them to these services.
//!
//! # Components
//!
//! - [`ConfigSerializer`]: Option Model → one JSON document per export format.
//!   Required options are checked before anything is written, so a schema
//!   error leaves zero files behind.
//!
//! - [`InvocationBuilder`]: builds
//!   `<processor> -i <input> (--read_config <cfg> -e <outdir>)* -r`, and
//!   [`write_script`] persists it as `<basename>_convert.{bat,sh}`.
//!
//! - [`ProcessRunner`]: runs an [`Invocation`]. [`TokioProcessRunner`] spawns
//!   the processor with an optional timeout and forwards its output to the log.
//!
//! - [`BatchProcessor`]: walks the queue through
//!   `ValidatePath → BuildOutputTree → SerializeConfigs → BuildInvocation → RunProcess`,
//!   recording one [`JobReport`] per file and continuing past failures.
//!
//! # Usage Example
//!
//! ```ignore
//! use rpdx_frontend::services::{BatchProcessor, TokioProcessRunner};
//!
//! let runner = TokioProcessRunner::new(settings.timeout());
//! let processor = BatchProcessor::new(runner, state.clone(), metrics.clone());
//! let summary = processor.run_queue(cancel_rx).await;
//! ```

pub mod batch;
pub mod invocation;
pub mod runner;
pub mod serializer;

pub use batch::{BatchProcessor, BatchSummary, JobError, JobReport};
pub use invocation::{
    script_invocation, write_script, Invocation, InvocationBuilder, InvocationError, ScriptShell,
};
pub use runner::{ProcessError, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use serializer::{ConfigSerializer, SchemaError};

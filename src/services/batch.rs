use crate::metrics::Metrics;
use crate::models::file_entry::validate_input;
use crate::models::{ExportJob, FileEntry, FrontendSettings, InputError, JobStage, JobStatus, OptionModel, RunMode};
use crate::services::invocation::{write_script, Invocation, InvocationBuilder, InvocationError};
use crate::services::runner::{ProcessError, ProcessOutput, ProcessRunner};
use crate::services::serializer::{ConfigSerializer, SchemaError};
use crate::state::StateManager;
use camino::Utf8PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;

/// Why a single file could not be processed.
///
/// Every variant is recovered per file: the batch records it and moves on.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    InputValidation(#[from] InputError),

    #[error("Failed to create output tree {path}: {source}")]
    OutputTree {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl JobError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Process(ProcessError::Cancelled))
    }
}

/// Outcome of one file
#[derive(Debug, Clone)]
pub struct JobReport {
    pub file: Utf8PathBuf,
    pub status: JobStatus,
    /// Configs written for this file, in command order
    pub configs: Vec<Utf8PathBuf>,
    /// Rendered command line, when one was built
    pub command: Option<String>,
    pub error: Option<String>,
    pub duration: Duration,
}

/// Outcome of a whole queue run
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub reports: Vec<JobReport>,
    /// The batch stopped early on request
    pub cancelled: bool,
}

impl BatchSummary {
    fn count(&self, status: JobStatus) -> usize {
        self.reports.iter().filter(|r| r.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(JobStatus::Succeeded)
    }

    pub fn configs_only(&self) -> usize {
        self.count(JobStatus::ConfigsOnly)
    }

    pub fn failed(&self) -> usize {
        self.count(JobStatus::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.cancelled
    }
}

/// Artifacts of a file that made it through the configs stage
struct PreparedJob {
    configs: Vec<Utf8PathBuf>,
    invocation: Option<Invocation>,
}

/// Drives the per-file pipeline over the queue:
///
/// `ValidatePath → BuildOutputTree → SerializeConfigs → BuildInvocation → RunProcess`
///
/// Files are processed one at a time. A failure at any stage is recorded for
/// that file only and the next file starts. Nothing is rolled back.
pub struct BatchProcessor<R: ProcessRunner> {
    runner: R,
    serializer: ConfigSerializer,
    state: StateManager,
    metrics: Arc<Metrics>,
}

impl<R: ProcessRunner> BatchProcessor<R> {
    pub fn new(runner: R, state: StateManager, metrics: Arc<Metrics>) -> Self {
        Self {
            runner,
            serializer: ConfigSerializer::new(),
            state,
            metrics,
        }
    }

    /// Process every queued file.
    ///
    /// Options and settings are snapshotted when the batch starts. Setting
    /// the cancel channel to `true` stops the batch before the next file and
    /// interrupts a running processor.
    pub async fn run_queue(&self, mut cancel: watch::Receiver<bool>) -> BatchSummary {
        let (entries, options, settings) = self.state.read(|s| {
            (s.queue.entries().to_vec(), s.options.clone(), s.settings.clone())
        });

        let mut summary = BatchSummary::default();
        if entries.is_empty() {
            tracing::warn!("No files to process");
            return summary;
        }

        self.state.start_batch(entries.len());
        tracing::info!(
            "Starting batch of {} file(s) (mode: {}, processor: {})",
            entries.len(),
            settings.run_mode,
            settings.processor_exe
        );

        for entry in &entries {
            if *cancel.borrow() {
                tracing::warn!("Batch cancelled before {}", entry.file_name);
                summary.cancelled = true;
                break;
            }

            tracing::info!("Processing file {}/{}: {}", entry.sequence, entries.len(), entry.file_name);
            self.state.begin_file(entry.file_name.clone());

            let start = Instant::now();
            let result = self.process_file(entry, &options, &settings, &mut cancel).await;
            let report = self.record(entry, result, start.elapsed());

            let cancelled = report.error.is_some() && *cancel.borrow();
            summary.reports.push(report);
            if cancelled {
                summary.cancelled = true;
                break;
            }
        }

        self.state.finish_batch();
        tracing::info!(
            "Batch finished: {} succeeded, {} configs only, {} failed{}",
            summary.succeeded(),
            summary.configs_only(),
            summary.failed(),
            if summary.cancelled { " (cancelled)" } else { "" }
        );

        summary
    }

    /// Run the pipeline for one file
    async fn process_file(
        &self,
        entry: &FileEntry,
        options: &OptionModel,
        settings: &FrontendSettings,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(JobStatus, PreparedJob, Option<ProcessOutput>), JobError> {
        let prepared = self.prepare(entry, options, settings)?;

        let Some(invocation) = prepared.invocation.as_ref() else {
            return Ok((JobStatus::ConfigsOnly, prepared, None));
        };

        self.state.set_stage(JobStage::RunProcess);
        let output = tokio::select! {
            result = self.runner.run(invocation) => result?,
            _ = cancelled(cancel) => {
                tracing::warn!("Processor interrupted for {}", entry.file_name);
                return Err(ProcessError::Cancelled.into());
            }
        };

        Ok((JobStatus::Succeeded, prepared, Some(output)))
    }

    /// Every stage up to and including the command, without running it
    fn prepare(
        &self,
        entry: &FileEntry,
        options: &OptionModel,
        settings: &FrontendSettings,
    ) -> Result<PreparedJob, JobError> {
        self.state.set_stage(JobStage::ValidatePath);
        validate_input(&entry.path)?;

        self.state.set_stage(JobStage::BuildOutputTree);
        let job = ExportJob::plan(entry, options, settings)?;
        job.tree.create().map_err(|source| JobError::OutputTree {
            path: job.tree.root().to_path_buf(),
            source,
        })?;

        self.state.set_stage(JobStage::SerializeConfigs);
        let configs = self.serializer.write_configs(options, &job)?;

        if !settings.run_mode.runs_processor() {
            return Ok(PreparedJob {
                configs,
                invocation: None,
            });
        }

        self.state.set_stage(JobStage::BuildInvocation);
        let invocation = InvocationBuilder::for_job(&settings.processor_exe, &job).build()?;
        let invocation = match settings.run_mode {
            RunMode::Script => write_script(&invocation, &job.tree.script_path())?,
            _ => invocation,
        };

        Ok(PreparedJob {
            configs,
            invocation: Some(invocation),
        })
    }

    /// Log, count and store the outcome of one file
    fn record(
        &self,
        entry: &FileEntry,
        result: Result<(JobStatus, PreparedJob, Option<ProcessOutput>), JobError>,
        duration: Duration,
    ) -> JobReport {
        match result {
            Ok((status, prepared, output)) => {
                let message = match &output {
                    Some(output) => {
                        self.metrics.record_processor_time(output.duration);
                        format!("Processed in {:.2}s", output.duration.as_secs_f32())
                    }
                    None => format!("{} config(s) written", prepared.configs.len()),
                };
                match status {
                    JobStatus::ConfigsOnly => self.metrics.record_configs_only(),
                    _ => self.metrics.record_succeeded(),
                }

                tracing::info!("{}: {} - {}", entry.file_name, status, message);
                self.state.add_file_result(entry.file_name.clone(), status, message);

                JobReport {
                    file: entry.path.clone(),
                    status,
                    configs: prepared.configs,
                    command: prepared.invocation.map(|i| i.command_line()),
                    error: None,
                    duration,
                }
            }
            Err(e) => {
                if matches!(e, JobError::Schema(_)) {
                    tracing::warn!("Json structure was not generated due to undefined structure");
                }
                tracing::warn!("Failed to process {}: {}", entry.file_name, e);
                self.metrics.record_failed();
                self.state
                    .add_file_result(entry.file_name.clone(), JobStatus::Failed, e.to_string());

                JobReport {
                    file: entry.path.clone(),
                    status: JobStatus::Failed,
                    configs: Vec::new(),
                    command: None,
                    error: Some(e.to_string()),
                    duration,
                }
            }
        }
    }
}

/// Resolves once cancellation is requested; never if the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

use crate::cli::args::{OptionArgs, OptionsArgs, PresetCommand, ProcessArgs, ShowCommandArgs};
use crate::config::ConfigManager;
use crate::metrics::Metrics;
use crate::models::{
    catalog, is_visible, ExportJob, FileQueue, FrontendSettings, JobStatus, OptionModel, RunMode,
    SUPPORTED_EXTENSIONS,
};
use crate::services::{
    write_script, BatchProcessor, ConfigSerializer, InvocationBuilder, TokioProcessRunner,
};
use crate::state::{StateChange, StateManager};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// What every command needs, built once in `main`
pub struct CliContext {
    pub config: ConfigManager,
    pub settings: FrontendSettings,
    pub metrics: Arc<Metrics>,
}

impl CliContext {
    /// Option model for a command: preset (or the default preset when one
    /// exists, or catalog defaults), then `--set` overrides in order
    pub fn build_options(&self, args: &OptionArgs) -> Result<OptionModel> {
        let default_preset = self.config.default_preset_path();

        let mut model = match &args.preset {
            Some(path) => self.config.load_preset(path)?,
            None if default_preset.exists() => self.config.load_preset(&default_preset)?,
            None => OptionModel::with_defaults(),
        };

        for (path, raw) in &args.overrides {
            model
                .set_raw(path, raw)
                .with_context(|| format!("Invalid --set {}={}", path, raw))?;
        }

        Ok(model)
    }
}

/// Print one line per finished file while a batch runs.
///
/// Adapts the state change stream to console output and stops when the
/// batch finishes or the state manager goes away.
fn spawn_progress_printer(mut rx: broadcast::Receiver<StateChange>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut done = 0;
        let mut total = 0;

        loop {
            match rx.recv().await {
                Ok(StateChange::BatchStarted { total_files }) => {
                    total = total_files;
                    println!("Processing {} file(s)", total_files);
                }
                Ok(StateChange::StageChanged { stage }) => {
                    tracing::debug!("Stage: {}", stage);
                }
                Ok(StateChange::FileProcessed {
                    file,
                    status,
                    message,
                }) => {
                    done += 1;
                    println!("[{}/{}] {:<16} {} ({})", done, total, status.to_string(), file, message);
                }
                Ok(StateChange::BatchFinished { .. }) => break,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Progress printer skipped {} event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// `process`: queue the inputs and run the batch.
///
/// # Returns
/// `true` when every input was accepted and every file succeeded
pub async fn process(ctx: &CliContext, args: &ProcessArgs, cancel: watch::Receiver<bool>) -> Result<bool> {
    let options = ctx.build_options(&args.options)?;
    let mut settings = ctx.settings.clone();
    args.run.apply(&mut settings);

    let state = StateManager::new();
    state.load_settings(settings.clone());
    state.replace_options(options);

    let (report, _) = state.add_files(&args.files);
    ctx.metrics.record_rejected(report.rejected.len());
    for rejected in &report.rejected {
        eprintln!("Rejected {}: {}", rejected.path, rejected.reason);
    }

    if state.read(|s| s.queue.is_empty()) {
        eprintln!(
            "No files to process (supported types: {})",
            SUPPORTED_EXTENSIONS.join(", ")
        );
        return Ok(false);
    }

    let printer = spawn_progress_printer(state.subscribe());

    let runner = TokioProcessRunner::new(settings.timeout());
    let processor = BatchProcessor::new(runner, state.clone(), ctx.metrics.clone());
    let summary = processor.run_queue(cancel).await;

    if let Err(e) = printer.await {
        tracing::warn!("Progress printer stopped: {}", e);
    }

    for report in &summary.reports {
        if let Some(error) = &report.error {
            eprintln!("{}: {}", report.file, error);
        } else if report.status == JobStatus::ConfigsOnly {
            for config in &report.configs {
                println!("  wrote {}", config);
            }
        }
    }

    println!("{}", state.read(|s| s.results_summary()));
    if summary.cancelled {
        eprintln!("Batch cancelled");
    }

    Ok(!summary.has_failures() && !report.has_rejections())
}

/// `show-command`: prepare one file (output tree and configs) and print the
/// processor command instead of running it
pub fn show_command(ctx: &CliContext, args: &ShowCommandArgs) -> Result<bool> {
    let options = ctx.build_options(&args.options)?;
    let mut settings = ctx.settings.clone();
    args.run.apply(&mut settings);

    let mut queue = FileQueue::new();
    let report = queue.add_paths([&args.file]);
    if let Some(rejected) = report.rejected.into_iter().next() {
        return Err(rejected.reason).context("Cannot prepare command");
    }
    let Some(entry) = queue.entries().first() else {
        bail!("No supported file at {}", args.file.display());
    };

    let job = ExportJob::plan(entry, &options, &settings)?;
    job.tree
        .create()
        .with_context(|| format!("Failed to create output tree {}", job.tree.root()))?;

    let serializer = ConfigSerializer::new();
    let configs = serializer
        .write_configs(&options, &job)
        .context("Json structure was not generated due to undefined structure")?;
    for config in &configs {
        tracing::debug!("Wrote {}", config);
    }

    let invocation = InvocationBuilder::for_job(&settings.processor_exe, &job).build()?;
    if settings.run_mode == RunMode::Script {
        let script = job.tree.script_path();
        write_script(&invocation, &script)?;
        println!("# written to {}", script);
    }

    println!("{}", invocation);
    Ok(true)
}

/// `options`: list the catalog against the current model
pub fn list_options(ctx: &CliContext, args: &OptionsArgs) -> Result<bool> {
    let model = ctx.build_options(&args.options)?;

    for spec in catalog().iter() {
        let visible = is_visible(&model, &spec.path);
        if args.visible && !visible {
            continue;
        }

        let value = model
            .resolved(&spec.path)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let mut notes = Vec::new();
        if spec.required {
            notes.push("required");
        }
        if !visible {
            notes.push("hidden");
        }

        println!(
            "{:<64} {:<14} {}{}",
            spec.path,
            value,
            spec.describe(),
            if notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", notes.join(", "))
            }
        );
    }

    Ok(true)
}

/// `preset init` and `preset check`
pub fn preset(ctx: &CliContext, action: &PresetCommand) -> Result<bool> {
    match action {
        PresetCommand::Init { output } => {
            let path = output.clone().unwrap_or_else(|| ctx.config.default_preset_path());
            ctx.config.save_preset(&path, &OptionModel::with_defaults())?;
            println!("Wrote {}", path);
            Ok(true)
        }
        PresetCommand::Check { path } => {
            let model = ctx.config.load_preset(path)?;
            ConfigSerializer::new()
                .check(&model)
                .with_context(|| format!("Preset {} is incomplete", path))?;
            println!("{}: {} option(s), valid", path, model.leaves().len());
            Ok(true)
        }
    }
}

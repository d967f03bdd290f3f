// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for any presentation layer.

use crate::models::{
    AppState, FrontendSettings, JobStage, JobStatus, OptionError, OptionModel, OptionValue, QueueReport,
};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events notify interested parties (the CLI progress output, or any
/// other front-end) about state changes without requiring them to poll.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The option model was edited, replaced or cleared
    OptionsChanged,

    /// Files were added to or removed from the queue
    QueueChanged {
        queued: usize,
    },

    /// Paths were refused at enqueue time
    FilesRejected {
        paths: Vec<String>,
    },

    /// Progress has been updated during a batch
    ProgressUpdated {
        current: usize,
        total: usize,
        current_file: Option<String>,
    },

    /// Batch has started
    BatchStarted {
        total_files: usize,
    },

    /// Batch has finished
    BatchFinished {
        succeeded: usize,
        configs_only: usize,
        failed: usize,
    },

    /// The current file moved to another pipeline stage
    StageChanged {
        stage: JobStage,
    },

    /// A file has been processed
    FileProcessed {
        file: String,
        status: JobStatus,
        message: String,
    },

    /// Front-end settings have been updated
    SettingsChanged,

    /// State has been reset
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// This is the central state management component that:
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// # Usage
///
/// Always use `StateManager` instead of accessing [`AppState`] directly:
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
///
/// # Related Types
///
/// - [`crate::models::AppState`]: The underlying state structure
/// - [`StateChange`]: Event types emitted on state mutations
/// - [`crate::config::ConfigManager`]: Loads settings and presets into state
/// - [`crate::services::BatchProcessor`]: Reports batch progress through this manager
pub struct StateManager {
    /// The application state protected by RwLock for thread-safe access
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    /// Create a StateManager around an existing state
    pub fn with_state(state: AppState) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(state)),
            state_tx,
        }
    }

    /// Get a read-only snapshot of the current state
    pub fn snapshot(&self) -> AppState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let queued = state_manager.read(|state| state.queue.len());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// This is the primary way to modify state. It:
    /// 1. Captures the old state
    /// 2. Applies the update function
    /// 3. Detects what changed
    /// 4. Emits appropriate events
    ///
    /// # Returns
    /// A vector of StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = self.detect_changes(&old_state, &state);
        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, change: StateChange, changes: &mut Vec<StateChange>) {
        let _ = self.state_tx.send(change.clone());
        changes.push(change);
    }

    /// Detect what changed between two states and generate events
    fn detect_changes(&self, old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.options != new.options {
            changes.push(StateChange::OptionsChanged);
        }

        if old.queue != new.queue {
            changes.push(StateChange::QueueChanged {
                queued: new.queue.len(),
            });
        }

        if new.rejected_files.len() > old.rejected_files.len() {
            changes.push(StateChange::FilesRejected {
                paths: new.rejected_files[old.rejected_files.len()..]
                    .iter()
                    .map(|r| r.path.clone())
                    .collect(),
            });
        }

        // Batch state changes
        if old.is_processing != new.is_processing {
            if new.is_processing {
                changes.push(StateChange::BatchStarted {
                    total_files: new.total_files,
                });
            } else {
                let (succeeded, configs_only, failed, _) = new.batch_stats();
                changes.push(StateChange::BatchFinished {
                    succeeded,
                    configs_only,
                    failed,
                });
            }
        }

        if old.progress != new.progress
            || old.total_files != new.total_files
            || old.current_file != new.current_file
        {
            changes.push(StateChange::ProgressUpdated {
                current: new.progress,
                total: new.total_files,
                current_file: new.current_file.clone(),
            });
        }

        if old.current_stage != new.current_stage {
            changes.push(StateChange::StageChanged {
                stage: new.current_stage,
            });
        }

        if old.settings != new.settings {
            changes.push(StateChange::SettingsChanged);
        }

        changes
    }

    // Convenience methods for common state updates

    /// Validate and set one option
    pub fn set_option(&self, path: &str, value: OptionValue) -> Result<Vec<StateChange>, OptionError> {
        let mut result = Ok(());
        let changes = self.update(|state| {
            result = state.options.set(path, value).map(|_| ());
        });
        result.map(|_| changes)
    }

    /// Parse, validate and set one option from its textual form
    pub fn set_option_raw(&self, path: &str, raw: &str) -> Result<Vec<StateChange>, OptionError> {
        let mut result = Ok(());
        let changes = self.update(|state| {
            result = state.options.set_raw(path, raw).map(|_| ());
        });
        result.map(|_| changes)
    }

    /// Replace the whole option model (preset loaded)
    pub fn replace_options(&self, options: OptionModel) -> Vec<StateChange> {
        self.update(|state| state.options = options)
    }

    /// Validate and enqueue input paths, recording rejections
    pub fn add_files<I, P>(&self, paths: I) -> (QueueReport, Vec<StateChange>)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<std::path::Path>,
    {
        let mut report = QueueReport::default();
        let changes = self.update(|state| {
            let output_root = state.settings.output_root_name.clone();
            state.queue.skip_directory(output_root);
            report = state.queue.add_paths(paths);
            state.rejected_files.extend(report.rejected.iter().cloned());
        });
        (report, changes)
    }

    /// Empty the file queue and forget rejections
    pub fn clear_queue(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.queue.clear();
            state.rejected_files.clear();
        })
    }

    /// Start a batch over `total_files` files
    pub fn start_batch(&self, total_files: usize) -> Vec<StateChange> {
        self.update(|state| {
            state.reset_batch_state();
            state.is_processing = true;
            state.total_files = total_files;
        })
    }

    /// Mark the file now being processed
    pub fn begin_file(&self, file: String) -> Vec<StateChange> {
        self.update(|state| {
            state.current_file = Some(file);
            state.current_stage = JobStage::ValidatePath;
        })
    }

    pub fn set_stage(&self, stage: JobStage) -> Vec<StateChange> {
        self.update(|state| state.current_stage = stage)
    }

    /// Record the outcome of one file
    pub fn add_file_result(&self, file: String, status: JobStatus, message: String) -> Vec<StateChange> {
        let error = (status == JobStatus::Failed).then(|| message.clone());
        let mut changes = self.update(|state| {
            state.add_result(file.clone(), status, error);
            state.current_stage = JobStage::Idle;
        });

        self.emit(
            StateChange::FileProcessed {
                file,
                status,
                message,
            },
            &mut changes,
        );

        changes
    }

    /// Finish the running batch
    pub fn finish_batch(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_processing = false;
            state.current_file = None;
            state.current_stage = JobStage::Idle;
        })
    }

    /// "Reset": clear options, queue and results
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| state.reset());
        self.emit(StateChange::StateReset, &mut changes);
        changes
    }

    /// Load front-end settings into the state
    pub fn load_settings(&self, settings: FrontendSettings) -> Vec<StateChange> {
        self.update(|state| {
            tracing::info!(
                "Loaded settings: processor={}, mode={}, usdz={}, timeout={}s",
                settings.processor_exe,
                settings.run_mode,
                settings.include_usdz,
                settings.timeout_secs
            );
            state.settings = settings;
        })
    }

    /// Update settings in place
    pub fn update_settings<F>(&self, settings_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut FrontendSettings),
    {
        self.update(|state| settings_fn(&mut state.settings))
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across tasks
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

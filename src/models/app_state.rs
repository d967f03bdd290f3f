use crate::models::config::FrontendSettings;
use crate::models::file_entry::{FileQueue, RejectedFile};
use crate::models::job::{JobStage, JobStatus};
use crate::models::options::OptionModel;
use indexmap::{IndexMap, IndexSet};

/// Single source of truth for the session.
///
/// Holds the option model being edited, the file queue, batch progress and
/// per-file results. Files are processed strictly one after another, so at
/// most one file is current at any time.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`].
/// Always go through [`StateManager`](crate::state::StateManager):
/// - [`read()`](crate::state::StateManager::read) for read-only access
/// - [`update()`](crate::state::StateManager::update) for mutations with automatic change events
#[derive(Clone, Debug, Default)]
pub struct AppState {
    // Session inputs
    pub options: OptionModel,
    pub settings: FrontendSettings,
    pub queue: FileQueue,
    pub rejected_files: Vec<RejectedFile>,

    // Runtime state
    pub is_processing: bool,
    pub current_file: Option<String>,
    pub current_stage: JobStage,

    // Progress state
    pub progress: usize,
    pub total_files: usize,

    // Results, in completion order
    pub succeeded_files: IndexSet<String>,
    pub configs_only_files: IndexSet<String>,
    /// Failed file → error message
    pub failed_files: IndexMap<String, String>,
}

impl AppState {
    /// Create a state with the given settings and an empty option model
    pub fn with_settings(settings: FrontendSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// A batch can start when files are queued and none is running
    pub fn is_ready(&self) -> bool {
        !self.queue.is_empty() && !self.is_processing
    }

    /// Returns (succeeded, configs only, failed, total)
    pub fn batch_stats(&self) -> (usize, usize, usize, usize) {
        (
            self.succeeded_files.len(),
            self.configs_only_files.len(),
            self.failed_files.len(),
            self.total_files,
        )
    }

    /// True when at least one file failed or was rejected
    pub fn has_failures(&self) -> bool {
        !self.failed_files.is_empty() || !self.rejected_files.is_empty()
    }

    /// Record the outcome of one file and advance progress
    pub fn add_result(&mut self, file: String, status: JobStatus, error: Option<String>) {
        match status {
            JobStatus::Succeeded => {
                self.succeeded_files.insert(file);
            }
            JobStatus::ConfigsOnly => {
                self.configs_only_files.insert(file);
            }
            JobStatus::Failed => {
                self.failed_files.insert(file, error.unwrap_or_default());
            }
        }
        self.progress += 1;
    }

    /// Clear progress and results before a new batch
    pub fn reset_batch_state(&mut self) {
        self.is_processing = false;
        self.current_file = None;
        self.current_stage = JobStage::Idle;
        self.progress = 0;
        self.total_files = 0;
        self.succeeded_files.clear();
        self.configs_only_files.clear();
        self.failed_files.clear();
    }

    /// "Reset": drop options, queue, rejections and results. Settings survive.
    pub fn reset(&mut self) {
        self.options.clear();
        self.queue.clear();
        self.rejected_files.clear();
        self.reset_batch_state();
    }

    /// One-line summary of the last batch
    pub fn results_summary(&self) -> String {
        let (succeeded, configs_only, failed, total) = self.batch_stats();
        let mut parts = vec![format!("{} succeeded", succeeded)];
        if configs_only > 0 {
            parts.push(format!("{} configs only", configs_only));
        }
        parts.push(format!("{} failed", failed));
        if !self.rejected_files.is_empty() {
            parts.push(format!("{} rejected", self.rejected_files.len()));
        }
        format!("{} of {} file(s): {}", self.progress, total, parts.join(", "))
    }
}

use crate::models::{FrontendSettings, OptionModel};
use crate::services::ConfigSerializer;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Default configuration directory, relative to the working directory
pub const DEFAULT_CONFIG_DIR: &str = "RPDX Frontend Data";

/// Prefix for environment overrides, e.g. `RPDX_FRONTEND_PROCESSOR_EXE`
pub const ENV_PREFIX: &str = "RPDX_FRONTEND";

/// Configuration manager for front-end settings and option presets.
///
/// Manages:
/// - Settings (`Frontend Settings.yaml`): processor path, run mode, usdz toggle,
///   timeout, logging. Layered with `RPDX_FRONTEND_*` environment variables.
/// - Presets (`*.yaml`): a saved [`OptionModel`], the File → Open/Save of the
///   option tree. Processor config documents (`*.json`) load as presets too.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory holding settings and presets (e.g., "RPDX Frontend Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("Frontend Settings.yaml"),
            config_dir,
        })
    }

    /// Load front-end settings.
    ///
    /// Sources, later ones winning: built-in defaults, the settings file if
    /// present, then `RPDX_FRONTEND_*` environment variables.
    pub fn load_settings(&self) -> Result<FrontendSettings> {
        if !self.settings_path.exists() {
            tracing::warn!("Settings file not found at {}, using defaults", self.settings_path);
        }

        let settings: FrontendSettings = config::Config::builder()
            .add_source(
                config::File::from(self.settings_path.as_std_path())
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::debug!("Settings resolved: {:?}", settings);
        Ok(settings)
    }

    /// Save front-end settings.
    pub fn save_settings(&self, settings: &FrontendSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load and validate an option preset.
    ///
    /// YAML presets hold the option tree as written by [`save_preset`](Self::save_preset).
    /// A `.json` file is read as a processor config document, so configs
    /// written next to earlier outputs can be reopened.
    ///
    /// # Returns
    /// The model, or an error naming the first invalid option
    pub fn load_preset(&self, path: &Utf8Path) -> Result<OptionModel> {
        let file_contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read preset: {}", path))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let model = if is_json {
            let document: serde_json::Value = serde_json::from_str(&file_contents)
                .with_context(|| format!("Failed to parse config document: {}", path))?;
            let (model, format) = ConfigSerializer::new()
                .parse_document(&document)
                .with_context(|| format!("Invalid config document: {}", path))?;
            if let Some(format) = format {
                tracing::debug!("Config document {} targets {}", path, format);
            }
            model
        } else {
            let model: OptionModel = serde_yaml_ng::from_str(&file_contents)
                .with_context(|| format!("Failed to parse preset: {}", path))?;
            model
                .validate()
                .with_context(|| format!("Invalid preset: {}", path))?;
            model
        };

        tracing::info!("Loaded preset from {} ({} options)", path, model.leaves().len());
        Ok(model)
    }

    /// Save an option preset as YAML.
    pub fn save_preset(&self, path: &Utf8Path, model: &OptionModel) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(model).context("Failed to serialize preset to YAML")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create preset directory: {}", parent))?;
        }

        fs::write(path, yaml_string).with_context(|| format!("Failed to write preset: {}", path))?;

        tracing::info!("Saved preset to {}", path);
        Ok(())
    }

    /// Preset written by `preset init` when no path is given
    pub fn default_preset_path(&self) -> Utf8PathBuf {
        self.config_dir.join("Default Preset.yaml")
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the settings file path.
    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Resolve the log directory from settings against the config directory
    pub fn log_dir(&self, settings: &FrontendSettings) -> Utf8PathBuf {
        let log_dir = Utf8Path::new(&settings.log_dir);
        if log_dir.is_absolute() {
            log_dir.to_path_buf()
        } else {
            self.config_dir.join(log_dir)
        }
    }
}

use crate::config::DEFAULT_CONFIG_DIR;
use crate::models::{FrontendSettings, RunMode};
use camino::Utf8PathBuf;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// rpdx-frontend - configure and batch-run the rpdx model processor
#[derive(Parser, Debug)]
#[command(name = "rpdx-frontend")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose logging (-v)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory holding settings, presets and logs
    #[arg(long, global = true, value_name = "DIR", default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: Utf8PathBuf,

    /// Write logs to the log file only
    #[arg(long, global = true)]
    pub no_console: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write configs for each file and run the processor on it
    Process(ProcessArgs),

    /// Prepare one file and print the processor command without running it
    ShowCommand(ShowCommandArgs),

    /// List every option with its type, current value and visibility
    Options(OptionsArgs),

    /// Create or validate option presets
    Preset {
        #[command(subcommand)]
        action: PresetCommand,
    },
}

/// Where the option values come from
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Preset to start from (.yaml, or a processor .json config)
    #[arg(short, long, value_name = "FILE")]
    pub preset: Option<Utf8PathBuf>,

    /// Override one option, e.g. --set sceneGraph.splitMode=auto (repeatable)
    #[arg(long = "set", value_name = "PATH=VALUE", value_parser = parse_key_val)]
    pub overrides: Vec<(String, String)>,
}

/// Per-run overrides of the front-end settings
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// direct, script or json-only
    #[arg(long, value_name = "MODE")]
    pub mode: Option<RunMode>,

    /// Also export usdz
    #[arg(long)]
    pub include_usdz: bool,

    /// Processor executable
    #[arg(long, value_name = "EXE")]
    pub processor: Option<String>,

    /// Kill the processor after this many seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl RunArgs {
    /// Layer these flags over the loaded settings
    pub fn apply(&self, settings: &mut FrontendSettings) {
        if let Some(mode) = self.mode {
            settings.run_mode = mode;
        }
        if self.include_usdz {
            settings.include_usdz = true;
        }
        if let Some(processor) = &self.processor {
            settings.processor_exe = processor.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
    }
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Model files or directories (.obj .fbx .glb .usdz .gltf .png)
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub options: OptionArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args, Debug)]
pub struct ShowCommandArgs {
    /// Model file
    pub file: PathBuf,

    #[command(flatten)]
    pub options: OptionArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args, Debug)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub options: OptionArgs,

    /// Only options whose panel is currently shown
    #[arg(long)]
    pub visible: bool,
}

#[derive(Subcommand, Debug)]
pub enum PresetCommand {
    /// Write a preset holding every default
    Init {
        /// Destination (defaults to "Default Preset.yaml" in the config directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<Utf8PathBuf>,
    },

    /// Validate a preset and check that every required option is set
    Check {
        /// Preset file
        path: Utf8PathBuf,
    },
}

/// Parse a single `PATH=VALUE` pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option path in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

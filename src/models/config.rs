use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How a prepared job is handed to the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Spawn the processor with the argument list
    #[default]
    Direct,
    /// Write `<basename>_convert.{bat,sh}` and run it through the shell
    Script,
    /// Stop after the JSON configs are written ("Export as Json Only")
    JsonOnly,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Direct => "direct",
            RunMode::Script => "script",
            RunMode::JsonOnly => "json-only",
        }
    }

    /// Whether this mode starts the processor at all
    pub fn runs_processor(self) -> bool {
        !matches!(self, RunMode::JsonOnly)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(RunMode::Direct),
            "script" => Ok(RunMode::Script),
            "json-only" | "json_only" | "json" => Ok(RunMode::JsonOnly),
            other => Err(format!("unknown run mode '{}' (direct, script, json-only)", other)),
        }
    }
}

/// Front-end settings from `Frontend Settings.yaml`.
///
/// Keys are snake_case so the same names work as `RPDX_FRONTEND_*`
/// environment overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendSettings {
    /// Processor executable, resolved through PATH when not absolute
    pub processor_exe: String,

    /// Directory created next to each input to hold its outputs
    pub output_root_name: String,

    /// Append the usdz `--read_config`/`-e` pair to the command
    pub include_usdz: bool,

    pub run_mode: RunMode,

    /// Processor timeout in seconds, 0 disables it
    pub timeout_secs: u64,

    pub debug_mode: bool,

    /// Log directory, relative to the config directory unless absolute
    pub log_dir: String,
}

impl Default for FrontendSettings {
    fn default() -> Self {
        Self {
            processor_exe: "rpdx".to_string(),
            output_root_name: "dirlod".to_string(),
            include_usdz: false,
            run_mode: RunMode::Direct,
            timeout_secs: 0,
            debug_mode: false,
            log_dir: "logs".to_string(),
        }
    }
}

impl FrontendSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

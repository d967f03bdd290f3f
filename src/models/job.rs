use crate::models::config::FrontendSettings;
use crate::models::file_entry::{FileEntry, InputError};
use crate::models::options::OptionModel;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::str::FromStr;

/// Target format of one `--read_config`/`-e` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Glb,
    Gltf,
    Obj,
    Fbx,
    Usdz,
}

impl ExportFormat {
    /// All formats in command order
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Glb,
        ExportFormat::Gltf,
        ExportFormat::Obj,
        ExportFormat::Fbx,
        ExportFormat::Usdz,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Glb => "glb",
            ExportFormat::Gltf => "gltf",
            ExportFormat::Obj => "obj",
            ExportFormat::Fbx => "fbx",
            ExportFormat::Usdz => "usdz",
        }
    }

    /// Config file name inside the job's output root.
    ///
    /// glb uses the base config, the others carry a `_<format>` suffix.
    pub fn config_file_name(self) -> &'static str {
        match self {
            ExportFormat::Glb => "UserCustomConfigRPDX.Json",
            ExportFormat::Gltf => "UserCustomConfigRPDX_gltf.Json",
            ExportFormat::Obj => "UserCustomConfigRPDX_obj.Json",
            ExportFormat::Fbx => "UserCustomConfigRPDX_fbx.Json",
            ExportFormat::Usdz => "UserCustomConfigRPDX_usdz.Json",
        }
    }

    /// Key of the `export.*` subtree holding this format's settings
    pub fn settings_key(self) -> &'static str {
        match self {
            ExportFormat::Glb | ExportFormat::Gltf => "gltf",
            ExportFormat::Obj => "obj",
            ExportFormat::Fbx => "fbx",
            ExportFormat::Usdz => "usdz",
        }
    }

    /// Option path of this format's enable toggle
    pub fn enabled_path(self) -> String {
        format!("export.{}.enabled", self.settings_key())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportFormat::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown export format '{}'", s))
    }
}

/// Stage of the per-file state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStage {
    #[default]
    Idle,
    ValidatePath,
    BuildOutputTree,
    SerializeConfigs,
    BuildInvocation,
    RunProcess,
}

impl JobStage {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStage::Idle => "idle",
            JobStage::ValidatePath => "validating input",
            JobStage::BuildOutputTree => "creating output tree",
            JobStage::SerializeConfigs => "writing configs",
            JobStage::BuildInvocation => "building command",
            JobStage::RunProcess => "running processor",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Processor exited with status 0
    Succeeded,
    /// Configs written, processor not started (json-only mode)
    ConfigsOnly,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Succeeded => "succeeded",
            JobStatus::ConfigsOnly => "configs written",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output layout of one input: `<parent>/<root_name>/<basename>/{glb,gltf,obj,fbx,usdz}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTree {
    root: Utf8PathBuf,
    stem: String,
}

impl OutputTree {
    pub fn for_input(input: &Utf8Path, root_name: &str) -> Result<Self, InputError> {
        let parent = input
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .ok_or_else(|| InputError::NoParent(input.to_path_buf()))?;
        let stem = input
            .file_stem()
            .ok_or_else(|| InputError::NoParent(input.to_path_buf()))?;

        Ok(Self {
            root: parent.join(root_name).join(stem),
            stem: stem.to_string(),
        })
    }

    /// `<parent>/<root_name>/<basename>`
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn format_dir(&self, format: ExportFormat) -> Utf8PathBuf {
        self.root.join(format.as_str())
    }

    pub fn config_path(&self, format: ExportFormat) -> Utf8PathBuf {
        self.root.join(format.config_file_name())
    }

    /// `<basename>_convert.bat` on Windows, `<basename>_convert.sh` elsewhere
    pub fn script_path(&self) -> Utf8PathBuf {
        let ext = if cfg!(windows) { "bat" } else { "sh" };
        self.root.join(format!("{}_convert.{}", self.stem, ext))
    }

    /// Create the root and all five format directories. Idempotent.
    pub fn create(&self) -> std::io::Result<()> {
        for format in ExportFormat::ALL {
            fs::create_dir_all(self.format_dir(format))?;
        }
        tracing::debug!("Output tree ready: {}", self.root);
        Ok(())
    }

    /// True when every format directory exists
    pub fn exists(&self) -> bool {
        ExportFormat::ALL.iter().all(|f| self.format_dir(*f).is_dir())
    }
}

/// One `--read_config <config_path> -e <output_dir>` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub format: ExportFormat,
    pub config_path: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
}

/// Everything needed to process one queued file
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub entry: FileEntry,
    pub tree: OutputTree,
    pub targets: Vec<ExportTarget>,
}

impl ExportJob {
    /// Lay out the job for `entry` without touching the filesystem.
    ///
    /// Formats are taken in command order. usdz is only included when the
    /// settings ask for it, and any format whose `export.<key>.enabled`
    /// option is off is left out.
    pub fn plan(entry: &FileEntry, options: &OptionModel, settings: &FrontendSettings) -> Result<Self, InputError> {
        let tree = OutputTree::for_input(&entry.path, &settings.output_root_name)?;

        let targets = ExportFormat::ALL
            .into_iter()
            .filter(|f| *f != ExportFormat::Usdz || settings.include_usdz)
            .filter(|f| options.flag(&f.enabled_path()))
            .map(|format| ExportTarget {
                format,
                config_path: tree.config_path(format),
                output_dir: tree.format_dir(format),
            })
            .collect();

        Ok(Self {
            entry: entry.clone(),
            tree,
            targets,
        })
    }

    pub fn formats(&self) -> Vec<ExportFormat> {
        self.targets.iter().map(|t| t.format).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> FileEntry {
        FileEntry {
            sequence: 1,
            file_name: Utf8Path::new(path).file_name().unwrap().to_string(),
            path: Utf8PathBuf::from(path),
        }
    }

    #[test]
    fn test_output_tree_layout() {
        let tree = OutputTree::for_input(Utf8Path::new("/data/model.fbx"), "dirlod").unwrap();
        assert_eq!(tree.root(), Utf8Path::new("/data/dirlod/model"));
        assert_eq!(tree.format_dir(ExportFormat::Gltf), Utf8PathBuf::from("/data/dirlod/model/gltf"));
        assert_eq!(
            tree.config_path(ExportFormat::Glb),
            Utf8PathBuf::from("/data/dirlod/model/UserCustomConfigRPDX.Json")
        );
        assert_eq!(
            tree.config_path(ExportFormat::Obj),
            Utf8PathBuf::from("/data/dirlod/model/UserCustomConfigRPDX_obj.Json")
        );
        assert!(tree.script_path().as_str().contains("model_convert."));
    }

    #[test]
    fn test_bare_file_name_has_no_parent() {
        assert!(matches!(
            OutputTree::for_input(Utf8Path::new("model.fbx"), "dirlod"),
            Err(InputError::NoParent(_))
        ));
    }

    #[test]
    fn test_plan_default_targets_skip_usdz() {
        let job = ExportJob::plan(
            &entry("/data/chair.obj"),
            &OptionModel::new(),
            &FrontendSettings::default(),
        )
        .unwrap();

        assert_eq!(
            job.formats(),
            vec![ExportFormat::Glb, ExportFormat::Gltf, ExportFormat::Obj, ExportFormat::Fbx]
        );
    }

    #[test]
    fn test_plan_honors_usdz_toggle_and_disabled_formats() {
        let mut options = OptionModel::new();
        options.set_raw("export.fbx.enabled", "false").unwrap();
        let settings = FrontendSettings {
            include_usdz: true,
            ..Default::default()
        };

        let job = ExportJob::plan(&entry("/data/chair.obj"), &options, &settings).unwrap();
        assert_eq!(
            job.formats(),
            vec![ExportFormat::Glb, ExportFormat::Gltf, ExportFormat::Obj, ExportFormat::Usdz]
        );
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("USDZ".parse::<ExportFormat>().unwrap(), ExportFormat::Usdz);
        assert!("stl".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Glb.settings_key(), "gltf");
    }
}

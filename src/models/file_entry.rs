//! Input file queue.
//!
//! Paths handed to the front-end (dropped, browsed or passed on the command
//! line) are validated before they enter the queue: they must exist and carry
//! one of the extensions the processor can read. Directories are walked and
//! their supported files are queued. Everything else is rejected and reported.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// Extensions the processor accepts, compared case-insensitively
pub const SUPPORTED_EXTENSIONS: &[&str] = &["obj", "fbx", "glb", "usdz", "gltf", "png"];

/// Directory entries skipped while walking a dropped folder
const SYSTEM_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini", "__MACOSX"];

/// Why a path could not be queued
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("File not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(Utf8PathBuf),

    #[error("Not a regular file: {0}")]
    NotAFile(Utf8PathBuf),

    #[error("Path is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("Cannot derive an output directory for {0}")]
    NoParent(Utf8PathBuf),
}

/// One queued input model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// 1-based position in the queue
    pub sequence: usize,
    pub file_name: String,
    /// Absolute path
    pub path: Utf8PathBuf,
}

impl FileEntry {
    /// Base name without extension, used for the output root and script name
    pub fn stem(&self) -> &str {
        self.path.file_stem().unwrap_or(self.file_name.as_str())
    }
}

/// A path that was refused, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub path: String,
    pub reason: InputError,
}

/// Outcome of one `add_paths` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub accepted: Vec<FileEntry>,
    pub rejected: Vec<RejectedFile>,
}

impl QueueReport {
    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// Case-insensitive extension check against [`SUPPORTED_EXTENSIONS`]
pub fn has_supported_extension(path: &Utf8Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Validate a single path and return its absolute form
pub fn validate_input(path: &Utf8Path) -> Result<Utf8PathBuf, InputError> {
    if !has_supported_extension(path) {
        return Err(InputError::UnsupportedExtension(path.to_path_buf()));
    }
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(InputError::NotAFile(path.to_path_buf()));
    }
    path.canonicalize_utf8()
        .map(strip_verbatim_prefix)
        .map_err(|_| InputError::NotFound(path.to_path_buf()))
}

/// Turn `\\?\C:\...` and `\\?\UNC\host\...` back into plain Windows paths.
///
/// Canonical paths on Windows come back in verbatim form, which `cmd` and
/// most tools reject. Other paths pass through untouched.
fn strip_verbatim_prefix(path: Utf8PathBuf) -> Utf8PathBuf {
    let s = path.as_str();
    if let Some(unc) = s.strip_prefix(r"\\?\UNC\") {
        return Utf8PathBuf::from(format!(r"\\{}", unc));
    }
    match s.strip_prefix(r"\\?\") {
        Some(rest) if rest.as_bytes().get(1) == Some(&b':') => Utf8PathBuf::from(rest),
        _ => path,
    }
}

/// Ordered queue of input files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQueue {
    entries: Vec<FileEntry>,
    /// Directory names never walked (the output root of earlier runs)
    skipped_dirs: Vec<String>,
}

impl FileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never walk into directories with this name
    pub fn skip_directory(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.skipped_dirs.contains(&name) {
            self.skipped_dirs.push(name);
        }
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    /// Validate and enqueue paths.
    ///
    /// Files already in the queue are skipped. Directories are walked
    /// recursively, hidden and system entries ignored. Rejected paths are
    /// logged together and returned in the report.
    pub fn add_paths<I, P>(&mut self, paths: I) -> QueueReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<std::path::Path>,
    {
        let mut report = QueueReport::default();

        for path in paths {
            let path = path.as_ref();
            let Some(path) = Utf8Path::from_path(path) else {
                let shown = path.to_string_lossy().to_string();
                report.rejected.push(RejectedFile {
                    path: shown.clone(),
                    reason: InputError::NotUtf8(shown),
                });
                continue;
            };

            if path.is_dir() {
                self.add_directory(path, &mut report);
            } else {
                self.add_file(path, &mut report);
            }
        }

        if report.has_rejections() {
            let listing: Vec<&str> = report.rejected.iter().map(|r| r.path.as_str()).collect();
            tracing::warn!(
                "{} file(s) rejected, supported types are {}: {}",
                report.rejected.len(),
                SUPPORTED_EXTENSIONS.join(", "),
                listing.join(", ")
            );
        }
        tracing::debug!("Queued {} file(s), queue length {}", report.accepted.len(), self.len());

        report
    }

    /// Remove all entries ("Reset" / refresh)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn add_file(&mut self, path: &Utf8Path, report: &mut QueueReport) {
        match validate_input(path) {
            Ok(absolute) => {
                if self.contains(&absolute) {
                    tracing::debug!("Already queued: {}", absolute);
                    return;
                }
                let entry = FileEntry {
                    sequence: self.entries.len() + 1,
                    file_name: absolute.file_name().unwrap_or_default().to_string(),
                    path: absolute,
                };
                self.entries.push(entry.clone());
                report.accepted.push(entry);
            }
            Err(reason) => report.rejected.push(RejectedFile {
                path: path.to_string(),
                reason,
            }),
        }
    }

    fn add_directory(&mut self, dir: &Utf8Path, report: &mut QueueReport) {
        let read_dir = match dir.read_dir_utf8() {
            Ok(rd) => rd,
            Err(e) => {
                tracing::warn!("Cannot read directory {}: {}", dir, e);
                report.rejected.push(RejectedFile {
                    path: dir.to_string(),
                    reason: InputError::NotAFile(dir.to_path_buf()),
                });
                return;
            }
        };

        let mut children: Vec<Utf8PathBuf> = read_dir
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                !name.starts_with('.') && !SYSTEM_FILES.contains(&name)
            })
            .map(|entry| entry.into_path())
            .collect();
        children.sort();

        for child in children {
            if child.is_dir() {
                let name = child.file_name().unwrap_or_default();
                if !self.skipped_dirs.iter().any(|skipped| skipped == name) {
                    self.add_directory(&child, report);
                }
            } else if fs::metadata(&child).map(|m| m.is_file()).unwrap_or(false)
                && has_supported_extension(&child)
            {
                self.add_file(&child, report);
            }
        }
    }
}

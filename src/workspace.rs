//! Per-run isolated execution directory.

use crate::bridge::{PRELUDE, PRELUDE_FILE};
use crate::config::{CONFIG_FILE, MANIFEST_FILE};
use crate::error::Result;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use walkdir::WalkDir;

/// File name the combined program is written to.
pub const PROGRAM_FILE: &str = "main.mjs";

/// A dependency file or directory that could not be mirrored.
///
/// Never fatal: the run continues with whatever was copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for MirrorWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not mirror {}: {}", self.path.display(), self.reason)
    }
}

/// Uniquely named directory owned by exactly one execution.
///
/// The directory is removed by [`Workspace::remove`], or on drop if a
/// failure path never gets that far.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `parent`, or the system temp directory.
    ///
    /// The name carries a nanosecond timestamp plus a random suffix, so
    /// concurrent runs on one machine never share a directory.
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let prefix = format!("fenrir-{nanos}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        log::debug!("created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn program_path(&self) -> PathBuf {
        self.path().join(PROGRAM_FILE)
    }

    /// Copy the project's dependency directory and manifests in.
    ///
    /// Copy failures are logged and returned; they never abort the run.
    pub fn mirror_dependencies(
        &self,
        project_root: &Path,
        dependency_dir: &str,
    ) -> Vec<MirrorWarning> {
        let mut warnings = Vec::new();

        let deps = project_root.join(dependency_dir);
        if deps.is_dir() {
            copy_tree(&deps, &self.path().join(dependency_dir), &mut warnings);
        } else {
            log::debug!("no dependency directory at {}", deps.display());
        }

        for manifest in [MANIFEST_FILE, CONFIG_FILE] {
            let source = project_root.join(manifest);
            if !source.exists() {
                continue;
            }
            if let Err(e) = fs::copy(&source, self.path().join(manifest)) {
                warnings.push(MirrorWarning {
                    path: source,
                    reason: e.to_string(),
                });
            }
        }

        for warning in &warnings {
            log::warn!("{warning}");
        }
        warnings
    }

    /// Write the combined program and return its path.
    pub fn write_program(&self, source: &str) -> Result<PathBuf> {
        let path = self.program_path();
        fs::write(&path, source)?;
        Ok(path)
    }

    /// Write the capability prelude the program imports on its first line.
    pub fn write_prelude(&self) -> Result<PathBuf> {
        let path = self.path().join(PRELUDE_FILE);
        fs::write(&path, PRELUDE)?;
        Ok(path)
    }

    /// Delete the workspace. Failure is logged, never raised.
    pub fn remove(self) {
        let path = self.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => log::debug!("removed workspace {}", path.display()),
            Err(e) => log::warn!("failed to remove workspace {}: {e}", path.display()),
        }
    }
}

fn copy_tree(source: &Path, target: &Path, warnings: &mut Vec<MirrorWarning>) {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warnings.push(MirrorWarning {
                    path: e.path().unwrap_or(source).to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);
        let file_type = entry.file_type();
        let copied = if file_type.is_dir() {
            fs::create_dir_all(&destination)
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &destination)
        } else {
            fs::copy(entry.path(), &destination).map(|_| ())
        };
        if let Err(e) = copied {
            warnings.push(MirrorWarning {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            });
        }
    }
}

#[cfg(unix)]
fn copy_symlink(link: &Path, destination: &Path) -> io::Result<()> {
    let pointee = fs::read_link(link)?;
    std::os::unix::fs::symlink(pointee, destination)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, destination: &Path) -> io::Result<()> {
    fs::copy(link, destination).map(|_| ())
}

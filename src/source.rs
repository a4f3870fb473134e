//! Reading `.fnr` source files.

use crate::error::{FenrirError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of surface-language source files.
pub const SOURCE_EXTENSION: &str = "fnr";

/// Raw text of a `.fnr` file together with where it came from.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    path: PathBuf,
    text: String,
}

impl SourceUnit {
    /// Read `path`, resolved against `current_dir` when relative.
    ///
    /// Fails with [`FenrirError::InputNotFound`] for a missing file and with
    /// [`FenrirError::EmptyInput`] when the file holds only whitespace.
    pub fn read(path: &Path, current_dir: &Path) -> Result<Self> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            current_dir.join(path)
        };
        if !path.is_file() {
            return Err(FenrirError::InputNotFound { path });
        }
        let text = fs::read_to_string(&path).map_err(|_| FenrirError::InputNotFound {
            path: path.clone(),
        })?;
        Self::new(path, text)
    }

    /// Wrap text that did not come from disk.
    pub fn new(path: PathBuf, text: String) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(FenrirError::EmptyInput { path });
        }
        Ok(Self { path, text })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Directory local imports are resolved against.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// True when `name` looks like a surface-language file, e.g. `app.fnr`.
pub fn is_source_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == SOURCE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = SourceUnit::read(Path::new("nope.fnr"), dir.path()).unwrap_err();
        match err {
            FenrirError::InputNotFound { path } => assert_eq!(path, dir.path().join("nope.fnr")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_whitespace_only_file_is_empty_input() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blank.fnr"), " \n\t\n").unwrap();
        let err = SourceUnit::read(Path::new("blank.fnr"), dir.path()).unwrap_err();
        assert!(matches!(err, FenrirError::EmptyInput { .. }));
    }

    #[test]
    fn test_reads_relative_to_current_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/app.fnr"), "log(1)\n").unwrap();

        let unit = SourceUnit::read(Path::new("src/app.fnr"), dir.path()).unwrap();
        assert_eq!(unit.text(), "log(1)\n");
        assert_eq!(unit.dir(), dir.path().join("src"));
    }

    #[test]
    fn test_source_file_names() {
        assert!(is_source_file("app.fnr"));
        assert!(is_source_file("dir/app.fnr"));
        assert!(!is_source_file("app.js"));
        assert!(!is_source_file("fnr"));
    }
}

//! Project-level configuration.
//!
//! Loaded from `fenrir.json` in the project root. Every field is optional and
//! a missing file is the same as an empty one:
//!
//! ```json
//! {
//!   "imports": { "utils": "./lib/utils.mjs" },
//!   "runtime": "node",
//!   "timeoutMs": 30000,
//!   "dependencyDir": "node_modules"
//! }
//! ```

use crate::error::{FenrirError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "fenrir.json";
/// File name of the host ecosystem's manifest.
pub const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Alias to module path. Applied to `declare` paths before classification.
    pub imports: HashMap<String, String>,
    /// Host runtime executable.
    pub runtime: String,
    pub timeout_ms: Option<u64>,
    /// Dependency directory mirrored into each workspace.
    pub dependency_dir: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            imports: HashMap::new(),
            runtime: "node".to_string(),
            timeout_ms: None,
            dependency_dir: "node_modules".to_string(),
        }
    }
}

impl ProjectConfig {
    /// Load `fenrir.json` from `root`. Absence is not an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no {} in {}, using defaults", CONFIG_FILE, root.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(FenrirError::InvalidConfig {
                    path,
                    reason: e.to_string(),
                });
            }
        };
        Self::parse(&content).map_err(|reason| FenrirError::InvalidConfig { path, reason })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Replace `module_path` with its alias target when one is configured.
    pub fn resolve_alias<'a>(&'a self, module_path: &'a str) -> &'a str {
        self.imports
            .get(module_path)
            .map(String::as_str)
            .unwrap_or(module_path)
    }
}

/// Find the project root for a source file living in `source_dir`.
///
/// Walks up from `source_dir` looking for `fenrir.json` or `package.json`,
/// falling back to `source_dir` itself.
pub fn find_project_root(source_dir: &Path) -> PathBuf {
    source_dir
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file() || dir.join(MANIFEST_FILE).is_file())
        .unwrap_or(source_dir)
        .to_path_buf()
}

//! Host runtime lookup and exit-status helpers.

use crate::env::Environment;
use crate::error::{FenrirError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Find the host runtime executable named by `runtime`.
///
/// Fails with [`FenrirError::SpawnFailure`] when it cannot be found, which
/// happens before any workspace is created.
pub fn locate_runtime(runtime: &str, env: &Environment) -> Result<PathBuf> {
    let search_paths = env.get_var("PATH").unwrap_or_default();
    find_command_path(OsStr::new(search_paths), Path::new(runtime), &env.current_dir).ok_or_else(
        || FenrirError::SpawnFailure {
            reason: format!("host runtime '{runtime}' was not found"),
            exit_code: None,
        },
    )
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - `./foo`, or any path with several components (e.g. `bin/node`): resolved
///   against `current_dir` and returned if it exists.
/// - Single path component: search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
pub fn find_command_path(search_paths: &OsStr, path: &Path, current_dir: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return find_by_path(path).map(Path::to_path_buf);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) if !path.starts_with(".") => find_in_path(search_paths, x.as_os_str()),
        _ => find_by_path(&current_dir.join(path)).map(Path::to_path_buf),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let path = dir.join(cmd);
        if let Some(path) = find_by_path(&path) {
            return Some(path.to_owned());
        }
        #[cfg(windows)]
        {
            let exe = path.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.is_file() { Some(path) } else { None }
}

/// Exit code for a child that did not exit on its own, following shell conventions.
#[cfg(unix)]
pub fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
pub fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Exit code of a finished child.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or_else(|| terminated_by_signal(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let found = find_command_path(osstr("/bin"), path, Path::new("/"));
        assert_eq!(found.as_deref(), Some(path));
    }

    #[test]
    fn absolute_nonexisting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nonexisting");
        assert!(find_command_path(osstr(""), &path, dir.path()).is_none());
    }

    #[test]
    fn single_component_found_in_path() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("node")).unwrap();
        let search = dir.path().as_os_str();

        let found = find_command_path(search, Path::new("node"), Path::new("/"))
            .expect("Expected to find 'node' via PATH search");
        assert_eq!(found, dir.path().join("node"));
    }

    #[test]
    fn single_component_not_found_in_path() {
        let dir = TempDir::new().unwrap();
        let res = find_command_path(dir.path().as_os_str(), Path::new("nonexisting"), dir.path());
        assert!(res.is_none(), "Expected not to find 'nonexisting' in PATH");
    }

    #[test]
    fn relative_paths_use_current_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        File::create(dir.path().join("bin").join("node")).unwrap();
        File::create(dir.path().join("local-node")).unwrap();

        let found = find_command_path(osstr(""), Path::new("bin/node"), dir.path());
        assert_eq!(found, Some(dir.path().join("bin/node")));

        let found = find_command_path(osstr(""), Path::new("./local-node"), dir.path());
        assert_eq!(found, Some(dir.path().join("./local-node")));
    }

    #[test]
    fn empty_path_is_none() {
        assert!(find_command_path(osstr("/bin"), Path::new(""), Path::new("/")).is_none());
    }

    #[test]
    fn missing_runtime_is_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let vars = HashMap::from([("PATH".to_string(), dir.path().display().to_string())]);
        let env = Environment::with_vars(vars, dir.path());

        let err = locate_runtime("definitely-not-a-runtime", &env).unwrap_err();
        assert!(matches!(err, FenrirError::SpawnFailure { exit_code: None, .. }));
    }
}

//! Library error type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning a `.fnr` file into a running program.
///
/// Everything up to and including [`FenrirError::InvalidConfig`] is raised
/// before a workspace exists, so those failures leave nothing behind on disk.
#[derive(Debug, Error)]
pub enum FenrirError {
    #[error("source file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("source file is empty: {}", path.display())]
    EmptyInput { path: PathBuf },

    #[error("line {line}: the keyword 'import' cannot be used, use 'declare' to identify modules")]
    ForbiddenConstruct { line: usize },

    #[error("line {line}: {reason}")]
    TransformFailure { line: usize, reason: String },

    #[error("invalid project configuration {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("failed to prepare workspace: {0}")]
    WorkspaceSetup(#[from] std::io::Error),

    #[error("execution failed: {reason}")]
    SpawnFailure {
        reason: String,
        exit_code: Option<i32>,
    },
}

impl FenrirError {
    /// Exit code the CLI should use when this error ends the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            FenrirError::SpawnFailure {
                exit_code: Some(code),
                ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, FenrirError>;

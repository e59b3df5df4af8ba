//! Error types for UCP schema variant generation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a single schema document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("cannot read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Single annotation validation error with path context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AnnotationError {
    /// JSON Pointer (RFC 6901) to the offending key.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors during a generation run.
///
/// Setup failures are returned directly from `generate`; everything else is
/// collected per file in the run's report.
#[derive(Debug, Error)]
pub enum GenerateError {
    // Setup errors
    #[error("source directory not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error(
        "output directory {} must not be inside source directory {}",
        output.display(),
        source_dir.display()
    )]
    OutputInsideSource {
        output: PathBuf,
        source_dir: PathBuf,
    },

    #[error(
        "source directory {} must not be inside output directory {}",
        source_dir.display(),
        output.display()
    )]
    SourceInsideOutput {
        source_dir: PathBuf,
        output: PathBuf,
    },

    #[error("cannot clean {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Per-file errors
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(
        "{}: {} annotation error(s): {}",
        file.display(),
        errors.len(),
        errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    Annotation {
        file: PathBuf,
        errors: Vec<AnnotationError>,
    },

    #[error("cannot serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid method catalog input {}: {message}", file.display())]
    Catalog { file: PathBuf, message: String },
}

impl GenerateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GenerateError::Load(e) => e.exit_code(),
            GenerateError::Clean { .. }
            | GenerateError::Write { .. }
            | GenerateError::Copy { .. } => 3,
            _ => 2,
        }
    }
}

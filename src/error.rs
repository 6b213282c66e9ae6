//! Error types for the subset pipeline.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while running the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A whole-file JSON document failed to parse.
    #[error("Failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// A single JSONL line failed to parse.
    #[error("Malformed JSON at '{path}' line {line}: {message}")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// An input artifact expected from an earlier stage is missing.
    #[error("Expected input file not found at '{0}'")]
    InputNotFound(PathBuf),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An external stage command could not be launched.
    #[error("Failed to launch {stage} command '{command}': {source}")]
    Spawn {
        stage: &'static str,
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An external stage command ran but exited unsuccessfully.
    #[error("{stage} stage failed: {status}")]
    StageFailed {
        stage: &'static str,
        status: ExitStatus,
    },

    /// Vector database error.
    #[error("Vector store error: {0}")]
    VectorStore(String),
}

impl PipelineError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a whole-file parse error with path context.
    pub fn parse(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a per-line parse error with path and 1-indexed line number.
    pub fn malformed_line(
        path: impl Into<PathBuf>,
        line: usize,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::MalformedLine {
            path: path.into(),
            line,
            message: err.to_string(),
        }
    }
}

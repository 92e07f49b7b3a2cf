use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in the `designv1` application.
///
/// Only failures that should abort a run end up here. Unreadable directories,
/// binary files and misbehaving providers are recovered where they happen and
/// never surface as an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    /// An error related to file system I/O.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A glob compiled into an invalid regex.
    #[error("Pattern compilation failed: {0}")]
    Regex(#[from] regex::Error),

    /// An error that occurred while parsing a YAML configuration file.
    #[error("Config parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Writing a source file, patch or report failed.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An error related to JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level failure talking to the edit provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The edit provider answered, but not with anything usable.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The run was interrupted before it finished.
    #[error("Operation cancelled")]
    Cancelled,
}

/// A convenient type alias for `Result<T, designv1::errors::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in the `replitex` application.
///
/// Configuration problems surface before a run starts. Everything else is
/// produced while processing a single entry and is normally logged and
/// skipped by the engine rather than propagated to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// An error related to file system I/O.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error that occurred while compiling the search pattern.
    #[error("Pattern compilation failed: {0}")]
    Regex(#[from] regex::Error),

    /// An error that occurred while parsing a YAML configuration file.
    #[error("Config parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A general configuration-related error.
    #[error("Config error: {0}")]
    Config(String),

    /// An encoding label that `encoding_rs` does not know.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Rewritten text could not be represented in the file's original encoding.
    #[error("Cannot encode {path} as {encoding}")]
    Encode {
        path: PathBuf,
        encoding: &'static str,
    },

    /// A rename or copy target that is already taken.
    #[error("Target already exists: {0}")]
    TargetExists(PathBuf),

    /// A name that cannot be used as a single path component.
    #[error("Invalid file name for {0}")]
    InvalidName(PathBuf),

    /// An error from the `walkdir` crate.
    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// An error related to persisting a temporary file.
    #[error("Tempfile error: {0}")]
    TempFile(#[from] tempfile::PersistError),

    /// An error related to CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An error related to JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, replitex::errors::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Config(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Config(s.to_string())
    }
}

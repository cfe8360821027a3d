use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovgateError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid threshold for group '{group}': {reason}")]
    InvalidThreshold { group: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// A check record carried a tag the verdict logic does not know. This is
    /// an internal consistency failure, never a coverage failure.
    #[error("Unrecognized check type '{0}'")]
    UnrecognizedCheck(String),
}

pub type Result<T> = std::result::Result<T, CovgateError>;

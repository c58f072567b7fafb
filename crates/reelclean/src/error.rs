//! Error types for the reelclean library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cleaning runs.
#[derive(Debug, Error)]
pub enum CleanError {
    /// Error reading, writing or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library (malformed input or failed write).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no header row.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A dataset lacks columns that a rule cannot run without.
    #[error("Dataset '{dataset}' is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        dataset: String,
        columns: Vec<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Table store error (unknown table, bad shape).
    #[error("Store error: {0}")]
    Store(String),

    /// SQLite backend error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl CleanError {
    /// Build an IO error tagged with the offending path.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CleanError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a missing-columns error.
    pub(crate) fn missing_columns(dataset: &str, columns: &[&str]) -> Self {
        CleanError::MissingColumns {
            dataset: dataset.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Returns true for errors that mean the input file itself is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CleanError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Result type alias for reelclean operations.
pub type Result<T> = std::result::Result<T, CleanError>;

//! Crate-level error taxonomy
//!
//! Only configuration and persistence failures ever leave the pipeline.
//! Network trouble, extraction misses and validation rejections are handled
//! inside the component that sees them.

use std::path::PathBuf;
use thiserror::Error;

use crate::infrastructure::parsing_error::ParsingError;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Persistence failed for {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Parser setup failed: {0}")]
    Parsing(#[from] ParsingError),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),

    #[error("Headless renderer unavailable: {0}")]
    Render(String),

    #[error("Store is inconsistent: {0}")]
    InconsistentStore(String),
}

impl HarvestError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Configuration errors abort before any fetch; everything else here is
    /// a failed write or read of a store.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::Parsing(_) | Self::HttpClient(_) | Self::Render(_)
        )
    }
}

pub type HarvestResult<T> = Result<T, HarvestError>;

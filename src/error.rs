// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a comparison request.
///
/// Tolerated gaps (blank or placeholder cells, coordinates missing on one
/// side, dangling allowance references) never show up here.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Unknown table '{name}' (no directory at {path:?})")]
    TableNotFound { name: String, path: PathBuf },

    #[error("{0}")]
    Validation(String),

    #[error("Table '{table}' has no numeric salary values")]
    EmptyData { table: String },

    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CompareError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CompareError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;

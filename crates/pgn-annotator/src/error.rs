//! Annotator error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl AnnotatorError {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnnotatorError::File {
            path: path.into(),
            source,
        }
    }
}

//! Error types for decel-core.

use decel_engine::engine::ReferenceDecodeError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by grid, persistence and script operations.
///
/// Formula evaluation failures are not here: they become error values in
/// the cell.
#[derive(Error, Debug)]
pub enum DecelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Reference(#[from] ReferenceDecodeError),

    #[error("No filename set")]
    NoFilename,

    #[error("Script error in {}: {message}", path.display())]
    Script { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, DecelError>;

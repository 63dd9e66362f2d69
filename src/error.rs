//! Error kinds shared by every read and write path of the content layer.
//!
//! The routing layer maps these onto HTTP statuses, so each failure cause
//! keeps its own variant instead of collapsing into a generic "not found".

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    /// Missing directory or `index.txt`, or a path that would leave the
    /// content root.
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Malformed content in {}: expected {expected} header lines, found {found}", path.display())]
    Malformed {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound(_))
    }

    /// Short machine-friendly name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentError::NotFound(_) => "not_found",
            ContentError::Malformed { .. } => "malformed",
            ContentError::Io(_) => "io",
            ContentError::Validation(_) => "validation",
            ContentError::CacheUnavailable(_) => "cache_unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;

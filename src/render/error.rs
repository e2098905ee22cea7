//! Conversion error taxonomy
//!
//! Only whole-request failures surface as `ConvertError`. Per-page failures
//! are recorded in the page's [`PageResult`](super::PageResult) instead.

use std::time::Duration;

use thiserror::Error;

use super::backend::BackendError;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Document exceeds the upload ceiling; raised before any decode
    #[error("Document is {size} bytes, exceeding the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },

    /// Bytes could not be opened as a PDF
    #[error("Invalid document: {0}")]
    DocumentInvalid(String),

    /// Requested page does not exist
    #[error("Page {index} is out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    /// Memory budget exhausted while opening the document
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Conversion did not finish in time
    #[error("Conversion timed out after {0:?}")]
    Timeout(Duration),

    /// Worker thread failed
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for conversion operations
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Map a backend error raised while opening a document
    pub(crate) fn from_open(err: BackendError) -> Self {
        match err {
            BackendError::OutOfMemory(msg) => ConvertError::ResourceExhausted(msg),
            other => ConvertError::DocumentInvalid(other.to_string()),
        }
    }
}

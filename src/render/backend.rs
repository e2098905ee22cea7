//! Decoder/rasterizer seam
//!
//! The pipeline never talks to a PDF library directly. A [`DocumentBackend`]
//! opens document bytes into a [`DocumentHandle`], which reports page count,
//! page geometry and rasterizes one page at a time into an RGB buffer.

use thiserror::Error;

use super::types::PageGeometry;

/// RGB page raster (no alpha channel)
pub type Raster = image::RgbImage;

/// Errors reported by a document backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The bytes are not a document this backend can open
    #[error("Failed to open document: {0}")]
    Open(String),

    /// Page index outside the document
    #[error("Page {index} not found (document has {page_count} pages)")]
    PageNotFound { index: usize, page_count: usize },

    /// Rasterization failed
    #[error("Failed to render page: {0}")]
    Render(String),

    /// The backend could not allocate the raster
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// The handle was already closed
    #[error("Document handle is closed")]
    Closed,
}

/// Opens document bytes
///
/// Shared across requests, so implementations must be `Send + Sync`. The
/// returned handle is confined to the thread that opened it.
pub trait DocumentBackend: Send + Sync {
    fn open(&self, data: &[u8]) -> Result<Box<dyn DocumentHandle>, BackendError>;
}

/// One open document
pub trait DocumentHandle {
    fn page_count(&self) -> Result<usize, BackendError>;

    /// Page size in points
    fn page_geometry(&self, index: usize) -> Result<PageGeometry, BackendError>;

    /// Render `index` at `scale` (1.0 = 72 DPI) into a fresh RGB buffer
    fn rasterize(&self, index: usize, scale: f32) -> Result<Raster, BackendError>;

    /// Release the underlying document
    fn close(&mut self);
}

//! MuPDF document backend
//!
//! MuPDF's `fz_context` is not thread-safe, so a handle is never shared: the
//! pipeline opens it, uses it and closes it on one blocking thread. Document
//! bytes stay in memory; nothing is written to disk.

use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::backend::{BackendError, DocumentBackend, DocumentHandle, Raster};
use super::types::PageGeometry;

const PDF_MIME: &str = "application/pdf";

/// The `%PDF` header may be preceded by junk within the first KiB
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Backend that decodes and rasterizes PDFs with MuPDF
#[derive(Debug, Default, Clone, Copy)]
pub struct MuPdfBackend;

impl MuPdfBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Cheap header check before handing bytes to MuPDF
pub(crate) fn looks_like_pdf(data: &[u8]) -> bool {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}

impl DocumentBackend for MuPdfBackend {
    fn open(&self, data: &[u8]) -> Result<Box<dyn DocumentHandle>, BackendError> {
        if !looks_like_pdf(data) {
            return Err(BackendError::Open("missing %PDF header".to_string()));
        }

        let doc = Document::from_bytes(data, PDF_MIME)
            .map_err(|e| BackendError::Open(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| BackendError::Open(e.to_string()))?;

        Ok(Box::new(MuPdfHandle {
            doc: Some(doc),
            page_count: page_count.max(0) as usize,
        }))
    }
}

struct MuPdfHandle {
    /// `None` once closed
    doc: Option<Document>,
    page_count: usize,
}

impl MuPdfHandle {
    fn load_page(&self, index: usize) -> Result<mupdf::Page, BackendError> {
        let doc = self.doc.as_ref().ok_or(BackendError::Closed)?;
        if index >= self.page_count {
            return Err(BackendError::PageNotFound {
                index,
                page_count: self.page_count,
            });
        }
        doc.load_page(index as i32)
            .map_err(|e| BackendError::Render(e.to_string()))
    }
}

impl DocumentHandle for MuPdfHandle {
    fn page_count(&self) -> Result<usize, BackendError> {
        if self.doc.is_none() {
            return Err(BackendError::Closed);
        }
        Ok(self.page_count)
    }

    fn page_geometry(&self, index: usize) -> Result<PageGeometry, BackendError> {
        let page = self.load_page(index)?;
        let bounds = page
            .bounds()
            .map_err(|e| BackendError::Render(e.to_string()))?;

        Ok(PageGeometry::new(
            index,
            bounds.x1 - bounds.x0,
            bounds.y1 - bounds.y0,
        ))
    }

    fn rasterize(&self, index: usize, scale: f32) -> Result<Raster, BackendError> {
        let page = self.load_page(index)?;

        let matrix = Matrix::new_scale(scale, scale);
        let colorspace = Colorspace::device_rgb();
        // (ctm, colorspace, alpha, show_extras)
        let pixmap = page
            .to_pixmap(&matrix, &colorspace, false, false)
            .map_err(|e| BackendError::Render(e.to_string()))?;

        pixmap_to_raster(&pixmap)
    }

    fn close(&mut self) {
        self.doc = None;
    }
}

/// Copy pixmap samples into an owned RGB buffer
fn pixmap_to_raster(pixmap: &Pixmap) -> Result<Raster, BackendError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let n = pixmap.n() as usize;
    let samples = pixmap.samples();

    if width == 0 || height == 0 || n < 3 {
        return Err(BackendError::Render(format!(
            "unexpected pixmap layout: {}x{} with {} components",
            width, height, n
        )));
    }

    let row_len = width as usize * n;
    let stride = samples.len() / height as usize;
    if stride < row_len {
        return Err(BackendError::Render("pixmap samples are truncated".to_string()));
    }

    let mut rgb = Vec::new();
    rgb.try_reserve_exact(width as usize * height as usize * 3)
        .map_err(|e| BackendError::OutOfMemory(e.to_string()))?;

    for row in samples.chunks_exact(stride) {
        for pixel in row[..row_len].chunks_exact(n) {
            rgb.extend_from_slice(&pixel[..3]);
        }
    }

    Raster::from_raw(width, height, rgb)
        .ok_or_else(|| BackendError::Render("failed to create image buffer".to_string()))
}

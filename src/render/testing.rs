//! Test doubles for the pipeline

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::backend::{BackendError, DocumentBackend, DocumentHandle, Raster};
use super::types::PageGeometry;

/// Call counters shared between a fake backend and its handles
#[derive(Debug, Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub rasterizations: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn rasterizations(&self) -> usize {
        self.rasterizations.load(Ordering::SeqCst)
    }
}

/// In-memory backend with scripted failures
///
/// Accepts any bytes starting with `%PDF`. Pages rasterize to a deterministic
/// pattern sized from their point geometry.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pages: Vec<(f32, f32)>,
    failing_pages: HashSet<usize>,
    fail_page_count: bool,
    open_delay: Option<Duration>,
    pub counters: Arc<Counters>,
}

impl FakeBackend {
    pub fn with_pages(pages: &[(f32, f32)]) -> Self {
        Self {
            pages: pages.to_vec(),
            ..Default::default()
        }
    }

    /// `count` US-letter-sized pages
    pub fn letter(count: usize) -> Self {
        Self::with_pages(&vec![(612.0, 792.0); count])
    }

    pub fn failing_page(mut self, index: usize) -> Self {
        self.failing_pages.insert(index);
        self
    }

    /// Block the calling thread for `delay` before opening
    pub fn slow_open(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Opening succeeds but reading the page count fails
    pub fn failing_page_count(mut self) -> Self {
        self.fail_page_count = true;
        self
    }
}

impl DocumentBackend for FakeBackend {
    fn open(&self, data: &[u8]) -> Result<Box<dyn DocumentHandle>, BackendError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            std::thread::sleep(delay);
        }
        if !data.starts_with(b"%PDF") {
            return Err(BackendError::Open("not a PDF".to_string()));
        }

        Ok(Box::new(FakeHandle {
            pages: self.pages.clone(),
            failing_pages: self.failing_pages.clone(),
            fail_page_count: self.fail_page_count,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeHandle {
    pages: Vec<(f32, f32)>,
    failing_pages: HashSet<usize>,
    fail_page_count: bool,
    counters: Arc<Counters>,
}

impl FakeHandle {
    fn page(&self, index: usize) -> Result<(f32, f32), BackendError> {
        self.pages
            .get(index)
            .copied()
            .ok_or(BackendError::PageNotFound {
                index,
                page_count: self.pages.len(),
            })
    }
}

impl DocumentHandle for FakeHandle {
    fn page_count(&self) -> Result<usize, BackendError> {
        if self.fail_page_count {
            return Err(BackendError::Open("corrupt page tree".to_string()));
        }
        Ok(self.pages.len())
    }

    fn page_geometry(&self, index: usize) -> Result<PageGeometry, BackendError> {
        let (width, height) = self.page(index)?;
        Ok(PageGeometry::new(index, width, height))
    }

    fn rasterize(&self, index: usize, scale: f32) -> Result<Raster, BackendError> {
        self.counters.rasterizations.fetch_add(1, Ordering::SeqCst);
        let (width, height) = self.page(index)?;
        if self.failing_pages.contains(&index) {
            return Err(BackendError::Render(format!("corrupt content stream on page {}", index)));
        }

        let width = (width * scale).round().max(1.0) as u32;
        let height = (height * scale).round().max(1.0) as u32;
        Ok(Raster::from_fn(width, height, |x, y| {
            image::Rgb([(x % 251) as u8, (y % 241) as u8, (index % 256) as u8])
        }))
    }

    fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build a structurally valid PDF with blank pages of the given sizes
pub fn minimal_pdf(pages: &[(f32, f32)]) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..pages.len())
                .map(|i| format!("{} 0 R", i + 3))
                .collect::<Vec<_>>()
                .join(" "),
            pages.len()
        ),
    ];
    for (width, height) in pages {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << >> >>",
            width, height
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );
    out
}

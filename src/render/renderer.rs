//! Single-page renderer
//!
//! Rasterizes one page, downsamples it once if its long edge exceeds the
//! config's `max_dimension`, encodes it and returns base64 text. The raw
//! pixel buffer is dropped before this call returns, so callers that render
//! pages one after another never hold more than one raster.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::imageops::{self, FilterType};

use super::backend::{BackendError, Raster};
use super::encode::encode_raster;
use super::policy::RenderConfig;
use super::session::DocumentSession;
use super::types::{PageFailureKind, PageResult};

#[derive(Debug, Default, Clone, Copy)]
pub struct PageRenderer;

struct RenderedPage {
    image: String,
    width: u32,
    height: u32,
}

struct PageFailure {
    kind: PageFailureKind,
    message: String,
}

impl From<BackendError> for PageFailure {
    fn from(err: BackendError) -> Self {
        let kind = match err {
            BackendError::OutOfMemory(_) => PageFailureKind::ResourceExhausted,
            _ => PageFailureKind::RenderFailed,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<image::ImageError> for PageFailure {
    fn from(err: image::ImageError) -> Self {
        let kind = match err {
            image::ImageError::Limits(_) => PageFailureKind::ResourceExhausted,
            _ => PageFailureKind::RenderFailed,
        };
        Self {
            kind,
            message: format!("Image encoding error: {}", err),
        }
    }
}

impl PageRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render `index` with `config`
    ///
    /// Never fails: errors are recorded in the returned [`PageResult`].
    pub fn render(&self, session: &DocumentSession, index: usize, config: &RenderConfig) -> PageResult {
        match render_page(session, index, config) {
            Ok(page) => PageResult::rendered(index, page.image, page.width, page.height, config),
            Err(failure) => {
                tracing::warn!(
                    session = %session.id(),
                    page = index,
                    kind = ?failure.kind,
                    "Page render failed: {}",
                    failure.message
                );
                PageResult::failed(index, failure.kind, failure.message, config.dpi)
            }
        }
    }
}

fn render_page(
    session: &DocumentSession,
    index: usize,
    config: &RenderConfig,
) -> Result<RenderedPage, PageFailure> {
    let raster = session.rasterize(index, config.scale())?;
    let raster = fit_to_max_dimension(raster, config.max_dimension);
    let (width, height) = raster.dimensions();

    let encoded = encode_raster(&raster, config)?;
    drop(raster);

    Ok(RenderedPage {
        image: BASE64.encode(&encoded),
        width,
        height,
    })
}

/// Target size with the long edge clamped to `max_dimension`, aspect preserved
pub(crate) fn fitted_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let long_edge = width.max(height);
    if long_edge <= max_dimension || max_dimension == 0 {
        return (width, height);
    }

    let ratio = max_dimension as f64 / long_edge as f64;
    let scale = |edge: u32| ((edge as f64 * ratio).round() as u32).clamp(1, max_dimension);
    if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    }
}

/// Downsample once with Lanczos3; the input buffer is consumed
fn fit_to_max_dimension(raster: Raster, max_dimension: u32) -> Raster {
    let (width, height) = raster.dimensions();
    let (target_width, target_height) = fitted_dimensions(width, height, max_dimension);
    if (target_width, target_height) == (width, height) {
        return raster;
    }

    tracing::trace!(
        "Resampling {}x{} to {}x{}",
        width,
        height,
        target_width,
        target_height
    );
    imageops::resize(&raster, target_width, target_height, FilterType::Lanczos3)
}

//! Pipeline data types
//!
//! Page geometry read from the document and the per-page / per-document
//! results returned to the caller.

use serde::{Deserialize, Serialize};

use super::estimate::EstimatedSize;
use super::policy::{OutputFormat, RenderConfig};

/// Page size in PDF points (72 points = 1 inch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// 0-based page index
    pub page_index: usize,
    pub width_points: f32,
    pub height_points: f32,
}

impl PageGeometry {
    pub fn new(page_index: usize, width_points: f32, height_points: f32) -> Self {
        Self {
            page_index,
            width_points,
            height_points,
        }
    }

    /// Raster dimensions in pixels at the given DPI
    pub fn pixel_dimensions(&self, dpi: u32) -> (u32, u32) {
        let scale = dpi as f32 / 72.0;
        (
            (self.width_points * scale).round().max(1.0) as u32,
            (self.height_points * scale).round().max(1.0) as u32,
        )
    }
}

/// Why a single page failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFailureKind {
    /// Rasterizing, resizing or encoding failed
    RenderFailed,
    /// The page would exceed the per-page memory budget
    ResourceExhausted,
}

/// Outcome of rendering one page
///
/// Exactly one of `image` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub page_index: usize,
    /// Base64-encoded image bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    pub width: u32,
    pub height: u32,
    /// DPI the page was rendered at
    pub dpi: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<PageFailureKind>,
}

impl PageResult {
    pub fn rendered(
        page_index: usize,
        image: String,
        width: u32,
        height: u32,
        config: &RenderConfig,
    ) -> Self {
        Self {
            page_index,
            image: Some(image),
            format: Some(config.format),
            width,
            height,
            dpi: config.dpi,
            quality: config.jpeg_quality(),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(
        page_index: usize,
        kind: PageFailureKind,
        error: impl Into<String>,
        dpi: u32,
    ) -> Self {
        Self {
            page_index,
            image: None,
            format: None,
            width: 0,
            height: 0,
            dpi,
            quality: None,
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.image.is_some()
    }
}

/// Aggregate result of rendering every page of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub total_pages: usize,
    /// One entry per page, in page order
    pub pages: Vec<PageResult>,
    /// Indices of pages whose result carries an error (sorted)
    pub failed_pages: Vec<usize>,
    pub rendered_pages: usize,
}

impl DocumentResult {
    pub fn from_pages(total_pages: usize, pages: Vec<PageResult>) -> Self {
        let failed_pages: Vec<usize> = pages
            .iter()
            .filter(|p| p.error.is_some())
            .map(|p| p.page_index)
            .collect();
        let rendered_pages = pages.len() - failed_pages.len();

        Self {
            total_pages,
            pages,
            failed_pages,
            rendered_pages,
        }
    }
}

/// Result of rendering a single requested page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinglePageResult {
    pub total_pages: usize,
    pub page: PageResult,
}

/// What the pipeline would do for one page, without rendering it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePlan {
    pub geometry: PageGeometry,
    pub estimated_mb: f64,
    pub config: RenderConfig,
    /// Whether the selected config exceeds the per-page raster budget
    pub over_budget: bool,
}

impl PagePlan {
    pub fn new(geometry: PageGeometry, estimate: EstimatedSize, config: RenderConfig) -> Self {
        Self {
            geometry,
            estimated_mb: estimate.megabytes(),
            config,
            over_budget: false,
        }
    }
}

/// Per-page plan for a whole document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPlan {
    pub total_pages: usize,
    pub pages: Vec<PagePlan>,
    /// Pages whose geometry could not be read
    pub unreadable_pages: Vec<usize>,
}

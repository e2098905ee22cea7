//! Decoded raster size estimation

use serde::Serialize;

use super::types::PageGeometry;

/// RGB, no alpha
const BYTES_PER_PIXEL: f64 = 3.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Estimated size of a page raster in megabytes
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct EstimatedSize(f64);

impl EstimatedSize {
    pub fn from_megabytes(mb: f64) -> Self {
        Self(mb)
    }

    pub fn megabytes(self) -> f64 {
        self.0
    }
}

/// Estimate the RGB buffer size of `geometry` rendered at `dpi`
///
/// `width_pt * height_pt * (dpi/72)^2 * 3 / 1 MiB`
pub fn estimate_size(geometry: &PageGeometry, dpi: u32) -> EstimatedSize {
    let scale = dpi as f64 / 72.0;
    let pixels = geometry.width_points as f64 * geometry.height_points as f64 * scale * scale;
    EstimatedSize(pixels * BYTES_PER_PIXEL / BYTES_PER_MB)
}

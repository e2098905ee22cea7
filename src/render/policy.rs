//! Quality/resolution policy
//!
//! Maps an estimated raster size to a concrete [`RenderConfig`]. Larger pages
//! get lower DPI, lower quality and a smaller long edge, and move from PNG to
//! JPEG. The band table is tunable; only the monotonic shape is relied upon.

use serde::{Deserialize, Serialize};

use super::estimate::EstimatedSize;

/// Image output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

/// Rendering parameters for a single page
///
/// Derived fresh for every page and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub dpi: u32,
    /// Upper bound for the long edge of the output image, in pixels
    pub max_dimension: u32,
    pub format: OutputFormat,
    /// JPEG quality (1-100); ignored for PNG
    pub quality: u8,
    pub optimize_output: bool,
}

impl RenderConfig {
    /// Rasterization scale factor (PDF points are 72 per inch)
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }

    /// Quality if the format uses it
    pub fn jpeg_quality(&self) -> Option<u8> {
        match self.format {
            OutputFormat::Jpeg => Some(self.quality.clamp(1, 100)),
            OutputFormat::Png => None,
        }
    }
}

/// Requested resolution tier
///
/// The tier's DPI is the estimation baseline and caps the DPI any band may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionTier {
    #[default]
    High,
    Standard,
    Draft,
}

impl ResolutionTier {
    pub fn dpi(&self) -> u32 {
        match self {
            ResolutionTier::High => 300,
            ResolutionTier::Standard => 200,
            ResolutionTier::Draft => 150,
        }
    }
}

/// Process memory state as seen by the memory probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryPressure {
    #[default]
    Normal,
    /// Resident memory is above the soft limit
    Elevated,
}

impl MemoryPressure {
    fn extra_steps(&self) -> usize {
        match self {
            MemoryPressure::Normal => 0,
            MemoryPressure::Elevated => 1,
        }
    }
}

/// One row of the policy table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBand {
    /// Inclusive upper bound in MB; `None` matches everything
    pub up_to_mb: Option<f64>,
    pub dpi: u32,
    pub format: OutputFormat,
    pub quality: u8,
    pub max_dimension: u32,
}

impl QualityBand {
    fn matches(&self, estimate: EstimatedSize) -> bool {
        match self.up_to_mb {
            Some(limit) => estimate.megabytes() <= limit,
            None => true,
        }
    }

    /// Build the config for this band, capping DPI at `dpi_cap`
    pub fn to_config(&self, dpi_cap: u32) -> RenderConfig {
        RenderConfig {
            dpi: self.dpi.min(dpi_cap),
            max_dimension: self.max_dimension,
            format: self.format,
            quality: self.quality,
            optimize_output: true,
        }
    }
}

/// Step function from estimated size to render config
#[derive(Debug, Clone)]
pub struct QualityPolicy {
    bands: Vec<QualityBand>,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            bands: vec![
                QualityBand {
                    up_to_mb: Some(5.0),
                    dpi: 300,
                    format: OutputFormat::Png,
                    quality: 100,
                    max_dimension: 4096,
                },
                QualityBand {
                    up_to_mb: Some(8.0),
                    dpi: 200,
                    format: OutputFormat::Jpeg,
                    quality: 85,
                    max_dimension: 2048,
                },
                QualityBand {
                    up_to_mb: Some(15.0),
                    dpi: 175,
                    format: OutputFormat::Jpeg,
                    quality: 80,
                    max_dimension: 2048,
                },
                QualityBand {
                    up_to_mb: None,
                    dpi: 150,
                    format: OutputFormat::Jpeg,
                    quality: 75,
                    max_dimension: 1800,
                },
            ],
        }
    }
}

impl QualityPolicy {
    /// Create a policy from a custom band table
    ///
    /// Bands are matched in order. An empty table falls back to the defaults,
    /// and the last band always acts as the catch-all.
    pub fn with_bands(bands: Vec<QualityBand>) -> Self {
        if bands.is_empty() {
            return Self::default();
        }
        Self { bands }
    }

    pub fn bands(&self) -> &[QualityBand] {
        &self.bands
    }

    /// Pick the config for a page of the given estimated size
    pub fn select(
        &self,
        estimate: EstimatedSize,
        tier: ResolutionTier,
        pressure: MemoryPressure,
    ) -> RenderConfig {
        let last = self.bands.len() - 1;
        let matched = self
            .bands
            .iter()
            .position(|band| band.matches(estimate))
            .unwrap_or(last);
        let index = (matched + pressure.extra_steps()).min(last);

        self.bands[index].to_config(tier.dpi())
    }
}

//! Adaptive page-rendering pipeline
//!
//! Turns an uploaded PDF into base64-encoded page images while keeping at
//! most one page raster resident at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ConversionService                      │
//! │   (spawn_blocking + timeout around the driver)          │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                   PipelineDriver                        │
//! │  Opening → Validating → Rendering(i) → ... → Done       │
//! └─────────────────────────────────────────────────────────┘
//!        │                  │                     │
//!        ▼                  ▼                     ▼
//! ┌──────────────┐  ┌───────────────┐   ┌──────────────────┐
//! │ SizeEstimator│→ │ QualityPolicy │ → │   PageRenderer   │
//! └──────────────┘  └───────────────┘   └──────────────────┘
//!                                                 │
//!                                                 ▼
//!                             ┌──────────────────────────────┐
//!                             │ DocumentSession (one handle) │
//!                             └──────────────────────────────┘
//!                                                 │
//!                                                 ▼
//!                             ┌──────────────────────────────┐
//!                             │ DocumentBackend (MuPDF)      │
//!                             └──────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use pdf_converter_server::render::{MuPdfBackend, PipelineDriver, RenderOptions};
//!
//! let driver = PipelineDriver::new(Arc::new(MuPdfBackend::new()));
//! let result = driver.render_all(&pdf_bytes, &RenderOptions::default())?;
//! assert_eq!(result.pages.len(), result.total_pages);
//! ```

mod backend;
mod encode;
mod error;
mod estimate;
mod memory;
mod mupdf_backend;
mod pipeline;
mod policy;
mod renderer;
mod service;
mod session;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendError, DocumentBackend, DocumentHandle, Raster};
pub use encode::encode_raster;
pub use error::{ConvertError, ConvertResult};
pub use estimate::{estimate_size, EstimatedSize};
pub use memory::{FixedMemoryProbe, MemoryProbe, ProcessMemoryProbe};
pub use mupdf_backend::MuPdfBackend;
pub use pipeline::{PipelineDriver, PipelineLimits, PipelineState, RenderOptions};
pub use policy::{
    MemoryPressure, OutputFormat, QualityBand, QualityPolicy, RenderConfig, ResolutionTier,
};
pub use renderer::PageRenderer;
pub use service::ConversionService;
pub use session::DocumentSession;
pub use types::{
    DocumentPlan, DocumentResult, PageFailureKind, PageGeometry, PagePlan, PageResult,
    SinglePageResult,
};

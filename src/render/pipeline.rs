//! Pipeline driver
//!
//! Orchestrates estimate → policy → render over the requested pages of one
//! document. Pages are rendered strictly one after another; a page failure is
//! recorded and the loop moves on. Only an oversize upload, an unreadable
//! document or an out-of-range page selector fail the whole request.
//!
//! ```text
//! Idle → Opening → Validating → Rendering(0) → ... → Rendering(n-1) → Done
//!           │           │
//!           └───────────┴──────→ Failed
//! ```

use std::sync::Arc;

use serde::Deserialize;

use super::backend::DocumentBackend;
use super::error::{ConvertError, ConvertResult};
use super::estimate::{estimate_size, EstimatedSize};
use super::memory::{MemoryProbe, ProcessMemoryProbe};
use super::policy::{MemoryPressure, QualityPolicy, RenderConfig, ResolutionTier};
use super::renderer::PageRenderer;
use super::session::DocumentSession;
use super::types::{
    DocumentPlan, DocumentResult, PageFailureKind, PageGeometry, PagePlan, PageResult,
    SinglePageResult,
};

/// Default upload ceiling (30 MiB)
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 30 * 1024 * 1024;
/// Default per-page raster budget
pub const DEFAULT_MAX_PAGE_RASTER_MB: f64 = 512.0;

/// Hard limits applied by the driver
#[derive(Debug, Clone)]
pub struct PipelineLimits {
    /// Documents above this size are rejected before decoding
    pub max_document_bytes: usize,
    /// Pages whose raster at the selected DPI would exceed this are skipped
    pub max_page_raster_mb: f64,
    /// Resident memory above this degrades quality by one extra band
    pub memory_soft_limit_bytes: Option<u64>,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_page_raster_mb: DEFAULT_MAX_PAGE_RASTER_MB,
            memory_soft_limit_bytes: None,
        }
    }
}

/// Caller-selectable rendering options
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RenderOptions {
    #[serde(default)]
    pub tier: ResolutionTier,
}

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Opening,
    Validating,
    Rendering(usize),
    Done,
    Failed,
}

/// Which pages to render
#[derive(Debug, Clone, Copy)]
enum PageSelector {
    All,
    One(usize),
}

/// Records state transitions
#[derive(Debug)]
struct StateTracker {
    history: Vec<PipelineState>,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            history: vec![PipelineState::Idle],
        }
    }

    fn current(&self) -> PipelineState {
        self.history
            .last()
            .copied()
            .unwrap_or(PipelineState::Idle)
    }

    fn advance(&mut self, next: PipelineState) {
        tracing::trace!("Pipeline {:?} -> {:?}", self.current(), next);
        self.history.push(next);
    }
}

/// Renders documents page by page under the quality policy
pub struct PipelineDriver {
    backend: Arc<dyn DocumentBackend>,
    policy: QualityPolicy,
    renderer: PageRenderer,
    probe: Arc<dyn MemoryProbe>,
    limits: PipelineLimits,
}

impl PipelineDriver {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            policy: QualityPolicy::default(),
            renderer: PageRenderer::new(),
            probe: Arc::new(ProcessMemoryProbe),
            limits: PipelineLimits::default(),
        }
    }

    pub fn with_policy(mut self, policy: QualityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_limits(mut self, limits: PipelineLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Reject documents above the size ceiling
    pub fn check_size(&self, len: usize) -> ConvertResult<()> {
        if len > self.limits.max_document_bytes {
            return Err(ConvertError::InputTooLarge {
                size: len,
                limit: self.limits.max_document_bytes,
            });
        }
        Ok(())
    }

    /// Render every page, in page order
    pub fn render_all(&self, data: &[u8], options: &RenderOptions) -> ConvertResult<DocumentResult> {
        let (total_pages, pages) = self.run(data, PageSelector::All, options, &mut StateTracker::new())?;
        let result = DocumentResult::from_pages(total_pages, pages);

        tracing::info!(
            "Rendered {}/{} pages ({} failed)",
            result.rendered_pages,
            result.total_pages,
            result.failed_pages.len()
        );
        Ok(result)
    }

    /// Render the page at 0-based `index`
    pub fn render_one(
        &self,
        data: &[u8],
        index: usize,
        options: &RenderOptions,
    ) -> ConvertResult<SinglePageResult> {
        let (total_pages, mut pages) =
            self.run(data, PageSelector::One(index), options, &mut StateTracker::new())?;
        let page = pages
            .pop()
            .ok_or_else(|| ConvertError::Internal(format!("page {} produced no result", index)))?;

        Ok(SinglePageResult { total_pages, page })
    }

    /// Report per-page geometry and the config each page would get, without rendering
    pub fn plan(&self, data: &[u8], options: &RenderOptions) -> ConvertResult<DocumentPlan> {
        self.check_size(data.len())?;
        let mut session = DocumentSession::open(self.backend.as_ref(), data)?;

        let total_pages = session.page_count();
        let mut pages = Vec::with_capacity(total_pages);
        let mut unreadable_pages = Vec::new();

        for index in 0..total_pages {
            match session.page_geometry(index) {
                Ok(geometry) => {
                    let (estimate, config) = self.select_config(&geometry, options);
                    let mut plan = PagePlan::new(geometry, estimate, config);
                    plan.over_budget = self.exceeds_budget(&geometry, &config).is_some();
                    pages.push(plan);
                }
                Err(e) => {
                    tracing::warn!(session = %session.id(), page = index, "Unreadable page geometry: {}", e);
                    unreadable_pages.push(index);
                }
            }
        }

        session.close();
        Ok(DocumentPlan {
            total_pages,
            pages,
            unreadable_pages,
        })
    }

    fn run(
        &self,
        data: &[u8],
        selector: PageSelector,
        options: &RenderOptions,
        tracker: &mut StateTracker,
    ) -> ConvertResult<(usize, Vec<PageResult>)> {
        let outcome = self.drive(data, selector, options, tracker);
        if let Err(e) = &outcome {
            tracker.advance(PipelineState::Failed);
            tracing::debug!("Pipeline failed: {}", e);
        }
        outcome
    }

    fn drive(
        &self,
        data: &[u8],
        selector: PageSelector,
        options: &RenderOptions,
        tracker: &mut StateTracker,
    ) -> ConvertResult<(usize, Vec<PageResult>)> {
        tracker.advance(PipelineState::Opening);
        self.check_size(data.len())?;
        let mut session = DocumentSession::open(self.backend.as_ref(), data)?;

        tracker.advance(PipelineState::Validating);
        let total_pages = session.page_count();
        let indices = match selector {
            PageSelector::All => 0..total_pages,
            PageSelector::One(index) => {
                session.check_page(index)?;
                index..index + 1
            }
        };

        let mut results = Vec::with_capacity(indices.len());
        for index in indices {
            tracker.advance(PipelineState::Rendering(index));
            results.push(self.render_selected(&session, index, options));
        }

        session.close();
        tracker.advance(PipelineState::Done);
        Ok((total_pages, results))
    }

    /// Estimate, pick a config and render one page; never fails the document
    fn render_selected(
        &self,
        session: &DocumentSession,
        index: usize,
        options: &RenderOptions,
    ) -> PageResult {
        let geometry = match session.page_geometry(index) {
            Ok(geometry) => geometry,
            Err(e) => {
                tracing::warn!(session = %session.id(), page = index, "Failed to read page geometry: {}", e);
                return PageResult::failed(
                    index,
                    PageFailureKind::RenderFailed,
                    e.to_string(),
                    options.tier.dpi(),
                );
            }
        };

        let (estimate, config) = self.select_config(&geometry, options);
        if let Some(raster_mb) = self.exceeds_budget(&geometry, &config) {
            tracing::warn!(
                session = %session.id(),
                page = index,
                "Page raster of {:.1} MB exceeds the {:.1} MB budget",
                raster_mb,
                self.limits.max_page_raster_mb
            );
            return PageResult::failed(
                index,
                PageFailureKind::ResourceExhausted,
                format!(
                    "Page raster of {:.1} MB at {} DPI exceeds the {:.1} MB budget",
                    raster_mb, config.dpi, self.limits.max_page_raster_mb
                ),
                config.dpi,
            );
        }

        let result = self.renderer.render(session, index, &config);
        tracing::debug!(
            session = %session.id(),
            page = index,
            estimated_mb = estimate.megabytes(),
            dpi = config.dpi,
            format = ?config.format,
            ok = result.is_success(),
            "Page processed"
        );
        result
    }

    fn select_config(
        &self,
        geometry: &PageGeometry,
        options: &RenderOptions,
    ) -> (EstimatedSize, RenderConfig) {
        let estimate = estimate_size(geometry, options.tier.dpi());
        let config = self.policy.select(estimate, options.tier, self.memory_pressure());
        (estimate, config)
    }

    /// Raster size in MB if it exceeds the per-page budget
    fn exceeds_budget(&self, geometry: &PageGeometry, config: &RenderConfig) -> Option<f64> {
        let raster_mb = estimate_size(geometry, config.dpi).megabytes();
        (raster_mb > self.limits.max_page_raster_mb).then_some(raster_mb)
    }

    fn memory_pressure(&self) -> MemoryPressure {
        match (self.limits.memory_soft_limit_bytes, self.probe.resident_bytes()) {
            (Some(limit), Some(resident)) if resident > limit => MemoryPressure::Elevated,
            _ => MemoryPressure::Normal,
        }
    }
}

//! Application state management

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::render::{ConversionService, DocumentBackend, PipelineDriver, ProcessMemoryProbe};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    converter: ConversionService,
}

impl AppState {
    /// Create application state around a document backend
    pub fn new(config: Config, backend: Arc<dyn DocumentBackend>) -> Self {
        let driver = PipelineDriver::new(backend)
            .with_limits(config.render.pipeline_limits())
            .with_memory_probe(Arc::new(ProcessMemoryProbe));
        Self::with_driver(config, driver)
    }

    /// Create application state around a preconfigured driver
    pub fn with_driver(config: Config, driver: PipelineDriver) -> Self {
        let converter = ConversionService::new(
            driver,
            Duration::from_secs(config.render.request_timeout_secs),
        );
        Self {
            inner: Arc::new(AppStateInner { config, converter }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the conversion service
    pub fn converter(&self) -> &ConversionService {
        &self.inner.converter
    }
}

//! Async facade over the pipeline driver
//!
//! Decoding and encoding are CPU/memory-bound, so every conversion runs on
//! tokio's blocking pool. A timeout bounds how long the request waits; the
//! blocking thread itself runs to completion since the pipeline has no
//! cancellation point.

use std::sync::Arc;

use tokio::time::{timeout, Duration};

use super::error::{ConvertError, ConvertResult};
use super::pipeline::{PipelineDriver, RenderOptions};
use super::types::{DocumentPlan, DocumentResult, SinglePageResult};

#[derive(Clone)]
pub struct ConversionService {
    driver: Arc<PipelineDriver>,
    timeout: Duration,
}

impl ConversionService {
    pub fn new(driver: PipelineDriver, timeout: Duration) -> Self {
        Self {
            driver: Arc::new(driver),
            timeout,
        }
    }

    pub async fn render_all<D>(&self, data: D, options: RenderOptions) -> ConvertResult<DocumentResult>
    where
        D: AsRef<[u8]> + Send + 'static,
    {
        self.driver.check_size(data.as_ref().len())?;
        self.run_blocking(move |driver| driver.render_all(data.as_ref(), &options))
            .await
    }

    pub async fn render_one<D>(
        &self,
        data: D,
        index: usize,
        options: RenderOptions,
    ) -> ConvertResult<SinglePageResult>
    where
        D: AsRef<[u8]> + Send + 'static,
    {
        self.driver.check_size(data.as_ref().len())?;
        self.run_blocking(move |driver| driver.render_one(data.as_ref(), index, &options))
            .await
    }

    pub async fn plan<D>(&self, data: D, options: RenderOptions) -> ConvertResult<DocumentPlan>
    where
        D: AsRef<[u8]> + Send + 'static,
    {
        self.driver.check_size(data.as_ref().len())?;
        self.run_blocking(move |driver| driver.plan(data.as_ref(), &options))
            .await
    }

    async fn run_blocking<T, F>(&self, f: F) -> ConvertResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&PipelineDriver) -> ConvertResult<T> + Send + 'static,
    {
        let driver = Arc::clone(&self.driver);
        let result = timeout(
            self.timeout,
            tokio::task::spawn_blocking(move || f(&driver)),
        )
        .await;

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => Err(ConvertError::Internal(format!("Task join error: {}", e))),
            Err(_) => {
                tracing::error!("Conversion timed out after {:?}", self.timeout);
                Err(ConvertError::Timeout(self.timeout))
            }
        }
    }
}

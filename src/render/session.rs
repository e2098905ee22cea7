//! Document session
//!
//! Owns one open [`DocumentHandle`] for the duration of one request. The
//! handle is released exactly once: by an explicit [`DocumentSession::close`]
//! or, on any early return, when the session is dropped.

use uuid::Uuid;

use super::backend::{BackendError, DocumentBackend, DocumentHandle, Raster};
use super::error::{ConvertError, ConvertResult};
use super::types::PageGeometry;

pub struct DocumentSession {
    id: Uuid,
    handle: Box<dyn DocumentHandle>,
    page_count: usize,
    closed: bool,
}

impl DocumentSession {
    /// Open `data` with `backend` and read its page count
    pub fn open(backend: &dyn DocumentBackend, data: &[u8]) -> ConvertResult<Self> {
        let handle = backend.open(data).map_err(ConvertError::from_open)?;

        // The session owns the handle from here on, so a failure below
        // still releases it on drop.
        let mut session = Self {
            id: Uuid::new_v4(),
            handle,
            page_count: 0,
            closed: false,
        };
        session.page_count = session
            .handle
            .page_count()
            .map_err(ConvertError::from_open)?;

        tracing::debug!(
            session = %session.id,
            pages = session.page_count,
            bytes = data.len(),
            "Document session opened"
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Fail with `PageOutOfRange` unless `index` names a page
    pub fn check_page(&self, index: usize) -> ConvertResult<()> {
        if index >= self.page_count {
            return Err(ConvertError::PageOutOfRange {
                index,
                page_count: self.page_count,
            });
        }
        Ok(())
    }

    pub fn page_geometry(&self, index: usize) -> Result<PageGeometry, BackendError> {
        self.live_page(index)?;
        self.handle.page_geometry(index)
    }

    pub fn rasterize(&self, index: usize, scale: f32) -> Result<Raster, BackendError> {
        self.live_page(index)?;
        self.handle.rasterize(index, scale)
    }

    /// Release the document handle; later calls are no-ops
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.handle.close();
        self.closed = true;
        tracing::debug!(session = %self.id, "Document session closed");
    }

    fn live_page(&self, index: usize) -> Result<(), BackendError> {
        if self.closed {
            return Err(BackendError::Closed);
        }
        if index >= self.page_count {
            return Err(BackendError::PageNotFound {
                index,
                page_count: self.page_count,
            });
        }
        Ok(())
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::FakeBackend;

    #[test]
    fn test_open_reports_page_count() {
        let backend = FakeBackend::letter(3);
        let session = DocumentSession::open(&backend, b"%PDF-1.7").unwrap();
        assert_eq!(session.page_count(), 3);
        assert!(session.check_page(2).is_ok());
        assert!(matches!(
            session.check_page(3),
            Err(ConvertError::PageOutOfRange { index: 3, page_count: 3 })
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let backend = FakeBackend::letter(1);
        let mut session = DocumentSession::open(&backend, b"%PDF-1.7").unwrap();

        session.close();
        session.close();
        assert!(session.is_closed());
        drop(session);

        assert_eq!(backend.counters.opens(), 1);
        assert_eq!(backend.counters.closes(), 1);
    }

    #[test]
    fn test_drop_releases_handle() {
        let backend = FakeBackend::letter(2);
        {
            let _session = DocumentSession::open(&backend, b"%PDF-1.7").unwrap();
        }
        assert_eq!(backend.counters.closes(), 1);
    }

    #[test]
    fn test_partial_open_failure_releases_handle() {
        let backend = FakeBackend::letter(2).failing_page_count();
        let result = DocumentSession::open(&backend, b"%PDF-1.7");

        assert!(matches!(result, Err(ConvertError::DocumentInvalid(_))));
        assert_eq!(backend.counters.opens(), 1);
        assert_eq!(backend.counters.closes(), 1);
    }

    #[test]
    fn test_invalid_bytes() {
        let backend = FakeBackend::letter(1);
        let result = DocumentSession::open(&backend, b"hello");

        assert!(matches!(result, Err(ConvertError::DocumentInvalid(_))));
        // Nothing was opened, so nothing to release
        assert_eq!(backend.counters.closes(), 0);
    }

    #[test]
    fn test_closed_session_rejects_rendering() {
        let backend = FakeBackend::letter(1);
        let mut session = DocumentSession::open(&backend, b"%PDF-1.7").unwrap();
        session.close();

        assert!(matches!(session.rasterize(0, 1.0), Err(BackendError::Closed)));
        assert!(matches!(session.page_geometry(0), Err(BackendError::Closed)));
    }
}

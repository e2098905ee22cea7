//! PDF conversion endpoints
//!
//! - `POST /convert` renders every page (or `?page=N`, 0-based, for one)
//! - `POST /convert/plan` reports page geometry and the render config each
//!   page would get, without rasterizing
//!
//! Both take a multipart upload with the document in the `file` (or `pdf`)
//! field. `?tier=high|standard|draft` selects the resolution tier.

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartError, rejection::QueryRejection, DefaultBodyLimit, Multipart, Query,
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::render::{DocumentPlan, RenderOptions, ResolutionTier};
use crate::state::AppState;

/// Room for multipart framing on top of the document ceiling
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Query parameters for conversion
#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuery {
    /// 0-based page index; all pages when absent
    pub page: Option<usize>,
    #[serde(default)]
    pub tier: ResolutionTier,
}

impl ConvertQuery {
    fn options(&self) -> RenderOptions {
        RenderOptions { tier: self.tier }
    }
}

/// Create the conversion router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(convert))
        .route("/plan", post(plan))
        .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD_BYTES))
}

/// Render all pages, or the one named by `?page=`
async fn convert(
    State(state): State<AppState>,
    query: Result<Query<ConvertQuery>, QueryRejection>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(query_error)?;
    let data = read_upload(multipart).await?;
    let converter = state.converter();

    match query.page {
        Some(page) => {
            tracing::debug!("Rendering page {} of {} byte upload", page, data.len());
            let result = converter.render_one(data, page, query.options()).await?;
            Ok(Json(result).into_response())
        }
        None => {
            tracing::debug!("Rendering all pages of {} byte upload", data.len());
            let result = converter.render_all(data, query.options()).await?;
            Ok(Json(result).into_response())
        }
    }
}

/// Describe what `convert` would do
async fn plan(
    State(state): State<AppState>,
    query: Result<Query<ConvertQuery>, QueryRejection>,
    multipart: Multipart,
) -> Result<Json<DocumentPlan>, AppError> {
    let Query(query) = query.map_err(query_error)?;
    let data = read_upload(multipart).await?;
    let plan = state.converter().plan(data, query.options()).await?;
    Ok(Json(plan))
}

/// Pull the document bytes out of the multipart body
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());

        tracing::debug!(
            "Received field: name='{}', filename={:?}, content_type={:?}",
            name,
            filename,
            content_type
        );

        if name != "file" && name != "pdf" {
            continue;
        }

        if filename.as_deref() == Some("") {
            return Err(AppError::BadRequest("No selected file".to_string()));
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        tracing::debug!("Read {} bytes of file data", data.len());
        return Ok(data);
    }

    tracing::warn!("No file field found in multipart upload");
    Err(AppError::BadRequest("No file part".to_string()))
}

fn query_error(e: QueryRejection) -> AppError {
    AppError::BadRequest(e.body_text())
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        tracing::error!("Failed to read multipart upload: {}", e);
        AppError::BadRequest(format!("Failed to read upload: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde_json::Value;

    use crate::config::Config;
    use crate::render::testing::FakeBackend;
    use crate::render::{DocumentResult, FixedMemoryProbe, PipelineDriver, SinglePageResult};
    use crate::routes::app;
    use crate::state::AppState;

    fn server_with(backend: Arc<FakeBackend>, config: Config) -> TestServer {
        let driver = PipelineDriver::new(backend)
            .with_limits(config.render.pipeline_limits())
            .with_memory_probe(Arc::new(FixedMemoryProbe::new(0)));
        TestServer::new(app(AppState::with_driver(config, driver))).unwrap()
    }

    fn server(backend: Arc<FakeBackend>) -> TestServer {
        server_with(backend, Config::default())
    }

    fn upload(data: &[u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(data.to_vec())
                .file_name("document.pdf")
                .mime_type("application/pdf"),
        )
    }

    fn small_pages(count: usize) -> Arc<FakeBackend> {
        Arc::new(FakeBackend::with_pages(&vec![(72.0, 72.0); count]))
    }

    #[tokio::test]
    async fn test_convert_all_pages() {
        let backend = small_pages(3);
        let response = server(backend.clone())
            .post("/convert")
            .multipart(upload(b"%PDF-1.7"))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let result: DocumentResult = response.json();
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.pages.len(), 3);

        let png = BASE64.decode(result.pages[0].image.as_ref().unwrap()).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        assert_eq!(backend.counters.closes(), 1);
    }

    #[tokio::test]
    async fn test_convert_reports_failed_pages() {
        let backend = Arc::new(FakeBackend::with_pages(&vec![(72.0, 72.0); 3]).failing_page(1));
        let response = server(backend)
            .post("/convert")
            .multipart(upload(b"%PDF-1.7"))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let json: Value = response.json();
        assert_eq!(json["failed_pages"], serde_json::json!([1]));
        assert_eq!(json["rendered_pages"], 2);
        assert!(json["pages"][1].get("image").is_none());
        assert_eq!(json["pages"][1]["error_kind"], "render_failed");
    }

    #[tokio::test]
    async fn test_convert_single_page() {
        let response = server(small_pages(4))
            .post("/convert")
            .add_query_param("page", 2)
            .multipart(upload(b"%PDF-1.7"))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let result: SinglePageResult = response.json();
        assert_eq!(result.total_pages, 4);
        assert_eq!(result.page.page_index, 2);
        assert!(result.page.is_success());
    }

    #[tokio::test]
    async fn test_convert_page_out_of_range() {
        let response = server(small_pages(2))
            .post("/convert")
            .add_query_param("page", 2)
            .multipart(upload(b"%PDF-1.7"))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let json: Value = response.json();
        assert_eq!(json["error"], "page_out_of_range");
        assert!(json.get("pages").is_none());
    }

    #[tokio::test]
    async fn test_convert_invalid_document() {
        let response = server(small_pages(1))
            .post("/convert")
            .multipart(upload(b"not a pdf at all"))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let json: Value = response.json();
        assert_eq!(json["error"], "document_invalid");
    }

    #[tokio::test]
    async fn test_convert_oversize_document() {
        let backend = small_pages(1);
        let mut config = Config::default();
        config.render.max_upload_mb = 1;

        let mut data = b"%PDF-1.7\n".to_vec();
        data.resize(1024 * 1024 + 512, b' ');

        let response = server_with(backend.clone(), config)
            .post("/convert")
            .multipart(upload(&data))
            .await;

        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        let json: Value = response.json();
        assert_eq!(json["error"], "input_too_large");
        assert_eq!(backend.counters.opens(), 0);
    }

    #[tokio::test]
    async fn test_convert_missing_file() {
        let form = MultipartForm::new().add_text("comment", "no document here");
        let response = server(small_pages(1)).post("/convert").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let json: Value = response.json();
        assert_eq!(json["message"], "No file part");
    }

    #[tokio::test]
    async fn test_convert_accepts_pdf_field_and_tier() {
        let form = MultipartForm::new().add_part(
            "pdf",
            Part::bytes(b"%PDF-1.7".to_vec()).file_name("scan.pdf"),
        );
        let response = server(small_pages(1))
            .post("/convert")
            .add_query_param("tier", "draft")
            .multipart(form)
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let result: DocumentResult = response.json();
        assert_eq!(result.pages[0].dpi, 150);
    }

    #[tokio::test]
    async fn test_plan() {
        let backend = Arc::new(FakeBackend::with_pages(&[(72.0, 72.0), (612.0, 792.0)]));
        let response = server(backend.clone())
            .post("/convert/plan")
            .multipart(upload(b"%PDF-1.7"))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let json: Value = response.json();
        assert_eq!(json["total_pages"], 2);
        assert_eq!(json["pages"][0]["config"]["format"], "png");
        assert_eq!(json["pages"][1]["config"]["format"], "jpeg");
        assert_eq!(backend.counters.rasterizations(), 0);
        assert_eq!(backend.counters.closes(), 1);
    }

    #[tokio::test]
    async fn test_convert_empty_filename() {
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"%PDF-1.7".to_vec()).file_name(""),
        );
        let backend = small_pages(1);
        let response = server(backend.clone()).post("/convert").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let json: Value = response.json();
        assert_eq!(json["error"], "bad_request");
        assert_eq!(json["message"], "No selected file");
        assert_eq!(backend.counters.opens(), 0);
    }

    #[tokio::test]
    async fn test_invalid_query_is_json_error() {
        let server = server(small_pages(1));

        for (key, value) in [("page", "-1"), ("tier", "ultra")] {
            let response = server
                .post("/convert")
                .add_query_param(key, value)
                .multipart(upload(b"%PDF-1.7"))
                .await;

            assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
            let json: Value = response.json();
            assert_eq!(json["error"], "bad_request");
        }

        let response = server
            .post("/convert/plan")
            .add_query_param("tier", "ultra")
            .multipart(upload(b"%PDF-1.7"))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let json: Value = response.json();
        assert_eq!(json["error"], "bad_request");
    }
}

//! Error types for the PDF converter server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::render::ConvertError;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConvertError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "input_too_large", msg.clone())
            }
            AppError::Conversion(e) => {
                let message = e.to_string();
                match e {
                    ConvertError::InputTooLarge { .. } => {
                        (StatusCode::PAYLOAD_TOO_LARGE, "input_too_large", message)
                    }
                    ConvertError::DocumentInvalid(_) => {
                        tracing::warn!("Rejected document: {}", e);
                        (StatusCode::BAD_REQUEST, "document_invalid", message)
                    }
                    ConvertError::PageOutOfRange { .. } => {
                        (StatusCode::BAD_REQUEST, "page_out_of_range", message)
                    }
                    ConvertError::ResourceExhausted(_) => {
                        tracing::error!("Resource exhausted opening document: {}", e);
                        (StatusCode::SERVICE_UNAVAILABLE, "resource_exhausted", message)
                    }
                    ConvertError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout", message),
                    ConvertError::Internal(_) => {
                        tracing::error!("Conversion error: {}", e);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "internal_error",
                            "An internal error occurred".to_string(),
                        )
                    }
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}

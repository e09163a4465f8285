//! Unified API error handling
//!
//! This module provides a consistent error response format across all API endpoints.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::cors_headers;

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent error handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Request body carried no usable files array (400)
    #[error("files array is required")]
    MissingFiles,

    /// Neither provider credential is configured (500)
    #[error("No analysis provider configured (missing OPENAI_API_KEY and ANTHROPIC_API_KEY)")]
    NoProviderConfigured,

    /// Request body could not be read as JSON (400)
    #[error("Error during parsing: {0}")]
    Parsing(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFiles | ApiError::Parsing(_) => StatusCode::BAD_REQUEST,
            ApiError::NoProviderConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = match self {
            ApiError::MissingFiles => "missing_files",
            ApiError::NoProviderConfigured => "no_provider_configured",
            ApiError::Parsing(_) => "parsing_error",
        };

        tracing::error!(
            error_type = error_type,
            status = status.as_u16(),
            message = %self,
            "API error"
        );

        cors_headers(&mut HttpResponse::build(status)).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

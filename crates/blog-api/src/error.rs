//! API error handling
//!
//! Service errors are mapped to HTTP by their [`ErrorClass`]. Internal
//! errors are logged with their full source chain here and reach the client
//! only as an opaque 500.
//!
//! Author: hephaex@gmail.com

use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blog_core::{BlogError, ErrorClass, ErrorKind};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// A service failure
    Service(BlogError),
    /// Request body failed its shape checks
    BadRequest(String),
}

fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Authentication => StatusCode::UNAUTHORIZED,
        ErrorClass::Forbidden => StatusCode::FORBIDDEN,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn source_chain(err: &dyn StdError) -> String {
    let mut chain = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        chain.push_str(": ");
        chain.push_str(&source.to_string());
        current = source.source();
    }
    chain
}

impl AppError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Service(err) => Some(err.kind()),
            AppError::BadRequest(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::bad_request("Malformed request").with_details(msg),
            ),
            AppError::Service(err) => {
                let class = err.class();
                if class == ErrorClass::Internal {
                    tracing::error!(error = %source_chain(&err), "Request failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
                } else {
                    let kind = err.kind();
                    (status_for(class), ApiError::new(kind.code(), kind.to_string()))
                }
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<BlogError> for AppError {
    fn from(err: BlogError) -> Self {
        AppError::Service(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

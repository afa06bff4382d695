// src/services/api_error.rs
//! HTTP error mapping for the API server.
//!
//! Converts registry and directory errors into status codes with a JSON body
//! of the form `{ "error": { "code": "...", "message": "..." } }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{DirectoryError, RegistryError};

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `NOT_FOUND`
    pub code: String,
    pub message: String,
}

/// Errors a handler can return.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Mutating request without an `X-Caller` header.
    #[error("missing or invalid X-Caller header")]
    MissingCaller,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Registry(RegistryError::Unauthorized(_)) => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
            Self::Registry(RegistryError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Registry(RegistryError::Untrusted { .. }) => (StatusCode::UNPROCESSABLE_ENTITY, "UNTRUSTED"),
            Self::Registry(RegistryError::Malformed(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED"),
            Self::Directory(DirectoryError::NotOwner(_)) => (StatusCode::FORBIDDEN, "NOT_OWNER"),
            Self::Directory(DirectoryError::AlreadyTrusted(_)) => (StatusCode::CONFLICT, "ALREADY_TRUSTED"),
            Self::Directory(DirectoryError::UnknownIssuer(_)) => (StatusCode::NOT_FOUND, "UNKNOWN_ISSUER"),
            Self::Directory(DirectoryError::Invalid(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_ISSUER"),
            Self::MissingCaller => (StatusCode::UNAUTHORIZED, "MISSING_CALLER"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            Self::Internal(detail) => {
                error!("Internal API error: {}", detail);
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

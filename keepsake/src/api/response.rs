//! # Error contract
//!
//! Successful responses carry the documented schema as the bare JSON body so
//! the mobile client can decode them directly. Every error uses one envelope:
//!
//! ```json
//! { "error": { "code": "invalid_request", "message": "...", "field": "title" } }
//! ```
//!
//! `field` is only present for validation failures that can name the
//! offending input.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::KeepsakeError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire. Each variant maps to a
/// fixed HTTP status code via [`ErrorCode::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request was malformed or failed validation. HTTP 400.
    InvalidRequest,
    /// An image payload could not be decoded. HTTP 400.
    InvalidMedia,
    /// The requested memory or media does not exist. HTTP 404.
    NotFound,
    /// A random memory was requested but none are stored. HTTP 404.
    EmptyStore,
    /// An unexpected server-side error occurred. Details are never leaked. HTTP 500.
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::InvalidMedia => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::EmptyStore => StatusCode::NOT_FOUND,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::InvalidMedia => write!(f, "invalid_media"),
            Self::NotFound => write!(f, "not_found"),
            Self::EmptyStore => write!(f, "empty_store"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

/// Structured error payload.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to show to end users.
    pub message: String,
    /// Dotted path of the offending input, for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Wire wrapper for [`ApiError`].
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ApiError {
                code,
                message: message.into(),
                field: None,
            },
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.error.field = Some(field.into());
        self
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        (self.error.code.status(), Json(self)).into_response()
    }
}

impl From<KeepsakeError> for ErrorEnvelope {
    /// Internal error details are never sent to the client; they are logged
    /// and replaced by a generic message.
    fn from(err: KeepsakeError) -> Self {
        match err {
            KeepsakeError::Validation { field, message } => {
                ErrorEnvelope::new(ErrorCode::InvalidRequest, message).with_field(field)
            }

            KeepsakeError::Decode { field, message } => {
                ErrorEnvelope::new(ErrorCode::InvalidMedia, message).with_field(field)
            }

            KeepsakeError::NotFound(ref what) => {
                ErrorEnvelope::new(ErrorCode::NotFound, format!("{what} not found"))
            }

            KeepsakeError::EmptyStore => {
                ErrorEnvelope::new(ErrorCode::EmptyStore, "No memories have been stored yet")
            }

            ref internal @ (KeepsakeError::Database(_)
            | KeepsakeError::Json(_)
            | KeepsakeError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to response");
                ErrorEnvelope::new(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::ErrorEnvelope;

#[derive(Error, Debug)]
pub enum KeepsakeError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No memories have been stored yet")]
    EmptyStore,

    #[error("Validation error on `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("Media decode error on `{field}`: {message}")]
    Decode { field: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl KeepsakeError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn decode(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Report the first failing field of a `validator` run.
    ///
    /// `field_order` lists fields in declaration order; fields missing from it
    /// are ranked after the listed ones, by name.
    pub fn from_validation(errors: validator::ValidationErrors, field_order: &[&str]) -> Self {
        let rank = |field: &str| {
            field_order
                .iter()
                .position(|f| *f == field)
                .unwrap_or(field_order.len())
        };

        let mut fields: Vec<_> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| (field.to_string(), errs.first().cloned()))
            .collect();
        fields.sort_by(|a, b| rank(&a.0).cmp(&rank(&b.0)).then_with(|| a.0.cmp(&b.0)));

        match fields.into_iter().next() {
            Some((field, Some(err))) => {
                let message = match (&err.message, err.code.as_ref()) {
                    (Some(message), _) => message.to_string(),
                    (None, "length") => match (err.params.get("min"), err.params.get("max")) {
                        (_, Some(max)) => format!("must have length at most {max}"),
                        (Some(min), None) => format!("must have length at least {min}"),
                        _ => "has an invalid length".to_string(),
                    },
                    (None, code) => format!("failed `{code}` check"),
                };
                Self::validation(field, message)
            }
            Some((field, None)) => Self::validation(field, "is invalid"),
            None => Self::validation("body", "is invalid"),
        }
    }
}

impl IntoResponse for KeepsakeError {
    fn into_response(self) -> Response {
        ErrorEnvelope::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, KeepsakeError>;

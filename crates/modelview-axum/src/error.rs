//! Axum-specific error types and mappings.
//!
//! This module maps `CrudError` and `RenderError` to HTTP status codes and
//! the `{message, errors}` JSON body. HTML clients get a bare status
//! instead, see [`HttpError::for_html`].

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use modelview_core::{CrudError, DictError, RenderError, RepositoryError};
use serde::Serialize;
use thiserror::Error;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request with a message and optional per-field errors.
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        errors: BTreeMap<String, String>,
    },

    /// No template available for an HTML client.
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    /// Internal server error. The detail is logged, never sent.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Bare status for clients that did not ask for JSON.
    #[error("{0}")]
    Abort(StatusCode),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
    errors: BTreeMap<String, String>,
}

impl HttpError {
    /// A 400 with a message and no field errors.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            errors: BTreeMap::new(),
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Abort(status) => *status,
        }
    }

    /// Reduce this error to a bare status, as raised for HTML clients.
    #[must_use]
    pub fn for_html(self) -> Self {
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed");
        }
        Self::Abort(self.status())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            Self::NotFound(msg) | Self::NotAcceptable(msg) => (msg, BTreeMap::new()),
            Self::BadRequest { message, errors } => (message, errors),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                ("Unknown error".to_string(), BTreeMap::new())
            }
            Self::Abort(status) => {
                let reason = status.canonical_reason().unwrap_or("Error");
                return (status, reason.to_string()).into_response();
            }
        };

        (status, axum::Json(ErrorBody { message, errors })).into_response()
    }
}

impl From<CrudError> for HttpError {
    fn from(err: CrudError) -> Self {
        match err {
            CrudError::NotFound(msg) => Self::NotFound(msg),
            CrudError::Invalid(invalid) => Self::BadRequest {
                message: "Invalid data".to_string(),
                errors: invalid.asdict().clone(),
            },
            CrudError::BadRequest(param) => Self::bad_request(param.to_string()),
            CrudError::Dict(dict_err) => dict_err.into(),
            CrudError::Repository(repo_err) => repo_err.into(),
        }
    }
}

impl From<DictError> for HttpError {
    fn from(err: DictError) -> Self {
        // Validated data that still does not fit the model is a view bug.
        Self::Internal(format!("Dict: {err}"))
    }
}

impl From<RepositoryError> for HttpError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => Self::NotFound(msg),
            RepositoryError::UniqueViolation { column } => Self::BadRequest {
                message: format!("'{column}' already exists"),
                errors: BTreeMap::from([(column, "Already exists".to_string())]),
            },
            RepositoryError::Constraint(msg) => Self::bad_request(msg),
            RepositoryError::Storage(msg) => Self::Internal(format!("Storage: {msg}")),
            RepositoryError::Serialization(msg) => {
                Self::Internal(format!("Serialization: {msg}"))
            }
        }
    }
}

impl From<RenderError> for HttpError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::TemplateNotFound(name) => {
                Self::NotAcceptable(format!("No template '{name}'"))
            }
            RenderError::Failed(msg) => Self::Internal(format!("Render: {msg}")),
        }
    }
}

//! Mapping from core failures to HTTP responses.

use api_shared::ErrorRes;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use outreach_core::{ErrorKind, PatientError};

/// Error returned by every handler; always rendered as an [`ErrorRes`] body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorRes,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            status,
            body: ErrorRes {
                message: message.into(),
                error,
            },
        }
    }

    /// Failure outside the core, such as a panicked blocking task.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!("request failed: {}", cause);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            Some(cause.to_string()),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        match err.kind() {
            ErrorKind::ValidationFailure => Self::new(
                StatusCode::BAD_REQUEST,
                "Invalid request",
                Some(err.to_string()),
            ),
            ErrorKind::AuthFailure => Self::new(StatusCode::UNAUTHORIZED, err.to_string(), None),
            ErrorKind::NotFound => Self::new(StatusCode::NOT_FOUND, err.to_string(), None),
            ErrorKind::DuplicateIdentity => {
                Self::new(StatusCode::CONFLICT, err.to_string(), None)
            }
            ErrorKind::InternalFailure => Self::internal(&err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "Invalid request body",
            Some(rejection.body_text()),
        )
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "Invalid path parameter",
            Some(rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

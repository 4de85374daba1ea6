//! Error types for stockbook-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use stockbook_core::CoreError;
use stockbook_export::ExportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Internal server error")]
    InternalError,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::ReferenceNotFound { .. } => ApiError::NotFound {
                resource: error.to_string(),
            },
            CoreError::ValidationError { .. }
            | CoreError::UnknownReferenceKind { .. }
            | CoreError::InvalidFormat { .. } => ApiError::BadRequest {
                message: error.to_string(),
            },
            CoreError::IoError | CoreError::InternalError { .. } => {
                log::error!("Core failure: {}", error);
                ApiError::InternalError
            }
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(error: ExportError) -> Self {
        match error {
            ExportError::NoData | ExportError::UnknownFormat { .. } => ApiError::BadRequest {
                message: error.to_string(),
            },
            ExportError::Csv(_) | ExportError::Io(_) | ExportError::InvalidUtf8 => {
                log::error!("Export failure: {}", error);
                ApiError::InternalError
            }
        }
    }
}

use crate::posts::{StoreError, ValidationErrors};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Validation failed")]
    ValidationFailed(ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MalformedBody(_) | ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Unauthenticated => json!({ "message": "Unauthenticated." }),
            ApiError::ValidationFailed(errors) => json!({
                "message": "The given data was invalid.",
                "errors": errors,
            }),
            ApiError::NotFound(_) | ApiError::MalformedBody(_) | ApiError::InvalidQuery(_) => {
                json!({ "message": self.to_string() })
            }
            ApiError::Store(e) => {
                tracing::error!("Store error: {}", e);
                json!({ "message": "Server Error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

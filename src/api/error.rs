use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{engine::BankError, store::StoreError, validation::ValidationError};

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error("An unexpected error occurred: {0}")]
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Bank(err.into())
    }
}

// malformed request bodies are reported like any other invalid input
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::new(rejection.body_text()).into()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub timestamp: String,
    pub status: u16,
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Bank(BankError::AccountNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Bank(BankError::Validation(_))
            | ApiError::Bank(BankError::InsufficientBalance { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Bank(BankError::DuplicateResource(_)) => StatusCode::CONFLICT,
            ApiError::Bank(BankError::Store(err)) if err.is_retriable() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Bank(BankError::Store(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Bank(BankError::Store(err @ StoreError::Unavailable(_))) => {
                format!("An unexpected error occurred: {err}")
            }
            other => other.to_string(),
        };
        if status.is_server_error() {
            error!(%status, %message, "request failed");
        }
        let body = ErrorBody {
            timestamp: Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown"),
            message,
        };
        (status, Json(body)).into_response()
    }
}

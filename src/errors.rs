use crate::services::{item_store::StoreError, record_store::StorageError};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(_) => AppError::bad_request(err.to_string()),
            StoreError::NotFound(_) => AppError::not_found(err.to_string()),
            StoreError::Storage(inner) => inner.into(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::PhotoNotFound(_) => AppError::not_found(err.to_string()),
            other => {
                tracing::error!("storage failure: {}", other);
                AppError::internal(other.to_string())
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::ItemId;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (
                StoreError::Validation("itemName must not be empty".into()),
                StatusCode::BAD_REQUEST,
            ),
            (StoreError::NotFound(ItemId::from("x")), StatusCode::NOT_FOUND),
            (
                StoreError::Storage(StorageError::PhotoNotFound("p.png".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                StoreError::Storage(StorageError::Unavailable("disk full".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }
}

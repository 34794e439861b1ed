//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::handlers::TransferError;
use crate::store::StoreError;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("Transfer not found: {0}")]
    TransferNotFound(i64),

    // Transfer errors
    #[error(transparent)]
    Transfer(#[from] TransferError),

    // Server errors (5xx)
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => AppError::AccountNotFound(id),
            StoreError::TransferNotFound(id) => AppError::TransferNotFound(id),
            other => AppError::Store(other),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::AccountNotFound(id) => {
                (StatusCode::NOT_FOUND, "account_not_found", Some(id.to_string()))
            }
            AppError::TransferNotFound(id) => {
                (StatusCode::NOT_FOUND, "transfer_not_found", Some(id.to_string()))
            }

            // Transfer errors: client faults keep their details, server faults are logged
            AppError::Transfer(transfer_err) if transfer_err.is_client_error() => {
                match transfer_err {
                    TransferError::AccountNotFound(id) => {
                        (StatusCode::NOT_FOUND, "account_not_found", Some(id.to_string()))
                    }
                    other => (
                        StatusCode::BAD_REQUEST,
                        "invalid_transfer",
                        Some(other.to_string()),
                    ),
                }
            }
            AppError::Transfer(transfer_err) => {
                tracing::error!("Transfer error: {:?}", transfer_err);
                let error_code = match transfer_err {
                    TransferError::Transaction(_) => "transaction_error",
                    _ => "repository_error",
                };
                (StatusCode::INTERNAL_SERVER_ERROR, error_code, None)
            }

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::TxError;
    use crate::domain::ValidationError;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_transfer_errors_map_to_status_codes() {
        assert_eq!(
            status_of(TransferError::Validation(ValidationError::SameAccountTransfer(1)).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(TransferError::AccountNotFound(1).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(TransferError::Transaction(TxError::Commit(StoreError::Database(
                sqlx::Error::PoolClosed
            )))
            .into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(TransferError::Repository(StoreError::BalanceOverflow(1)).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    async fn body_of(err: AppError) -> serde_json::Value {
        let bytes = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_transfer_errors_keep_details() {
        let body = body_of(TransferError::AccountNotFound(12).into()).await;
        assert_eq!(body["error_code"], "account_not_found");
        assert_eq!(body["details"], "12");

        let body =
            body_of(TransferError::Validation(ValidationError::NonPositiveAmount(0)).into()).await;
        assert_eq!(body["error_code"], "invalid_transfer");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_server_transfer_errors_hide_details() {
        let body = body_of(TransferError::Repository(StoreError::BalanceOverflow(4)).into()).await;
        assert_eq!(body["error_code"], "repository_error");
        assert!(body.get("details").is_none());

        let body = body_of(
            TransferError::Transaction(TxError::Begin(StoreError::Database(
                sqlx::Error::PoolTimedOut,
            )))
            .into(),
        )
        .await;
        assert_eq!(body["error_code"], "transaction_error");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        assert_eq!(
            status_of(StoreError::AccountNotFound(3).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(StoreError::Database(sqlx::Error::PoolTimedOut).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

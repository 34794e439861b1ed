//! Transfer Errors
//!
//! Failure taxonomy surfaced by the transfer handler.

use crate::coordinator::TxError;
use crate::domain::ValidationError;
use crate::store::StoreError;

/// Errors that can occur while executing a transfer
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Malformed request; no transaction was opened
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced account does not exist; nothing was persisted
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    /// Begin, commit or rollback failed
    #[error("Transaction error: {0}")]
    Transaction(TxError<StoreError>),

    /// Any other repository failure; the transaction was rolled back
    #[error("Repository error: {0}")]
    Repository(StoreError),
}

impl TransferError {
    /// Check if this error is the caller's fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TransferError::Validation(_) | TransferError::AccountNotFound(_)
        )
    }
}

impl From<TxError<StoreError>> for TransferError {
    fn from(err: TxError<StoreError>) -> Self {
        match err {
            TxError::Operation(StoreError::AccountNotFound(id)) => {
                TransferError::AccountNotFound(id)
            }
            TxError::Operation(other) => TransferError::Repository(other),
            other => TransferError::Transaction(other),
        }
    }
}

//! Store Errors
//!
//! Error types for ledger repository operations.

/// Errors that can occur in the ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    /// Transfer record does not exist
    #[error("Transfer not found: {0}")]
    TransferNotFound(i64),

    /// Balance delta would overflow the account balance
    #[error("Balance overflow on account {0}")]
    BalanceOverflow(i64),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

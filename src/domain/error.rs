//! Domain Error Types
//!
//! Request validation failures. These never touch the database.

use thiserror::Error;

/// Malformed transfer request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Transfer amount must be strictly positive
    #[error("Invalid amount: must be positive (got {0})")]
    NonPositiveAmount(i64),

    /// Source and destination are the same account
    #[error("Cannot transfer to the same account ({0})")]
    SameAccountTransfer(i64),
}

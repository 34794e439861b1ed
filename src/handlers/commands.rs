//! Command definitions
//!
//! Commands represent intentions to change the ledger.

use serde::{Deserialize, Serialize};

use crate::domain::{Account, Entry, Transfer, ValidationError};

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move `amount` from one account to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCommand {
    pub from_account_id: i64,
    pub to_account_id: i64,
    /// Magnitude moved, in the smallest currency unit
    pub amount: i64,
}

impl TransferCommand {
    pub fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Reject requests that must never open a transaction
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount <= 0 {
            return Err(ValidationError::NonPositiveAmount(self.amount));
        }
        if self.from_account_id == self.to_account_id {
            return Err(ValidationError::SameAccountTransfer(self.from_account_id));
        }
        Ok(())
    }
}

/// Result of a committed transfer.
///
/// Every row was produced inside the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

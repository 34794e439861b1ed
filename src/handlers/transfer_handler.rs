//! Transfer Handler
//!
//! Moves money between two accounts: one transfer row, two entries and two
//! balance updates, all committed together or not at all.

use std::sync::Arc;

use crate::coordinator::TransactionCoordinator;
use crate::domain::Account;
use crate::store::{
    AddAccountBalanceParams, CreateEntryParams, CreateTransferParams, LedgerRepository,
    LedgerStore, StoreError,
};

use super::{TransferCommand, TransferError, TransferResult};

// =========================================================================
// TransferHandler
// =========================================================================

/// Handler for account-to-account transfers.
///
/// Stateless between calls; the only shared resource is the backend.
#[derive(Debug)]
pub struct TransferHandler<S> {
    coordinator: TransactionCoordinator<S>,
}

impl<S> Clone for TransferHandler<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<S: LedgerStore> TransferHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            coordinator: TransactionCoordinator::new(store),
        }
    }

    pub fn store(&self) -> &S {
        self.coordinator.store()
    }

    /// Execute the transfer command.
    ///
    /// Not idempotent: executing the same command twice moves the money twice.
    pub async fn execute(&self, command: TransferCommand) -> Result<TransferResult, TransferError> {
        command.validate()?;

        tracing::debug!(
            from_account_id = command.from_account_id,
            to_account_id = command.to_account_id,
            amount = command.amount,
            "Starting transfer"
        );

        let result = self
            .coordinator
            .run_in_transaction(move |tx| {
                Box::pin(async move {
                    let transfer = tx
                        .create_transfer(CreateTransferParams {
                            from_account_id: command.from_account_id,
                            to_account_id: command.to_account_id,
                            amount: command.amount,
                        })
                        .await?;

                    let from_entry = tx
                        .create_entry(CreateEntryParams {
                            account_id: command.from_account_id,
                            amount: -command.amount,
                        })
                        .await?;

                    let to_entry = tx
                        .create_entry(CreateEntryParams {
                            account_id: command.to_account_id,
                            amount: command.amount,
                        })
                        .await?;

                    let (from_account, to_account) = add_money(
                        tx,
                        (command.from_account_id, -command.amount),
                        (command.to_account_id, command.amount),
                    )
                    .await?;

                    Ok::<_, StoreError>(TransferResult {
                        transfer,
                        from_account,
                        to_account,
                        from_entry,
                        to_entry,
                    })
                })
            })
            .await?;

        tracing::info!(
            transfer_id = result.transfer.id,
            from_account_id = result.from_account.id,
            to_account_id = result.to_account.id,
            amount = result.transfer.amount,
            "Transfer committed"
        );

        Ok(result)
    }
}

// =========================================================================
// Balance updates in lock order
// =========================================================================

/// Apply two `(account_id, delta)` balance updates.
///
/// The account with the smaller id is always updated first, whichever side
/// of the transfer it is on, so every transaction takes row locks in the same
/// global order and no wait cycle can form. The updated rows come back in
/// argument order.
async fn add_money<R>(
    repo: &mut R,
    first: (i64, i64),
    second: (i64, i64),
) -> Result<(Account, Account), StoreError>
where
    R: LedgerRepository + ?Sized,
{
    let mut updates = [first, second];
    updates.sort_by_key(|&(account_id, _)| account_id);

    let mut applied = Vec::with_capacity(updates.len());
    for (account_id, amount) in updates {
        let account = repo
            .add_account_balance(AddAccountBalanceParams {
                id: account_id,
                amount,
            })
            .await?;
        applied.push(account);
    }

    let lower = applied.remove(0);
    let higher = applied.remove(0);
    if first.0 <= second.0 {
        Ok((lower, higher))
    } else {
        Ok((higher, lower))
    }
}

//! Transaction coordinator
//!
//! Runs a unit of work against a transaction-scoped repository and owns the
//! begin / commit / rollback mechanics. It has no knowledge of what the unit
//! of work does.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::store::{LedgerStore, LedgerTransaction, StoreError};

/// Errors produced while running a unit of work in a transaction
#[derive(Debug, thiserror::Error)]
pub enum TxError<E> {
    /// The transaction could not be opened; the operation never ran
    #[error("Failed to begin transaction: {0}")]
    Begin(#[source] StoreError),

    /// The operation failed and the transaction was rolled back
    #[error(transparent)]
    Operation(E),

    /// The operation failed and the rollback failed too
    #[error("tx err: {source}, rb err: {rollback}")]
    Rollback { source: E, rollback: StoreError },

    /// The operation succeeded but the commit failed
    #[error("Failed to commit transaction: {0}")]
    Commit(#[source] StoreError),
}

/// Wraps a ledger backend and runs closures inside one of its transactions
#[derive(Debug)]
pub struct TransactionCoordinator<S> {
    store: Arc<S>,
}

impl<S> Clone for TransactionCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> TransactionCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The non-transactional view of the backend
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `operation` inside a new transaction.
    ///
    /// Exactly one begin and exactly one of commit / rollback is issued per
    /// call. All writes must go through the handle passed to `operation`.
    /// If the returned future is dropped mid-flight the open transaction is
    /// dropped with it, which rolls it back.
    pub async fn run_in_transaction<T, E, F>(&self, operation: F) -> Result<T, TxError<E>>
    where
        F: for<'c> FnOnce(&'c mut S::Tx) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: std::fmt::Display + Send,
    {
        let mut tx = self.store.begin().await.map_err(TxError::Begin)?;

        match operation(&mut tx).await {
            Ok(value) => {
                tx.commit().await.map_err(TxError::Commit)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(
                        error = %err,
                        rollback_error = %rollback,
                        "Transaction rollback failed"
                    );
                    return Err(TxError::Rollback { source: err, rollback });
                }
                tracing::warn!(error = %err, "Transaction rolled back");
                Err(TxError::Operation(err))
            }
        }
    }
}

//! Ledger store module
//!
//! Repository capabilities over the ledger tables and the backends that
//! provide them. Every operation here is a single atomic statement; composing
//! several of them into one unit of work is the job of
//! [`TransactionCoordinator`](crate::coordinator::TransactionCoordinator).

mod error;
mod memory;
mod postgres;

pub use error::StoreError;
pub use memory::{MemoryLedger, MemoryLedgerTx};
pub use postgres::{PgLedger, PgLedgerTx};

use async_trait::async_trait;

use crate::domain::{Account, Currency, Entry, Transfer};

// =========================================================================
// Query parameters
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListAccountsParams {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateEntryParams {
    pub account_id: i64,
    pub amount: i64,
}

/// Signed delta applied to an account balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddAccountBalanceParams {
    pub id: i64,
    pub amount: i64,
}

// =========================================================================
// Capabilities
// =========================================================================

/// Single-row ledger operations bound to one transaction.
///
/// Implementations know nothing about transaction boundaries; whatever
/// connection they are bound to decides what commits together.
#[async_trait]
pub trait LedgerRepository: Send {
    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError>;

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError>;

    async fn get_account(&mut self, id: i64) -> Result<Account, StoreError>;

    /// Atomically apply `balance += amount` and return the updated row.
    ///
    /// Takes the row lock on the account until the enclosing transaction ends.
    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError>;
}

/// An open transaction that exposes the repository view bound to it.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait LedgerTransaction: LedgerRepository + Sized {
    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// A ledger backend: opens transactions and serves standalone reads.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTransaction + 'static;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError>;

    async fn get_account(&self, id: i64) -> Result<Account, StoreError>;

    /// Accounts ordered by id
    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError>;

    /// Entries posted against one account, oldest first
    async fn list_entries(&self, account_id: i64) -> Result<Vec<Entry>, StoreError>;

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError>;
}

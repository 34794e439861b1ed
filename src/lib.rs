//! simple_bank Library
//!
//! Ledger of accounts, entries and transfers with an atomic, deadlock-free
//! transfer handler. Re-exports modules for integration testing and the
//! binaries.

pub mod api;
pub mod coordinator;
pub mod domain;
pub mod handlers;
pub mod random;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use coordinator::{TransactionCoordinator, TxError};
pub use domain::{Account, Currency, Entry, Transfer, ValidationError};
pub use error::AppError;
pub use handlers::{TransferCommand, TransferError, TransferHandler, TransferResult};
pub use store::{LedgerStore, MemoryLedger, PgLedger, StoreError};

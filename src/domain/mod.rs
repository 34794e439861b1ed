//! Domain module
//!
//! Core ledger types and request validation.

pub mod error;
pub mod models;

pub use error::ValidationError;
pub use models::{Account, Currency, CurrencyError, Entry, Transfer};

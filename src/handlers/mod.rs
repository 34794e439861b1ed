//! Command Handlers module
//!
//! Handlers that orchestrate ledger writes inside a single transaction.

mod commands;
mod error;
mod transfer_handler;


pub use commands::*;
pub use error::TransferError;
pub use transfer_handler::TransferHandler;

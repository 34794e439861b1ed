//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use simple_bank::store::CreateAccountParams;
use simple_bank::{Account, Currency, LedgerStore, MemoryLedger, TransferHandler};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Fresh in-memory ledger and a handler over it
pub fn memory_handler() -> (TransferHandler<MemoryLedger>, MemoryLedger) {
    let ledger = MemoryLedger::new();
    (TransferHandler::new(Arc::new(ledger.clone())), ledger)
}

/// Open an account directly in the store
pub async fn open_account<S: LedgerStore>(store: &S, owner: &str, balance: i64) -> Account {
    store
        .create_account(CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency: Currency::Usd,
        })
        .await
        .expect("Failed to create account")
}

/// Connect to the test database; the schema in migrations/ must be applied
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let schema_ok = simple_bank::db::check_schema(&pool)
        .await
        .expect("Failed to inspect schema");
    assert!(schema_ok, "Apply migrations/0001_init.sql before running integration tests");

    pool
}

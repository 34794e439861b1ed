//! PostgreSQL ledger backend
//!
//! Each query is a single statement. The same query functions serve the pool
//! (implicit per-statement transactions) and an open `sqlx::Transaction`.

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use crate::domain::{Account, Entry, Transfer};

use super::{
    AddAccountBalanceParams, CreateAccountParams, CreateEntryParams, CreateTransferParams,
    LedgerRepository, LedgerStore, LedgerTransaction, ListAccountsParams, StoreError,
};

/// SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

const TRANSFER_TO_ACCOUNT_FKEY: &str = "transfers_to_account_id_fkey";

/// Ledger backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Create a new PgLedger with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Open PostgreSQL transaction.
///
/// Dropping it without `commit` rolls back (sqlx issues the ROLLBACK when the
/// connection returns to the pool).
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerStore for PgLedger {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<PgLedgerTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTx { tx })
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        create_account(&self.pool, &params).await
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        get_account(&self.pool, id).await
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn list_entries(&self, account_id: i64) -> Result<Vec<Entry>, StoreError> {
        let entries = sqlx::query_as::<_, Entry>(
            r#"
            SELECT id, account_id, amount, created_at
            FROM entries
            WHERE account_id = $1
            ORDER BY id
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError> {
        sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, created_at
            FROM transfers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::TransferNotFound(id))
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerTx {
    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        create_transfer(&mut *self.tx, &params).await
    }

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError> {
        create_entry(&mut *self.tx, &params).await
    }

    async fn get_account(&mut self, id: i64) -> Result<Account, StoreError> {
        get_account(&mut *self.tx, id).await
    }

    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError> {
        add_account_balance(&mut *self.tx, &params).await
    }
}

#[async_trait]
impl LedgerTransaction for PgLedgerTx {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// =========================================================================
// Queries
// =========================================================================

async fn create_account<'e, E>(
    executor: E,
    params: &CreateAccountParams,
) -> Result<Account, StoreError>
where
    E: PgExecutor<'e>,
{
    let account = sqlx::query_as::<_, Account>(
        r#"
        INSERT INTO accounts (owner, balance, currency)
        VALUES ($1, $2, $3)
        RETURNING id, owner, balance, currency, created_at
        "#,
    )
    .bind(&params.owner)
    .bind(params.balance)
    .bind(params.currency)
    .fetch_one(executor)
    .await?;

    Ok(account)
}

async fn get_account<'e, E>(executor: E, id: i64) -> Result<Account, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        r#"
        SELECT id, owner, balance, currency, created_at
        FROM accounts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(StoreError::AccountNotFound(id))
}

async fn create_transfer<'e, E>(
    executor: E,
    params: &CreateTransferParams,
) -> Result<Transfer, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Transfer>(
        r#"
        INSERT INTO transfers (from_account_id, to_account_id, amount)
        VALUES ($1, $2, $3)
        RETURNING id, from_account_id, to_account_id, amount, created_at
        "#,
    )
    .bind(params.from_account_id)
    .bind(params.to_account_id)
    .bind(params.amount)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        // The violated constraint names the missing side
        let missing = match &e {
            sqlx::Error::Database(db) if db.constraint() == Some(TRANSFER_TO_ACCOUNT_FKEY) => {
                params.to_account_id
            }
            _ => params.from_account_id,
        };
        account_error(e, missing)
    })
}

async fn create_entry<'e, E>(
    executor: E,
    params: &CreateEntryParams,
) -> Result<Entry, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Entry>(
        r#"
        INSERT INTO entries (account_id, amount)
        VALUES ($1, $2)
        RETURNING id, account_id, amount, created_at
        "#,
    )
    .bind(params.account_id)
    .bind(params.amount)
    .fetch_one(executor)
    .await
    .map_err(|e| account_error(e, params.account_id))
}

async fn add_account_balance<'e, E>(
    executor: E,
    params: &AddAccountBalanceParams,
) -> Result<Account, StoreError>
where
    E: PgExecutor<'e>,
{
    // One statement: read-modify-write under the row lock
    sqlx::query_as::<_, Account>(
        r#"
        UPDATE accounts
        SET balance = balance + $2
        WHERE id = $1
        RETURNING id, owner, balance, currency, created_at
        "#,
    )
    .bind(params.id)
    .bind(params.amount)
    .fetch_one(executor)
    .await
    .map_err(|e| account_error(e, params.id))
}

/// Map missing rows and foreign key violations to `AccountNotFound`
fn account_error(err: sqlx::Error, account_id: i64) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::AccountNotFound(account_id),
        sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            StoreError::AccountNotFound(account_id)
        }
        _ => StoreError::Database(err),
    }
}

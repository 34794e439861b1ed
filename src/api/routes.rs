//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::{Account, Currency, CurrencyError, Entry, Transfer};
use crate::error::AppError;
use crate::handlers::{TransferCommand, TransferHandler, TransferResult};
use crate::store::{CreateAccountParams, LedgerStore, ListAccountsParams};

/// Smallest and largest accepted `page_size`
const MIN_PAGE_SIZE: i32 = 5;
const MAX_PAGE_SIZE: i32 = 10;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub owner: String,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListAccountsQuery {
    pub page_id: i32,
    pub page_size: i32,
}

impl ListAccountsQuery {
    fn to_params(&self) -> Result<ListAccountsParams, AppError> {
        if self.page_id < 1 {
            return Err(AppError::InvalidRequest(
                "page_id must be at least 1".to_string(),
            ));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(AppError::InvalidRequest(format!(
                "page_size must be between {} and {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }

        Ok(ListAccountsParams {
            limit: i64::from(self.page_size),
            offset: i64::from(self.page_id - 1) * i64::from(self.page_size),
        })
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<S: LedgerStore>() -> Router<TransferHandler<S>> {
    Router::new()
        // Accounts
        .route("/accounts", post(create_account::<S>).get(list_accounts::<S>))
        .route("/accounts/:id", get(get_account::<S>))
        .route("/accounts/:id/entries", get(list_entries::<S>))
        // Transfers
        .route("/transfers", post(transfer::<S>))
        .route("/transfers/:id", get(get_transfer::<S>))
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Open a new account with a zero balance
async fn create_account<S: LedgerStore>(
    State(handler): State<TransferHandler<S>>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    let owner = request.owner.trim();
    if owner.is_empty() {
        return Err(AppError::InvalidRequest("owner is required".to_string()));
    }

    let currency: Currency = request
        .currency
        .parse()
        .map_err(|e: CurrencyError| AppError::InvalidRequest(e.to_string()))?;
    if !Currency::OPENABLE.contains(&currency) {
        return Err(AppError::InvalidRequest(format!(
            "accounts cannot be opened in {}",
            currency
        )));
    }

    let account = handler
        .store()
        .create_account(CreateAccountParams {
            owner: owner.to_string(),
            balance: 0,
            currency,
        })
        .await?;

    tracing::info!(account_id = account.id, currency = %account.currency, "Account created");

    Ok(Json(account))
}

// =========================================================================
// GET /accounts/:id
// =========================================================================

async fn get_account<S: LedgerStore>(
    State(handler): State<TransferHandler<S>>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    if id < 1 {
        return Err(AppError::InvalidRequest("id must be at least 1".to_string()));
    }

    let account = handler.store().get_account(id).await?;
    Ok(Json(account))
}

// =========================================================================
// GET /accounts?page_id=&page_size=
// =========================================================================

async fn list_accounts<S: LedgerStore>(
    State(handler): State<TransferHandler<S>>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<Vec<Account>>, AppError> {
    let params = query.to_params()?;
    let accounts = handler.store().list_accounts(params).await?;
    Ok(Json(accounts))
}

// =========================================================================
// GET /accounts/:id/entries
// =========================================================================

/// Ledger entries of one account, oldest first
async fn list_entries<S: LedgerStore>(
    State(handler): State<TransferHandler<S>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Entry>>, AppError> {
    // 404 for unknown accounts rather than an empty list
    handler.store().get_account(id).await?;
    let entries = handler.store().list_entries(id).await?;
    Ok(Json(entries))
}

// =========================================================================
// POST /transfers
// =========================================================================

async fn transfer<S: LedgerStore>(
    State(handler): State<TransferHandler<S>>,
    Json(command): Json<TransferCommand>,
) -> Result<Json<TransferResult>, AppError> {
    let result = handler.execute(command).await?;
    Ok(Json(result))
}

// =========================================================================
// GET /transfers/:id
// =========================================================================

async fn get_transfer<S: LedgerStore>(
    State(handler): State<TransferHandler<S>>,
    Path(id): Path<i64>,
) -> Result<Json<Transfer>, AppError> {
    let transfer = handler.store().get_transfer(id).await?;
    Ok(Json(transfer))
}

//! In-memory ledger backend
//!
//! Keeps the transactional behaviour the transfer engine relies on from
//! PostgreSQL: `add_account_balance` takes a per-account row lock that is held
//! until the transaction ends, writes stay private to the transaction until
//! commit, and ids come from sequences that are not rolled back.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use crate::domain::{Account, Entry, Transfer};

use super::{
    AddAccountBalanceParams, CreateAccountParams, CreateEntryParams, CreateTransferParams,
    LedgerRepository, LedgerStore, LedgerTransaction, ListAccountsParams, StoreError,
};

#[derive(Debug, Default)]
struct State {
    accounts: BTreeMap<i64, Account>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
    row_locks: HashMap<i64, Arc<RowLock<()>>>,
    account_seq: i64,
    entry_seq: i64,
    transfer_seq: i64,
}

impl State {
    fn require_account(&self, id: i64) -> Result<&Account, StoreError> {
        self.accounts.get(&id).ok_or(StoreError::AccountNotFound(id))
    }
}

/// Shared in-process ledger. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<State>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // State is only mutated in short non-panicking sections
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of committed transfers
    pub fn transfer_count(&self) -> usize {
        self.state().transfers.len()
    }

    /// Number of committed entries
    pub fn entry_count(&self) -> usize {
        self.state().entries.len()
    }

    /// Sum of the committed entries for one account
    pub fn entry_sum(&self, account_id: i64) -> i64 {
        self.state()
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .map(|e| e.amount)
            .sum()
    }
}

/// Open in-memory transaction.
///
/// Holds the row locks it acquired; dropping it releases them and discards
/// every pending write.
#[derive(Debug)]
pub struct MemoryLedgerTx {
    ledger: MemoryLedger,
    row_guards: HashMap<i64, OwnedMutexGuard<()>>,
    accounts: HashMap<i64, Account>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
}

impl MemoryLedgerTx {
    fn read_account(&self, id: i64) -> Result<Account, StoreError> {
        if let Some(account) = self.accounts.get(&id) {
            return Ok(account.clone());
        }
        self.ledger.state().require_account(id).cloned()
    }

    async fn lock_row(&mut self, id: i64) -> Result<(), StoreError> {
        if self.row_guards.contains_key(&id) {
            return Ok(());
        }

        let lock = {
            let mut state = self.ledger.state();
            state.require_account(id)?;
            state.row_locks.entry(id).or_default().clone()
        };

        let guard = lock.lock_owned().await;
        self.row_guards.insert(id, guard);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Tx = MemoryLedgerTx;

    async fn begin(&self) -> Result<MemoryLedgerTx, StoreError> {
        Ok(MemoryLedgerTx {
            ledger: self.clone(),
            row_guards: HashMap::new(),
            accounts: HashMap::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
        })
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        let mut state = self.state();
        state.account_seq += 1;

        let account = Account {
            id: state.account_seq,
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };
        state.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        self.state().require_account(id).cloned()
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        let offset = usize::try_from(params.offset).unwrap_or(0);
        let limit = usize::try_from(params.limit).unwrap_or(0);

        Ok(self
            .state()
            .accounts
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_entries(&self, account_id: i64) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .state()
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError> {
        self.state()
            .transfers
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(StoreError::TransferNotFound(id))
    }
}

#[async_trait]
impl LedgerRepository for MemoryLedgerTx {
    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        let id = {
            let mut state = self.ledger.state();
            state.require_account(params.from_account_id)?;
            state.require_account(params.to_account_id)?;
            state.transfer_seq += 1;
            state.transfer_seq
        };

        let transfer = Transfer {
            id,
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());

        Ok(transfer)
    }

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError> {
        let id = {
            let mut state = self.ledger.state();
            state.require_account(params.account_id)?;
            state.entry_seq += 1;
            state.entry_seq
        };

        let entry = Entry {
            id,
            account_id: params.account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());

        Ok(entry)
    }

    async fn get_account(&mut self, id: i64) -> Result<Account, StoreError> {
        self.read_account(id)
    }

    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError> {
        self.lock_row(params.id).await?;

        // Row lock held: the committed balance cannot move under us
        let mut account = self.read_account(params.id)?;
        account.balance = account
            .balance
            .checked_add(params.amount)
            .ok_or(StoreError::BalanceOverflow(params.id))?;
        self.accounts.insert(account.id, account.clone());

        Ok(account)
    }
}

#[async_trait]
impl LedgerTransaction for MemoryLedgerTx {
    async fn commit(self) -> Result<(), StoreError> {
        let MemoryLedgerTx {
            ledger,
            row_guards,
            accounts,
            entries,
            transfers,
        } = self;

        {
            let mut state = ledger.state();
            for (id, account) in accounts {
                state.accounts.insert(id, account);
            }
            state.entries.extend(entries);
            state.transfers.extend(transfers);
        }

        // Publish before releasing the rows
        drop(row_guards);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;
    use std::time::Duration;

    async fn account(ledger: &MemoryLedger, balance: i64) -> Account {
        ledger
            .create_account(CreateAccountParams {
                owner: "owner".to_string(),
                balance,
                currency: Currency::Usd,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_writes_invisible_until_commit() {
        let ledger = MemoryLedger::new();
        let a = account(&ledger, 100).await;

        let mut tx = ledger.begin().await.unwrap();
        let updated = tx
            .add_account_balance(AddAccountBalanceParams { id: a.id, amount: -40 })
            .await
            .unwrap();
        assert_eq!(updated.balance, 60);
        assert_eq!(tx.get_account(a.id).await.unwrap().balance, 60);
        assert_eq!(LedgerStore::get_account(&ledger, a.id).await.unwrap().balance, 100);

        tx.commit().await.unwrap();
        assert_eq!(LedgerStore::get_account(&ledger, a.id).await.unwrap().balance, 60);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let ledger = MemoryLedger::new();
        let a = account(&ledger, 10).await;
        let b = account(&ledger, 10).await;

        let mut tx = ledger.begin().await.unwrap();
        tx.create_transfer(CreateTransferParams {
            from_account_id: a.id,
            to_account_id: b.id,
            amount: 5,
        })
        .await
        .unwrap();
        tx.create_entry(CreateEntryParams { account_id: a.id, amount: -5 })
            .await
            .unwrap();
        tx.add_account_balance(AddAccountBalanceParams { id: a.id, amount: -5 })
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(ledger.transfer_count(), 0);
        assert_eq!(ledger.entry_count(), 0);
        assert_eq!(LedgerStore::get_account(&ledger, a.id).await.unwrap().balance, 10);
    }

    #[tokio::test]
    async fn test_missing_account_is_not_found() {
        let ledger = MemoryLedger::new();
        let a = account(&ledger, 10).await;

        let mut tx = ledger.begin().await.unwrap();
        let err = tx
            .create_entry(CreateEntryParams { account_id: 999, amount: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AccountNotFound(999)));

        let err = tx
            .create_transfer(CreateTransferParams {
                from_account_id: a.id,
                to_account_id: 999,
                amount: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AccountNotFound(999)));

        let err = tx
            .add_account_balance(AddAccountBalanceParams { id: 999, amount: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AccountNotFound(999)));
    }

    #[tokio::test]
    async fn test_row_lock_blocks_second_writer_until_commit() {
        let ledger = MemoryLedger::new();
        let a = account(&ledger, 0).await;

        let mut first = ledger.begin().await.unwrap();
        first
            .add_account_balance(AddAccountBalanceParams { id: a.id, amount: 5 })
            .await
            .unwrap();

        let mut second = ledger.begin().await.unwrap();
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            second.add_account_balance(AddAccountBalanceParams { id: a.id, amount: 7 }),
        )
        .await;
        assert!(blocked.is_err(), "second writer must wait for the row lock");

        first.commit().await.unwrap();

        let updated = second
            .add_account_balance(AddAccountBalanceParams { id: a.id, amount: 7 })
            .await
            .unwrap();
        assert_eq!(updated.balance, 12);
        second.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_sequences_not_reused_after_rollback() {
        let ledger = MemoryLedger::new();
        let a = account(&ledger, 0).await;

        let mut tx = ledger.begin().await.unwrap();
        let first = tx
            .create_entry(CreateEntryParams { account_id: a.id, amount: 1 })
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        let second = tx
            .create_entry(CreateEntryParams { account_id: a.id, amount: 1 })
            .await
            .unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_list_accounts_paginates_by_id() {
        let ledger = MemoryLedger::new();
        for balance in 0..7 {
            account(&ledger, balance).await;
        }

        let page = ledger
            .list_accounts(ListAccountsParams { limit: 5, offset: 5 })
            .await
            .unwrap();
        let ids: Vec<i64> = page.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![6, 7]);
    }
}

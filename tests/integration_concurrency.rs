//! Concurrency tests for the transfer handler
//!
//! Many transfers between the same accounts, in both directions at once.

use std::time::Duration;

use simple_bank::store::{AddAccountBalanceParams, LedgerRepository};
use simple_bank::{LedgerStore, TransferCommand};

mod common;

/// Generous bound; a deadlock never finishes
const DEADLINE: Duration = Duration::from_secs(10);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_same_direction() {
    let (handler, ledger) = common::memory_handler();
    let a = common::open_account(&ledger, "alice", 1000).await;
    let b = common::open_account(&ledger, "bob", 1000).await;

    let n = 20;
    let amount = 10;
    let command = TransferCommand::new(a.id, b.id, amount);

    let mut tasks = Vec::with_capacity(n);
    for _ in 0..n {
        let handler = handler.clone();
        tasks.push(tokio::spawn(async move { handler.execute(command).await }));
    }

    let results = tokio::time::timeout(DEADLINE, futures::future::join_all(tasks))
        .await
        .expect("transfers did not finish");

    let mut from_balances = Vec::with_capacity(n);
    for joined in results {
        let result = joined.unwrap().unwrap();
        assert_eq!(result.transfer.amount, amount);
        assert_eq!(result.from_entry.amount, -amount);
        assert_eq!(result.to_entry.amount, amount);
        from_balances.push(result.from_account.balance);
    }

    // Each transfer observed a distinct post-update balance: no lost updates
    from_balances.sort_unstable();
    from_balances.dedup();
    assert_eq!(from_balances.len(), n);

    let n = n as i64;
    assert_eq!(ledger.get_account(a.id).await.unwrap().balance, 1000 - n * amount);
    assert_eq!(ledger.get_account(b.id).await.unwrap().balance, 1000 + n * amount);
    assert_eq!(ledger.transfer_count() as i64, n);
    assert_eq!(ledger.entry_count() as i64, 2 * n);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opposite_transfers_do_not_deadlock() {
    let (handler, ledger) = common::memory_handler();
    let a = common::open_account(&ledger, "alice", 500).await;
    let b = common::open_account(&ledger, "bob", 500).await;

    let n = 20;
    let amount = 10;

    let mut tasks = Vec::with_capacity(2 * n);
    for i in 0..2 * n {
        let handler = handler.clone();
        let command = if i % 2 == 0 {
            TransferCommand::new(a.id, b.id, amount)
        } else {
            TransferCommand::new(b.id, a.id, amount)
        };
        tasks.push(tokio::spawn(async move { handler.execute(command).await }));
    }

    let results = tokio::time::timeout(DEADLINE, futures::future::join_all(tasks))
        .await
        .expect("opposite-direction transfers deadlocked");

    for joined in results {
        joined.unwrap().unwrap();
    }

    let a_after = ledger.get_account(a.id).await.unwrap();
    let b_after = ledger.get_account(b.id).await.unwrap();
    assert_eq!(a_after.balance, 500);
    assert_eq!(b_after.balance, 500);
    assert_eq!(a_after.balance + b_after.balance, 1000);
    assert_eq!(ledger.entry_sum(a.id), 0);
    assert_eq!(ledger.transfer_count(), 2 * n);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_money_conserved_across_many_accounts() {
    let (handler, ledger) = common::memory_handler();
    let mut ids = Vec::new();
    for owner in ["a", "b", "c", "d"] {
        ids.push(common::open_account(&ledger, owner, 100).await.id);
    }

    let mut tasks = Vec::new();
    for i in 0..40usize {
        let from = ids[i % ids.len()];
        let to = ids[(i * 3 + 1) % ids.len()];
        if from == to {
            continue;
        }
        let handler = handler.clone();
        let amount = (i as i64 % 7) + 1;
        tasks.push(tokio::spawn(async move {
            handler.execute(TransferCommand::new(from, to, amount)).await
        }));
    }

    let results = tokio::time::timeout(DEADLINE, futures::future::join_all(tasks))
        .await
        .expect("transfers did not finish");
    for joined in results {
        joined.unwrap().unwrap();
    }

    let mut total = 0;
    for id in &ids {
        let balance = ledger.get_account(*id).await.unwrap().balance;
        assert_eq!(balance, 100 + ledger.entry_sum(*id));
        total += balance;
    }
    assert_eq!(total, 400);
}

/// Two transactions taking the same rows in opposite order wait on each other
/// forever. This is the cycle the handler's lock ordering rules out.
#[tokio::test]
async fn test_opposite_lock_order_cycles_without_ordering() {
    let (_, ledger) = common::memory_handler();
    let a = common::open_account(&ledger, "alice", 0).await;
    let b = common::open_account(&ledger, "bob", 0).await;

    let mut tx1 = ledger.begin().await.unwrap();
    let mut tx2 = ledger.begin().await.unwrap();

    tx1.add_account_balance(AddAccountBalanceParams { id: a.id, amount: -1 })
        .await
        .unwrap();
    tx2.add_account_balance(AddAccountBalanceParams { id: b.id, amount: -1 })
        .await
        .unwrap();

    let both = async {
        tokio::join!(
            tx1.add_account_balance(AddAccountBalanceParams { id: b.id, amount: 1 }),
            tx2.add_account_balance(AddAccountBalanceParams { id: a.id, amount: 1 }),
        )
    };

    let outcome = tokio::time::timeout(Duration::from_millis(100), both).await;
    assert!(outcome.is_err(), "opposite lock order should wait forever");
}

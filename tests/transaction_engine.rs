use account_ledger::{
    AccountType, InMemoryJournal, Journal, LedgerConfig, LedgerError, LedgerEvent, LedgerStore,
    NewAccount, TransactionEngine, TransactionKind,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

async fn setup(balance: Decimal) -> (Arc<LedgerStore>, TransactionEngine) {
    let store = Arc::new(LedgerStore::new(
        &LedgerConfig::default(),
        Arc::new(InMemoryJournal::new()),
    ));
    store
        .create(NewAccount::new(1001, "Asha Rao", AccountType::Savings, balance).unwrap())
        .await
        .unwrap();

    let engine = TransactionEngine::new(store.clone());
    (store, engine)
}

// ============================================================================
// BASIC DEPOSIT & WITHDRAWAL TESTS
// ============================================================================

#[tokio::test]
async fn test_deposit_withdraw_scenario() {
    let (store, engine) = setup(dec!(5000.00)).await;

    let after_deposit = engine.deposit(1001, dec!(1500)).await.unwrap();
    assert_eq!(after_deposit.balance, dec!(6500.00));

    let after_withdraw = engine.withdraw(1001, dec!(2000)).await.unwrap();
    assert_eq!(after_withdraw.balance, dec!(4500.00));

    let result = engine.withdraw(1001, dec!(10000)).await;
    assert_eq!(
        result,
        Err(LedgerError::InsufficientFunds {
            balance: dec!(4500.00),
            requested: dec!(10000),
        })
    );
    assert_eq!(store.get(1001).await.unwrap().balance, dec!(4500.00));
}

#[tokio::test]
async fn test_deposit_then_withdraw_restores_balance() {
    let (store, engine) = setup(dec!(250.37)).await;

    for amount in [dec!(0.01), dec!(19.99), dec!(1000000), dec!(3.3333)] {
        engine.deposit(1001, amount).await.unwrap();
        engine.withdraw(1001, amount).await.unwrap();
        assert_eq!(store.get(1001).await.unwrap().balance, dec!(250.37));
    }
}

#[tokio::test]
async fn test_withdraw_entire_balance() {
    let (_store, engine) = setup(dec!(75.50)).await;

    let account = engine.withdraw(1001, dec!(75.50)).await.unwrap();
    assert_eq!(account.balance, Decimal::ZERO);

    let result = engine.withdraw(1001, dec!(0.01)).await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
}

// ============================================================================
// INPUT VALIDATION TESTS
// ============================================================================

#[tokio::test]
async fn test_non_positive_amounts_rejected() {
    let (store, engine) = setup(dec!(100)).await;

    for amount in [Decimal::ZERO, dec!(-1), dec!(-0.01)] {
        assert_eq!(engine.deposit(1001, amount).await, Err(LedgerError::InvalidAmount));
        assert_eq!(engine.withdraw(1001, amount).await, Err(LedgerError::InvalidAmount));
    }

    assert_eq!(store.get(1001).await.unwrap().balance, dec!(100));
    assert!(store.history(1001).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_overflowing_deposit_names_the_overflow() {
    let (store, engine) = setup(Decimal::MAX).await;

    match engine.deposit(1001, dec!(1)).await {
        Err(LedgerError::Validation(message)) => assert!(message.contains("overflow")),
        other => panic!("expected an overflow validation error, got {:?}", other),
    }

    assert_eq!(store.get(1001).await.unwrap().balance, Decimal::MAX);
    assert!(store.history(1001).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_account_is_not_found() {
    let (_store, engine) = setup(dec!(100)).await;

    assert_eq!(engine.deposit(2002, dec!(5)).await, Err(LedgerError::NotFound(2002)));
    assert_eq!(engine.withdraw(2002, dec!(5)).await, Err(LedgerError::NotFound(2002)));
}

#[tokio::test]
async fn test_invalid_amount_reported_before_missing_account() {
    let (_store, engine) = setup(dec!(100)).await;
    assert_eq!(engine.deposit(2002, dec!(-5)).await, Err(LedgerError::InvalidAmount));
}

#[tokio::test]
async fn test_operations_on_deleted_account_fail() {
    let (store, engine) = setup(dec!(100)).await;
    store.delete(1001).await.unwrap();

    assert_eq!(engine.deposit(1001, dec!(5)).await, Err(LedgerError::NotFound(1001)));
}

// ============================================================================
// TRANSACTION HISTORY TESTS
// ============================================================================

#[tokio::test]
async fn test_history_records_each_successful_operation() {
    let (store, engine) = setup(dec!(5000.00)).await;

    engine.deposit(1001, dec!(1500)).await.unwrap();
    engine.withdraw(1001, dec!(2000)).await.unwrap();
    let _ = engine.withdraw(1001, dec!(10000)).await;

    let history = store.history(1001).await.unwrap();
    assert_eq!(history.len(), 2);

    assert_eq!(history[0].kind, TransactionKind::Deposit);
    assert_eq!(history[0].amount, dec!(1500));
    assert_eq!(history[0].balance_after, dec!(6500.00));

    assert_eq!(history[1].kind, TransactionKind::Withdraw);
    assert_eq!(history[1].amount, dec!(2000));
    assert_eq!(history[1].balance_after, dec!(4500.00));

    assert!(history[0].transaction_id < history[1].transaction_id);
    assert_eq!(store.next_transaction_id(), history[1].transaction_id + 1);
}

// ============================================================================
// JOURNAL FAILURE TESTS
// ============================================================================

/// Journal that accepts the account opening, then fails once switched off
struct FlakyJournal {
    inner: InMemoryJournal,
    failing: AtomicBool,
}

#[async_trait]
impl Journal for FlakyJournal {
    async fn append(&self, event: &LedgerEvent) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.append(event).await
    }

    async fn replay(&self) -> anyhow::Result<Vec<LedgerEvent>> {
        self.inner.replay().await
    }
}

#[tokio::test]
async fn test_failed_journal_write_leaves_balance_unchanged() {
    let journal = Arc::new(FlakyJournal {
        inner: InMemoryJournal::new(),
        failing: AtomicBool::new(false),
    });
    let store = Arc::new(LedgerStore::new(&LedgerConfig::default(), journal.clone()));
    store
        .create(NewAccount::new(1, "Holder", AccountType::Current, dec!(10)).unwrap())
        .await
        .unwrap();
    let engine = TransactionEngine::new(store.clone());

    journal.failing.store(true, Ordering::SeqCst);

    let result = engine.deposit(1, dec!(5)).await;
    assert!(matches!(result, Err(LedgerError::Journal(_))));
    assert_eq!(store.get(1).await.unwrap().balance, dec!(10));
    assert!(store.history(1).await.unwrap().is_empty());

    // A failed close keeps the account
    assert!(matches!(store.delete(1).await, Err(LedgerError::Journal(_))));
    assert!(store.get(1).await.is_ok());

    journal.failing.store(false, Ordering::SeqCst);
    assert_eq!(engine.deposit(1, dec!(5)).await.unwrap().balance, dec!(15));
}

// ============================================================================
// CONCURRENCY TESTS
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_lose_no_updates() {
    let (store, engine) = setup(dec!(0)).await;

    let mut handles = vec![];
    for _ in 0..200 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.deposit(1001, dec!(1.25)).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.get(1001).await.unwrap().balance, dec!(250.00));

    let history = store.history(1001).await.unwrap();
    assert_eq!(history.len(), 200);
    let ids: HashSet<u64> = history.iter().map(|r| r.transaction_id).collect();
    assert_eq!(ids.len(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let (store, engine) = setup(dec!(100)).await;

    let mut handles = vec![];
    for _ in 0..50 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.withdraw(1001, dec!(3)).await
        }));
    }

    let mut succeeded = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(account) => {
                assert!(account.balance >= Decimal::ZERO);
                succeeded += 1;
            }
            Err(LedgerError::InsufficientFunds { .. }) => insufficient += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(succeeded, 33);
    assert_eq!(insufficient, 17);
    assert_eq!(store.get(1001).await.unwrap().balance, dec!(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_processing_different_accounts() {
    let store = Arc::new(LedgerStore::new(
        &LedgerConfig::default(),
        Arc::new(InMemoryJournal::new()),
    ));
    for number in 1..=10u64 {
        store
            .create(NewAccount::new(number, "Holder", AccountType::Savings, dec!(0)).unwrap())
            .await
            .unwrap();
    }
    let engine = TransactionEngine::new(store.clone());

    let mut handles = vec![];
    for number in 1..=10u64 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..100 {
                engine.deposit(number, dec!(1.0)).await.unwrap();
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let accounts = store.list().await;
    assert_eq!(accounts.len(), 10);
    for account in accounts {
        assert_eq!(account.balance, dec!(100.0));
    }
}

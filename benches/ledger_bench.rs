use account_ledger::{
    AccountType, InMemoryJournal, LedgerConfig, LedgerStore, NewAccount, TransactionEngine,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::runtime::Runtime;

async fn ledger_with_accounts(num_accounts: u64) -> (Arc<LedgerStore>, TransactionEngine) {
    let store = Arc::new(LedgerStore::new(
        &LedgerConfig::default(),
        Arc::new(InMemoryJournal::new()),
    ));

    for number in 1..=num_accounts {
        store
            .create(NewAccount::new(number, "Bench Holder", AccountType::Savings, dec!(0)).unwrap())
            .await
            .unwrap();
    }

    let engine = TransactionEngine::new(store.clone());
    (store, engine)
}

fn benchmark_parallel_deposits(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("parallel_deposits");

    for num_accounts in [10u64, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_accounts),
            num_accounts,
            |b, &num_accounts| {
                b.to_async(&rt).iter(|| async move {
                    let (store, engine) = ledger_with_accounts(num_accounts).await;

                    let mut handles = Vec::with_capacity(num_accounts as usize);
                    for number in 1..=num_accounts {
                        let engine = engine.clone();
                        handles.push(tokio::spawn(async move {
                            engine.deposit(number, dec!(100.0)).await
                        }));
                    }
                    for handle in handles {
                        let _ = handle.await;
                    }

                    black_box(store.list().await.len())
                });
            },
        );
    }

    group.finish();
}

fn benchmark_single_account_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("single_account_1000_transactions", |b| {
        b.to_async(&rt).iter(|| async {
            let (store, engine) = ledger_with_accounts(1).await;

            for _ in 0..1000 {
                let _ = engine.deposit(1, dec!(1.0)).await;
            }

            black_box(store.get(1).await.map(|a| a.balance))
        });
    });
}

criterion_group!(benches, benchmark_parallel_deposits, benchmark_single_account_throughput);
criterion_main!(benches);

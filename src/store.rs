use crate::account_actor::{AccountActor, AccountHandle};
use crate::config::LedgerConfig;
use crate::errors::LedgerError;
use crate::journal::{EventKind, Journal, LedgerEvent};
use crate::models::{Account, AccountNumber, NewAccount, TransactionKind, TransactionRecord};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

/// Authoritative collection of accounts, split into shards so that lookups
/// for different accounts rarely contend. Balances live inside the account
/// actors; the store only owns their handles.
pub struct LedgerStore {
    shards: Vec<RwLock<Shard>>,
    journal: Arc<dyn Journal>,
    tx_ids: Arc<AtomicU64>,
    open_seq: AtomicU64,
    mailbox_capacity: usize,
}

#[derive(Default)]
struct Shard {
    accounts: HashMap<AccountNumber, Entry>,
}

#[derive(Clone)]
struct Entry {
    // Position in the store-wide insertion order
    seq: u64,
    handle: AccountHandle,
}

impl LedgerStore {
    pub fn new(config: &LedgerConfig, journal: Arc<dyn Journal>) -> Self {
        let shards = (0..config.shards.max(1))
            .map(|_| RwLock::new(Shard::default()))
            .collect();

        Self {
            shards,
            journal,
            tx_ids: Arc::new(AtomicU64::new(1)),
            open_seq: AtomicU64::new(0),
            mailbox_capacity: config.mailbox_capacity.max(1),
        }
    }

    /// Rebuild the store from the journal (on startup). New mutations are
    /// appended to the same journal.
    pub async fn restore(config: &LedgerConfig, journal: Arc<dyn Journal>) -> Result<Self> {
        let events = journal.replay().await?;
        let event_count = events.len();
        let replayed = Replay::from_events(events);

        let store = Self::new(config, journal);
        store
            .tx_ids
            .store(replayed.next_transaction_id, Ordering::Relaxed);

        let account_count = replayed.accounts.len();
        for restored in replayed.accounts {
            let account_number = restored.account.account_number;
            let handle = store.spawn_actor(restored.account, restored.history);

            let mut shard = store.shard(account_number).write().await;
            shard.accounts.insert(
                account_number,
                Entry {
                    seq: store.open_seq.fetch_add(1, Ordering::Relaxed),
                    handle,
                },
            );
        }

        info!(
            events = event_count,
            accounts = account_count,
            "Ledger restored from journal"
        );

        Ok(store)
    }

    fn shard(&self, account_number: AccountNumber) -> &RwLock<Shard> {
        let shard_id = (account_number % self.shards.len() as u64) as usize;
        &self.shards[shard_id]
    }

    fn spawn_actor(&self, account: Account, history: Vec<TransactionRecord>) -> AccountHandle {
        let (tx, rx) = mpsc::channel(self.mailbox_capacity);
        let handle = AccountHandle::new(account.account_number, tx);

        let actor = AccountActor::new(
            account,
            history,
            self.journal.clone(),
            self.tx_ids.clone(),
            rx,
        );

        tokio::spawn(async move {
            actor.run().await;
        });

        handle
    }

    pub async fn create(&self, new: NewAccount) -> Result<Account, LedgerError> {
        let account = Account::open(new);
        let account_number = account.account_number;

        // Write lock held across the journal append so two creates of the
        // same number cannot both pass the uniqueness check.
        let mut shard = self.shard(account_number).write().await;

        if shard.accounts.contains_key(&account_number) {
            return Err(LedgerError::DuplicateAccount(account_number));
        }

        self.journal
            .append(&LedgerEvent::opened(&account))
            .await
            .map_err(|e| {
                error!(
                    account_number = account_number,
                    error = ?e,
                    "Failed to journal account opening"
                );
                LedgerError::Journal(e.to_string())
            })?;

        let handle = self.spawn_actor(account.clone(), Vec::new());
        shard.accounts.insert(
            account_number,
            Entry {
                seq: self.open_seq.fetch_add(1, Ordering::Relaxed),
                handle,
            },
        );

        info!(
            account_number = account_number,
            account_type = %account.account_type,
            "Account opened"
        );

        Ok(account)
    }

    pub(crate) async fn handle(&self, account_number: AccountNumber) -> Result<AccountHandle, LedgerError> {
        let shard = self.shard(account_number).read().await;
        shard
            .accounts
            .get(&account_number)
            .map(|entry| entry.handle.clone())
            .ok_or(LedgerError::NotFound(account_number))
    }

    pub async fn get(&self, account_number: AccountNumber) -> Result<Account, LedgerError> {
        self.handle(account_number).await?.get_state().await
    }

    /// All accounts in insertion order
    pub async fn list(&self) -> Vec<Account> {
        use futures::future::join_all;

        let futures: Vec<_> = self
            .shards
            .iter()
            .map(|shard| async move {
                // Snapshot the handles so actors are queried without the lock
                let entries: Vec<Entry> = {
                    let shard_lock = shard.read().await;
                    shard_lock.accounts.values().cloned().collect()
                };

                let mut shard_accounts = Vec::with_capacity(entries.len());
                for entry in entries {
                    // A failure here means the account was deleted meanwhile
                    if let Ok(account) = entry.handle.get_state().await {
                        shard_accounts.push((entry.seq, account));
                    }
                }

                shard_accounts
            })
            .collect();

        let mut accounts: Vec<(u64, Account)> =
            join_all(futures).await.into_iter().flatten().collect();
        accounts.sort_by_key(|(seq, _)| *seq);
        accounts.into_iter().map(|(_, account)| account).collect()
    }

    pub async fn delete(&self, account_number: AccountNumber) -> Result<Account, LedgerError> {
        let mut shard = self.shard(account_number).write().await;

        let entry = shard
            .accounts
            .get(&account_number)
            .cloned()
            .ok_or(LedgerError::NotFound(account_number))?;

        // The actor drains earlier messages, journals the close and stops
        let account = entry.handle.close().await?;
        shard.accounts.remove(&account_number);

        info!(account_number = account_number, "Account closed");
        Ok(account)
    }

    pub async fn rename(
        &self,
        account_number: AccountNumber,
        holder_name: String,
    ) -> Result<Account, LedgerError> {
        self.handle(account_number).await?.rename(holder_name).await
    }

    pub async fn history(
        &self,
        account_number: AccountNumber,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.handle(account_number).await?.history().await
    }

    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.read().await.accounts.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Id the next successful deposit or withdrawal will receive
    pub fn next_transaction_id(&self) -> u64 {
        self.tx_ids.load(Ordering::Relaxed)
    }
}

struct RestoredAccount {
    account: Account,
    history: Vec<TransactionRecord>,
}

/// Folds journal events into the accounts still open at the end of the log.
struct Replay {
    accounts: Vec<RestoredAccount>,
    next_transaction_id: u64,
}

impl Replay {
    fn from_events(events: Vec<LedgerEvent>) -> Self {
        let mut open: HashMap<AccountNumber, (u64, RestoredAccount)> = HashMap::new();
        let mut seq = 0u64;
        let mut last_transaction_id = 0u64;

        for event in events {
            let account_number = event.account_number;
            if let Some(transaction_id) = event.transaction_id {
                last_transaction_id = last_transaction_id.max(transaction_id);
            }

            match event.kind {
                EventKind::Open => {
                    let Some(new) = event.as_new_account() else {
                        warn!(account_number, "Skipping malformed open event");
                        continue;
                    };
                    if open.contains_key(&account_number) {
                        warn!(account_number, "Skipping open event for an account already open");
                        continue;
                    }

                    open.insert(
                        account_number,
                        (
                            seq,
                            RestoredAccount {
                                account: Account::open(new),
                                history: Vec::new(),
                            },
                        ),
                    );
                    seq += 1;
                }
                EventKind::Deposit | EventKind::Withdraw => {
                    let Some((_, restored)) = open.get_mut(&account_number) else {
                        warn!(account_number, "Skipping transaction for an unknown account");
                        continue;
                    };
                    let (Some(kind), Some(transaction_id), Some(amount)) =
                        (event.transaction_kind(), event.transaction_id, event.amount)
                    else {
                        warn!(account_number, "Skipping malformed transaction event");
                        continue;
                    };

                    let balance = restored.account.balance;
                    let balance_after = match kind {
                        TransactionKind::Deposit => match balance.checked_add(amount) {
                            Some(total) => total,
                            None => {
                                warn!(account_number, transaction_id, "Skipping overflowing deposit");
                                continue;
                            }
                        },
                        TransactionKind::Withdraw => {
                            if amount > balance {
                                warn!(account_number, transaction_id, "Skipping overdrawing withdrawal");
                                continue;
                            }
                            balance - amount
                        }
                    };

                    restored.account.balance = balance_after;
                    restored.history.push(TransactionRecord {
                        transaction_id,
                        account_number,
                        kind,
                        amount,
                        balance_after,
                        timestamp: event.at,
                    });
                }
                EventKind::Rename => match (open.get_mut(&account_number), event.holder_name) {
                    (Some((_, restored)), Some(holder_name)) => {
                        restored.account.holder_name = holder_name;
                    }
                    _ => warn!(account_number, "Skipping unusable rename event"),
                },
                EventKind::Close => {
                    if open.remove(&account_number).is_none() {
                        warn!(account_number, "Skipping close of an unknown account");
                    }
                }
            }
        }

        let mut ordered: Vec<(u64, RestoredAccount)> = open.into_values().collect();
        ordered.sort_by_key(|(seq, _)| *seq);

        Self {
            accounts: ordered.into_iter().map(|(_, restored)| restored).collect(),
            next_transaction_id: last_transaction_id + 1,
        }
    }
}

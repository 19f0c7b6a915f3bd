use crate::models::{Account, AccountNumber, AccountType, NewAccount, TransactionKind, TransactionRecord};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Open,
    Deposit,
    Withdraw,
    Rename,
    Close,
}

/// One journal row. Columns that do not apply to the event kind are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub kind: EventKind,
    pub account_number: AccountNumber,
    #[serde(with = "systemtime_serde")]
    pub at: SystemTime,
    #[serde(default)]
    pub transaction_id: Option<u64>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub holder_name: Option<String>,
    #[serde(default)]
    pub account_type: Option<AccountType>,
}

impl LedgerEvent {
    fn bare(kind: EventKind, account_number: AccountNumber) -> Self {
        Self {
            kind,
            account_number,
            at: journal_now(),
            transaction_id: None,
            amount: None,
            holder_name: None,
            account_type: None,
        }
    }

    pub fn opened(account: &Account) -> Self {
        Self {
            amount: Some(account.balance),
            holder_name: Some(account.holder_name.clone()),
            account_type: Some(account.account_type),
            ..Self::bare(EventKind::Open, account.account_number)
        }
    }

    pub fn transaction(record: &TransactionRecord) -> Self {
        let kind = match record.kind {
            TransactionKind::Deposit => EventKind::Deposit,
            TransactionKind::Withdraw => EventKind::Withdraw,
        };

        Self {
            at: record.timestamp,
            transaction_id: Some(record.transaction_id),
            amount: Some(record.amount),
            ..Self::bare(kind, record.account_number)
        }
    }

    pub fn renamed(account_number: AccountNumber, holder_name: &str) -> Self {
        Self {
            holder_name: Some(holder_name.to_string()),
            ..Self::bare(EventKind::Rename, account_number)
        }
    }

    pub fn closed(account_number: AccountNumber) -> Self {
        Self::bare(EventKind::Close, account_number)
    }

    /// Recovers the account an `open` event describes.
    pub fn as_new_account(&self) -> Option<NewAccount> {
        if self.kind != EventKind::Open {
            return None;
        }

        NewAccount::new(
            self.account_number,
            self.holder_name.clone()?,
            self.account_type?,
            self.amount?,
        )
        .ok()
    }

    pub fn transaction_kind(&self) -> Option<TransactionKind> {
        match self.kind {
            EventKind::Deposit => Some(TransactionKind::Deposit),
            EventKind::Withdraw => Some(TransactionKind::Withdraw),
            _ => None,
        }
    }
}

/// Current time truncated to the one-second resolution the journal stores
pub fn journal_now() -> SystemTime {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub mod systemtime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH)
            .map_err(|_| serde::ser::Error::custom("SystemTime before Unix epoch"))?;
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

/// Append-only record of every ledger mutation, replayed on startup
#[async_trait]
pub trait Journal: Send + Sync {
    async fn append(&self, event: &LedgerEvent) -> Result<()>;
    async fn replay(&self) -> Result<Vec<LedgerEvent>>;
}

/// In-memory journal (no persistence, used by tests and when no journal file is configured)
#[derive(Default)]
pub struct InMemoryJournal {
    events: Arc<RwLock<Vec<LedgerEvent>>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<LedgerEvent>) -> Self {
        Self {
            events: Arc::new(RwLock::new(events)),
        }
    }

    pub async fn events(&self) -> Vec<LedgerEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl Journal for InMemoryJournal {
    async fn append(&self, event: &LedgerEvent) -> Result<()> {
        let mut events = self.events.write().await;
        events.push(event.clone());
        Ok(())
    }

    async fn replay(&self) -> Result<Vec<LedgerEvent>> {
        let events = self.events.read().await;
        Ok(events.clone())
    }
}

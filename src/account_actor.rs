use crate::errors::LedgerError;
use crate::journal::{journal_now, Journal, LedgerEvent};
use crate::models::{Account, AccountNumber, TransactionKind, TransactionRecord};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

pub enum AccountMessage {
    Process {
        kind: TransactionKind,
        amount: Decimal,
        reply: oneshot::Sender<Result<Account, LedgerError>>,
    },
    Rename {
        holder_name: String,
        reply: oneshot::Sender<Result<Account, LedgerError>>,
    },
    GetState {
        reply: oneshot::Sender<Account>,
    },
    GetHistory {
        reply: oneshot::Sender<Vec<TransactionRecord>>,
    },
    Close {
        reply: oneshot::Sender<Result<Account, LedgerError>>,
    },
}

/// Sole owner of one account's balance. Every mutation is journaled before
/// it is applied, and messages are handled one at a time.
pub struct AccountActor {
    account: Account,
    history: Vec<TransactionRecord>,
    journal: Arc<dyn Journal>,
    tx_ids: Arc<AtomicU64>,
    receiver: mpsc::Receiver<AccountMessage>,
}

impl AccountActor {
    pub fn new(
        account: Account,
        history: Vec<TransactionRecord>,
        journal: Arc<dyn Journal>,
        tx_ids: Arc<AtomicU64>,
        receiver: mpsc::Receiver<AccountMessage>,
    ) -> Self {
        Self {
            account,
            history,
            journal,
            tx_ids,
            receiver,
        }
    }

    /// Run the actor event loop until the account is closed or every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                AccountMessage::Process { kind, amount, reply } => {
                    let result = self.process_transaction(kind, amount).await;
                    let _ = reply.send(result);
                }
                AccountMessage::Rename { holder_name, reply } => {
                    let result = self.rename(holder_name).await;
                    let _ = reply.send(result);
                }
                AccountMessage::GetState { reply } => {
                    let _ = reply.send(self.account.clone());
                }
                AccountMessage::GetHistory { reply } => {
                    let _ = reply.send(self.history.clone());
                }
                AccountMessage::Close { reply } => match self.close().await {
                    Ok(account) => {
                        let _ = reply.send(Ok(account));
                        break;
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                },
            }
        }

        tracing::debug!(
            account_number = self.account.account_number,
            "Account actor terminated"
        );
    }

    async fn process_transaction(
        &mut self,
        kind: TransactionKind,
        amount: Decimal,
    ) -> Result<Account, LedgerError> {
        match kind {
            TransactionKind::Deposit => self.process_deposit(amount).await,
            TransactionKind::Withdraw => self.process_withdrawal(amount).await,
        }
    }

    async fn process_deposit(&mut self, amount: Decimal) -> Result<Account, LedgerError> {
        let amount = validate_amount(amount)?;

        let new_balance = self
            .account
            .balance
            .checked_add(amount)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "deposit of {} would overflow the balance of account #{}",
                    amount, self.account.account_number
                ))
            })?;

        self.commit(TransactionKind::Deposit, amount, new_balance).await
    }

    async fn process_withdrawal(&mut self, amount: Decimal) -> Result<Account, LedgerError> {
        let amount = validate_amount(amount)?;

        if amount > self.account.balance {
            return Err(LedgerError::InsufficientFunds {
                balance: self.account.balance,
                requested: amount,
            });
        }

        let new_balance = self.account.balance - amount;
        self.commit(TransactionKind::Withdraw, amount, new_balance).await
    }

    async fn commit(
        &mut self,
        kind: TransactionKind,
        amount: Decimal,
        new_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        let record = TransactionRecord {
            transaction_id: self.tx_ids.fetch_add(1, Ordering::Relaxed),
            account_number: self.account.account_number,
            kind,
            amount,
            balance_after: new_balance,
            timestamp: journal_now(),
        };

        self.write_journal(&LedgerEvent::transaction(&record)).await?;

        self.set_balance(new_balance);
        self.history.push(record);

        Ok(self.account.clone())
    }

    fn set_balance(&mut self, new_balance: Decimal) {
        debug_assert!(new_balance >= Decimal::ZERO);
        self.account.balance = new_balance;
    }

    async fn rename(&mut self, holder_name: String) -> Result<Account, LedgerError> {
        self.write_journal(&LedgerEvent::renamed(
            self.account.account_number,
            &holder_name,
        ))
        .await?;

        self.account.holder_name = holder_name;
        Ok(self.account.clone())
    }

    async fn close(&mut self) -> Result<Account, LedgerError> {
        self.write_journal(&LedgerEvent::closed(self.account.account_number))
            .await?;

        Ok(self.account.clone())
    }

    async fn write_journal(&self, event: &LedgerEvent) -> Result<(), LedgerError> {
        self.journal.append(event).await.map_err(|e| {
            error!(
                account_number = self.account.account_number,
                error = ?e,
                "Failed to append to journal - mutation rejected"
            );
            LedgerError::Journal(e.to_string())
        })
    }
}

pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(amount)
}

#[derive(Clone)]
pub struct AccountHandle {
    account_number: AccountNumber,
    sender: mpsc::Sender<AccountMessage>,
}

// A closed mailbox means the actor stopped after a close, so the account is gone.
impl AccountHandle {
    pub fn new(account_number: AccountNumber, sender: mpsc::Sender<AccountMessage>) -> Self {
        Self {
            account_number,
            sender,
        }
    }

    pub async fn process(
        &self,
        kind: TransactionKind,
        amount: Decimal,
    ) -> Result<Account, LedgerError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(AccountMessage::Process {
            kind,
            amount,
            reply: reply_tx,
        })
        .await?;

        reply_rx.await.map_err(|_| self.gone())?
    }

    pub async fn rename(&self, holder_name: String) -> Result<Account, LedgerError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(AccountMessage::Rename {
            holder_name,
            reply: reply_tx,
        })
        .await?;

        reply_rx.await.map_err(|_| self.gone())?
    }

    pub async fn get_state(&self) -> Result<Account, LedgerError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(AccountMessage::GetState { reply: reply_tx })
            .await?;

        reply_rx.await.map_err(|_| self.gone())
    }

    pub async fn history(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(AccountMessage::GetHistory { reply: reply_tx })
            .await?;

        reply_rx.await.map_err(|_| self.gone())
    }

    pub async fn close(&self) -> Result<Account, LedgerError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(AccountMessage::Close { reply: reply_tx })
            .await?;

        reply_rx.await.map_err(|_| self.gone())?
    }

    async fn send(&self, msg: AccountMessage) -> Result<(), LedgerError> {
        self.sender.send(msg).await.map_err(|_| self.gone())
    }

    fn gone(&self) -> LedgerError {
        LedgerError::NotFound(self.account_number)
    }
}

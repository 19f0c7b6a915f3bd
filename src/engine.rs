use crate::account_actor::validate_amount;
use crate::errors::LedgerError;
use crate::models::{Account, AccountNumber, TransactionKind};
use crate::store::LedgerStore;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Moves money in and out of accounts held by a [`LedgerStore`].
///
/// Each operation is routed to the account's actor, so read-modify-write of
/// one balance is serialized while different accounts proceed in parallel.
#[derive(Clone)]
pub struct TransactionEngine {
    store: Arc<LedgerStore>,
}

impl TransactionEngine {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn deposit(
        &self,
        account_number: AccountNumber,
        amount: Decimal,
    ) -> Result<Account, LedgerError> {
        self.apply(account_number, TransactionKind::Deposit, amount)
            .await
    }

    pub async fn withdraw(
        &self,
        account_number: AccountNumber,
        amount: Decimal,
    ) -> Result<Account, LedgerError> {
        self.apply(account_number, TransactionKind::Withdraw, amount)
            .await
    }

    async fn apply(
        &self,
        account_number: AccountNumber,
        kind: TransactionKind,
        amount: Decimal,
    ) -> Result<Account, LedgerError> {
        // Amount is checked before the lookup so a bad amount is reported
        // even for an unknown account
        let amount = validate_amount(amount)?;

        let handle = self.store.handle(account_number).await?;
        let result = handle.process(kind, amount).await;

        match &result {
            Ok(account) => tracing::debug!(
                account_number = account_number,
                kind = ?kind,
                amount = %amount,
                balance = %account.balance,
                "Transaction applied"
            ),
            Err(e) => tracing::debug!(
                account_number = account_number,
                kind = ?kind,
                amount = %amount,
                error = %e,
                "Transaction rejected"
            ),
        }

        result
    }
}

use crate::engine::TransactionEngine;
use crate::errors::LedgerError;
use crate::models::{
    Account, AccountNumber, AccountType, CreateAccountRequest, TransactionRecord,
    UpdateAccountRequest,
};
use crate::store::LedgerStore;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

/// Request-level entry point: validates raw input, then delegates to the
/// store for CRUD and to the engine for money movement.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<LedgerStore>,
    engine: TransactionEngine,
}

impl AccountService {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        let engine = TransactionEngine::new(store.clone());
        Self { store, engine }
    }

    pub async fn create(&self, request: CreateAccountRequest) -> Result<Account, LedgerError> {
        let new = request.validate()?;
        self.store.create(new).await
    }

    pub async fn list(&self) -> Vec<Account> {
        self.store.list().await
    }

    pub async fn get(&self, account_number: AccountNumber) -> Result<Account, LedgerError> {
        self.store.get(account_number).await
    }

    pub async fn update(
        &self,
        account_number: AccountNumber,
        request: UpdateAccountRequest,
    ) -> Result<Account, LedgerError> {
        let holder_name = request.validate()?;
        self.store.rename(account_number, holder_name).await
    }

    pub async fn delete(&self, account_number: AccountNumber) -> Result<(), LedgerError> {
        self.store.delete(account_number).await.map(|_| ())
    }

    pub async fn deposit(
        &self,
        account_number: AccountNumber,
        raw_amount: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let amount = parse_amount(raw_amount)?;
        self.engine.deposit(account_number, amount).await
    }

    pub async fn withdraw(
        &self,
        account_number: AccountNumber,
        raw_amount: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let amount = parse_amount(raw_amount)?;
        self.engine.withdraw(account_number, amount).await
    }

    pub async fn history(
        &self,
        account_number: AccountNumber,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.store.history(account_number).await
    }

    /// Accounts whose holder name contains `keyword`, ignoring case
    pub async fn search_by_name(&self, keyword: &str) -> Vec<Account> {
        // An empty keyword is contained in every name
        let keyword = keyword.trim().to_lowercase();

        self.list()
            .await
            .into_iter()
            .filter(|account| account.holder_name.to_lowercase().contains(&keyword))
            .collect()
    }

    pub async fn filter_by_type(&self, raw_type: &str) -> Result<Vec<Account>, LedgerError> {
        let account_type = AccountType::from_str(raw_type)?;

        Ok(self
            .list()
            .await
            .into_iter()
            .filter(|account| account.account_type == account_type)
            .collect())
    }
}

// Finest fraction a Decimal holds without rounding
const MAX_FRACTION_DIGITS: usize = 28;

/// Parse the textual amount of a deposit or withdrawal. A missing or
/// non-numeric value is rejected here; positivity is left to the engine.
pub fn parse_amount(raw: Option<&str>) -> Result<Decimal, LedgerError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(LedgerError::MissingAmount);
    }

    // Decimal::from_str also takes `1_000` and `1e3`, and rounds away excess
    // fraction digits. Only plain notation is an amount here.
    if !is_plain_decimal(raw) {
        return Err(LedgerError::MalformedAmount(raw.to_string()));
    }

    Decimal::from_str(raw).map_err(|_| LedgerError::MalformedAmount(raw.to_string()))
}

fn is_plain_decimal(raw: &str) -> bool {
    let unsigned = raw.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(raw);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());

    !(whole.is_empty() && fraction.is_empty())
        && all_digits(whole)
        && all_digits(fraction)
        && fraction.len() <= MAX_FRACTION_DIGITS
}

pub fn parse_account_number(raw: &str) -> Result<AccountNumber, LedgerError> {
    match raw.trim().parse::<AccountNumber>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(LedgerError::Validation(format!(
            "'{}' is not a valid account number",
            raw
        ))),
    }
}

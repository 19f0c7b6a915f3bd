use crate::errors::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

pub type AccountNumber = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Savings,
    Current,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "SAVINGS",
            AccountType::Current => "CURRENT",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SAVINGS" => Ok(AccountType::Savings),
            "CURRENT" => Ok(AccountType::Current),
            _ => Err(LedgerError::Validation(format!(
                "accountType must be SAVINGS or CURRENT, got '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_number: AccountNumber,
    pub holder_name: String,
    pub account_type: AccountType,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub balance: Decimal,
}

impl Account {
    pub fn open(new: NewAccount) -> Self {
        Self {
            account_number: new.account_number,
            holder_name: new.holder_name,
            account_type: new.account_type,
            balance: new.initial_balance,
        }
    }
}

/// A validated request to open an account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub account_number: AccountNumber,
    pub holder_name: String,
    pub account_type: AccountType,
    pub initial_balance: Decimal,
}

impl NewAccount {
    pub fn new(
        account_number: AccountNumber,
        holder_name: impl Into<String>,
        account_type: AccountType,
        initial_balance: Decimal,
    ) -> Result<Self, LedgerError> {
        if account_number == 0 {
            return Err(LedgerError::Validation(
                "accountNumber must be a positive integer".to_string(),
            ));
        }

        let holder_name = validate_holder_name(holder_name.into())?;

        if initial_balance < Decimal::ZERO {
            return Err(LedgerError::Validation(
                "balance must not be negative".to_string(),
            ));
        }

        Ok(Self {
            account_number,
            holder_name,
            account_type,
            initial_balance,
        })
    }
}

pub fn validate_holder_name(name: String) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(
            "holderName must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Body of `POST /api/accounts`. Every field is optional here so that a
/// missing field is reported by name rather than as a generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub account_number: Option<AccountNumber>,
    pub holder_name: Option<String>,
    pub account_type: Option<String>,
    #[serde(default)]
    pub balance: Option<Decimal>,
}

impl CreateAccountRequest {
    pub fn validate(self) -> Result<NewAccount, LedgerError> {
        let account_number = self.account_number.ok_or_else(|| missing("accountNumber"))?;
        let holder_name = self.holder_name.ok_or_else(|| missing("holderName"))?;
        let account_type = self
            .account_type
            .ok_or_else(|| missing("accountType"))?
            .parse::<AccountType>()?;

        NewAccount::new(
            account_number,
            holder_name,
            account_type,
            self.balance.unwrap_or(Decimal::ZERO),
        )
    }
}

/// Body of `PUT /api/accounts/{accountNumber}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub holder_name: Option<String>,
}

impl UpdateAccountRequest {
    pub fn validate(self) -> Result<String, LedgerError> {
        let name = self.holder_name.ok_or_else(|| missing("holderName"))?;
        validate_holder_name(name)
    }
}

fn missing(field: &str) -> LedgerError {
    LedgerError::Validation(format!("{} is required", field))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_id: u64,
    pub account_number: AccountNumber,
    #[serde(rename = "transactionType")]
    pub kind: TransactionKind,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub balance_after: Decimal,
    #[serde(with = "crate::journal::systemtime_serde")]
    pub timestamp: SystemTime,
}

/// Row of the `dump` CSV report.
#[derive(Debug, Serialize)]
pub struct AccountOutput {
    pub account_number: AccountNumber,
    pub holder_name: String,
    pub account_type: AccountType,
    pub balance: String,
}

impl From<&Account> for AccountOutput {
    fn from(acc: &Account) -> Self {
        Self {
            account_number: acc.account_number,
            holder_name: acc.holder_name.clone(),
            account_type: acc.account_type,
            balance: format!("{:.2}", acc.balance),
        }
    }
}

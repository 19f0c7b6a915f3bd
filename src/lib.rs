pub mod account_actor;
pub mod cli;
pub mod config;
pub mod csv_io;
pub mod engine;
pub mod errors;
pub mod file_journal;
pub mod journal;
pub mod models;
pub mod server;
pub mod service;
pub mod store;

pub use config::{LedgerConfig, ServerConfig};
pub use engine::TransactionEngine;
pub use errors::LedgerError;
pub use journal::{InMemoryJournal, Journal, LedgerEvent};
pub use models::{Account, AccountNumber, AccountType, NewAccount, TransactionKind, TransactionRecord};
pub use service::AccountService;
pub use store::LedgerStore;

use crate::config::LedgerConfig;
use crate::csv_io::write_accounts;
use crate::file_journal::read_events;
use crate::journal::{InMemoryJournal, Journal};
use crate::models::AccountOutput;
use crate::store::LedgerStore;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Print the accounts a journal file leaves open, in opening order, as CSV.
pub async fn run(journal_path: PathBuf) -> Result<()> {
    let events = read_events(&journal_path)
        .await
        .with_context(|| format!("cannot read journal {}", journal_path.display()))?;

    // Replayed into a scratch journal so the file itself is never appended to
    let journal: Arc<dyn Journal> = Arc::new(InMemoryJournal::with_events(events));
    let store = LedgerStore::restore(&LedgerConfig::default(), journal).await?;

    let accounts: Vec<AccountOutput> = store
        .list()
        .await
        .iter()
        .map(AccountOutput::from)
        .collect();

    write_accounts(tokio::io::stdout(), accounts).await?;

    Ok(())
}

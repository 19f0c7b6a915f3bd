use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    #[arg(long, env = "LEDGER_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Journal file; the ledger is kept in memory only when omitted
    #[arg(long, env = "LEDGER_JOURNAL")]
    pub journal: Option<PathBuf>,

    /// Maximum number of requests served concurrently
    #[arg(long, default_value = "1000")]
    pub max_connections: usize,

    /// Disable the permissive CORS policy
    #[arg(long)]
    pub no_cors: bool,

    #[command(flatten)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Args)]
pub struct LedgerConfig {
    /// Number of shards the account map is split into
    #[arg(long, default_value = "16")]
    pub shards: usize,

    /// Bounded mailbox size of each account actor
    #[arg(long, default_value = "1000")]
    pub mailbox_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            shards: 16,
            mailbox_capacity: 1000,
        }
    }
}

use account_ledger::{cli, server, ServerConfig};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "account-ledger")]
#[command(about = "Bank account ledger service")]
enum Cli {
    /// Run the HTTP API server
    #[command(name = "serve")]
    Serve(ServerConfig),
    /// Print the accounts recorded in a journal file as CSV
    #[command(name = "dump")]
    Dump { journal: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse() {
        Cli::Dump { journal } => {
            // No logging for clean stdout
            cli::run(journal).await?;
        }
        Cli::Serve(config) => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(
                    EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                )
                .init();

            server::run(config).await?;
        }
    }

    Ok(())
}

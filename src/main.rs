//! accmgr - OAuth account manager CLI
//!
//! Manage stored accounts, resolve the active client and refresh its
//! access token from the terminal.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use accmgr::cli::commands::{Cli, Commands};
use accmgr::cli::{accounts, client, config};
use accmgr::error::Result;

#[tokio::main]
async fn main() {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Accounts(args) => accounts::handle_accounts(args.command).await,
        Commands::Client(args) => client::handle_client(args.command).await,
        Commands::Config(args) => config::handle_config(args.command),
    }
}

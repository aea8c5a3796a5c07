//! fwcat - firmware catalog CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fwcat_cli::cmd::{self, Context};
use fwcat_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = || Context::new(&cli);
    match &cli.command {
        Commands::List { filter, branch } => {
            cmd::list::list(&ctx()?, filter, branch.as_deref()).await
        }
        Commands::Latest { filter, branch } => {
            cmd::latest::latest(&ctx()?, filter, branch.as_deref()).await
        }
        Commands::Url { version } => cmd::url::url(&ctx()?, version).await,
        Commands::Download { version, dest } => {
            cmd::download::download(&ctx()?, version, dest).await
        }
        Commands::Entries { file } => cmd::entries::entries(file).await,
    }
}

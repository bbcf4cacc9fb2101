//! `butler` binary: loads `.env`, parses the CLI and dispatches.

use anyhow::Result;
use butler::{execute, init_tracing, BotConfig, ButlerComponents, Cli};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = BotConfig::load(cli.token.clone())?;
    init_tracing(&config.log_file)?;

    let components = ButlerComponents::build(config).await?;
    if let Err(e) = execute(cli.command, components).await {
        error!(error = %format!("{e:#}"), "Command failed");
        return Err(e);
    }
    Ok(())
}

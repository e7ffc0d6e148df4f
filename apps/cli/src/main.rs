//! kyukou CLI — irregular-event announcement ingester.
//!
//! Scrapes institutional notice boards, deduplicates announcements by
//! content fingerprint, and records an execution log per run.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

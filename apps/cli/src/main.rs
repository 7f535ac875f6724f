//! askweb CLI: ask a question, get an answer grounded on live web sources.
//!
//! Searches the web, renders the top distinct-domain results to PDF, extracts
//! their text, and asks a generative model using that text as context.

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

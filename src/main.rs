use crate::agent::workflow::launch;
use anyhow::Result;
use clap::Parser;

mod agent;
mod artifacts;
mod cache;
mod cli;
mod config;
mod datasource;
mod llm;
mod viz;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = args.into_config();

    launch(&config).await
}

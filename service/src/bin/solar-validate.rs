//! `solar-validate` command-line tool

use clap::Parser;
use validation_service::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let valid = cli::run(Cli::parse()).await?;
    if !valid {
        std::process::exit(1);
    }
    Ok(())
}

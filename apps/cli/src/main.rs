//! kexplain CLI — turns `kubectl explain` output into a JSON schema forest.
//!
//! Reads root resource names from a file, explains each one recursively,
//! enriches every field with its own description and writes the result
//! as JSON.

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

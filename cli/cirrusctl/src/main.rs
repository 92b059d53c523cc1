//! cirrusctl (cirrus) - CLI for the Cirrus infrastructure-management server
//!
//! Submits resource lifecycle requests against the server's REST API and
//! tracks the resulting asynchronous operations to completion.

use anyhow::Result;
use clap::Parser;

mod commands;
mod error;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Run the command
    if let Err(e) = cli.run().await {
        // Print error in a user-friendly way
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}

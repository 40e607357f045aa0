//! Entry point of the deploy scripts

use std::process;

use clap::Parser;
use deploy_scripts::{cli::Cli, errors::ScriptError};
use dotenv::dotenv;
use tracing::error;

/// Run the requested command, exiting with 1 on failure
#[tokio::main]
async fn main() {
    // Load .env file
    dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    // Ctrl-C drops the running command, along with any pending wait
    let result = tokio::select! {
        result = cli.run() => result,
        _ = tokio::signal::ctrl_c() => Err(ScriptError::Cancelled),
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

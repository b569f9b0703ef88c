use clap::Parser;
use colored::*;
use std::process;

use tool_sse::cli::ClientArgs;
use tool_sse::config::ClientConfig;
use tool_sse::{driver, logging};

#[tokio::main]
async fn main() {
    let args = ClientArgs::parse();

    let config = match ClientConfig::from_env_and_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(2);
        }
    };

    logging::init(config.verbose, "warn");

    if let Err(e) = driver::run(&config).await {
        eprintln!("{} {}", "Error:".red(), e);
        process::exit(1);
    }
}

//! `ir` entry point.
//!
//! Loads `IR_*` configuration, installs logging, then hands the parsed
//! subcommand to [`ir_gateway::cli::dispatch`].

use std::process::ExitCode;

use clap::Parser;

use ir_gateway::cli::{self, Cli};
use ir_gateway::config;
use ir_gateway::telemetry::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = config::load();

    if let Err(e) = init_logging(&config.log) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let code = cli::dispatch(cli.command, config).await;
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

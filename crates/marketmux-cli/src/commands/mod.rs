pub mod candles;
pub mod movers;
pub mod price;
pub mod sources;
pub mod stats;

use marketmux_core::MarketEngine;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// One rendered command result: a JSON value plus preformatted text lines.
pub struct CommandResult {
    pub data: serde_json::Value,
    pub lines: Vec<String>,
}

impl CommandResult {
    pub fn new(data: serde_json::Value, lines: Vec<String>) -> Self {
        Self { data, lines }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let engine = MarketEngine::builder()
        .with_default_providers()
        .from_env()
        .build();

    match &cli.command {
        Command::Price(args) => price::run(&engine, args).await,
        Command::Candles(args) => candles::run(&engine, args).await,
        Command::Stats(args) => stats::run(&engine, args).await,
        Command::Movers(args) => movers::run(&engine, args).await,
        Command::Sources => sources::run(&engine),
    }
}

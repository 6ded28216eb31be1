use serde_json::json;

use marketmux_core::MarketEngine;

use crate::commands::CommandResult;
use crate::error::CliError;

pub fn run(engine: &MarketEngine) -> Result<CommandResult, CliError> {
    let snapshots = engine.sources();

    let mut lines = vec![String::from("registered sources:")];
    let mut entries = Vec::with_capacity(snapshots.len());
    for snapshot in &snapshots {
        let endpoints = snapshot.capabilities.supported_endpoints().join(",");
        lines.push(format!(
            "  {}  endpoints=[{endpoints}]  timeout={:?}",
            snapshot.id, snapshot.timeout
        ));
        entries.push(json!({
            "id": snapshot.id,
            "endpoints": snapshot.capabilities.supported_endpoints(),
            "timeout_ms": snapshot.timeout.as_millis() as u64,
        }));
    }

    Ok(CommandResult::new(json!({ "sources": entries }), lines))
}

use std::str::FromStr;

use serde_json::json;

use marketmux_core::{AssetClass, MarketEngine, Symbol};

use crate::cli::PriceArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

pub async fn run(engine: &MarketEngine, args: &PriceArgs) -> Result<CommandResult, CliError> {
    let asset_class = AssetClass::from_str(&args.asset_class)?;
    let symbol = Symbol::parse(&args.symbol)?;

    let price = engine.price(asset_class, &symbol).await?;

    let data = json!({
        "asset_class": asset_class,
        "symbol": symbol,
        "price": price,
    });
    let lines = vec![format!("{symbol} ({asset_class}): {price}")];

    Ok(CommandResult::new(data, lines))
}

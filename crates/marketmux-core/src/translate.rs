//! Canonical-to-provider symbol translation.
//!
//! Static per-asset-class, per-provider tables of explicit pairs. An
//! identifier absent from its table is an `UnsupportedSymbol` failure; no
//! default instrument is ever silently substituted.

use crate::{AssetClass, EngineError, ProviderId, Symbol};

/// Crypto pairs served by both exchange adapters. Exchange codes match the
/// canonical identifier, but membership is still an explicit table.
const CRYPTO_PAIRS: &[&str] = &[
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT", "XRPUSDT", "ADAUSDT", "DOGEUSDT", "DOTUSDT",
    "LTCUSDT", "LINKUSDT", "AVAXUSDT", "TRXUSDT", "ATOMUSDT", "UNIUSDT", "NEARUSDT",
];

/// Forex pair decompositions for the rate service.
const FOREX_PAIRS: &[(&str, &str, &str)] = &[
    ("EURUSD", "EUR", "USD"),
    ("GBPUSD", "GBP", "USD"),
    ("USDJPY", "USD", "JPY"),
    ("USDCHF", "USD", "CHF"),
    ("AUDUSD", "AUD", "USD"),
    ("USDCAD", "USD", "CAD"),
    ("NZDUSD", "NZD", "USD"),
    ("EURGBP", "EUR", "GBP"),
    ("EURJPY", "EUR", "JPY"),
    ("GBPJPY", "GBP", "JPY"),
];

/// Commodity codes mapped to the quote-chart service's futures tickers.
const COMMODITY_CODES: &[(&str, &str)] = &[
    ("GOLD", "GC=F"),
    ("SILVER", "SI=F"),
    ("OIL", "CL=F"),
    ("BRENT", "BZ=F"),
    ("NATGAS", "NG=F"),
    ("COPPER", "HG=F"),
    ("PLATINUM", "PL=F"),
];

/// Index codes mapped to the quote-chart service's index tickers.
const INDEX_CODES: &[(&str, &str)] = &[
    ("SP500", "^GSPC"),
    ("NASDAQ", "^IXIC"),
    ("DOWJONES", "^DJI"),
    ("DAX", "^GDAXI"),
    ("FTSE100", "^FTSE"),
    ("NIKKEI", "^N225"),
];

/// Stateless symbol translator over the static tables above.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymbolTranslator;

impl SymbolTranslator {
    /// Resolve a canonical identifier to `provider`'s instrument code.
    ///
    /// # Errors
    ///
    /// `UnsupportedSymbol` when the identifier has no entry in the table for
    /// the (asset class, provider) combination.
    pub fn translate(
        asset_class: AssetClass,
        symbol: &Symbol,
        provider: ProviderId,
    ) -> Result<String, EngineError> {
        let unsupported = || EngineError::UnsupportedSymbol {
            symbol: symbol.to_string(),
            asset_class,
        };

        match (asset_class, provider) {
            (AssetClass::Crypto, ProviderId::Binance | ProviderId::Bybit) => CRYPTO_PAIRS
                .contains(&symbol.as_str())
                .then(|| symbol.to_string())
                .ok_or_else(unsupported),
            (AssetClass::Forex, ProviderId::Frankfurter) => {
                let (base, quote) = Self::forex_components(symbol).ok_or_else(unsupported)?;
                Ok(format!("{base}/{quote}"))
            }
            (AssetClass::Commodity, ProviderId::Yahoo) => COMMODITY_CODES
                .iter()
                .find(|(code, _)| *code == symbol.as_str())
                .map(|(_, ticker)| (*ticker).to_owned())
                .ok_or_else(unsupported),
            (AssetClass::Index, ProviderId::Yahoo) => INDEX_CODES
                .iter()
                .find(|(code, _)| *code == symbol.as_str())
                .map(|(_, ticker)| (*ticker).to_owned())
                .ok_or_else(unsupported),
            // Equity tickers already are the quote-chart vocabulary.
            (AssetClass::Equity, ProviderId::Yahoo) => Ok(symbol.to_string()),
            _ => Err(unsupported()),
        }
    }

    /// Base/quote decomposition for a canonical forex pair.
    pub fn forex_components(symbol: &Symbol) -> Option<(&'static str, &'static str)> {
        FOREX_PAIRS
            .iter()
            .find(|(pair, _, _)| *pair == symbol.as_str())
            .map(|(_, base, quote)| (*base, *quote))
    }

    /// The fixed forex pair universe ranked by the movers query.
    pub fn forex_pairs() -> Vec<Symbol> {
        FOREX_PAIRS
            .iter()
            .map(|(pair, _, _)| Symbol::parse(pair).expect("table pairs are valid symbols"))
            .collect()
    }

}

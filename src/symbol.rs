//! Trading symbols: an ordered (base, quote) currency pair.

use crate::currency::{Currency, UnknownCurrency};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A trading symbol, e.g. `BTC/USDT`. Each symbol owns exactly one order
/// book (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub base: Currency,
    pub quote: Currency,
}

#[derive(Debug, thiserror::Error)]
pub enum SymbolError {
    #[error(transparent)]
    UnknownCurrency(#[from] UnknownCurrency),
    #[error("base and quote currency must differ, got {0}")]
    BaseEqualsQuote(Currency),
    #[error("malformed symbol string: {0}")]
    Malformed(String),
}

impl Symbol {
    pub fn new(base: Currency, quote: Currency) -> Result<Self, SymbolError> {
        if base == quote {
            return Err(SymbolError::BaseEqualsQuote(base));
        }
        Ok(Self { base, quote })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base_str, quote_str) = s
            .split_once('/')
            .ok_or_else(|| SymbolError::Malformed(s.to_string()))?;
        let base: Currency = base_str.parse()?;
        let quote: Currency = quote_str.parse()?;
        Symbol::new(base, quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_parse() {
        let sym = Symbol::new(Currency::Btc, Currency::Usdt).unwrap();
        assert_eq!(sym.to_string(), "BTC/USDT");
        assert_eq!("BTC/USDT".parse::<Symbol>().unwrap(), sym);
    }

    #[test]
    fn rejects_base_equal_to_quote() {
        assert!(Symbol::new(Currency::Btc, Currency::Btc).is_err());
    }

    #[test]
    fn rejects_malformed_string() {
        assert!("BTCUSDT".parse::<Symbol>().is_err());
    }

    #[test]
    fn rejects_unknown_leg() {
        assert!("BTC/DOGE".parse::<Symbol>().is_err());
    }
}

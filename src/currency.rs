//! Supported currencies and their display precision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A currency supported by the exchange.
///
/// `Usdt` is the designated quote unit of account for exposure calculations
/// (§3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usdt,
    Btc,
    Eth,
}

impl Currency {
    /// Display precision in fractional digits. Ledger math never truncates
    /// to this; it only governs how amounts are rendered.
    pub fn display_precision(&self) -> u32 {
        match self {
            Currency::Usdt => 6,
            Currency::Btc => 8,
            Currency::Eth => 8,
        }
    }

    /// The quote unit of account used for exposure valuation (§4.4).
    pub fn is_quote_unit_of_account(&self) -> bool {
        matches!(self, Currency::Usdt)
    }

    pub fn all() -> &'static [Currency] {
        &[Currency::Usdt, Currency::Btc, Currency::Eth]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usdt => write!(f, "USDT"),
            Currency::Btc => write!(f, "BTC"),
            Currency::Eth => write!(f, "ETH"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported currency: {0}")]
pub struct UnknownCurrency(String);

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USDT" => Ok(Currency::Usdt),
            "BTC" => Ok(Currency::Btc),
            "ETH" => Ok(Currency::Eth),
            other => Err(UnknownCurrency(other.to_string())),
        }
    }
}

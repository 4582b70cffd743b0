//! Configuration surface (§6). Loading environment variables / files is
//! "configuration loading" per the Non-goals in §1 and lives outside this
//! crate; what we own is the shape of the config and sane defaults, plus a
//! thin `from_env` built on the `config` crate for callers who do want to
//! source it from the process environment.

use crate::currency::Currency;
use crate::symbol::Symbol;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Maximum allowed exposure, valued in the quote unit of account (§4.4).
    pub max_exposure_quote: Decimal,
    /// Whether the risk validator runs at all (§4.4).
    pub risk_enabled: bool,
    /// Slippage cushion applied to MARKET BUY reservations (§4.4, §9).
    pub market_order_slippage_buffer: Decimal,
    /// Currencies the exchange will open wallets and symbols for.
    pub supported_currencies: HashSet<Currency>,
    /// Symbols with an order book at startup.
    pub supported_symbols: Vec<Symbol>,
    /// Whether a resting order may match against another order from the
    /// same user (§4.2). Default `true` matches the reference behavior.
    pub allow_self_match: bool,
    /// Bounded retry count for balance CAS writes (§4.3).
    pub balance_cas_max_retries: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        let btc_usdt = Symbol::new(Currency::Btc, Currency::Usdt).expect("BTC != USDT");
        let eth_usdt = Symbol::new(Currency::Eth, Currency::Usdt).expect("ETH != USDT");

        Self {
            max_exposure_quote: Decimal::new(100_000, 0),
            risk_enabled: true,
            market_order_slippage_buffer: Decimal::new(110, 2), // 1.10
            supported_currencies: Currency::all().iter().copied().collect(),
            supported_symbols: vec![btc_usdt, eth_usdt],
            allow_self_match: true,
            balance_cas_max_retries: 5,
        }
    }
}

impl ExchangeConfig {
    /// Load configuration from process environment variables prefixed
    /// `EXCHANGE_` (e.g. `EXCHANGE_MAX_EXPOSURE_QUOTE`), falling back to
    /// `Default::default()` for anything unset.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("max_exposure_quote", defaults.max_exposure_quote.to_string())?
            .set_default("risk_enabled", defaults.risk_enabled)?
            .set_default(
                "market_order_slippage_buffer",
                defaults.market_order_slippage_buffer.to_string(),
            )?
            .set_default("allow_self_match", defaults.allow_self_match)?
            .set_default(
                "balance_cas_max_retries",
                defaults.balance_cas_max_retries as i64,
            )?
            .add_source(config::Environment::with_prefix("EXCHANGE"));

        let raw = builder.build()?;

        Ok(Self {
            max_exposure_quote: raw
                .get_string("max_exposure_quote")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_exposure_quote),
            risk_enabled: raw.get_bool("risk_enabled").unwrap_or(defaults.risk_enabled),
            market_order_slippage_buffer: raw
                .get_string("market_order_slippage_buffer")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.market_order_slippage_buffer),
            allow_self_match: raw
                .get_bool("allow_self_match")
                .unwrap_or(defaults.allow_self_match),
            balance_cas_max_retries: raw
                .get_int("balance_cas_max_retries")
                .map(|n| n as u32)
                .unwrap_or(defaults.balance_cas_max_retries),
            supported_currencies: defaults.supported_currencies,
            supported_symbols: defaults.supported_symbols,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ExchangeConfig::default();
        assert_eq!(cfg.max_exposure_quote, Decimal::new(100_000, 0));
        assert!(cfg.risk_enabled);
        assert_eq!(cfg.market_order_slippage_buffer, Decimal::new(110, 2));
        assert_eq!(cfg.supported_currencies.len(), 3);
        assert_eq!(cfg.supported_symbols.len(), 2);
        assert!(cfg.allow_self_match);
        assert_eq!(cfg.balance_cas_max_retries, 5);
    }

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        let cfg = ExchangeConfig::from_env().expect("config should build from defaults alone");
        assert_eq!(cfg.max_exposure_quote, Decimal::new(100_000, 0));
    }
}

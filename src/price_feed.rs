//! Reference price lookup for market-order slippage bounds (§4.7, §4.4).

use crate::symbol::Symbol;
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Source of a reference price for a symbol. Market orders use this to
/// compute a worst-case reservation bound; it is deliberately decoupled
/// from the order book's own best bid/ask so that a symbol with no resting
/// liquidity yet can still be priced.
pub trait PriceFeed: Send + Sync {
    fn get_price(&self, symbol: &Symbol) -> Option<Decimal>;
}

/// Static table seeded with defaults, overridable per symbol. Stands in
/// for an external price oracle; this crate has no network I/O (Non-goal).
pub struct StaticPriceFeed {
    prices: DashMap<Symbol, Decimal>,
}

impl StaticPriceFeed {
    pub fn new() -> Self {
        Self {
            prices: DashMap::new(),
        }
    }

    /// Seeded with the default BTC/USDT and ETH/USDT reference prices.
    pub fn with_defaults() -> Self {
        let feed = Self::new();
        if let Ok(btc_usdt) = Symbol::new(crate::currency::Currency::Btc, crate::currency::Currency::Usdt) {
            feed.set_price(btc_usdt, dec!(50000));
        }
        if let Ok(eth_usdt) = Symbol::new(crate::currency::Currency::Eth, crate::currency::Currency::Usdt) {
            feed.set_price(eth_usdt, dec!(3000));
        }
        feed
    }

    pub fn set_price(&self, symbol: Symbol, price: Decimal) {
        self.prices.insert(symbol, price);
    }
}

impl Default for StaticPriceFeed {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PriceFeed for StaticPriceFeed {
    fn get_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.prices.get(symbol).map(|entry| *entry.value())
    }
}

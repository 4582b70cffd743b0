//! Append-only trade log (§3, §6).

use crate::model::order::OrderId;
use crate::model::trade::Trade;
use crate::symbol::Symbol;
use parking_lot::RwLock;

pub struct TradeStore {
    trades: RwLock<Vec<Trade>>,
}

impl TradeStore {
    pub fn new() -> Self {
        Self {
            trades: RwLock::new(Vec::new()),
        }
    }

    pub fn append(&self, trade: Trade) {
        self.trades.write().push(trade);
    }

    pub fn for_symbol(&self, symbol: Symbol) -> Vec<Trade> {
        self.trades
            .read()
            .iter()
            .filter(|t| t.symbol == symbol)
            .cloned()
            .collect()
    }

    /// Newest-first, capped at `limit` (§6 `list_trades`).
    pub fn recent_for_symbol(&self, symbol: Symbol, limit: usize) -> Vec<Trade> {
        self.trades
            .read()
            .iter()
            .rev()
            .filter(|t| t.symbol == symbol)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn for_order(&self, order_id: OrderId) -> Vec<Trade> {
        self.trades
            .read()
            .iter()
            .filter(|t| t.buy_order_id == order_id || t.sell_order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.trades.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TradeStore {
    fn default() -> Self {
        Self::new()
    }
}

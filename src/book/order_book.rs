//! Per-symbol limit order book with price-time priority (§4.1).
//!
//! Bids are kept in descending price order, asks in ascending order, each
//! level FIFO by arrival time. Grounded on the teacher's `Orderbook`
//! (`services/matching/orderbook.rs`): a `RwLock`-guarded price ladder plus
//! a `DashMap` index for O(1) cancel-by-id, generalized from the teacher's
//! fee-aware matching to the plain price-time matching this crate needs.

use crate::book::entry::OrderBookEntry;
use crate::model::order::{OrderId, OrderSide};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Where an order sat in the book, needed to remove it in O(log n).
#[derive(Debug, Clone, Copy)]
struct Location {
    side: OrderSide,
    price: Decimal,
}

struct Ladder {
    // Stored so that `.iter()` naturally yields best-price-first: bids use
    // `Reverse`-free descending iteration via `.rev()`, asks ascend directly.
    levels: BTreeMap<Decimal, VecDeque<OrderBookEntry>>,
}

impl Ladder {
    fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    fn push(&mut self, entry: OrderBookEntry) {
        self.levels
            .entry(entry.price)
            .or_insert_with(VecDeque::new)
            .push_back(entry);
    }

    fn remove(&mut self, price: Decimal, order_id: OrderId) -> Option<OrderBookEntry> {
        let level = self.levels.get_mut(&price)?;
        let idx = level.iter().position(|e| e.order_id == order_id)?;
        let removed = level.remove(idx);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        removed
    }
}

/// The two-sided book for a single trading symbol.
pub struct OrderBook {
    bids: RwLock<Ladder>,
    asks: RwLock<Ladder>,
    index: dashmap::DashMap<OrderId, Location>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: RwLock::new(Ladder::new()),
            asks: RwLock::new(Ladder::new()),
            index: dashmap::DashMap::new(),
        }
    }

    fn ladder(&self, side: OrderSide) -> &RwLock<Ladder> {
        match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        }
    }

    /// Insert a resting entry. Callers are responsible for ensuring the
    /// order was not already matched in full before it reaches the book.
    pub fn insert(&self, entry: OrderBookEntry) {
        self.index.insert(
            entry.order_id,
            Location {
                side: entry.side,
                price: entry.price,
            },
        );
        self.ladder(entry.side).write().push(entry);
    }

    /// Remove a resting order by id, e.g. on cancel or full fill.
    pub fn remove(&self, order_id: OrderId) -> Option<OrderBookEntry> {
        let (_, location) = self.index.remove(&order_id)?;
        self.ladder(location.side).write().remove(location.price, order_id)
    }

    /// Reduce a resting order's remaining quantity by at most
    /// `requested_qty` (partial fill against it), capping to whatever is
    /// still actually resting under this call's own write-lock acquisition.
    /// A concurrent match against the same symbol may have already
    /// consumed some or all of this order since the caller snapshotted it
    /// via `counter_side`, so the caller must build its trade/fill from the
    /// returned `(applied, fully_filled)` pair, not from its own estimate
    /// (§4.1/§5: fill quantities are only ever decided under this lock).
    /// Removes the entry from the book once it is exhausted.
    pub fn reduce(&self, order_id: OrderId, requested_qty: Decimal) -> (Decimal, bool) {
        let Some(location) = self.index.get(&order_id).map(|l| *l) else {
            return (Decimal::ZERO, false);
        };
        let mut ladder = self.ladder(location.side).write();

        let mut applied = Decimal::ZERO;
        let mut fully_filled = false;
        // `order_removed` tracks whether the entry itself was exhausted
        // (needs dropping from the index); `level_empty` tracks whether its
        // whole price level is now empty (needs dropping from the ladder).
        let mut order_removed = false;
        let mut level_empty = false;

        if let Some(level) = ladder.levels.get_mut(&location.price) {
            if let Some(idx) = level.iter().position(|e| e.order_id == order_id) {
                applied = requested_qty.min(level[idx].remaining_qty);
                level[idx].remaining_qty -= applied;
                if level[idx].remaining_qty <= Decimal::ZERO {
                    level.remove(idx);
                    order_removed = true;
                    fully_filled = true;
                    level_empty = level.is_empty();
                }
            }
        }

        if level_empty {
            ladder.levels.remove(&location.price);
        }
        drop(ladder);

        if order_removed {
            self.index.remove(&order_id);
        }

        (applied, fully_filled)
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.read().levels.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.read().levels.keys().next().copied()
    }

    /// Snapshot the opposite side's entries in match priority order: best
    /// price first, then oldest arrival within a price level. This snapshot
    /// is only a candidate list, not a reservation: the matching engine
    /// re-acquires the write lock per candidate via `reduce`, which re-checks
    /// the live remaining quantity under that lock and reports what it
    /// actually applied, so a concurrent match against the same symbol can
    /// never be double-settled against the same resting quantity (§4.1/§5).
    pub fn counter_side(&self, side: OrderSide) -> Vec<OrderBookEntry> {
        let opposite = side.opposite();
        let ladder = self.ladder(opposite).read();
        match opposite {
            OrderSide::Buy => ladder
                .levels
                .iter()
                .rev()
                .flat_map(|(_, level)| level.iter().cloned())
                .collect(),
            OrderSide::Sell => ladder
                .levels
                .iter()
                .flat_map(|(_, level)| level.iter().cloned())
                .collect(),
        }
    }

    pub fn depth(&self, side: OrderSide) -> Vec<(Decimal, Decimal)> {
        let ladder = self.ladder(side).read();
        let totals = |level: &VecDeque<OrderBookEntry>| {
            level.iter().fold(Decimal::ZERO, |acc, e| acc + e.remaining_qty)
        };
        match side {
            OrderSide::Buy => ladder
                .levels
                .iter()
                .rev()
                .map(|(price, level)| (*price, totals(level)))
                .collect(),
            OrderSide::Sell => ladder
                .levels
                .iter()
                .map(|(price, level)| (*price, totals(level)))
                .collect(),
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedOrderBook = Arc<OrderBook>;

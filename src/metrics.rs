//! Matching-engine counters and gauges, trimmed from the teacher's
//! `metrics/mod.rs` down to what this crate's surface actually emits.
//! No Prometheus exporter is wired up (Non-goal: no HTTP layer); callers
//! who want one install their own `metrics` recorder before constructing
//! an `Exchange`.

use metrics::{counter, gauge};

pub mod names {
    pub const ORDERS_SUBMITTED_TOTAL: &str = "orders_submitted_total";
    pub const ORDERS_MATCHED_TOTAL: &str = "orders_matched_total";
    pub const ORDERS_CANCELLED_TOTAL: &str = "orders_cancelled_total";
    pub const TRADES_EXECUTED_TOTAL: &str = "trades_executed_total";
    pub const BALANCE_CAS_RETRIES_TOTAL: &str = "balance_cas_retries_total";
    pub const ORDERBOOK_DEPTH: &str = "orderbook_depth";
}

pub fn record_order_submitted(symbol: &str, side: &str) {
    counter!(names::ORDERS_SUBMITTED_TOTAL, "symbol" => symbol.to_string(), "side" => side.to_string()).increment(1);
}

pub fn record_order_matched(symbol: &str) {
    counter!(names::ORDERS_MATCHED_TOTAL, "symbol" => symbol.to_string()).increment(1);
}

pub fn record_order_cancelled(symbol: &str) {
    counter!(names::ORDERS_CANCELLED_TOTAL, "symbol" => symbol.to_string()).increment(1);
}

pub fn record_trade_executed(symbol: &str) {
    counter!(names::TRADES_EXECUTED_TOTAL, "symbol" => symbol.to_string()).increment(1);
}

pub fn record_balance_cas_retry() {
    counter!(names::BALANCE_CAS_RETRIES_TOTAL).increment(1);
}

pub fn record_orderbook_depth(symbol: &str, side: &str, depth: f64) {
    gauge!(names::ORDERBOOK_DEPTH, "symbol" => symbol.to_string(), "side" => side.to_string()).set(depth);
}

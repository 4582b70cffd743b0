//! A resting order's projection inside the order book (§3, §4.1).

use crate::model::order::{OrderId, OrderSide, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// An immutable snapshot of a resting order as seen by the book. The
/// book only needs enough to match and to report depth; the order's full
/// record lives in the Order Store.
#[derive(Debug, Clone)]
pub struct OrderBookEntry {
    pub order_id: OrderId,
    pub user: UserId,
    pub side: OrderSide,
    pub price: Decimal,
    pub remaining_qty: Decimal,
    pub arrival_time: DateTime<Utc>,
}

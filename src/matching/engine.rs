//! Price-time priority matching algorithm (§4.2).
//!
//! Grounded on the teacher's `MatchingEngine::match_order` but stripped of
//! fee computation (no fee concept in this system) and of partial-cancel
//! bookkeeping (handled by the Coordinator instead, §4.5).

use crate::book::{OrderBook, OrderBookEntry};
use crate::model::order::{Order, OrderKind, OrderSide};
use crate::model::trade::Trade;
use chrono::Utc;
use rust_decimal::Decimal;

/// One resting order crossed by an incoming order.
#[derive(Debug, Clone)]
pub struct Fill {
    pub resting_order_id: crate::model::order::OrderId,
    pub resting_user: crate::model::order::UserId,
    pub price: Decimal,
    pub qty: Decimal,
    pub resting_fully_filled: bool,
}

/// Outcome of matching one incoming order against a book.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub fills: Vec<Fill>,
    pub trades: Vec<Trade>,
    pub incoming_filled_qty: Decimal,
}

impl MatchOutcome {
    fn empty() -> Self {
        Self {
            fills: Vec::new(),
            trades: Vec::new(),
            incoming_filled_qty: Decimal::ZERO,
        }
    }
}

/// Crosses `incoming` against the resting orders on the opposite side of
/// `book`, in price-time priority, down to the incoming order's limit
/// (or unbounded for a market order). Mutates the book in place for every
/// resting order it fully or partially consumes; does not insert the
/// incoming order itself — that is the caller's job once matching settles
/// (§4.2: a limit order rests only after exhausting all immediate crosses).
///
/// `allow_self_match` controls whether a resting order belonging to the
/// same user as `incoming` may be crossed (§9).
pub fn match_order(book: &OrderBook, incoming: &Order, allow_self_match: bool) -> MatchOutcome {
    let mut outcome = MatchOutcome::empty();
    let mut remaining = incoming.remaining_qty();
    if remaining <= Decimal::ZERO {
        return outcome;
    }

    let candidates = book.counter_side(incoming.side);

    for candidate in candidates {
        if remaining <= Decimal::ZERO {
            break;
        }
        if !allow_self_match && candidate.user == incoming.user {
            continue;
        }
        if !crosses(incoming, &candidate) {
            break;
        }

        let requested_qty = remaining.min(candidate.remaining_qty);
        let trade_price = candidate.price;

        // `candidate` is a snapshot taken before this loop started; another
        // concurrent match against this symbol may have already consumed
        // some or all of it since then. `reduce` re-checks under its own
        // write lock and reports what it actually applied — that is the
        // only quantity this run is allowed to trade, never `requested_qty`.
        let (trade_qty, resting_fully_filled) = book.reduce(candidate.order_id, requested_qty);
        if trade_qty <= Decimal::ZERO {
            // Already fully consumed by someone else; move on to the next
            // candidate rather than fabricating a trade against nothing.
            continue;
        }

        let (buy_order_id, sell_order_id) = match incoming.side {
            OrderSide::Buy => (incoming.id, candidate.order_id),
            OrderSide::Sell => (candidate.order_id, incoming.id),
        };

        outcome.trades.push(Trade {
            id: crate::model::trade::TradeId::new(),
            buy_order_id,
            sell_order_id,
            symbol: incoming.symbol,
            price: trade_price,
            qty: trade_qty,
            timestamp: Utc::now(),
        });

        outcome.fills.push(Fill {
            resting_order_id: candidate.order_id,
            resting_user: candidate.user,
            price: trade_price,
            qty: trade_qty,
            resting_fully_filled,
        });

        remaining -= trade_qty;
        outcome.incoming_filled_qty += trade_qty;
    }

    outcome
}

/// Whether the incoming order's limit (if any) crosses the resting entry's
/// price. Market orders always cross.
fn crosses(incoming: &Order, resting: &OrderBookEntry) -> bool {
    match incoming.kind {
        OrderKind::Market => true,
        OrderKind::Limit => {
            let Some(limit) = incoming.limit_price else {
                return true;
            };
            match incoming.side {
                OrderSide::Buy => limit >= resting.price,
                OrderSide::Sell => limit <= resting.price,
            }
        }
    }
}

/// Builds the `OrderBookEntry` projection for an order that rests after
/// matching, if it rests at all (§4.2: market orders never rest, §9).
pub fn resting_entry_for(order: &Order) -> Option<OrderBookEntry> {
    if order.kind == OrderKind::Market {
        return None;
    }
    let remaining = order.remaining_qty();
    if remaining <= Decimal::ZERO {
        return None;
    }
    Some(OrderBookEntry {
        order_id: order.id,
        user: order.user,
        side: order.side,
        price: order.limit_price?,
        remaining_qty: remaining,
        arrival_time: order.created_at,
    })
}

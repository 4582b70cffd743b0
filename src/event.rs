//! Domain events and the event sink interface (§3, §4.6, §9).
//!
//! The reference models events as a common base class; we replace that
//! inheritance with a tagged `enum` and dispatch by matching on the tag,
//! per the design note in §9.

use crate::currency::Currency;
use crate::model::order::{OrderId, OrderKind, OrderSide, UserId};
use crate::model::trade::TradeId;
use crate::model::wallet::BalanceChangeReason;
use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub user: UserId,
    pub symbol: Symbol,
    pub kind: OrderKind,
    pub side: OrderSide,
    pub price: Option<Decimal>,
    pub qty: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderMatched {
    pub order_id: OrderId,
    pub matched_qty: Decimal,
    pub matched_price: Decimal,
    pub fully_filled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecuted {
    pub trade_id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub symbol: Symbol,
    pub price: Decimal,
    pub qty: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceUpdated {
    pub user: UserId,
    pub currency: Currency,
    pub new_balance: Decimal,
    pub delta: Decimal,
    pub reason: BalanceChangeReason,
}

/// A domain event, tagged by variant rather than by an inheritance
/// hierarchy (§9). Every event carries a unique id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    OrderPlaced(OrderPlaced),
    OrderMatched(OrderMatched),
    TradeExecuted(TradeExecuted),
    BalanceUpdated(BalanceUpdated),
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// The four topics an `EventSink` publishes to (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    OrderPlaced,
    OrderMatched,
    TradeExecuted,
    BalanceUpdated,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::OrderPlaced => "order-placed",
            Topic::OrderMatched => "order-matched",
            Topic::TradeExecuted => "trade-executed",
            Topic::BalanceUpdated => "balance-updated",
        }
    }
}

/// Durable, best-effort-ordered-per-key, at-least-once publish (§4.6).
/// Implementations must not fail the caller's transaction; publish
/// failures are logged and swallowed by the coordinator, not by the sink
/// itself, so the trait stays infallible from the coordinator's view.
pub trait EventSink: Send + Sync {
    fn publish(&self, topic: Topic, key: &str, event: Event);
}

/// In-process sink built on `tokio::sync::broadcast`, one channel per
/// topic, mirroring the teacher's `subscribe_trades()`/
/// `subscribe_orderbook()` channels on `MatchingEngine`.
pub struct BroadcastEventSink {
    order_placed: broadcast::Sender<(String, Event)>,
    order_matched: broadcast::Sender<(String, Event)>,
    trade_executed: broadcast::Sender<(String, Event)>,
    balance_updated: broadcast::Sender<(String, Event)>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            order_placed: broadcast::channel(capacity).0,
            order_matched: broadcast::channel(capacity).0,
            trade_executed: broadcast::channel(capacity).0,
            balance_updated: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<(String, Event)> {
        match topic {
            Topic::OrderPlaced => &self.order_placed,
            Topic::OrderMatched => &self.order_matched,
            Topic::TradeExecuted => &self.trade_executed,
            Topic::BalanceUpdated => &self.balance_updated,
        }
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<(String, Event)> {
        self.sender(topic).subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, topic: Topic, key: &str, event: Event) {
        // No subscribers is not an error; `send` failing here just means
        // nobody is listening right now, which is fine for a fire-and-forget
        // sink (§4.6, §7).
        if self.sender(topic).send((key.to_string(), event)).is_err() {
            warn!(topic = topic.as_str(), key, "event published with no subscribers");
        }
    }
}

/// Sink that discards everything; useful for tests that don't care about
/// the event stream.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _topic: Topic, _key: &str, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::order::{OrderKind, OrderSide};
    use rust_decimal_macros::dec;

    #[test]
    fn broadcast_sink_delivers_to_subscriber() {
        let sink = BroadcastEventSink::default();
        let mut rx = sink.subscribe(Topic::OrderPlaced);

        let event = Event::new(EventPayload::OrderPlaced(OrderPlaced {
            order_id: OrderId::new(),
            user: UserId(1),
            symbol: Symbol::new(Currency::Btc, Currency::Usdt).unwrap(),
            kind: OrderKind::Limit,
            side: OrderSide::Buy,
            price: Some(dec!(50000)),
            qty: dec!(1),
        }));

        sink.publish(Topic::OrderPlaced, "order-1", event.clone());

        let (key, received) = rx.try_recv().unwrap();
        assert_eq!(key, "order-1");
        assert_eq!(received.event_id, event.event_id);
    }

    #[test]
    fn null_sink_accepts_everything_silently() {
        let sink = NullEventSink;
        let event = Event::new(EventPayload::TradeExecuted(TradeExecuted {
            trade_id: TradeId::new(),
            buy_order_id: OrderId::new(),
            sell_order_id: OrderId::new(),
            symbol: Symbol::new(Currency::Eth, Currency::Usdt).unwrap(),
            price: dec!(3000),
            qty: dec!(2),
        }));
        sink.publish(Topic::TradeExecuted, "trade-1", event);
    }
}

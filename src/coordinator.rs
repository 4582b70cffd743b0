//! Central orchestration of order submission, cancellation, and wallet
//! movement (§4.5). Grounded on the teacher's `OrderbookEngine`/settlement
//! flow (`services/matching/mod.rs`, `services/settlement.rs`),
//! generalized from its fee-aware Postgres transaction to the in-memory
//! CAS-backed stores this crate uses in its place.

use crate::book::{resting_entry_for, OrderBook};
use crate::config::ExchangeConfig;
use crate::error::{ExchangeError, ExchangeResult};
use crate::event::{
    BalanceUpdated, Event, EventPayload, EventSink, OrderMatched, OrderPlaced, Topic, TradeExecuted,
};
use crate::matching::match_order;
use crate::model::order::{Order, OrderId, OrderKind, OrderSide, OrderStatus, UserId};
use crate::model::wallet::BalanceChangeReason;
use crate::price_feed::PriceFeed;
use crate::risk::RiskValidator;
use crate::store::{BalanceStore, OrderStore, TradeStore};
use crate::symbol::Symbol;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

/// A request to place a new order. Construction is deliberately plain
/// data; shape validation happens inside `submit_order`.
#[derive(Debug, Clone)]
pub struct SubmitOrderRequest {
    pub user: UserId,
    pub symbol: Symbol,
    pub kind: OrderKind,
    pub side: OrderSide,
    pub limit_price: Option<Decimal>,
    pub qty: Decimal,
    pub idempotency_key: Option<String>,
}

pub struct TradingCoordinator {
    config: Arc<ExchangeConfig>,
    balances: Arc<BalanceStore>,
    orders: Arc<OrderStore>,
    trades: Arc<TradeStore>,
    price_feed: Arc<dyn PriceFeed>,
    event_sink: Arc<dyn EventSink>,
    deposit_keys: dashmap::DashSet<String>,
    withdraw_keys: dashmap::DashSet<String>,
}

impl TradingCoordinator {
    pub fn new(
        config: Arc<ExchangeConfig>,
        balances: Arc<BalanceStore>,
        orders: Arc<OrderStore>,
        trades: Arc<TradeStore>,
        price_feed: Arc<dyn PriceFeed>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            balances,
            orders,
            trades,
            price_feed,
            event_sink,
            deposit_keys: dashmap::DashSet::new(),
            withdraw_keys: dashmap::DashSet::new(),
        }
    }

    fn publish(&self, topic: Topic, key: &str, payload: EventPayload) {
        // Fire-and-forget: a publish failure never rolls back the ledger
        // (§7, §9). The sink itself never returns an error; this call can't
        // fail, but a dropped receiver inside it is already logged there.
        self.event_sink.publish(topic, key, Event::new(payload));
    }

    /// §4.5 submit flow, steps 1-9.
    #[instrument(skip(self, book), fields(user = %request.user, symbol = %request.symbol))]
    pub async fn submit_order(&self, book: &OrderBook, request: SubmitOrderRequest) -> ExchangeResult<Order> {
        if let Some(key) = &request.idempotency_key {
            if self.orders.find_by_idempotency_key(key).is_some() {
                return Err(ExchangeError::Duplicate {
                    idempotency_key: key.clone(),
                });
            }
        }

        match request.kind {
            OrderKind::Limit if request.limit_price.is_none() => {
                return Err(ExchangeError::Validation(
                    "limit order requires a price".to_string(),
                ))
            }
            OrderKind::Market if request.limit_price.is_some() => {
                return Err(ExchangeError::Validation(
                    "market order must not carry a price".to_string(),
                ))
            }
            _ => {}
        }

        let validator = RiskValidator::new(&self.config, &self.balances, self.price_feed.as_ref());
        let reservation = validator.validate(
            request.user,
            request.symbol,
            request.side,
            request.kind,
            request.limit_price,
            request.qty,
        )?;

        // Reserve funds. For LIMIT BUY this reserves the full notional up
        // front and is never topped up or refunded if the order later fills
        // below its limit price — a known gap carried over bug-for-bug from
        // the reference (§9); see `settle_trade` below for where the
        // residual goes unrefunded.
        let wallet = self
            .balances
            .debit(request.user, reservation.currency, reservation.amount)?;
        self.publish(
            Topic::BalanceUpdated,
            &format!("{}:{}", request.user, reservation.currency),
            EventPayload::BalanceUpdated(BalanceUpdated {
                user: request.user,
                currency: reservation.currency,
                new_balance: wallet.available_balance,
                delta: -reservation.amount,
                reason: BalanceChangeReason::Reservation,
            }),
        );

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            user: request.user,
            kind: request.kind,
            side: request.side,
            symbol: request.symbol,
            limit_price: request.limit_price,
            original_qty: request.qty,
            filled_qty: Decimal::ZERO,
            status: OrderStatus::Open,
            idempotency_key: request.idempotency_key.clone(),
            created_at: now,
            updated_at: now,
        };
        let order = self.orders.insert(order)?;

        self.publish(
            Topic::OrderPlaced,
            &order.id.to_string(),
            EventPayload::OrderPlaced(OrderPlaced {
                order_id: order.id,
                user: order.user,
                symbol: order.symbol,
                kind: order.kind,
                side: order.side,
                price: order.limit_price,
                qty: order.original_qty,
            }),
        );

        crate::metrics::record_order_submitted(&order.symbol.to_string(), &order.side.to_string());

        let outcome = match_order(book, &order, self.config.allow_self_match);

        let mut incoming = order;
        for (trade, fill) in outcome.trades.into_iter().zip(outcome.fills.into_iter()) {
            self.settle_trade(&mut incoming, trade, fill)?;
        }

        if incoming.kind == OrderKind::Market {
            // Market orders never rest; any unfilled remainder is simply
            // dropped rather than left open (§4.2 point 4, §8 scenario 8).
            incoming.status = OrderStatus::Filled;
        } else {
            incoming.status = OrderStatus::from_fill(incoming.original_qty, incoming.filled_qty);
            if let Some(entry) = resting_entry_for(&incoming) {
                book.insert(entry);
            }
        }
        incoming.updated_at = Utc::now();
        self.orders.update(incoming.clone());

        info!(order_id = %incoming.id, status = %incoming.status, filled_qty = %incoming.filled_qty, "order submitted");
        Ok(incoming)
    }

    /// §4.5 submit flow, step 8: settle one trade against the incoming
    /// order and the resting order it matched.
    fn settle_trade(
        &self,
        incoming: &mut Order,
        trade: crate::model::trade::Trade,
        fill: crate::matching::Fill,
    ) -> ExchangeResult<()> {
        self.trades.append(trade.clone());
        crate::metrics::record_trade_executed(&trade.symbol.to_string());
        crate::metrics::record_order_matched(&trade.symbol.to_string());

        incoming.filled_qty += fill.qty;
        incoming.status = OrderStatus::from_fill(incoming.original_qty, incoming.filled_qty);

        let mut resting = self.orders.require(fill.resting_order_id)?;
        resting.filled_qty += fill.qty;
        resting.status = OrderStatus::from_fill(resting.original_qty, resting.filled_qty);
        resting.updated_at = Utc::now();
        self.orders.update(resting.clone());

        let notional = fill.price * fill.qty;

        // Ledger movements (§4.5 step 8c). The pre-reserved side of each
        // party was already debited at reservation time; only the
        // counter-asset is credited here. For a LIMIT BUY that reserved more
        // quote than this fill consumes (fill price below limit), the
        // difference is not refunded here or anywhere else — see the
        // "Known semantic gap" note in §4.5/§9.
        let (buyer, seller) = match incoming.side {
            OrderSide::Buy => (incoming.user, fill.resting_user),
            OrderSide::Sell => (fill.resting_user, incoming.user),
        };

        let buyer_wallet = self.balances.credit(buyer, trade.symbol.base, fill.qty)?;
        self.publish(
            Topic::BalanceUpdated,
            &format!("{}:{}", buyer, trade.symbol.base),
            EventPayload::BalanceUpdated(BalanceUpdated {
                user: buyer,
                currency: trade.symbol.base,
                new_balance: buyer_wallet.available_balance,
                delta: fill.qty,
                reason: BalanceChangeReason::Settlement,
            }),
        );

        let seller_wallet = self.balances.credit(seller, trade.symbol.quote, notional)?;
        self.publish(
            Topic::BalanceUpdated,
            &format!("{}:{}", seller, trade.symbol.quote),
            EventPayload::BalanceUpdated(BalanceUpdated {
                user: seller,
                currency: trade.symbol.quote,
                new_balance: seller_wallet.available_balance,
                delta: notional,
                reason: BalanceChangeReason::Settlement,
            }),
        );

        self.publish(
            Topic::OrderMatched,
            &incoming.id.to_string(),
            EventPayload::OrderMatched(OrderMatched {
                order_id: incoming.id,
                matched_qty: fill.qty,
                matched_price: fill.price,
                fully_filled: incoming.status == OrderStatus::Filled,
            }),
        );
        self.publish(
            Topic::OrderMatched,
            &fill.resting_order_id.to_string(),
            EventPayload::OrderMatched(OrderMatched {
                order_id: fill.resting_order_id,
                matched_qty: fill.qty,
                matched_price: fill.price,
                fully_filled: fill.resting_fully_filled,
            }),
        );
        self.publish(
            Topic::TradeExecuted,
            &trade.symbol.to_string(),
            EventPayload::TradeExecuted(TradeExecuted {
                trade_id: trade.id,
                buy_order_id: trade.buy_order_id,
                sell_order_id: trade.sell_order_id,
                symbol: trade.symbol,
                price: trade.price,
                qty: trade.qty,
            }),
        );

        Ok(())
    }

    /// §4.5 cancel flow.
    #[instrument(skip(self, book))]
    pub async fn cancel_order(&self, book: &OrderBook, order_id: OrderId) -> ExchangeResult<Order> {
        let mut order = self.orders.require(order_id)?;
        if !order.status.is_cancellable() {
            return Err(ExchangeError::Uncancellable {
                order_id,
                status: order.status,
            });
        }

        // MARKET orders never rest (§4.2); a MARKET order can only be seen
        // here in the narrow instant between matching and its forced
        // terminal FILLED status, so there is no release computation for it
        // beyond what `submit_order` already finalized (§9 decision 3).
        if order.kind == OrderKind::Limit {
            let remaining = order.remaining_qty();
            if remaining > Decimal::ZERO {
                let limit_price = order.limit_price.ok_or_else(|| {
                    ExchangeError::Internal(format!("limit order {order_id} missing price"))
                })?;
                let (currency, amount) = match order.side {
                    OrderSide::Buy => (order.symbol.quote, remaining * limit_price),
                    OrderSide::Sell => (order.symbol.base, remaining),
                };
                let wallet = self.balances.credit(order.user, currency, amount)?;
                self.publish(
                    Topic::BalanceUpdated,
                    &format!("{}:{}", order.user, currency),
                    EventPayload::BalanceUpdated(BalanceUpdated {
                        user: order.user,
                        currency,
                        new_balance: wallet.available_balance,
                        delta: amount,
                        reason: BalanceChangeReason::Release,
                    }),
                );
            }
            book.remove(order_id);
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        self.orders.update(order.clone());

        crate::metrics::record_order_cancelled(&order.symbol.to_string());
        info!(order_id = %order.id, "order cancelled");
        Ok(order)
    }

    /// Direct wallet credit; supports an idempotency key against the same
    /// discipline as order submission (§4.5).
    pub async fn deposit(
        &self,
        user: UserId,
        currency: crate::currency::Currency,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> ExchangeResult<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::Validation("deposit amount must be positive".to_string()));
        }
        if let Some(key) = idempotency_key {
            if self.deposit_keys.contains(key) {
                return Err(ExchangeError::Duplicate {
                    idempotency_key: key.to_string(),
                });
            }
            self.deposit_keys.insert(key.to_string());
        }

        let wallet = self.balances.credit(user, currency, amount)?;
        self.publish(
            Topic::BalanceUpdated,
            &format!("{}:{}", user, currency),
            EventPayload::BalanceUpdated(BalanceUpdated {
                user,
                currency,
                new_balance: wallet.available_balance,
                delta: amount,
                reason: BalanceChangeReason::Deposit,
            }),
        );
        Ok(wallet.available_balance)
    }

    pub async fn withdraw(
        &self,
        user: UserId,
        currency: crate::currency::Currency,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> ExchangeResult<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::Validation("withdraw amount must be positive".to_string()));
        }
        if let Some(key) = idempotency_key {
            if self.withdraw_keys.contains(key) {
                return Err(ExchangeError::Duplicate {
                    idempotency_key: key.to_string(),
                });
            }
            self.withdraw_keys.insert(key.to_string());
        }
        let wallet = self.balances.debit(user, currency, amount)?;
        self.publish(
            Topic::BalanceUpdated,
            &format!("{}:{}", user, currency),
            EventPayload::BalanceUpdated(BalanceUpdated {
                user,
                currency,
                new_balance: wallet.available_balance,
                delta: -amount,
                reason: BalanceChangeReason::Withdraw,
            }),
        );
        Ok(wallet.available_balance)
    }
}

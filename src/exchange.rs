//! Composition root (§9: no module-level mutable statics). An `Exchange`
//! is constructed once by the caller and owns every per-symbol order book
//! plus the shared service handles injected into the coordinator.
//! Grounded on the teacher's `AppState`/`MatchingEngine::with_symbols`.

use crate::book::OrderBook;
use crate::config::ExchangeConfig;
use crate::coordinator::{SubmitOrderRequest, TradingCoordinator};
use crate::currency::Currency;
use crate::error::{ExchangeError, ExchangeResult};
use crate::event::{EventSink, NullEventSink};
use crate::model::order::{Order, OrderId, OrderSide, UserId};
use crate::model::trade::Trade;
use crate::model::wallet::Wallet;
use crate::price_feed::{PriceFeed, StaticPriceFeed};
use crate::store::{BalanceStore, OrderStore, TradeStore};
use crate::symbol::Symbol;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Book depth by price level, best price first on each side (§6
/// `get_order_book`).
#[derive(Debug, Clone)]
pub struct OrderBookSnapshot {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

pub struct Exchange {
    config: Arc<ExchangeConfig>,
    books: DashMap<Symbol, Arc<OrderBook>>,
    balances: Arc<BalanceStore>,
    orders: Arc<OrderStore>,
    trades: Arc<TradeStore>,
    coordinator: TradingCoordinator,
}

impl Exchange {
    /// Builds an exchange with the default in-process price feed and a
    /// discarding event sink. Use `with_services` to inject real ones.
    pub fn new(config: ExchangeConfig) -> Self {
        Self::with_services(config, Arc::new(StaticPriceFeed::with_defaults()), Arc::new(NullEventSink))
    }

    pub fn with_services(config: ExchangeConfig, price_feed: Arc<dyn PriceFeed>, event_sink: Arc<dyn EventSink>) -> Self {
        let config = Arc::new(config);
        let balances = Arc::new(BalanceStore::new(&config));
        let orders = Arc::new(OrderStore::new());
        let trades = Arc::new(TradeStore::new());

        let books = DashMap::new();
        for symbol in &config.supported_symbols {
            books.insert(*symbol, Arc::new(OrderBook::new()));
        }

        let coordinator = TradingCoordinator::new(
            config.clone(),
            balances.clone(),
            orders.clone(),
            trades.clone(),
            price_feed,
            event_sink,
        );

        Self {
            config,
            books,
            balances,
            orders,
            trades,
            coordinator,
        }
    }

    fn book_for(&self, symbol: Symbol) -> ExchangeResult<Arc<OrderBook>> {
        self.books
            .get(&symbol)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ExchangeError::Validation(format!("unsupported symbol {symbol}")))
    }

    /// Each call runs matching and ledger mutation synchronously on the
    /// calling task; the `async` signature exists so this composes with a
    /// `tokio` runtime and callers that also await I/O, not because the
    /// body itself suspends.
    pub async fn submit_order(&self, request: SubmitOrderRequest) -> ExchangeResult<Order> {
        let book = self.book_for(request.symbol)?;
        self.coordinator.submit_order(&book, request).await
    }

    pub async fn cancel_order(&self, symbol: Symbol, order_id: OrderId) -> ExchangeResult<Order> {
        let book = self.book_for(symbol)?;
        self.coordinator.cancel_order(&book, order_id).await
    }

    pub async fn deposit(
        &self,
        user: UserId,
        currency: Currency,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> ExchangeResult<Decimal> {
        self.coordinator.deposit(user, currency, amount, idempotency_key).await
    }

    pub async fn withdraw(
        &self,
        user: UserId,
        currency: Currency,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> ExchangeResult<Decimal> {
        self.coordinator.withdraw(user, currency, amount, idempotency_key).await
    }

    pub fn balance(&self, user: UserId, currency: Currency) -> Wallet {
        self.balances.get_or_zero(user, currency)
    }

    pub fn balances(&self, user: UserId) -> Vec<Wallet> {
        self.balances.list(user)
    }

    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(order_id)
    }

    pub fn orders_for(&self, user: UserId) -> Vec<Order> {
        self.orders.list_for_user(user)
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    /// Current book depth by price level, best price first on each side.
    pub fn get_order_book(&self, symbol: Symbol) -> ExchangeResult<OrderBookSnapshot> {
        let book = self.book_for(symbol)?;
        Ok(OrderBookSnapshot {
            bids: book.depth(OrderSide::Buy),
            asks: book.depth(OrderSide::Sell),
        })
    }

    /// Most recent trades for a symbol, newest first, capped at `limit`.
    pub fn list_trades(&self, symbol: Symbol, limit: usize) -> Vec<Trade> {
        self.trades.recent_for_symbol(symbol, limit)
    }

    pub fn best_bid(&self, symbol: Symbol) -> Option<Decimal> {
        self.books.get(&symbol).and_then(|b| b.best_bid())
    }

    pub fn best_ask(&self, symbol: Symbol) -> Option<Decimal> {
        self.books.get(&symbol).and_then(|b| b.best_ask())
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::order::{OrderKind, OrderSide};
    use rust_decimal_macros::dec;

    fn btc_usdt() -> Symbol {
        Symbol::new(Currency::Btc, Currency::Usdt).unwrap()
    }

    #[tokio::test]
    async fn single_crossing_match_settles_both_sides() {
        let exchange = Exchange::new(ExchangeConfig::default());
        let alice = UserId(1);
        let bob = UserId(2);

        exchange.deposit(alice, Currency::Usdt, dec!(10000), None).await.unwrap();
        exchange.deposit(bob, Currency::Btc, dec!(1), None).await.unwrap();

        exchange
            .submit_order(SubmitOrderRequest {
                user: alice,
                symbol: btc_usdt(),
                kind: OrderKind::Limit,
                side: OrderSide::Buy,
                limit_price: Some(dec!(50000)),
                qty: dec!(0.1),
                idempotency_key: None,
            })
            .await
            .unwrap();

        exchange
            .submit_order(SubmitOrderRequest {
                user: bob,
                symbol: btc_usdt(),
                kind: OrderKind::Limit,
                side: OrderSide::Sell,
                limit_price: Some(dec!(50000)),
                qty: dec!(0.1),
                idempotency_key: None,
            })
            .await
            .unwrap();

        assert_eq!(exchange.balance(alice, Currency::Usdt).available_balance, dec!(5000));
        assert_eq!(exchange.balance(alice, Currency::Btc).available_balance, dec!(0.1));
        assert_eq!(exchange.balance(bob, Currency::Usdt).available_balance, dec!(5000));
        assert_eq!(exchange.balance(bob, Currency::Btc).available_balance, dec!(0.9));
        assert_eq!(exchange.trade_count(), 1);
    }

    #[tokio::test]
    async fn cancel_refunds_reserved_quote() {
        let exchange = Exchange::new(ExchangeConfig::default());
        let alice = UserId(1);
        exchange.deposit(alice, Currency::Usdt, dec!(10000), None).await.unwrap();

        let order = exchange
            .submit_order(SubmitOrderRequest {
                user: alice,
                symbol: btc_usdt(),
                kind: OrderKind::Limit,
                side: OrderSide::Buy,
                limit_price: Some(dec!(50000)),
                qty: dec!(0.1),
                idempotency_key: None,
            })
            .await
            .unwrap();

        assert_eq!(exchange.balance(alice, Currency::Usdt).available_balance, dec!(5000));

        let cancelled = exchange.cancel_order(btc_usdt(), order.id).await.unwrap();
        assert_eq!(cancelled.status, crate::model::order::OrderStatus::Cancelled);
        assert_eq!(exchange.balance(alice, Currency::Usdt).available_balance, dec!(10000));
        assert_eq!(exchange.best_bid(btc_usdt()), None);
    }

    #[tokio::test]
    async fn exposure_cap_rejects_oversized_order() {
        let mut config = ExchangeConfig::default();
        config.max_exposure_quote = dec!(1000);
        let exchange = Exchange::new(config);
        let alice = UserId(1);
        exchange.deposit(alice, Currency::Btc, dec!(10), None).await.unwrap();
        exchange.deposit(alice, Currency::Usdt, dec!(100000), None).await.unwrap();

        let err = exchange
            .submit_order(SubmitOrderRequest {
                user: alice,
                symbol: btc_usdt(),
                kind: OrderKind::Limit,
                side: OrderSide::Buy,
                limit_price: Some(dec!(50000)),
                qty: dec!(0.1),
                idempotency_key: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::ExposureExceeded { .. }));
    }

    #[tokio::test]
    async fn market_buy_with_partial_liquidity_is_marked_filled() {
        let exchange = Exchange::new(ExchangeConfig::default());
        let alice = UserId(1);
        let bob = UserId(2);
        exchange.deposit(alice, Currency::Usdt, dec!(100000), None).await.unwrap();
        exchange.deposit(bob, Currency::Btc, dec!(0.5), None).await.unwrap();

        exchange
            .submit_order(SubmitOrderRequest {
                user: bob,
                symbol: btc_usdt(),
                kind: OrderKind::Limit,
                side: OrderSide::Sell,
                limit_price: Some(dec!(50000)),
                qty: dec!(0.5),
                idempotency_key: None,
            })
            .await
            .unwrap();

        let order = exchange
            .submit_order(SubmitOrderRequest {
                user: alice,
                symbol: btc_usdt(),
                kind: OrderKind::Market,
                side: OrderSide::Buy,
                limit_price: None,
                qty: dec!(1),
                idempotency_key: None,
            })
            .await
            .unwrap();

        assert_eq!(order.filled_qty, dec!(0.5));
        assert_eq!(order.status, crate::model::order::OrderStatus::Filled);
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_is_rejected_end_to_end() {
        let exchange = Exchange::new(ExchangeConfig::default());
        let alice = UserId(1);
        exchange.deposit(alice, Currency::Usdt, dec!(10000), None).await.unwrap();

        let request = || SubmitOrderRequest {
            user: alice,
            symbol: btc_usdt(),
            kind: OrderKind::Limit,
            side: OrderSide::Buy,
            limit_price: Some(dec!(50000)),
            qty: dec!(0.01),
            idempotency_key: Some("order-abc".to_string()),
        };

        exchange.submit_order(request()).await.unwrap();
        let err = exchange.submit_order(request()).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn order_book_and_trade_history_reflect_a_settled_cross() {
        let exchange = Exchange::new(ExchangeConfig::default());
        let alice = UserId(1);
        let bob = UserId(2);
        exchange.deposit(alice, Currency::Usdt, dec!(10000), None).await.unwrap();
        exchange.deposit(bob, Currency::Btc, dec!(1), None).await.unwrap();

        exchange
            .submit_order(SubmitOrderRequest {
                user: bob,
                symbol: btc_usdt(),
                kind: OrderKind::Limit,
                side: OrderSide::Sell,
                limit_price: Some(dec!(50000)),
                qty: dec!(1),
                idempotency_key: None,
            })
            .await
            .unwrap();

        let snapshot = exchange.get_order_book(btc_usdt()).unwrap();
        assert_eq!(snapshot.asks, vec![(dec!(50000), dec!(1))]);
        assert!(snapshot.bids.is_empty());

        exchange
            .submit_order(SubmitOrderRequest {
                user: alice,
                symbol: btc_usdt(),
                kind: OrderKind::Limit,
                side: OrderSide::Buy,
                limit_price: Some(dec!(50000)),
                qty: dec!(0.4),
                idempotency_key: None,
            })
            .await
            .unwrap();

        let trades = exchange.list_trades(btc_usdt(), 10);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].qty, dec!(0.4));

        let snapshot = exchange.get_order_book(btc_usdt()).unwrap();
        assert_eq!(snapshot.asks, vec![(dec!(50000), dec!(0.6))]);
    }
}

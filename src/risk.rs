//! Pre-trade risk validation (§4.4). Read-only: never mutates balances.

use crate::config::ExchangeConfig;
use crate::currency::Currency;
use crate::error::{ExchangeError, ExchangeResult};
use crate::model::order::{OrderKind, OrderSide, UserId};
use crate::price_feed::PriceFeed;
use crate::store::BalanceStore;
use crate::symbol::Symbol;
use rust_decimal::Decimal;

/// The currency and amount an order must reserve before it may enter the
/// book, per §4.4 step 1.
#[derive(Debug, Clone, Copy)]
pub struct RequiredReservation {
    pub currency: Currency,
    pub amount: Decimal,
}

pub struct RiskValidator<'a> {
    config: &'a ExchangeConfig,
    balances: &'a BalanceStore,
    price_feed: &'a dyn PriceFeed,
}

impl<'a> RiskValidator<'a> {
    pub fn new(config: &'a ExchangeConfig, balances: &'a BalanceStore, price_feed: &'a dyn PriceFeed) -> Self {
        Self {
            config,
            balances,
            price_feed,
        }
    }

    /// Computes the amount and currency an order must reserve (§4.4 step 1).
    pub fn required_reservation(
        &self,
        symbol: Symbol,
        side: OrderSide,
        kind: OrderKind,
        limit_price: Option<Decimal>,
        qty: Decimal,
    ) -> ExchangeResult<RequiredReservation> {
        match (side, kind) {
            (OrderSide::Buy, OrderKind::Limit) => {
                let price = limit_price.ok_or_else(|| {
                    ExchangeError::Validation("limit order requires a price".to_string())
                })?;
                Ok(RequiredReservation {
                    currency: symbol.quote,
                    amount: price * qty,
                })
            }
            (OrderSide::Buy, OrderKind::Market) => {
                let reference_price = self
                    .price_feed
                    .get_price(&symbol)
                    .ok_or(ExchangeError::PriceUnavailable { symbol })?;
                Ok(RequiredReservation {
                    currency: symbol.quote,
                    amount: reference_price * qty * self.config.market_order_slippage_buffer,
                })
            }
            (OrderSide::Sell, _) => Ok(RequiredReservation {
                currency: symbol.base,
                amount: qty,
            }),
        }
    }

    /// Runs the full validation pipeline: balance sufficiency, then (for
    /// LIMIT orders only) exposure cap. No-op if `risk_enabled` is false.
    pub fn validate(
        &self,
        user: UserId,
        symbol: Symbol,
        side: OrderSide,
        kind: OrderKind,
        limit_price: Option<Decimal>,
        qty: Decimal,
    ) -> ExchangeResult<RequiredReservation> {
        let reservation = self.required_reservation(symbol, side, kind, limit_price, qty)?;

        if !self.config.risk_enabled {
            return Ok(reservation);
        }

        let available = self.balances.get_or_zero(user, reservation.currency).available_balance;
        if available < reservation.amount {
            return Err(ExchangeError::InsufficientBalance {
                currency: reservation.currency,
                required: reservation.amount,
                available,
            });
        }

        if kind == OrderKind::Limit {
            self.check_exposure(user, symbol, side, limit_price, qty)?;
        }

        Ok(reservation)
    }

    /// §4.4 step 3: total quote-valued exposure across non-quote-unit
    /// wallets, plus the notional of this order if it is a BUY. Missing
    /// prices contribute zero, a documented limitation rather than a hard
    /// failure.
    fn check_exposure(
        &self,
        user: UserId,
        symbol: Symbol,
        side: OrderSide,
        limit_price: Option<Decimal>,
        qty: Decimal,
    ) -> ExchangeResult<()> {
        let quote_unit = Currency::all()
            .iter()
            .copied()
            .find(|c| c.is_quote_unit_of_account())
            .unwrap_or(symbol.quote);

        let mut exposure = Decimal::ZERO;
        for wallet in self.balances.list(user) {
            if wallet.currency.is_quote_unit_of_account() {
                continue;
            }
            if let Ok(priced_symbol) = Symbol::new(wallet.currency, quote_unit) {
                if let Some(price) = self.price_feed.get_price(&priced_symbol) {
                    exposure += wallet.available_balance * price;
                }
            }
        }

        if side == OrderSide::Buy {
            if let Some(price) = limit_price {
                exposure += qty * price;
            }
        }

        if exposure > self.config.max_exposure_quote {
            return Err(ExchangeError::ExposureExceeded {
                current: exposure,
                limit: self.config.max_exposure_quote,
            });
        }

        Ok(())
    }
}

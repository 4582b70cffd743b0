//! Error taxonomy (§7). One enum covers every failure the coordinator,
//! stores, risk validator and matching engine can surface; validation and
//! business errors propagate untouched, storage retries are hidden below
//! `ConcurrencyConflict`.

use crate::currency::Currency;
use crate::model::order::{OrderId, OrderStatus};
use crate::symbol::Symbol;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("duplicate idempotency key: {idempotency_key}")]
    Duplicate { idempotency_key: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(
        "insufficient balance in {currency}: required {required}, available {available}"
    )]
    InsufficientBalance {
        currency: Currency,
        required: Decimal,
        available: Decimal,
    },

    #[error("exposure exceeded: current {current} + order would exceed limit {limit}")]
    ExposureExceeded { current: Decimal, limit: Decimal },

    #[error("price unavailable for symbol {symbol}")]
    PriceUnavailable { symbol: Symbol },

    #[error("order {order_id} cannot be cancelled in status {status}")]
    Uncancellable {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("concurrency conflict on {resource}, retries exhausted")]
    ConcurrencyConflict { resource: String },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

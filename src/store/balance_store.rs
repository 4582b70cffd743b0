//! Balance storage with optimistic-concurrency updates (§4.3).
//!
//! The teacher persists `Balance` rows in Postgres and relies on row-level
//! locking; this crate has no database (Non-goal), so the same compare-
//! and-swap discipline is reproduced in memory: each `Wallet` carries a
//! `version`, and a write only commits if the version it read is still
//! current, retried up to a configured bound.

use crate::config::ExchangeConfig;
use crate::currency::Currency;
use crate::error::{ExchangeError, ExchangeResult};
use crate::model::order::UserId;
use crate::model::wallet::Wallet;
use dashmap::DashMap;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BalanceKey {
    user: UserId,
    currency: Currency,
}

pub struct BalanceStore {
    balances: DashMap<BalanceKey, Wallet>,
    max_retries: u32,
}

impl BalanceStore {
    pub fn new(config: &ExchangeConfig) -> Self {
        Self {
            balances: DashMap::new(),
            max_retries: config.balance_cas_max_retries,
        }
    }

    pub fn get(&self, user: UserId, currency: Currency) -> Option<Wallet> {
        self.balances.get(&BalanceKey { user, currency }).map(|w| w.clone())
    }

    pub fn get_or_zero(&self, user: UserId, currency: Currency) -> Wallet {
        self.get(user, currency).unwrap_or(Wallet {
            user,
            currency,
            available_balance: Decimal::ZERO,
            version: 0,
        })
    }

    pub fn list(&self, user: UserId) -> Vec<Wallet> {
        self.balances
            .iter()
            .filter(|entry| entry.key().user == user)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Applies `delta` to the user's balance for `currency`, retrying on a
    /// lost compare-and-swap race up to `max_retries` times. `delta` may be
    /// negative (a debit); the closure may reject the mutation (e.g.
    /// insufficient balance) by returning an `Err` before the CAS is
    /// attempted, in which case no retry happens.
    pub fn apply(
        &self,
        user: UserId,
        currency: Currency,
        mutate: impl Fn(Decimal) -> ExchangeResult<Decimal>,
    ) -> ExchangeResult<Wallet> {
        for _ in 0..=self.max_retries {
            let before = self.get_or_zero(user, currency);
            let new_balance = mutate(before.available_balance)?;

            let key = BalanceKey { user, currency };
            let applied = std::cell::Cell::new(false);
            let committed = self.balances.entry(key).and_modify(|w| {
                if w.version == before.version {
                    w.available_balance = new_balance;
                    w.version += 1;
                    applied.set(true);
                }
            }).or_insert_with(|| {
                applied.set(true);
                Wallet {
                    user,
                    currency,
                    available_balance: new_balance,
                    version: 1,
                }
            });

            if applied.get() {
                return Ok(committed.clone());
            }
            // Lost the race: someone else updated the version between our
            // read and our write. Loop and retry against the fresh value.
            crate::metrics::record_balance_cas_retry();
        }

        Err(ExchangeError::ConcurrencyConflict {
            resource: format!("balance:{}:{}", user, currency),
        })
    }

    pub fn credit(&self, user: UserId, currency: Currency, amount: Decimal) -> ExchangeResult<Wallet> {
        self.apply(user, currency, |current| Ok(current + amount))
    }

    pub fn debit(&self, user: UserId, currency: Currency, amount: Decimal) -> ExchangeResult<Wallet> {
        self.apply(user, currency, move |current| {
            if current < amount {
                return Err(ExchangeError::InsufficientBalance {
                    currency,
                    required: amount,
                    available: current,
                });
            }
            Ok(current - amount)
        })
    }
}

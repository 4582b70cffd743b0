//! Wallet (balance record), §3.

use crate::currency::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why a balance moved; carried on every `BalanceUpdated` event (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BalanceChangeReason {
    Deposit,
    Withdraw,
    Reservation,
    Release,
    Settlement,
}

/// A user's balance in a single currency. `version` is the optimistic
/// concurrency token bumped on every persisted mutation (§3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user: crate::model::order::UserId,
    pub currency: Currency,
    pub available_balance: Decimal,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub currency: Currency,
    pub available_balance: Decimal,
}

impl From<&Wallet> for BalanceResponse {
    fn from(wallet: &Wallet) -> Self {
        Self {
            currency: wallet.currency,
            available_balance: wallet.available_balance,
        }
    }
}

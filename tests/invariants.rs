//! Property-based invariants (§8): balances never go negative, fill
//! quantities conserve across a random sequence of crossing orders, and
//! the FILLED status always implies full quantity.

use exchange_core::config::ExchangeConfig;
use exchange_core::coordinator::SubmitOrderRequest;
use exchange_core::currency::Currency;
use exchange_core::exchange::Exchange;
use exchange_core::model::order::{OrderKind, OrderSide, OrderStatus, UserId};
use exchange_core::symbol::Symbol;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

fn btc_usdt() -> Symbol {
    Symbol::new(Currency::Btc, Currency::Usdt).unwrap()
}

proptest! {
    /// Crediting and debiting a wallet through a random walk of deposits
    /// and withdrawals never lets the available balance go negative,
    /// because `debit` rejects any amount exceeding the current balance.
    #[test]
    fn balance_never_goes_negative(amounts in prop::collection::vec(1i64..10_000, 1..50)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let exchange = Exchange::new(ExchangeConfig::default());
            let user = UserId(1);
            let mut expected = Decimal::ZERO;

            for (i, amount) in amounts.into_iter().enumerate() {
                let amount = Decimal::from_i64(amount).unwrap();
                if i % 2 == 0 {
                    exchange.deposit(user, Currency::Usdt, amount, None).await.unwrap();
                    expected += amount;
                } else {
                    match exchange.withdraw(user, Currency::Usdt, amount, None).await {
                        Ok(_) => expected -= amount,
                        Err(_) => {} // insufficient balance, expected to be rejected
                    }
                }
                prop_assert!(exchange.balance(user, Currency::Usdt).available_balance >= Decimal::ZERO);
            }

            prop_assert_eq!(exchange.balance(user, Currency::Usdt).available_balance, expected);
            Ok(())
        })?;
    }

    /// A LIMIT order's filled_qty never exceeds its original_qty, and
    /// status == FILLED exactly when the two are equal, across any random
    /// pair of crossing quantities.
    #[test]
    fn filled_qty_never_exceeds_original_and_status_tracks_it(
        resting_qty in 1i64..1000,
        incoming_qty in 1i64..1000,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let exchange = Exchange::new(ExchangeConfig::default());
            let seller = UserId(1);
            let buyer = UserId(2);

            let resting_qty = Decimal::from_i64(resting_qty).unwrap() / Decimal::from(100);
            let incoming_qty = Decimal::from_i64(incoming_qty).unwrap() / Decimal::from(100);

            exchange.deposit(seller, Currency::Btc, resting_qty, None).await.unwrap();
            exchange.deposit(buyer, Currency::Usdt, Decimal::from(10_000_000), None).await.unwrap();

            exchange
                .submit_order(SubmitOrderRequest {
                    user: seller,
                    symbol: btc_usdt(),
                    kind: OrderKind::Limit,
                    side: OrderSide::Sell,
                    limit_price: Some(Decimal::from(50000)),
                    qty: resting_qty,
                    idempotency_key: None,
                })
                .await
                .unwrap();

            let incoming = exchange
                .submit_order(SubmitOrderRequest {
                    user: buyer,
                    symbol: btc_usdt(),
                    kind: OrderKind::Limit,
                    side: OrderSide::Buy,
                    limit_price: Some(Decimal::from(50000)),
                    qty: incoming_qty,
                    idempotency_key: None,
                })
                .await
                .unwrap();

            prop_assert!(incoming.filled_qty <= incoming.original_qty);
            if incoming.filled_qty == incoming.original_qty {
                prop_assert_eq!(incoming.status, OrderStatus::Filled);
            } else if incoming.filled_qty > Decimal::ZERO {
                prop_assert_eq!(incoming.status, OrderStatus::Partial);
            } else {
                prop_assert_eq!(incoming.status, OrderStatus::Open);
            }
            Ok(())
        })?;
    }
}

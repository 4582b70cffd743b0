//! Order storage with a secondary idempotency-key index (§4.3, §6).

use crate::error::{ExchangeError, ExchangeResult};
use crate::model::order::{Order, OrderId, UserId};
use dashmap::DashMap;

pub struct OrderStore {
    orders: DashMap<OrderId, Order>,
    by_idempotency_key: DashMap<String, OrderId>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            by_idempotency_key: DashMap::new(),
        }
    }

    /// Looks up an existing order by idempotency key, for at-most-once
    /// submission (§4.5, §7: `Duplicate`).
    pub fn find_by_idempotency_key(&self, key: &str) -> Option<Order> {
        let order_id = *self.by_idempotency_key.get(key)?;
        self.orders.get(&order_id).map(|o| o.clone())
    }

    /// Inserts a brand new order. Fails with `Duplicate` if the
    /// idempotency key is already claimed.
    pub fn insert(&self, order: Order) -> ExchangeResult<Order> {
        if let Some(key) = &order.idempotency_key {
            if self.by_idempotency_key.contains_key(key) {
                return Err(ExchangeError::Duplicate {
                    idempotency_key: key.clone(),
                });
            }
            self.by_idempotency_key.insert(key.clone(), order.id);
        }
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    pub fn get(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(&order_id).map(|o| o.clone())
    }

    pub fn require(&self, order_id: OrderId) -> ExchangeResult<Order> {
        self.get(order_id)
            .ok_or_else(|| ExchangeError::NotFound(format!("order {order_id}")))
    }

    pub fn update(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn list_for_user(&self, user: UserId) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|entry| entry.value().user == user)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

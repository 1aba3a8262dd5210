use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// A new order was admitted and is waiting for payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A settlement verifier moved the order to `PaySuccess`. Published exactly once per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The order's validity window closed without payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpiredEvent {
    pub order: Order,
}

impl OrderExpiredEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderPaid(OrderPaidEvent),
    OrderExpired(OrderExpiredEvent),
}

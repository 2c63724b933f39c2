//! Order (external read contract, spec §3/§6) and its semantic role.

use crate::types::{Side, Symbol};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub type OrderId = u64;

static ORDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn next_order_id() -> OrderId {
    ORDER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Semantic classification of an executed order, assigned by the
/// submitter and reassigned by the classifier (C2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderRole {
    OpenPosition,
    IncreasePosition,
    ReducePosition,
    ClosePosition,
}

/// An order as produced by the broker. The core treats this as mostly
/// immutable except `role`, which the classifier reassigns in place.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    /// Signed: positive for BUY fills, negative for SELL fills.
    pub qty: f64,
    pub price: f64,
    pub role: OrderRole,
    pub exchange: String,
    pub symbol: Symbol,
    pub is_active: bool,
    pub is_queued: bool,
    pub is_executed: bool,
}

impl Order {
    pub fn new(
        side: Side,
        qty: f64,
        price: f64,
        role: OrderRole,
        exchange: impl Into<String>,
        symbol: Symbol,
    ) -> Self {
        Order {
            id: next_order_id(),
            side,
            qty,
            price,
            role,
            exchange: exchange.into(),
            symbol,
            is_active: true,
            is_queued: false,
            is_executed: false,
        }
    }
}

/// Shared handle to an order: baskets hold these directly (spec §3 says
/// baskets hold "references to broker-issued Order objects"), and the
/// classifier mutates `role` through the same handle the basket holds.
pub type OrderHandle = Arc<Mutex<Order>>;

pub fn is_active_or_queued(order: &OrderHandle) -> bool {
    let o = order.lock().unwrap();
    o.is_active || o.is_queued
}

pub fn is_executed(order: &OrderHandle) -> bool {
    order.lock().unwrap().is_executed
}

//! C5 — Reconciler.
//!
//! Diffs each basket's "effective" (already-submitted) snapshot against
//! the strategy's live intent on every tick, cancels whatever no longer
//! matches, and resubmits whatever changed — so a strategy can mutate
//! `stop_loss`/`take_profit`/`buy`/`sell` mid-trade and have the child
//! orders follow without the strategy author managing order ids (spec
//! §4.5).
//!
//! Idempotence (spec property 6): if the live intent is structurally
//! unchanged from the effective snapshot, this makes zero broker calls.

use crate::broker::Broker;
use crate::intent::{equal, IntentTable};
use crate::order::{is_active_or_queued, is_executed, OrderHandle, OrderRole};
use crate::placer::{place_entry, place_stop_loss_reconcile, place_take_profit_reconcile};
use crate::types::{PositionType, Side};

/// One basket's reconciliation outcome: the basket's new contents —
/// retained executed orders plus whatever was freshly submitted.
pub struct ReconcileOutcome {
    pub orders: Vec<OrderHandle>,
    pub changed: bool,
}

fn unchanged(orders: Vec<OrderHandle>) -> ReconcileOutcome {
    ReconcileOutcome { orders, changed: false }
}

/// Cancels every live (active or queued) order in the basket and returns
/// the executed ones, which are kept rather than discarded (spec §4.5).
fn cancel_live_retain_executed(broker: &dyn Broker, existing_orders: Vec<OrderHandle>) -> Vec<OrderHandle> {
    let mut retained = Vec::new();
    for order in existing_orders {
        if is_active_or_queued(&order) {
            broker.cancel_order(order.lock().unwrap().id);
        } else if is_executed(&order) {
            retained.push(order);
        }
    }
    retained
}

/// Reconciles the entry basket (buy for a long route, sell for a short
/// one — spec §4.5, the route's own side, not a hardcoded direction).
/// Only runs before the route has an open position.
pub fn reconcile_entry(
    broker: &dyn Broker,
    side: Side,
    desired: &IntentTable,
    effective: &IntentTable,
    existing_orders: Vec<OrderHandle>,
    mark: f64,
) -> ReconcileOutcome {
    if equal(desired, effective) {
        return unchanged(existing_orders);
    }
    let mut orders = cancel_live_retain_executed(broker, existing_orders);
    orders.extend(
        desired
            .rows()
            .iter()
            .map(|(qty, price)| place_entry(broker, side, *qty, *price, mark, OrderRole::OpenPosition)),
    );
    ReconcileOutcome { orders, changed: true }
}

/// Reconciles the take-profit basket against an open position.
pub fn reconcile_take_profit(
    broker: &dyn Broker,
    direction: PositionType,
    desired: &IntentTable,
    effective: &IntentTable,
    existing_orders: Vec<OrderHandle>,
    mark: f64,
) -> ReconcileOutcome {
    if equal(desired, effective) {
        return unchanged(existing_orders);
    }
    let mut orders = cancel_live_retain_executed(broker, existing_orders);
    orders.extend(desired.rows().iter().map(|(qty, price)| {
        place_take_profit_reconcile(broker, direction, *qty, *price, mark, OrderRole::ClosePosition)
    }));
    ReconcileOutcome { orders, changed: true }
}

/// Reconciles the stop-loss basket against an open position.
pub fn reconcile_stop_loss(
    broker: &dyn Broker,
    direction: PositionType,
    desired: &IntentTable,
    effective: &IntentTable,
    existing_orders: Vec<OrderHandle>,
    mark: f64,
) -> ReconcileOutcome {
    if equal(desired, effective) {
        return unchanged(existing_orders);
    }
    let mut orders = cancel_live_retain_executed(broker, existing_orders);
    orders.extend(desired.rows().iter().map(|(qty, price)| {
        place_stop_loss_reconcile(broker, direction, *qty, *price, mark, OrderRole::ClosePosition)
    }));
    ReconcileOutcome { orders, changed: true }
}

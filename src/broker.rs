//! Broker (external interface, consumed — spec §6).
//!
//! Order-placement mechanics (matching, fills, exchange wire format) are
//! out of scope; only the submission surface the strategy core calls
//! against is specified here.

use crate::order::{OrderHandle, OrderId, OrderRole};
use crate::types::Side;

pub trait Broker: Send + Sync {
    /// Limit buy.
    fn buy_at(&self, qty: f64, price: f64, role: OrderRole) -> OrderHandle;
    /// Limit sell.
    fn sell_at(&self, qty: f64, price: f64, role: OrderRole) -> OrderHandle;
    fn buy_at_market(&self, qty: f64, role: OrderRole) -> OrderHandle;
    fn sell_at_market(&self, qty: f64, role: OrderRole) -> OrderHandle;
    /// Stop-entry: becomes a market order once price trades through.
    fn start_profit_at(&self, side: Side, qty: f64, price: f64, role: OrderRole) -> OrderHandle;
    /// Stop-style reduce (stop-loss or a take-profit on the stop side).
    fn stop_loss_at(&self, qty: f64, price: f64, role: OrderRole) -> OrderHandle;
    /// Limit-style reduce (a take-profit on the profitable side).
    fn reduce_position_at(&self, qty: f64, price: f64, role: OrderRole) -> OrderHandle;

    fn cancel_order(&self, id: OrderId);
    fn cancel_all_orders(&self);
}

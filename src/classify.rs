//! C2 — Order Classifier.
//!
//! Given an executed order whose fill has already updated the position,
//! reassigns its role where the submitter's initial tag (OPEN_POSITION /
//! CLOSE_POSITION) no longer matches reality, then dispatches to the
//! matching lifecycle handler (spec §4.2).

use crate::order::{OrderHandle, OrderRole};

/// The fully resolved role dispatch target, after basket membership has
/// disambiguated a CLOSE_POSITION into take-profit vs. stop-loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifiedRole {
    Open,
    Increase,
    Reduce,
    CloseTakeProfit,
    CloseStopLoss,
}

/// Applies the three reclassification rules in order, mutates
/// `order.role` in place to the resolved `OrderRole`, and returns the
/// dispatch target.
///
/// `in_take_profit_basket`/`in_stop_loss_basket` tell a resulting
/// CLOSE_POSITION apart; exactly one must be true for a CLOSE_POSITION
/// order (an order is only ever submitted into one basket).
pub fn classify_order(
    order: &OrderHandle,
    position_qty: f64,
    position_is_open: bool,
    in_take_profit_basket: bool,
    in_stop_loss_basket: bool,
) -> ClassifiedRole {
    let mut guard = order.lock().unwrap();
    let mut role = guard.role;

    // Rule 1: a partial open fill is really an increase.
    if role == OrderRole::OpenPosition && position_qty.abs() != guard.qty.abs() {
        role = OrderRole::IncreasePosition;
    }

    // Rule 2: a close tagged while the position is still open is really a
    // reduce.
    if role == OrderRole::ClosePosition && position_is_open {
        role = OrderRole::ReducePosition;
    }

    guard.role = role;
    drop(guard);

    match role {
        OrderRole::OpenPosition => ClassifiedRole::Open,
        OrderRole::IncreasePosition => ClassifiedRole::Increase,
        OrderRole::ReducePosition => ClassifiedRole::Reduce,
        OrderRole::ClosePosition => {
            if in_take_profit_basket {
                ClassifiedRole::CloseTakeProfit
            } else if in_stop_loss_basket {
                ClassifiedRole::CloseStopLoss
            } else {
                ClassifiedRole::CloseStopLoss
            }
        }
    }
}

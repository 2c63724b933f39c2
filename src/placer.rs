//! C3 — Order Placer.
//!
//! Translates a `(qty, price)` intent row, the current mark price, and a
//! trade direction into the correct broker call (MARKET / LIMIT / STOP),
//! per spec §4.3. Tie-breaks are strict: equality always selects MARKET.
//!
//! Two submission sites use different slices of this logic, grounded on
//! the original implementation's actual (not fully symmetric) behavior:
//! the initial stop-loss/take-profit submission at OPEN uses the
//! unconditional reduce calls the original always used there, while the
//! reconciler (C5) uses the full price-vs-mark branching described below.
//! See `DESIGN.md` for the original_source citation.

use crate::broker::Broker;
use crate::order::{OrderHandle, OrderRole};
use crate::types::{PositionType, Side};

/// Entry order for direction `side`: STOP if `price` is worse than
/// `mark`, LIMIT if better, MARKET if equal. Used both by
/// `execute_long`/`execute_short` and by the reconciler's entry basket.
pub fn place_entry(
    broker: &dyn Broker,
    side: Side,
    qty: f64,
    price: f64,
    mark: f64,
    role: OrderRole,
) -> OrderHandle {
    if price == mark {
        return match side {
            Side::Buy => broker.buy_at_market(qty, role),
            Side::Sell => broker.sell_at_market(qty, role),
        };
    }

    let is_worse = match side {
        Side::Buy => price > mark,
        Side::Sell => price < mark,
    };

    if is_worse {
        broker.start_profit_at(side, qty, price, role)
    } else {
        match side {
            Side::Buy => broker.buy_at(qty, price, role),
            Side::Sell => broker.sell_at(qty, price, role),
        }
    }
}

/// Take-profit submitted at OPEN_POSITION time: always a limit-style
/// reduce at `price`, regardless of mark (spec §4.7/original behavior).
pub fn place_take_profit_open(
    broker: &dyn Broker,
    qty: f64,
    price: f64,
    role: OrderRole,
) -> OrderHandle {
    broker.reduce_position_at(qty, price, role)
}

/// Stop-loss submitted at OPEN_POSITION time: always a stop-style reduce
/// at `price`, regardless of mark (spec §4.7/original behavior).
pub fn place_stop_loss_open(
    broker: &dyn Broker,
    qty: f64,
    price: f64,
    role: OrderRole,
) -> OrderHandle {
    broker.stop_loss_at(qty, price, role)
}

/// Take-profit submitted by the reconciler (C5): MARKET if `price ==
/// mark`; otherwise a limit-style reduce if `price` is on the profitable
/// side of `mark` for `direction`, else a stop-style reduce.
pub fn place_take_profit_reconcile(
    broker: &dyn Broker,
    direction: PositionType,
    qty: f64,
    price: f64,
    mark: f64,
    role: OrderRole,
) -> OrderHandle {
    if price == mark {
        return match direction {
            PositionType::Long => broker.sell_at_market(qty, role),
            PositionType::Short | PositionType::Close => broker.buy_at_market(qty, role),
        };
    }

    let profitable_side = match direction {
        PositionType::Long => price > mark,
        PositionType::Short | PositionType::Close => price < mark,
    };

    if profitable_side {
        broker.reduce_position_at(qty, price, role)
    } else {
        broker.stop_loss_at(qty, price, role)
    }
}

/// Stop-loss submitted by the reconciler (C5): MARKET if `price == mark`,
/// otherwise always a stop-style reduce.
pub fn place_stop_loss_reconcile(
    broker: &dyn Broker,
    direction: PositionType,
    qty: f64,
    price: f64,
    mark: f64,
    role: OrderRole,
) -> OrderHandle {
    if price == mark {
        match direction {
            PositionType::Long => broker.sell_at_market(qty, role),
            PositionType::Short | PositionType::Close => broker.buy_at_market(qty, role),
        }
    } else {
        broker.stop_loss_at(qty, price, role)
    }
}

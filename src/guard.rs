//! C8 — Guard & Validation Layer.
//!
//! Every rejection a strategy can trigger through its own overrides
//! funnels through here: conflicting entry rules, a stop-loss/take-profit
//! on the wrong side of the entry price, stop-loss and take-profit priced
//! identically, and cancelling while a position is already open (spec
//! §4.8). Shape validation itself (non-finite, non-positive qty, negative
//! price) lives in `intent::normalize` — this layer only checks things
//! that require knowing the trade direction or more than one intent at
//! once.

use crate::error::StrategyError;
use crate::intent::{self, IntentTable};
use crate::types::PositionType;

pub type GuardResult = Result<(), StrategyError>;

/// Rejects a tick where both `should_long` and `should_short` returned
/// true — the strategy can open at most one direction per tick.
pub fn validate_conflicting_rules(should_long: bool, should_short: bool) -> GuardResult {
    if should_long && should_short {
        return Err(StrategyError::ConflictingRules);
    }
    Ok(())
}

/// Every stop-loss row must sit on the losing side of `entry_price`: below
/// it for a long, above it for a short. Equality is rejected too — a
/// stop-loss at the entry price isn't a stop-loss.
pub fn validate_stop_loss_direction(
    direction: PositionType,
    entry_price: f64,
    stop_loss: &IntentTable,
) -> GuardResult {
    let offside = stop_loss.rows().iter().any(|(_, price)| match direction {
        PositionType::Long => *price >= entry_price,
        PositionType::Short | PositionType::Close => *price <= entry_price,
    });
    if offside {
        return Err(StrategyError::InvalidStrategy(
            "stop_loss price must be on the losing side of the entry price".to_string(),
        ));
    }
    Ok(())
}

/// Every take-profit row must sit on the winning side of `entry_price`:
/// above it for a long, below it for a short.
pub fn validate_take_profit_direction(
    direction: PositionType,
    entry_price: f64,
    take_profit: &IntentTable,
) -> GuardResult {
    let offside = take_profit.rows().iter().any(|(_, price)| match direction {
        PositionType::Long => *price <= entry_price,
        PositionType::Short | PositionType::Close => *price >= entry_price,
    });
    if offside {
        return Err(StrategyError::InvalidStrategy(
            "take_profit price must be on the winning side of the entry price".to_string(),
        ));
    }
    Ok(())
}

/// A stop-loss and take-profit table that are structurally identical are
/// ambiguous about which would actually fire first; reject both (spec
/// invariant 6 — structural, not a looser price-average comparison).
pub fn validate_stop_loss_not_equal_take_profit(
    stop_loss: &IntentTable,
    take_profit: &IntentTable,
) -> GuardResult {
    if intent::equal(stop_loss, take_profit) {
        return Err(StrategyError::InvalidStrategy(
            "stop_loss and take_profit must not be structurally identical".to_string(),
        ));
    }
    Ok(())
}

/// A route can only be cancelled while it holds no open position — once a
/// fill has landed there is a position to manage, not an entry to cancel.
pub fn validate_cancel_preconditions(position_is_open: bool) -> GuardResult {
    if position_is_open {
        return Err(StrategyError::InternalInvariant(
            "cannot cancel a route with an open position".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_conflicting_rules() {
        assert!(validate_conflicting_rules(true, true).is_err());
        assert!(validate_conflicting_rules(true, false).is_ok());
    }

    #[test]
    fn rejects_stop_loss_above_entry_for_long() {
        let sl = IntentTable(vec![(1.0, 105.0)]);
        assert!(validate_stop_loss_direction(PositionType::Long, 100.0, &sl).is_err());
    }

    #[test]
    fn accepts_stop_loss_below_entry_for_long() {
        let sl = IntentTable(vec![(1.0, 95.0)]);
        assert!(validate_stop_loss_direction(PositionType::Long, 100.0, &sl).is_ok());
    }

    #[test]
    fn rejects_take_profit_below_entry_for_long() {
        let tp = IntentTable(vec![(1.0, 95.0)]);
        assert!(validate_take_profit_direction(PositionType::Long, 100.0, &tp).is_err());
    }

    #[test]
    fn rejects_stop_loss_below_entry_for_short() {
        let sl = IntentTable(vec![(1.0, 95.0)]);
        assert!(validate_stop_loss_direction(PositionType::Short, 100.0, &sl).is_err());
    }

    #[test]
    fn rejects_equal_stop_loss_and_take_profit() {
        let sl = IntentTable(vec![(1.0, 90.0)]);
        let tp = IntentTable(vec![(1.0, 90.0)]);
        assert!(validate_stop_loss_not_equal_take_profit(&sl, &tp).is_err());
    }

    #[test]
    fn rejects_cancel_with_open_position() {
        assert!(validate_cancel_preconditions(true).is_err());
        assert!(validate_cancel_preconditions(false).is_ok());
    }
}

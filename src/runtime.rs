//! Runtime mode flags and clock (spec §6, external interface).
//!
//! The hosting runtime tells the strategy core which mode it's operating
//! in (live, backtest, unit test, test-drive) and supplies the handful of
//! exchange-rounding/time/id primitives the core needs but does not own.

use crate::types::{PositionType, Side};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub trait RuntimeMode: Send + Sync {
    fn is_live(&self) -> bool;
    fn is_backtesting(&self) -> bool;
    fn is_unit_testing(&self) -> bool;
    fn is_test_driving(&self) -> bool;
    fn is_debugging(&self) -> bool;
    fn should_execute_silently(&self) -> bool;

    fn now(&self) -> DateTime<Utc>;
    fn generate_unique_id(&self) -> String;

    /// Round a set of prices to the exchange's tick size, using
    /// `reference_price` (the first row's price) to pick the tick.
    fn round_price_for_live_mode(&self, reference_price: f64, prices: &[f64]) -> Vec<f64>;

    /// Round a set of quantities to the exchange's lot size, using
    /// `reference_price` to pick the lot precision.
    fn round_qty_for_live_mode(&self, reference_price: f64, qtys: &[f64]) -> Vec<f64>;

    fn side_to_type(&self, side: Side) -> PositionType;
    fn type_to_side(&self, position_type: PositionType) -> Side;
}

/// Default mapping used by every `RuntimeMode` implementation: BUY fills
/// open/extend a long, SELL fills open/extend a short.
pub fn default_side_to_type(side: Side) -> PositionType {
    match side {
        Side::Buy => PositionType::Long,
        Side::Sell => PositionType::Short,
    }
}

pub fn default_type_to_side(position_type: PositionType) -> Side {
    match position_type {
        PositionType::Long => Side::Buy,
        PositionType::Short => Side::Sell,
        PositionType::Close => Side::Sell,
    }
}

/// Blocks the calling thread, polling `predicate` every `interval` up to
/// `max_iters` times, returning `true` as soon as it's satisfied and
/// `false` if the budget is exhausted. Used by `execute_cancel`'s
/// live-mode wait instead of inlining sleep constants into business logic
/// (spec §9 design note).
pub fn await_until<F: FnMut() -> bool>(
    mut predicate: F,
    interval: Duration,
    max_iters: usize,
) -> bool {
    for _ in 0..max_iters {
        if predicate() {
            return true;
        }
        std::thread::sleep(interval);
    }
    predicate()
}

/// A `RuntimeMode` for wiring into a real host: always backtesting/live as
/// configured, system clock, random-ish unique ids, and pass-through
/// rounding (no exchange tick/lot tables attached).
pub struct SystemClock {
    pub live: bool,
    pub backtesting: bool,
    pub unit_testing: bool,
    pub test_driving: bool,
    pub debugging: bool,
    pub silent: bool,
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock {
            live: false,
            backtesting: true,
            unit_testing: false,
            test_driving: false,
            debugging: false,
            silent: false,
        }
    }
}

impl RuntimeMode for SystemClock {
    fn is_live(&self) -> bool {
        self.live
    }

    fn is_backtesting(&self) -> bool {
        self.backtesting
    }

    fn is_unit_testing(&self) -> bool {
        self.unit_testing
    }

    fn is_test_driving(&self) -> bool {
        self.test_driving
    }

    fn is_debugging(&self) -> bool {
        self.debugging
    }

    fn should_execute_silently(&self) -> bool {
        self.silent
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn generate_unique_id(&self) -> String {
        format!("{:x}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
    }

    fn round_price_for_live_mode(&self, _reference_price: f64, prices: &[f64]) -> Vec<f64> {
        prices.to_vec()
    }

    fn round_qty_for_live_mode(&self, _reference_price: f64, qtys: &[f64]) -> Vec<f64> {
        qtys.to_vec()
    }

    fn side_to_type(&self, side: Side) -> PositionType {
        default_side_to_type(side)
    }

    fn type_to_side(&self, position_type: PositionType) -> Side {
        default_type_to_side(position_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn await_until_returns_true_as_soon_as_satisfied() {
        let calls = AtomicUsize::new(0);
        let ok = await_until(
            || calls.fetch_add(1, Ordering::SeqCst) >= 2,
            Duration::from_millis(1),
            20,
        );
        assert!(ok);
    }

    #[test]
    fn await_until_returns_false_when_budget_exhausted() {
        let ok = await_until(|| false, Duration::from_millis(1), 3);
        assert!(!ok);
    }
}

//! Core identifiers shared across the strategy execution core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading pair symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order/trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Direction of a route's position, including the flat state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionType {
    Long,
    Short,
    Close,
}

/// A unique identifier for a (exchange, symbol, timeframe) route, used by
/// the multi-route bus to address strategies and skip self-broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteId(pub u64);

/// The six fixed columns of a candle as exposed by the candle store, in the
/// exact order the external interface returns them:
/// `[timestamp, open, close, high, low, volume]`.
///
/// Note the non-OHLC column order (`close` before `high`/`low`) — this
/// mirrors the candle-store contract this core was built against and is
/// intentional, not a typo; `CurrentCandle`'s accessors hide it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentCandle(pub [f64; 6]);

impl CurrentCandle {
    pub fn new(timestamp: f64, open: f64, close: f64, high: f64, low: f64, volume: f64) -> Self {
        CurrentCandle([timestamp, open, close, high, low, volume])
    }

    pub fn timestamp(&self) -> f64 {
        self.0[0]
    }

    pub fn open(&self) -> f64 {
        self.0[1]
    }

    pub fn close(&self) -> f64 {
        self.0[2]
    }

    pub fn high(&self) -> f64 {
        self.0[3]
    }

    pub fn low(&self) -> f64 {
        self.0[4]
    }

    pub fn volume(&self) -> f64 {
        self.0[5]
    }
}

//! Order store, completed-trades store, and candle store (external
//! interfaces, consumed — spec §6).

use crate::order::OrderHandle;
use crate::trade::CompletedTrade;
use crate::types::{CurrentCandle, Symbol};

pub trait OrderStore: Send + Sync {
    fn count_active_orders(&self, exchange: &str, symbol: &Symbol) -> usize;
    fn get_orders(&self, exchange: &str, symbol: &Symbol) -> Vec<OrderHandle>;
    /// Fake-executes any still-pending MARKET orders against the current
    /// candle (backtest/unit-test modes only).
    fn execute_pending_market_orders(&self);
    /// Clears the route's stored orders (non-live, non-unit-test modes).
    fn clear_route(&self, exchange: &str, symbol: &Symbol);
}

pub trait TradeStore: Send + Sync {
    fn add_trade(&self, trade: CompletedTrade);
    fn count(&self) -> usize;
}

pub trait CandleStore: Send + Sync {
    fn get_current_candle(&self, exchange: &str, symbol: &Symbol, timeframe: &str) -> CurrentCandle;
    fn get_candles(&self, exchange: &str, symbol: &Symbol, timeframe: &str) -> Vec<CurrentCandle>;
}

//! Position (external read contract, spec §3/§6).

use crate::types::{PositionType, Symbol};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct Position {
    pub symbol: Symbol,
    /// Signed quantity: positive while long, negative while short, zero
    /// while flat.
    pub qty: f64,
    pub position_type: PositionType,
    pub entry_price: f64,
    pub current_price: f64,
}

impl Position {
    pub fn flat(symbol: Symbol) -> Self {
        Position {
            symbol,
            qty: 0.0,
            position_type: PositionType::Close,
            entry_price: 0.0,
            current_price: 0.0,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.position_type, PositionType::Close)
    }

    pub fn is_close(&self) -> bool {
        matches!(self.position_type, PositionType::Close)
    }

    pub fn pnl(&self) -> f64 {
        match self.position_type {
            PositionType::Long => (self.current_price - self.entry_price) * self.qty.abs(),
            PositionType::Short => (self.entry_price - self.current_price) * self.qty.abs(),
            PositionType::Close => 0.0,
        }
    }

    pub fn pnl_percentage(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        match self.position_type {
            PositionType::Long => (self.current_price - self.entry_price) / self.entry_price * 100.0,
            PositionType::Short => (self.entry_price - self.current_price) / self.entry_price * 100.0,
            PositionType::Close => 0.0,
        }
    }

    /// Marks the position closed at `price`. Does not touch the order
    /// baskets or effective snapshots — that's `Strategy::reset`'s job.
    pub fn close(&mut self, price: f64) {
        self.current_price = price;
        self.qty = 0.0;
        self.position_type = PositionType::Close;
    }
}

pub type SharedPosition = Arc<Mutex<Position>>;

/// Position ledger (external interface, spec §6): yields the live
/// position object for a route. Strategies observe it but don't own it.
pub trait PositionLedger: Send + Sync {
    fn get_position(&self, exchange: &str, symbol: &Symbol) -> SharedPosition;
}

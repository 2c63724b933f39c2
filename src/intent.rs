//! C1 — Intent Model.
//!
//! Represents the four user-expressible intents (`buy`, `sell`,
//! `stop_loss`, `take_profit`) as normalized 2-column numeric tables of
//! `(qty, price)` rows, plus the "effective" snapshot machinery used to
//! detect user mutation between ticks (spec §4.1).

use crate::error::StrategyError;
use crate::runtime::RuntimeMode;

/// A single `(qty, price)` row of an intent.
pub type Row = (f64, f64);

/// A normalized, row-major `(N, 2)` table of `(qty, price)` rows.
///
/// Equality is structural and order-sensitive — two tables with the same
/// rows in a different order are NOT equal, because row order represents
/// distinct child orders (spec §4.1, invariant 4).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntentTable(pub Vec<Row>);

impl IntentTable {
    pub fn rows(&self) -> &[Row] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Volume-weighted average price across all rows: `sum(|qty|*price) /
    /// sum(|qty|)`.
    pub fn weighted_average_price(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        let total_qty: f64 = self.0.iter().map(|(q, _)| q.abs()).sum();
        if total_qty == 0.0 {
            return None;
        }
        let total_value: f64 = self.0.iter().map(|(q, p)| q.abs() * p).sum();
        Some(total_value / total_qty)
    }
}

/// The shapes accepted when a strategy writes to `buy`/`sell`/
/// `stop_loss`/`take_profit`: a single pair, a list of pairs, or an
/// already-normalized table (spec §4.1).
#[derive(Debug, Clone)]
pub enum IntentInput {
    Pair(Row),
    List(Vec<Row>),
    Table(IntentTable),
}

impl From<Row> for IntentInput {
    fn from(row: Row) -> Self {
        IntentInput::Pair(row)
    }
}

impl From<Vec<Row>> for IntentInput {
    fn from(rows: Vec<Row>) -> Self {
        IntentInput::List(rows)
    }
}

impl From<IntentTable> for IntentInput {
    fn from(table: IntentTable) -> Self {
        IntentInput::Table(table)
    }
}

/// Normalize a raw intent write into a 2-column numeric table.
///
/// `name` is used only to label `InvalidShape` errors. In live mode,
/// `runtime` rounds every row's price/qty to the exchange's tick/lot size,
/// using the first row's price as the tick reference — mirroring the
/// original's `_convert_to_numpy_array`.
pub fn normalize(
    input: impl Into<IntentInput>,
    name: &'static str,
    runtime: &dyn RuntimeMode,
) -> Result<IntentTable, StrategyError> {
    let rows: Vec<Row> = match input.into() {
        IntentInput::Pair(row) => vec![row],
        IntentInput::List(rows) => rows,
        IntentInput::Table(table) => table.0,
    };

    if rows.is_empty() {
        return Err(StrategyError::InvalidShape {
            name,
            detail: "empty".to_string(),
        });
    }
    if rows.iter().any(|(qty, price)| !qty.is_finite() || !price.is_finite()) {
        return Err(StrategyError::InvalidShape {
            name,
            detail: "non-finite qty or price".to_string(),
        });
    }
    if rows.iter().any(|(qty, _)| *qty <= 0.0) {
        return Err(StrategyError::InvalidShape {
            name,
            detail: "qty must be positive".to_string(),
        });
    }
    if rows.iter().any(|(_, price)| *price < 0.0) {
        return Err(StrategyError::InvalidShape {
            name,
            detail: "price must be non-negative".to_string(),
        });
    }

    let rows = if runtime.is_live() {
        let reference_price = rows[0].1;
        let prices: Vec<f64> = rows.iter().map(|(_, p)| *p).collect();
        let qtys: Vec<f64> = rows.iter().map(|(q, _)| *q).collect();
        let rounded_prices = runtime.round_price_for_live_mode(reference_price, &prices);
        let rounded_qtys = runtime.round_qty_for_live_mode(reference_price, &qtys);
        rounded_qtys
            .into_iter()
            .zip(rounded_prices)
            .collect::<Vec<Row>>()
    } else {
        rows
    };

    Ok(IntentTable(rows))
}

/// Snapshot an intent table into its "effective" counterpart — an owned
/// copy used purely for later structural comparison.
pub fn snapshot(table: &IntentTable) -> IntentTable {
    table.clone()
}

/// Structural, order-sensitive equality between two tables.
pub fn equal(a: &IntentTable, b: &IntentTable) -> bool {
    a == b
}

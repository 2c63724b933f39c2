//! C7 — Trade Recorder.
//!
//! Builds the `CompletedTrade` record across the OPEN → (INCREASE* /
//! REDUCE*) → CLOSE sequence of classified order executions, computing
//! volume-weighted entry/exit/stop-loss/take-profit prices at close
//! (spec §4.7).

use crate::intent::IntentTable;
use crate::order::{OrderHandle, OrderId};
use crate::types::{PositionType, Side, Symbol};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct CompletedTrade {
    pub id: OrderId,
    pub orders: Vec<OrderHandle>,
    pub position_type: PositionType,
    /// Advisory while the trade is in progress (see Design Note 9(b)); the
    /// authoritative value is recomputed at `close`.
    pub qty: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub stop_loss_at: f64,
    pub take_profit_at: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub entry_candle_timestamp: f64,
    pub exit_candle_timestamp: Option<f64>,
    pub strategy_name: String,
    pub timeframe: String,
    pub exchange: String,
    pub symbol: Symbol,
}

/// Constructs the fresh trade record on an OPEN_POSITION classification.
#[allow(clippy::too_many_arguments)]
pub fn open(
    order: OrderHandle,
    position_type: PositionType,
    strategy_name: String,
    timeframe: String,
    exchange: String,
    symbol: Symbol,
    opened_at: DateTime<Utc>,
    entry_candle_timestamp: f64,
) -> CompletedTrade {
    let (id, qty) = {
        let o = order.lock().unwrap();
        (o.id, o.qty)
    };
    CompletedTrade {
        id,
        orders: vec![order],
        position_type,
        qty,
        entry_price: 0.0,
        exit_price: 0.0,
        stop_loss_at: f64::NAN,
        take_profit_at: f64::NAN,
        opened_at,
        closed_at: None,
        entry_candle_timestamp,
        exit_candle_timestamp: None,
        strategy_name,
        timeframe,
        exchange,
        symbol,
    }
}

/// Appends an INCREASE_POSITION fill. `trade.qty` is advisory until close.
pub fn record_increase(trade: &mut CompletedTrade, order: OrderHandle) {
    let qty = order.lock().unwrap().qty;
    trade.orders.push(order);
    trade.qty += qty;
}

/// Appends a REDUCE_POSITION fill (qty is signed). `trade.qty` is
/// advisory until close.
pub fn record_reduce(trade: &mut CompletedTrade, order: OrderHandle) {
    let qty = order.lock().unwrap().qty;
    trade.orders.push(order);
    trade.qty += qty;
}

fn vwap(table: Option<&IntentTable>) -> f64 {
    table
        .and_then(|t| t.weighted_average_price())
        .unwrap_or(f64::NAN)
}

/// Finalizes the trade on a CLOSE_POSITION classification (stop-loss or
/// take-profit basket). Consumes the in-progress trade, appends the
/// closing order, and recomputes every VWAP-derived field from scratch —
/// intermediate `qty`/price bookkeeping from INCREASE/REDUCE steps is
/// discarded in favor of authoritative sums over the full order list.
pub fn close(
    mut trade: CompletedTrade,
    order: OrderHandle,
    log_stop_loss: Option<&IntentTable>,
    log_take_profit: Option<&IntentTable>,
    exit_candle_timestamp: f64,
    closed_at: DateTime<Utc>,
) -> CompletedTrade {
    trade.exit_candle_timestamp = Some(exit_candle_timestamp);
    trade.orders.push(order);

    trade.stop_loss_at = vwap(log_stop_loss);
    trade.take_profit_at = vwap(log_take_profit);

    let opening_side = crate::runtime::default_type_to_side(trade.position_type);

    let (entry_qty, entry_value) = weighted_sum(&trade.orders, opening_side);
    trade.entry_price = if entry_qty > 0.0 {
        entry_value / entry_qty
    } else {
        f64::NAN
    };

    let (exit_qty, exit_value) = weighted_sum(&trade.orders, opening_side.opposite());
    trade.exit_price = if exit_qty > 0.0 {
        exit_value / exit_qty
    } else {
        f64::NAN
    };

    trade.qty = entry_qty;
    trade.closed_at = Some(closed_at);

    trade
}

/// Sum of `|qty|` and `|qty| * price` over executed orders on `side`.
fn weighted_sum(orders: &[OrderHandle], side: Side) -> (f64, f64) {
    orders
        .iter()
        .map(|o| o.lock().unwrap())
        .filter(|o| o.is_executed && o.side == side)
        .fold((0.0, 0.0), |(qty_acc, value_acc), o| {
            let q = o.qty.abs();
            (qty_acc + q, value_acc + q * o.price)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Order, OrderRole};
    use approx::assert_relative_eq;
    use std::sync::{Arc, Mutex};

    fn executed_order(side: Side, qty: f64, price: f64) -> OrderHandle {
        let mut o = Order::new(side, qty, price, OrderRole::OpenPosition, "binance", Symbol::new("BTCUSDT"));
        o.is_executed = true;
        o.is_active = false;
        Arc::new(Mutex::new(o))
    }

    #[test]
    fn close_computes_vwap_entry_and_exit_within_fill_range() {
        let open_order = executed_order(Side::Buy, 1.0, 100.0);
        let mut trade = open(
            open_order.clone(),
            PositionType::Long,
            "test".into(),
            "1h".into(),
            "binance".into(),
            Symbol::new("BTCUSDT"),
            Utc::now(),
            0.0,
        );
        let second_entry = executed_order(Side::Buy, 1.0, 104.0);
        record_increase(&mut trade, second_entry);

        let exit_order = executed_order(Side::Sell, 2.0, 110.0);
        let trade = close(trade, exit_order, None, None, 1.0, Utc::now());

        assert_relative_eq!(trade.entry_price, 102.0);
        assert!(trade.entry_price >= 100.0 && trade.entry_price <= 104.0);
        assert_relative_eq!(trade.exit_price, 110.0);
        assert!(trade.stop_loss_at.is_nan());
        assert_eq!(trade.qty, 2.0);
    }

    #[test]
    fn close_computes_vwap_stop_loss_from_log() {
        let open_order = executed_order(Side::Buy, 1.0, 100.0);
        let trade = open(
            open_order,
            PositionType::Long,
            "test".into(),
            "1h".into(),
            "binance".into(),
            Symbol::new("BTCUSDT"),
            Utc::now(),
            0.0,
        );
        let log = IntentTable(vec![(0.5, 90.0), (0.5, 92.0)]);
        let exit_order = executed_order(Side::Sell, 1.0, 91.0);
        let trade = close(trade, exit_order, Some(&log), None, 1.0, Utc::now());

        assert_relative_eq!(trade.stop_loss_at, 91.0);
    }
}

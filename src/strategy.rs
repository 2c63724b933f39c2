//! C4 — Lifecycle State Machine.
//!
//! Drives a single route's strategy through one tick: initiation,
//! cancellation, reconciliation of an open position, and — while flat —
//! the entry pipeline. `Strategy<H>` owns all spec §3 state; `H:
//! StrategyHooks` supplies the strategy-specific decisions.

use crate::broker::Broker;
use crate::bus::{BusHandle, RouteEvent, RouteHandle};
use crate::classify::{classify_order, ClassifiedRole};
use crate::error::{StrategyError, StrategyResult};
use crate::guard;
use crate::hooks::{HookContext, StrategyHooks};
use crate::intent::{self, IntentTable};
use crate::order::OrderHandle;
use crate::placer::{place_entry, place_stop_loss_open, place_take_profit_open};
use crate::position::SharedPosition;
use crate::reconcile::{reconcile_entry, reconcile_stop_loss, reconcile_take_profit};
use crate::runtime::RuntimeMode;
use crate::store::{CandleStore, OrderStore, TradeStore};
use crate::trade::{self, CompletedTrade};
use crate::types::{CurrentCandle, PositionType, RouteId, Side, Symbol};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);
const CANCEL_POLL_MAX_ITERS: usize = 40;

pub struct Strategy<H: StrategyHooks> {
    pub route_id: RouteId,
    pub exchange: String,
    pub symbol: Symbol,
    pub timeframe: String,
    pub strategy_name: String,

    hooks: H,
    position: SharedPosition,
    broker: Arc<dyn Broker>,
    order_store: Arc<dyn OrderStore>,
    trade_store: Arc<dyn TradeStore>,
    candle_store: Arc<dyn CandleStore>,
    runtime: Arc<dyn RuntimeMode>,
    bus: BusHandle,
    vars: Value,

    index: AtomicU64,
    initial_qty: Mutex<f64>,
    is_executing: AtomicBool,
    is_initiated: AtomicBool,

    buy: Mutex<Option<IntentTable>>,
    sell: Mutex<Option<IntentTable>>,
    stop_loss: Mutex<Option<IntentTable>>,
    take_profit: Mutex<Option<IntentTable>>,

    effective_buy: Mutex<Option<IntentTable>>,
    effective_sell: Mutex<Option<IntentTable>>,
    effective_stop_loss: Mutex<Option<IntentTable>>,
    effective_take_profit: Mutex<Option<IntentTable>>,

    log_stop_loss: Mutex<IntentTable>,
    log_take_profit: Mutex<IntentTable>,

    entry_orders: Mutex<Vec<OrderHandle>>,
    take_profit_orders: Mutex<Vec<OrderHandle>>,
    stop_loss_orders: Mutex<Vec<OrderHandle>>,

    trade: Mutex<Option<CompletedTrade>>,
    trades_count: AtomicUsize,
}

impl<H: StrategyHooks> Strategy<H> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        route_id: RouteId,
        exchange: impl Into<String>,
        symbol: Symbol,
        timeframe: impl Into<String>,
        strategy_name: impl Into<String>,
        hooks: H,
        position: SharedPosition,
        broker: Arc<dyn Broker>,
        order_store: Arc<dyn OrderStore>,
        trade_store: Arc<dyn TradeStore>,
        candle_store: Arc<dyn CandleStore>,
        runtime: Arc<dyn RuntimeMode>,
        hyper_parameter_overrides: Value,
    ) -> Self {
        let vars = merge_hyper_parameters(hooks.hyper_parameters(), hyper_parameter_overrides);
        Strategy {
            route_id,
            exchange: exchange.into(),
            symbol,
            timeframe: timeframe.into(),
            strategy_name: strategy_name.into(),
            hooks,
            position,
            broker,
            order_store,
            trade_store,
            candle_store,
            runtime,
            bus: BusHandle::default(),
            vars,
            index: AtomicU64::new(0),
            initial_qty: Mutex::new(0.0),
            is_executing: AtomicBool::new(false),
            is_initiated: AtomicBool::new(false),
            buy: Mutex::new(None),
            sell: Mutex::new(None),
            stop_loss: Mutex::new(None),
            take_profit: Mutex::new(None),
            effective_buy: Mutex::new(None),
            effective_sell: Mutex::new(None),
            effective_stop_loss: Mutex::new(None),
            effective_take_profit: Mutex::new(None),
            log_stop_loss: Mutex::new(IntentTable::default()),
            log_take_profit: Mutex::new(IntentTable::default()),
            entry_orders: Mutex::new(Vec::new()),
            take_profit_orders: Mutex::new(Vec::new()),
            stop_loss_orders: Mutex::new(Vec::new()),
            trade: Mutex::new(None),
            trades_count: AtomicUsize::new(0),
        }
    }

    pub fn attach_bus(&self, router: &Arc<crate::bus::Router>) {
        self.bus.attach(router);
    }

    fn current_candle(&self) -> CurrentCandle {
        self.candle_store.get_current_candle(&self.exchange, &self.symbol, &self.timeframe)
    }

    fn context(&self, candle: CurrentCandle) -> HookContext<'_> {
        HookContext {
            symbol: &self.symbol,
            exchange: &self.exchange,
            timeframe: &self.timeframe,
            candle,
            vars: &self.vars,
            buy: self.buy.lock().unwrap().clone(),
            sell: self.sell.lock().unwrap().clone(),
            stop_loss: self.stop_loss.lock().unwrap().clone(),
            take_profit: self.take_profit.lock().unwrap().clone(),
        }
    }

    /// The single entry point the hosting runtime calls once per tick.
    /// Non-reentrant: a tick that arrives while the previous one is still
    /// executing is skipped rather than queued (spec §5).
    pub fn execute(&self) -> StrategyResult<()> {
        if self
            .is_executing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(route = ?self.route_id, "skipping tick: still executing previous one");
            return Ok(());
        }
        self.index.fetch_add(1, Ordering::SeqCst);
        let result = self.check();
        self.is_executing.store(false, Ordering::SeqCst);
        if let Err(ref e) = result {
            tracing::error!(route = ?self.route_id, error = %e, "tick aborted");
        }
        result
    }

    fn check(&self) -> StrategyResult<()> {
        if !self.is_initiated.swap(true, Ordering::SeqCst) {
            let candle = self.current_candle();
            let mut ctx = self.context(candle);
            self.hooks.prepare(&mut ctx);
        }

        if self.runtime.is_test_driving() && self.trades_count() >= 2 {
            return Ok(());
        }

        let position_is_open = self.position.lock().unwrap().is_open();

        if !position_is_open && !self.entry_orders.lock().unwrap().is_empty() {
            let candle = self.current_candle();
            let ctx = self.context(candle);
            if self.hooks.should_cancel(&ctx) {
                self.execute_cancel()?;
                return Ok(());
            }
        }

        if position_is_open {
            self.reconcile_open_position()?;
        }

        if self.runtime.is_backtesting() || self.runtime.is_unit_testing() {
            self.order_store.execute_pending_market_orders();
        }

        if !self.position.lock().unwrap().is_open() && self.entry_orders.lock().unwrap().is_empty() {
            let candle = self.current_candle();
            let ctx = self.context(candle);
            let should_long = self.hooks.should_long(&ctx);
            let should_short = self.hooks.should_short(&ctx);
            guard::validate_conflicting_rules(should_long, should_short)?;

            if should_long {
                self.execute_long()?;
            } else if should_short {
                self.execute_short()?;
            }
        }

        Ok(())
    }

    fn reconcile_open_position(&self) -> StrategyResult<()> {
        let candle = self.current_candle();
        let mut ctx = self.context(candle);
        self.hooks.update_position(&mut ctx);
        self.write_back(&ctx);

        let direction = self.position.lock().unwrap().position_type;
        let mark = candle.close();
        let side = self.runtime.type_to_side(direction);

        let (entry_current, entry_effective) = match side {
            Side::Buy => (self.buy.lock().unwrap().clone(), self.effective_buy.lock().unwrap().clone()),
            Side::Sell => (self.sell.lock().unwrap().clone(), self.effective_sell.lock().unwrap().clone()),
        };
        if let Some(desired) = entry_current {
            let effective = entry_effective.unwrap_or_default();
            let existing = self.entry_orders.lock().unwrap().clone();
            let outcome = reconcile_entry(&*self.broker, side, &desired, &effective, existing, mark);
            if outcome.changed {
                *self.entry_orders.lock().unwrap() = outcome.orders;
                match side {
                    Side::Buy => *self.effective_buy.lock().unwrap() = Some(desired),
                    Side::Sell => *self.effective_sell.lock().unwrap() = Some(desired),
                }
            }
        }

        if let Some(desired) = self.take_profit.lock().unwrap().clone() {
            let effective = self.effective_take_profit.lock().unwrap().clone().unwrap_or_default();
            let existing = self.take_profit_orders.lock().unwrap().clone();
            let outcome = reconcile_take_profit(&*self.broker, direction, &desired, &effective, existing, mark);
            if outcome.changed {
                let mut rebuilt: Vec<(f64, f64)> = outcome
                    .orders
                    .iter()
                    .filter(|o| o.lock().unwrap().is_executed)
                    .map(|o| {
                        let o = o.lock().unwrap();
                        (o.qty.abs(), o.price)
                    })
                    .collect();
                rebuilt.extend(desired.rows().iter().map(|(q, p)| (q.abs(), *p)));
                *self.take_profit_orders.lock().unwrap() = outcome.orders;
                *self.effective_take_profit.lock().unwrap() = Some(desired.clone());
                self.log_take_profit.lock().unwrap().0 = rebuilt;
            }
        }

        if let Some(desired) = self.stop_loss.lock().unwrap().clone() {
            let effective = self.effective_stop_loss.lock().unwrap().clone().unwrap_or_default();
            let existing = self.stop_loss_orders.lock().unwrap().clone();
            let outcome = reconcile_stop_loss(&*self.broker, direction, &desired, &effective, existing, mark);
            if outcome.changed {
                let mut rebuilt: Vec<(f64, f64)> = outcome
                    .orders
                    .iter()
                    .filter(|o| o.lock().unwrap().is_executed)
                    .map(|o| {
                        let o = o.lock().unwrap();
                        (o.qty.abs(), o.price)
                    })
                    .collect();
                rebuilt.extend(desired.rows().iter().map(|(q, p)| (q.abs(), *p)));
                *self.stop_loss_orders.lock().unwrap() = outcome.orders;
                *self.effective_stop_loss.lock().unwrap() = Some(desired.clone());
                self.log_stop_loss.lock().unwrap().0 = rebuilt;
            }
        }

        let sl = self.stop_loss.lock().unwrap().clone();
        let tp = self.take_profit.lock().unwrap().clone();
        if let (Some(sl), Some(tp)) = (sl, tp) {
            guard::validate_stop_loss_not_equal_take_profit(&sl, &tp)?;
        }

        Ok(())
    }

    fn write_back(&self, ctx: &HookContext<'_>) {
        *self.buy.lock().unwrap() = ctx.buy.clone();
        *self.sell.lock().unwrap() = ctx.sell.clone();
        *self.stop_loss.lock().unwrap() = ctx.stop_loss.clone();
        *self.take_profit.lock().unwrap() = ctx.take_profit.clone();
    }

    fn execute_long(&self) -> StrategyResult<()> {
        let candle = self.current_candle();
        let mut ctx = self.context(candle);
        self.hooks.go_long(&mut ctx);
        self.enter(PositionType::Long, Side::Buy, ctx, candle)
    }

    fn execute_short(&self) -> StrategyResult<()> {
        let candle = self.current_candle();
        let mut ctx = self.context(candle);
        self.hooks.go_short(&mut ctx);
        self.enter(PositionType::Short, Side::Sell, ctx, candle)
    }

    fn enter(
        &self,
        direction: PositionType,
        side: Side,
        ctx: HookContext<'_>,
        candle: CurrentCandle,
    ) -> StrategyResult<()> {
        let entry_raw = match side {
            Side::Buy => ctx.buy.clone(),
            Side::Sell => ctx.sell.clone(),
        }
        .ok_or_else(|| StrategyError::InvalidStrategy(format!("{:?} entry requires an entry intent", direction)))?;
        let stop_loss_raw = ctx.stop_loss.clone();
        let take_profit_raw = ctx.take_profit.clone();

        let entry = intent::normalize(entry_raw, "buy/sell", &*self.runtime)?;
        let stop_loss = stop_loss_raw
            .map(|sl| intent::normalize(sl, "stop_loss", &*self.runtime))
            .transpose()?;
        let take_profit = take_profit_raw
            .map(|t| intent::normalize(t, "take_profit", &*self.runtime))
            .transpose()?;

        let entry_price = entry
            .weighted_average_price()
            .ok_or_else(|| StrategyError::InvalidStrategy("empty entry intent".to_string()))?;

        if let Some(ref sl) = stop_loss {
            guard::validate_stop_loss_direction(direction, entry_price, sl)?;
        }
        if let Some(ref tp) = take_profit {
            guard::validate_take_profit_direction(direction, entry_price, tp)?;
            if let Some(ref sl) = stop_loss {
                guard::validate_stop_loss_not_equal_take_profit(sl, tp)?;
            }
        }

        let pass_filters = self.hooks.filters(&self.context(candle));
        if !pass_filters {
            self.reset();
            return Ok(());
        }

        let mark = candle.close();
        let role = crate::order::OrderRole::OpenPosition;
        let orders: Vec<OrderHandle> = entry
            .rows()
            .iter()
            .map(|(qty, price)| place_entry(&*self.broker, side, *qty, *price, mark, role))
            .collect();

        *self.initial_qty.lock().unwrap() = entry.rows().iter().map(|(q, _)| q.abs()).sum();
        *self.entry_orders.lock().unwrap() = orders;
        *self.effective_buy.lock().unwrap() = if side == Side::Buy { Some(entry.clone()) } else { None };
        *self.effective_sell.lock().unwrap() = if side == Side::Sell { Some(entry.clone()) } else { None };
        *self.buy.lock().unwrap() = if side == Side::Buy { Some(entry) } else { None };
        *self.stop_loss.lock().unwrap() = stop_loss;
        *self.take_profit.lock().unwrap() = take_profit;

        Ok(())
    }

    /// Dispatches an executed order's fill effect. The hosting runtime
    /// calls this once per fill notification, after updating `position`.
    pub fn on_order_executed(&self, order: OrderHandle) {
        let position_qty = self.position.lock().unwrap().qty;
        let position_is_open = self.position.lock().unwrap().is_open();
        let in_tp_basket = self.take_profit_orders.lock().unwrap().iter().any(|o| Arc::ptr_eq(o, &order));
        let in_sl_basket = self.stop_loss_orders.lock().unwrap().iter().any(|o| Arc::ptr_eq(o, &order));

        let role = classify_order(&order, position_qty, position_is_open, in_tp_basket, in_sl_basket);
        let candle = self.current_candle();

        match role {
            ClassifiedRole::Open => self.handle_open(order, candle),
            ClassifiedRole::Increase => self.handle_increase(order, candle),
            ClassifiedRole::Reduce => self.handle_reduce(order, candle),
            ClassifiedRole::CloseTakeProfit => self.handle_close(order, candle, true),
            ClassifiedRole::CloseStopLoss => self.handle_close(order, candle, false),
        }
    }

    fn handle_open(&self, order: OrderHandle, candle: CurrentCandle) {
        let direction = self.position.lock().unwrap().position_type;
        let new_trade = trade::open(
            order.clone(),
            direction,
            self.strategy_name.clone(),
            self.timeframe.clone(),
            self.exchange.clone(),
            self.symbol.clone(),
            self.runtime.now(),
            candle.timestamp(),
        );
        *self.trade.lock().unwrap() = Some(new_trade);
        self.entry_orders.lock().unwrap().clear();

        let mark = candle.close();
        if let Some(tp) = self.take_profit.lock().unwrap().clone() {
            self.log_take_profit.lock().unwrap().0.extend(tp.rows().iter().map(|(q, p)| (q.abs(), *p)));
            let role = crate::order::OrderRole::ClosePosition;
            let orders = tp
                .rows()
                .iter()
                .map(|(qty, price)| place_take_profit_open(&*self.broker, *qty, *price, role))
                .collect();
            *self.take_profit_orders.lock().unwrap() = orders;
            *self.effective_take_profit.lock().unwrap() = Some(tp);
        }
        if let Some(sl) = self.stop_loss.lock().unwrap().clone() {
            self.log_stop_loss.lock().unwrap().0.extend(sl.rows().iter().map(|(q, p)| (q.abs(), *p)));
            let role = crate::order::OrderRole::ClosePosition;
            let orders = sl
                .rows()
                .iter()
                .map(|(qty, price)| place_stop_loss_open(&*self.broker, *qty, *price, role))
                .collect();
            *self.stop_loss_orders.lock().unwrap() = orders;
            *self.effective_stop_loss.lock().unwrap() = Some(sl);
        }
        let _ = mark;

        let mut ctx = self.context(candle);
        self.hooks.on_open_position(&mut ctx, &order);
        self.write_back(&ctx);
        self.bus.broadcast(self.route_id, RouteEvent::OpenedPosition);
    }

    fn handle_increase(&self, order: OrderHandle, candle: CurrentCandle) {
        if let Some(trade) = self.trade.lock().unwrap().as_mut() {
            trade::record_increase(trade, order.clone());
        }
        self.entry_orders.lock().unwrap().clear();
        let mut ctx = self.context(candle);
        self.hooks.on_increased_position(&mut ctx, &order);
        self.write_back(&ctx);
        self.bus.broadcast(self.route_id, RouteEvent::IncreasedPosition);
    }

    fn handle_reduce(&self, order: OrderHandle, candle: CurrentCandle) {
        if let Some(trade) = self.trade.lock().unwrap().as_mut() {
            trade::record_reduce(trade, order.clone());
        }
        self.entry_orders.lock().unwrap().clear();
        let mut ctx = self.context(candle);
        self.hooks.on_reduced_position(&mut ctx, &order);
        self.write_back(&ctx);
        self.bus.broadcast(self.route_id, RouteEvent::ReducedPosition);
    }

    fn handle_close(&self, order: OrderHandle, candle: CurrentCandle, take_profit: bool) {
        let in_progress = self.trade.lock().unwrap().take();
        if let Some(in_progress) = in_progress {
            let log_sl = self.log_stop_loss.lock().unwrap().clone();
            let log_tp = self.log_take_profit.lock().unwrap().clone();
            let finished = trade::close(
                in_progress,
                order.clone(),
                Some(&log_sl),
                Some(&log_tp),
                candle.timestamp(),
                self.runtime.now(),
            );
            self.trade_store.add_trade(finished);
            self.trades_count.fetch_add(1, Ordering::SeqCst);
        }

        let mut ctx = self.context(candle);
        if take_profit {
            self.hooks.on_take_profit(&mut ctx, &order);
        } else {
            self.hooks.on_stop_loss(&mut ctx, &order);
        }
        self.write_back(&ctx);
        self.bus.broadcast(
            self.route_id,
            if take_profit { RouteEvent::TookProfit } else { RouteEvent::StoppedOut },
        );
        self.reset();
    }

    fn execute_cancel(&self) -> StrategyResult<()> {
        let position_is_open = self.position.lock().unwrap().is_open();
        guard::validate_cancel_preconditions(position_is_open)?;

        self.broker.cancel_all_orders();

        if self.runtime.is_live() {
            let exchange = self.exchange.clone();
            let symbol = self.symbol.clone();
            let store = self.order_store.clone();
            let cleared = crate::runtime::await_until(
                || store.count_active_orders(&exchange, &symbol) == 0,
                CANCEL_POLL_INTERVAL,
                CANCEL_POLL_MAX_ITERS,
            );
            if !cleared {
                return Err(StrategyError::ExchangeNotResponding(self.route_id));
            }
        }

        self.reset();
        self.bus.broadcast(self.route_id, RouteEvent::Cancelled);

        let candle = self.current_candle();
        let mut ctx = self.context(candle);
        self.hooks.on_cancel(&mut ctx);
        self.write_back(&ctx);

        if !self.runtime.is_live() && !self.runtime.is_unit_testing() {
            self.order_store.clear_route(&self.exchange, &self.symbol);
        }

        Ok(())
    }

    fn reset(&self) {
        *self.buy.lock().unwrap() = None;
        *self.sell.lock().unwrap() = None;
        *self.stop_loss.lock().unwrap() = None;
        *self.take_profit.lock().unwrap() = None;
        *self.effective_buy.lock().unwrap() = None;
        *self.effective_sell.lock().unwrap() = None;
        *self.effective_stop_loss.lock().unwrap() = None;
        *self.effective_take_profit.lock().unwrap() = None;
        *self.log_stop_loss.lock().unwrap() = IntentTable::default();
        *self.log_take_profit.lock().unwrap() = IntentTable::default();
        self.entry_orders.lock().unwrap().clear();
        self.take_profit_orders.lock().unwrap().clear();
        self.stop_loss_orders.lock().unwrap().clear();
        *self.initial_qty.lock().unwrap() = 0.0;
    }

    pub fn trades_count(&self) -> usize {
        self.trades_count.load(Ordering::SeqCst)
    }

    /// Called by the hosting runtime when this route is torn down (not
    /// part of the tick cycle).
    pub fn terminate(&self) {
        let candle = self.current_candle();
        let mut ctx = self.context(candle);
        self.hooks.terminate(&mut ctx);
        self.write_back(&ctx);
    }
}

impl<H: StrategyHooks> RouteHandle for Strategy<H> {
    fn route_id(&self) -> RouteId {
        self.route_id
    }

    fn on_route_event(&self, from: RouteId, event: RouteEvent) {
        let candle = self.current_candle();
        let mut ctx = self.context(candle);
        match event {
            RouteEvent::OpenedPosition => self.hooks.on_route_open_position(&mut ctx, from),
            RouteEvent::ClosedPosition => self.hooks.on_route_close_position(&mut ctx, from),
            RouteEvent::IncreasedPosition => self.hooks.on_route_increased_position(&mut ctx, from),
            RouteEvent::ReducedPosition => self.hooks.on_route_reduced_position(&mut ctx, from),
            RouteEvent::StoppedOut => self.hooks.on_route_stop_loss(&mut ctx, from),
            RouteEvent::TookProfit => self.hooks.on_route_take_profit(&mut ctx, from),
            RouteEvent::Cancelled => {}
        }
        self.write_back(&ctx);
    }

    fn reconcile(&self) {
        if self.position.lock().unwrap().is_open() {
            if let Err(e) = self.reconcile_open_position() {
                tracing::error!(route = ?self.route_id, error = %e, "reconcile triggered by peer broadcast failed");
            }
        }
    }
}

/// Strategy-declared defaults merged under route-config overrides — the
/// override wins wherever both define the same key.
fn merge_hyper_parameters(defaults: Value, overrides: Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(mut base), Value::Object(over)) => {
            for (k, v) in over {
                base.insert(k, v);
            }
            Value::Object(base)
        }
        (_, Value::Object(over)) => Value::Object(over),
        (base, Value::Null) => base,
        (_, over) => over,
    }
}

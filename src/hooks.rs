//! Strategy hooks — a capability record replacing deep subclassing.
//!
//! The original strategy base class is inherited and overridden; Rust has
//! no equivalent mechanism, and the corpus's own preference (see
//! `DESIGN.md`) is to model optional overrides as trait methods with
//! default no-op bodies rather than a trait-object hierarchy. A concrete
//! strategy implements `StrategyHooks`, providing only the five required
//! methods and overriding whichever optional ones it needs.

use crate::intent::IntentTable;
use crate::order::OrderHandle;
use crate::types::{CurrentCandle, RouteId, Symbol};
use serde_json::Value;

/// The behavior unique to a concrete strategy. `Strategy<H>` drives these
/// through the lifecycle state machine (C4); none of them are called
/// directly by user code.
pub trait StrategyHooks: Send + Sync {
    /// Sets `buy`/`stop_loss`/`take_profit` (and optionally `sell`) ahead
    /// of opening a long position. Called once per tick that attempts a
    /// long entry, after `should_long` returns true.
    fn go_long(&self, ctx: &mut HookContext);

    /// Mirror of `go_long` for the short side.
    fn go_short(&self, ctx: &mut HookContext);

    /// Whether conditions currently favor opening a long.
    fn should_long(&self, ctx: &HookContext) -> bool;

    /// Whether conditions currently favor opening a short.
    fn should_short(&self, ctx: &HookContext) -> bool;

    /// Whether a still-pending (unfilled) entry should be cancelled this
    /// tick.
    fn should_cancel(&self, ctx: &HookContext) -> bool;

    /// Last-chance veto before submission: return `false` to silently
    /// reset and retry next tick (spec §4.4's filters loop). Default:
    /// always pass.
    fn filters(&self, _ctx: &HookContext) -> bool {
        true
    }

    /// Strategy-declared hyperparameter defaults, merged under route
    /// config overrides (spec §3 `vars`). Default: none.
    fn hyper_parameters(&self) -> Value {
        Value::Null
    }

    /// Called every tick a position is open, before the reconciler runs.
    fn update_position(&self, _ctx: &mut HookContext) {}

    fn on_open_position(&self, _ctx: &mut HookContext, _order: &OrderHandle) {}
    fn on_increased_position(&self, _ctx: &mut HookContext, _order: &OrderHandle) {}
    fn on_reduced_position(&self, _ctx: &mut HookContext, _order: &OrderHandle) {}
    fn on_take_profit(&self, _ctx: &mut HookContext, _order: &OrderHandle) {}
    fn on_stop_loss(&self, _ctx: &mut HookContext, _order: &OrderHandle) {}
    fn on_cancel(&self, _ctx: &mut HookContext) {}

    fn on_route_open_position(&self, _ctx: &mut HookContext, _from: RouteId) {}
    fn on_route_close_position(&self, _ctx: &mut HookContext, _from: RouteId) {}
    fn on_route_increased_position(&self, _ctx: &mut HookContext, _from: RouteId) {}
    fn on_route_reduced_position(&self, _ctx: &mut HookContext, _from: RouteId) {}
    fn on_route_stop_loss(&self, _ctx: &mut HookContext, _from: RouteId) {}
    fn on_route_take_profit(&self, _ctx: &mut HookContext, _from: RouteId) {}

    /// Called once before the first tick.
    fn prepare(&self, _ctx: &mut HookContext) {}
    /// Called once when the route is torn down.
    fn terminate(&self, _ctx: &mut HookContext) {}

    /// Additional symbols this strategy wants candles for, beyond its own
    /// route. Default: none.
    fn watch_list(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// What a hook implementation can read and write on a given tick. This is
/// the capability-record's "self" — a view onto the strategy's mutable
/// intent state plus read-only market context, handed to hooks instead of
/// giving them the whole `Strategy<H>` (which also owns the hook object
/// itself).
pub struct HookContext<'a> {
    pub symbol: &'a Symbol,
    pub exchange: &'a str,
    pub timeframe: &'a str,
    pub candle: CurrentCandle,
    pub vars: &'a Value,

    pub buy: Option<IntentTable>,
    pub sell: Option<IntentTable>,
    pub stop_loss: Option<IntentTable>,
    pub take_profit: Option<IntentTable>,
}

impl<'a> HookContext<'a> {
    pub fn set_buy(&mut self, table: IntentTable) {
        self.buy = Some(table);
    }
    pub fn set_sell(&mut self, table: IntentTable) {
        self.sell = Some(table);
    }
    pub fn set_stop_loss(&mut self, table: IntentTable) {
        self.stop_loss = Some(table);
    }
    pub fn set_take_profit(&mut self, table: IntentTable) {
        self.take_profit = Some(table);
    }
}

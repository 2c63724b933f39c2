//! Error kinds surfaced by the strategy execution core.
//!
//! None of these are caught internally (spec §7): an error aborts the
//! current tick and propagates to the hosting runtime via `execute()`'s
//! `Result`. The next tick resumes with whatever broker-visible effects
//! were already issued before the error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    /// A user override violated a contract: a missing intent, SL/TP on the
    /// wrong side of the entry price, SL == TP, or reading an average
    /// price/quantity before the corresponding intent was set.
    #[error("invalid strategy: {0}")]
    InvalidStrategy(String),

    /// An intent could not be normalized to an `(N, 2)` numeric table.
    #[error("invalid shape for {name}: expected (qty, price), a list of such pairs, or a normalized table; got {detail}")]
    InvalidShape { name: &'static str, detail: String },

    /// `should_long` and `should_short` were both true on the same tick.
    #[error("should_long and should_short must not both be true on the same tick")]
    ConflictingRules,

    /// Live-mode cancellation did not clear active orders within the
    /// bounded wait.
    #[error("the exchange did not respond as expected while cancelling route {0:?}")]
    ExchangeNotResponding(crate::types::RouteId),

    /// A state-machine assertion was violated — e.g. `execute_cancel`
    /// called while the position is open.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

pub type StrategyResult<T> = Result<T, StrategyError>;

//! The filter chain a registration can attach around handler invocation.
//!
//! No exception crosses the filter boundary: every hook returns a tagged
//! [`FilterOutcome`] instead of throwing, so the pipeline never needs to
//! distinguish "a filter raised" from "a filter decided the outcome."

use serde_json::Value;

use crate::error::RegistryError;

/// What a filter hook decided should happen next.
#[derive(Debug, Clone)]
pub enum FilterOutcome {
    /// Proceed to the next filter / the handler itself.
    Continue,
    /// Skip the handler entirely; treat this as a successful result.
    ShortCircuitSuccess(Value),
    /// Skip the handler entirely; treat this as a failure.
    ShortCircuitFail(RegistryError),
    /// Only meaningful from `on_exception`: the filter has dealt with the
    /// failure itself and supplies the result that should be used instead.
    Handled(Value),
}

/// A single stage wrapped around handler invocation, run in ascending
/// `order` before the handler and descending `order` after it.
pub trait Filter: Send + Sync {
    /// Stable ordering key; lower runs first on the way in, last on the way
    /// out.
    fn order(&self) -> i32;

    /// Runs before the handler. Returning anything but `Continue`
    /// short-circuits the handler call.
    fn on_executing(&self) -> FilterOutcome {
        FilterOutcome::Continue
    }

    /// Runs after a successful handler call.
    fn on_executed(&self, _result: &Value) -> FilterOutcome {
        FilterOutcome::Continue
    }

    /// Runs after a failed handler call. Returning `Handled` suppresses
    /// propagation of the failure and supplies a result instead.
    fn on_exception(&self, _error: &RegistryError) -> FilterOutcome {
        FilterOutcome::Continue
    }
}

/// A boxed, ordered filter ready to be stored in a [`crate::TaskRegistration`].
pub type BoxedFilter = std::sync::Arc<dyn Filter>;

//! Fluent builder for hand-assembled transitions.

use crate::core::{ContextAccessor, ContextOperator, Guard, PackagedAction, Transition, Value};
use crate::error::{CallbackError, FsmError, Result};

/// Builder for constructing transitions with a fluent API.
///
/// The source state is only used for naming and error reporting; the
/// transition itself is attached by handing it to a [`StateInfo`].
///
/// [`StateInfo`]: crate::core::StateInfo
#[derive(Debug, Default)]
pub struct TransitionBuilder {
    from: Option<String>,
    name: Option<String>,
    to: Option<String>,
    guard: Option<Guard>,
    action: Option<PackagedAction>,
}

impl TransitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source state (required).
    pub fn from(mut self, state: impl Into<String>) -> Self {
        self.from = Some(state.into());
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = Some(state.into());
        self
    }

    /// Name the transition. Defaults to `"<from>-<to>"`.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a guard (optional, unconditional by default).
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn ContextAccessor) -> Result<bool, CallbackError> + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Open only while the context holds `value` under `key`.
    pub fn when_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.guard = Some(Guard::context_equals(key, value));
        self
    }

    /// Set the entry action (optional).
    pub fn action(mut self, action: PackagedAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Set the entry action from a closure.
    pub fn run<F>(self, func: F) -> Self
    where
        F: Fn(&mut dyn ContextOperator) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.action(PackagedAction::new(func))
    }

    /// Build the transition.
    pub fn build(self) -> Result<Transition> {
        let from = self
            .from
            .ok_or_else(|| FsmError::Load("transition source state is not set".to_string()))?;
        let to = self.to.ok_or_else(|| {
            FsmError::state_invalid(&from, "transition should have a destination")
        })?;
        let name = self.name.unwrap_or_else(|| format!("{from}-{to}"));

        let transition = Transition::new(
            name,
            to,
            self.guard.unwrap_or_else(Guard::always),
            self.action,
        );
        transition.validate(&from)?;
        Ok(transition)
    }
}

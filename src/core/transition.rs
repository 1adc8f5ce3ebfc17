//! Transitions between states and the actions they carry.

use super::context::ContextOperator;
use super::dump::Dump;
use super::guard::Guard;
use super::value::Value;
use crate::error::{CallbackError, FsmError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;
use std::sync::Arc;

/// Signature of a user-defined action.
pub type ActionFn = dyn Fn(&mut dyn ContextOperator) -> Result<(), CallbackError> + Send + Sync;

/// An action function bundled with literal parameters.
///
/// Parameters are written into the context right before the function
/// runs, overwriting any existing keys of the same name.
#[derive(Clone)]
pub struct PackagedAction {
    func: Arc<ActionFn>,
    params: BTreeMap<String, Value>,
}

impl PackagedAction {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut dyn ContextOperator) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self::from_shared(Arc::new(func))
    }

    /// Wrap an already shared action function.
    pub fn from_shared(func: Arc<ActionFn>) -> Self {
        Self {
            func,
            params: BTreeMap::new(),
        }
    }

    /// Add an input parameter. Calls can be chained.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Store the parameters, then run the function.
    pub fn run(&self, ctx: &mut dyn ContextOperator) -> Result<(), CallbackError> {
        for (key, value) in &self.params {
            ctx.put(key, value.clone())?;
        }
        (self.func)(ctx)
    }
}

impl fmt::Debug for PackagedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackagedAction")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Edge from the owning state to the state named by `to_state`.
///
/// The destination is kept by name and resolved against the owning
/// structure when the transition fires.
#[derive(Clone, Debug)]
pub struct Transition {
    name: String,
    to_state: String,
    guard: Guard,
    action: Option<PackagedAction>,
}

impl Transition {
    pub fn new(
        name: impl Into<String>,
        to_state: impl Into<String>,
        guard: Guard,
        action: Option<PackagedAction>,
    ) -> Self {
        Self {
            name: name.into(),
            to_state: to_state.into(),
            guard,
            action,
        }
    }

    /// A single unconditional transition, ready to hand to a state.
    pub fn always(
        name: impl Into<String>,
        to_state: impl Into<String>,
        action: Option<PackagedAction>,
    ) -> Vec<Transition> {
        vec![Self::new(name, to_state, Guard::Always, action)]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_state(&self) -> &str {
        &self.to_state
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn action(&self) -> Option<&PackagedAction> {
        self.action.as_ref()
    }

    /// Check that the transition is well-formed. `owner` names the source
    /// state for error reporting.
    pub fn validate(&self, owner: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(FsmError::state_invalid(
                owner,
                format!("transition to \"{}\" should be named", self.to_state),
            ));
        }
        if self.to_state.is_empty() {
            return Err(FsmError::state_invalid(
                owner,
                format!("transition \"{}\" should have a destination", self.name),
            ));
        }
        Ok(())
    }
}

impl Dump for Transition {
    fn dump(&self, buf: &mut String, _level: usize) {
        let _ = write!(
            buf,
            "name: \"{}\", to: \"{}\", guard: {}, ",
            self.name, self.to_state, self.guard
        );
        match &self.action {
            None => buf.push_str("no action"),
            Some(action) if action.params.is_empty() => buf.push_str("has action (no params)"),
            Some(action) => {
                buf.push_str("has action (");
                for (key, value) in &action.params {
                    let _ = write!(buf, " {key}={value}");
                }
                buf.push_str(" )");
            }
        }
    }
}

//! Guard predicates for controlling transitions.
//!
//! A guard decides whether a transition may fire given the current
//! context. Guards only get read access to the context, but may fail; a
//! failing guard is distinct from a closed one.

use super::context::ContextAccessor;
use super::value::Value;
use crate::error::{CallbackError, FsmError};
use std::fmt;
use std::sync::Arc;

/// Signature of a user-defined guard.
pub type GuardFn = dyn Fn(&dyn ContextAccessor) -> Result<bool, CallbackError> + Send + Sync;

/// Predicate that determines whether a transition is open.
///
/// Declarative guards are explicit descriptors evaluated by
/// [`Guard::check`]; arbitrary logic goes through [`Guard::new`].
///
/// # Example
///
/// ```rust
/// use nestfsm::core::{Context, ContextOperator, Guard};
///
/// let mut ctx = Context::new();
/// ctx.put("mode", "fast".into()).unwrap();
///
/// let guard = Guard::context_equals("mode", "fast");
/// assert!(guard.check(&ctx).unwrap());
///
/// let guard = Guard::new(|ctx| Ok(ctx.str("mode")? == "slow"));
/// assert!(!guard.check(&ctx).unwrap());
/// ```
#[derive(Clone)]
pub enum Guard {
    /// Always open.
    Always,
    /// Open when the stored value under `key` equals `value`.
    ///
    /// Numeric literals compare against any numeric stored value as `f64`.
    ContextEquals { key: String, value: Value },
    /// User-defined predicate.
    Custom(Arc<GuardFn>),
}

impl Guard {
    /// Create a guard from a predicate function.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&dyn ContextAccessor) -> Result<bool, CallbackError> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    pub fn always() -> Self {
        Self::Always
    }

    pub fn context_equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ContextEquals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Evaluate the guard against a context view.
    pub fn check(&self, ctx: &dyn ContextAccessor) -> Result<bool, CallbackError> {
        match self {
            Self::Always => Ok(true),
            Self::ContextEquals { key, value } => context_equals(ctx, key, value),
            Self::Custom(predicate) => predicate(ctx),
        }
    }
}

fn context_equals(
    ctx: &dyn ContextAccessor,
    key: &str,
    expected: &Value,
) -> Result<bool, CallbackError> {
    let stored = ctx.raw(key)?;
    match expected {
        Value::Int(_) | Value::Float(_) => {
            let Some(actual) = stored.as_f64() else {
                return Err(FsmError::Runtime(format!(
                    "cannot convert \"{key}\" ({}) to a number",
                    stored.value_type()
                ))
                .into());
            };
            Ok(expected.as_f64() == Some(actual))
        }
        _ => Ok(stored == expected),
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::ContextEquals { key, value } => f
                .debug_struct("ContextEquals")
                .field("key", key)
                .field("value", value)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("always"),
            Self::ContextEquals { key, value } => write!(f, "context {key} == {value}"),
            Self::Custom(_) => f.write_str("custom"),
        }
    }
}

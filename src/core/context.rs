//! Flat key/value scopes and the capabilities handed to callbacks.
//!
//! Guards receive a read-only [`ContextAccessor`]; actions receive a
//! [`ContextOperator`], which adds the write operations.

use super::dump::{indent, Dump};
use super::value::{Value, ValueType};
use crate::error::{FsmError, Result};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Key under which a run publishes its outcome.
pub const RESULT_KEY: &str = "result";

/// Read-only access to context values.
///
/// Typed getters fail with [`FsmError::InvalidType`] instead of coercing.
pub trait ContextAccessor {
    /// Look up a raw value.
    fn raw(&self, key: &str) -> Result<&Value>;

    fn has(&self, key: &str) -> bool {
        self.raw(key).is_ok()
    }

    fn bool(&self, key: &str) -> Result<bool> {
        match self.raw(key)? {
            Value::Bool(v) => Ok(*v),
            other => Err(type_mismatch(ValueType::Bool, other)),
        }
    }

    fn int(&self, key: &str) -> Result<i64> {
        match self.raw(key)? {
            Value::Int(v) => Ok(*v),
            other => Err(type_mismatch(ValueType::Int, other)),
        }
    }

    fn float(&self, key: &str) -> Result<f64> {
        match self.raw(key)? {
            Value::Float(v) => Ok(*v),
            other => Err(type_mismatch(ValueType::Float, other)),
        }
    }

    fn str(&self, key: &str) -> Result<&str> {
        match self.raw(key)? {
            Value::Str(v) => Ok(v.as_str()),
            other => Err(type_mismatch(ValueType::Str, other)),
        }
    }
}

/// Read-write access to context values.
pub trait ContextOperator: ContextAccessor {
    /// Store a value in the innermost scope.
    fn put(&mut self, key: &str, value: Value) -> Result<()>;

    /// Store a value in the scope enclosing the innermost one.
    fn put_parent(&mut self, key: &str, value: Value) -> Result<()>;

    /// Store the run outcome in the outermost scope.
    fn put_result(&mut self, value: Value) -> Result<()>;
}

fn type_mismatch(requested: ValueType, actual: &Value) -> FsmError {
    FsmError::InvalidType {
        requested,
        actual: actual.value_type(),
    }
}

/// A single scope of named values.
#[derive(Clone, Debug, Default)]
pub struct Context {
    members: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl ContextAccessor for Context {
    fn raw(&self, key: &str) -> Result<&Value> {
        self.members
            .get(key)
            .ok_or_else(|| FsmError::KeyNotFound(key.to_string()))
    }
}

impl ContextOperator for Context {
    fn put(&mut self, key: &str, value: Value) -> Result<()> {
        self.members.insert(key.to_string(), value);
        Ok(())
    }

    fn put_parent(&mut self, _key: &str, _value: Value) -> Result<()> {
        Err(FsmError::Runtime(
            "a standalone context has no enclosing scope".to_string(),
        ))
    }

    fn put_result(&mut self, value: Value) -> Result<()> {
        self.put(RESULT_KEY, value)
    }
}

impl Dump for Context {
    fn dump(&self, buf: &mut String, level: usize) {
        let pad = indent(level);
        if self.members.is_empty() {
            let _ = writeln!(buf, "{pad}(empty)");
            return;
        }
        for (key, value) in &self.members {
            let _ = writeln!(buf, "{pad}{key}: {value}");
        }
    }
}

//! Stack of per-state scopes mirroring the active path.
//!
//! Each entered state owns one [`Context`]. Lookups read through the
//! stack from the innermost scope outwards, so nearer scopes shadow
//! farther ones. Writes land in the innermost scope, except for the run
//! result, which always goes to the outermost one.

use super::context::{Context, ContextAccessor, ContextOperator, RESULT_KEY};
use super::dump::{indent, Dump};
use super::value::Value;
use crate::error::{FsmError, Result};
use std::fmt::Write;

/// One stack entry: a state name and its scope.
#[derive(Clone, Debug)]
pub struct StateContext {
    state: String,
    context: Context,
}

impl StateContext {
    fn new(state: String) -> Self {
        Self {
            state,
            context: Context::new(),
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }
}

#[derive(Clone, Debug, Default)]
pub struct ContextStack {
    stack: Vec<StateContext>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Innermost entry.
    pub fn peek(&self) -> Option<&StateContext> {
        self.stack.last()
    }

    /// Entry just below the head.
    pub fn parent(&self) -> Option<&StateContext> {
        self.stack.len().checked_sub(2).map(|idx| &self.stack[idx])
    }

    /// Outermost entry.
    pub fn global(&self) -> Option<&StateContext> {
        self.stack.first()
    }

    /// Innermost entry belonging to `name`.
    pub fn by_state(&self, name: &str) -> Option<&StateContext> {
        self.stack.iter().rev().find(|entry| entry.state == name)
    }

    /// States on the stack, outermost first.
    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.stack.iter().map(|entry| entry.state.as_str())
    }

    /// Open a fresh scope for `state`.
    ///
    /// Returns `None` without touching the stack when the name is empty or
    /// equals the current head.
    pub fn push(&mut self, state: &str) -> Option<&StateContext> {
        if state.is_empty() || self.peek().is_some_and(|head| head.state == state) {
            return None;
        }
        self.stack.push(StateContext::new(state.to_string()));
        self.stack.last()
    }

    /// Close the innermost scope, `None` on an empty stack.
    pub fn pop(&mut self) -> Option<StateContext> {
        self.stack.pop()
    }
}

impl ContextAccessor for ContextStack {
    fn raw(&self, key: &str) -> Result<&Value> {
        self.stack
            .iter()
            .rev()
            .find_map(|entry| entry.context.raw(key).ok())
            .ok_or_else(|| FsmError::KeyNotFound(key.to_string()))
    }
}

impl ContextOperator for ContextStack {
    fn put(&mut self, key: &str, value: Value) -> Result<()> {
        match self.stack.last_mut() {
            Some(head) => head.context.put(key, value),
            None => Err(FsmError::Runtime(
                "can't put to an empty context stack".to_string(),
            )),
        }
    }

    fn put_parent(&mut self, key: &str, value: Value) -> Result<()> {
        let Some(idx) = self.stack.len().checked_sub(2) else {
            return Err(FsmError::Runtime(
                "context stack has no scope below its head".to_string(),
            ));
        };
        self.stack[idx].context.put(key, value)
    }

    fn put_result(&mut self, value: Value) -> Result<()> {
        match self.stack.first_mut() {
            Some(global) => global.context.put(RESULT_KEY, value),
            None => Err(FsmError::Runtime(
                "can't put to an empty context stack".to_string(),
            )),
        }
    }
}

impl Dump for ContextStack {
    fn dump(&self, buf: &mut String, level: usize) {
        let pad = indent(level);
        if self.stack.is_empty() {
            let _ = writeln!(buf, "{pad}(empty)");
            return;
        }
        for entry in &self.stack {
            let _ = writeln!(buf, "{pad}> state: \"{}\"", entry.state);
            entry.context.dump(buf, level + 1);
        }
    }
}

//! Named action callbacks available to declarations.

use crate::core::{ActionFn, ContextOperator};
use crate::error::CallbackError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registry mapping action names to callbacks.
///
/// Declarations refer to actions by name only; the [`Builder`](super::Builder)
/// resolves every name against this map and fails the build for unknown
/// ones.
#[derive(Clone, Default)]
pub struct ActionMap {
    actions: HashMap<String, Arc<ActionFn>>,
}

impl ActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`, replacing any previous entry.
    pub fn insert<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&mut dyn ContextOperator) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(func));
        self
    }

    /// Chained form of [`ActionMap::insert`].
    pub fn with<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut dyn ContextOperator) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.insert(name, func);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ActionFn>> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ActionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionMap")
            .field("actions", &self.names())
            .finish()
    }
}

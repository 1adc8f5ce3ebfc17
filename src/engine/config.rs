//! Engine settings.

use serde::{Deserialize, Serialize};

/// Default initial capacity of a run's history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Tunables of an [`Fsm`](super::Fsm) instance.
///
/// Missing fields fall back to their defaults when deserializing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsmConfig {
    /// Initial capacity reserved for the transition history.
    pub history_capacity: usize,

    /// Upper bound on the transitions a single `run` may perform. `None`
    /// runs until the machine completes or goes fatal.
    pub max_steps: Option<usize>,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_steps: None,
        }
    }
}

impl FsmConfig {
    pub fn max_steps(mut self, limit: usize) -> Self {
        self.max_steps = Some(limit);
        self
    }
}

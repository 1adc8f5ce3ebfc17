//! Transition history of a run.
//!
//! Every step taken by the engine is appended as a [`HistoryItem`]. The
//! history is append-only for the lifetime of a run and is discarded by a
//! reset.

use super::dump::{indent, Dump};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;

/// Record of a single transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// The state being left
    pub from: String,
    /// The state being entered
    pub to: String,
    /// Name of the transition that fired
    pub transition: String,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
}

impl HistoryItem {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        transition: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            transition: transition.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, append-only list of transitions.
///
/// # Example
///
/// ```rust
/// use nestfsm::core::{History, HistoryItem};
///
/// let mut history = History::default();
/// history.record(HistoryItem::new("global", "start", "Always global->start"));
/// history.record(HistoryItem::new("start", "end", "start-end"));
///
/// assert_eq!(history.path(), vec!["global", "start", "end"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    items: Vec<HistoryItem>,
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, item: HistoryItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryItem> {
        self.items.last()
    }

    /// Names of the states visited: the first source, then every
    /// destination in order.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.items.len() + 1);
        if let Some(first) = self.items.first() {
            path.push(first.from.as_str());
        }
        path.extend(self.items.iter().map(|item| item.to.as_str()));
        path
    }

    /// Time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.items.first()?, self.items.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }
}

impl Dump for History {
    fn dump(&self, buf: &mut String, level: usize) {
        let pad = indent(level);
        if self.items.is_empty() {
            let _ = writeln!(buf, "{pad}(empty)");
            return;
        }
        for item in &self.items {
            let _ = writeln!(
                buf,
                "{pad}from: {}, to: {}, transition: {}",
                item.from, item.to, item.transition
            );
        }
    }
}

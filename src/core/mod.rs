//! Core data model of the state machine.
//!
//! This module contains the building blocks every other layer uses:
//! - Dynamically typed [`Value`]s stored in per-state [`Context`] scopes
//! - The [`ContextStack`] that mirrors the active path through the tree
//! - [`Guard`]s and [`PackagedAction`]s attached to [`Transition`]s
//! - [`StateInfo`] tree nodes
//! - Append-only [`History`] of a run

mod context;
mod dump;
mod guard;
mod history;
mod stack;
mod state;
mod transition;
mod value;

pub use context::{Context, ContextAccessor, ContextOperator, RESULT_KEY};
pub use dump::{dump_to_string, Dump};
pub(crate) use dump::indent;
pub use guard::{Guard, GuardFn};
pub use history::{History, HistoryItem};
pub use stack::{ContextStack, StateContext};
pub use state::StateInfo;
pub use transition::{ActionFn, PackagedAction, Transition};
pub use value::{Value, ValueType};

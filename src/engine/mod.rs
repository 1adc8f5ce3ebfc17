//! Execution layer: the [`Fsm`] engine and its settings.

mod config;
mod machine;

pub use config::{FsmConfig, DEFAULT_HISTORY_CAPACITY};
pub use machine::{Fsm, Status};

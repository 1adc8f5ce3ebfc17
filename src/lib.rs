//! Nestfsm: a hierarchical finite state machine engine
//!
//! States form a tree rooted at a synthetic `global` state. Each active
//! state owns a key/value scope on a context stack that mirrors the path
//! from the root, so inner states see everything their ancestors stored and
//! leaving a subtree discards its scopes.
//!
//! # Core Concepts
//!
//! - **Structure**: validated table of [`StateInfo`](core::StateInfo) nodes
//!   and their transitions
//! - **Guards**: predicates over the context deciding which transition fires;
//!   exactly one must be open per step
//! - **Actions**: callbacks run against the context when a transition enters
//!   its destination
//! - **Fsm**: steps through a structure one transition at a time and goes
//!   fatal on the first unrecoverable error
//! - **Builder**: compiles unordered declarations into a structure
//!
//! # Example
//!
//! ```rust
//! use nestfsm::core::{ContextOperator, PackagedAction, StateInfo, Transition};
//! use nestfsm::{Fsm, Status, Structure};
//!
//! let finish = PackagedAction::new(|ctx| {
//!     ctx.put_result("finished".into())?;
//!     Ok(())
//! });
//!
//! let mut structure = Structure::new();
//! structure.add_start_state(StateInfo::new("work", vec![]), None)?;
//! structure.add_start_state(
//!     StateInfo::new("prepare", Transition::always("prepare-done", "done", Some(finish))),
//!     Some("work"),
//! )?;
//! structure.add_state(StateInfo::new("done", vec![]), None)?;
//!
//! let mut fsm = Fsm::new(structure);
//! assert_eq!(fsm.status(), Status::Idle);
//! assert_eq!(fsm.run()?, "finished".into());
//! assert_eq!(fsm.history().path(), vec!["global", "work", "prepare", "done"]);
//! # Ok::<(), nestfsm::FsmError>(())
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod error;
pub mod structure;

// Re-export commonly used types
pub use builder::{ActionMap, Builder, Declarations};
pub use engine::{Fsm, FsmConfig, Status};
pub use error::{CallbackError, ErrorKind, FsmError, Result};
pub use structure::{CommonAncestor, Structure, GLOBAL_STATE_NAME};

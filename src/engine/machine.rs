//! State machine that steps through a validated structure.

use crate::core::{
    dump_to_string, indent, ContextAccessor, ContextStack, Dump, History, HistoryItem,
    StateInfo, Value, RESULT_KEY,
};
use crate::engine::config::FsmConfig;
use crate::error::{FsmError, Result};
use crate::structure::{Structure, GLOBAL_STATE_NAME};
use std::fmt;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

/// Lifecycle status of a machine. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Nothing entered yet beyond the root.
    Idle,
    /// Somewhere inside the hierarchy, with transitions left to take.
    Running,
    /// The active state has no outgoing transitions.
    Completed,
    /// Stopped by an unrecoverable error. Sticky until reset.
    Fatal,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run of a [`Structure`].
///
/// The structure is shared and never modified; the machine owns the live
/// context stack, the history of the run and the fatal error slot.
///
/// # Example
///
/// ```rust
/// use nestfsm::core::{ContextOperator, PackagedAction, StateInfo, Transition};
/// use nestfsm::{Fsm, Structure};
///
/// let done = PackagedAction::new(|ctx| {
///     ctx.put_result(true.into())?;
///     Ok(())
/// });
/// let structure = Structure::new_with(
///     StateInfo::new("1", Transition::always("1-2", "2", Some(done))),
///     [StateInfo::new("2", vec![])],
/// )
/// .unwrap();
///
/// let mut fsm = Fsm::new(structure);
/// let result = fsm.run().unwrap();
/// assert_eq!(result, true.into());
/// ```
#[derive(Debug)]
pub struct Fsm {
    structure: Arc<Structure>,
    config: FsmConfig,
    stack: ContextStack,
    history: History,
    fatal: Option<FsmError>,
    run_id: Uuid,
}

impl Fsm {
    pub fn new(structure: impl Into<Arc<Structure>>) -> Self {
        Self::with_config(structure, FsmConfig::default())
    }

    pub fn with_config(structure: impl Into<Arc<Structure>>, config: FsmConfig) -> Self {
        let history = History::with_capacity(config.history_capacity);
        let mut fsm = Self {
            structure: structure.into(),
            config,
            stack: ContextStack::new(),
            history,
            fatal: None,
            run_id: Uuid::new_v4(),
        };
        fsm.seed_stack();
        fsm
    }

    fn seed_stack(&mut self) {
        if self.stack.is_empty() {
            self.stack.push(GLOBAL_STATE_NAME);
        }
    }

    /// Discard the progress of the current run and return to idle.
    ///
    /// The structure is left untouched.
    pub fn reset(&mut self) {
        self.stack = ContextStack::new();
        self.seed_stack();
        self.history = History::with_capacity(self.config.history_capacity);
        self.fatal = None;
        self.run_id = Uuid::new_v4();
        debug!(run_id = %self.run_id, "machine reset");
    }

    pub fn status(&self) -> Status {
        if self.fatal.is_some() {
            Status::Fatal
        } else if self.stack.depth() <= 1 {
            Status::Idle
        } else if self.current_state().is_some_and(StateInfo::is_final) {
            Status::Completed
        } else {
            Status::Running
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status() == Status::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status() == Status::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status() == Status::Completed
    }

    pub fn is_fatal(&self) -> bool {
        self.status() == Status::Fatal
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn config(&self) -> &FsmConfig {
        &self.config
    }

    pub fn stack(&self) -> &ContextStack {
        &self.stack
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Identifier of the current run, renewed by [`Fsm::reset`].
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The stored fatal error, if the machine went fatal.
    pub fn fatal_error(&self) -> Option<&FsmError> {
        self.fatal.as_ref()
    }

    /// The state at the head of the context stack.
    pub fn current_state(&self) -> Option<&StateInfo> {
        self.stack
            .peek()
            .and_then(|head| self.structure.get(head.state()))
    }

    /// Take exactly one transition.
    ///
    /// The first call validates the structure. Every transition of the
    /// active state is evaluated and exactly one must be open. Scopes are
    /// closed up to the common ancestor of the source and destination, the
    /// destination's scope is opened and then the transition's action runs
    /// against it.
    ///
    /// Any failure in here is unrecoverable: the machine goes fatal and the
    /// triggering error is returned. Later calls return the stored fatal
    /// error without evaluating anything.
    pub fn advance(&mut self) -> Result<HistoryItem> {
        match self.status() {
            Status::Idle => {
                if let Err(err) = self.structure.validate() {
                    return Err(self.go_fatal(err));
                }
            }
            Status::Running => {}
            Status::Completed => {
                return Err(FsmError::WrongFlow {
                    action: "advance",
                    status: Status::Completed.as_str(),
                })
            }
            Status::Fatal => return Err(self.stored_fatal()),
        }

        let structure = Arc::clone(&self.structure);
        let Some(current) = self.current_state().map(|s| s.name().to_string()) else {
            let err = FsmError::Runtime("active state is not part of the structure".to_string());
            return Err(self.go_fatal(err));
        };
        let Some(current_info) = structure.get(&current) else {
            let err = FsmError::Runtime(format!("state \"{current}\" vanished"));
            return Err(self.go_fatal(err));
        };

        let mut open = Vec::new();
        for transition in current_info.transitions() {
            match transition.guard().check(&self.stack) {
                Ok(is_open) => {
                    trace!(
                        run_id = %self.run_id,
                        transition = %transition.name(),
                        open = is_open,
                        "guard evaluated"
                    );
                    if is_open {
                        open.push(transition);
                    }
                }
                Err(err) => return Err(self.go_fatal(FsmError::callback("guard", err))),
            }
        }

        let transition = match open.as_slice() {
            [single] => *single,
            [] => {
                let err = FsmError::Runtime(format!(
                    "all transitions of \"{current}\" are closed"
                ));
                return Err(self.go_fatal(err));
            }
            many => {
                let names: Vec<&str> = many.iter().map(|t| t.name()).collect();
                let err = FsmError::Runtime(format!(
                    "more than one transition of \"{current}\" is open: {}",
                    names.join(", ")
                ));
                return Err(self.go_fatal(err));
            }
        };

        let Some(next) = structure.get(transition.to_state()) else {
            let err = FsmError::Runtime(format!(
                "transition \"{}\" leads to unknown state \"{}\"",
                transition.name(),
                transition.to_state()
            ));
            return Err(self.go_fatal(err));
        };
        let Some(ancestry) = structure.common_ancestor(&current, next.name()) else {
            let err = FsmError::Runtime(format!(
                "\"{current}\" and \"{}\" don't have a common parent",
                next.name()
            ));
            return Err(self.go_fatal(err));
        };
        if ancestry.descent() > 1 {
            let err = FsmError::Runtime(format!(
                "cannot descend more than one level per step: \"{current}\" -> \"{}\"",
                next.name()
            ));
            return Err(self.go_fatal(err));
        }

        // Keep the root..ancestor prefix; re-entering an ancestor closes it too.
        let keep = match ancestry.descent() {
            1 => ancestry.ancestor_depth + 1,
            _ => ancestry.ancestor_depth,
        }
        .max(1);
        while self.stack.depth() > keep {
            if let Some(closed) = self.stack.pop() {
                trace!(run_id = %self.run_id, state = %closed.state(), "scope closed");
            }
        }
        if self.stack.push(next.name()).is_none() {
            let err = FsmError::Runtime(format!(
                "pushing \"{}\" to the context stack failed",
                next.name()
            ));
            return Err(self.go_fatal(err));
        }

        let step = HistoryItem::new(&current, next.name(), transition.name());
        self.history.record(step.clone());
        debug!(
            run_id = %self.run_id,
            from = %step.from,
            to = %step.to,
            transition = %step.transition,
            "state transition"
        );

        if let Some(action) = transition.action() {
            if let Err(err) = action.run(&mut self.stack) {
                return Err(self.go_fatal(FsmError::callback("entry action", err)));
            }
        }

        if self.is_completed() {
            info!(
                run_id = %self.run_id,
                state = %step.to,
                steps = self.history.len(),
                "run completed"
            );
        }
        Ok(step)
    }

    /// Advance until the machine completes or goes fatal, then return the
    /// result.
    pub fn run(&mut self) -> Result<Value> {
        let mut steps = 0usize;
        while matches!(self.status(), Status::Idle | Status::Running) {
            if let Some(limit) = self.config.max_steps {
                if steps >= limit {
                    let err = FsmError::Runtime(format!(
                        "step limit of {limit} transitions exceeded"
                    ));
                    return Err(self.go_fatal(err));
                }
            }
            self.advance()?;
            steps += 1;
        }
        self.result()
    }

    /// The value stored under the result key of the outermost scope.
    ///
    /// Only available once the machine has completed.
    pub fn result(&self) -> Result<Value> {
        match self.status() {
            Status::Completed => {
                let global = self.stack.global().ok_or_else(|| {
                    FsmError::Runtime("context stack is empty".to_string())
                })?;
                global.context().raw(RESULT_KEY).cloned()
            }
            Status::Fatal => Err(self.stored_fatal()),
            other => Err(FsmError::WrongFlow {
                action: "get result",
                status: other.as_str(),
            }),
        }
    }

    fn stored_fatal(&self) -> FsmError {
        self.fatal
            .clone()
            .unwrap_or_else(|| FsmError::Runtime("fatal error was not recorded".to_string()))
    }

    /// Record `cause` as fatal together with a snapshot of the stack and
    /// history, and hand `cause` back.
    fn go_fatal(&mut self, cause: FsmError) -> FsmError {
        if self.fatal.is_some() {
            return cause;
        }
        error!(run_id = %self.run_id, error = %cause, "machine went fatal");
        self.fatal = Some(FsmError::Fatal {
            cause: Box::new(cause.clone()),
            stack: dump_to_string(&self.stack),
            history: dump_to_string(&self.history),
        });
        cause
    }
}

impl Dump for Fsm {
    fn dump(&self, buf: &mut String, level: usize) {
        let pad = indent(level);
        let inner = indent(level + 1);

        let _ = writeln!(buf, "{pad}finite state machine dump");
        let _ = writeln!(buf, "{pad}> states:");
        self.structure.dump(buf, level + 1);

        let _ = writeln!(buf, "{pad}> status:");
        for status in [
            Status::Idle,
            Status::Running,
            Status::Completed,
            Status::Fatal,
        ] {
            let _ = writeln!(buf, "{inner}{status}: {}", self.status() == status);
        }

        let _ = writeln!(buf, "{pad}> history:");
        self.history.dump(buf, level + 1);

        let _ = writeln!(buf, "{pad}> context stack:");
        self.stack.dump(buf, level + 1);

        let _ = writeln!(buf, "{pad}> status info");
        match self.status() {
            Status::Idle => {
                let _ = writeln!(buf, "{inner}FSM is idle");
            }
            Status::Running => {
                let _ = writeln!(
                    buf,
                    "{inner}FSM is running, {} transitions made",
                    self.history.len()
                );
            }
            Status::Fatal => {
                let _ = writeln!(buf, "{inner}FSM is fatal: {}", self.stored_fatal());
            }
            Status::Completed => match self.result() {
                Ok(value) => {
                    let _ = writeln!(buf, "{inner}FSM is completed, result is: {value}");
                }
                Err(err) => {
                    let _ = writeln!(buf, "{inner}FSM is completed, result error: {err}");
                }
            },
        }
    }
}

//! Error types shared by every layer of the engine.
//!
//! All failures are reported through [`FsmError`]. Its variants mirror the
//! error kinds of the engine: context lookups, state and structure
//! validation, declaration loading, API misuse, runtime faults, failing
//! user callbacks and the terminal fatal wrapper.

use crate::core::ValueType;
use std::sync::Arc;
use thiserror::Error;

/// Error type returned by user-supplied guards and actions.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type Result<T, E = FsmError> = std::result::Result<T, E>;

/// Discriminant of an [`FsmError`], handy for matching without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    KeyNotFound,
    InvalidType,
    StateAlreadyExists,
    StateInvalid,
    Load,
    WrongFlow,
    StructureInvalid,
    Runtime,
    CallbackFailed,
    Fatal,
}

/// Errors produced by the state machine engine.
#[derive(Debug, Clone, Error)]
pub enum FsmError {
    #[error("No such key in the context: \"{0}\"")]
    KeyNotFound(String),

    #[error("Value has a type different from requested, requested: {requested}, actual: {actual}")]
    InvalidType {
        requested: ValueType,
        actual: ValueType,
    },

    #[error("State with the name \"{0}\" is already added")]
    StateAlreadyExists(String),

    #[error("State \"{state}\" is not valid: {cause}")]
    StateInvalid { state: String, cause: String },

    #[error("Structure loading error: {0}")]
    Load(String),

    #[error("Can't {action} while FSM is {status}")]
    WrongFlow {
        action: &'static str,
        status: &'static str,
    },

    #[error("FSM structure is invalid: {0}")]
    StructureInvalid(String),

    #[error("FSM encountered runtime error: {0}")]
    Runtime(String),

    #[error("User-defined {who} returned an error: {source}")]
    CallbackFailed {
        who: &'static str,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("FSM stopped due to fatal error:\ncause:\n{cause}\n\nstack:\n{stack}\nhistory:\n{history}")]
    Fatal {
        #[source]
        cause: Box<FsmError>,
        stack: String,
        history: String,
    },
}

impl FsmError {
    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyNotFound(_) => ErrorKind::KeyNotFound,
            Self::InvalidType { .. } => ErrorKind::InvalidType,
            Self::StateAlreadyExists(_) => ErrorKind::StateAlreadyExists,
            Self::StateInvalid { .. } => ErrorKind::StateInvalid,
            Self::Load(_) => ErrorKind::Load,
            Self::WrongFlow { .. } => ErrorKind::WrongFlow,
            Self::StructureInvalid(_) => ErrorKind::StructureInvalid,
            Self::Runtime(_) => ErrorKind::Runtime,
            Self::CallbackFailed { .. } => ErrorKind::CallbackFailed,
            Self::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    /// The error that caused a fatal stop, or `self` for any other kind.
    pub fn root_cause(&self) -> &FsmError {
        match self {
            Self::Fatal { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    pub(crate) fn state_invalid(state: &str, cause: impl Into<String>) -> Self {
        Self::StateInvalid {
            state: state.to_string(),
            cause: cause.into(),
        }
    }

    pub(crate) fn callback(who: &'static str, source: CallbackError) -> Self {
        Self::CallbackFailed {
            who,
            source: Arc::from(source),
        }
    }
}

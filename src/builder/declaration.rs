//! Declarative machine description.
//!
//! These records mirror the serialized form of a machine:
//!
//! ```json
//! {
//!   "states": {
//!     "1": { "start": true, "startsub": "11" },
//!     "11": { "transitions": { "11-2": { "to": "2", "action": "finish" } } },
//!     "2": {}
//!   }
//! }
//! ```
//!
//! Any serde decoder can produce them; [`Declarations::from_json_str`] is
//! provided for the common JSON case. Converting a record into core types
//! checks guard descriptors and resolves action names.

use super::actions::ActionMap;
use crate::core::{Guard, PackagedAction, Transition, Value};
use crate::error::{FsmError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Every declared state, keyed by name. Order carries no meaning.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub states: BTreeMap<String, StateDecl>,
}

impl Declarations {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FsmError::Load(format!("malformed declarations: {e}")))
    }

    pub fn state(mut self, name: impl Into<String>, decl: StateDecl) -> Self {
        self.states.insert(name.into(), decl);
        self
    }
}

/// One declared state.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StateDecl {
    /// Marks the machine's entry point. Exactly one state may set it.
    pub start: bool,

    /// Child entered automatically. Excludes custom transitions.
    #[serde(rename = "startsub")]
    pub start_substate: Option<String>,

    /// Enclosing state; absent means a child of the root.
    pub parent: Option<String>,

    pub transitions: BTreeMap<String, TransitionDecl>,
}

impl StateDecl {
    pub fn start(mut self) -> Self {
        self.start = true;
        self
    }

    pub fn start_substate(mut self, name: impl Into<String>) -> Self {
        self.start_substate = Some(name.into());
        self
    }

    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parent = Some(name.into());
        self
    }

    pub fn transition(mut self, name: impl Into<String>, decl: TransitionDecl) -> Self {
        self.transitions.insert(name.into(), decl);
        self
    }

    /// Declared parent, with empty strings read as absent.
    pub(crate) fn parent_name(&self) -> Option<&str> {
        non_empty(self.parent.as_deref())
    }

    /// Declared start substate, with empty strings read as absent.
    pub(crate) fn start_substate_name(&self) -> Option<&str> {
        non_empty(self.start_substate.as_deref())
    }

    /// Convert the declared transitions, in name order.
    pub(crate) fn build_transitions(
        &self,
        state: &str,
        actions: &ActionMap,
    ) -> Result<Vec<Transition>> {
        self.transitions
            .iter()
            .map(|(name, decl)| decl.build(name, actions))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| prefix_load(e, &format!("state \"{state}\"")))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// One declared transition.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TransitionDecl {
    pub to: String,

    #[serde(default)]
    pub guard: GuardDecl,

    #[serde(default)]
    pub action: Option<ActionDecl>,
}

impl TransitionDecl {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            to: target.into(),
            ..Self::default()
        }
    }

    pub fn guard(mut self, guard: GuardDecl) -> Self {
        self.guard = guard;
        self
    }

    pub fn action(mut self, action: impl Into<ActionDecl>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub(crate) fn build(&self, name: &str, actions: &ActionMap) -> Result<Transition> {
        let guard = self
            .guard
            .build()
            .map_err(|e| prefix_load(e, &format!("transition \"{name}\"")))?;
        let action = match &self.action {
            Some(decl) => decl.build(actions)?,
            None => None,
        };
        Ok(Transition::new(name, self.to.as_str(), guard, action))
    }
}

/// Guard descriptor: a kind tag plus the literal it binds.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuardDecl {
    /// `"always"`, `""` or `"context"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub key: Option<String>,
    pub value: Option<serde_json::Value>,
}

impl GuardDecl {
    pub fn always() -> Self {
        Self {
            kind: "always".to_string(),
            ..Self::default()
        }
    }

    /// Open when the context value under `key` equals `value`.
    pub fn context(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            kind: "context".to_string(),
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }

    pub(crate) fn build(&self) -> Result<Guard> {
        match self.kind.as_str() {
            "" | "always" => Ok(Guard::always()),
            "context" => {
                let key = non_empty(self.key.as_deref());
                let (Some(key), Some(value)) = (key, self.value.as_ref()) else {
                    return Err(FsmError::Load(
                        "context guard needs both a key and a value".to_string(),
                    ));
                };
                let literal = Value::from(value.clone());
                if let Value::Opaque(_) = literal {
                    return Err(FsmError::Load(format!(
                        "context guard on \"{key}\" can't compare against {value}"
                    )));
                }
                Ok(Guard::context_equals(key, literal))
            }
            other => Err(FsmError::Load(format!("unknown guard type \"{other}\""))),
        }
    }
}

/// Reference to a registered action, optionally with parameters stored
/// into the destination scope before it runs.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ActionDecl {
    Name(String),
    Packaged {
        name: String,
        #[serde(default)]
        params: BTreeMap<String, serde_json::Value>,
    },
}

impl ActionDecl {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Packaged { name, .. } => name,
        }
    }

    pub fn with_params(
        name: impl Into<String>,
        params: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Self {
        Self::Packaged {
            name: name.into(),
            params: params.into_iter().collect(),
        }
    }

    /// Look the action up. An empty name declares no action.
    pub(crate) fn build(&self, actions: &ActionMap) -> Result<Option<PackagedAction>> {
        let name = self.name();
        if name.is_empty() {
            return Ok(None);
        }
        let func = actions.get(name).ok_or_else(|| {
            FsmError::Load(format!(
                "action \"{name}\" was not found in the map: [{}]",
                actions.names().join(", ")
            ))
        })?;

        let mut packaged = PackagedAction::from_shared(func.clone());
        if let Self::Packaged { params, .. } = self {
            for (key, value) in params {
                packaged = packaged.param(key.as_str(), value.clone());
            }
        }
        Ok(Some(packaged))
    }
}

impl From<&str> for ActionDecl {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ActionDecl {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

fn prefix_load(err: FsmError, scope: &str) -> FsmError {
    match err {
        FsmError::Load(cause) => FsmError::Load(format!("{scope}: {cause}")),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Context, ContextOperator};
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn guard_decodes_from_json() {
        let guard: GuardDecl =
            serde_json::from_value(json!({"type": "context", "key": "hello", "value": "world"}))
                .unwrap();
        assert_eq!(guard, GuardDecl::context("hello", "world"));
    }

    #[test]
    fn empty_and_always_guards_are_open() {
        for decl in [GuardDecl::default(), GuardDecl::always()] {
            let guard = decl.build().unwrap();
            assert!(guard.check(&Context::new()).unwrap());
        }
    }

    #[test]
    fn context_guard_compares_literal() {
        let guard = GuardDecl::context("hello", "world").build().unwrap();

        let mut ctx = Context::new();
        assert!(guard.check(&ctx).is_err());

        ctx.put("hello", "someone else".into()).unwrap();
        assert!(!guard.check(&ctx).unwrap());

        ctx.put("hello", "world".into()).unwrap();
        assert!(guard.check(&ctx).unwrap());
    }

    #[test]
    fn context_guard_widens_numbers() {
        let guard = GuardDecl::context("n", 3).build().unwrap();
        let mut ctx = Context::new();
        ctx.put("n", Value::Float(3.0)).unwrap();
        assert!(guard.check(&ctx).unwrap());
    }

    #[test]
    fn ill_formed_guards_fail_to_load() {
        let cases = [
            GuardDecl {
                kind: "invalid".into(),
                ..GuardDecl::default()
            },
            GuardDecl {
                kind: "context".into(),
                ..GuardDecl::default()
            },
            GuardDecl {
                kind: "context".into(),
                key: Some("key".into()),
                value: None,
            },
            GuardDecl::context("key", json!([1, 2])),
        ];
        for decl in cases {
            assert_eq!(decl.build().unwrap_err().kind(), ErrorKind::Load, "{decl:?}");
        }
    }

    #[test]
    fn transition_decodes_packaged_action() {
        let decl: TransitionDecl = serde_json::from_value(json!({
            "to": "2",
            "action": {"name": "hello", "params": {"what": "world"}},
            "guard": {"type": "always"}
        }))
        .unwrap();

        assert_eq!(decl.to, "2");
        assert_eq!(decl.guard.kind, "always");
        match decl.action.as_ref().unwrap() {
            ActionDecl::Packaged { name, params } => {
                assert_eq!(name, "hello");
                assert_eq!(params.get("what"), Some(&json!("world")));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn transition_decodes_bare_action_name() {
        let decl: TransitionDecl =
            serde_json::from_value(json!({"to": "2", "action": "hello"})).unwrap();
        assert_eq!(decl.action, Some(ActionDecl::from("hello")));
        assert_eq!(decl.guard, GuardDecl::default());
    }

    #[test]
    fn unknown_action_fails_to_load() {
        let decl = TransitionDecl::to("2").action("hello");
        let err = decl.build("1-2", &ActionMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);

        let actions = ActionMap::new().with("hello", |_| Ok(()));
        let transition = decl.build("1-2", &actions).unwrap();
        assert_eq!(transition.name(), "1-2");
        assert!(transition.action().is_some());
    }

    #[test]
    fn action_params_are_converted() {
        let decl = TransitionDecl::to("2").action(ActionDecl::with_params(
            "hello",
            [("what".to_string(), json!("world")), ("n".to_string(), json!(2))],
        ));
        let actions = ActionMap::new().with("hello", |_| Ok(()));

        let transition = decl.build("1-2", &actions).unwrap();
        let params = transition.action().unwrap().params();
        assert_eq!(params.get("what"), Some(&Value::from("world")));
        assert_eq!(params.get("n"), Some(&Value::Int(2)));
    }

    #[test]
    fn state_decodes_start_substate() {
        let decl: StateDecl =
            serde_json::from_value(json!({"start": true, "startsub": "11"})).unwrap();
        assert!(decl.start);
        assert_eq!(decl.start_substate_name(), Some("11"));
        assert_eq!(decl.parent_name(), None);
    }

    #[test]
    fn empty_names_read_as_absent() {
        let decl: StateDecl =
            serde_json::from_value(json!({"parent": "", "startsub": ""})).unwrap();
        assert_eq!(decl.parent_name(), None);
        assert_eq!(decl.start_substate_name(), None);
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        let err = Declarations::from_json_str("{\"states\": 3}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
    }
}

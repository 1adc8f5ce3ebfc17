//! Builder API for declarative machine construction.
//!
//! A [`Builder`] compiles an unordered set of [`Declarations`] into a
//! validated [`Structure`]:
//!
//! 1. Guard descriptors and action names are resolved against an
//!    [`ActionMap`].
//! 2. States are materialized in dependency order, with parent and start
//!    substate cycles rejected.
//! 3. The result is spliced under the root and validated as a whole.
//!
//! Every failure is reported before any [`Fsm`] exists.

mod actions;
mod declaration;
pub mod macros;
mod resolve;
mod transition;

pub use actions::ActionMap;
pub use declaration::{ActionDecl, Declarations, GuardDecl, StateDecl, TransitionDecl};
pub use transition::TransitionBuilder;

use crate::engine::{Fsm, FsmConfig};
use crate::error::Result;
use crate::structure::Structure;
use tracing::info;

/// Compiles declarations into a [`Structure`] or a ready [`Fsm`].
///
/// # Example
///
/// ```
/// use nestfsm::builder::{ActionMap, Builder, Declarations};
/// use nestfsm::core::ContextOperator;
///
/// let actions = ActionMap::new().with("finish", |ctx| {
///     ctx.put_result(42.into())?;
///     Ok(())
/// });
/// let declarations = Declarations::from_json_str(
///     r#"{
///         "states": {
///             "1": { "start": true, "startsub": "11" },
///             "11": { "transitions": { "11-2": { "to": "2", "action": "finish" } } },
///             "2": {}
///         }
///     }"#,
/// )
/// .unwrap();
///
/// let mut fsm = Builder::new(actions)
///     .declarations(declarations)
///     .into_fsm()
///     .unwrap();
/// assert_eq!(fsm.run().unwrap(), 42.into());
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    actions: ActionMap,
    declarations: Declarations,
    config: FsmConfig,
}

impl Builder {
    pub fn new(actions: ActionMap) -> Self {
        Self {
            actions,
            ..Self::default()
        }
    }

    pub fn declarations(mut self, declarations: Declarations) -> Self {
        self.declarations = declarations;
        self
    }

    /// Decode declarations from JSON text.
    pub fn from_json_str(self, json: &str) -> Result<Self> {
        Ok(self.declarations(Declarations::from_json_str(json)?))
    }

    /// Settings for machines created by [`Builder::into_fsm`].
    pub fn config(mut self, config: FsmConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve, assemble and validate the declared structure.
    pub fn build(&self) -> Result<Structure> {
        let resolved = resolve::resolve(&self.declarations, &self.actions)?;
        let start = resolved.start.name().to_string();

        let mut structure = Structure::new();
        structure.append_states(resolved.start, resolved.states)?;
        structure.validate()?;

        info!(start = %start, states = structure.len(), "structure built");
        Ok(structure)
    }

    /// Build the structure and wrap it in an idle machine.
    pub fn into_fsm(self) -> Result<Fsm> {
        let structure = self.build()?;
        Ok(Fsm::with_config(structure, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContextAccessor, ContextOperator};
    use crate::error::ErrorKind;

    fn actions() -> ActionMap {
        crate::actions! {
            "setnext" => |ctx: &mut dyn ContextOperator| {
                let next = ctx.str("next")?.to_string();
                ctx.put_parent("next", next.into())?;
                Ok(())
            },
            "finish" => |ctx: &mut dyn ContextOperator| {
                ctx.put_result(true.into())?;
                Ok(())
            },
        }
    }

    const NESTED: &str = r#"{
        "states": {
            "1": { "start": true, "startsub": "11" },
            "11": {
                "parent": "1",
                "transitions": {
                    "11-12": {
                        "to": "12",
                        "guard": { "type": "always" },
                        "action": { "name": "setnext", "params": { "next": "2" } }
                    }
                }
            },
            "12": {
                "parent": "1",
                "transitions": {
                    "12-2": {
                        "to": "2",
                        "guard": { "type": "context", "key": "next", "value": "2" },
                        "action": "finish"
                    },
                    "12-3": {
                        "to": "3",
                        "guard": { "type": "context", "key": "next", "value": "3" }
                    }
                }
            },
            "2": {},
            "3": {}
        }
    }"#;

    #[test]
    fn builds_nested_structure() {
        let structure = Builder::new(actions())
            .from_json_str(NESTED)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(structure.len(), 6);
        assert_eq!(structure.start_state().unwrap().name(), "1");
        assert_eq!(structure.get("1").unwrap().start_substate(), Some("11"));
        assert_eq!(structure.get("12").unwrap().parent(), Some("1"));
        assert_eq!(structure.get("2").unwrap().parent(), Some("global"));
    }

    #[test]
    fn built_machine_runs_to_completion() {
        let mut fsm = Builder::new(actions())
            .from_json_str(NESTED)
            .unwrap()
            .into_fsm()
            .unwrap();

        assert_eq!(fsm.run().unwrap(), true.into());
        assert_eq!(
            fsm.history().path(),
            vec!["global", "1", "11", "12", "2"]
        );
    }

    #[test]
    fn unknown_action_fails_build() {
        let err = Builder::new(ActionMap::new())
            .from_json_str(NESTED)
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
    }

    #[test]
    fn unknown_destination_fails_validation() {
        let json = r#"{
            "states": {
                "1": { "start": true, "transitions": { "1-9": { "to": "9" } } }
            }
        }"#;
        let err = Builder::new(ActionMap::new())
            .from_json_str(json)
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructureInvalid);
    }

    #[test]
    fn config_reaches_the_machine() {
        let fsm = Builder::new(actions())
            .from_json_str(NESTED)
            .unwrap()
            .config(FsmConfig::default().max_steps(3))
            .into_fsm()
            .unwrap();
        assert_eq!(fsm.config().max_steps, Some(3));
    }
}

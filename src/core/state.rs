//! State nodes of the hierarchy.

use super::dump::{indent, Dump};
use super::transition::Transition;
use crate::error::{FsmError, Result};
use std::collections::BTreeSet;
use std::fmt::Write;

/// A node of the state tree.
///
/// Hierarchy links are stored by name and resolved through the owning
/// [`Structure`](crate::Structure). A state either delegates to a single
/// start substate or owns its own transitions, never both.
#[derive(Clone, Debug)]
pub struct StateInfo {
    name: String,
    parent: Option<String>,
    start_substate: Option<String>,
    transitions: Vec<Transition>,
}

impl StateInfo {
    pub fn new(name: impl Into<String>, transitions: Vec<Transition>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            start_substate: None,
            transitions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn start_substate(&self) -> Option<&str> {
        self.start_substate.as_deref()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// A state without outgoing transitions ends a run.
    pub fn is_final(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Link `child` under this state.
    ///
    /// A child is adopted at most once. Adopting it as the start substate
    /// requires this state to have neither a start substate nor custom
    /// transitions, and replaces the transition list with a single
    /// unconditional transition into the child.
    pub fn add_sub_state(&mut self, child: &mut StateInfo, is_start: bool) -> Result<()> {
        if let Some(parent) = &child.parent {
            return Err(FsmError::state_invalid(
                &child.name,
                format!("sub state already has a parent \"{parent}\""),
            ));
        }
        if is_start {
            if let Some(current) = &self.start_substate {
                return Err(FsmError::state_invalid(
                    &self.name,
                    format!("parent state already has start sub state \"{current}\""),
                ));
            }
            if !self.transitions.is_empty() {
                return Err(FsmError::state_invalid(
                    &self.name,
                    "start sub state can't be added to a parent with transitions",
                ));
            }
        }

        child.parent = Some(self.name.clone());
        if is_start {
            self.start_substate = Some(child.name.clone());
            let name = format!("Always {}->{}", self.name, child.name);
            self.transitions = Transition::always(name, child.name.clone(), None);
        }
        Ok(())
    }

    /// Check the state on its own: naming, transitions, and consistency
    /// between the start substate and the transition list.
    ///
    /// Parent chain checks need the whole table and live in
    /// [`Structure::validate_state`](crate::Structure::validate_state).
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(FsmError::state_invalid("", "state should be named"));
        }
        if let Some(sub) = &self.start_substate {
            let delegates = matches!(
                self.transitions.as_slice(),
                [only] if only.to_state() == sub
            );
            if !delegates {
                return Err(FsmError::state_invalid(
                    &self.name,
                    "state with a start sub state can't have custom transitions",
                ));
            }
        }
        let mut names = BTreeSet::new();
        for transition in &self.transitions {
            transition.validate(&self.name)?;
            if !names.insert(transition.name()) {
                return Err(FsmError::state_invalid(
                    &self.name,
                    format!("duplicate transition \"{}\"", transition.name()),
                ));
            }
        }
        Ok(())
    }
}

impl Dump for StateInfo {
    fn dump(&self, buf: &mut String, level: usize) {
        let pad = indent(level);
        let _ = write!(buf, "{pad}> name: \"{}\", parent: ", self.name);
        match &self.parent {
            Some(parent) => {
                let _ = write!(buf, "\"{parent}\"");
            }
            None => buf.push_str("none"),
        }
        if let Some(sub) = &self.start_substate {
            let _ = write!(buf, ", start substate: \"{sub}\"");
        }
        let _ = writeln!(buf, "\n{pad}transitions:");

        let inner = indent(level + 1);
        if self.transitions.is_empty() {
            let _ = writeln!(buf, "{inner}no transitions");
        }
        for transition in &self.transitions {
            buf.push_str(&inner);
            transition.dump(buf, level + 1);
            buf.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Guard;
    use crate::error::ErrorKind;

    #[test]
    fn adopting_sets_parent_once() {
        let mut parent = StateInfo::new("p", vec![]);
        let mut other = StateInfo::new("o", vec![]);
        let mut child = StateInfo::new("c", vec![]);

        parent.add_sub_state(&mut child, false).unwrap();
        assert_eq!(child.parent(), Some("p"));

        let err = other.add_sub_state(&mut child, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateInvalid);
        assert_eq!(child.parent(), Some("p"));
    }

    #[test]
    fn start_sub_state_synthesizes_transition() {
        let mut parent = StateInfo::new("p", vec![]);
        let mut child = StateInfo::new("c", vec![]);

        parent.add_sub_state(&mut child, true).unwrap();

        assert_eq!(parent.start_substate(), Some("c"));
        assert_eq!(parent.transitions().len(), 1);
        assert_eq!(parent.transitions()[0].name(), "Always p->c");
        assert_eq!(parent.transitions()[0].to_state(), "c");
        assert!(parent.validate().is_ok());
    }

    #[test]
    fn second_start_sub_state_is_rejected() {
        let mut parent = StateInfo::new("p", vec![]);
        let mut first = StateInfo::new("a", vec![]);
        let mut second = StateInfo::new("b", vec![]);

        parent.add_sub_state(&mut first, true).unwrap();
        assert!(parent.add_sub_state(&mut second, true).is_err());
        assert!(second.parent().is_none());
    }

    #[test]
    fn start_sub_state_needs_transition_free_parent() {
        let mut parent = StateInfo::new("p", Transition::always("p-x", "x", None));
        let mut child = StateInfo::new("c", vec![]);

        assert!(parent.add_sub_state(&mut child, true).is_err());
        assert!(parent.add_sub_state(&mut child, false).is_ok());
    }

    #[test]
    fn validate_rejects_unnamed_state() {
        let err = StateInfo::new("", vec![]).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateInvalid);
    }

    #[test]
    fn validate_checks_transitions() {
        let state = StateInfo::new("a", Transition::always("", "b", None));
        assert!(state.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_transition_names() {
        let state = StateInfo::new(
            "1",
            vec![
                Transition::new("dup", "2", Guard::always(), None),
                Transition::new("dup", "3", Guard::new(|_| Ok(false)), None),
            ],
        );

        let err = state.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateInvalid);
        assert!(err.to_string().contains("duplicate transition \"dup\""));
    }

    #[test]
    fn final_means_no_transitions() {
        assert!(StateInfo::new("end", vec![]).is_final());
        assert!(!StateInfo::new("a", Transition::always("a-b", "b", None)).is_final());
    }
}

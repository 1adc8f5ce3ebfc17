//! Registry of all states of a machine.
//!
//! A [`Structure`] owns every [`StateInfo`] by name, including the
//! synthetic root state named [`GLOBAL_STATE_NAME`]. The real entry point
//! of the machine is the root's start substate.

use crate::core::{indent, Dump, StateInfo};
use crate::error::{FsmError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Name of the synthetic root state.
pub const GLOBAL_STATE_NAME: &str = "global";

/// Nearest shared node of two states and their relative depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonAncestor<'a> {
    pub ancestor: &'a str,
    pub ancestor_depth: usize,
    pub lhs_depth: usize,
    pub rhs_depth: usize,
}

impl CommonAncestor<'_> {
    /// `depth(lhs) - depth(rhs)`: `-1` is one level down into a child, `0`
    /// means siblings, a positive value is the number of levels to ascend.
    pub fn depth_diff(&self) -> isize {
        self.lhs_depth as isize - self.rhs_depth as isize
    }

    /// Number of levels between the ancestor and `rhs`.
    pub fn descent(&self) -> usize {
        self.rhs_depth - self.ancestor_depth
    }
}

/// Static description of a machine: states, hierarchy and transitions.
#[derive(Clone, Debug)]
pub struct Structure {
    states: BTreeMap<String, StateInfo>,
}

impl Default for Structure {
    fn default() -> Self {
        Self::new()
    }
}

impl Structure {
    /// An empty structure holding only the root state.
    pub fn new() -> Self {
        let mut states = BTreeMap::new();
        states.insert(
            GLOBAL_STATE_NAME.to_string(),
            StateInfo::new(GLOBAL_STATE_NAME, Vec::new()),
        );
        Self { states }
    }

    /// A flat structure: `start` becomes the entry point and every other
    /// state a plain child of the root.
    pub fn new_with(start: StateInfo, states: impl IntoIterator<Item = StateInfo>) -> Result<Self> {
        let mut structure = Self::new();
        structure.add_states(None, Some(start), states)?;
        Ok(structure)
    }

    /// Add the start substate of `parent`, or the entry point when `parent`
    /// is `None`.
    pub fn add_start_state(&mut self, state: StateInfo, parent: Option<&str>) -> Result<()> {
        self.add_state_impl(state, parent, true)
    }

    /// Add a plain substate of `parent`, or of the root when `parent` is
    /// `None`.
    pub fn add_state(&mut self, state: StateInfo, parent: Option<&str>) -> Result<()> {
        self.add_state_impl(state, parent, false)
    }

    /// Add an optional start substate followed by plain substates, all
    /// under the same parent. Stops at the first failure.
    pub fn add_states(
        &mut self,
        parent: Option<&str>,
        start: Option<StateInfo>,
        states: impl IntoIterator<Item = StateInfo>,
    ) -> Result<()> {
        if let Some(start) = start {
            self.add_start_state(start, parent)?;
        }
        for state in states {
            self.add_state(state, parent)?;
        }
        Ok(())
    }

    fn add_state_impl(
        &mut self,
        mut state: StateInfo,
        parent: Option<&str>,
        is_start: bool,
    ) -> Result<()> {
        state.validate()?;
        if self.states.contains_key(state.name()) {
            return Err(FsmError::StateAlreadyExists(state.name().to_string()));
        }

        let parent_name = parent.unwrap_or(GLOBAL_STATE_NAME);
        let parent = self.states.get_mut(parent_name).ok_or_else(|| {
            FsmError::StructureInvalid(format!(
                "parent state \"{parent_name}\" was not found (forgot to add?)"
            ))
        })?;
        parent.add_sub_state(&mut state, is_start)?;

        self.states.insert(state.name().to_string(), state);
        Ok(())
    }

    /// Splice an externally built hierarchy in: `start` becomes the entry
    /// point, parentless states become children of the root. Hierarchy
    /// links already set inside `states` are kept as they are.
    pub(crate) fn append_states(
        &mut self,
        start: StateInfo,
        states: BTreeMap<String, StateInfo>,
    ) -> Result<()> {
        self.root_mut()?;
        self.add_start_state(start, None)?;

        for (name, mut state) in states {
            if self.states.contains_key(&name) {
                return Err(FsmError::StateAlreadyExists(name));
            }
            if state.parent().is_none() {
                self.root_mut()?.add_sub_state(&mut state, false)?;
            }
            self.states.insert(name, state);
        }
        Ok(())
    }

    fn root_mut(&mut self) -> Result<&mut StateInfo> {
        self.states.get_mut(GLOBAL_STATE_NAME).ok_or_else(|| {
            FsmError::StructureInvalid(format!(
                "root state \"{GLOBAL_STATE_NAME}\" was not found"
            ))
        })
    }

    pub fn get(&self, name: &str) -> Option<&StateInfo> {
        self.states.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// The synthetic root state.
    pub fn root(&self) -> Option<&StateInfo> {
        self.states.get(GLOBAL_STATE_NAME)
    }

    /// The machine's entry point.
    pub fn start_state(&self) -> Option<&StateInfo> {
        self.root()
            .and_then(StateInfo::start_substate)
            .and_then(|name| self.states.get(name))
    }

    /// All states, root included, ordered by name.
    pub fn states(&self) -> impl Iterator<Item = &StateInfo> {
        self.states.values()
    }

    /// Number of states, root included.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when nothing but the root is defined.
    pub fn is_empty(&self) -> bool {
        self.states.len() <= 1
    }

    /// Path from the root down to `name`, both ends included.
    ///
    /// `None` for unknown names, dangling parents and cyclic chains.
    pub fn lineage(&self, name: &str) -> Option<Vec<&str>> {
        let mut path = Vec::new();
        let mut current = Some(self.states.get(name)?);
        while let Some(state) = current {
            if path.len() >= self.states.len() {
                return None;
            }
            path.push(state.name());
            current = match state.parent() {
                Some(parent) => Some(self.states.get(parent)?),
                None => None,
            };
        }
        path.reverse();
        Some(path)
    }

    /// Depth of `name` below its tree's root.
    pub fn depth(&self, name: &str) -> Option<usize> {
        self.lineage(name).map(|path| path.len() - 1)
    }

    /// Find the nearest node shared by the root paths of two states.
    ///
    /// `None` when either state is unknown or the two live in disjoint
    /// trees.
    pub fn common_ancestor(&self, lhs: &str, rhs: &str) -> Option<CommonAncestor<'_>> {
        let lhs_path = self.lineage(lhs)?;
        let rhs_path = self.lineage(rhs)?;

        let shared = lhs_path
            .iter()
            .zip(rhs_path.iter())
            .take_while(|(l, r)| l == r)
            .count();
        let ancestor = *lhs_path.get(shared.checked_sub(1)?)?;

        Some(CommonAncestor {
            ancestor,
            ancestor_depth: shared - 1,
            lhs_depth: lhs_path.len() - 1,
            rhs_depth: rhs_path.len() - 1,
        })
    }

    /// Check a single state in the context of this structure, including its
    /// parent chain.
    pub fn validate_state(&self, state: &StateInfo) -> Result<()> {
        state.validate()?;

        let mut visited = BTreeSet::new();
        let mut current = Some(state);
        while let Some(node) = current {
            if !visited.insert(node.name()) {
                return Err(FsmError::state_invalid(
                    state.name(),
                    "state hierarchy is cycled",
                ));
            }
            current = match node.parent() {
                Some(parent) => Some(self.states.get(parent).ok_or_else(|| {
                    FsmError::StructureInvalid(format!(
                        "state \"{}\" has unknown parent \"{parent}\"",
                        node.name()
                    ))
                })?),
                None => None,
            };
        }
        Ok(())
    }

    /// Check global consistency:
    /// - every state is well-formed,
    /// - every transition targets a known state,
    /// - source and target of every transition share an ancestor,
    /// - every state but the root is reachable.
    pub fn validate(&self) -> Result<()> {
        let mut referenced = BTreeSet::from([GLOBAL_STATE_NAME]);

        for state in self.states.values() {
            self.validate_state(state)?;
            if let Some(sub) = state.start_substate() {
                referenced.insert(sub);
            }
            for transition in state.transitions() {
                let target = transition.to_state();
                if !self.states.contains_key(target) {
                    return Err(FsmError::StructureInvalid(format!(
                        "transition \"{}\" of state \"{}\" has unknown destination \"{target}\"",
                        transition.name(),
                        state.name()
                    )));
                }
                if self.common_ancestor(state.name(), target).is_none() {
                    return Err(FsmError::StructureInvalid(format!(
                        "\"{}\" and \"{target}\" don't have a common parent",
                        state.name()
                    )));
                }
                // A self-loop doesn't make a state reachable.
                if target != state.name() {
                    referenced.insert(target);
                }
            }
        }

        let isolated: Vec<String> = self
            .states
            .keys()
            .filter(|name| !referenced.contains(name.as_str()))
            .map(|name| format!("\"{name}\""))
            .collect();
        if !isolated.is_empty() {
            return Err(FsmError::StructureInvalid(format!(
                "there are isolated states: {}",
                isolated.join(", ")
            )));
        }
        Ok(())
    }
}

impl Dump for Structure {
    fn dump(&self, buf: &mut String, level: usize) {
        if self.is_empty() {
            let _ = writeln!(buf, "{}no states", indent(level));
            return;
        }
        for state in self.states.values() {
            state.dump(buf, level);
        }
    }
}

//! Dependency resolution for declared states.
//!
//! A state can only be adopted once its parent exists, but declarations
//! arrive in no particular order. Each state depends on its declared parent
//! and on the state claiming it as start substate; states are materialized
//! in post-order of an iterative depth-first walk over those edges.

use super::actions::ActionMap;
use super::declaration::Declarations;
use crate::core::StateInfo;
use crate::error::{FsmError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Materialized states, ready to be spliced into a structure.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub start: StateInfo,
    pub states: BTreeMap<String, StateInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Hierarchy links derived from the declarations.
struct Links<'a> {
    /// Effective parent of each state.
    parent: BTreeMap<&'a str, &'a str>,
    /// Start substate claims: substate -> declaring state.
    claimed_by: BTreeMap<&'a str, &'a str>,
    /// Dependencies of each state, deduplicated.
    deps: BTreeMap<&'a str, Vec<&'a str>>,
}

pub(crate) fn resolve(decls: &Declarations, actions: &ActionMap) -> Result<Resolved> {
    let links = link(decls)?;
    let order = materialization_order(&links.deps)?;

    let mut built: BTreeMap<String, StateInfo> = BTreeMap::new();
    let mut start: Option<&str> = None;

    for name in order {
        let Some(decl) = decls.states.get(name) else {
            continue;
        };
        let transitions = match decl.start_substate_name() {
            Some(_) => Vec::new(),
            None => decl.build_transitions(name, actions)?,
        };
        let mut state = StateInfo::new(name, transitions);

        if let Some(&parent) = links.parent.get(name) {
            let is_start = links.claimed_by.get(name) == Some(&parent);
            let parent_info = built.get_mut(parent).ok_or_else(|| {
                FsmError::Load(format!(
                    "parent \"{parent}\" expected before child \"{name}\""
                ))
            })?;
            parent_info.add_sub_state(&mut state, is_start)?;
        }
        debug!(state = %name, parent = ?state.parent(), "state materialized");

        if decl.start {
            if let Some(first) = start {
                return Err(FsmError::Load(format!(
                    "more than one start state declared: \"{first}\", \"{name}\""
                )));
            }
            start = Some(name);
        }
        built.insert(name.to_string(), state);
    }

    let start = start
        .and_then(|name| built.remove(name))
        .ok_or_else(|| FsmError::Load("no start state declared".to_string()))?;
    Ok(Resolved {
        start,
        states: built,
    })
}

fn link(decls: &Declarations) -> Result<Links<'_>> {
    let mut claimed_by = BTreeMap::new();
    for (name, decl) in &decls.states {
        let Some(sub) = decl.start_substate_name() else {
            continue;
        };
        if !decl.transitions.is_empty() {
            return Err(FsmError::state_invalid(
                name,
                "state with a start sub state can't have custom transitions",
            ));
        }
        let Some((sub, _)) = decls.states.get_key_value(sub) else {
            return Err(FsmError::Load(format!(
                "start sub state \"{sub}\" of \"{name}\" is not declared"
            )));
        };
        if let Some(other) = claimed_by.insert(sub.as_str(), name.as_str()) {
            return Err(FsmError::Load(format!(
                "\"{sub}\" is claimed as start sub state by both \"{other}\" and \"{name}\""
            )));
        }
    }

    let mut parent = BTreeMap::new();
    let mut deps = BTreeMap::new();
    for (name, decl) in &decls.states {
        let declared = match decl.parent_name() {
            Some(p) => match decls.states.get_key_value(p) {
                Some((p, _)) => Some(p.as_str()),
                None => {
                    return Err(FsmError::Load(format!(
                        "parent \"{p}\" of \"{name}\" is not declared"
                    )))
                }
            },
            None => None,
        };
        let claimer = claimed_by.get(name.as_str()).copied();
        if let (Some(declared), Some(claimer)) = (declared, claimer) {
            if declared != claimer {
                return Err(FsmError::Load(format!(
                    "\"{name}\" is a start sub state of \"{claimer}\" but declares parent \"{declared}\""
                )));
            }
        }

        let effective = declared.or(claimer);
        if decl.start && effective.is_some() {
            return Err(FsmError::Load(format!(
                "start state \"{name}\" can't have a parent"
            )));
        }
        if let Some(p) = effective {
            parent.insert(name.as_str(), p);
        }

        let mut edges: Vec<&str> = declared.into_iter().chain(claimer).collect();
        edges.dedup();
        deps.insert(name.as_str(), edges);
    }

    Ok(Links {
        parent,
        claimed_by,
        deps,
    })
}

/// Post-order of an iterative three-color depth-first walk: every state
/// comes after all of its dependencies. Meeting a state that is still on
/// the walk path is a cycle.
fn materialization_order<'a>(deps: &BTreeMap<&'a str, Vec<&'a str>>) -> Result<Vec<&'a str>> {
    let mut marks: BTreeMap<&str, Mark> = deps.keys().map(|&n| (n, Mark::Unvisited)).collect();
    let mut order = Vec::with_capacity(deps.len());

    for &root in deps.keys() {
        if marks.get(root) != Some(&Mark::Unvisited) {
            continue;
        }
        marks.insert(root, Mark::Visiting);
        let mut frames: Vec<(&str, usize)> = vec![(root, 0)];

        while let Some((node, cursor)) = frames.last_mut() {
            let next = deps.get(*node).and_then(|edges| edges.get(*cursor)).copied();
            let Some(dep) = next else {
                let done = *node;
                frames.pop();
                marks.insert(done, Mark::Visited);
                order.push(done);
                continue;
            };
            *cursor += 1;

            match marks.get(dep).copied().unwrap_or(Mark::Visited) {
                Mark::Visited => {}
                Mark::Visiting => {
                    let from = frames.iter().position(|(n, _)| *n == dep).unwrap_or(0);
                    let mut path: Vec<&str> = frames[from..].iter().map(|(n, _)| *n).collect();
                    path.push(dep);
                    return Err(FsmError::Load(format!(
                        "dependency cycle between states: {}",
                        path.join(" -> ")
                    )));
                }
                Mark::Unvisited => {
                    marks.insert(dep, Mark::Visiting);
                    frames.push((dep, 0));
                }
            }
        }
    }
    Ok(order)
}

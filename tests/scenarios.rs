//! End-to-end runs of hand-assembled and declared machines.

use nestfsm::builder::{ActionDecl, GuardDecl, StateDecl, TransitionBuilder, TransitionDecl};
use nestfsm::core::{ContextAccessor, ContextOperator, Guard, PackagedAction, StateInfo, Transition};
use nestfsm::{actions, ActionMap, Builder, Declarations, ErrorKind, Fsm, FsmError, Status, Structure};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn store_true() -> PackagedAction {
    PackagedAction::new(|ctx| {
        ctx.put_result(true.into())?;
        Ok(())
    })
}

#[test]
fn unconditional_transition_produces_result() {
    let structure = Structure::new_with(
        StateInfo::new("1", Transition::always("1-2", "2", Some(store_true()))),
        [StateInfo::new("2", vec![])],
    )
    .unwrap();

    let mut fsm = Fsm::new(structure);
    assert_eq!(fsm.run().unwrap(), true.into());
    assert_eq!(fsm.status(), Status::Completed);
}

#[test]
fn closed_branch_action_never_runs() {
    let side_effects = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&side_effects);
    let side_effect = PackagedAction::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let structure = Structure::new_with(
        StateInfo::new(
            "1",
            vec![
                Transition::new("open", "do-nothing", Guard::always(), Some(store_true())),
                Transition::new(
                    "closed",
                    "elsewhere",
                    Guard::new(|_| Ok(false)),
                    Some(side_effect),
                ),
            ],
        ),
        [
            StateInfo::new("do-nothing", vec![]),
            StateInfo::new("elsewhere", vec![]),
        ],
    )
    .unwrap();

    let mut fsm = Fsm::new(structure);
    assert_eq!(fsm.run().unwrap(), true.into());
    assert_eq!(fsm.current_state().unwrap().name(), "do-nothing");
    assert_eq!(side_effects.load(Ordering::SeqCst), 0);
}

#[test]
fn parent_cycle_fails_before_any_machine_exists() {
    let json = r#"{
        "states": {
            "0": { "parent": "3" },
            "1": { "parent": "0" },
            "2": { "parent": "1" },
            "3": { "parent": "2" }
        }
    }"#;
    let err = Builder::new(ActionMap::new())
        .from_json_str(json)
        .unwrap()
        .into_fsm()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Load);
}

#[test]
fn two_entry_points_fail_to_build() {
    let declarations = Declarations::default()
        .state("1", StateDecl::default().start())
        .state("2", StateDecl::default().start());

    let err = Builder::new(ActionMap::new())
        .declarations(declarations)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Load);
}

#[test]
fn guard_error_is_sticky_fatal() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evaluations);
    let broken = Guard::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err("sensor offline".into())
    });

    let structure = Structure::new_with(
        StateInfo::new("1", vec![Transition::new("1-2", "2", broken, None)]),
        [StateInfo::new("2", vec![])],
    )
    .unwrap();
    let mut fsm = Fsm::new(structure);
    fsm.advance().unwrap();

    let first = fsm.advance().unwrap_err();
    assert_eq!(first.kind(), ErrorKind::CallbackFailed);
    assert!(fsm.is_fatal());
    assert_eq!(evaluations.load(Ordering::SeqCst), 1);

    let stored = fsm.fatal_error().unwrap().to_string();
    for _ in 0..3 {
        let again = fsm.advance().unwrap_err();
        assert_eq!(again.kind(), ErrorKind::Fatal);
        assert_eq!(again.to_string(), stored);
        assert_eq!(again.root_cause().kind(), ErrorKind::CallbackFailed);
    }
    assert_eq!(evaluations.load(Ordering::SeqCst), 1);
    assert_eq!(fsm.result().unwrap_err().kind(), ErrorKind::Fatal);
    assert_eq!(fsm.run().unwrap_err().kind(), ErrorKind::Fatal);
}

#[test]
fn callback_error_source_is_preserved() {
    #[derive(Debug, thiserror::Error)]
    #[error("quota exceeded")]
    struct Quota;

    let structure = Structure::new_with(
        StateInfo::new(
            "1",
            Transition::always("1-2", "2", Some(PackagedAction::new(|_| Err(Quota.into())))),
        ),
        [StateInfo::new("2", vec![])],
    )
    .unwrap();
    let mut fsm = Fsm::new(structure);

    let err = fsm.run().unwrap_err();
    match &err {
        FsmError::CallbackFailed { who, source } => {
            assert_eq!(*who, "entry action");
            assert!(source.downcast_ref::<Quota>().is_some());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

/// global > "1" (start, startsub "11") > "11" -> "12" -> "2" | "3"
fn nested_declarations() -> Declarations {
    Declarations::default()
        .state("1", StateDecl::default().start().start_substate("11"))
        .state(
            "11",
            StateDecl::default().parent("1").transition(
                "11-12",
                TransitionDecl::to("12").action(ActionDecl::with_params(
                    "choose",
                    [("next".to_string(), serde_json::json!(2))],
                )),
            ),
        )
        .state(
            "12",
            StateDecl::default()
                .parent("1")
                .transition(
                    "12-2",
                    TransitionDecl::to("2")
                        .guard(GuardDecl::context("next", 2))
                        .action("finish"),
                )
                .transition(
                    "12-3",
                    TransitionDecl::to("3").guard(GuardDecl::context("next", 3)),
                ),
        )
        .state("2", StateDecl::default())
        .state("3", StateDecl::default())
}

fn nested_actions() -> ActionMap {
    actions! {
        "choose" => |ctx: &mut dyn ContextOperator| {
            let next = ctx.int("next")?;
            ctx.put_parent("chosen", next.into())?;
            Ok(())
        },
        "finish" => |ctx: &mut dyn ContextOperator| {
            ctx.put_result("reached 2".into())?;
            Ok(())
        },
    }
}

fn nested_by_hand() -> Structure {
    let choose = PackagedAction::new(|ctx| {
        let next = ctx.int("next")?;
        ctx.put_parent("chosen", next.into())?;
        Ok(())
    })
    .param("next", 2);
    let finish = PackagedAction::new(|ctx| {
        ctx.put_result("reached 2".into())?;
        Ok(())
    });

    let mut structure = Structure::new();
    structure
        .add_start_state(StateInfo::new("1", vec![]), None)
        .unwrap();
    structure
        .add_start_state(
            StateInfo::new(
                "11",
                vec![TransitionBuilder::new()
                    .from("11")
                    .to("12")
                    .action(choose)
                    .build()
                    .unwrap()],
            ),
            Some("1"),
        )
        .unwrap();
    structure
        .add_state(
            StateInfo::new(
                "12",
                vec![
                    TransitionBuilder::new()
                        .from("12")
                        .to("2")
                        .when_context("next", 2)
                        .action(finish)
                        .build()
                        .unwrap(),
                    TransitionBuilder::new()
                        .from("12")
                        .to("3")
                        .when_context("next", 3)
                        .build()
                        .unwrap(),
                ],
            ),
            Some("1"),
        )
        .unwrap();
    structure
        .add_states(
            None,
            None,
            [StateInfo::new("2", vec![]), StateInfo::new("3", vec![])],
        )
        .unwrap();
    structure
}

#[test]
fn declared_and_hand_assembled_machines_agree() {
    let declared = Builder::new(nested_actions())
        .declarations(nested_declarations())
        .build()
        .unwrap();
    let by_hand = nested_by_hand();
    by_hand.validate().unwrap();

    let mut names_declared: Vec<&str> = declared.states().map(|s| s.name()).collect();
    let mut names_by_hand: Vec<&str> = by_hand.states().map(|s| s.name()).collect();
    names_declared.sort_unstable();
    names_by_hand.sort_unstable();
    assert_eq!(names_declared, names_by_hand);
    for state in by_hand.states() {
        let twin = declared.get(state.name()).unwrap();
        assert_eq!(twin.parent(), state.parent(), "{}", state.name());
        assert_eq!(twin.start_substate(), state.start_substate(), "{}", state.name());
    }

    let mut declared_fsm = Fsm::new(declared);
    let mut by_hand_fsm = Fsm::new(by_hand);
    let declared_result = declared_fsm.run().unwrap();
    assert_eq!(declared_result, by_hand_fsm.run().unwrap());
    assert_eq!(declared_result, "reached 2".into());
    assert_eq!(declared_fsm.history().path(), by_hand_fsm.history().path());
}

#[test]
fn scopes_follow_the_active_path() {
    let mut fsm = Fsm::new(nested_by_hand());

    fsm.advance().unwrap();
    fsm.advance().unwrap();
    assert_eq!(
        fsm.stack().states().collect::<Vec<_>>(),
        vec!["global", "1", "11"]
    );

    fsm.advance().unwrap();
    assert_eq!(
        fsm.stack().states().collect::<Vec<_>>(),
        vec!["global", "1", "12"]
    );
    assert_eq!(fsm.stack().by_state("1").unwrap().context().int("chosen").unwrap(), 2);
    assert_eq!(fsm.stack().int("chosen").unwrap(), 2);

    fsm.advance().unwrap();
    assert_eq!(fsm.stack().states().collect::<Vec<_>>(), vec!["global", "2"]);
    assert!(!fsm.stack().has("chosen"));
    assert!(fsm.is_completed());
}

#[test]
fn reset_allows_a_second_run() {
    let mut fsm = Fsm::new(nested_by_hand());
    let first = fsm.run().unwrap();

    fsm.reset();
    assert_eq!(fsm.status(), Status::Idle);
    assert!(fsm.history().is_empty());

    assert_eq!(fsm.run().unwrap(), first);
}

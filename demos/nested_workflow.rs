//! Nested Workflow
//!
//! This example loads a hierarchical order workflow from JSON and runs it
//! to completion.
//!
//! Key concepts:
//! - Declaring states, parents and start substates in JSON
//! - Registering named actions with the `actions!` macro
//! - Context guards choosing between branches
//! - Scopes opening and closing as the machine moves through the tree
//!
//! Run with: cargo run --example nested_workflow

use nestfsm::core::{dump_to_string, ContextAccessor, ContextOperator};
use nestfsm::{actions, Builder, FsmConfig};

const WORKFLOW: &str = r#"{
    "states": {
        "order": { "start": true, "startsub": "validate" },
        "validate": {
            "parent": "order",
            "transitions": {
                "validate-charge": {
                    "to": "charge",
                    "action": { "name": "check_stock", "params": { "items": 3 } }
                }
            }
        },
        "charge": {
            "parent": "order",
            "transitions": {
                "charge-shipped": {
                    "to": "shipped",
                    "guard": { "type": "context", "key": "in_stock", "value": true },
                    "action": "ship"
                },
                "charge-backordered": {
                    "to": "backordered",
                    "guard": { "type": "context", "key": "in_stock", "value": false }
                }
            }
        },
        "shipped": {},
        "backordered": {}
    }
}"#;

fn main() -> nestfsm::Result<()> {
    println!("=== Nested Workflow Example ===\n");

    let actions = actions! {
        "check_stock" => |ctx: &mut dyn ContextOperator| {
            let items = ctx.int("items")?;
            println!("Checking stock for {items} items");
            ctx.put("in_stock", (items <= 5).into())?;
            Ok(())
        },
        "ship" => |ctx: &mut dyn ContextOperator| {
            println!("Shipping order");
            ctx.put_result("shipped".into())?;
            Ok(())
        },
    };

    let mut fsm = Builder::new(actions)
        .from_json_str(WORKFLOW)?
        .config(FsmConfig::default().max_steps(20))
        .into_fsm()?;

    println!("Initial status: {}", fsm.status());
    while !fsm.is_completed() {
        let step = fsm.advance()?;
        let scopes: Vec<&str> = fsm.stack().states().collect();
        println!("{} -> {} via {:?}, scopes: {:?}", step.from, step.to, step.transition, scopes);
    }

    println!("\nResult: {}", fsm.result()?);
    println!("Path: {:?}", fsm.history().path());
    println!("\nFinal dump:\n{}", dump_to_string(&fsm));

    println!("\n=== Example Complete ===");
    Ok(())
}

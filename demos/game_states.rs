//! Game States
//!
//! This example gates menu/play/pause transitions through a guard.
//!
//! Key concepts:
//! - The guard initializes once, before the first state is entered
//! - Rejected transitions leave the current state untouched
//! - Every committed transition is recorded in the history
//!
//! Run with: cargo run --example game_states

use stepwise::core::{FnGuard, FnState, StateMap};
use stepwise::machine::StateMachine;
use tracing_subscriber::EnvFilter;

fn state(name: &'static str) -> FnState {
    FnState::new(name)
        .on_enter(move || {
            println!("  -> entering {name}");
            Ok(())
        })
        .on_exit(move || {
            println!("  <- leaving {name}");
            Ok(())
        })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Game States Example ===\n");

    let guard = FnGuard::new(|from, to| {
        // A paused game must resume before returning to the menu.
        Ok(!(from.name() == "pause" && to.name() == "menu"))
    })
    .on_init(|| {
        println!("  loading save data");
        Ok(())
    });

    let states = StateMap::new()
        .with(state("menu"))
        .with(state("play"))
        .with(state("pause"));
    let machine = StateMachine::new(guard, states);

    machine.start("menu").expect("menu exists");
    for target in ["play", "pause", "menu", "play", "menu"] {
        match machine.change_state(target) {
            Ok(()) => println!("Now in {target}"),
            Err(err) => println!("Refused: {err}"),
        }
    }

    println!("\nPath: {:?}", machine.history().get_path());
    println!("\n=== Example Complete ===");
}

//! Mission Walkthrough
//!
//! This example drives a three-step mission with a sequencer.
//!
//! Key concepts:
//! - Steps run one at a time, in order
//! - A step can advance or redirect its own sequencer
//! - Requests are queued, never blocking the caller
//!
//! Run with: RUST_LOG=debug cargo run --example mission_walkthrough

use std::time::Duration;
use stepwise::core::FnStep;
use stepwise::sequencer::SequencerBuilder;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Mission Walkthrough Example ===\n");

    let sequencer = SequencerBuilder::new()
        .tag("mission-7")
        .step(FnStep::new("briefing", |seq, tags| {
            println!("  briefing for {tags:?}");
            seq.advance();
            Ok(())
        }))
        .step(FnStep::new("patrol", |seq, _| {
            println!("  patrolling... contact! skipping ahead");
            seq.jump("extract");
            Ok(())
        }))
        .step(FnStep::new("resupply", |_, _| {
            println!("  resupply (never reached)");
            Ok(())
        }))
        .step(FnStep::new("extract", |seq, _| {
            println!("  extracting");
            seq.advance();
            Ok(())
        }))
        .build()
        .expect("mission steps are valid");

    sequencer.start().expect("worker thread should spawn");

    if sequencer.wait_until_finished(Duration::from_secs(5)) {
        println!("\nMission complete, last step: {:?}", sequencer.current_step());
    } else {
        println!("\nMission still running on {:?}", sequencer.current_step());
    }

    println!("\n=== Example Complete ===");
}

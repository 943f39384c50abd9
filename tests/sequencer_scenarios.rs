//! End-to-end scenarios for the step sequencer.

mod common;

use common::{entries, eventually, init_tracing, journal, recording_step, TIMEOUT};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;
use stepwise::core::{FnStep, Step};
use stepwise::sequencer::{Phase, Sequencer, SequencerBuilder, SequencerError};

#[test]
fn advance_jump_advance_runs_to_completion() {
    init_tracing();
    let log = journal();
    let sequencer = SequencerBuilder::new()
        .step(recording_step("A", &log))
        .step(recording_step("B", &log))
        .step(recording_step("C", &log))
        .build()
        .unwrap();

    sequencer.start().unwrap();
    assert_eq!(sequencer.current_step().as_deref(), Some("A"));

    sequencer.advance();
    assert!(eventually(|| sequencer.current_step().as_deref() == Some("B")));

    sequencer.jump("C");
    assert!(eventually(|| sequencer.current_step().as_deref() == Some("C")));

    sequencer.advance();
    assert!(sequencer.wait_until_finished(TIMEOUT));
    assert!(!sequencer.is_running());
    assert_eq!(entries(&log), vec!["A", "B", "C"]);
}

#[test]
fn advances_run_every_step_once_in_order() {
    init_tracing();
    let log = journal();
    let names: Vec<String> = (0..8).map(|i| format!("step-{i}")).collect();
    let sequencer = names
        .iter()
        .fold(SequencerBuilder::new(), |builder, name| {
            builder.step(recording_step(name, &log))
        })
        .build()
        .unwrap();

    sequencer.start().unwrap();
    for _ in 0..names.len() {
        sequencer.advance();
    }

    assert!(sequencer.wait_until_finished(TIMEOUT));
    assert_eq!(entries(&log), names);
    assert_eq!(sequencer.phase(), Phase::Finished);
}

#[test]
fn sequence_finishes_only_after_last_step() {
    init_tracing();
    let sequencer = SequencerBuilder::new()
        .step(FnStep::noop("first"))
        .step(FnStep::noop("last"))
        .build()
        .unwrap();

    sequencer.start().unwrap();
    sequencer.advance();
    assert!(eventually(|| sequencer.current_step().as_deref() == Some("last")));
    assert!(sequencer.is_running());

    sequencer.advance();
    assert!(sequencer.wait_until_finished(TIMEOUT));
    assert_eq!(sequencer.current_step().as_deref(), Some("last"));
}

#[test]
fn concurrent_callers_never_overlap_steps() {
    init_tracing();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let performed = Arc::new(AtomicUsize::new(0));

    let steps: Vec<Box<dyn Step>> = (0..20)
        .map(|i| {
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            let performed = Arc::clone(&performed);
            Box::new(FnStep::new(format!("s{i}"), move |_, _| {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_micros(200));
                performed.fetch_add(1, Ordering::SeqCst);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })) as Box<dyn Step>
        })
        .collect();
    let sequencer = Sequencer::new(steps).unwrap();

    let callers: Vec<_> = (0..4)
        .map(|_| {
            let sequencer = sequencer.clone();
            thread::spawn(move || {
                sequencer.start().unwrap();
                for _ in 0..5 {
                    sequencer.advance();
                    thread::yield_now();
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }

    assert!(sequencer.wait_until_finished(TIMEOUT));
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(performed.load(Ordering::SeqCst), 20);
}

#[test]
fn concurrent_jumps_and_advances_never_overlap_steps() {
    init_tracing();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    let steps: Vec<Box<dyn Step>> = (0..10)
        .map(|i| {
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            Box::new(FnStep::new(format!("s{i}"), move |_, _| {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_micros(100));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })) as Box<dyn Step>
        })
        .collect();
    let sequencer = Sequencer::new(steps).unwrap();
    sequencer.start().unwrap();

    let callers: Vec<_> = (0..4)
        .map(|caller| {
            let sequencer = sequencer.clone();
            thread::spawn(move || {
                for round in 0..10 {
                    let target = format!("s{}", (caller + round) % 5);
                    // Losing the race to another queued jump panics; that is expected here.
                    if let Ok(result) =
                        panic::catch_unwind(AssertUnwindSafe(|| sequencer.try_jump(&target)))
                    {
                        result.unwrap();
                    }
                    sequencer.advance();
                    thread::yield_now();
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }

    assert!(eventually(|| {
        sequencer.advance();
        sequencer.is_finished()
    }));
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_step_aborts_the_sequence() {
    init_tracing();
    let log = journal();
    let sequencer = SequencerBuilder::new()
        .step(recording_step("a", &log))
        .step(FnStep::new("b", |_, _| panic!("sensor offline")))
        .step(recording_step("c", &log))
        .build()
        .unwrap();

    sequencer.start().unwrap();
    sequencer.advance();
    for _ in 0..3 {
        sequencer.advance();
    }

    assert!(eventually(|| sequencer.is_aborted()));
    assert!(!sequencer.is_running());
    assert!(!sequencer.wait_until_finished(TIMEOUT));
    assert_eq!(sequencer.pending_requests(), 0);
    assert_eq!(sequencer.current_step().as_deref(), Some("b"));
    assert_eq!(entries(&log), vec!["a"]);

    sequencer.advance();
    assert_eq!(sequencer.pending_requests(), 0);
}

#[test]
fn steps_can_drive_their_own_sequencer() {
    init_tracing();
    let log = journal();
    let jump_log = Arc::clone(&log);
    let sequencer = SequencerBuilder::new()
        .step(FnStep::new("intro", move |seq, _| {
            jump_log.lock().unwrap().push("intro".into());
            seq.jump("outro");
            Ok(())
        }))
        .step(recording_step("middle", &log))
        .step({
            let log = Arc::clone(&log);
            FnStep::new("outro", move |seq, _| {
                log.lock().unwrap().push("outro".into());
                seq.advance();
                Ok(())
            })
        })
        .build()
        .unwrap();

    sequencer.start().unwrap();

    assert!(sequencer.wait_until_finished(TIMEOUT));
    assert_eq!(entries(&log), vec!["intro", "outro"]);
}

#[test]
fn conflicting_jump_panics_while_step_in_flight() {
    init_tracing();
    let (release, gate) = mpsc::channel::<()>();
    let gate = Mutex::new(gate);
    let started = Arc::new(AtomicUsize::new(0));
    let started_in_step = Arc::clone(&started);

    let sequencer = SequencerBuilder::new()
        .step(FnStep::noop("A"))
        .step(FnStep::new("B", move |_, _| {
            started_in_step.fetch_add(1, Ordering::SeqCst);
            let _ = gate.lock().unwrap().recv();
            Ok(())
        }))
        .step(FnStep::noop("C"))
        .build()
        .unwrap();

    sequencer.start().unwrap();
    sequencer.advance();
    assert!(eventually(|| started.load(Ordering::SeqCst) == 1));

    sequencer.jump("C");
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| sequencer.jump("A")));

    let payload = outcome.expect_err("second jump should panic");
    let message = payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(message.contains("Conflicting jump request"), "{message}");
    assert_eq!(sequencer.pending_requests(), 1);

    release.send(()).unwrap();
    assert!(eventually(|| sequencer.current_step().as_deref() == Some("C")));
}

#[test]
fn unknown_jump_leaves_sequencer_untouched() {
    init_tracing();
    let sequencer = SequencerBuilder::new()
        .step(FnStep::noop("A"))
        .step(FnStep::noop("B"))
        .build()
        .unwrap();
    sequencer.start().unwrap();

    sequencer.jump("Z");
    let err = sequencer.try_jump("Z").unwrap_err();

    assert!(matches!(err, SequencerError::StepNotFound { .. }));
    assert!(sequencer.is_running());
    assert_eq!(sequencer.current_index(), Some(0));
    assert_eq!(sequencer.pending_requests(), 0);
}

#[test]
fn tags_reach_every_step() {
    init_tracing();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_step = Arc::clone(&seen);
    let sequencer = SequencerBuilder::new()
        .tag("mission-7")
        .tag(serde_json::json!({ "attempt": 1 }))
        .step(FnStep::new("only", move |_, tags| {
            seen_by_step.lock().unwrap().extend(tags.iter().cloned());
            Ok(())
        }))
        .build()
        .unwrap();

    sequencer.start().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], "mission-7");
    assert_eq!(seen[1]["attempt"], 1);
}

#[test]
fn slow_poll_interval_still_wakes_on_request() {
    init_tracing();
    let sequencer = SequencerBuilder::new()
        .poll_interval(Duration::from_secs(60))
        .step(FnStep::noop("A"))
        .step(FnStep::noop("B"))
        .build()
        .unwrap();

    sequencer.start().unwrap();
    sequencer.advance();

    assert!(eventually(|| sequencer.current_step().as_deref() == Some("B")));
}

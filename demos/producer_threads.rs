//! Producer Threads
//!
//! One engine thread polls a shared control block while several producer
//! threads race to request transitions. The last request before each step
//! wins; nothing is queued.
//!
//! Run with: RUST_LOG=tickfsm=debug cargo run --example producer_threads

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tickfsm::builder::FsmBuilder;
use tickfsm::{Routine, Status, StepError};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    println!("=== Producer Threads ===\n");

    let modes: Vec<Routine> = ["standby", "pumping", "draining", "flushing"]
        .into_iter()
        .map(|name| Routine::named(name, || thread::sleep(Duration::from_millis(1))))
        .collect();

    let fsm = match FsmBuilder::new()
        .name("pump")
        .trace_steps(false)
        .entry_state(modes[0].clone())
        .no_entry_action()
        .ending_action(Routine::named("stop_motor", || println!("Motor stopped")))
        .build_shared()
    {
        Ok(fsm) => fsm,
        Err(err) => {
            eprintln!("Failed to build machine: {err}");
            return;
        }
    };
    let stop = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            while !stop.load(Ordering::Acquire) {
                match fsm.step() {
                    Ok(Status::Ended) => break,
                    Ok(Status::Running) => {}
                    Err(StepError::MutexLocked) => thread::yield_now(),
                    Err(err) => {
                        eprintln!("Engine stopped: {err}");
                        break;
                    }
                }
            }
        });

        let producers: Vec<_> = (0..4)
            .map(|id| {
                let fsm = &fsm;
                let modes = &modes;
                scope.spawn(move || {
                    for round in 0..25 {
                        let target = &modes[(id + round) % modes.len()];
                        fsm.request_transition(target.clone(), Routine::noop());
                        thread::sleep(Duration::from_millis(2));
                    }
                })
            })
            .collect();

        for producer in producers {
            let _ = producer.join();
        }
        fsm.request_end();
        thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::Release);
    });

    let stats = fsm.stats();
    println!(
        "\nSteps: {}, transitions: {}, terminations: {}, contended: {}",
        stats.steps, stats.transitions, stats.terminations, stats.contended
    );
    println!("\n=== Demo Complete ===");
}

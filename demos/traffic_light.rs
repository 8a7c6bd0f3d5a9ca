//! Traffic Light State Machine
//!
//! This demo drives a cyclic machine from a plain polling loop.
//!
//! Key concepts:
//! - Each light is a state routine that counts its own ticks
//! - A state requests the next light from inside its own body
//! - Transition actions run once at the boundary
//! - Termination resets the machine to its entry state
//!
//! Run with: cargo run --example traffic_light

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tickfsm::builder::FsmBuilder;
use tickfsm::{Routine, SharedFsm, Status};
use tracing_subscriber::EnvFilter;

const TICKS_PER_LIGHT: usize = 3;
const CYCLES: usize = 2;

struct Lights {
    red: Routine,
    green: Routine,
    yellow: Routine,
}

fn after_red(lights: &Lights) -> &Routine {
    &lights.green
}

fn after_green(lights: &Lights) -> &Routine {
    &lights.yellow
}

fn after_yellow(lights: &Lights) -> &Routine {
    &lights.red
}

/// Build a light that hands over to `next` after a fixed number of ticks.
fn light(
    name: &'static str,
    fsm: Arc<OnceLock<Weak<SharedFsm>>>,
    lights: Arc<OnceLock<Lights>>,
    next: fn(&Lights) -> &Routine,
    cycles: Arc<AtomicUsize>,
) -> Routine {
    let ticks = AtomicUsize::new(0);
    Routine::named(name, move || {
        let tick = ticks.fetch_add(1, Ordering::SeqCst) + 1;
        println!("  {name:<6} tick {tick}");
        if tick < TICKS_PER_LIGHT {
            return;
        }
        ticks.store(0, Ordering::SeqCst);

        let (Some(fsm), Some(lights)) = (fsm.get().and_then(Weak::upgrade), lights.get()) else {
            return;
        };
        if name == "yellow" && cycles.fetch_add(1, Ordering::SeqCst) + 1 == CYCLES {
            fsm.request_end();
        } else {
            let target = next(lights).clone();
            let announce = target.name();
            fsm.request_transition(
                target,
                Routine::named("announce", move || println!("-> switching to {announce}")),
            );
        }
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Traffic Light State Machine ===\n");

    let fsm_cell: Arc<OnceLock<Weak<SharedFsm>>> = Arc::new(OnceLock::new());
    let lights_cell: Arc<OnceLock<Lights>> = Arc::new(OnceLock::new());
    let cycles = Arc::new(AtomicUsize::new(0));

    let make = |name: &'static str, next: fn(&Lights) -> &Routine| {
        light(
            name,
            Arc::clone(&fsm_cell),
            Arc::clone(&lights_cell),
            next,
            Arc::clone(&cycles),
        )
    };
    let lights = Lights {
        red: make("red", after_red),
        green: make("green", after_green),
        yellow: make("yellow", after_yellow),
    };
    let red = lights.red.clone();
    let _ = lights_cell.set(lights);

    let fsm = match FsmBuilder::new()
        .name("traffic_light")
        .entry_state(red)
        .entry_action(Routine::named("power_on", || println!("Power on, starting at red")))
        .ending_action(Routine::named("power_off", || println!("Power off")))
        .build_shared()
    {
        Ok(fsm) => Arc::new(fsm),
        Err(err) => {
            eprintln!("Failed to build machine: {err}");
            return;
        }
    };
    let _ = fsm_cell.set(Arc::downgrade(&fsm));

    match fsm.run_until_end(100) {
        Ok(Status::Ended) => println!("\nMachine ended after {} cycles", CYCLES),
        Ok(Status::Running) => println!("\nStep budget exhausted"),
        Err(err) => println!("\nMachine failed: {err}"),
    }

    let stats = fsm.stats();
    println!(
        "Steps: {}, transitions: {}, terminations: {}",
        stats.steps, stats.transitions, stats.terminations
    );

    if let Ok(json) = fsm.snapshot().to_json() {
        println!("\nFinal snapshot:\n{json}");
    }

    println!("\n=== Demo Complete ===");
}

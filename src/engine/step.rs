//! The `step` operation.

use crate::core::{Phase, Routine, Status};
use crate::engine::block::{ControlBlock, Slots};
use crate::engine::error::StepError;
use crossbeam::utils::Backoff;
use parking_lot::lock_api::RawMutex;
use tracing::{debug, trace, warn};

impl<M: RawMutex> ControlBlock<M> {
    /// Advance the machine by exactly one meta-transition.
    ///
    /// Returns `MutexLocked` without touching the block when the guard is
    /// held elsewhere; the caller simply polls again later. The only wait
    /// inside a step is re-taking the guard after the current state routine
    /// returns, which is a bounded backoff against requestor bookkeeping.
    pub fn step(&self) -> Result<Status, StepError> {
        if !self.is_initialized() {
            return Err(StepError::NotInitialized);
        }

        let Some(mut slots) = self.try_acquire() else {
            let contended = self.note_contention();
            debug!(fsm = %self.config().name, contended, "Guard held elsewhere, step deferred");
            return Err(StepError::MutexLocked);
        };

        let phase = match Phase::try_from(slots.phase) {
            Ok(phase) => phase,
            Err(code) => {
                warn!(fsm = %self.config().name, code, "Control block holds an unknown phase code");
                return Err(StepError::UnknownPhase { code });
            }
        };

        let Slots {
            wiring,
            phase: raw_phase,
            stats,
        } = &mut *slots;
        let Some(wiring) = wiring.as_mut() else {
            return Err(StepError::NotInitialized);
        };

        let (action, status) = match phase {
            Phase::NoChange => {
                let state = wiring.current.clone();
                drop(slots);
                return Ok(self.run_current(state));
            }
            Phase::Start => {
                debug!(
                    fsm = %self.config().name,
                    state = wiring.current.name(),
                    action = wiring.entry_action.name(),
                    "Entering state machine"
                );
                (wiring.entry_action.clone(), Status::Running)
            }
            Phase::Transition => {
                let action = wiring.swap_in_next();
                stats.transitions += 1;
                debug!(
                    fsm = %self.config().name,
                    from = wiring.previous.name(),
                    to = wiring.current.name(),
                    action = action.name(),
                    "State transition"
                );
                (action, Status::Running)
            }
            Phase::End => {
                let action = wiring.rewind();
                stats.terminations += 1;
                debug!(
                    fsm = %self.config().name,
                    state = wiring.current.name(),
                    action = action.name(),
                    "State machine ended"
                );
                (action, Status::Ended)
            }
        };
        stats.steps += 1;
        *raw_phase = Phase::NoChange.code();
        drop(slots);

        action.invoke();
        Ok(status)
    }

    /// Poll [`step`](Self::step) until the machine ends, a step fails, or
    /// `max_steps` polls have been spent.
    ///
    /// Contended polls back off and count against the budget. Returns
    /// `Running` when the budget runs out first.
    pub fn run_until_end(&self, max_steps: usize) -> Result<Status, StepError> {
        let backoff = Backoff::new();
        for _ in 0..max_steps {
            match self.step() {
                Ok(Status::Ended) => return Ok(Status::Ended),
                Ok(Status::Running) => backoff.reset(),
                Err(StepError::MutexLocked) => self.back_off(&backoff),
                Err(err) => return Err(err),
            }
        }
        Ok(Status::Running)
    }

    fn run_current(&self, state: Routine) -> Status {
        if self.config().trace_steps {
            trace!(fsm = %self.config().name, state = state.name(), "Running current state");
        }
        state.invoke();

        let mut slots = self.acquire();
        slots.stats.steps += 1;
        Status::Running
    }
}

#[cfg(test)]
mod tests {
    use crate::config::FsmConfig;
    use crate::core::{Phase, Routine, Status};
    use crate::engine::{ControlBlock, LocalFsm, SharedFsm, StepError};
    use parking_lot::lock_api::{GuardSend, RawMutex};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(name: &'static str, counter: &Arc<AtomicUsize>) -> Routine {
        let counter = Arc::clone(counter);
        Routine::named(name, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn first_step_runs_entry_action_once() {
        let entered = Arc::new(AtomicUsize::new(0));
        let body = Arc::new(AtomicUsize::new(0));
        let fsm = LocalFsm::single_threaded(
            counting("A", &body),
            counting("enter", &entered),
            Routine::noop(),
        );

        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(entered.load(Ordering::SeqCst), 1);
        assert_eq!(body.load(Ordering::SeqCst), 0);
        assert_eq!(fsm.phase(), Ok(Phase::NoChange));

        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(entered.load(Ordering::SeqCst), 1);
        assert_eq!(body.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn step_before_initialize_is_refused() {
        let fsm = SharedFsm::new();
        assert_eq!(fsm.step(), Err(StepError::NotInitialized));
        assert_eq!(fsm.stats().steps, 0);
    }

    #[test]
    fn steady_steps_leave_previous_and_next_alone() {
        let body = Arc::new(AtomicUsize::new(0));
        let a = counting("A", &body);
        let fsm = LocalFsm::single_threaded(a.clone(), Routine::noop(), Routine::noop());
        fsm.step().unwrap();

        for expected in 1..=5 {
            assert_eq!(fsm.step(), Ok(Status::Running));
            assert_eq!(body.load(Ordering::SeqCst), expected);
            assert_eq!(fsm.previous_state(), Some(a.clone()));
            assert_eq!(fsm.next_state(), Some(a.clone()));
        }
        assert_eq!(fsm.stats().steps, 6);
    }

    #[test]
    fn transition_then_end_scenario() {
        let counter = Arc::new(AtomicUsize::new(0));
        let incr = counting("incr", &counter);
        let a = Routine::named("A", || {});
        let b = Routine::named("B", || {});
        let fsm = LocalFsm::single_threaded(a.clone(), incr.clone(), Routine::noop());

        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(fsm.current_state(), Some(a.clone()));

        fsm.request_transition(b.clone(), incr);
        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(fsm.current_state(), Some(b.clone()));
        assert_eq!(fsm.previous_state(), Some(a.clone()));

        fsm.request_end();
        assert_eq!(fsm.step(), Ok(Status::Ended));
        assert_eq!(fsm.current_state(), Some(a.clone()));
        assert_eq!(fsm.previous_state(), Some(a.clone()));
        assert_eq!(fsm.next_state(), Some(a.clone()));
        assert_eq!(fsm.entry_state(), Some(a));

        let stats = fsm.stats();
        assert_eq!(stats.steps, 3);
        assert_eq!(stats.transitions, 1);
        assert_eq!(stats.terminations, 1);
    }

    #[test]
    fn ended_block_keeps_running_entry_state() {
        let body = Arc::new(AtomicUsize::new(0));
        let fsm = LocalFsm::single_threaded(counting("A", &body), Routine::noop(), Routine::noop());
        fsm.step().unwrap();
        fsm.request_end();
        assert_eq!(fsm.step(), Ok(Status::Ended));

        assert_eq!(fsm.phase(), Ok(Phase::NoChange));
        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(body.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_phase_is_reported_and_left_alone() {
        let body = Arc::new(AtomicUsize::new(0));
        let fsm = SharedFsm::new();
        fsm.initialize(counting("A", &body), Routine::noop(), Routine::noop());
        fsm.force_phase_code(7);

        assert_eq!(fsm.step(), Err(StepError::UnknownPhase { code: 7 }));
        assert_eq!(fsm.step(), Err(StepError::UnknownPhase { code: 7 }));
        assert_eq!(fsm.phase(), Err(StepError::UnknownPhase { code: 7 }));
        assert_eq!(body.load(Ordering::SeqCst), 0);
        assert_eq!(fsm.stats().steps, 0);
    }

    #[test]
    fn fault_path_releases_the_guard() {
        let fsm = SharedFsm::new();
        fsm.initialize(Routine::noop(), Routine::noop(), Routine::noop());
        fsm.force_phase_code(200);
        assert!(fsm.step().is_err());

        fsm.request_transition(Routine::named("B", || {}), Routine::noop());
        assert_eq!(fsm.phase(), Ok(Phase::Transition));
    }

    #[test]
    fn run_until_end_stops_on_termination() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let fsm = Arc::new(SharedFsm::new());
        let weak = Arc::downgrade(&fsm);
        let counter = Arc::clone(&ticks);
        let body = Routine::named("count_to_three", move || {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                if let Some(fsm) = weak.upgrade() {
                    fsm.request_end();
                }
            }
        });
        fsm.initialize(body, Routine::noop(), Routine::noop());

        assert_eq!(fsm.run_until_end(100), Ok(Status::Ended));
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(fsm.stats().steps, 5);
    }

    #[test]
    fn request_from_entry_action_is_honored_next_step() {
        let fsm = Arc::new(SharedFsm::new());
        let b = Routine::named("B", || {});
        let weak = Arc::downgrade(&fsm);
        let target = b.clone();
        let enter = Routine::named("enter", move || {
            if let Some(fsm) = weak.upgrade() {
                fsm.request_transition(target.clone(), Routine::noop());
            }
        });
        fsm.initialize(Routine::named("A", || {}), enter, Routine::noop());

        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(fsm.phase(), Ok(Phase::Transition));
        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(fsm.current_state(), Some(b));
    }

    #[test]
    fn run_until_end_reports_exhausted_budget() {
        let fsm = LocalFsm::single_threaded(Routine::noop(), Routine::noop(), Routine::noop());
        assert_eq!(fsm.run_until_end(10), Ok(Status::Running));
        assert_eq!(fsm.stats().steps, 10);
    }

    #[test]
    fn run_until_end_propagates_faults() {
        let fsm = LocalFsm::new();
        assert_eq!(fsm.run_until_end(10), Err(StepError::NotInitialized));
    }

    static GATE_CLOSED: AtomicBool = AtomicBool::new(false);

    /// Adapter that refuses every acquisition while the gate is closed.
    struct GatedMutex {
        inner: parking_lot::RawMutex,
    }

    unsafe impl RawMutex for GatedMutex {
        const INIT: Self = GatedMutex {
            inner: <parking_lot::RawMutex as RawMutex>::INIT,
        };

        type GuardMarker = GuardSend;

        fn lock(&self) {
            self.inner.lock();
        }

        fn try_lock(&self) -> bool {
            !GATE_CLOSED.load(Ordering::SeqCst) && self.inner.try_lock()
        }

        unsafe fn unlock(&self) {
            self.inner.unlock();
        }
    }

    #[test]
    fn contended_guard_defers_the_step() {
        let entered = Arc::new(AtomicUsize::new(0));
        let fsm: ControlBlock<GatedMutex> = ControlBlock::with_config(FsmConfig::named("gated"));
        fsm.initialize(Routine::noop(), counting("enter", &entered), Routine::noop());

        GATE_CLOSED.store(true, Ordering::SeqCst);
        assert_eq!(fsm.step(), Err(StepError::MutexLocked));
        assert_eq!(fsm.step(), Err(StepError::MutexLocked));
        GATE_CLOSED.store(false, Ordering::SeqCst);

        assert_eq!(entered.load(Ordering::SeqCst), 0);
        assert_eq!(fsm.phase(), Ok(Phase::Start));
        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(entered.load(Ordering::SeqCst), 1);

        let stats = fsm.stats();
        assert_eq!(stats.contended, 2);
        assert_eq!(stats.steps, 1);
    }
}

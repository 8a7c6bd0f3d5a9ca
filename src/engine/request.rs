//! Transition and termination requests.
//!
//! Requests only record intent: they write the phase and the pending target
//! under the guard, and the next step carries them out. A later request
//! overwrites an earlier one that has not been consumed yet. Requests on an
//! uninitialized block are silently dropped so they stay callable from
//! contexts where there is nobody to report an error to.

use crate::core::{Action, NoopMutex, Phase, StateRoutine};
use crate::engine::block::ControlBlock;
use parking_lot::lock_api::RawMutex;
use tracing::{debug, trace};

impl<M: RawMutex> ControlBlock<M> {
    /// Schedule a move to `next`, running `action` at the boundary.
    ///
    /// Safe to call from inside the current state routine: the engine does
    /// not hold the guard while a routine runs.
    pub fn request_transition(&self, next: StateRoutine, action: Action) {
        if !self.is_initialized() {
            trace!(fsm = %self.config().name, "Transition request on uninitialized block dropped");
            return;
        }

        let mut slots = self.acquire();
        let Some(wiring) = slots.wiring.as_mut() else {
            return;
        };
        debug!(
            fsm = %self.config().name,
            to = next.name(),
            action = action.name(),
            superseded = wiring.next.name(),
            "Transition requested"
        );
        wiring.next = next;
        wiring.pending_action = action;
        slots.phase = Phase::Transition.code();
    }

    /// Schedule termination, running the ending action fixed at
    /// initialization.
    pub fn request_end(&self) {
        self.schedule_end(None);
    }

    fn schedule_end(&self, ending: Option<Action>) {
        if !self.is_initialized() {
            trace!(fsm = %self.config().name, "End request on uninitialized block dropped");
            return;
        }

        let mut slots = self.acquire();
        let Some(wiring) = slots.wiring.as_mut() else {
            return;
        };
        let action = ending.unwrap_or_else(|| wiring.ending_action.clone());
        debug!(fsm = %self.config().name, action = action.name(), "End requested");
        wiring.pending_action = action;
        slots.phase = Phase::End.code();
    }
}

impl ControlBlock<NoopMutex> {
    /// Schedule termination, running `ending` instead of the ending action
    /// given at initialization.
    ///
    /// Only single-threaded blocks take a per-request ending action; shared
    /// blocks always run the one fixed at initialization.
    pub fn request_end_with(&self, ending: Action) {
        self.schedule_end(Some(ending));
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{Phase, Routine, Status};
    use crate::engine::{LocalFsm, SharedFsm};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(name: &'static str, counter: &Arc<AtomicUsize>) -> Routine {
        let counter = Arc::clone(counter);
        Routine::named(name, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn started(entry: Routine, ending: Routine) -> LocalFsm {
        let fsm = LocalFsm::single_threaded(entry, Routine::noop(), ending);
        fsm.step().unwrap();
        fsm
    }

    #[test]
    fn requests_on_uninitialized_block_are_dropped() {
        let fsm = SharedFsm::new();
        fsm.request_transition(Routine::noop(), Routine::noop());
        fsm.request_end();

        assert!(!fsm.is_initialized());
        assert_eq!(fsm.current_state(), None);
    }

    #[test]
    fn latest_transition_request_wins() {
        let hits = Arc::new(AtomicUsize::new(0));
        let a = Routine::named("A", || {});
        let b = Routine::named("B", || {});
        let c = Routine::named("C", || {});
        let fsm = started(a.clone(), Routine::noop());

        fsm.request_transition(b.clone(), counting("to_b", &hits));
        fsm.request_transition(c.clone(), counting("to_c", &hits));
        assert_eq!(fsm.next_state(), Some(c.clone()));
        assert_eq!(fsm.current_state(), Some(a.clone()));

        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(fsm.current_state(), Some(c));
        assert_eq!(fsm.previous_state(), Some(a));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(fsm.stats().transitions, 1);
    }

    #[test]
    fn end_supersedes_pending_transition() {
        let a = Routine::named("A", || {});
        let fsm = started(a.clone(), Routine::noop());

        fsm.request_transition(Routine::named("B", || {}), Routine::noop());
        fsm.request_end();

        assert_eq!(fsm.step(), Ok(Status::Ended));
        assert_eq!(fsm.current_state(), Some(a));
        assert_eq!(fsm.stats().transitions, 0);
    }

    #[test]
    fn transition_supersedes_pending_end() {
        let ended = Arc::new(AtomicUsize::new(0));
        let b = Routine::named("B", || {});
        let fsm = started(Routine::named("A", || {}), counting("bye", &ended));

        fsm.request_end();
        fsm.request_transition(b.clone(), Routine::noop());

        assert_eq!(fsm.step(), Ok(Status::Running));
        assert_eq!(fsm.current_state(), Some(b));
        assert_eq!(ended.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn end_runs_action_fixed_at_initialization() {
        let ended = Arc::new(AtomicUsize::new(0));
        let fsm = SharedFsm::new();
        fsm.initialize(Routine::noop(), Routine::noop(), counting("bye", &ended));
        fsm.step().unwrap();

        fsm.request_end();
        assert_eq!(fsm.phase(), Ok(Phase::End));
        assert_eq!(fsm.step(), Ok(Status::Ended));
        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn end_with_override_replaces_fixed_ending_action() {
        let fixed = Arc::new(AtomicUsize::new(0));
        let custom = Arc::new(AtomicUsize::new(0));
        let fsm = started(Routine::named("A", || {}), counting("fixed", &fixed));

        fsm.request_end_with(counting("custom", &custom));
        assert_eq!(fsm.step(), Ok(Status::Ended));

        assert_eq!(fixed.load(Ordering::SeqCst), 0);
        assert_eq!(custom.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn override_is_per_request() {
        let fixed = Arc::new(AtomicUsize::new(0));
        let custom = Arc::new(AtomicUsize::new(0));
        let fsm = started(Routine::named("A", || {}), counting("fixed", &fixed));

        fsm.request_end_with(counting("custom", &custom));
        fsm.step().unwrap();
        fsm.request_end();
        fsm.step().unwrap();

        assert_eq!(custom.load(Ordering::SeqCst), 1);
        assert_eq!(fixed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn request_before_first_step_skips_entry_action() {
        let entered = Arc::new(AtomicUsize::new(0));
        let b = Routine::named("B", || {});
        let fsm = LocalFsm::single_threaded(
            Routine::named("A", || {}),
            counting("enter", &entered),
            Routine::noop(),
        );

        fsm.request_transition(b.clone(), Routine::noop());
        assert_eq!(fsm.step(), Ok(Status::Running));

        assert_eq!(entered.load(Ordering::SeqCst), 0);
        assert_eq!(fsm.current_state(), Some(b));
    }
}

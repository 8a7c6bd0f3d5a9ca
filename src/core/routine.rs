//! State and action routines.
//!
//! Routines are opaque zero-argument callables supplied by the application.
//! The engine never looks inside them: it only clones the handle (an `Arc`
//! increment, no allocation) and invokes it at the right phase boundary.

use std::fmt;
use std::sync::{Arc, OnceLock};

/// Name given to routines created without one.
pub const ANONYMOUS: &str = "anonymous";

/// Capability implemented by anything the engine can invoke.
///
/// Every `Fn() + Send + Sync` closure or function pointer implements it, so
/// most callers never name this trait directly.
pub trait Invoke: Send + Sync {
    /// Run the routine once.
    fn invoke(&self);
}

impl<F> Invoke for F
where
    F: Fn() + Send + Sync,
{
    fn invoke(&self) {
        self()
    }
}

/// Shared handle to a named routine.
///
/// Two handles are equal when they point at the same callable, which is how
/// the engine's state references (`current`, `previous`, `next`) are compared.
///
/// # Example
///
/// ```rust
/// use tickfsm::Routine;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&hits);
/// let idle = Routine::named("idle", move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// let alias = idle.clone();
/// alias.invoke();
///
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// assert_eq!(idle, alias);
/// assert_eq!(idle.name(), "idle");
/// ```
#[derive(Clone)]
pub struct Routine {
    name: &'static str,
    body: Arc<dyn Invoke>,
}

/// A routine used as a state body.
pub type StateRoutine = Routine;

/// A routine used as a one-shot action at a phase boundary.
pub type Action = Routine;

impl Routine {
    /// Wrap a closure as an anonymous routine.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::named(ANONYMOUS, body)
    }

    /// Wrap a closure under a name used by logs and snapshots.
    pub fn named<F>(name: &'static str, body: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            name,
            body: Arc::new(body),
        }
    }

    /// Wrap an already shared [`Invoke`] implementation.
    pub fn from_shared(name: &'static str, body: Arc<dyn Invoke>) -> Self {
        Self { name, body }
    }

    /// The shared no-op action.
    ///
    /// Every call returns a handle to the same callable, so all no-op
    /// handles compare equal.
    pub fn noop() -> Self {
        static NOOP: OnceLock<Routine> = OnceLock::new();
        NOOP.get_or_init(|| Routine::named("no_action", no_action))
            .clone()
    }

    /// Name for display/logging.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the routine once.
    pub fn invoke(&self) {
        self.body.invoke();
    }

    /// Check whether both handles refer to the same callable.
    pub fn same_as(&self, other: &Routine) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl PartialEq for Routine {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Routine {}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Routine").field(&self.name).finish()
    }
}

/// Zero-effect routine usable as any entry, transition, or ending action.
pub fn no_action() {}

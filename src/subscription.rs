//! Cancellation handles.

use std::cell::Cell;
use std::fmt;
use std::mem;
use std::sync::{ Arc, Condvar, Mutex, MutexGuard, PoisonError };
use std::thread::{ self, ThreadId };


/// A boxed cancellation action.
type Teardown = Box<dyn FnOnce() + Send + 'static>;

/// Number of producer deliveries the current thread is inside of.
thread_local!(
    static DELIVERING: Cell<usize> = Cell::new(0)
);


/// Run `f` as a delivery to an observer.
///
/// Producers that deliver from their own thread wrap their calls into the
/// observer with this. Cancelling from inside such a call never blocks, since
/// the teardown being waited for may itself wait for the delivery to end.
pub(crate) fn delivering<R, F: FnOnce() -> R>(f: F) -> R {
    struct Leave;

    impl Drop for Leave {
        fn drop(&mut self) {
            DELIVERING.with(|depth| depth.set(depth.get() - 1));
        }
    }

    DELIVERING.with(|depth| depth.set(depth.get() + 1));
    let _leave = Leave;
    f()
}

/// Whether the current thread is inside a delivery.
pub(crate) fn in_delivery() -> bool {
    DELIVERING.with(|depth| depth.get() > 0)
}


enum State {
    Pending(Teardown),
    Running(ThreadId),
    Done,
}

struct Shared {
    state: Mutex<State>,
    finished: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self) {
        *self.lock() = State::Done;
        self.finished.notify_all();
    }
}

/// Marks the teardown as finished, even if it panics.
struct Finish<'a>(&'a Shared);

impl Drop for Finish<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}


/// A handle to cancel one stream activation.
///
/// Cancelling runs the teardown action registered by the producer exactly
/// once, no matter how often or from how many threads `unsubscribe` is
/// called. Clones share the same action.
///
/// Dropping a subscription does not cancel anything. A pipeline whose handle
/// is discarded keeps running until its producer ends by itself.
#[derive(Clone)]
pub struct Subscription {
    shared: Arc<Shared>,
}

impl Subscription {
    fn with_state(state: State) -> Subscription {
        Subscription {
            shared: Arc::new(Shared { state: Mutex::new(state), finished: Condvar::new() }),
        }
    }

    /// Create a subscription running `teardown` on the first cancellation.
    pub fn new<F: FnOnce() + Send + 'static>(teardown: F) -> Subscription {
        Subscription::with_state(State::Pending(Box::new(teardown)))
    }

    /// A subscription with nothing to cancel.
    pub fn empty() -> Subscription {
        Subscription::with_state(State::Done)
    }

    /// Combine subscriptions into one that cancels all of them in order.
    pub fn all<I: IntoIterator<Item=Subscription>>(subscriptions: I) -> Subscription {
        let subscriptions: Vec<_> = subscriptions.into_iter().collect();
        Subscription::new(move || {
            for subscription in subscriptions {
                subscription.unsubscribe();
            }
        })
    }

    /// Cancel the activation.
    ///
    /// The first call runs the teardown on the calling thread, after the
    /// internal lock has been released. Calls racing with it from other
    /// threads block until it has finished, so that everything the activation
    /// owned is released when any of them returns.
    ///
    /// Calls made by the teardown itself, or from inside a delivery on a
    /// producer's thread, return at once instead of waiting.
    pub fn unsubscribe(&self) {
        let current = thread::current().id();
        let mut state = self.shared.lock();
        match mem::replace(&mut *state, State::Done) {
            State::Pending(teardown) => {
                *state = State::Running(current);
                drop(state);
                let _finish = Finish(&self.shared);
                teardown();
            },
            State::Running(owner) => {
                *state = State::Running(owner);
                if owner == current || in_delivery() {
                    return;
                }
                while let State::Running(_) = *state {
                    state = self.shared.finished.wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            },
            State::Done => (),
        }
    }

    /// Whether cancellation has started (or there never was anything to
    /// cancel).
    pub fn is_closed(&self) -> bool {
        match *self.shared.lock() {
            State::Pending(_) => false,
            State::Running(_) | State::Done => true,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

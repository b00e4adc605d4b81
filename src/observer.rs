//! Observers: the sinks that producers drive.
//!
//! An observer bundles three optional callbacks. Producers call `next` for
//! every value and stop as soon as it returns `false`. `error` and `complete`
//! are terminal: after either one, nothing else is delivered.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };

use crate::error::Error;


type NextFn<A> = Arc<dyn Fn(A) -> bool + Send + Sync + 'static>;
type ErrorFn = Arc<dyn Fn(Error) + Send + Sync + 'static>;
type CompleteFn = Arc<dyn Fn() + Send + Sync + 'static>;


/// A set of callbacks receiving the notifications of one stream activation.
///
/// All callbacks are optional. Without a `next` callback every value is
/// accepted; without `error` or `complete` callbacks those notifications are
/// silently dropped.
///
/// ```
/// # use rill::{ Observer, of };
/// # use std::sync::{ Arc, Mutex };
/// let seen = Arc::new(Mutex::new(vec![]));
/// let observer = Observer::new().on_next({
///     let seen = seen.clone();
///     move |x| { seen.lock().unwrap().push(x); true }
/// });
/// of(&[1, 2]).subscribe(observer);
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
///
/// Observers are cheap to clone and may be called from several threads at
/// once, e.g. when they are fed by `merge` over producers running on
/// different timer threads.
pub struct Observer<A> {
    next: Option<NextFn<A>>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
}

impl<A> Clone for Observer<A> {
    fn clone(&self) -> Observer<A> {
        Observer {
            next: self.next.clone(),
            error: self.error.clone(),
            complete: self.complete.clone(),
        }
    }
}

impl<A> Default for Observer<A> {
    fn default() -> Observer<A> {
        Observer { next: None, error: None, complete: None }
    }
}

impl<A> fmt::Debug for Observer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("next", &self.next.is_some())
            .field("error", &self.error.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

impl<A> Observer<A> {
    /// An observer without any callbacks.
    pub fn new() -> Observer<A> {
        Observer::default()
    }

    /// Set the callback receiving values. Returning `false` asks the producer
    /// to stop.
    pub fn on_next<F>(mut self, f: F) -> Observer<A>
        where F: Fn(A) -> bool + Send + Sync + 'static
    {
        self.next = Some(Arc::new(f));
        self
    }

    /// Set the callback receiving an error.
    pub fn on_error<F>(mut self, f: F) -> Observer<A>
        where F: Fn(Error) + Send + Sync + 'static
    {
        self.error = Some(Arc::new(f));
        self
    }

    /// Set the callback receiving completion.
    pub fn on_complete<F>(mut self, f: F) -> Observer<A>
        where F: Fn() + Send + Sync + 'static
    {
        self.complete = Some(Arc::new(f));
        self
    }

    /// Deliver a value. Returns whether the producer may continue.
    pub fn next(&self, a: A) -> bool {
        match self.next {
            Some(ref f) => f(a),
            None => true,
        }
    }

    /// Deliver an error.
    pub fn error(&self, err: Error) {
        if let Some(ref f) = self.error {
            f(err);
        }
    }

    /// Deliver completion.
    pub fn complete(&self) {
        if let Some(ref f) = self.complete {
            f();
        }
    }
}

impl<A: 'static> Observer<A> {
    /// Replace the `next` callback, keeping `error` and `complete`.
    ///
    /// This is how operators wrap their downstream observer: the terminal
    /// callbacks pass through unchanged, only the value path is rewired.
    pub fn with_next<B, F>(&self, f: F) -> Observer<B>
        where F: Fn(B) -> bool + Send + Sync + 'static
    {
        Observer {
            next: Some(Arc::new(f)),
            error: self.error.clone(),
            complete: self.complete.clone(),
        }
    }

    /// Replace the `complete` callback, keeping `next` and `error`.
    pub fn with_complete<F>(&self, f: F) -> Observer<A>
        where F: Fn() + Send + Sync + 'static
    {
        Observer {
            next: self.next.clone(),
            error: self.error.clone(),
            complete: Some(Arc::new(f)),
        }
    }

    /// Enforce the notification protocol on this observer.
    ///
    /// The returned observer forwards to `self` until the first `error` or
    /// `complete`. From then on values are rejected and further terminal
    /// notifications are dropped.
    pub fn guarded(self) -> Observer<A> {
        let done = Arc::new(AtomicBool::new(false));
        let inner = self;
        Observer {
            next: Some(Arc::new({
                let done = done.clone();
                let inner = inner.clone();
                move |a| !done.load(Ordering::Acquire) && inner.next(a)
            })),
            error: Some(Arc::new({
                let done = done.clone();
                let inner = inner.clone();
                move |err| if !done.swap(true, Ordering::AcqRel) {
                    inner.error(err);
                }
            })),
            complete: Some(Arc::new(move || {
                if !done.swap(true, Ordering::AcqRel) {
                    inner.complete();
                }
            })),
        }
    }
}

//! Utilities for the test suite.

use std::sync::{ Arc, Mutex };
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::thread;
use std::time::{ Duration, Instant };

use crate::error::Error;
use crate::observer::Observer;
use crate::source::Listener;


/// The identity function.
pub fn id<T>(t: T) -> T { t }

/// Poll `cond` until it holds or `timeout` has passed. Returns whether it
/// held.
pub fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return cond();
        }
        thread::sleep(Duration::from_millis(1));
    }
}


/// A notification as seen by a recording observer.
#[derive(Debug, PartialEq)]
pub enum Notification<A> {
    Next(A),
    Error(String),
    Complete,
}

struct Log<A> {
    notifications: Vec<Notification<A>>,
    errors: Vec<Error>,
}

/// Records everything delivered to its observers.
pub struct Recorder<A> {
    log: Arc<Mutex<Log<A>>>,
}

impl<A> Clone for Recorder<A> {
    fn clone(&self) -> Recorder<A> {
        Recorder { log: self.log.clone() }
    }
}

impl<A: Clone + Send + 'static> Recorder<A> {
    pub fn new() -> Recorder<A> {
        Recorder {
            log: Arc::new(Mutex::new(Log { notifications: vec![], errors: vec![] })),
        }
    }

    /// An observer accepting every value.
    pub fn observer(&self) -> Observer<A> {
        self.observer_accepting(usize::MAX)
    }

    /// An observer accepting `limit` values. It asks to stop on the last of
    /// them and rejects everything after without recording it.
    pub fn observer_accepting(&self, limit: usize) -> Observer<A> {
        let accepted = Arc::new(AtomicUsize::new(0));
        Observer::new()
            .on_next({
                let log = self.log.clone();
                move |a| {
                    let count = accepted.fetch_add(1, Ordering::SeqCst);
                    if count >= limit {
                        return false;
                    }
                    log.lock().unwrap().notifications.push(Notification::Next(a));
                    count + 1 < limit
                }
            })
            .on_error({
                let log = self.log.clone();
                move |err| {
                    let mut log = log.lock().unwrap();
                    log.notifications.push(Notification::Error(err.to_string()));
                    log.errors.push(err);
                }
            })
            .on_complete({
                let log = self.log.clone();
                move || log.lock().unwrap().notifications.push(Notification::Complete)
            })
    }

    pub fn notifications(&self) -> Vec<Notification<A>> {
        self.log.lock().unwrap().notifications.iter()
            .map(|n| match n {
                Notification::Next(a) => Notification::Next(a.clone()),
                Notification::Error(e) => Notification::Error(e.clone()),
                Notification::Complete => Notification::Complete,
            })
            .collect()
    }

    pub fn values(&self) -> Vec<A> {
        self.log.lock().unwrap().notifications.iter()
            .filter_map(|n| match n {
                Notification::Next(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.log.lock().unwrap().notifications.iter()
            .filter(|n| matches!(n, Notification::Complete))
            .count()
    }

    pub fn errors(&self) -> usize {
        self.log.lock().unwrap().errors.len()
    }

    pub fn last_error(&self) -> Option<Error> {
        self.log.lock().unwrap().errors.last().cloned()
    }
}


type Callback<A> = Box<dyn Fn(A) + Send + Sync + 'static>;

/// A listener driven by hand.
pub struct FakeListener<A> {
    callback: Mutex<Option<Callback<A>>>,
    listens: AtomicUsize,
    closes: AtomicUsize,
}

impl<A> FakeListener<A> {
    pub fn new() -> FakeListener<A> {
        FakeListener {
            callback: Mutex::new(None),
            listens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// Deliver a value to the registered callback. Returns whether there
    /// was one.
    pub fn emit(&self, a: A) -> bool {
        match *self.callback.lock().unwrap() {
            Some(ref callback) => { callback(a); true },
            None => false,
        }
    }

    pub fn listens(&self) -> usize { self.listens.load(Ordering::SeqCst) }

    pub fn closes(&self) -> usize { self.closes.load(Ordering::SeqCst) }
}

impl<A> Listener<A> for FakeListener<A> {
    fn listen(&self, callback: Callback<A>) {
        self.listens.fetch_add(1, Ordering::SeqCst);
        *self.callback.lock().unwrap() = Some(callback);
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        *self.callback.lock().unwrap() = None;
    }
}


/// Self-tests.
#[cfg(test)]
mod test {
    use std::time::Duration;
    use super::*;

    #[test]
    fn accepting_stops_at_limit() {
        let recorder = Recorder::new();
        let observer = recorder.observer_accepting(2);
        assert!(observer.next(1));
        assert!(!observer.next(2));
        assert!(!observer.next(3));
        assert_eq!(recorder.values(), vec![1, 2]);
    }

    #[test]
    fn accepting_zero_records_nothing() {
        let recorder = Recorder::new();
        assert!(!recorder.observer_accepting(0).next(1));
        assert!(recorder.values().is_empty());
    }

    #[test]
    fn wait_until_times_out() {
        assert!(!wait_until(Duration::from_millis(5), || false));
        assert!(wait_until(Duration::from_millis(5), || true));
    }

    #[test]
    fn fake_listener_without_callback() {
        let listener = FakeListener::<i32>::new();
        assert!(!listener.emit(1));
        listener.listen(Box::new(|_| ()));
        assert!(listener.emit(1));
        listener.close();
        assert!(!listener.emit(1));
        assert_eq!((listener.listens(), listener.closes()), (1, 1));
    }
}

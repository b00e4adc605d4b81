//! Timer-driven streams.

use std::sync::{ Arc, Mutex, PoisonError };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::mpsc::{ self, Receiver, RecvTimeoutError };
use std::thread;
use std::time::{ Duration, Instant };

use log::{ debug, warn };

use crate::error::Error;
use crate::observer::Observer;
use crate::stream::Stream;
use crate::subscription::{ delivering, in_delivery, Subscription };


/// Configuration of a periodic stream.
///
/// ```
/// # use rill::Periodic;
/// # use std::time::Duration;
/// let ticks = Periodic::new(Duration::from_millis(5))
///     .thread_name("ticks")
///     .start_at(10)
///     .stream();
/// let first: Vec<u64> = ticks.take(3).events().collect();
/// assert_eq!(first, vec![10, 11, 12]);
/// ```
#[derive(Clone, Debug)]
pub struct Periodic {
    interval: Duration,
    thread_name: Option<String>,
    start: u64,
}

impl Periodic {
    /// Tick every `interval`, counting from zero.
    pub fn new(interval: Duration) -> Periodic {
        Periodic { interval, thread_name: None, start: 0 }
    }

    /// Name the background thread of every activation.
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Periodic {
        self.thread_name = Some(name.into());
        self
    }

    /// Start counting at `start` instead of zero.
    pub fn start_at(mut self, start: u64) -> Periodic {
        self.start = start;
        self
    }

    /// Create the stream.
    ///
    /// Each activation spawns its own timer thread, which lives until the
    /// activation is cancelled or a tick is rejected. Either way the
    /// observer is completed exactly once.
    pub fn stream(self) -> Stream<u64> {
        let config = Arc::new(self);
        Stream::new(move |observer| start(&config, observer))
    }
}

/// A stream of `0, 1, 2, …`, one value per `interval`.
///
/// Shorthand for `Periodic::new(interval).stream()`.
pub fn periodic(interval: Duration) -> Stream<u64> {
    Periodic::new(interval).stream()
}


/// State shared between a timer thread and its subscription.
struct Ticker {
    observer: Observer<u64>,
    stopped: AtomicBool,
    completed: AtomicBool,
    /// Held while a tick is being delivered.
    gate: Mutex<()>,
}

impl Ticker {
    fn finish(&self) {
        if !self.completed.swap(true, Ordering::AcqRel) {
            self.observer.complete();
        }
    }
}

fn start(config: &Periodic, observer: Observer<u64>) -> Subscription {
    if config.interval == Duration::from_secs(0) {
        warn!("periodic: zero interval");
        observer.error(Error::InvalidInterval);
        return Subscription::empty();
    }
    let ticker = Arc::new(Ticker {
        observer,
        stopped: AtomicBool::new(false),
        completed: AtomicBool::new(false),
        gate: Mutex::new(()),
    });
    let (stop, stopped) = mpsc::channel();

    let mut builder = thread::Builder::new();
    if let Some(ref name) = config.thread_name {
        builder = builder.name(name.clone());
    }
    let spawned = builder.spawn({
        let ticker = ticker.clone();
        let interval = config.interval;
        let first = config.start;
        move || run(&ticker, &stopped, interval, first)
    });
    let timer_thread = match spawned {
        Ok(handle) => handle.thread().id(),
        Err(err) => {
            warn!("periodic: failed to spawn timer thread: {}", err);
            ticker.observer.error(Error::from(err));
            return Subscription::empty();
        },
    };
    debug!("periodic: started timer thread ({:?})", config.interval);

    Subscription::new(move || {
        ticker.stopped.store(true, Ordering::Release);
        // Wait out a tick in flight, unless called from inside a delivery.
        if thread::current().id() != timer_thread && !in_delivery() {
            drop(ticker.gate.lock().unwrap_or_else(PoisonError::into_inner));
        }
        let _ = stop.send(());
        ticker.finish();
    })
}

fn run(ticker: &Ticker, stopped: &Receiver<()>, interval: Duration, first: u64) {
    let mut n = first;
    let mut deadline = Instant::now() + interval;
    loop {
        let now = Instant::now();
        if deadline > now {
            match stopped.recv_timeout(deadline - now) {
                Err(RecvTimeoutError::Timeout) => (),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        let more = {
            let _gate = ticker.gate.lock().unwrap_or_else(PoisonError::into_inner);
            if ticker.stopped.load(Ordering::Acquire) {
                break;
            }
            delivering(|| ticker.observer.next(n))
        };
        if !more {
            ticker.stopped.store(true, Ordering::Release);
            ticker.finish();
            break;
        }
        n = n.wrapping_add(1);
        // Missed ticks are dropped, not delivered in a burst.
        deadline += interval;
        let now = Instant::now();
        if deadline <= now {
            deadline = now + interval;
        }
    }
    debug!("periodic: timer thread exiting");
}


#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::thread;
    use std::time::Duration;

    use crate::error::Error;
    use crate::testing::{ wait_until, Recorder };
    use super::*;

    const TICK: Duration = Duration::from_millis(5);

    #[test]
    fn emits_successive_integers() {
        let recorder = Recorder::new();
        let subscription = periodic(TICK).subscribe(recorder.observer());
        assert!(wait_until(Duration::from_secs(2), || recorder.values().len() >= 3));
        subscription.unsubscribe();
        let values = recorder.values();
        let expected: Vec<u64> = (0..values.len() as u64).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn cancel_stops_and_completes_once() {
        let recorder = Recorder::new();
        let subscription = periodic(TICK).subscribe(recorder.observer());
        assert!(wait_until(Duration::from_secs(2), || !recorder.values().is_empty()));
        subscription.unsubscribe();
        let seen = recorder.values().len();
        thread::sleep(TICK * 4);
        subscription.unsubscribe();
        assert_eq!(recorder.values().len(), seen);
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn rejected_tick_completes() {
        let recorder = Recorder::new();
        let subscription = periodic(TICK).subscribe(recorder.observer_accepting(2));
        assert!(wait_until(Duration::from_secs(2), || recorder.completions() == 1));
        assert_eq!(recorder.values(), vec![0, 1]);
        subscription.unsubscribe();
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn cancel_from_inside_callback() {
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let completions = Arc::new(AtomicUsize::new(0));
        let observer = Observer::new()
            .on_next({
                let slot = slot.clone();
                move |_| {
                    if let Some(subscription) = slot.lock().unwrap().clone() {
                        subscription.unsubscribe();
                    }
                    true
                }
            })
            .on_complete({
                let completions = completions.clone();
                move || { completions.fetch_add(1, Ordering::SeqCst); }
            });
        let subscription = periodic(TICK).subscribe(observer);
        *slot.lock().unwrap() = Some(subscription.clone());
        assert!(wait_until(Duration::from_secs(2), || subscription.is_closed()));
        assert!(wait_until(Duration::from_secs(2), || completions.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn cancel_from_callback_and_outside() {
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let ticks = Arc::new(AtomicUsize::new(0));
        let observer = Observer::new().on_next({
            let slot = slot.clone();
            let ticks = ticks.clone();
            move |_| {
                ticks.fetch_add(1, Ordering::SeqCst);
                thread::sleep(TICK);
                let subscription = slot.lock().unwrap().clone();
                if let Some(subscription) = subscription {
                    subscription.unsubscribe();
                }
                true
            }
        });
        let subscription = periodic(TICK).subscribe(observer);
        *slot.lock().unwrap() = Some(subscription.clone());
        assert!(wait_until(Duration::from_secs(2), || ticks.load(Ordering::SeqCst) >= 1));
        subscription.unsubscribe();
        let seen = ticks.load(Ordering::SeqCst);
        thread::sleep(TICK * 4);
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn zero_interval_is_an_error() {
        let recorder = Recorder::<u64>::new();
        let subscription = periodic(Duration::from_secs(0)).subscribe(recorder.observer());
        assert!(subscription.is_closed());
        assert_eq!(recorder.errors(), 1);
        assert_eq!(recorder.completions(), 0);
        assert!(matches!(recorder.last_error(), Some(Error::InvalidInterval)));
    }

    #[test]
    fn named_thread() {
        let names = Arc::new(Mutex::new(vec![]));
        let subscription = Periodic::new(TICK)
            .thread_name("rill-test-timer")
            .stream()
            .for_each({
                let names = names.clone();
                move |_| names.lock().unwrap()
                    .push(thread::current().name().map(String::from))
            });
        assert!(wait_until(Duration::from_secs(2), || !names.lock().unwrap().is_empty()));
        subscription.unsubscribe();
        assert_eq!(names.lock().unwrap()[0].as_deref(), Some("rill-test-timer"));
    }
}

//! Helper module for flatten

use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };

use log::trace;

use super::Stream;
use crate::error::Error;
use crate::observer::Observer;
use crate::subscription::Subscription;


/// Per-activation state of a flattened stream.
///
/// Every inner stream gets a new generation number. Notifications carrying
/// an outdated generation come from a stream that has been switched away
/// from and are dropped.
#[derive(Default)]
struct Switch {
    generation: u64,
    inner: Option<Subscription>,
    outer: Option<Subscription>,
    inner_live: bool,
    outer_done: bool,
    finished: bool,
    cancelled: bool,
    /// Downstream asked to stop.
    rejected: bool,
}

impl Switch {
    /// Mark the output as finished, if it should be. Returns whether the
    /// caller has to deliver completion.
    fn try_finish(&mut self) -> bool {
        let finish = self.outer_done && !self.inner_live && !self.finished;
        if finish {
            self.finished = true;
        }
        finish
    }

    /// Whether values of generation `generation` may still go downstream.
    fn accepts(&self, generation: u64) -> bool {
        self.generation == generation && self.inner_live
            && !self.rejected && !self.finished
    }
}

fn lock(state: &Mutex<Switch>) -> MutexGuard<'_, Switch> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn inner_completed<A>(state: &Mutex<Switch>, generation: u64, observer: &Observer<A>) {
    let finish = {
        let mut state = lock(state);
        if state.generation != generation || !state.inner_live {
            return;
        }
        state.inner_live = false;
        state.inner = None;
        state.try_finish()
    };
    if finish {
        trace!("flatten: inner and outer completed");
        observer.complete();
    }
}

/// Cancel both streams after downstream rejected a value.
///
/// May run inside the current inner stream's `next`, which is safe because
/// subscriptions tolerate being cancelled from their own callbacks.
fn rejected(state: &Mutex<Switch>) {
    let (inner, outer) = {
        let mut state = lock(state);
        state.rejected = true;
        (state.inner.take(), state.outer.take())
    };
    trace!("flatten: downstream stopped");
    for subscription in outer.into_iter().chain(inner) {
        subscription.unsubscribe();
    }
}

/// Deliver an error from either stream and cancel everything still running.
fn failed<A>(state: &Mutex<Switch>, observer: &Observer<A>, err: Error) {
    let (inner, outer) = {
        let mut state = lock(state);
        if state.finished {
            return;
        }
        state.finished = true;
        (state.inner.take(), state.outer.take())
    };
    observer.error(err);
    for subscription in inner.into_iter().chain(outer) {
        subscription.unsubscribe();
    }
}

fn switch_to<A>(state: &Arc<Mutex<Switch>>, observer: &Observer<A>, stream: Stream<A>) -> bool
    where A: Clone + Send + Sync + 'static,
{
    let (generation, previous) = {
        let mut state = lock(state);
        if state.cancelled || state.rejected || state.finished {
            return false;
        }
        state.generation += 1;
        state.inner_live = true;
        (state.generation, state.inner.take())
    };
    if let Some(previous) = previous {
        trace!("flatten: switching away from generation {}", generation - 1);
        previous.unsubscribe();
    }

    let inner = Observer::new()
        .on_next({
            let state = state.clone();
            let downstream = observer.clone();
            move |a| {
                if !lock(&state).accepts(generation) {
                    return false;
                }
                let more = downstream.next(a);
                if !more {
                    rejected(&state);
                }
                more
            }
        })
        .on_error({
            let state = state.clone();
            let downstream = observer.clone();
            move |err| {
                let current = lock(&state).generation == generation;
                if current {
                    failed(&state, &downstream, err);
                }
            }
        })
        .on_complete({
            let state = state.clone();
            let downstream = observer.clone();
            move || inner_completed(&state, generation, &downstream)
        });
    let subscription = stream.subscribe(inner);

    let (stale, more) = {
        let mut state = lock(state);
        let more = !state.rejected && !state.finished;
        if state.generation == generation && state.inner_live && !state.cancelled && more {
            state.inner = Some(subscription);
            (None, more)
        } else {
            (Some(subscription), more)
        }
    };
    if let Some(stale) = stale {
        stale.unsubscribe();
    }
    more
}

pub fn stream<A>(outer: &Stream<Stream<A>>) -> Stream<A>
    where A: Clone + Send + Sync + 'static,
{
    let outer = outer.clone();
    Stream::new(move |observer: Observer<A>| {
        let state = Arc::new(Mutex::new(Switch::default()));
        let outer_observer = Observer::new()
            .on_next({
                let state = state.clone();
                let observer = observer.clone();
                move |stream| switch_to(&state, &observer, stream)
            })
            .on_error({
                let state = state.clone();
                let observer = observer.clone();
                move |err| failed(&state, &observer, err)
            })
            .on_complete({
                let state = state.clone();
                let observer = observer.clone();
                move || {
                    let finish = {
                        let mut state = lock(&state);
                        state.outer_done = true;
                        state.try_finish()
                    };
                    if finish {
                        trace!("flatten: outer and inner completed");
                        observer.complete();
                    }
                }
            });
        let outer_subscription = outer.subscribe(outer_observer);
        let stopped = {
            let mut state = lock(&state);
            let stopped = state.rejected || state.finished;
            if !stopped {
                state.outer = Some(outer_subscription.clone());
            }
            stopped
        };
        if stopped {
            outer_subscription.unsubscribe();
        }
        Subscription::new(move || {
            let inner = {
                let mut state = lock(&state);
                state.cancelled = true;
                state.outer = None;
                state.inner.take()
            };
            outer_subscription.unsubscribe();
            if let Some(inner) = inner {
                inner.unsubscribe();
            }
        })
    })
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    use crate::collect;
    use crate::source::{ accept, of, Pusher };
    use crate::subscription::Subscription;
    use crate::testing::{ Notification, Recorder };
    use super::*;

    /// A stream tracking how many of its activations are live at once.
    fn tracked(live: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> (Pusher<i32>, Stream<i32>) {
        let (pusher, stream) = accept::<i32>();
        let tracked = Stream::new(move |observer| {
            let now = live.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            let subscription = stream.subscribe(observer);
            let live = live.clone();
            Subscription::new(move || {
                live.fetch_sub(1, Ordering::SeqCst);
                subscription.unsubscribe();
            })
        });
        (pusher, tracked)
    }

    #[test]
    fn flattens_finite_streams() {
        let recorder = Recorder::new();
        of(&[1, 3, 5]).map(|x| of(&[x])).flatten().subscribe(recorder.observer());
        assert_eq!(recorder.values(), vec![1, 3, 5]);
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn switch_map() {
        let flat = of(&[1, 2]).switch_map(|x| of(&[x; 2]));
        assert_eq!(flat.collect(collect::to_vec()), vec![1, 1, 2, 2]);
    }

    #[test]
    fn switches_to_latest() {
        let (outer, streams) = accept::<Stream<i32>>();
        let (sink1, stream1) = accept::<i32>();
        let (sink2, stream2) = accept::<i32>();
        let recorder = Recorder::new();
        let _sub = streams.flatten().subscribe(recorder.observer());

        // Nothing is connected yet
        assert!(!sink1.push(1));
        assert!(!sink2.push(2));

        // Now switch to stream 2
        assert!(outer.push(stream2.clone()));
        assert!(!sink1.push(3));
        assert!(sink2.push(4));

        // And then to stream 1, which disconnects stream 2
        assert!(outer.push(stream1));
        assert!(sink1.push(5));
        assert!(!sink2.push(6));
        assert!(!sink2.is_active());

        assert_eq!(recorder.values(), vec![4, 5]);
        assert_eq!(recorder.completions(), 0);
    }

    #[test]
    fn one_inner_stream_at_a_time() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (outer, streams) = accept::<Stream<i32>>();
        let recorder = Recorder::new();
        let subscription = streams.flatten().subscribe(recorder.observer());
        for _ in 0..5 {
            let (_pusher, inner) = tracked(live.clone(), peak.clone());
            assert!(outer.push(inner));
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(live.load(Ordering::SeqCst), 1);
        subscription.unsubscribe();
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_request_ends_switching() {
        let recorder = Recorder::new();
        of(&[of(&[1]), of(&[2]), of(&[3])])
            .flatten()
            .subscribe(recorder.observer_accepting(1));
        assert_eq!(recorder.values(), vec![1]);
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn stop_request_cancels_outer_and_inner() {
        let (outer, streams) = accept::<Stream<i32>>();
        let (inner, stream) = accept::<i32>();
        let recorder = Recorder::new();
        let _sub = streams.flatten().subscribe(recorder.observer_accepting(1));
        assert!(outer.push(stream));
        assert!(!inner.push(1));
        assert!(!outer.is_active());
        assert!(!inner.is_active());
        assert!(!outer.push(of(&[2])));
        assert_eq!(recorder.values(), vec![1]);
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn outer_error_cancels_inner() {
        let (inner, stream) = accept::<i32>();
        let streams = Stream::new(move |observer: Observer<Stream<i32>>| {
            observer.next(stream.clone());
            observer.error(Error::Poisoned);
            Subscription::empty()
        });
        let recorder = Recorder::new();
        streams.flatten().subscribe(recorder.observer());
        assert!(!inner.is_active());
        assert!(!inner.push(1));
        assert_eq!(recorder.errors(), 1);
        assert_eq!(recorder.completions(), 0);
    }

    #[test]
    fn inner_error_cancels_outer() {
        let (outer, streams) = accept::<Stream<i32>>();
        let failing = Stream::new(|observer: Observer<i32>| {
            observer.error(Error::Poisoned);
            Subscription::empty()
        });
        let recorder = Recorder::new();
        let _sub = streams.flatten().subscribe(recorder.observer());
        assert!(!outer.push(failing));
        assert!(!outer.is_active());
        assert_eq!(recorder.errors(), 1);
        assert_eq!(recorder.completions(), 0);
    }

    #[test]
    fn completes_after_outer_then_inner() {
        let (outer, streams) = accept::<Stream<i32>>();
        let (inner, stream) = accept::<i32>();
        let recorder = Recorder::new();
        let _sub = streams.flatten().subscribe(recorder.observer());
        assert!(outer.push(stream));
        outer.close();
        assert_eq!(recorder.completions(), 0);
        assert!(inner.push(7));
        inner.close();
        assert_eq!(recorder.notifications(),
                   vec![Notification::Next(7), Notification::Complete]);
    }

    #[test]
    fn completes_after_inner_then_outer() {
        let (outer, streams) = accept::<Stream<i32>>();
        let recorder = Recorder::new();
        let _sub = streams.flatten().subscribe(recorder.observer());
        assert!(outer.push(of(&[1, 2])));
        assert_eq!(recorder.completions(), 0);
        outer.close();
        assert_eq!(recorder.values(), vec![1, 2]);
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn replaced_inner_does_not_complete_output() {
        let (outer, streams) = accept::<Stream<i32>>();
        let (first, stream1) = accept::<i32>();
        let recorder = Recorder::new();
        let _sub = streams.flatten().subscribe(recorder.observer());
        assert!(outer.push(stream1));
        assert!(outer.push(Stream::never()));
        assert!(!first.is_active());
        outer.close();
        assert_eq!(recorder.completions(), 0);
    }

    #[test]
    fn cancel_stops_outer_and_inner() {
        let (outer, streams) = accept::<Stream<i32>>();
        let (inner, stream) = accept::<i32>();
        let recorder = Recorder::new();
        let subscription = streams.flatten().subscribe(recorder.observer());
        assert!(outer.push(stream));
        subscription.unsubscribe();
        assert!(!outer.is_active());
        assert!(!inner.is_active());
        assert_eq!(recorder.completions(), 1);
        assert!(!outer.push(Stream::empty()));
    }
}

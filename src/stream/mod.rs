//! Streams of values

use std::fmt;
use std::sync::{ Arc, Mutex, PoisonError };
use std::sync::atomic::{ AtomicUsize, Ordering };

use log::{ trace, warn };

use crate::collect::Collector;
use crate::error::{ Error, Result };
use crate::observer::Observer;
use crate::subscription::Subscription;

pub use self::events::Events;
pub use self::merge::merge;

mod events;
mod flatten;
mod merge;


type Activate<A> = dyn Fn(Observer<A>) -> Subscription + Send + Sync + 'static;


/// A stream of values.
///
/// A stream is a producer waiting for an observer. It does nothing until it
/// is activated with `subscribe` (or one of the terminal methods built on top
/// of it, like `for_each` or `collect`). Every activation is an independent
/// run with its own state and its own `Subscription`, so the same stream can
/// be activated many times.
///
/// Streams are cheap to clone; clones share the producer function.
///
/// # Protocol
///
/// A producer delivers any number of values through `next`, followed by at
/// most one terminal notification, either `complete` or `error`. A `next`
/// returning `false` asks the producer to stop. Cancelling the subscription
/// stops delivery as well and releases everything the activation owns.
/// Producers that can only end by cancellation (timers, pushers, listeners)
/// deliver `complete` as part of cancelling.
///
/// # Algebraic laws
///
/// Streams form a functor under `map`:
///
/// - The identity function is preserved: `a.map(|x| x) == a`,
/// - Function composition is respected: `a.map(f).map(g) == a.map(|x| g(f(x)))`.
///
/// Under `merge` the finite streams of one type form a monoid with
/// `Stream::empty()` as the neutral element, up to the interleaving of
/// values from different sources.
pub struct Stream<A> {
    activate: Arc<Activate<A>>,
}

impl<A> Clone for Stream<A> {
    fn clone(&self) -> Stream<A> {
        Stream { activate: self.activate.clone() }
    }
}

impl<A> fmt::Debug for Stream<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish()
    }
}

impl<A: Clone + Send + Sync + 'static> Stream<A> {
    /// Create a stream from a producer function.
    ///
    /// The function is called once per activation with the observer to feed
    /// and must return the subscription cancelling that activation.
    ///
    /// ```
    /// # use rill::{ Stream, Subscription, collect };
    /// let answers = Stream::new(|observer| {
    ///     observer.next(42);
    ///     observer.complete();
    ///     Subscription::empty()
    /// });
    /// assert_eq!(answers.collect(collect::to_vec()), vec![42]);
    /// ```
    pub fn new<F>(activate: F) -> Stream<A>
        where F: Fn(Observer<A>) -> Subscription + Send + Sync + 'static,
    {
        Stream { activate: Arc::new(activate) }
    }

    /// A stream that completes immediately without any values.
    pub fn empty() -> Stream<A> {
        Stream::new(|observer| {
            observer.complete();
            Subscription::empty()
        })
    }

    /// Create a stream that never fires. This can be useful in certain
    /// situations, where a stream is logically required, but no values are
    /// expected.
    pub fn never() -> Stream<A> {
        Stream::new(|_| Subscription::empty())
    }

    /// Activate the stream with an observer.
    ///
    /// This is the general terminal operation; all others are built on it.
    /// The observer is wrapped in a guard, so that nothing reaches it after
    /// its first terminal notification.
    pub fn subscribe(&self, observer: Observer<A>) -> Subscription {
        trace!("activating stream");
        (self.activate)(observer.guarded())
    }

    /// Activate the stream with a bare `next` callback.
    pub fn observe<F>(&self, f: F) -> Subscription
        where F: Fn(A) -> bool + Send + Sync + 'static,
    {
        self.subscribe(Observer::new().on_next(f))
    }

    /// Activate the stream and run a side effect for every value.
    ///
    /// Never asks the producer to stop.
    pub fn for_each<F>(&self, f: F) -> Subscription
        where F: Fn(A) + Send + Sync + 'static,
    {
        self.observe(move |a| { f(a); true })
    }

    /// Drive the stream into a collector and return the result.
    ///
    /// The result is taken as soon as the activation call returns, which
    /// covers every value of a synchronous producer such as `of`. Values an
    /// asynchronous producer would send later are rejected and the
    /// activation is cancelled; use `collect_blocking` to wait for those.
    ///
    /// ```
    /// # use rill::{ of, collect };
    /// let doubled = of(&[1, 2, 3]).map(|x| 2 * x).collect(collect::to_vec());
    /// assert_eq!(doubled, vec![2, 4, 6]);
    /// ```
    pub fn collect<C>(&self, collector: C) -> C::Output
        where C: Collector<A> + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Some(collector)));
        let subscription = self.observe({
            let slot = slot.clone();
            move |a| match slot.lock() {
                Ok(mut slot) => match slot.as_mut() {
                    Some(collector) => { collector.push(a); true },
                    None => false,
                },
                Err(_) => false,
            }
        });
        let collector = slot.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        subscription.unsubscribe();
        match collector {
            Some(collector) => collector.finish(),
            None => unreachable!("collector is only taken once"),
        }
    }

    /// Drive the stream into a collector, blocking until it completes.
    ///
    /// Returns the delivered error instead, if the stream fails.
    pub fn collect_blocking<C>(&self, mut collector: C) -> Result<C::Output>
        where C: Collector<A>,
    {
        let mut events = self.events();
        for a in &mut events {
            collector.push(a);
        }
        match events.take_error() {
            Some(err) => Err(err),
            None => Ok(collector.finish()),
        }
    }

    /// A blocking iterator over the stream.
    pub fn events(&self) -> Events<A> { Events::new(self) }

    /// Map the stream to another stream using a function.
    ///
    /// `map` applies a function to every value of this stream to create a
    /// new stream of type `B`.
    ///
    /// ```
    /// # use rill::{ of, collect };
    /// let plus_four = of(&[3]).map(|x| x + 4);
    /// assert_eq!(plus_four.collect(collect::to_vec()), vec![7]);
    /// ```
    pub fn map<B, F>(&self, f: F) -> Stream<B>
        where B: Clone + Send + Sync + 'static,
              F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.filter_map(move |a| Some(f(a)))
    }

    /// Filter a stream according to a predicate.
    ///
    /// `filter` creates a new stream that only forwards those values of the
    /// original stream that satisfy the predicate. Dropped values do not
    /// count as rejected: the producer keeps going.
    ///
    /// ```
    /// # use rill::{ of, collect };
    /// let small = of(&[2, 5, 12]).filter(|&x| (x >= 4) && (x <= 10));
    /// assert_eq!(small.collect(collect::to_vec()), vec![5]);
    /// ```
    pub fn filter<F>(&self, f: F) -> Stream<A>
        where F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.filter_map(move |a| if f(&a) { Some(a) } else { None })
    }

    /// Both filter and map a stream.
    ///
    /// ```
    /// # use rill::{ of, collect };
    /// let events = of(&[2, 4])
    ///     .filter_map(|i| if i > 3 { Some(i + 2) } else { None });
    /// assert_eq!(events.collect(collect::to_vec()), vec![6]);
    /// ```
    pub fn filter_map<B, F>(&self, f: F) -> Stream<B>
        where B: Clone + Send + Sync + 'static,
              F: Fn(A) -> Option<B> + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Stream::new(move |observer: Observer<B>| {
            let f = f.clone();
            let downstream = observer.clone();
            source.subscribe(observer.with_next(move |a| match f(a) {
                Some(b) => downstream.next(b),
                None => true,
            }))
        })
    }

    /// Forward at most `n` values.
    ///
    /// After the `n`th value the producer is asked to stop, whatever the
    /// downstream observer answered. With `n == 0` nothing is forwarded and
    /// the producer is stopped at its first value.
    ///
    /// ```
    /// # use rill::{ of, collect };
    /// let first = of(&[1, 2, 3, 4]).take(2);
    /// assert_eq!(first.collect(collect::to_vec()), vec![1, 2]);
    /// ```
    pub fn take(&self, n: usize) -> Stream<A> {
        let source = self.clone();
        Stream::new(move |observer: Observer<A>| {
            let taken = Arc::new(AtomicUsize::new(0));
            let downstream = observer.clone();
            source.subscribe(observer.with_next(move |a| {
                let count = taken.fetch_add(1, Ordering::AcqRel) + 1;
                if count > n {
                    return false;
                }
                downstream.next(a) && count < n
            }))
        })
    }

    /// Deliver `a` before anything else.
    ///
    /// The value is delivered during activation, before the upstream is
    /// activated. If it is rejected, the upstream is never activated.
    ///
    /// ```
    /// # use rill::{ of, collect };
    /// let events = of(&[2, 3]).start_with(1);
    /// assert_eq!(events.collect(collect::to_vec()), vec![1, 2, 3]);
    /// ```
    pub fn start_with(&self, a: A) -> Stream<A> {
        let source = self.clone();
        Stream::new(move |observer: Observer<A>| {
            if !observer.next(a.clone()) {
                return Subscription::empty();
            }
            source.subscribe(observer)
        })
    }

    /// Accumulate the stream's values, emitting every intermediate result.
    ///
    /// The initial value is delivered first, on activation. If it is
    /// rejected, the upstream is never activated. Each upstream value then
    /// updates the accumulator through `f`, and the new accumulator is
    /// delivered.
    ///
    /// Every update is applied exactly once, under a lock. The lock is
    /// released before the result goes downstream, so a downstream callback
    /// may push into the same pipeline. As a consequence, when the upstream
    /// delivers from several threads at once (e.g. a `merge` of pushers fed
    /// from different threads), intermediate results can arrive out of
    /// order. A single-threaded upstream always yields them in order.
    ///
    /// ```
    /// # use rill::{ of, collect };
    /// let sums = of(&[1, 2, 3]).reduce(10, |acc, x| acc + x);
    /// assert_eq!(sums.collect(collect::to_vec()), vec![10, 11, 13, 16]);
    /// ```
    pub fn reduce<B, F>(&self, initial: B, f: F) -> Stream<B>
        where B: Clone + Send + Sync + 'static,
              F: Fn(B, A) -> B + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Stream::new(move |observer: Observer<B>| {
            if !observer.next(initial.clone()) {
                return Subscription::empty();
            }
            let acc = Arc::new(Mutex::new(initial.clone()));
            let f = f.clone();
            let downstream = observer.clone();
            source.subscribe(observer.with_next(move |a| {
                let current = match acc.lock() {
                    Ok(mut acc) => {
                        let next = f(acc.clone(), a);
                        *acc = next.clone();
                        next
                    },
                    Err(_) => {
                        warn!("reduce: accumulator poisoned");
                        downstream.error(Error::Poisoned);
                        return false;
                    },
                };
                downstream.next(current)
            }))
        })
    }

    /// Merge with another stream.
    ///
    /// `merge` takes two streams and creates a new stream that forwards
    /// values from both. It completes once both have completed.
    ///
    /// ```
    /// # use rill::{ of, collect };
    /// let both = of(&[1, 2]).merge(&of(&[10]));
    /// assert_eq!(both.collect(collect::to_vec()), vec![1, 2, 10]);
    /// ```
    pub fn merge(&self, other: &Stream<A>) -> Stream<A> {
        merge(vec![self.clone(), other.clone()])
    }

    /// Map every value to a stream and switch to the most recent one.
    ///
    /// This is equivalent to `.map(f).flatten()`.
    pub fn switch_map<B, F>(&self, f: F) -> Stream<B>
        where B: Clone + Send + Sync + 'static,
              F: Fn(A) -> Stream<B> + Send + Sync + 'static,
    {
        self.map(f).flatten()
    }
}

impl<A: Clone + Send + Sync + 'static> Stream<Stream<A>> {
    /// Switch between streams.
    ///
    /// This takes a stream of streams and maps it to a new stream, which
    /// forwards all values from the most recent stream fired into it. The
    /// previous inner stream is cancelled before the next one is activated,
    /// so there is never more than one inner stream running.
    ///
    /// The result completes when the outer stream and the current inner
    /// stream have both completed.
    ///
    /// # Example
    ///
    /// ```
    /// # use rill::{ of, collect, Stream };
    /// let nested: Stream<Stream<i32>> = of(&[1, 3, 5]).map(|x| of(&[x, x + 1]));
    /// let flat = nested.flatten().collect(collect::to_vec());
    /// assert_eq!(flat, vec![1, 2, 3, 4, 5, 6]);
    /// ```
    pub fn flatten(&self) -> Stream<A> {
        flatten::stream(self)
    }
}

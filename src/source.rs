//! Stream sources.
//!
//! Finite sequences replayed on activation, pushers fed from the outside,
//! and adapters for external objects delivering values through a callback.

use std::fmt;
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };

use log::debug;

use crate::observer::Observer;
use crate::stream::Stream;
use crate::subscription::Subscription;


/// A stream replaying the items of an iterator.
///
/// The items are collected once. Every activation delivers all of them in
/// order on the activating thread, stopping early if a value is rejected,
/// and then completes. Nothing is left to cancel when activation returns.
pub fn from_iter<A, I>(items: I) -> Stream<A>
    where A: Clone + Send + Sync + 'static,
          I: IntoIterator<Item=A>,
{
    let items: Arc<[A]> = items.into_iter().collect::<Vec<_>>().into();
    Stream::new(move |observer| {
        for a in items.iter() {
            if !observer.next(a.clone()) {
                break;
            }
        }
        observer.complete();
        Subscription::empty()
    })
}

/// A stream replaying a slice of values.
pub fn of<A: Clone + Send + Sync + 'static>(items: &[A]) -> Stream<A> {
    from_iter(items.to_vec())
}

/// A stream delivering a single value.
pub fn once<A: Clone + Send + Sync + 'static>(a: A) -> Stream<A> {
    from_iter(Some(a))
}


type OnCancel = Arc<dyn Fn() + Send + Sync + 'static>;

/// The observer currently fed by a pusher, with the means to cancel it.
struct Registration<A> {
    generation: u64,
    observer: Observer<A>,
    subscription: Subscription,
}

struct Slot<A> {
    generation: u64,
    registration: Option<Registration<A>>,
}

fn lock<A>(slot: &Mutex<Slot<A>>) -> MutexGuard<'_, Slot<A>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}


/// The pushing end of a stream created by `accept`.
///
/// A pusher feeds at most one activation at a time. Pushing while no
/// activation is registered does nothing and returns `false`.
pub struct Pusher<A> {
    slot: Arc<Mutex<Slot<A>>>,
}

impl<A> Clone for Pusher<A> {
    fn clone(&self) -> Pusher<A> {
        Pusher { slot: self.slot.clone() }
    }
}

impl<A> fmt::Debug for Pusher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pusher")
            .field("active", &lock(&self.slot).registration.is_some())
            .finish()
    }
}

impl<A> Pusher<A> {
    /// Push a value to the registered observer.
    ///
    /// Returns whether the observer wants more. A rejected value cancels the
    /// activation, after which the pusher is idle again.
    pub fn push(&self, a: A) -> bool {
        let registration = lock(&self.slot).registration
            .as_ref()
            .map(|r| (r.observer.clone(), r.subscription.clone()));
        match registration {
            Some((observer, subscription)) => {
                let more = observer.next(a);
                if !more {
                    subscription.unsubscribe();
                }
                more
            },
            None => false,
        }
    }

    /// Push every item of an iterator, stopping at the first rejected one.
    ///
    /// Returns whether all items were accepted.
    pub fn feed<I: IntoIterator<Item=A>>(&self, items: I) -> bool {
        items.into_iter().all(|a| self.push(a))
    }

    /// Whether an activation is currently registered.
    pub fn is_active(&self) -> bool {
        lock(&self.slot).registration.is_some()
    }

    /// Cancel the registered activation, as if its subscription had been
    /// invoked.
    pub fn close(&self) {
        let subscription = lock(&self.slot).registration
            .as_ref()
            .map(|r| r.subscription.clone());
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }
}


/// Create a stream fed by pushing values into it.
///
/// Returns a pusher and the stream it feeds. Activating the stream registers
/// its observer with the pusher, replacing any previous registration. The
/// subscription unregisters it again and completes the observer.
///
/// ```
/// # use rill::{ accept, collect };
/// # use std::thread;
/// let (pusher, stream) = accept();
/// let mut events = stream.take(3).events();
/// thread::spawn(move || pusher.feed(vec![1, 2, 3]));
/// assert_eq!(events.by_ref().collect::<Vec<_>>(), vec![1, 2, 3]);
/// ```
pub fn accept<A>() -> (Pusher<A>, Stream<A>)
    where A: Clone + Send + Sync + 'static,
{
    accept_inner(None)
}

/// Like `accept`, but calls `on_cancel` after every cancelled activation.
pub fn accept_with<A, F>(on_cancel: F) -> (Pusher<A>, Stream<A>)
    where A: Clone + Send + Sync + 'static,
          F: Fn() + Send + Sync + 'static,
{
    accept_inner(Some(Arc::new(on_cancel)))
}

fn accept_inner<A>(on_cancel: Option<OnCancel>) -> (Pusher<A>, Stream<A>)
    where A: Clone + Send + Sync + 'static,
{
    let slot = Arc::new(Mutex::new(Slot { generation: 0, registration: None }));
    let pusher = Pusher { slot: slot.clone() };
    let stream = Stream::new(move |observer: Observer<A>| {
        let mut guard = lock(&slot);
        guard.generation += 1;
        let generation = guard.generation;
        let subscription = Subscription::new({
            let slot = slot.clone();
            let observer = observer.clone();
            let on_cancel = on_cancel.clone();
            move || {
                {
                    let mut slot = lock(&slot);
                    let current = slot.registration.as_ref()
                        .map_or(false, |r| r.generation == generation);
                    if current {
                        slot.registration = None;
                    }
                }
                debug!("pusher: cleared registration {}", generation);
                observer.complete();
                if let Some(on_cancel) = on_cancel {
                    on_cancel();
                }
            }
        });
        if guard.registration.is_some() {
            debug!("pusher: registration {} replaces an active one", generation);
        }
        guard.registration = Some(Registration {
            generation,
            observer,
            subscription: subscription.clone(),
        });
        subscription
    });
    (pusher, stream)
}


/// An external object delivering values through a single callback.
///
/// `listen` registers the callback, replacing any previous one; `close`
/// deregisters it and releases whatever the listener holds.
pub trait Listener<A>: Send + Sync {
    /// Register the callback receiving values.
    fn listen(&self, callback: Box<dyn Fn(A) + Send + Sync + 'static>);
    /// Deregister the callback.
    fn close(&self);
}

impl<A, L: Listener<A> + ?Sized> Listener<A> for Arc<L> {
    fn listen(&self, callback: Box<dyn Fn(A) + Send + Sync + 'static>) {
        (**self).listen(callback)
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Adapt a listener into a stream.
///
/// Every activation registers a callback forwarding values downstream. The
/// listener has no way to be told to stop, so a rejected value does not end
/// the activation; only cancelling it does. Cancelling closes the listener
/// and completes the observer.
pub fn from_listener<A, L>(listener: L) -> Stream<A>
    where A: Clone + Send + Sync + 'static,
          L: Listener<A> + 'static,
{
    let listener = Arc::new(listener);
    Stream::new(move |observer: Observer<A>| {
        listener.listen(Box::new({
            let observer = observer.clone();
            move |a| { observer.next(a); }
        }));
        let listener = listener.clone();
        Subscription::new(move || {
            debug!("listener: closing");
            listener.close();
            observer.complete();
        })
    })
}

//! Blocking iteration over a stream

use std::sync::{ Arc, Mutex };
use std::sync::mpsc::{ Receiver, channel };

use super::Stream;
use crate::error::Error;
use crate::observer::Observer;
use crate::subscription::Subscription;


enum Notification<A> {
    Next(A),
    Error(Error),
    Complete,
}


/// A blocking iterator over values in a stream.
///
/// Iteration ends when the stream completes, fails, or its producer goes
/// away without completing. A delivered error can be inspected afterwards
/// with `error`. Dropping the iterator cancels the activation.
///
/// ```
/// # use rill::accept;
/// let (pusher, stream) = accept();
/// let mut events = stream.events();
/// pusher.push(5);
/// assert_eq!(events.next(), Some(5));
/// ```
pub struct Events<A> {
    receiver: Receiver<Notification<A>>,
    subscription: Subscription,
    error: Option<Error>,
    done: bool,
}

impl<A: Clone + Send + Sync + 'static> Events<A> {
    /// Create a new events iterator.
    pub(super) fn new(stream: &Stream<A>) -> Events<A> {
        let (tx, rx) = channel();
        let tx = Mutex::new(tx);
        let send = move |notification| match tx.lock() {
            Ok(tx) => tx.send(notification).is_ok(),
            Err(_) => false,
        };
        let send = Arc::new(send);
        let observer = Observer::new()
            .on_next({
                let send = send.clone();
                move |a| send(Notification::Next(a))
            })
            .on_error({
                let send = send.clone();
                move |err| { send(Notification::Error(err)); }
            })
            .on_complete(move || { send(Notification::Complete); });
        Events {
            receiver: rx,
            subscription: stream.subscribe(observer),
            error: None,
            done: false,
        }
    }
}

impl<A> Events<A> {
    /// The error that ended iteration, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Take the error that ended iteration, if any.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Cancel the underlying activation. Values already delivered can still
    /// be iterated.
    pub fn cancel(&self) {
        self.subscription.unsubscribe();
    }
}

impl<A> Iterator for Events<A> {
    type Item = A;

    fn next(&mut self) -> Option<A> {
        if self.done {
            return None;
        }
        match self.receiver.recv() {
            Ok(Notification::Next(a)) => Some(a),
            Ok(Notification::Error(err)) => {
                self.error = Some(err);
                self.done = true;
                None
            },
            Ok(Notification::Complete) | Err(_) => {
                self.done = true;
                None
            },
        }
    }
}

impl<A> Drop for Events<A> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

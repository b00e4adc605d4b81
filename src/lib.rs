//! Push-based reactive streams with composable cancellation
//!
//! *Rill* lets you build pipelines of values pushed from a source through a
//! chain of operators into a consumer. Nothing happens until a pipeline is
//! activated; every activation is an independent run, which hands back a
//! single `Subscription` to stop the whole chain at once.
//!
//!
//! # Streams, observers and subscriptions
//!
//! A `Stream` is a producer waiting for an `Observer`. Activating it with
//! `subscribe` (or one of the terminal methods built on it) starts the
//! producer, which then calls the observer's `next` for every value. `next`
//! answers whether it wants more, so a consumer can stop a producer without
//! holding on to anything. A producer ends with at most one terminal
//! notification, `complete` or `error`.
//!
//! Sources come in three flavours:
//!
//! - finite sequences (`of`, `from_iter`, `once`), replayed synchronously on
//!   every activation,
//! - timer streams (`periodic`), each activation running its own thread,
//! - streams fed from the outside, either by hand through a `Pusher`
//!   (`accept`) or by an external object implementing `Listener`
//!   (`from_listener`).
//!
//! The operators are methods of `Stream`: `map`, `filter`, `take`,
//! `start_with`, `reduce`, `merge` and `flatten` for streams of streams.
//!
//!
//! # Example
//!
//! ```
//! # // NOTE: If you change this example, please update the README.md
//! # // accordingly, so that they remain in sync!
//! use rill::{ accept, collect, of };
//!
//! // A finite stream is replayed synchronously on every activation
//! let sums = of(&[1, 2, 3]).reduce(0, |acc, x| acc + x);
//! assert_eq!(sums.collect(collect::to_vec()), vec![0, 1, 3, 6]);
//!
//! // Values can also be pushed in from the outside
//! let (pusher, stream) = accept();
//! let mut events = stream.map(|x: i32| x * x).events();
//! pusher.push(4);
//! assert_eq!(events.next(), Some(16));
//!
//! // Cancelling the activation makes the pusher idle again
//! events.cancel();
//! assert!(!pusher.push(5));
//! ```
//!
//! Every method also exists as a free function in `ops`, returning a
//! closure, so pipelines can be spelled as a flat list with `pipe!`.
//!
//!
//! # Threads
//!
//! Streams, observers, subscriptions and pushers are all `Send + Sync +
//! Clone`. Asynchronous sources call their observers from whatever thread
//! produces the values: the timer thread, or the thread calling
//! `Pusher::push`. A merged stream may therefore call one observer from
//! several threads at once.
//!
//! No internal lock is held while a callback runs, so callbacks are free to
//! cancel their own pipeline.

#![warn(missing_docs)]

pub use crate::error::{ Error, Result };
pub use crate::observer::Observer;
pub use crate::subscription::Subscription;
pub use crate::stream::{ Stream, Events, merge };
pub use crate::source::{ from_iter, of, once, accept, accept_with, from_listener,
                         Listener, Pusher };
pub use crate::timer::{ periodic, Periodic };
pub use crate::collect::Collector;
pub use crate::pipe::Pipe;

#[macro_use]
mod pipe;
mod error;
mod observer;
mod subscription;
mod stream;
mod source;
mod timer;
pub mod collect;
pub mod ops;
#[cfg(test)]
mod testing;

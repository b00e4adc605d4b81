//! Operators as free functions.
//!
//! Each function here returns a closure taking a stream, so that pipelines
//! can be written with `pipe!` or `Pipe::pipe` as a flat list of steps
//! instead of a method chain. The closures only forward to the methods of
//! `Stream`, which document the actual semantics.
//!
//! ```
//! # #[macro_use] extern crate rill;
//! # use rill::{ of, ops, collect };
//! # fn main() {
//! let sums = pipe!(
//!     of(&[2, 4, 6, 8]),
//!     ops::filter(|&x: &i32| x > 2),
//!     ops::reduce(0, |acc, x| acc + x),
//!     ops::collect(collect::to_vec()),
//! );
//! assert_eq!(sums, vec![0, 4, 10, 18]);
//! # }
//! ```

use crate::collect::Collector;
use crate::observer::Observer;
use crate::stream::Stream;
use crate::subscription::Subscription;


/// See `Stream::map`.
pub fn map<A, B, F>(f: F) -> impl FnOnce(Stream<A>) -> Stream<B>
    where A: Clone + Send + Sync + 'static,
          B: Clone + Send + Sync + 'static,
          F: Fn(A) -> B + Send + Sync + 'static,
{
    move |stream| stream.map(f)
}

/// See `Stream::filter`.
pub fn filter<A, F>(f: F) -> impl FnOnce(Stream<A>) -> Stream<A>
    where A: Clone + Send + Sync + 'static,
          F: Fn(&A) -> bool + Send + Sync + 'static,
{
    move |stream| stream.filter(f)
}

/// See `Stream::take`.
pub fn take<A>(n: usize) -> impl FnOnce(Stream<A>) -> Stream<A>
    where A: Clone + Send + Sync + 'static,
{
    move |stream| stream.take(n)
}

/// See `Stream::start_with`.
pub fn start_with<A>(a: A) -> impl FnOnce(Stream<A>) -> Stream<A>
    where A: Clone + Send + Sync + 'static,
{
    move |stream| stream.start_with(a)
}

/// See `Stream::reduce`.
pub fn reduce<A, B, F>(initial: B, f: F) -> impl FnOnce(Stream<A>) -> Stream<B>
    where A: Clone + Send + Sync + 'static,
          B: Clone + Send + Sync + 'static,
          F: Fn(B, A) -> B + Send + Sync + 'static,
{
    move |stream| stream.reduce(initial, f)
}

/// See `Stream::flatten`.
pub fn flatten<A>() -> impl FnOnce(Stream<Stream<A>>) -> Stream<A>
    where A: Clone + Send + Sync + 'static,
{
    |stream| stream.flatten()
}

/// Merge the piped stream with `others`.
pub fn merge_with<A, I>(others: I) -> impl FnOnce(Stream<A>) -> Stream<A>
    where A: Clone + Send + Sync + 'static,
          I: IntoIterator<Item=Stream<A>>,
{
    move |stream| crate::stream::merge(Some(stream).into_iter().chain(others))
}

/// See `Stream::subscribe`.
pub fn subscribe<A>(observer: Observer<A>) -> impl FnOnce(Stream<A>) -> Subscription
    where A: Clone + Send + Sync + 'static,
{
    move |stream| stream.subscribe(observer)
}

/// See `Stream::observe`.
pub fn observe<A, F>(f: F) -> impl FnOnce(Stream<A>) -> Subscription
    where A: Clone + Send + Sync + 'static,
          F: Fn(A) -> bool + Send + Sync + 'static,
{
    move |stream| stream.observe(f)
}

/// See `Stream::for_each`.
pub fn for_each<A, F>(f: F) -> impl FnOnce(Stream<A>) -> Subscription
    where A: Clone + Send + Sync + 'static,
          F: Fn(A) + Send + Sync + 'static,
{
    move |stream| stream.for_each(f)
}

/// See `Stream::collect`.
pub fn collect<A, C>(collector: C) -> impl FnOnce(Stream<A>) -> C::Output
    where A: Clone + Send + Sync + 'static,
          C: Collector<A> + Send + 'static,
{
    move |stream| stream.collect(collector)
}

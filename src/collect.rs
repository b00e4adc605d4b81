//! Collectors for terminal accumulation.
//!
//! A collector receives every value of a stream driven by `Stream::collect`
//! or `Stream::collect_blocking` and turns them into one result.

use std::collections::HashSet;
use std::hash::Hash;


/// Accumulates stream values into a result.
pub trait Collector<A> {
    /// The collected result.
    type Output;

    /// Take one value.
    fn push(&mut self, a: A);

    /// Produce the result.
    fn finish(self) -> Self::Output;
}

impl<A> Collector<A> for Vec<A> {
    type Output = Vec<A>;
    fn push(&mut self, a: A) { Vec::push(self, a) }
    fn finish(self) -> Vec<A> { self }
}

impl<A: Eq + Hash> Collector<A> for HashSet<A> {
    type Output = HashSet<A>;
    fn push(&mut self, a: A) { self.insert(a); }
    fn finish(self) -> HashSet<A> { self }
}


/// Collect values in arrival order.
pub fn to_vec<A>() -> Vec<A> { Vec::new() }

/// Collect the distinct values.
pub fn to_set<A: Eq + Hash>() -> HashSet<A> { HashSet::new() }


/// Keeps only the most recent value.
#[derive(Debug)]
pub struct Last<A>(Option<A>);

impl<A> Collector<A> for Last<A> {
    type Output = Option<A>;
    fn push(&mut self, a: A) { self.0 = Some(a); }
    fn finish(self) -> Option<A> { self.0 }
}

/// Collect the most recent value, if there was any.
pub fn last<A>() -> Last<A> { Last(None) }


/// Folds values into an accumulator with a closure.
#[derive(Debug)]
pub struct Fold<B, F> {
    acc: B,
    f: F,
}

impl<A, B, F: FnMut(&mut B, A)> Collector<A> for Fold<B, F> {
    type Output = B;
    fn push(&mut self, a: A) { (self.f)(&mut self.acc, a) }
    fn finish(self) -> B { self.acc }
}

/// Collect by folding every value into `init` with `f`.
///
/// ```
/// # use rill::{ of, collect };
/// let total = of(&[1, 2, 3]).collect(collect::fold(0, |sum: &mut i32, x: i32| *sum += x));
/// assert_eq!(total, 6);
/// ```
pub fn fold<A, B, F: FnMut(&mut B, A)>(init: B, f: F) -> Fold<B, F> {
    Fold { acc: init, f }
}

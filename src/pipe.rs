//! Left-to-right function application.

/// Apply a function to a value in method position.
///
/// Implemented for every type, so that operator functions from `ops` chain
/// like methods:
///
/// ```
/// # use rill::{ of, ops, Pipe };
/// let sum = of(&[1, 2, 3])
///     .pipe(ops::reduce(0, |acc, x| acc + x))
///     .pipe(ops::collect(rill::collect::last()));
/// assert_eq!(sum, Some(6));
/// ```
pub trait Pipe: Sized {
    /// Apply `f` to `self`.
    fn pipe<R, F: FnOnce(Self) -> R>(self, f: F) -> R {
        f(self)
    }
}

impl<T> Pipe for T {}


/// Apply a chain of functions to a value, left to right.
///
/// `pipe!(a, f, g, h)` is `h(g(f(a)))`. Any number of functions may follow
/// the initial value.
///
/// ```
/// # #[macro_use] extern crate rill;
/// # use rill::{ of, ops, collect };
/// # fn main() {
/// let count = pipe!(
///     of(&[1, 2, 3, 4, 5, 6]),
///     ops::take(5),
///     ops::map(|i: i32| i * 2),
///     ops::start_with(10),
///     ops::collect(collect::to_vec()),
/// );
/// assert_eq!(count, vec![10, 2, 4, 6, 8, 10]);
/// # }
/// ```
#[macro_export]
macro_rules! pipe {
    ($value:expr) => { $value };
    ($value:expr, $($f:expr),+ $(,)?) => {{
        let value = $value;
        $( let value = ($f)(value); )+
        value
    }};
}

//! The error channel shared by all observers.

use std::io;
use std::sync::Arc;

use thiserror::Error;


/// An error delivered through an observer's `error` callback.
///
/// Errors are cheap to clone, because `merge` hands the same error callback
/// to several producers.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A periodic source was configured with a zero interval.
    #[error("periodic interval must be greater than zero")]
    InvalidInterval,
    /// The background thread of a periodic source could not be started.
    #[error("failed to spawn timer thread: {0}")]
    Spawn(#[source] Arc<io::Error>),
    /// A lock guarding per-activation state was poisoned by a panicking
    /// callback.
    #[error("stream state poisoned by a panicking callback")]
    Poisoned,
    /// An error raised by a user-defined producer.
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wrap an arbitrary error for delivery through an observer.
    pub fn other<E>(err: E) -> Error
        where E: std::error::Error + Send + Sync + 'static
    {
        Error::Other(Arc::new(err))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Spawn(Arc::new(err))
    }
}

/// Shorthand for results carrying a stream error.
pub type Result<T> = std::result::Result<T, Error>;

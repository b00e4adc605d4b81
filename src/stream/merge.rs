//! Helper module for merge

use std::sync::Arc;
use std::sync::atomic::{ AtomicUsize, Ordering };

use log::trace;

use super::Stream;
use crate::observer::Observer;
use crate::subscription::Subscription;


/// Merge any number of streams into one.
///
/// All sources are activated against the same downstream observer. Values
/// are forwarded as they arrive, without any ordering between sources, so
/// the observer must cope with concurrent calls if the sources run on
/// different threads. The merged stream completes once every source has
/// completed; merging nothing completes immediately.
///
/// Cancelling the merged stream cancels every source.
///
/// ```
/// # use rill::{ merge, of, collect };
/// let all = merge(vec![of(&[1, 2]), of(&[3]), of(&[4, 5])]);
/// assert_eq!(all.collect(collect::to_vec()), vec![1, 2, 3, 4, 5]);
/// ```
pub fn merge<A, I>(streams: I) -> Stream<A>
    where A: Clone + Send + Sync + 'static,
          I: IntoIterator<Item=Stream<A>>,
{
    let streams: Vec<_> = streams.into_iter().collect();
    Stream::new(move |observer: Observer<A>| {
        if streams.is_empty() {
            observer.complete();
            return Subscription::empty();
        }
        let remaining = Arc::new(AtomicUsize::new(streams.len()));
        let subscriptions: Vec<_> = streams.iter()
            .map(|stream| {
                let remaining = remaining.clone();
                let downstream = observer.clone();
                stream.subscribe(observer.with_complete(move || {
                    if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                        trace!("merge: all sources completed");
                        downstream.complete();
                    }
                }))
            })
            .collect();
        Subscription::all(subscriptions)
    })
}

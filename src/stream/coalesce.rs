//! Update coalescing for slow viewers

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

use crate::publish::Publication;

/// Extension trait to coalesce leaderboard updates on a publication stream
pub trait CoalesceExt: Stream<Item = Publication> {
    /// Emit at most one `update` per interval.
    ///
    /// Uses "latest-wins" semantics for updates: if several arrive during an
    /// interval only the newest is emitted. `mode` and `finish` publications
    /// are never dropped or delayed, but a pending update is flushed ahead of
    /// them so the stream keeps its order.
    fn coalesce_updates(self, period: Duration) -> CoalesceUpdates<Self>
    where
        Self: Sized,
    {
        CoalesceUpdates::new(self, period)
    }
}

impl<T: Stream<Item = Publication>> CoalesceExt for T {}

pin_project! {
    /// Stream returned by [`CoalesceExt::coalesce_updates`]
    pub struct CoalesceUpdates<S> {
        #[pin]
        stream: S,
        interval: Interval,
        pending_update: Option<Publication>,
        held: Option<Publication>,
        done: bool,
    }
}

impl<S: Stream<Item = Publication>> CoalesceUpdates<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending_update: None, held: None, done: false }
    }
}

impl<S: Stream<Item = Publication>> Stream for CoalesceUpdates<S> {
    type Item = Publication;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if this.pending_update.is_none() && this.held.is_some() {
            return Poll::Ready(this.held.take());
        }

        // Drain what is ready, stopping at the first non-update
        while !*this.done && this.held.is_none() {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(publication)) if publication.is_update() => {
                    *this.pending_update = Some(publication);
                }
                Poll::Ready(Some(publication)) => {
                    if this.pending_update.is_none() {
                        return Poll::Ready(Some(publication));
                    }
                    *this.held = Some(publication);
                }
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => break,
            }
        }

        if this.pending_update.is_some() {
            let flush = this.held.is_some() || *this.done || this.interval.poll_tick(cx).is_ready();
            if flush {
                return Poll::Ready(this.pending_update.take());
            }
            return Poll::Pending;
        }

        if let Some(held) = this.held.take() {
            return Poll::Ready(Some(held));
        }
        if *this.done {
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}

//! # Event Subscription
//!
//! A `Subscription` wraps a broadcast receiver with an `EventFilter`,
//! skipping events the subscriber didn't ask for. `EventStream` adapts one
//! into a `futures`-free `tokio_stream::Stream` for callers that want to
//! `.await` in a loop or compose with stream combinators.

use crate::events::{EventFilter, GraphEvent};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::Stream;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("subscriber lagged, {0} events skipped")]
    Lagged(u64),
    #[error("event bus closed")]
    Closed,
}

/// A live subscription to a `GraphEvent` stream, filtered server-side.
pub struct Subscription {
    receiver: broadcast::Receiver<GraphEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<GraphEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Wait for the next event matching this subscription's filter.
    pub async fn recv(&mut self) -> Result<GraphEvent, SubscriptionError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(SubscriptionError::Lagged(n))
                }
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Non-blocking poll for the next matching event already buffered.
    pub fn try_recv(&mut self) -> Result<Option<GraphEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Err(SubscriptionError::Lagged(n))
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
            }
        }
    }

    /// Adapt this subscription into a `Stream`.
    #[must_use]
    pub fn into_stream(self) -> EventStream {
        EventStream { subscription: self }
    }
}

/// `Stream` adapter over a `Subscription`. Ends (`None`) once the bus is
/// closed; lag errors are swallowed and resumed past, since a missed batch
/// of events should not terminate a long-lived subscriber.
pub struct EventStream {
    subscription: Subscription,
}

impl Stream for EventStream {
    type Item = GraphEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let fut = this.subscription.recv();
        tokio::pin!(fut);
        match fut.poll(cx) {
            Poll::Ready(Ok(event)) => Poll::Ready(Some(event)),
            Poll::Ready(Err(SubscriptionError::Closed)) => Poll::Ready(None),
            Poll::Ready(Err(SubscriptionError::Lagged(_))) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

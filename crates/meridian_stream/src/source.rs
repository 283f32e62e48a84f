//! Stream- and channel-backed sequence sources.

use core::pin::pin;
use core::sync::atomic::{AtomicBool, Ordering};

use futures::channel::mpsc::UnboundedSender;
use futures::future::{self, BoxFuture, Either};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::sync::{Mutex, MutexGuard, Notify};

use crate::sequence::AsyncSequence;

// ─────────────────────────────────────────────────────────────────────────────
// StreamSource
// ─────────────────────────────────────────────────────────────────────────────

/// Adapts a [`Stream`] into an [`AsyncSequence`].
///
/// `next` holds the stream lock while it waits on the stream, racing that
/// wait against the close signal. `close` only flips the flag and signals;
/// it takes the lock opportunistically and never waits for it. Whoever
/// holds the lock once the flag is set drops the stream, even when the
/// pending `next` is itself dropped before it wakes.
pub(crate) struct StreamSource<T, E> {
    stream: Mutex<Option<BoxedStream<T, E>>>,
    closed: AtomicBool,
    close_signal: Notify,
}

impl<T, E> StreamSource<T, E> {
    pub(crate) fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
    {
        Self {
            stream: Mutex::new(Some(stream.boxed())),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        }
    }
}

type BoxedStream<T, E> = BoxStream<'static, Result<T, E>>;

/// Lock on the stream that releases it on drop if the source was closed.
struct StreamLock<'a, T, E> {
    guard: MutexGuard<'a, Option<BoxedStream<T, E>>>,
    closed: &'a AtomicBool,
}

impl<T, E> Drop for StreamLock<'_, T, E> {
    fn drop(&mut self) {
        if self.closed.load(Ordering::Acquire) && self.guard.take().is_some() {
            tracing::trace!("sequence source released by pending next");
        }
    }
}

enum Step<I> {
    Closed,
    Item(Option<I>),
}

impl<T: Send + 'static, E: Send + 'static> AsyncSequence for StreamSource<T, E> {
    type Item = T;
    type Error = E;

    fn next(&self) -> BoxFuture<'_, Option<Result<T, E>>> {
        Box::pin(async move {
            // Registered before the flag check so a concurrent close is never missed.
            let closed = pin!(self.close_signal.notified());
            if self.closed.load(Ordering::Acquire) {
                if let Ok(mut guard) = self.stream.try_lock() {
                    guard.take();
                }
                return None;
            }

            let mut lock = StreamLock {
                guard: self.stream.lock().await,
                closed: &self.closed,
            };
            let stream = lock.guard.as_mut()?;
            let step = match future::select(closed, stream.next()).await {
                Either::Left(_) => Step::Closed,
                Either::Right((item, _)) => Step::Item(item),
            };

            match step {
                Step::Item(Some(item)) => Some(item),
                Step::Item(None) | Step::Closed => {
                    lock.guard.take();
                    None
                }
            }
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            self.close_signal.notify_waiters();
            // A pending `next` owns the lock; it drops the stream once it wakes.
            if let Ok(mut guard) = self.stream.try_lock() {
                guard.take();
            }
            tracing::trace!("sequence source closed");
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SequenceSender
// ─────────────────────────────────────────────────────────────────────────────

/// Error returned when sending into a sequence whose consumer has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SequenceSendError {
    /// The sequence was closed or dropped.
    #[error("sequence has been closed by its consumer")]
    Closed,
}

/// Producer half of [`Sequence::channel`](crate::Sequence::channel).
pub struct SequenceSender<T, E> {
    tx: UnboundedSender<Result<T, E>>,
}

impl<T, E> Clone for SequenceSender<T, E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T, E> SequenceSender<T, E> {
    pub(crate) fn new(tx: UnboundedSender<Result<T, E>>) -> Self {
        Self { tx }
    }

    /// Pushes an item to the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceSendError::Closed`] if the sequence was closed.
    pub fn send(&self, item: T) -> Result<(), SequenceSendError> {
        self.tx
            .unbounded_send(Ok(item))
            .map_err(|_| SequenceSendError::Closed)
    }

    /// Pushes an error to the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceSendError::Closed`] if the sequence was closed.
    pub fn fail(&self, error: E) -> Result<(), SequenceSendError> {
        self.tx
            .unbounded_send(Err(error))
            .map_err(|_| SequenceSendError::Closed)
    }

    /// Ends the sequence after any items already sent.
    pub fn finish(&self) {
        self.tx.close_channel();
    }

    /// Returns `true` once the consumer has closed or dropped the sequence.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

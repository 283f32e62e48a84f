//! The [`AsyncSequence`] trait and its type-erased [`Sequence`] handle.

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use futures::Stream;
use futures::future::BoxFuture;

use crate::complete::{CompletionCallback, OnComplete};
use crate::map::MapItems;
use crate::rewrite::{ErrorRewriter, RewriteErrors};
use crate::source::{SequenceSender, StreamSource};

// ─────────────────────────────────────────────────────────────────────────────
// AsyncSequence
// ─────────────────────────────────────────────────────────────────────────────

/// A pull-based asynchronous sequence with an independent close operation.
///
/// Implementors must keep the two operations independent: `close` may be
/// called while a `next` call is still pending, and it must complete without
/// waiting for that call to settle. A pending `next` observing a close should
/// resolve to `None`.
pub trait AsyncSequence: Send + Sync + 'static {
    /// The item type yielded on success.
    type Item: Send + 'static;
    /// The error type yielded when producing an item fails.
    type Error: Send + 'static;

    /// Requests the next item. `None` means the sequence is finished.
    fn next(&self) -> BoxFuture<'_, Option<Result<Self::Item, Self::Error>>>;

    /// Requests that the sequence stop producing items and release its source.
    fn close(&self) -> BoxFuture<'_, ()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Sequence
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased, shareable handle to an [`AsyncSequence`].
///
/// Cloning a `Sequence` clones the handle, not the underlying source: every
/// clone pulls from, and closes, the same sequence.
pub struct Sequence<T, E> {
    inner: Arc<dyn AsyncSequence<Item = T, Error = E>>,
}

impl<T, E> Clone for Sequence<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Sequence<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence").finish_non_exhaustive()
    }
}

impl<T: Send + 'static, E: Send + 'static> Sequence<T, E> {
    /// Wraps a custom [`AsyncSequence`] implementation.
    #[must_use]
    pub fn new<S>(source: S) -> Self
    where
        S: AsyncSequence<Item = T, Error = E>,
    {
        Self {
            inner: Arc::new(source),
        }
    }

    /// Adapts a [`Stream`] of results.
    ///
    /// Closing the sequence drops the stream. A `next` call that is waiting
    /// on the stream when `close` is called resolves to `None`.
    #[must_use]
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
    {
        Self::new(StreamSource::new(stream))
    }

    /// Creates a finite sequence from already-available items.
    #[must_use]
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Result<T, E>>,
        I::IntoIter: Send + 'static,
    {
        Self::from_stream(futures::stream::iter(items))
    }

    /// Creates an unbounded channel-backed sequence.
    ///
    /// The sender observes [`SequenceSender::is_closed`] once the sequence is
    /// closed by its consumer.
    #[must_use]
    pub fn channel() -> (SequenceSender<T, E>, Self) {
        let (tx, rx) = futures::channel::mpsc::unbounded();
        (SequenceSender::new(tx), Self::from_stream(rx))
    }

    /// Requests the next item. `None` means the sequence is finished.
    pub fn next(&self) -> BoxFuture<'_, Option<Result<T, E>>> {
        self.inner.next()
    }

    /// Closes the sequence.
    ///
    /// Resolves without waiting for any `next` call that is still pending.
    pub fn close(&self) -> BoxFuture<'_, ()> {
        self.inner.close()
    }

    /// Returns `true` if both handles point at the same underlying sequence.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Converts the handle into a [`Stream`] that ends when the sequence does.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, E>> + Send + 'static {
        futures::stream::unfold(self, |sequence| async move {
            let item = sequence.next().await?;
            Some((item, sequence))
        })
    }

    /// Threads each successful item through `map` before it is yielded.
    ///
    /// Errors from the source pass through untouched. Errors returned by
    /// `map` are yielded in place of the item.
    #[must_use]
    pub fn map_items<U, F, Fut>(self, map: F) -> Sequence<U, E>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
    {
        Sequence::new(MapItems::new(self, map))
    }

    /// Runs `callbacks` once, in order, when the sequence reports no more
    /// items or is closed, whichever happens first.
    #[must_use]
    pub fn on_complete(self, callbacks: Vec<CompletionCallback>) -> Self {
        if callbacks.is_empty() {
            return self;
        }
        Self::new(OnComplete::new(self, callbacks))
    }

    /// Folds every error through `rewriters`, in order, before yielding it.
    ///
    /// The sequence terminates after the first error: the source is closed and
    /// later `next` calls resolve to `None`.
    #[must_use]
    pub fn rewrite_errors(self, rewriters: Vec<ErrorRewriter<E>>) -> Self {
        Self::new(RewriteErrors::new(self, rewriters))
    }
}

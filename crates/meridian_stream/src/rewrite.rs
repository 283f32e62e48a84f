use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::sequence::{AsyncSequence, Sequence};

/// Rewrites an error on its way to the consumer.
pub type ErrorRewriter<E> = Arc<dyn Fn(E) -> E + Send + Sync>;

/// Error rewriter. Yields at most one error, then reports exhaustion.
pub(crate) struct RewriteErrors<T, E> {
    source: Sequence<T, E>,
    rewriters: Vec<ErrorRewriter<E>>,
    terminated: AtomicBool,
}

impl<T, E> RewriteErrors<T, E> {
    pub(crate) fn new(source: Sequence<T, E>, rewriters: Vec<ErrorRewriter<E>>) -> Self {
        Self {
            source,
            rewriters,
            terminated: AtomicBool::new(false),
        }
    }
}

impl<T: Send + 'static, E: Send + 'static> AsyncSequence for RewriteErrors<T, E> {
    type Item = T;
    type Error = E;

    fn next(&self) -> BoxFuture<'_, Option<Result<T, E>>> {
        Box::pin(async move {
            if self.terminated.load(Ordering::Acquire) {
                return None;
            }
            match self.source.next().await {
                Some(Err(error)) => {
                    let error = self
                        .rewriters
                        .iter()
                        .fold(error, |error, rewrite| rewrite(error));
                    self.terminated.store(true, Ordering::Release);
                    self.source.close().await;
                    Some(Err(error))
                }
                other => other,
            }
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.source.close()
    }
}

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::sequence::{AsyncSequence, Sequence};

/// Zero-argument callback run when a sequence completes.
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Completion notifier. The callback list is taken on first completion, so
/// exhaustion and close racing each other still run it once.
pub(crate) struct OnComplete<T, E> {
    source: Sequence<T, E>,
    callbacks: Mutex<Option<Vec<CompletionCallback>>>,
}

impl<T, E> OnComplete<T, E> {
    pub(crate) fn new(source: Sequence<T, E>, callbacks: Vec<CompletionCallback>) -> Self {
        Self {
            source,
            callbacks: Mutex::new(Some(callbacks)),
        }
    }

    fn fire(&self) {
        let pending = self.callbacks.lock().take();
        if let Some(callbacks) = pending {
            for callback in callbacks {
                callback();
            }
        }
    }
}

impl<T: Send + 'static, E: Send + 'static> AsyncSequence for OnComplete<T, E> {
    type Item = T;
    type Error = E;

    fn next(&self) -> BoxFuture<'_, Option<Result<T, E>>> {
        Box::pin(async move {
            let item = self.source.next().await;
            if item.is_none() {
                self.fire();
            }
            item
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.source.close().await;
            self.fire();
        })
    }
}

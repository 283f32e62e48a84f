use core::future::Future;

use futures::future::BoxFuture;

use crate::sequence::{AsyncSequence, Sequence};

type MapFn<T, U, E> = Box<dyn Fn(T) -> BoxFuture<'static, Result<U, E>> + Send + Sync>;

/// Item mapper. `close` is the source's `close`, untouched.
pub(crate) struct MapItems<T, U, E> {
    source: Sequence<T, E>,
    map: MapFn<T, U, E>,
}

impl<T: Send + 'static, U: Send + 'static, E: Send + 'static> MapItems<T, U, E> {
    pub(crate) fn new<F, Fut>(source: Sequence<T, E>, map: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
    {
        Self {
            source,
            map: Box::new(move |item| -> BoxFuture<'static, Result<U, E>> { Box::pin(map(item)) }),
        }
    }
}

impl<T: Send + 'static, U: Send + 'static, E: Send + 'static> AsyncSequence for MapItems<T, U, E> {
    type Item = U;
    type Error = E;

    fn next(&self) -> BoxFuture<'_, Option<Result<U, E>>> {
        Box::pin(async move {
            match self.source.next().await? {
                Ok(item) => Some((self.map)(item).await),
                Err(error) => Some(Err(error)),
            }
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.source.close()
    }
}

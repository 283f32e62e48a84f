//! Close must never wait behind a pending `next`, through any adapter stack.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use meridian_stream::{AsyncSequence, Sequence};
use parking_lot::Mutex;
use tokio::sync::Notify;

// ═══════════════════════════════════════════════════════════════════════════════
// GATED SOURCE
// ═══════════════════════════════════════════════════════════════════════════════

/// A source whose `next` blocks until `release` is signalled.
struct GatedSource {
    release: Arc<Notify>,
    close_calls: Arc<AtomicUsize>,
}

impl AsyncSequence for GatedSource {
    type Item = &'static str;
    type Error = String;

    fn next(&self) -> BoxFuture<'_, Option<Result<&'static str, String>>> {
        Box::pin(async move {
            self.release.notified().await;
            None
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
        })
    }
}

fn gated() -> (Sequence<&'static str, String>, Arc<Notify>, Arc<AtomicUsize>) {
    let release = Arc::new(Notify::new());
    let close_calls = Arc::new(AtomicUsize::new(0));
    let source = Sequence::new(GatedSource {
        release: Arc::clone(&release),
        close_calls: Arc::clone(&close_calls),
    });
    (source, release, close_calls)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn close_resolves_while_next_is_pending_through_stacked_adapters() {
    let (source, release, close_calls) = gated();
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);

    let wrapped = source
        .map_items(|item| async move { Ok(item.len()) })
        .on_complete(vec![Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })])
        .rewrite_errors(vec![Arc::new(|error: String| format!("rewritten: {error}"))]);

    let reader = wrapped.clone();
    let pending = tokio::spawn(async move { reader.next().await });
    tokio::task::yield_now().await;

    tokio::time::timeout(Duration::from_millis(200), wrapped.close())
        .await
        .expect("close must not wait for the pending next");

    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert!(!pending.is_finished());

    release.notify_one();
    let item = pending.await.unwrap();
    assert_eq!(item, None);
    assert_eq!(completions.load(Ordering::SeqCst), 1, "completion fires once");
}

#[tokio::test]
async fn close_on_stream_source_wakes_pending_next() {
    let (tx, sequence) = Sequence::<u32, String>::channel();
    let wrapped = sequence.map_items(|n| async move { Ok(n + 1) });

    let reader = wrapped.clone();
    let pending = tokio::spawn(async move { reader.next().await });
    tokio::task::yield_now().await;

    tokio::time::timeout(Duration::from_millis(200), wrapped.close())
        .await
        .expect("close must not wait for the pending next");

    let item = tokio::time::timeout(Duration::from_millis(200), pending)
        .await
        .expect("pending next observes the close")
        .unwrap();
    assert_eq!(item, None);
    assert!(tx.is_closed());
}

#[tokio::test]
async fn aborted_next_releases_closed_stream_source() {
    let (tx, sequence) = Sequence::<u32, String>::channel();

    let reader = sequence.clone();
    let pending = tokio::spawn(async move { reader.next().await });
    tokio::task::yield_now().await;

    sequence.close().await;
    pending.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(tx.is_closed(), "aborted next must drop the closed stream");
}

#[tokio::test]
async fn next_after_close_returns_none() {
    let (tx, sequence) = Sequence::<u32, String>::channel();
    sequence.close().await;

    assert!(sequence.next().await.is_none());
    assert!(tx.is_closed());
    assert!(tx.send(1).is_err());
}

#[tokio::test]
async fn adapters_preserve_delivery_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let ended_after = Arc::new(Mutex::new(None));
    let end_probe = Arc::clone(&ended_after);
    let last_seen = Arc::clone(&seen);

    let sequence = Sequence::<&'static str, String>::from_items(vec![Ok("a"), Ok("b"), Ok("c"), Ok("d")])
        .map_items(move |item| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(item);
                Ok(item)
            }
        })
        .on_complete(vec![Box::new(move || {
            *end_probe.lock() = last_seen.lock().last().copied();
        })]);

    let mut delivered = Vec::new();
    while let Some(item) = sequence.next().await {
        delivered.push(item.unwrap());
    }

    assert_eq!(delivered, vec!["a", "b", "c", "d"]);
    assert_eq!(*ended_after.lock(), Some("d"));
}

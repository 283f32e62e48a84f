//! Streamed results: per-item hooks, completion hooks and error rewriting.


use std::sync::Arc;
use std::time::Duration;

use meridian_core::prelude::*;
use meridian_pipeline::prelude::*;
use meridian_stream::SequenceSender;
use parking_lot::Mutex;
use serde_json::json;
use test_utils::{Calls, args, collect, item_of, streaming_engine, test_engine, test_schema};

fn streaming(items: &'static [&'static str], plugins: Vec<Plugin>) -> Orchestrator {
    Orchestrator::builder()
        .with_engine(streaming_engine(items))
        .with_schema(test_schema())
        .add_plugins(plugins)
        .build()
        .expect("orchestrator should build")
}

/// Records every item and the last item seen at completion.
fn observer(calls: &Calls) -> Plugin {
    let calls = calls.clone();
    Plugin::new("observer").on_execute(move |_event| {
        let calls = calls.clone();
        async move {
            Ok(Some(OnExecuteDoneHook::new(move |_done| async move {
                let last = Arc::new(Mutex::new(None::<String>));
                let seen = Arc::clone(&last);
                let items = calls.clone();
                let handlers = StreamHandlers::new()
                    .on_next(move |event: OnNextEvent| {
                        let item = item_of(&event.result());
                        items.push(format!("next {}", item.as_deref().unwrap_or("?")));
                        *seen.lock() = item;
                        async { Ok(()) }
                    })
                    .on_end(move || {
                        let last = last.lock().clone().unwrap_or_default();
                        calls.push(format!("end last={last}"));
                    });
                Ok(Some(handlers))
            })))
        }
    })
}

#[tokio::test]
async fn on_next_and_on_end_observe_every_item() {
    let calls = Calls::new();
    let orchestrator = streaming(&["a", "b", "c", "d"], vec![observer(&calls)]);

    let output = orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect("execute should succeed");
    let stream = output.into_stream().expect("streamed output");
    let items = collect(&stream).await;

    let delivered: Vec<_> = items
        .iter()
        .filter_map(|item| item.as_ref().ok().and_then(item_of))
        .collect();
    assert_eq!(delivered, ["a", "b", "c", "d"]);
    assert_eq!(
        calls.snapshot(),
        ["next a", "next b", "next c", "next d", "end last=d"]
    );
}

#[tokio::test]
async fn on_next_can_replace_items() {
    let upper = Plugin::new("upper").on_execute(|_event| async {
        Ok(Some(OnExecuteDoneHook::new(|_done| async {
            Ok(Some(StreamHandlers::new().on_next(|event: OnNextEvent| {
                let item = item_of(&event.result()).unwrap_or_default();
                event.set_result(ExecutionResult::from_data(
                    json!({ "item": item.to_uppercase() }),
                ));
                async { Ok(()) }
            })))
        })))
    });
    let orchestrator = streaming(&["x", "y"], vec![upper]);

    let stream = orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect("execute should succeed")
        .into_stream()
        .expect("streamed output");
    let delivered: Vec<_> = collect(&stream)
        .await
        .iter()
        .filter_map(|item| item.as_ref().ok().and_then(item_of))
        .collect();

    assert_eq!(delivered, ["X", "Y"]);
}

#[tokio::test]
async fn single_results_ignore_stream_handlers() {
    let calls = Calls::new();
    let orchestrator = test_utils::orchestrator(vec![observer(&calls)]);

    let output = orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect("execute should succeed");

    assert!(!output.is_stream());
    assert!(calls.snapshot().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions over a channel
// ─────────────────────────────────────────────────────────────────────────────

type Sender = Arc<Mutex<Option<SequenceSender<ExecutionResult, PipelineError>>>>;

/// A test engine whose subscribe function hands out a fresh channel and
/// parks its sender in the returned slot.
fn channel_orchestrator(plugins: Vec<Plugin>) -> (Orchestrator, Sender) {
    let sender: Sender = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&sender);
    let engine = test_engine().with_subscribe(move |_args| {
        let (tx, stream) = ResultStream::channel();
        *slot.lock() = Some(tx);
        async move { Ok(ExecutionOutput::Stream(stream)) }
    });
    let orchestrator = Orchestrator::builder()
        .with_engine(engine)
        .with_schema(test_schema())
        .add_plugins(plugins)
        .build()
        .expect("orchestrator should build");
    (orchestrator, sender)
}

fn subscribe_observer(calls: &Calls) -> Plugin {
    let calls = calls.clone();
    Plugin::new("observer").on_subscribe(move |_event| {
        let calls = calls.clone();
        async move {
            let hooks = SubscribeHooks::new().on_subscribe_result(move |_result| async move {
                Ok(Some(StreamHandlers::new().on_end(move || calls.push("end"))))
            });
            Ok(Some(hooks))
        }
    })
}

#[tokio::test]
async fn close_resolves_while_next_is_pending() {
    let calls = Calls::new();
    let (orchestrator, sender) = channel_orchestrator(vec![subscribe_observer(&calls)]);

    let stream = orchestrator
        .subscribe(args(&RequestContext::new()))
        .await
        .expect("subscribe should succeed")
        .into_stream()
        .expect("streamed output");

    let reader = stream.clone();
    let pending = tokio::spawn(async move { reader.next().await });
    tokio::task::yield_now().await;

    tokio::time::timeout(Duration::from_millis(200), stream.close())
        .await
        .expect("close must not wait for the pending next");

    let next = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("pending next should finish after close")
        .expect("reader task should not panic");
    assert!(next.is_none());
    assert_eq!(calls.count("end"), 1);

    let sender = sender.lock().take().expect("subscribe ran");
    assert!(sender.is_closed());
}

#[tokio::test]
async fn subscribe_errors_are_rewritten_and_end_the_stream() {
    let rewrite = Plugin::new("rewrite").on_subscribe(|_event| async {
        let hooks = SubscribeHooks::new().on_subscribe_error(|event| {
            let message = event.error().to_string();
            event.set_error(PipelineError::execution(format!("wrapped: {message}")));
        });
        Ok(Some(hooks))
    });
    let (orchestrator, sender) = channel_orchestrator(vec![rewrite]);

    let stream = orchestrator
        .subscribe(args(&RequestContext::new()))
        .await
        .expect("subscribe should succeed")
        .into_stream()
        .expect("streamed output");

    {
        let sender = sender.lock();
        let sender = sender.as_ref().expect("subscribe ran");
        sender
            .send(ExecutionResult::from_data(json!({ "item": "first" })))
            .expect("consumer is open");
        sender
            .fail(PipelineError::execution("socket reset"))
            .expect("consumer is open");
        // Never delivered: the stream terminates on the rewritten error.
        sender
            .send(ExecutionResult::from_data(json!({ "item": "after" })))
            .ok();
    }

    let items = collect(&stream).await;
    assert_eq!(items.len(), 2);
    assert_eq!(
        items[0].as_ref().ok().and_then(item_of).as_deref(),
        Some("first")
    );
    assert_eq!(
        items[1],
        Err(PipelineError::execution(
            "wrapped: execution failed: socket reset"
        ))
    );
}

#[tokio::test]
async fn subscribe_result_hooks_run_after_early_result() {
    let calls = Calls::new();
    let inject = Plugin::new("inject").on_subscribe(|event| {
        event.set_result_and_stop_execution(ResultStream::from_items(vec![Ok(
            ExecutionResult::from_data(json!({ "item": "cached" })),
        )]));
        async { Ok(None) }
    });
    let (orchestrator, sender) =
        channel_orchestrator(vec![subscribe_observer(&calls), inject]);

    let stream = orchestrator
        .subscribe(args(&RequestContext::new()))
        .await
        .expect("subscribe should succeed")
        .into_stream()
        .expect("streamed output");
    let items = collect(&stream).await;

    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].as_ref().ok().and_then(item_of).as_deref(),
        Some("cached")
    );
    assert_eq!(calls.count("end"), 1);
    assert!(sender.lock().is_none(), "engine subscribe must not run");
}

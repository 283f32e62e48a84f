//! Execute phase: early exit, engine overrides and result rewriting.


use meridian_core::prelude::*;
use meridian_pipeline::prelude::*;
use serde_json::json;
use test_utils::{Calls, args, orchestrator, test_engine, test_schema};

fn stopped_result() -> ExecutionResult {
    ExecutionResult {
        data: None,
        ..ExecutionResult::from_errors(vec![OperationError::new("x")])
    }
}

/// A plugin recording `onExecute` and `onExecuteDone`, optionally stopping
/// execution with [`stopped_result`].
fn tracked(name: &'static str, stop: bool, calls: &Calls) -> Plugin {
    let calls = calls.clone();
    Plugin::new(name).on_execute(move |event| {
        calls.push(format!("{name}.on_execute"));
        if stop {
            event.set_result_and_stop_execution(stopped_result());
        }
        let calls = calls.clone();
        async move {
            Ok(Some(OnExecuteDoneHook::new(move |done| async move {
                let seen = done.result().into_single();
                let marker = if seen == Some(stopped_result()) {
                    "injected"
                } else {
                    "engine"
                };
                calls.push(format!("{name}.on_execute_done {marker}"));
                Ok(None)
            })))
        }
    })
}

#[tokio::test]
async fn stop_keeps_already_invoked_plugins_notified() {
    let calls = Calls::new();
    let orchestrator = orchestrator(vec![
        tracked("first", false, &calls),
        tracked("second", true, &calls),
    ]);

    let output = orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect("execute should succeed");

    assert_eq!(output.into_single(), Some(stopped_result()));
    assert_eq!(
        calls.snapshot(),
        [
            "first.on_execute",
            "second.on_execute",
            "first.on_execute_done injected",
            "second.on_execute_done injected",
        ]
    );
}

#[tokio::test]
async fn stop_skips_later_plugins_entirely() {
    let calls = Calls::new();
    let orchestrator = orchestrator(vec![
        tracked("first", true, &calls),
        tracked("second", false, &calls),
    ]);

    orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect("execute should succeed");

    assert_eq!(
        calls.snapshot(),
        ["first.on_execute", "first.on_execute_done injected"]
    );
    assert!(!calls.snapshot().iter().any(|call| call.starts_with("second")));
}

#[tokio::test]
async fn engine_runs_when_nobody_stops() {
    let calls = Calls::new();
    let orchestrator = orchestrator(vec![
        tracked("first", false, &calls),
        tracked("second", false, &calls),
    ]);

    orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect("execute should succeed");

    assert_eq!(calls.count("first.on_execute_done engine"), 1);
    assert_eq!(calls.count("second.on_execute_done engine"), 1);
}

#[tokio::test]
async fn execute_fn_can_be_replaced_per_invocation() {
    let swap = Plugin::new("swap").on_execute(|event| {
        let base = event.execute_fn();
        event.set_execute_fn(execute_fn(move |args: ExecutionArgs| {
            let base = base.clone();
            async move {
                let output = base(args).await?;
                let tagged = output
                    .into_single()
                    .map(|result| result.with_extension("swapped", json!(true)))
                    .unwrap_or_default();
                Ok(ExecutionOutput::Single(tagged))
            }
        }));
        async { Ok(None) }
    });
    let orchestrator = orchestrator(vec![swap]);

    let output = orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect("execute should succeed");

    let result = output.into_single().expect("single result");
    assert_eq!(
        result.extensions.and_then(|ext| ext.get("swapped").cloned()),
        Some(json!(true))
    );
    assert!(result.data.is_some());
}

#[tokio::test]
async fn done_hooks_can_rewrite_the_result() {
    let rewrite = Plugin::new("rewrite").on_execute(|_event| async {
        Ok(Some(OnExecuteDoneHook::new(|done| async move {
            done.set_result(ExecutionResult::from_data(json!({ "rewritten": true })));
            Ok(None)
        })))
    });
    let orchestrator = orchestrator(vec![rewrite]);

    let output = orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect("execute should succeed");

    assert_eq!(
        output.into_single().and_then(|result| result.data),
        Some(json!({ "rewritten": true }))
    );
}

#[tokio::test]
async fn hook_errors_propagate_to_the_caller() {
    let failing = Plugin::new("failing").on_execute(|_event| async {
        Err(PipelineError::hook("failing", "quota exceeded"))
    });
    let orchestrator = orchestrator(vec![failing]);

    let err = orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect_err("hook error should surface");
    assert_eq!(err, PipelineError::hook("failing", "quota exceeded"));
}

#[tokio::test]
async fn non_object_extension_fails_immediately() {
    let calls = Calls::new();
    let bad = Plugin::new("bad").on_execute(|event| async move {
        event.extend_context(json!("not an object"))?;
        Ok(None)
    });
    let orchestrator = orchestrator(vec![bad, tracked("later", false, &calls)]);

    let err = orchestrator
        .execute(args(&RequestContext::new()))
        .await
        .expect_err("string extension should fail");

    assert!(matches!(err, PipelineError::InvalidContextExtension(_)));
    assert!(calls.snapshot().is_empty());
}

#[tokio::test]
async fn missing_engine_function_is_reported() {
    let orchestrator = Orchestrator::builder()
        .with_schema(test_schema())
        .build()
        .expect("empty orchestrator should build");

    let err = orchestrator
        .subscribe(args(&RequestContext::new()))
        .await
        .expect_err("no subscribe function configured");
    assert_eq!(err, PipelineError::EngineNotConfigured("subscribe"));
}

#[tokio::test]
async fn execute_fn_composes_with_other_orchestrators() {
    let inner = orchestrator(vec![Plugin::new("inner").on_execute(|event| async move {
        event.extend_context(json!({ "inner": true }))?;
        Ok(None)
    })]);
    let outer = Orchestrator::builder()
        .with_engine(test_engine().with_execute({
            let inner = inner.execute_fn();
            move |args| inner(args)
        }))
        .build()
        .expect("outer orchestrator should build");

    let ctx = RequestContext::new();
    outer.execute(args(&ctx)).await.expect("execute should succeed");
    assert_eq!(ctx.get("inner"), Some(json!(true)));
}

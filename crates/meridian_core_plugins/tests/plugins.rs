//! Core plugins driven through a real orchestrator.


use meridian_core::prelude::*;
use meridian_core_plugins::prelude::*;
use meridian_core_plugins::{DEFAULT_ERROR_MESSAGE, EXPOSE_EXTENSION, LogEvent};
use meridian_pipeline::{Orchestrator, Plugin};
use serde_json::json;
use test_utils::{Recorder, args, build, collect, engine};

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn schema_plugin_sets_the_schema_at_build() {
    let schema = Schema::new("type Query { me: String }");
    let orchestrator = Orchestrator::builder()
        .add_plugin(SchemaPlugin::new(schema.clone()))
        .build()
        .expect("orchestrator should build");

    assert!(
        orchestrator
            .current_schema()
            .is_some_and(|current| current.ptr_eq(&schema))
    );
}

#[test]
fn lazy_schema_plugin_picks_per_request() {
    let admin = Schema::new("admin");
    let chosen = admin.clone();
    let orchestrator = build(
        engine(&[]),
        vec![
            LazySchemaPlugin::new(move |context| {
                (context.get("role") == Some(json!("admin"))).then(|| chosen.clone())
            })
            .into(),
        ],
    );
    let before = orchestrator.current_schema();

    orchestrator
        .init(&RequestContext::new())
        .expect("request init should succeed");
    assert_eq!(orchestrator.current_schema(), before);

    let context = RequestContext::from_value(json!({ "role": "admin" })).expect("object");
    orchestrator.init(&context).expect("request init should succeed");
    assert!(
        orchestrator
            .current_schema()
            .is_some_and(|current| current.ptr_eq(&admin))
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine and context
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn engine_plugin_replaces_execute() {
    let plugin = EnginePlugin::new().with_execute(execute_fn(|_args| async {
        Ok(ExecutionOutput::Single(ExecutionResult::from_data(
            json!({ "from": "plugin" }),
        )))
    }));
    let orchestrator = build(engine(&[]), vec![plugin.into()]);

    let output = orchestrator
        .execute(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("execute should succeed");
    assert_eq!(
        output.into_single().and_then(|result| result.data),
        Some(json!({ "from": "plugin" }))
    );
}

#[tokio::test]
async fn engine_plugin_replaces_parse() {
    let plugin = EnginePlugin::new().with_parse(parse_fn(|_source, _options| {
        Err(OperationError::new("parser disabled"))
    }));
    let orchestrator = build(engine(&[]), vec![plugin.into()]);

    let err = orchestrator.parse(&RequestContext::new())("{ ok }", ParseOptions::default())
        .await
        .expect_err("replacement parser always fails");
    assert_eq!(err, PipelineError::Parse(OperationError::new("parser disabled")));
}

#[tokio::test]
async fn extend_context_plugin_merges_computed_values() {
    let plugin = ExtendContextPlugin::new(|context: RequestContext| async move {
        let token = context.get("token").unwrap_or_default();
        Ok(json!({ "user": { "token": token } }))
    });
    let orchestrator = build(engine(&[]), vec![plugin.into()]);

    let context = orchestrator.build_context(&RequestContext::new())(Some(json!({ "token": "t1" })))
        .await
        .expect("context building should succeed");
    assert_eq!(context.get("user"), Some(json!({ "token": "t1" })));
}

#[tokio::test]
async fn extend_context_plugin_rejects_non_objects() {
    let plugin = ExtendContextPlugin::new(|_context: RequestContext| async { Ok(json!(42)) });
    let orchestrator = build(engine(&[]), vec![plugin.into()]);

    let err = orchestrator.build_context(&RequestContext::new())(None)
        .await
        .expect_err("a number is not an extension");
    assert!(matches!(err, PipelineError::InvalidContextExtension(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn error_handler_sees_result_and_context_errors() {
    let reports: Recorder<(ErrorPhase, Vec<String>)> = Recorder::new();
    let recorder = reports.clone();
    let handler = ErrorHandlerPlugin::new(move |report| {
        let messages = report.errors.iter().map(|error| error.message.clone()).collect();
        recorder.push((report.phase, messages));
    });
    let failing = Plugin::new("failing").on_context_building(|_event| async {
        Err(PipelineError::context_building("no session"))
    });
    let orchestrator = build(engine(&["resolver blew up"]), vec![handler.into(), failing]);

    let output = orchestrator
        .execute(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("execute should succeed");
    let result = output.into_single().expect("single result");
    assert_eq!(result.errors.len(), 1);

    orchestrator.build_context(&RequestContext::new())(None)
        .await
        .expect_err("context building fails");

    assert_eq!(
        reports.snapshot(),
        [
            (ErrorPhase::Execution, vec!["resolver blew up".to_owned()]),
            (
                ErrorPhase::Context,
                vec!["context building failed: no session".to_owned()]
            ),
        ]
    );
}

#[tokio::test]
async fn error_handler_sees_streamed_item_errors() {
    let phases: Recorder<ErrorPhase> = Recorder::new();
    let recorder = phases.clone();
    let handler = ErrorHandlerPlugin::new(move |report| recorder.push(report.phase));
    let orchestrator = build(engine(&[]), vec![handler.into()]);

    let stream = orchestrator
        .subscribe(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("subscribe should succeed")
        .into_stream()
        .expect("streamed output");
    let items = collect(&stream).await;

    assert_eq!(items.len(), 2);
    assert_eq!(phases.snapshot(), [ErrorPhase::Subscription]);
}

#[tokio::test]
async fn masked_errors_hide_unexposed_messages() {
    let orchestrator = build(
        engine(&["connection string leaked"]),
        vec![MaskedErrorsPlugin::new().into()],
    );

    let result = orchestrator
        .execute(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("execute should succeed")
        .into_single()
        .expect("single result");

    assert_eq!(result.errors[0].message, DEFAULT_ERROR_MESSAGE);
    assert_eq!(result.data, Some(json!({ "ok": true })));
}

#[tokio::test]
async fn masked_errors_keep_exposed_messages_and_mask_streams() {
    let expose = Plugin::new("expose").on_execute(|event| {
        event.set_result_and_stop_execution(ExecutionResult::from_errors(vec![
            OperationError::new("Not authorized").with_extension(EXPOSE_EXTENSION, json!(true)),
        ]));
        async { Ok(None) }
    });
    let orchestrator = build(
        engine(&[]),
        vec![MaskedErrorsPlugin::new().with_message("Oops").into(), expose],
    );

    let result = orchestrator
        .execute(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("execute should succeed")
        .into_single()
        .expect("single result");
    assert_eq!(result.errors[0].message, "Not authorized");

    let stream = orchestrator
        .subscribe(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("subscribe should succeed")
        .into_stream()
        .expect("streamed output");
    let messages: Vec<String> = collect(&stream)
        .await
        .into_iter()
        .filter_map(Result::ok)
        .flat_map(|item| item.errors)
        .map(|error| error.message)
        .collect();
    assert_eq!(messages, ["Oops"]);
}

#[tokio::test]
async fn masked_errors_rewrite_context_failures() {
    let failing = Plugin::new("failing").on_context_building(|_event| async {
        Err(PipelineError::context_building("stack trace here"))
    });
    let orchestrator = build(engine(&[]), vec![MaskedErrorsPlugin::new().into(), failing]);

    let err = orchestrator.build_context(&RequestContext::new())(None)
        .await
        .expect_err("context building fails");
    assert_eq!(
        err,
        PipelineError::Operation(OperationError::new(DEFAULT_ERROR_MESSAGE))
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Formatting and logging
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn payload_formatter_rewrites_single_and_streamed_results() {
    let formatter = PayloadFormatterPlugin::new(|result, _args| {
        Some(result.clone().with_extension("formatted", json!(true)))
    });
    let orchestrator = build(engine(&[]), vec![formatter.into()]);

    let single = orchestrator
        .execute(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("execute should succeed")
        .into_single()
        .expect("single result");
    assert_eq!(
        single.extensions.and_then(|ext| ext.get("formatted").cloned()),
        Some(json!(true))
    );

    let stream = orchestrator
        .subscribe(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("subscribe should succeed")
        .into_stream()
        .expect("streamed output");
    let formatted = collect(&stream)
        .await
        .into_iter()
        .filter_map(Result::ok)
        .filter(|item| item.extensions.as_ref().is_some_and(|ext| ext.contains_key("formatted")))
        .count();
    assert_eq!(formatted, 2);
}

#[tokio::test]
async fn logger_reports_the_operation_lifecycle() {
    let events: Recorder<LogEvent> = Recorder::new();
    let recorder = events.clone();
    let logger = LoggerPlugin::new().with_log_fn(move |record| recorder.push(record.event));
    let orchestrator = build(engine(&[]), vec![logger.into()]);

    orchestrator
        .execute(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("execute should succeed");
    let stream = orchestrator
        .subscribe(args(&orchestrator, &RequestContext::new()))
        .await
        .expect("subscribe should succeed")
        .into_stream()
        .expect("streamed output");
    collect(&stream).await;

    assert_eq!(
        events.snapshot(),
        [
            LogEvent::ExecuteStart,
            LogEvent::ExecuteEnd,
            LogEvent::SubscribeStart,
            LogEvent::SubscribeEnd,
            LogEvent::StreamEnd,
        ]
    );
}

#[test]
fn default_plugins_build_an_orchestrator() {
    use meridian_pipeline::PluginGroup;

    let orchestrator = Orchestrator::builder()
        .add_plugins(DefaultPlugins.build())
        .build()
        .expect("orchestrator should build");
    let names: Vec<&str> = orchestrator.plugins().iter().map(Plugin::name).collect();
    assert_eq!(names, ["meridian::tracing", "meridian::logger"]);
}

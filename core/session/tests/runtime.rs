//! Execution contexts, evaluation and runtime events.

mod common;

use std::{cell::RefCell, rc::Rc};

use futures_lite::future::block_on;
use inspector_protocol::{ExecutionContextId, ScriptId};
use inspector_session::{DebuggerEvent, EvaluationOptions, RuntimeEvent, remote::PrimitiveValue};
use serde_json::{Value, json};

use common::Harness;

fn side_effect_refusal() -> Value {
    json!({
        "result": { "type": "object", "subtype": "error", "objectId": "err-1" },
        "exceptionDetails": {
            "exceptionId": 1,
            "text": "Uncaught",
            "lineNumber": 0,
            "columnNumber": 0,
            "exception": {
                "type": "object",
                "subtype": "error",
                "description": "EvalError: Possible side-effect in debug-evaluate\n    at <anonymous>:1:1",
            },
        },
    })
}

#[test]
fn contexts_are_listed_in_display_order() {
    let harness = Harness::started();
    harness.context_created(3, "extension", false);
    harness.context_created(1, "", true);
    harness.context_created(2, "another extension", false);

    let runtime = harness.target.runtime();
    let ids: Vec<i64> = runtime
        .execution_contexts()
        .iter()
        .map(|context| context.id.0)
        .collect();
    assert_eq!(ids, [1, 2, 3]);
    assert_eq!(
        runtime.default_execution_context().map(|context| context.id),
        Some(ExecutionContextId(1))
    );
    let main = runtime
        .execution_context(ExecutionContextId(1))
        .expect("created");
    assert_eq!(main.frame_id.as_deref(), Some("frame-1"));
}

#[test]
fn a_custom_comparator_reorders_contexts() {
    let harness = Harness::started();
    harness.context_created(1, "a", true);
    harness.context_created(2, "b", false);
    let order_changes = Rc::new(RefCell::new(0));
    {
        let order_changes = Rc::clone(&order_changes);
        harness.target.runtime().events().add_listener(move |event| {
            if matches!(event, RuntimeEvent::ExecutionContextOrderChanged) {
                *order_changes.borrow_mut() += 1;
            }
        });
    }

    let runtime = harness.target.runtime();
    runtime.set_execution_context_comparator(|a, b| b.id.0.cmp(&a.id.0));
    let ids: Vec<i64> = runtime
        .execution_contexts()
        .iter()
        .map(|context| context.id.0)
        .collect();
    assert_eq!(ids, [2, 1]);
    assert_eq!(*order_changes.borrow(), 1);
}

#[test]
fn context_labels_can_be_overridden_and_restored() {
    let harness = Harness::started();
    harness.context_created(1, "", true);
    let runtime = harness.target.runtime();
    let context = runtime
        .execution_context(ExecutionContextId(1))
        .expect("created");
    assert_eq!(context.label(), "");

    runtime.set_execution_context_label(ExecutionContextId(1), "top");
    assert_eq!(context.label(), "top");
    runtime.set_execution_context_label(ExecutionContextId(1), "");
    assert_eq!(context.label(), "");
}

#[test]
fn destroying_the_last_context_resets_the_debugger() {
    let harness = Harness::started();
    harness.context_created(1, "", true);
    harness.context_created(2, "worker", false);
    harness.script_parsed("1", "app.js", 0, 20);
    let cleared = Rc::new(RefCell::new(0));
    {
        let cleared = Rc::clone(&cleared);
        harness.target.debugger().events().add_listener(move |event| {
            if matches!(event, DebuggerEvent::GlobalObjectCleared) {
                *cleared.borrow_mut() += 1;
            }
        });
    }

    harness.dispatch(
        "Runtime.executionContextDestroyed",
        json!({ "executionContextId": 2 }),
    );
    assert_eq!(*cleared.borrow(), 0);
    assert_eq!(harness.target.debugger().scripts().len(), 1);

    harness.dispatch(
        "Runtime.executionContextDestroyed",
        json!({ "executionContextId": 1 }),
    );
    assert_eq!(*cleared.borrow(), 1);
    assert!(harness.target.debugger().scripts().is_empty());
    assert!(harness.target.runtime().execution_contexts().is_empty());
}

#[test]
fn clearing_contexts_reports_each_one() {
    let harness = Harness::started();
    harness.context_created(1, "", true);
    harness.context_created(2, "worker", false);
    let destroyed = Rc::new(RefCell::new(Vec::new()));
    {
        let destroyed = Rc::clone(&destroyed);
        harness.target.runtime().events().add_listener(move |event| {
            if let RuntimeEvent::ExecutionContextDestroyed(context) = event {
                destroyed.borrow_mut().push(context.id.0);
            }
        });
    }

    harness.dispatch("Runtime.executionContextsCleared", json!({}));
    assert_eq!(*destroyed.borrow(), [1, 2]);
    assert!(harness.target.runtime().execution_contexts().is_empty());
}

#[test]
fn the_side_effect_probe_runs_once_in_the_newest_context() {
    let harness = Harness::started();
    harness.context_created(1, "", true);
    harness.context_created(4, "worker", false);
    harness
        .transport
        .respond("Runtime.evaluate", side_effect_refusal());
    let runtime = harness.target.runtime();

    assert_eq!(runtime.has_side_effect_support(), None);
    assert!(block_on(runtime.check_side_effect_support()));
    assert!(block_on(runtime.check_side_effect_support()));

    assert_eq!(runtime.has_side_effect_support(), Some(true));
    let probes = harness.transport.params_of("Runtime.evaluate");
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0]["contextId"], json!(4));
    assert_eq!(probes[0]["throwOnSideEffect"], json!(true));
}

#[test]
fn a_failed_probe_means_no_support() {
    let harness = Harness::started();
    harness.context_created(1, "", true);
    harness
        .transport
        .fail("Runtime.evaluate", "Cannot find context with specified id");
    let runtime = harness.target.runtime();

    assert!(!block_on(runtime.check_side_effect_support()));
    assert_eq!(runtime.has_side_effect_support(), Some(false));
}

#[test]
fn a_probe_without_contexts_is_not_memoized() {
    let harness = Harness::started();
    let runtime = harness.target.runtime();
    assert!(!block_on(runtime.check_side_effect_support()));
    assert_eq!(runtime.has_side_effect_support(), None);
    assert_eq!(harness.transport.count("Runtime.evaluate"), 0);
}

#[test]
fn empty_expressions_evaluate_this() {
    let harness = Harness::started();
    harness.context_created(1, "", true);
    harness.transport.respond(
        "Runtime.evaluate",
        json!({ "result": { "type": "object", "className": "Window", "objectId": "win-1" } }),
    );
    let runtime = harness.target.runtime();
    let context = runtime
        .execution_context(ExecutionContextId(1))
        .expect("created");

    let result = block_on(runtime.evaluate_in_context(
        &context,
        &EvaluationOptions::new(""),
        true,
        false,
    ));

    let object = result.object().expect("evaluated");
    assert_eq!(object.object_id().map(|id| id.as_str()), Some("win-1"));
    let params = &harness.transport.params_of("Runtime.evaluate")[0];
    assert_eq!(params["expression"], json!("this"));
    assert_eq!(params["contextId"], json!(1));
    assert_eq!(params["userGesture"], json!(true));
}

#[test]
fn unique_context_ids_are_preferred() {
    let harness = Harness::started();
    harness.dispatch(
        "Runtime.executionContextCreated",
        json!({
            "context": {
                "id": 7,
                "origin": "https://example.com",
                "name": "",
                "uniqueId": "unique-7",
            }
        }),
    );
    harness.transport.respond(
        "Runtime.evaluate",
        json!({ "result": { "type": "number", "value": 2, "description": "2" } }),
    );
    let runtime = harness.target.runtime();
    let context = runtime
        .execution_context(ExecutionContextId(7))
        .expect("created");

    block_on(runtime.evaluate_in_context(&context, &EvaluationOptions::new("1 + 1"), false, false));

    let params = &harness.transport.params_of("Runtime.evaluate")[0];
    assert_eq!(params["uniqueContextId"], json!("unique-7"));
    assert!(params.get("contextId").is_none());
}

#[test]
fn evaluation_goes_to_the_selected_frame_while_paused() {
    let harness = Harness::started();
    harness.context_created(1, "", true);
    harness.script_parsed("1", "app.js", 0, 20);
    harness.paused_at("1", 2, 0);
    harness.transport.clear_calls();
    harness.transport.respond(
        "Debugger.evaluateOnCallFrame",
        json!({ "result": { "type": "string", "value": "local", "description": "local" } }),
    );
    let runtime = harness.target.runtime();
    let context = runtime
        .execution_context(ExecutionContextId(1))
        .expect("created");

    let result = block_on(runtime.evaluate_in_context(
        &context,
        &EvaluationOptions::new("x"),
        false,
        false,
    ));

    assert_eq!(
        result.object().and_then(|object| object.value().cloned()),
        Some(PrimitiveValue::String("local".to_owned()))
    );
    assert_eq!(harness.transport.methods(), ["Debugger.evaluateOnCallFrame"]);
}

#[test]
fn backend_errors_become_error_results() {
    let harness = Harness::started();
    harness.context_created(1, "", true);
    harness
        .transport
        .fail("Runtime.evaluate", "Execution context was destroyed.");
    let runtime = harness.target.runtime();
    let context = runtime
        .execution_context(ExecutionContextId(1))
        .expect("created");

    let result = block_on(runtime.evaluate_in_context(
        &context,
        &EvaluationOptions::new("1"),
        false,
        false,
    ));
    assert!(
        result
            .error()
            .is_some_and(|message| message.contains("Execution context was destroyed."))
    );
}

#[test]
fn query_objects_needs_an_object_prototype() {
    let harness = Harness::started();
    let runtime = harness.target.runtime();
    let primitive = runtime.create_remote_object_from_primitive_value(PrimitiveValue::Number(1.0));

    let result = block_on(runtime.query_objects(&primitive));
    assert_eq!(result.error(), Some("Prototype should be an Object."));
    assert_eq!(harness.transport.count("Runtime.queryObjects"), 0);
}

#[test]
fn query_objects_uses_the_console_group() {
    let harness = Harness::started();
    harness.transport.respond(
        "Runtime.queryObjects",
        json!({ "objects": { "type": "object", "subtype": "array", "objectId": "found-1" } }),
    );
    let runtime = harness.target.runtime();
    let prototype = runtime.create_remote_object(
        serde_json::from_value(json!({ "type": "object", "objectId": "proto-1" }))
            .expect("valid payload"),
    );

    let result = block_on(runtime.query_objects(&prototype));
    assert!(result.object().is_some());
    assert_eq!(
        harness.transport.params_of("Runtime.queryObjects"),
        [json!({ "prototypeObjectId": "proto-1", "objectGroup": "console" })]
    );
}

#[test]
fn releasing_a_result_releases_its_exception() {
    let harness = Harness::started();
    harness.context_created(1, "", true);
    harness
        .transport
        .respond("Runtime.evaluate", side_effect_refusal());
    let runtime = harness.target.runtime();
    let context = runtime
        .execution_context(ExecutionContextId(1))
        .expect("created");
    let result = block_on(runtime.evaluate_in_context(
        &context,
        &EvaluationOptions::new("throw 1"),
        false,
        false,
    ));
    harness.transport.clear_calls();

    block_on(runtime.release_evaluation_result(&result));
    assert_eq!(
        harness.transport.params_of("Runtime.releaseObject"),
        [json!({ "objectId": "err-1" })]
    );
}

#[test]
fn exceptions_and_console_calls_are_reported() {
    let harness = Harness::started();
    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = Rc::clone(&seen);
        harness.target.runtime().events().add_listener(move |event| {
            let entry = match event {
                RuntimeEvent::ExceptionThrown { details, .. } => {
                    format!("thrown {} {}", details.exception_id, details.text)
                }
                RuntimeEvent::ExceptionRevoked(id) => format!("revoked {id}"),
                RuntimeEvent::ConsoleApiCalled(message) => format!(
                    "{} {:?}",
                    message.kind,
                    message.args.first().and_then(|arg| arg.value().cloned())
                ),
                _ => return,
            };
            seen.borrow_mut().push(entry);
        });
    }

    harness.dispatch(
        "Runtime.exceptionThrown",
        json!({
            "timestamp": 1.0,
            "exceptionDetails": {
                "exceptionId": 3,
                "text": "Uncaught",
                "lineNumber": 1,
                "columnNumber": 2,
                "scriptId": "1",
            },
        }),
    );
    harness.dispatch(
        "Runtime.exceptionRevoked",
        json!({ "reason": "Handler added to rejected promise", "exceptionId": 3 }),
    );
    harness.dispatch(
        "Runtime.consoleAPICalled",
        json!({
            "type": "log",
            "args": [{ "type": "string", "value": "hi" }],
            "executionContextId": 1,
            "timestamp": 2.0,
        }),
    );

    assert_eq!(
        *seen.borrow(),
        [
            "thrown 3 Uncaught".to_owned(),
            "revoked 3".to_owned(),
            format!("log {:?}", Some(PrimitiveValue::String("hi".to_owned()))),
        ]
    );
}

#[test]
fn exception_details_of_an_error_object() {
    let harness = Harness::started();
    harness.transport.respond(
        "Runtime.getExceptionDetails",
        json!({
            "exceptionDetails": {
                "exceptionId": 0,
                "text": "Uncaught Error: boom",
                "lineNumber": 4,
                "columnNumber": 9,
                "scriptId": "12",
            }
        }),
    );
    let details = block_on(
        harness
            .target
            .runtime()
            .get_exception_details(&"err-1".into()),
    )
    .expect("details");
    assert_eq!(details.script_id, Some(ScriptId::from("12")));
    assert_eq!(details.line_number, 4);
}

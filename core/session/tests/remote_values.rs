//! Remote handles, scope objects and typed views.

mod common;

use std::rc::Rc;

use futures_lite::future::block_on;
use inspector_protocol::{RemoteObjectPayload, ScriptId};
use inspector_session::{
    Location, RemoteValue, SessionError,
    debugger::FunctionDetails,
    remote::{PrimitiveValue, RemoteArray, RemoteArrayBuffer, RemoteFunction, load_from_object_per_proto},
};
use serde_json::{Value, json};

use common::Harness;

fn remote(harness: &Harness, payload: Value) -> Rc<RemoteValue> {
    let payload: RemoteObjectPayload = serde_json::from_value(payload).expect("valid payload");
    harness.target.runtime().create_remote_object(payload)
}

fn number(value: &RemoteValue) -> Option<f64> {
    match value.value()? {
        PrimitiveValue::Number(number) => Some(*number),
        _ => None,
    }
}

#[test]
fn property_listings_split_named_private_and_internal_properties() {
    let harness = Harness::started();
    harness.transport.respond(
        "Runtime.getProperties",
        json!({
            "result": [
                {
                    "name": "a",
                    "value": { "type": "number", "value": 1, "description": "1" },
                    "writable": true,
                    "enumerable": true,
                    "isOwn": true,
                },
                {
                    "name": "g",
                    "get": { "type": "function", "objectId": "getter-1" },
                    "set": { "type": "undefined" },
                    "isOwn": true,
                },
            ],
            "internalProperties": [
                { "name": "[[StableObjectId]]", "value": { "type": "number", "value": 7 } },
                { "name": "[[Prototype]]", "value": { "type": "object", "objectId": "proto-1" } },
            ],
            "privateProperties": [
                { "name": "#secret", "value": { "type": "string", "value": "s" } },
            ],
        }),
    );
    let object = remote(&harness, json!({ "type": "object", "objectId": "obj-1" }));

    let listing = block_on(object.get_own_properties(true, false));

    let properties = listing.properties.expect("listed");
    let names: Vec<&str> = properties.iter().map(|property| property.name.as_str()).collect();
    assert_eq!(names, ["a", "g", "#secret"]);
    assert_eq!(properties[0].value.as_deref().and_then(number), Some(1.0));
    assert!(properties[0].writable && properties[0].is_own);
    assert!(properties[1].is_accessor_property());
    assert!(properties[1].getter.is_some());
    assert!(properties[1].setter.is_none());
    assert!(properties[2].is_private);

    let internal = listing.internal_properties.expect("listed");
    assert_eq!(internal.len(), 1);
    assert_eq!(internal[0].name, "[[Prototype]]");
    assert!(!internal[0].writable);

    assert_eq!(
        harness.transport.params_of("Runtime.getProperties"),
        [json!({
            "objectId": "obj-1",
            "ownProperties": true,
            "accessorPropertiesOnly": false,
            "nonIndexedPropertiesOnly": false,
            "generatePreview": true,
        })]
    );
}

#[test]
fn failed_listings_have_no_properties() {
    let harness = Harness::started();
    harness
        .transport
        .fail("Runtime.getProperties", "Could not find object with given id");
    let object = remote(&harness, json!({ "type": "object", "objectId": "gone" }));

    let listing = block_on(object.get_all_properties(false, false, false));
    assert!(listing.properties.is_none());
    assert!(listing.internal_properties.is_none());
}

#[test]
fn own_data_properties_replace_inherited_accessors() {
    let harness = Harness::started();
    harness.transport.respond_once(
        "Runtime.getProperties",
        json!({
            "result": [
                { "name": "size", "get": { "type": "function", "objectId": "get-size" } },
                {
                    "name": "__proto__",
                    "get": { "type": "function", "objectId": "get-proto" },
                    "set": { "type": "function", "objectId": "set-proto" },
                },
                { "name": "x", "get": { "type": "function", "objectId": "get-x" } },
            ]
        }),
    );
    harness.transport.respond_once(
        "Runtime.getProperties",
        json!({
            "result": [
                { "name": "x", "value": { "type": "number", "value": 1 }, "isOwn": true },
                { "name": "y", "value": { "type": "number", "value": 2 }, "isOwn": true },
            ],
            "privateProperties": [
                { "name": "#p", "value": { "type": "number", "value": 3 } },
            ],
        }),
    );
    let object = remote(&harness, json!({ "type": "object", "objectId": "obj-1" }));

    let listing = block_on(load_from_object_per_proto(&object, false, false));

    let properties = listing.properties.expect("listed");
    let names: Vec<&str> = properties.iter().map(|property| property.name.as_str()).collect();
    assert_eq!(names, ["size", "x", "y", "#p"]);
    assert_eq!(properties[1].value.as_deref().and_then(number), Some(1.0));
    assert!(!properties[1].is_accessor_property());

    let requests = harness.transport.params_of("Runtime.getProperties");
    assert_eq!(requests[0]["accessorPropertiesOnly"], json!(true));
    assert_eq!(requests[1]["ownProperties"], json!(true));
}

#[test]
fn handles_are_released_once() {
    let harness = Harness::started();
    let object = remote(&harness, json!({ "type": "object", "objectId": "obj-1" }));
    block_on(object.release());
    block_on(object.release());
    assert_eq!(
        harness.transport.params_of("Runtime.releaseObject"),
        [json!({ "objectId": "obj-1" })]
    );
}

#[test]
fn setting_a_property_evaluates_then_assigns() {
    let harness = Harness::started();
    harness.transport.respond(
        "Runtime.evaluate",
        json!({ "result": { "type": "number", "value": 42, "description": "42" } }),
    );
    harness.transport.respond(
        "Runtime.callFunctionOn",
        json!({ "result": { "type": "undefined" } }),
    );
    let object = remote(&harness, json!({ "type": "object", "objectId": "obj-1" }));

    let error = block_on(object.set_property_value("x", "40 + 2"));

    assert_eq!(error, None);
    let evaluated = &harness.transport.params_of("Runtime.evaluate")[0];
    assert_eq!(evaluated["expression"], json!("40 + 2"));
    assert_eq!(evaluated["silent"], json!(true));
    let assigned = &harness.transport.params_of("Runtime.callFunctionOn")[0];
    assert_eq!(assigned["objectId"], json!("obj-1"));
    assert_eq!(assigned["arguments"][0]["value"], json!("x"));
    assert_eq!(assigned["arguments"][1]["value"], json!(42));
}

#[test]
fn a_throwing_expression_reports_its_description() {
    let harness = Harness::started();
    harness.transport.respond(
        "Runtime.evaluate",
        json!({
            "result": {
                "type": "object",
                "subtype": "error",
                "description": "ReferenceError: nope is not defined",
            },
            "exceptionDetails": {
                "exceptionId": 1,
                "text": "Uncaught",
                "lineNumber": 0,
                "columnNumber": 0,
            },
        }),
    );
    let object = remote(&harness, json!({ "type": "object", "objectId": "obj-1" }));

    let error = block_on(object.set_property_value("x", "nope"));
    assert_eq!(error.as_deref(), Some("ReferenceError: nope is not defined"));
    assert_eq!(harness.transport.count("Runtime.callFunctionOn"), 0);
}

#[test]
fn local_values_cannot_be_mutated() {
    let harness = Harness::started();
    let value = RemoteValue::from_local_json(json!({ "a": 1 }));
    assert_eq!(
        block_on(value.set_property_value("a", "2")).as_deref(),
        Some("Can't set a property of non-object.")
    );
    assert!(harness.transport.methods().is_empty());
}

#[test]
fn scope_variables_are_written_through_the_debugger() {
    let harness = Harness::started();
    harness.script_parsed("1", "app.js", 0, 20);
    harness.paused_at("1", 2, 0);
    harness.transport.clear_calls();
    harness.transport.respond(
        "Runtime.getProperties",
        json!({
            "result": [
                { "name": "x", "value": { "type": "number", "value": 1 }, "writable": true },
            ]
        }),
    );
    harness.transport.respond(
        "Runtime.evaluate",
        json!({ "result": { "type": "number", "value": 42, "description": "42" } }),
    );
    let frame = harness
        .target
        .debugger()
        .selected_call_frame()
        .expect("selected");
    let scope = frame.scope_chain()[0].object();

    let before = block_on(scope.get_own_properties(false, false));
    assert_eq!(
        before.properties.expect("listed")[0].value.as_deref().and_then(number),
        Some(1.0)
    );

    assert_eq!(block_on(scope.set_property_value("x", "42")), None);
    assert_eq!(
        harness.transport.params_of("Debugger.setVariableValue"),
        [json!({
            "scopeNumber": 0,
            "variableName": "x",
            "newValue": { "value": 42 },
            "callFrameId": "frame-0",
        })]
    );

    let after = block_on(scope.get_own_properties(false, false));
    assert_eq!(
        after.properties.expect("cached")[0].value.as_deref().and_then(number),
        Some(42.0)
    );
    assert_eq!(harness.transport.count("Runtime.getProperties"), 1);
}

#[test]
fn array_elements_are_fetched_by_index() {
    let harness = Harness::started();
    harness.transport.respond(
        "Runtime.callFunctionOn",
        json!({ "result": { "type": "number", "value": 20, "description": "20" } }),
    );
    let array = RemoteArray::object_as_array(remote(
        &harness,
        json!({ "type": "object", "subtype": "array", "description": "Array(3)", "objectId": "arr-1" }),
    ))
    .expect("an array");

    assert_eq!(array.length(), 3);
    let element = block_on(array.at(1)).expect("in range");
    assert_eq!(number(&element), Some(20.0));
    assert_eq!(
        harness.transport.params_of("Runtime.callFunctionOn")[0]["arguments"],
        json!([{ "value": 1 }])
    );
    assert_eq!(
        block_on(array.at(3)).err(),
        Some(SessionError::IndexOutOfRange { index: 3, length: 3 })
    );
}

#[test]
fn only_arrays_are_viewed_as_arrays() {
    let harness = Harness::started();
    let object = remote(&harness, json!({ "type": "object", "objectId": "obj-1" }));
    assert_eq!(
        RemoteArray::object_as_array(object).err(),
        Some(SessionError::NotAnArray)
    );
}

#[test]
fn buffer_bytes_are_read_by_value() {
    let harness = Harness::started();
    harness.transport.respond(
        "Runtime.callFunctionOn",
        json!({ "result": { "type": "object", "subtype": "array", "value": [7, 9] } }),
    );
    let buffer = RemoteArrayBuffer::new(remote(
        &harness,
        json!({
            "type": "object",
            "subtype": "arraybuffer",
            "description": "ArrayBuffer(4)",
            "objectId": "buf-1",
        }),
    ))
    .expect("a buffer");

    assert_eq!(buffer.byte_length(), 4);
    assert_eq!(block_on(buffer.bytes(1, Some(3))), Ok(vec![7, 9]));
    let call = &harness.transport.params_of("Runtime.callFunctionOn")[0];
    assert_eq!(call["arguments"], json!([{ "value": 1 }, { "value": 2 }]));
    assert_eq!(call["returnByValue"], json!(true));
    assert_eq!(
        block_on(buffer.bytes(4, None)),
        Err(SessionError::ByteRangeOutOfBounds {
            start: 4,
            end: 4,
            length: 4
        })
    );
}

#[test]
fn function_details_come_from_internal_properties() {
    let harness = Harness::started();
    harness.transport.respond(
        "Runtime.getProperties",
        json!({
            "result": [
                { "name": "name", "value": { "type": "string", "value": "handler" }, "isOwn": true },
            ],
            "internalProperties": [
                {
                    "name": "[[FunctionLocation]]",
                    "value": {
                        "type": "object",
                        "subtype": "internal#location",
                        "value": { "scriptId": "1", "lineNumber": 4, "columnNumber": 2 },
                    },
                },
            ],
        }),
    );
    let function = RemoteFunction::object_as_function(remote(
        &harness,
        json!({ "type": "function", "objectId": "fn-1" }),
    ))
    .expect("a function");

    let details = block_on(function.target_function_details());

    assert_eq!(
        details,
        Some(FunctionDetails {
            location: Some(Location::new(ScriptId::from("1"), 4, Some(2))),
            function_name: "handler".to_owned(),
        })
    );
    assert_eq!(harness.transport.count("Runtime.releaseObject"), 0);
}

#[test]
fn bound_functions_resolve_to_their_target() {
    let harness = Harness::started();
    harness.transport.respond_once(
        "Runtime.getProperties",
        json!({
            "result": [],
            "internalProperties": [
                { "name": "[[TargetFunction]]", "value": { "type": "function", "objectId": "fn-target" } },
            ],
        }),
    );
    let function = RemoteFunction::object_as_function(remote(
        &harness,
        json!({ "type": "function", "objectId": "fn-bound" }),
    ))
    .expect("a function");

    let target = block_on(function.target_function());
    assert_eq!(target.object_id().map(|id| id.as_str()), Some("fn-target"));
}

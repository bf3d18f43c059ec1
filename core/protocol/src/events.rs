//! Out-of-band protocol events.
//!
//! Every event the session core reacts to is a variant of [`ProtocolEvent`],
//! decoded from `{"method": ..., "params": ...}` and matched explicitly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    debugger::{CallFramePayload, LocationPayload, PausedReason, ScriptLanguage},
    runtime::ExecutionContextDescription,
    types::{
        BreakpointId, ExceptionDetails, ExecutionContextId, RemoteObjectPayload, ScriptId,
        StackTrace, StackTraceId,
    },
};

/// Protocol event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ProtocolEvent {
    /// A script was compiled.
    #[serde(rename = "Debugger.scriptParsed")]
    ScriptParsed(ScriptParsedEvent),
    /// A script failed to compile.
    #[serde(rename = "Debugger.scriptFailedToParse")]
    ScriptFailedToParse(ScriptParsedEvent),
    /// Execution stopped.
    #[serde(rename = "Debugger.paused")]
    Paused(PausedEvent),
    /// Execution resumed.
    #[serde(rename = "Debugger.resumed")]
    Resumed(ResumedEvent),
    /// A breakpoint got a concrete location.
    #[serde(rename = "Debugger.breakpointResolved")]
    BreakpointResolved(BreakpointResolvedEvent),
    /// A new execution context exists.
    #[serde(rename = "Runtime.executionContextCreated")]
    ExecutionContextCreated(ExecutionContextCreatedEvent),
    /// An execution context went away.
    #[serde(rename = "Runtime.executionContextDestroyed")]
    ExecutionContextDestroyed(ExecutionContextDestroyedEvent),
    /// Every execution context went away.
    #[serde(rename = "Runtime.executionContextsCleared")]
    ExecutionContextsCleared(ExecutionContextsClearedEvent),
    /// An exception was not handled.
    #[serde(rename = "Runtime.exceptionThrown")]
    ExceptionThrown(ExceptionThrownEvent),
    /// A previously unhandled exception was handled.
    #[serde(rename = "Runtime.exceptionRevoked")]
    ExceptionRevoked(ExceptionRevokedEvent),
    /// A `console` method was called.
    #[serde(rename = "Runtime.consoleAPICalled")]
    ConsoleApiCalled(ConsoleApiCalledEvent),
}

impl ProtocolEvent {
    /// Returns the wire method name of this event.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::ScriptParsed(_) => "Debugger.scriptParsed",
            Self::ScriptFailedToParse(_) => "Debugger.scriptFailedToParse",
            Self::Paused(_) => "Debugger.paused",
            Self::Resumed(_) => "Debugger.resumed",
            Self::BreakpointResolved(_) => "Debugger.breakpointResolved",
            Self::ExecutionContextCreated(_) => "Runtime.executionContextCreated",
            Self::ExecutionContextDestroyed(_) => "Runtime.executionContextDestroyed",
            Self::ExecutionContextsCleared(_) => "Runtime.executionContextsCleared",
            Self::ExceptionThrown(_) => "Runtime.exceptionThrown",
            Self::ExceptionRevoked(_) => "Runtime.exceptionRevoked",
            Self::ConsoleApiCalled(_) => "Runtime.consoleAPICalled",
        }
    }
}

/// Payload of `Debugger.scriptParsed` and `Debugger.scriptFailedToParse`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsedEvent {
    pub script_id: ScriptId,
    pub url: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub execution_context_id: ExecutionContextId,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_context_aux_data: Option<Value>,
    #[serde(default)]
    pub is_live_edit: bool,
    #[serde(
        rename = "sourceMapURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_map_url: Option<String>,
    #[serde(rename = "hasSourceURL", default)]
    pub has_source_url: bool,
    #[serde(default)]
    pub is_module: bool,
    #[serde(default)]
    pub length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_offset: Option<u32>,
    #[serde(default)]
    pub script_language: ScriptLanguage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedder_name: Option<String>,
}

/// Payload of `Debugger.paused`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedEvent {
    pub call_frames: Vec<CallFramePayload>,
    pub reason: PausedReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub hit_breakpoints: Vec<BreakpointId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_stack_trace: Option<StackTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_stack_trace_id: Option<StackTraceId>,
}

/// Payload of `Debugger.resumed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumedEvent {}

/// Payload of `Debugger.breakpointResolved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointResolvedEvent {
    pub breakpoint_id: BreakpointId,
    pub location: LocationPayload,
}

/// Payload of `Runtime.executionContextCreated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContextCreatedEvent {
    pub context: ExecutionContextDescription,
}

/// Payload of `Runtime.executionContextDestroyed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextDestroyedEvent {
    pub execution_context_id: ExecutionContextId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_context_unique_id: Option<String>,
}

/// Payload of `Runtime.executionContextsCleared`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContextsClearedEvent {}

/// Payload of `Runtime.exceptionThrown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionThrownEvent {
    pub timestamp: f64,
    pub exception_details: ExceptionDetails,
}

/// Payload of `Runtime.exceptionRevoked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRevokedEvent {
    pub reason: String,
    pub exception_id: i64,
}

/// Payload of `Runtime.consoleAPICalled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleApiCalledEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub args: Vec<RemoteObjectPayload>,
    pub execution_context_id: ExecutionContextId,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_tagged_events() {
        let event: ProtocolEvent = serde_json::from_value(json!({
            "method": "Debugger.breakpointResolved",
            "params": {
                "breakpointId": "1:2:0:a.js",
                "location": { "scriptId": "7", "lineNumber": 2, "columnNumber": 4 }
            }
        }))
        .unwrap();

        let ProtocolEvent::BreakpointResolved(resolved) = &event else {
            panic!("unexpected event {event:?}");
        };
        assert_eq!(resolved.breakpoint_id.as_str(), "1:2:0:a.js");
        assert_eq!(resolved.location.column_number, Some(4));
        assert_eq!(event.method(), "Debugger.breakpointResolved");
    }

    #[test]
    fn decodes_events_with_empty_params() {
        let event: ProtocolEvent =
            serde_json::from_value(json!({ "method": "Debugger.resumed", "params": {} })).unwrap();
        assert_eq!(event, ProtocolEvent::Resumed(ResumedEvent {}));
    }

    #[test]
    fn script_parsed_defaults_optional_fields() {
        let event: ProtocolEvent = serde_json::from_value(json!({
            "method": "Debugger.scriptParsed",
            "params": {
                "scriptId": "3", "url": "", "startLine": 0, "startColumn": 0,
                "endLine": 1, "endColumn": 0, "executionContextId": 1, "hash": "h"
            }
        }))
        .unwrap();
        let ProtocolEvent::ScriptParsed(parsed) = event else {
            panic!("expected scriptParsed");
        };
        assert!(!parsed.is_live_edit);
        assert_eq!(parsed.source_map_url, None);
        assert_eq!(parsed.script_language, ScriptLanguage::JavaScript);
    }

    #[test]
    fn unknown_methods_are_rejected() {
        let event: Result<ProtocolEvent, _> =
            serde_json::from_value(json!({ "method": "Page.loadEventFired", "params": {} }));
        assert!(event.is_err());
    }
}

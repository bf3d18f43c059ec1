//! `Runtime` domain: execution contexts, evaluation and object inspection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    transport::command,
    types::{
        CallArgument, Empty, ExceptionDetails, ExecutionContextId, RemoteObjectId,
        RemoteObjectPayload, ScriptId,
    },
};

// ============================================================================
// Payloads
// ============================================================================

/// Description of an isolated world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextDescription {
    pub id: ExecutionContextId,
    pub origin: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux_data: Option<Value>,
}

/// Object property descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RemoteObjectPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<RemoteObjectPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<RemoteObjectPayload>,
    #[serde(default)]
    pub configurable: bool,
    #[serde(default)]
    pub enumerable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_thrown: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_own: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<RemoteObjectPayload>,
}

/// Engine-internal slot such as `[[TargetFunction]]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalPropertyDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RemoteObjectPayload>,
}

/// A `#private` class member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivatePropertyDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RemoteObjectPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<RemoteObjectPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<RemoteObjectPayload>,
}

/// Result object with optional exception details, shared by evaluation commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub result: RemoteObjectPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_details: Option<ExceptionDetails>,
}

// ============================================================================
// Commands
// ============================================================================

/// Enables reporting of execution context events.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Enable {}
command!(Enable => "Runtime.enable", Empty);

/// Evaluates an expression on the global object.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct Evaluate {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_group: Option<String>,
    pub include_command_line_api: bool,
    pub silent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<ExecutionContextId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_context_id: Option<String>,
    pub return_by_value: bool,
    pub generate_preview: bool,
    pub user_gesture: bool,
    pub await_promise: bool,
    pub throw_on_side_effect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    pub disable_breaks: bool,
    pub repl_mode: bool,
    pub allow_unsafe_eval_blocked_by_csp: bool,
}
command!(Evaluate => "Runtime.evaluate", EvaluateResponse);

/// Lists the properties of an object.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProperties {
    pub object_id: RemoteObjectId,
    pub own_properties: bool,
    pub accessor_properties_only: bool,
    pub non_indexed_properties_only: bool,
    pub generate_preview: bool,
}

/// Response of [`GetProperties`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPropertiesResponse {
    pub result: Vec<PropertyDescriptor>,
    #[serde(default)]
    pub internal_properties: Option<Vec<InternalPropertyDescriptor>>,
    #[serde(default)]
    pub private_properties: Option<Vec<PrivatePropertyDescriptor>>,
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}
command!(GetProperties => "Runtime.getProperties", GetPropertiesResponse);

/// Calls a function with `this` bound to an object.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionOn {
    pub function_declaration: String,
    pub object_id: RemoteObjectId,
    pub arguments: Vec<CallArgument>,
    pub silent: bool,
    pub return_by_value: bool,
}
command!(CallFunctionOn => "Runtime.callFunctionOn", EvaluateResponse);

/// Releases one handle.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseObject {
    pub object_id: RemoteObjectId,
}
command!(ReleaseObject => "Runtime.releaseObject", Empty);

/// Releases every handle of a group.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseObjectGroup {
    pub object_group: String,
}
command!(ReleaseObjectGroup => "Runtime.releaseObjectGroup", Empty);

/// Compiles an expression without running it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileScript {
    pub expression: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    pub persist_script: bool,
    pub execution_context_id: ExecutionContextId,
}

/// Response of [`CompileScript`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileScriptResponse {
    #[serde(default)]
    pub script_id: Option<ScriptId>,
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}
command!(CompileScript => "Runtime.compileScript", CompileScriptResponse);

/// Runs a previously compiled script.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct RunScript {
    pub script_id: ScriptId,
    pub execution_context_id: ExecutionContextId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_group: Option<String>,
    pub silent: bool,
    pub include_command_line_api: bool,
    pub return_by_value: bool,
    pub generate_preview: bool,
    pub await_promise: bool,
}
command!(RunScript => "Runtime.runScript", EvaluateResponse);

/// Collects every object whose prototype chain contains the given prototype.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryObjects {
    pub prototype_object_id: RemoteObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_group: Option<String>,
}

/// Response of [`QueryObjects`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryObjectsResponse {
    pub objects: RemoteObjectPayload,
}
command!(QueryObjects => "Runtime.queryObjects", QueryObjectsResponse);

/// Lists the `let`/`const`/`class` names of the global lexical scope.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalLexicalScopeNames {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_context_id: Option<ExecutionContextId>,
}

/// Response of [`GlobalLexicalScopeNames`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GlobalLexicalScopeNamesResponse {
    pub names: Vec<String>,
}
command!(GlobalLexicalScopeNames => "Runtime.globalLexicalScopeNames", GlobalLexicalScopeNamesResponse);

/// Releases a target paused on start.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunIfWaitingForDebugger {}
command!(RunIfWaitingForDebugger => "Runtime.runIfWaitingForDebugger", Empty);

/// Terminates the current or next JavaScript execution.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TerminateExecution {}
command!(TerminateExecution => "Runtime.terminateExecution", Empty);

/// Fetches the exception details of an error object.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetExceptionDetails {
    pub error_object_id: RemoteObjectId,
}

/// Response of [`GetExceptionDetails`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetExceptionDetailsResponse {
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}
command!(GetExceptionDetails => "Runtime.getExceptionDetails", GetExceptionDetailsResponse);

/// Toggles custom object formatters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SetCustomObjectFormatterEnabled {
    pub enabled: bool,
}
command!(SetCustomObjectFormatterEnabled => "Runtime.setCustomObjectFormatterEnabled", Empty);

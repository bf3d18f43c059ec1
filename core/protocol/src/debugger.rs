//! `Debugger` domain: scripts, breakpoints, stepping and call frames.

use serde::{Deserialize, Serialize};

use crate::{
    runtime::EvaluateResponse,
    transport::command,
    types::{
        BreakpointId, CallArgument, CallFrameId, Empty, RemoteObjectPayload, ScriptId,
        StackTrace, StackTraceId, UniqueDebuggerId,
    },
};

// ============================================================================
// Payloads
// ============================================================================

/// Location in a script, as sent on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    pub script_id: ScriptId,
    pub line_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
}

/// Line/column pair inside a script. Ordered by line, then column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPosition {
    pub line_number: u32,
    pub column_number: u32,
}

impl ScriptPosition {
    /// Creates a new position.
    #[must_use]
    pub const fn new(line_number: u32, column_number: u32) -> Self {
        Self {
            line_number,
            column_number,
        }
    }
}

/// A range of one script, used for step skip lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRangePayload {
    pub script_id: ScriptId,
    pub start: ScriptPosition,
    pub end: ScriptPosition,
}

/// Kind of a possible break location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum BreakLocationType {
    DebuggerStatement,
    Call,
    Return,
}

/// A location where a breakpoint could be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakLocationPayload {
    pub script_id: ScriptId,
    pub line_number: u32,
    #[serde(default)]
    pub column_number: Option<u32>,
    #[serde(rename = "type", default)]
    pub kind: Option<BreakLocationType>,
}

/// Kind of a lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum ScopeType {
    Global,
    Local,
    With,
    Closure,
    Catch,
    Block,
    Script,
    Eval,
    Module,
    WasmExpressionStack,
}

/// Scope description of a paused call frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopePayload {
    #[serde(rename = "type")]
    pub kind: ScopeType,
    pub object: RemoteObjectPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_location: Option<LocationPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_location: Option<LocationPayload>,
}

/// A call frame of a paused stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFramePayload {
    pub call_frame_id: CallFrameId,
    pub function_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_location: Option<LocationPayload>,
    pub location: LocationPayload,
    #[serde(default)]
    pub url: String,
    pub scope_chain: Vec<ScopePayload>,
    #[serde(rename = "this")]
    pub this_object: RemoteObjectPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<RemoteObjectPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_be_restarted: Option<bool>,
}

/// Why execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum PausedReason {
    Ambiguous,
    Assert,
    #[serde(rename = "CSPViolation")]
    CspViolation,
    DebugCommand,
    #[serde(rename = "DOM")]
    Dom,
    #[serde(rename = "EventListener")]
    EventListener,
    Exception,
    Instrumentation,
    #[serde(rename = "OOM")]
    Oom,
    PromiseRejection,
    #[serde(rename = "XHR")]
    Xhr,
    Step,
    #[serde(other)]
    Other,
}

/// Language of a parsed script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ScriptLanguage {
    #[default]
    JavaScript,
    WebAssembly,
}

/// State of pause-on-exceptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum PauseOnExceptionsState {
    #[default]
    None,
    Uncaught,
    All,
}

// ============================================================================
// Commands
// ============================================================================

/// Enables the debugger agent.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scripts_cache_size: Option<f64>,
}

/// Response of [`Enable`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableResponse {
    pub debugger_id: UniqueDebuggerId,
}
command!(Enable => "Debugger.enable", EnableResponse);

/// Disables the debugger agent.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Disable {}
command!(Disable => "Debugger.disable", Empty);

/// Chooses which exceptions pause execution.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SetPauseOnExceptions {
    pub state: PauseOnExceptionsState,
}
command!(SetPauseOnExceptions => "Debugger.setPauseOnExceptions", Empty);

/// Sets how many async hops are collected; zero disables async traces.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAsyncCallStackDepth {
    pub max_depth: u32,
}
command!(SetAsyncCallStackDepth => "Debugger.setAsyncCallStackDepth", Empty);

/// Activates or deactivates every breakpoint at once.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SetBreakpointsActive {
    pub active: bool,
}
command!(SetBreakpointsActive => "Debugger.setBreakpointsActive", Empty);

/// Makes the backend ignore every pause.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SetSkipAllPauses {
    pub skip: bool,
}
command!(SetSkipAllPauses => "Debugger.setSkipAllPauses", Empty);

/// Sets an instrumentation breakpoint, e.g. `beforeScriptExecution`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetInstrumentationBreakpoint {
    pub instrumentation: String,
}

/// Response of breakpoint commands that only return an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointIdResponse {
    pub breakpoint_id: BreakpointId,
}
command!(SetInstrumentationBreakpoint => "Debugger.setInstrumentationBreakpoint", BreakpointIdResponse);

/// Sets a breakpoint on every script matching a URL, regex or hash.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrl {
    pub line_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Response of [`SetBreakpointByUrl`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlResponse {
    pub breakpoint_id: BreakpointId,
    pub locations: Vec<LocationPayload>,
}
command!(SetBreakpointByUrl => "Debugger.setBreakpointByUrl", SetBreakpointByUrlResponse);

/// Sets a breakpoint at a concrete location.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpoint {
    pub location: LocationPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Response of [`SetBreakpoint`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointResponse {
    pub breakpoint_id: BreakpointId,
    pub actual_location: LocationPayload,
}
command!(SetBreakpoint => "Debugger.setBreakpoint", SetBreakpointResponse);

/// Removes a breakpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBreakpoint {
    pub breakpoint_id: BreakpointId,
}
command!(RemoveBreakpoint => "Debugger.removeBreakpoint", Empty);

/// Lists possible break locations in a range.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPossibleBreakpoints {
    pub start: LocationPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<LocationPayload>,
    pub restrict_to_function: bool,
}

/// Response of [`GetPossibleBreakpoints`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GetPossibleBreakpointsResponse {
    pub locations: Vec<BreakLocationPayload>,
}
command!(GetPossibleBreakpoints => "Debugger.getPossibleBreakpoints", GetPossibleBreakpointsResponse);

/// Continues to a location, optionally only within the current frames.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueToLocation {
    pub location: LocationPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_call_frames: Option<String>,
}
command!(ContinueToLocation => "Debugger.continueToLocation", Empty);

/// Stops on the next statement.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Pause {}
command!(Pause => "Debugger.pause", Empty);

/// Resumes execution.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub terminate_on_resume: bool,
}
command!(Resume => "Debugger.resume", Empty);

/// Steps into the next call.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInto {
    pub break_on_async_call: bool,
    pub skip_list: Vec<LocationRangePayload>,
}
command!(StepInto => "Debugger.stepInto", Empty);

/// Steps over the next statement.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOver {
    pub skip_list: Vec<LocationRangePayload>,
}
command!(StepOver => "Debugger.stepOver", Empty);

/// Steps out of the current function.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StepOut {}
command!(StepOut => "Debugger.stepOut", Empty);

/// Evaluates an expression in a paused call frame.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct EvaluateOnCallFrame {
    pub call_frame_id: CallFrameId,
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_group: Option<String>,
    pub include_command_line_api: bool,
    pub silent: bool,
    pub return_by_value: bool,
    pub generate_preview: bool,
    pub throw_on_side_effect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}
command!(EvaluateOnCallFrame => "Debugger.evaluateOnCallFrame", EvaluateResponse);

/// Restarts a call frame.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartFrame {
    pub call_frame_id: CallFrameId,
    pub mode: String,
}
command!(RestartFrame => "Debugger.restartFrame", Empty);

/// Overrides the return value of the top frame.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReturnValue {
    pub new_value: CallArgument,
}
command!(SetReturnValue => "Debugger.setReturnValue", Empty);

/// Writes a variable of a scope.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableValue {
    pub scope_number: usize,
    pub variable_name: String,
    pub new_value: CallArgument,
    pub call_frame_id: CallFrameId,
}
command!(SetVariableValue => "Debugger.setVariableValue", Empty);

/// Replaces the blackbox patterns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetBlackboxPatterns {
    pub patterns: Vec<String>,
}
command!(SetBlackboxPatterns => "Debugger.setBlackboxPatterns", Empty);

/// Fetches an async stack trace by id.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStackTrace {
    pub stack_trace_id: StackTraceId,
}

/// Response of [`GetStackTrace`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStackTraceResponse {
    pub stack_trace: StackTrace,
}
command!(GetStackTrace => "Debugger.getStackTrace", GetStackTraceResponse);

/// Fetches the source text of a script.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSource {
    pub script_id: ScriptId,
}

/// Response of [`GetScriptSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceResponse {
    pub script_source: String,
    #[serde(default)]
    pub bytecode: Option<String>,
}
command!(GetScriptSource => "Debugger.getScriptSource", GetScriptSourceResponse);

//! Execution contexts, evaluation and the factory for remote values.
//!
//! [`RuntimeSession`] owns every [`ExecutionContext`] of a target and mints
//! [`RemoteValue`]s for payloads coming back from the backend. It knows the
//! debugger session of the same target only through a weak link, used to
//! route evaluations to the selected call frame and to reset scripts when
//! contexts go away.

mod context;

use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;
use inspector_protocol::{
    CallArgument, ExceptionDetails, ExecutionContextId, ProtocolError, RemoteObjectId,
    RemoteObjectPayload, ScriptId, StackTrace, Transport,
    events::ConsoleApiCalledEvent,
    runtime::{
        CallFunctionOn, CompileScript, Enable, Evaluate, EvaluateResponse, ExecutionContextDescription,
        GetExceptionDetails, GlobalLexicalScopeNames, QueryObjects, ReleaseObjectGroup, RunIfWaitingForDebugger,
        RunScript, SetCustomObjectFormatterEnabled, TerminateExecution,
    },
    send,
};

use crate::{
    debugger::DebuggerSession,
    events::EventDispatcher,
    remote::{PrimitiveMirror, PrimitiveValue, RemoteHandle, RemoteValue, ScopeObject, ScopeRef},
};

pub use context::*;

/// Async expression that only a side-effect-checking backend refuses to run.
const SIDE_EFFECT_PROBE: &str = "(async function(){ await 1; })()";

/// Exception description prefix reported when a side effect was blocked.
///
/// Matching on this text couples the session to the backend's wording.
const SIDE_EFFECT_FAILURE_PREFIX: &str = "EvalError: Possible side-effect in debug-evaluate";

pub(crate) const SIDE_EFFECTS_UNSUPPORTED: &str = "Side-effect checks not supported by backend.";

/// Options of an evaluation, shared by global and call frame evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct EvaluationOptions {
    /// Source text; an empty expression evaluates `this`.
    pub expression: String,
    /// Object group the result handle is put in.
    pub object_group: Option<String>,
    /// Expose the command line API.
    pub include_command_line_api: bool,
    /// Do not report exceptions or pause on them.
    pub silent: bool,
    /// Return the result by value.
    pub return_by_value: bool,
    /// Attach a preview to the result.
    pub generate_preview: bool,
    /// Abort on the first side effect.
    pub throw_on_side_effect: bool,
    /// Terminate after this many milliseconds.
    pub timeout: Option<f64>,
    /// Ignore breakpoints while evaluating.
    pub disable_breaks: bool,
    /// Evaluate as REPL input.
    pub repl_mode: bool,
    /// Run even if the page's CSP blocks `eval`.
    pub allow_unsafe_eval_blocked_by_csp: bool,
}

impl EvaluationOptions {
    /// Options evaluating `expression` with every flag off.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            ..Self::default()
        }
    }

    fn needs_termination_checks(&self) -> bool {
        self.throw_on_side_effect || self.timeout.is_some()
    }
}

/// Outcome of an evaluation.
#[derive(Debug, Clone)]
pub enum EvaluationResult {
    /// The evaluation ran. `exception_details` is set when it threw.
    Object {
        /// Result, or the thrown value.
        object: Rc<RemoteValue>,
        /// Details of the exception, if one was thrown.
        exception_details: Option<ExceptionDetails>,
    },
    /// The evaluation could not run.
    Error(String),
}

impl EvaluationResult {
    /// The resulting value, if the evaluation ran.
    #[must_use]
    pub fn object(&self) -> Option<&Rc<RemoteValue>> {
        match self {
            Self::Object { object, .. } => Some(object),
            Self::Error(_) => None,
        }
    }

    /// The error message, if the evaluation could not run.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Object { .. } => None,
            Self::Error(message) => Some(message),
        }
    }

    /// Exception details, if the evaluation threw.
    #[must_use]
    pub fn exception_details(&self) -> Option<&ExceptionDetails> {
        match self {
            Self::Object {
                exception_details, ..
            } => exception_details.as_ref(),
            Self::Error(_) => None,
        }
    }
}

/// A `console` call reported by the backend.
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    /// Console method, e.g. `log`.
    pub kind: String,
    /// Arguments of the call.
    pub args: Vec<Rc<RemoteValue>>,
    /// Context the call happened in.
    pub execution_context_id: ExecutionContextId,
    /// Milliseconds since epoch.
    pub timestamp: f64,
    /// Where the call happened.
    pub stack_trace: Option<StackTrace>,
    /// Console context name.
    pub context: Option<String>,
}

/// A compiled, not yet run script.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileScriptResult {
    /// Id of the persisted script.
    pub script_id: Option<ScriptId>,
    /// Compile error.
    pub exception_details: Option<ExceptionDetails>,
}

/// Events of a [`RuntimeSession`].
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A context was added.
    ExecutionContextCreated(Rc<ExecutionContext>),
    /// A context was removed.
    ExecutionContextDestroyed(Rc<ExecutionContext>),
    /// The label of a context changed.
    ExecutionContextChanged(Rc<ExecutionContext>),
    /// The comparator changed; `execution_contexts()` may return a new order.
    ExecutionContextOrderChanged,
    /// An exception was not handled.
    ExceptionThrown {
        /// Milliseconds since epoch.
        timestamp: f64,
        /// What was thrown, and where.
        details: ExceptionDetails,
    },
    /// A previously reported exception was handled.
    ExceptionRevoked(i64),
    /// A `console` method was called.
    ConsoleApiCalled(ConsoleMessage),
}

/// Runtime state of one target.
pub struct RuntimeSession {
    transport: Rc<dyn Transport>,
    target: Rc<TargetInfo>,
    debugger: RefCell<Weak<DebuggerSession>>,
    // Insertion order is creation order.
    contexts: RefCell<IndexMap<ExecutionContextId, Rc<ExecutionContext>>>,
    comparator: RefCell<ExecutionContextComparator>,
    side_effect_support: Cell<Option<bool>>,
    events: EventDispatcher<RuntimeEvent>,
}

impl fmt::Debug for RuntimeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeSession")
            .field("target", &self.target.id)
            .field("contexts", &self.contexts.borrow().keys().collect::<Vec<_>>())
            .field("side_effect_support", &self.side_effect_support.get())
            .finish_non_exhaustive()
    }
}

impl RuntimeSession {
    /// Creates the runtime session of `target`.
    #[must_use]
    pub fn new(transport: Rc<dyn Transport>, target: Rc<TargetInfo>) -> Rc<Self> {
        Rc::new(Self {
            transport,
            target,
            debugger: RefCell::new(Weak::new()),
            contexts: RefCell::new(IndexMap::new()),
            comparator: RefCell::new(Rc::new(ExecutionContext::compare)),
            side_effect_support: Cell::new(None),
            events: EventDispatcher::new(),
        })
    }

    pub(crate) fn attach_debugger(&self, debugger: &Rc<DebuggerSession>) {
        *self.debugger.borrow_mut() = Rc::downgrade(debugger);
    }

    /// The debugger session of the same target, while it is alive.
    #[must_use]
    pub fn debugger(&self) -> Option<Rc<DebuggerSession>> {
        self.debugger.borrow().upgrade()
    }

    /// The transport commands go through.
    #[must_use]
    pub fn transport(&self) -> &Rc<dyn Transport> {
        &self.transport
    }

    /// The target this session belongs to.
    #[must_use]
    pub fn target(&self) -> &Rc<TargetInfo> {
        &self.target
    }

    /// Listener surface.
    #[must_use]
    pub fn events(&self) -> &EventDispatcher<RuntimeEvent> {
        &self.events
    }

    /// Enables context reporting.
    ///
    /// # Errors
    ///
    /// Returns the protocol error if the backend refused.
    pub async fn enable(&self) -> Result<(), ProtocolError> {
        send(&*self.transport, &Enable {}).await.map(drop)
    }

    /// Turns custom object formatters on or off.
    pub async fn set_custom_formatters_enabled(&self, enabled: bool) {
        let response = send(&*self.transport, &SetCustomObjectFormatterEnabled { enabled }).await;
        if let Err(err) = response {
            log::error!("failed to toggle custom formatters: {err}");
        }
    }

    // ------------------------------------------------------------------------
    // Execution contexts
    // ------------------------------------------------------------------------

    /// Handles `Runtime.executionContextCreated`.
    pub fn execution_context_created(&self, description: ExecutionContextDescription) -> Rc<ExecutionContext> {
        let context = Rc::new(ExecutionContext::new(description, Rc::clone(&self.target)));
        log::debug!("execution context {} created", context.id);
        self.contexts
            .borrow_mut()
            .insert(context.id, Rc::clone(&context));
        self.events
            .dispatch(&RuntimeEvent::ExecutionContextCreated(Rc::clone(&context)));
        context
    }

    /// Handles `Runtime.executionContextDestroyed`.
    ///
    /// Source maps of the context are detached first. Losing the last context
    /// resets the debugger session.
    pub fn execution_context_destroyed(&self, execution_context_id: ExecutionContextId) {
        let debugger = self.debugger();
        if let Some(debugger) = &debugger {
            debugger.execution_context_destroyed(execution_context_id);
        }
        let removed = self
            .contexts
            .borrow_mut()
            .shift_remove(&execution_context_id);
        let Some(context) = removed else {
            return;
        };
        log::debug!("execution context {execution_context_id} destroyed");
        self.events
            .dispatch(&RuntimeEvent::ExecutionContextDestroyed(context));
        if self.contexts.borrow().is_empty()
            && let Some(debugger) = debugger
        {
            debugger.global_object_cleared();
        }
    }

    /// Handles `Runtime.executionContextsCleared`.
    ///
    /// The debugger is reset first, then one destroyed event fires per context.
    pub fn execution_contexts_cleared(&self) {
        if let Some(debugger) = self.debugger() {
            debugger.global_object_cleared();
        }
        let contexts: Vec<Rc<ExecutionContext>> =
            self.contexts.borrow_mut().drain(..).map(|(_, context)| context).collect();
        for context in contexts {
            self.events
                .dispatch(&RuntimeEvent::ExecutionContextDestroyed(context));
        }
    }

    /// Every known context, in display order.
    #[must_use]
    pub fn execution_contexts(&self) -> Vec<Rc<ExecutionContext>> {
        let mut contexts: Vec<Rc<ExecutionContext>> = self.contexts.borrow().values().cloned().collect();
        let comparator = Rc::clone(&self.comparator.borrow());
        contexts.sort_by(|a, b| comparator(a, b));
        contexts
    }

    /// Looks up a context by id.
    #[must_use]
    pub fn execution_context(&self, id: ExecutionContextId) -> Option<Rc<ExecutionContext>> {
        self.contexts.borrow().get(&id).cloned()
    }

    /// The first main-world context in display order.
    #[must_use]
    pub fn default_execution_context(&self) -> Option<Rc<ExecutionContext>> {
        self.execution_contexts()
            .into_iter()
            .find(|context| context.is_default)
    }

    /// Replaces the display order of contexts.
    pub fn set_execution_context_comparator(
        &self,
        comparator: impl Fn(&ExecutionContext, &ExecutionContext) -> Ordering + 'static,
    ) {
        *self.comparator.borrow_mut() = Rc::new(comparator);
        self.fire_execution_context_order_changed();
    }

    /// Tells listeners that the display order may have changed.
    pub fn fire_execution_context_order_changed(&self) {
        self.events
            .dispatch(&RuntimeEvent::ExecutionContextOrderChanged);
    }

    /// Sets the display label of a context; an empty label restores the default.
    pub fn set_execution_context_label(&self, id: ExecutionContextId, label: &str) {
        let Some(context) = self.execution_context(id) else {
            return;
        };
        context.set_label(label);
        self.events
            .dispatch(&RuntimeEvent::ExecutionContextChanged(context));
    }

    // ------------------------------------------------------------------------
    // Remote values
    // ------------------------------------------------------------------------

    /// Wraps a payload: a handle when it carries an object id, a local mirror otherwise.
    #[must_use]
    pub fn create_remote_object(self: &Rc<Self>, payload: RemoteObjectPayload) -> Rc<RemoteValue> {
        let value = match payload.object_id.clone() {
            Some(object_id) => RemoteValue::Handle(RemoteHandle::new(Rc::clone(self), object_id, payload)),
            None => RemoteValue::Primitive(PrimitiveMirror::from_payload(payload)),
        };
        Rc::new(value)
    }

    /// Wraps the object backing a scope; property writes go to `scope_ref`.
    #[must_use]
    pub fn create_scope_remote_object(
        self: &Rc<Self>,
        payload: RemoteObjectPayload,
        scope_ref: ScopeRef,
    ) -> Rc<RemoteValue> {
        let value = match payload.object_id.clone() {
            Some(object_id) => RemoteValue::Scope(ScopeObject::new(
                RemoteHandle::new(Rc::clone(self), object_id, payload),
                scope_ref,
            )),
            None => RemoteValue::Primitive(PrimitiveMirror::from_payload(payload)),
        };
        Rc::new(value)
    }

    /// Wraps a local primitive.
    #[must_use]
    pub fn create_remote_object_from_primitive_value(&self, value: PrimitiveValue) -> Rc<RemoteValue> {
        Rc::new(RemoteValue::Primitive(PrimitiveMirror::from_value(value)))
    }

    // ------------------------------------------------------------------------
    // Side-effect checks
    // ------------------------------------------------------------------------

    /// Memoized result of the side-effect probe; `None` until it ran.
    #[must_use]
    pub fn has_side_effect_support(&self) -> Option<bool> {
        self.side_effect_support.get()
    }

    /// Probes whether the backend can abort evaluations on side effects.
    ///
    /// The probe runs in the most recently created context. Without any context
    /// the answer is `false` and nothing is memoized.
    pub async fn check_side_effect_support(&self) -> bool {
        if let Some(supported) = self.side_effect_support.get() {
            return supported;
        }
        let Some(context) = self.contexts.borrow().values().last().cloned() else {
            return false;
        };
        let response = send(
            &*self.transport,
            &Evaluate {
                expression: SIDE_EFFECT_PROBE.to_owned(),
                context_id: Some(context.id),
                throw_on_side_effect: true,
                ..Evaluate::default()
            },
        )
        .await;
        let supported = response.is_ok_and(|response| is_side_effect_failure(&response));
        log::debug!("side-effect checks supported: {supported}");
        self.side_effect_support.set(Some(supported));
        supported
    }

    /// `false` when `options` need side-effect checks the backend lacks.
    pub(crate) async fn allows_termination_options(&self, options: &EvaluationOptions) -> bool {
        if !options.needs_termination_checks() {
            return true;
        }
        match self.side_effect_support.get() {
            Some(supported) => supported,
            None => self.check_side_effect_support().await,
        }
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Evaluates in `context`, or in the selected call frame while paused.
    pub async fn evaluate_in_context(
        self: &Rc<Self>,
        context: &ExecutionContext,
        options: &EvaluationOptions,
        user_gesture: bool,
        await_promise: bool,
    ) -> EvaluationResult {
        if let Some(debugger) = self.debugger()
            && debugger.selected_call_frame().is_some()
        {
            return debugger
                .evaluate_on_selected_call_frame(options)
                .await
                .unwrap_or_else(|err| EvaluationResult::Error(err.to_string()));
        }
        if !self.allows_termination_options(options).await {
            return EvaluationResult::Error(SIDE_EFFECTS_UNSUPPORTED.to_owned());
        }

        let expression = if options.expression.is_empty() {
            "this".to_owned()
        } else {
            options.expression.clone()
        };
        let response = send(
            &*self.transport,
            &Evaluate {
                expression,
                object_group: options.object_group.clone(),
                include_command_line_api: options.include_command_line_api,
                silent: options.silent,
                context_id: context.unique_id.is_none().then_some(context.id),
                unique_context_id: context.unique_id.clone(),
                return_by_value: options.return_by_value,
                generate_preview: options.generate_preview,
                user_gesture,
                await_promise,
                throw_on_side_effect: options.throw_on_side_effect,
                timeout: options.timeout,
                disable_breaks: options.disable_breaks,
                repl_mode: options.repl_mode,
                allow_unsafe_eval_blocked_by_csp: options.allow_unsafe_eval_blocked_by_csp,
            },
        )
        .await;
        self.evaluation_result(response)
    }

    pub(crate) fn evaluation_result(
        self: &Rc<Self>,
        response: Result<EvaluateResponse, ProtocolError>,
    ) -> EvaluationResult {
        match response {
            Ok(response) => EvaluationResult::Object {
                object: self.create_remote_object(response.result),
                exception_details: response.exception_details,
            },
            Err(err) => {
                log::error!("evaluation failed: {err}");
                EvaluationResult::Error(err.to_string())
            }
        }
    }

    /// Calls `declaration` with `this` bound to `object_id`.
    pub async fn call_function_on(
        self: &Rc<Self>,
        object_id: &RemoteObjectId,
        declaration: &str,
        arguments: Vec<CallArgument>,
        return_by_value: bool,
    ) -> EvaluationResult {
        let response = send(
            &*self.transport,
            &CallFunctionOn {
                function_declaration: declaration.to_owned(),
                object_id: object_id.clone(),
                arguments,
                silent: true,
                return_by_value,
            },
        )
        .await;
        self.evaluation_result(response)
    }

    /// Releases every handle of `object_group`.
    pub async fn release_object_group(&self, object_group: &str) {
        let response = send(
            &*self.transport,
            &ReleaseObjectGroup {
                object_group: object_group.to_owned(),
            },
        )
        .await;
        if let Err(err) = response {
            log::debug!("failed to release object group {object_group}: {err}");
        }
    }

    /// Releases the result of an evaluation and the exception it threw, if any.
    pub async fn release_evaluation_result(self: &Rc<Self>, result: &EvaluationResult) {
        let EvaluationResult::Object {
            object,
            exception_details,
        } = result
        else {
            return;
        };
        object.release().await;
        if let Some(exception) = exception_details
            .as_ref()
            .and_then(|details| details.exception.as_ref())
            .filter(|exception| exception.object_id.is_some())
        {
            self.create_remote_object(RemoteObjectPayload {
                value_type: exception.value_type,
                object_id: exception.object_id.clone(),
                ..RemoteObjectPayload::default()
            })
            .release()
            .await;
        }
    }

    /// Compiles `expression` in a context without running it.
    pub async fn compile_script(
        &self,
        expression: &str,
        source_url: &str,
        persist_script: bool,
        execution_context_id: ExecutionContextId,
    ) -> Option<CompileScriptResult> {
        let response = send(
            &*self.transport,
            &CompileScript {
                expression: expression.to_owned(),
                source_url: source_url.to_owned(),
                persist_script,
                execution_context_id,
            },
        )
        .await;
        match response {
            Ok(response) => Some(CompileScriptResult {
                script_id: response.script_id,
                exception_details: response.exception_details,
            }),
            Err(err) => {
                log::error!("failed to compile script: {err}");
                None
            }
        }
    }

    /// Runs a script compiled with `persist_script`.
    pub async fn run_script(self: &Rc<Self>, command: RunScript) -> EvaluationResult {
        let response = send(&*self.transport, &command).await;
        self.evaluation_result(response)
    }

    /// Collects the objects whose prototype chain contains `prototype`.
    pub async fn query_objects(self: &Rc<Self>, prototype: &RemoteValue) -> EvaluationResult {
        let Some(prototype_object_id) = prototype.object_id() else {
            return EvaluationResult::Error("Prototype should be an Object.".to_owned());
        };
        let response = send(
            &*self.transport,
            &QueryObjects {
                prototype_object_id: prototype_object_id.clone(),
                object_group: Some("console".to_owned()),
            },
        )
        .await;
        match response {
            Ok(response) => EvaluationResult::Object {
                object: self.create_remote_object(response.objects),
                exception_details: None,
            },
            Err(err) => {
                log::error!("failed to query objects: {err}");
                EvaluationResult::Error(err.to_string())
            }
        }
    }

    /// Names of the global lexical scope, `None` if the backend failed.
    pub async fn global_lexical_scope_names(
        &self,
        execution_context_id: Option<ExecutionContextId>,
    ) -> Option<Vec<String>> {
        send(
            &*self.transport,
            &GlobalLexicalScopeNames {
                execution_context_id,
            },
        )
        .await
        .map(|response| response.names)
        .ok()
    }

    /// Lets a target that waits for the debugger start running.
    pub async fn run_if_waiting_for_debugger(&self) {
        if let Err(err) = send(&*self.transport, &RunIfWaitingForDebugger {}).await {
            log::error!("runIfWaitingForDebugger failed: {err}");
        }
    }

    /// Terminates the running script.
    pub async fn terminate_execution(&self) {
        if let Err(err) = send(&*self.transport, &TerminateExecution {}).await {
            log::error!("terminateExecution failed: {err}");
        }
    }

    /// Exception details of an error object.
    pub async fn get_exception_details(&self, error_object_id: &RemoteObjectId) -> Option<ExceptionDetails> {
        send(
            &*self.transport,
            &GetExceptionDetails {
                error_object_id: error_object_id.clone(),
            },
        )
        .await
        .ok()
        .and_then(|response| response.exception_details)
    }

    // ------------------------------------------------------------------------
    // Exceptions and console
    // ------------------------------------------------------------------------

    /// Handles `Runtime.exceptionThrown`.
    pub fn exception_thrown(&self, timestamp: f64, details: ExceptionDetails) {
        self.events
            .dispatch(&RuntimeEvent::ExceptionThrown { timestamp, details });
    }

    /// Handles `Runtime.exceptionRevoked`.
    pub fn exception_revoked(&self, exception_id: i64) {
        self.events
            .dispatch(&RuntimeEvent::ExceptionRevoked(exception_id));
    }

    /// Handles `Runtime.consoleAPICalled`.
    pub fn console_api_called(self: &Rc<Self>, event: ConsoleApiCalledEvent) {
        let args = event
            .args
            .into_iter()
            .map(|payload| self.create_remote_object(payload))
            .collect();
        self.events
            .dispatch(&RuntimeEvent::ConsoleApiCalled(ConsoleMessage {
                kind: event.kind,
                args,
                execution_context_id: event.execution_context_id,
                timestamp: event.timestamp,
                stack_trace: event.stack_trace,
                context: event.context,
            }));
    }
}

/// Returns `true` if an evaluation was refused because of a side effect.
#[must_use]
pub fn is_side_effect_failure(response: &EvaluateResponse) -> bool {
    response
        .exception_details
        .as_ref()
        .and_then(|details| details.exception.as_ref())
        .and_then(|exception| exception.description.as_deref())
        .is_some_and(|description| description.starts_with(SIDE_EFFECT_FAILURE_PREFIX))
}

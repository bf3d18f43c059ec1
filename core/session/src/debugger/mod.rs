//! The debugger session of a target.
//!
//! [`DebuggerSession`] drives the `Debugger` domain: it enables the agent,
//! registers parsed scripts, sets breakpoints, and turns `paused`/`resumed`
//! events into [`DebuggerPausedDetails`] and a selected [`CallFrame`].
//!
//! # State
//!
//! The agent moves through `Disabled → Enabling → Enabled`. While enabled,
//! [`ExecutionState`] tells whether the target runs, has been asked to pause,
//! or is paused.
//!
//! The session is implemented across several files:
//!
//! - `breakpoints`: breakpoint commands and resolution routing
//! - `stepping`: pause, resume, steps and skip-all-pauses
//! - `paused`: paused details and the handling of `Debugger.paused`
//! - `call_frame`: call frames and their scopes

mod breakpoints;
mod call_frame;
mod paused;
mod stepping;

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use inspector_protocol::{
    CallArgument, CallFrameId, Command, ExecutionContextId, ProtocolError, ScriptId, StackTrace,
    StackTraceId, Transport, UniqueDebuggerId,
    debugger::{
        Disable, Enable, GetStackTrace, LocationPayload, SetAsyncCallStackDepth,
        SetBlackboxPatterns, SetBreakpointsActive, SetInstrumentationBreakpoint,
        SetPauseOnExceptions, SetVariableValue,
    },
    events::ScriptParsedEvent,
    send,
};
use serde_json::Value;

use crate::{
    config::SessionConfig,
    events::{BreakpointEventRouter, EventDispatcher},
    location::Location,
    policy::{
        AutoStepRanges, BeforePausedPolicy, BreakpointSynchronizer, CallFrameEvaluator,
        CallFrameExpander, Policies,
    },
    registry::SessionRegistry,
    remote::{PrimitiveValue, RemoteValue},
    runtime::RuntimeSession,
    scheduler::Scheduler,
    script::Script,
    script_registry::ScriptRegistry,
    source_map::{SourceMapManager, source_map_id},
};

pub use breakpoints::SetBreakpointResult;
pub use call_frame::{CallFrame, Scope};
pub use paused::DebuggerPausedDetails;

const FUNCTION_LOCATION: &str = "[[FunctionLocation]]";

/// Enablement of the debugger agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DebuggerState {
    /// Not enabled.
    #[default]
    Disabled,
    /// `Debugger.enable` is in flight.
    Enabling,
    /// Enabled.
    Enabled,
}

/// What the target is doing, as far as the session knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    /// Running.
    Running,
    /// A pause was requested and has not been reported yet.
    Pausing,
    /// Paused.
    Paused,
}

/// Events of a [`DebuggerSession`].
#[derive(Debug, Clone)]
pub enum DebuggerEvent {
    /// The agent was enabled.
    WasEnabled,
    /// The agent was disabled.
    WasDisabled,
    /// The agent has an identity and can pause.
    IsReadyToPause,
    /// Execution paused.
    Paused(Rc<DebuggerPausedDetails>),
    /// Execution resumed.
    Resumed,
    /// A script was registered.
    ParsedScriptSource(Rc<Script>),
    /// An anonymous script that failed to parse was evicted.
    DiscardedAnonymousScriptSource(Rc<Script>),
    /// Every script and the paused state were dropped.
    GlobalObjectCleared,
    /// The selected call frame changed.
    CallFrameSelected(Option<Rc<CallFrame>>),
    /// Breakpoints were activated or deactivated.
    BreakpointsActiveChanged(bool),
}

/// Location and name of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDetails {
    /// Where the function is defined.
    pub location: Option<Location>,
    /// Value of its `name` property.
    pub function_name: String,
}

type ContinueToLocationCallback = Box<dyn FnOnce(&DebuggerPausedDetails) -> bool>;

/// Debugger state of one target.
pub struct DebuggerSession {
    weak_self: Weak<Self>,
    transport: Rc<dyn Transport>,
    runtime: Rc<RuntimeSession>,
    scheduler: Rc<dyn Scheduler>,
    source_maps: Rc<dyn SourceMapManager>,
    registry: Rc<SessionRegistry>,
    config: RefCell<SessionConfig>,
    state: Cell<DebuggerState>,
    debugger_id: RefCell<Option<UniqueDebuggerId>>,
    scripts: RefCell<ScriptRegistry>,
    is_pausing: Cell<bool>,
    paused_details: RefCell<Option<Rc<DebuggerPausedDetails>>>,
    selected_call_frame: RefCell<Option<Rc<CallFrame>>>,
    auto_step_over: Cell<bool>,
    // Token of the outstanding skip-all-pauses timer.
    skip_all_pauses_timer: Cell<Option<u64>>,
    timer_counter: Cell<u64>,
    continue_to_location: RefCell<Option<ContinueToLocationCallback>>,
    policies: Policies,
    events: EventDispatcher<DebuggerEvent>,
    breakpoint_events: BreakpointEventRouter<Location>,
}

impl fmt::Debug for DebuggerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebuggerSession")
            .field("state", &self.state.get())
            .field("debugger_id", &self.debugger_id.borrow())
            .field("scripts", &self.scripts.borrow().len())
            .field("is_pausing", &self.is_pausing.get())
            .field("paused", &self.paused_details.borrow().is_some())
            .finish_non_exhaustive()
    }
}

/// Logs a failed command and turns its result into an `Option`.
fn report<T>(method: &str, result: Result<T, ProtocolError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log::error!("{method} failed: {err}");
            None
        }
    }
}

impl DebuggerSession {
    /// Creates the debugger session paired with `runtime`.
    #[must_use]
    pub fn new(
        runtime: &Rc<RuntimeSession>,
        scheduler: Rc<dyn Scheduler>,
        source_maps: Rc<dyn SourceMapManager>,
        registry: Rc<SessionRegistry>,
        config: SessionConfig,
    ) -> Rc<Self> {
        source_maps.set_enabled(config.js_source_maps_enabled);
        let session = Rc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            transport: Rc::clone(runtime.transport()),
            runtime: Rc::clone(runtime),
            scheduler,
            source_maps,
            registry,
            config: RefCell::new(config),
            state: Cell::new(DebuggerState::Disabled),
            debugger_id: RefCell::new(None),
            scripts: RefCell::new(ScriptRegistry::new()),
            is_pausing: Cell::new(false),
            paused_details: RefCell::new(None),
            selected_call_frame: RefCell::new(None),
            auto_step_over: Cell::new(false),
            skip_all_pauses_timer: Cell::new(None),
            timer_counter: Cell::new(0),
            continue_to_location: RefCell::new(None),
            policies: Policies::default(),
            events: EventDispatcher::new(),
            breakpoint_events: BreakpointEventRouter::default(),
        });
        runtime.attach_debugger(&session);
        session
    }

    /// The runtime session of the same target.
    #[must_use]
    pub fn runtime(&self) -> &Rc<RuntimeSession> {
        &self.runtime
    }

    /// Listener surface.
    #[must_use]
    pub fn events(&self) -> &EventDispatcher<DebuggerEvent> {
        &self.events
    }

    /// A copy of the current settings.
    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.config.borrow().clone()
    }

    /// The source map collaborator.
    #[must_use]
    pub fn source_map_manager(&self) -> &Rc<dyn SourceMapManager> {
        &self.source_maps
    }

    // ------------------------------------------------------------------------
    // Enablement
    // ------------------------------------------------------------------------

    /// Returns `true` while enabling or enabled.
    #[must_use]
    pub fn debugger_enabled(&self) -> bool {
        self.state.get() != DebuggerState::Disabled
    }

    /// Current enablement.
    #[must_use]
    pub fn state(&self) -> DebuggerState {
        self.state.get()
    }

    /// Identity assigned by the backend on enable.
    #[must_use]
    pub fn debugger_id(&self) -> Option<UniqueDebuggerId> {
        self.debugger_id.borrow().clone()
    }

    /// Enables the agent and pushes the current settings. Does nothing if
    /// already enabled.
    pub async fn enable(&self) {
        if self.state.get() != DebuggerState::Disabled {
            return;
        }
        self.state.set(DebuggerState::Enabling);
        let config = self.config();

        let enable = send(
            &*self.transport,
            &Enable {
                max_scripts_cache_size: Some(config.max_scripts_cache_size()),
            },
        );
        let instrumentation = config.instrumentation_breakpoints.then(|| {
            send(
                &*self.transport,
                &SetInstrumentationBreakpoint {
                    instrumentation: "beforeScriptExecution".to_owned(),
                },
            )
        });
        let pause_on_exceptions = send(
            &*self.transport,
            &SetPauseOnExceptions {
                state: config.pause_on_exceptions_state(),
            },
        );
        let async_depth = send(
            &*self.transport,
            &SetAsyncCallStackDepth {
                max_depth: config.async_stack_depth(),
            },
        );
        let breakpoints_inactive = (!config.breakpoints_active)
            .then(|| send(&*self.transport, &SetBreakpointsActive { active: false }));
        self.events.dispatch(&DebuggerEvent::WasEnabled);

        let response = enable.await;
        if let Some(instrumentation) = instrumentation {
            report(SetInstrumentationBreakpoint::NAME, instrumentation.await);
        }
        report(SetPauseOnExceptions::NAME, pause_on_exceptions.await);
        report(SetAsyncCallStackDepth::NAME, async_depth.await);
        if let Some(inactive) = breakpoints_inactive {
            report(SetBreakpointsActive::NAME, inactive.await);
        }

        if self.state.get() == DebuggerState::Disabled {
            return;
        }
        match response {
            Ok(response) => {
                self.state.set(DebuggerState::Enabled);
                log::debug!("debugger enabled as {}", response.debugger_id);
                self.register_debugger(response.debugger_id);
            }
            Err(err) => {
                log::error!("failed to enable debugger: {err}");
                self.state.set(DebuggerState::Disabled);
            }
        }
    }

    /// Disables the agent and drops every script. Safe to call when disabled.
    pub async fn disable(&self) {
        if self.state.get() == DebuggerState::Disabled {
            return;
        }
        self.state.set(DebuggerState::Disabled);
        report(
            SetAsyncCallStackDepth::NAME,
            send(&*self.transport, &SetAsyncCallStackDepth { max_depth: 0 }).await,
        );
        report(Disable::NAME, send(&*self.transport, &Disable {}).await);
        self.is_pausing.set(false);
        self.global_object_cleared();
        self.events.dispatch(&DebuggerEvent::WasDisabled);
        if let Some(id) = self.debugger_id.borrow_mut().take() {
            self.registry.unregister(&id);
        }
        log::debug!("debugger disabled");
    }

    /// Enables the agent again to learn its current identity.
    pub async fn sync_debugger_id(&self) {
        let max_scripts_cache_size = Some(self.config.borrow().max_scripts_cache_size());
        let response = send(
            &*self.transport,
            &Enable {
                max_scripts_cache_size,
            },
        )
        .await;
        if let Some(response) = report(Enable::NAME, response) {
            self.register_debugger(response.debugger_id);
        }
    }

    fn register_debugger(&self, id: UniqueDebuggerId) {
        let previous = self.debugger_id.borrow_mut().replace(id.clone());
        if let Some(previous) = previous.filter(|previous| *previous != id) {
            self.registry.unregister(&previous);
        }
        if let Some(session) = self.weak_self.upgrade() {
            self.registry.register(id, &session);
        }
        self.events.dispatch(&DebuggerEvent::IsReadyToPause);
    }

    /// Disables the agent while the target is suspended.
    pub async fn suspend_model(&self) {
        self.disable().await;
    }

    /// Enables the agent again after [`suspend_model`](Self::suspend_model).
    pub async fn resume_model(&self) {
        self.enable().await;
    }

    /// Releases the source map manager and the registry entry.
    pub fn dispose(&self) {
        self.source_maps.dispose();
        if let Some(id) = self.debugger_id.borrow_mut().take() {
            self.registry.unregister(&id);
        }
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Updates pause-on-exceptions and pushes it when enabled.
    pub async fn set_pause_on_exceptions(&self, enabled: bool, caught: bool) {
        let state = {
            let mut config = self.config.borrow_mut();
            config.pause_on_exception_enabled = enabled;
            config.pause_on_caught_exception = caught;
            config.pause_on_exceptions_state()
        };
        if self.debugger_enabled() {
            report(
                SetPauseOnExceptions::NAME,
                send(&*self.transport, &SetPauseOnExceptions { state }).await,
            );
        }
    }

    /// Turns async stack traces on or off.
    pub async fn set_async_stack_traces_enabled(&self, enabled: bool) {
        let max_depth = {
            let mut config = self.config.borrow_mut();
            config.disable_async_stack_traces = !enabled;
            config.async_stack_depth()
        };
        if self.debugger_enabled() {
            report(
                SetAsyncCallStackDepth::NAME,
                send(&*self.transport, &SetAsyncCallStackDepth { max_depth }).await,
            );
        }
    }

    /// Activates or deactivates all breakpoints.
    pub async fn set_breakpoints_active(&self, active: bool) {
        self.config.borrow_mut().breakpoints_active = active;
        report(
            SetBreakpointsActive::NAME,
            send(&*self.transport, &SetBreakpointsActive { active }).await,
        );
        self.events
            .dispatch(&DebuggerEvent::BreakpointsActiveChanged(active));
    }

    /// Whether breakpoints are active.
    #[must_use]
    pub fn breakpoints_active(&self) -> bool {
        self.config.borrow().breakpoints_active
    }

    /// Turns source map resolution on or off.
    pub fn set_source_maps_enabled(&self, enabled: bool) {
        self.config.borrow_mut().js_source_maps_enabled = enabled;
        self.source_maps.set_enabled(enabled);
    }

    /// Replaces the blackbox patterns. Returns `false` if the backend refused.
    pub async fn set_blackbox_patterns(&self, patterns: Vec<String>) -> bool {
        report(
            SetBlackboxPatterns::NAME,
            send(&*self.transport, &SetBlackboxPatterns { patterns }).await,
        )
        .is_some()
    }

    // ------------------------------------------------------------------------
    // Strategies
    // ------------------------------------------------------------------------

    /// Installs or removes the before-paused veto.
    pub fn set_before_paused_callback(&self, policy: Option<Rc<dyn BeforePausedPolicy>>) {
        *self.policies.before_paused.borrow_mut() = policy;
    }

    /// Installs or removes the call frame expander.
    pub fn set_expand_call_frames_callback(&self, policy: Option<Rc<dyn CallFrameExpander>>) {
        *self.policies.expand_call_frames.borrow_mut() = policy;
    }

    /// Installs or removes the auto-step range strategy.
    pub fn set_compute_auto_step_ranges_callback(&self, policy: Option<Rc<dyn AutoStepRanges>>) {
        *self.policies.auto_step_ranges.borrow_mut() = policy;
    }

    /// Installs or removes the call frame evaluation override.
    pub fn set_evaluate_on_call_frame_callback(&self, policy: Option<Rc<dyn CallFrameEvaluator>>) {
        *self.policies.evaluate_on_call_frame.borrow_mut() = policy;
    }

    /// Installs or removes the breakpoint synchronizer used on instrumentation pauses.
    pub fn set_synchronize_breakpoints_callback(
        &self,
        policy: Option<Rc<dyn BreakpointSynchronizer>>,
    ) {
        *self.policies.synchronize_breakpoints.borrow_mut() = policy;
    }

    pub(crate) fn evaluate_on_call_frame_callback(&self) -> Option<Rc<dyn CallFrameEvaluator>> {
        self.policies.evaluate_on_call_frame.borrow().clone()
    }

    // ------------------------------------------------------------------------
    // Scripts
    // ------------------------------------------------------------------------

    /// Every registered script.
    #[must_use]
    pub fn scripts(&self) -> Vec<Rc<Script>> {
        self.scripts.borrow().scripts()
    }

    /// Looks up a script by id.
    #[must_use]
    pub fn script_for_id(&self, script_id: &ScriptId) -> Option<Rc<Script>> {
        self.scripts.borrow().get(script_id)
    }

    /// Scripts sharing `source_url`, newest first.
    #[must_use]
    pub fn scripts_for_source_url(&self, source_url: Option<&str>) -> Vec<Rc<Script>> {
        self.scripts.borrow().scripts_for_source_url(source_url)
    }

    /// Scripts compiled in an execution context.
    #[must_use]
    pub fn scripts_for_execution_context(
        &self,
        execution_context_id: ExecutionContextId,
    ) -> Vec<Rc<Script>> {
        self.scripts
            .borrow()
            .scripts_for_execution_context(execution_context_id)
    }

    /// Number of queued discardable scripts.
    #[must_use]
    pub fn discardable_script_count(&self) -> usize {
        self.scripts.borrow().discardable_count()
    }

    /// Handles `Debugger.scriptParsed` and `Debugger.scriptFailedToParse`.
    ///
    /// Registering an already known script id returns the known script.
    pub fn parsed_script_source(&self, event: ScriptParsedEvent, has_syntax_error: bool) -> Rc<Script> {
        if let Some(known) = self.script_for_id(&event.script_id) {
            return known;
        }
        let is_content_script = event
            .execution_context_aux_data
            .as_ref()
            .and_then(|aux| aux.get("isDefault"))
            .and_then(Value::as_bool)
            .is_some_and(|is_default| !is_default);
        let script = Rc::new(Script::from_event(
            event,
            has_syntax_error,
            is_content_script,
            Rc::clone(&self.transport),
        ));
        self.scripts.borrow_mut().register(Rc::clone(&script));
        self.events
            .dispatch(&DebuggerEvent::ParsedScriptSource(Rc::clone(&script)));

        if !has_syntax_error {
            self.bind_source_map(&script);
        }

        if has_syntax_error && script.is_anonymous_script() {
            let evicted = self
                .scripts
                .borrow_mut()
                .push_discardable(Rc::clone(&script));
            if !evicted.is_empty() {
                log::debug!("evicting {} discarded scripts", evicted.len());
            }
            for discarded in evicted {
                self.events
                    .dispatch(&DebuggerEvent::DiscardedAnonymousScriptSource(discarded));
            }
        }
        script
    }

    /// Binds the map identity of `script` and attaches its map, detaching the
    /// script previously bound to the same identity.
    fn bind_source_map(&self, script: &Rc<Script>) {
        let Some(map_url) = script.source_map_url() else {
            return;
        };
        let Some(id) = source_map_id(script.execution_context_id, &script.source_url, Some(&map_url))
        else {
            return;
        };
        let previous = self.scripts.borrow_mut().bind_source_map(id, Rc::clone(script));
        if let Some(previous) = previous.filter(|previous| !Rc::ptr_eq(previous, script)) {
            self.source_maps.detach(&previous);
        }
        self.source_maps.attach(script, &script.source_url, &map_url);
    }

    /// Replaces the source map URL of `script` and re-attaches its map.
    pub fn set_source_map_url(&self, script: &Rc<Script>, source_map_url: &str) {
        let old_url = script.source_map_url();
        if let Some(old_id) = source_map_id(
            script.execution_context_id,
            &script.source_url,
            old_url.as_deref(),
        ) {
            self.scripts.borrow_mut().unbind_source_map(&old_id, script);
        }
        self.source_maps.detach(script);
        script.set_source_map_url(Some(source_map_url.to_owned()));
        self.bind_source_map(script);
    }

    /// Detaches the source maps of a destroyed context. Its scripts stay registered.
    pub fn execution_context_destroyed(&self, execution_context_id: ExecutionContextId) {
        let unbound = self
            .scripts
            .borrow_mut()
            .unbind_source_maps_of_context(execution_context_id);
        for script in unbound {
            self.source_maps.detach(&script);
        }
    }

    /// Drops the paused state and every script.
    pub fn global_object_cleared(&self) {
        self.set_debugger_paused_details(None);
        self.reset();
        self.events.dispatch(&DebuggerEvent::GlobalObjectCleared);
    }

    fn reset(&self) {
        let with_maps = self.scripts.borrow_mut().clear();
        for script in with_maps {
            self.source_maps.detach(&script);
        }
        self.auto_step_over.set(false);
    }

    // ------------------------------------------------------------------------
    // Locations
    // ------------------------------------------------------------------------

    /// A location in `script`.
    #[must_use]
    pub fn create_raw_location(
        &self,
        script: &Script,
        line_number: u32,
        column_number: Option<u32>,
        inline_frame_index: u32,
    ) -> Location {
        let mut location = script.raw_location(line_number, column_number);
        location.inline_frame_index = inline_frame_index;
        location
    }

    /// A location in the script with id `script_id`, known or not.
    #[must_use]
    pub fn create_raw_location_by_script_id(
        &self,
        script_id: ScriptId,
        line_number: u32,
        column_number: Option<u32>,
        inline_frame_index: u32,
    ) -> Location {
        let mut location = Location::new(script_id, line_number, column_number);
        location.inline_frame_index = inline_frame_index;
        location
    }

    /// A location in the newest script of `source_url` covering the position.
    #[must_use]
    pub fn create_raw_location_by_url(
        &self,
        source_url: &str,
        line_number: u32,
        column_number: Option<u32>,
        inline_frame_index: u32,
    ) -> Option<Location> {
        self.scripts.borrow().raw_location_by_url(
            source_url,
            line_number,
            column_number,
            inline_frame_index,
        )
    }

    /// Locations of every frame of `stack_trace` and its parents.
    #[must_use]
    pub fn create_raw_locations_by_stack_trace(&self, stack_trace: &StackTrace) -> Vec<Location> {
        let mut locations = Vec::new();
        let mut current = Some(stack_trace);
        while let Some(trace) = current {
            locations.extend(trace.call_frames.iter().map(|frame| {
                Location::new(
                    frame.script_id.clone(),
                    frame.line_number,
                    Some(frame.column_number),
                )
            }));
            current = trace.parent.as_deref();
        }
        locations
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Fetches an async stack trace recorded by this or another agent.
    pub async fn fetch_async_stack_trace(&self, stack_trace_id: &StackTraceId) -> Option<StackTrace> {
        let response = send(
            &*self.transport,
            &GetStackTrace {
                stack_trace_id: stack_trace_id.clone(),
            },
        )
        .await;
        report(GetStackTrace::NAME, response).map(|response| response.stack_trace)
    }

    /// Location and name of a function object.
    pub async fn function_details(&self, function: &RemoteValue) -> Option<FunctionDetails> {
        let response = function.get_all_properties(false, false, false).await;
        let properties = response.properties?;

        let location = response
            .internal_properties
            .unwrap_or_default()
            .into_iter()
            .filter(|property| property.name == FUNCTION_LOCATION)
            .filter_map(|property| property.value)
            .next_back()
            .and_then(|value| match value.value() {
                Some(PrimitiveValue::Json(json)) => {
                    serde_json::from_value::<LocationPayload>(json.clone()).ok()
                }
                _ => None,
            })
            .map(|payload| {
                self.create_raw_location_by_script_id(
                    payload.script_id,
                    payload.line_number,
                    payload.column_number,
                    0,
                )
            });

        let function_name = properties
            .iter()
            .filter(|property| property.name == "name")
            .filter_map(|property| match property.value.as_deref()?.value()? {
                PrimitiveValue::String(name) => Some(name.clone()),
                _ => None,
            })
            .next_back()
            .unwrap_or_default();

        Some(FunctionDetails {
            location,
            function_name,
        })
    }

    /// Writes a variable of a paused scope. Returns the backend error, if any.
    pub async fn set_variable_value(
        &self,
        scope_number: usize,
        variable_name: &str,
        new_value: CallArgument,
        call_frame_id: &CallFrameId,
    ) -> Option<String> {
        let response = send(
            &*self.transport,
            &SetVariableValue {
                scope_number,
                variable_name: variable_name.to_owned(),
                new_value,
                call_frame_id: call_frame_id.clone(),
            },
        )
        .await;
        match response {
            Ok(_) => None,
            Err(err) => {
                log::error!("failed to set variable {variable_name}: {err}");
                Some(err.to_string())
            }
        }
    }
}

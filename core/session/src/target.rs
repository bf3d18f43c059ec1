//! Wiring of the runtime and debugger sessions of one target.
//!
//! A [`Target`] owns both sessions and routes incoming protocol events to them.
//! It is created through [`TargetBuilder`]:
//!
//! ```rust,ignore
//! let target = TargetBuilder::new(transport, scheduler)
//!     .config(SessionConfig::from_json(r#"{"pauseOnExceptionEnabled": true}"#)?)
//!     .build();
//! block_on(target.start());
//! ```

use std::{fmt, rc::Rc};

use inspector_protocol::{ProtocolEvent, Transport};
use serde_json::Value;

use crate::{
    config::SessionConfig,
    debugger::DebuggerSession,
    registry::SessionRegistry,
    runtime::{RuntimeSession, TargetInfo, TargetKind},
    scheduler::Scheduler,
    source_map::{NoSourceMaps, SourceMapManager},
};

/// Builder of a [`Target`].
pub struct TargetBuilder {
    transport: Rc<dyn Transport>,
    scheduler: Rc<dyn Scheduler>,
    source_maps: Option<Rc<dyn SourceMapManager>>,
    registry: Option<Rc<SessionRegistry>>,
    config: SessionConfig,
    target_info: Option<Rc<TargetInfo>>,
}

impl fmt::Debug for TargetBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetBuilder")
            .field("config", &self.config)
            .field("target_info", &self.target_info)
            .finish_non_exhaustive()
    }
}

impl TargetBuilder {
    /// Starts a builder for a target reached through `transport`.
    #[must_use]
    pub fn new(transport: Rc<dyn Transport>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            transport,
            scheduler,
            source_maps: None,
            registry: None,
            config: SessionConfig::default(),
            target_info: None,
        }
    }

    /// Sets the source map collaborator. Defaults to [`NoSourceMaps`].
    #[must_use]
    pub fn source_map_manager(mut self, source_maps: Rc<dyn SourceMapManager>) -> Self {
        self.source_maps = Some(source_maps);
        self
    }

    /// Shares a registry with other targets of the same process.
    #[must_use]
    pub fn registry(mut self, registry: Rc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the initial settings.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the target's place in the target tree. Defaults to a root frame.
    #[must_use]
    pub fn target_info(mut self, target_info: Rc<TargetInfo>) -> Self {
        self.target_info = Some(target_info);
        self
    }

    /// Creates both sessions.
    #[must_use]
    pub fn build(self) -> Target {
        let target_info = self
            .target_info
            .unwrap_or_else(|| TargetInfo::root("main", TargetKind::Frame));
        let registry = self.registry.unwrap_or_else(SessionRegistry::new);
        let source_maps = self
            .source_maps
            .unwrap_or_else(|| Rc::new(NoSourceMaps));
        let custom_formatters = self.config.custom_formatters;

        let runtime = RuntimeSession::new(self.transport, target_info);
        let debugger = DebuggerSession::new(
            &runtime,
            self.scheduler,
            source_maps,
            Rc::clone(&registry),
            self.config,
        );
        Target {
            runtime,
            debugger,
            registry,
            custom_formatters,
        }
    }
}

/// A debugged target: its runtime and debugger sessions.
pub struct Target {
    runtime: Rc<RuntimeSession>,
    debugger: Rc<DebuggerSession>,
    registry: Rc<SessionRegistry>,
    custom_formatters: bool,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("runtime", &self.runtime)
            .field("debugger", &self.debugger)
            .finish_non_exhaustive()
    }
}

impl Target {
    /// The runtime session.
    #[must_use]
    pub fn runtime(&self) -> &Rc<RuntimeSession> {
        &self.runtime
    }

    /// The debugger session.
    #[must_use]
    pub fn debugger(&self) -> &Rc<DebuggerSession> {
        &self.debugger
    }

    /// The registry the debugger session registers in.
    #[must_use]
    pub fn registry(&self) -> &Rc<SessionRegistry> {
        &self.registry
    }

    /// Enables the runtime, then the debugger.
    pub async fn start(&self) {
        if let Err(err) = self.runtime.enable().await {
            log::error!("failed to enable runtime: {err}");
        }
        if self.custom_formatters {
            self.runtime.set_custom_formatters_enabled(true).await;
        }
        self.debugger.enable().await;
    }

    /// Routes a protocol event to its session.
    ///
    /// `Debugger` events are dropped while the debugger is disabled.
    pub async fn dispatch(&self, event: ProtocolEvent) {
        let method = event.method();
        if method.starts_with("Debugger.") && !self.debugger.debugger_enabled() {
            log::debug!("dropping {method} while the debugger is disabled");
            return;
        }
        match event {
            ProtocolEvent::ScriptParsed(event) => {
                self.debugger.parsed_script_source(event, false);
            }
            ProtocolEvent::ScriptFailedToParse(event) => {
                self.debugger.parsed_script_source(event, true);
            }
            ProtocolEvent::Paused(event) => self.debugger.paused_script(event).await,
            ProtocolEvent::Resumed(_) => self.debugger.resumed_script(),
            ProtocolEvent::BreakpointResolved(event) => self
                .debugger
                .breakpoint_resolved(&event.breakpoint_id, &event.location),
            ProtocolEvent::ExecutionContextCreated(event) => {
                self.runtime.execution_context_created(event.context);
            }
            ProtocolEvent::ExecutionContextDestroyed(event) => self
                .runtime
                .execution_context_destroyed(event.execution_context_id),
            ProtocolEvent::ExecutionContextsCleared(_) => self.runtime.execution_contexts_cleared(),
            ProtocolEvent::ExceptionThrown(event) => self
                .runtime
                .exception_thrown(event.timestamp, event.exception_details),
            ProtocolEvent::ExceptionRevoked(event) => {
                self.runtime.exception_revoked(event.exception_id);
            }
            ProtocolEvent::ConsoleApiCalled(event) => self.runtime.console_api_called(event),
        }
    }

    /// Decodes and routes a `{"method", "params"}` event. Malformed events are
    /// logged and dropped.
    pub async fn dispatch_json(&self, message: Value) {
        match serde_json::from_value::<ProtocolEvent>(message) {
            Ok(event) => self.dispatch(event).await,
            Err(err) => log::warn!("dropping malformed protocol event: {err}"),
        }
    }

    /// Handles a navigation of the target's main frame.
    ///
    /// Debugger identities may change, and a pending skip-all-pauses timeout
    /// ends early.
    pub async fn on_frame_navigated(&self) {
        self.registry.mark_resync_needed();
        if self.debugger.has_pending_skip_all_pauses_timer() {
            self.debugger.skip_all_pauses(false).await;
        }
    }
}

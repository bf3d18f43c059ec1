//! Fixtures shared by the session integration tests.

#![allow(dead_code, unreachable_pub)]

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
    time::Duration,
};

use futures_lite::future::block_on;
use inspector_protocol::{LocalBoxFuture, ProtocolError, Transport, events::ScriptParsedEvent};
use inspector_session::{Scheduler, Script, SessionConfig, SourceMapManager, Target, TargetBuilder};
use serde_json::{Value, json};

/// Installs a logger once so `RUST_LOG` shows session traces.
pub fn init_logger() {
    let _ = simple_logger::SimpleLogger::new().env().init();
}

/// A transport answering from scripted responses and recording every call.
///
/// One-shot responses are used first, then the persistent response of the
/// method, then an empty object.
#[derive(Default)]
pub struct FakeTransport {
    once: RefCell<HashMap<String, VecDeque<Result<Value, ProtocolError>>>>,
    always: RefCell<HashMap<String, Result<Value, ProtocolError>>>,
    calls: RefCell<Vec<(String, Value)>>,
}

impl FakeTransport {
    /// A transport whose `Debugger.enable` answers with `debugger-1`.
    pub fn new() -> Rc<Self> {
        let transport = Rc::new(Self::default());
        transport.respond("Debugger.enable", json!({ "debuggerId": "debugger-1" }));
        transport
    }

    /// Answers every call of `method` with `result`.
    pub fn respond(&self, method: &str, result: Value) {
        self.always.borrow_mut().insert(method.to_owned(), Ok(result));
    }

    /// Fails every call of `method` with a backend error.
    pub fn fail(&self, method: &str, message: &str) {
        self.always
            .borrow_mut()
            .insert(method.to_owned(), Err(ProtocolError::Remote(message.to_owned())));
    }

    /// Answers the next call of `method` with `result`.
    pub fn respond_once(&self, method: &str, result: Value) {
        self.queue(method, Ok(result));
    }

    /// Fails the next call of `method`.
    pub fn fail_once(&self, method: &str, message: &str) {
        self.queue(method, Err(ProtocolError::Remote(message.to_owned())));
    }

    fn queue(&self, method: &str, result: Result<Value, ProtocolError>) {
        self.once
            .borrow_mut()
            .entry(method.to_owned())
            .or_default()
            .push_back(result);
    }

    /// Every method called so far, in order.
    pub fn methods(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    /// Params of every call of `method`, in order.
    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.calls
            .borrow()
            .iter()
            .filter(|(called, _)| called == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    /// Number of calls of `method`.
    pub fn count(&self, method: &str) -> usize {
        self.params_of(method).len()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl Transport for FakeTransport {
    fn invoke(
        &self,
        method: &'static str,
        params: Value,
    ) -> LocalBoxFuture<'_, Result<Value, ProtocolError>> {
        self.calls.borrow_mut().push((method.to_owned(), params));
        let once = self
            .once
            .borrow_mut()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        let result = once
            .or_else(|| self.always.borrow().get(method).cloned())
            .unwrap_or_else(|| Ok(json!({})));
        Box::pin(async move { result })
    }
}

/// A scheduler whose tasks only run when the test fires them.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: RefCell<Vec<(Duration, LocalBoxFuture<'static, ()>)>>,
}

impl ManualScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Delays of the waiting tasks.
    pub fn delays(&self) -> Vec<Duration> {
        self.tasks.borrow().iter().map(|(delay, _)| *delay).collect()
    }

    /// Runs every waiting task to completion.
    pub fn fire_all(&self) {
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        for (_, task) in tasks {
            block_on(task);
        }
    }
}

impl Scheduler for ManualScheduler {
    fn spawn_after(&self, delay: Duration, task: LocalBoxFuture<'static, ()>) {
        self.tasks.borrow_mut().push((delay, task));
    }
}

/// A source map manager recording what it was asked to do.
#[derive(Default)]
pub struct RecordingSourceMaps {
    log: RefCell<Vec<String>>,
}

impl RecordingSourceMaps {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl SourceMapManager for RecordingSourceMaps {
    fn attach(&self, script: &Rc<Script>, _source_url: &str, source_map_url: &str) {
        self.log
            .borrow_mut()
            .push(format!("attach {} {source_map_url}", script.script_id));
    }

    fn detach(&self, script: &Rc<Script>) {
        self.log
            .borrow_mut()
            .push(format!("detach {}", script.script_id));
    }

    fn set_enabled(&self, enabled: bool) {
        self.log.borrow_mut().push(format!("enabled {enabled}"));
    }

    fn dispose(&self) {
        self.log.borrow_mut().push("dispose".to_owned());
    }
}

/// A target wired to fakes.
pub struct Harness {
    pub transport: Rc<FakeTransport>,
    pub scheduler: Rc<ManualScheduler>,
    pub source_maps: Rc<RecordingSourceMaps>,
    pub target: Target,
}

impl Harness {
    /// A target that has not been started.
    pub fn new(config: SessionConfig) -> Self {
        init_logger();
        let transport = FakeTransport::new();
        let scheduler = ManualScheduler::new();
        let source_maps = RecordingSourceMaps::new();
        let target = TargetBuilder::new(transport.clone(), scheduler.clone())
            .source_map_manager(source_maps.clone())
            .config(config)
            .build();
        Self {
            transport,
            scheduler,
            source_maps,
            target,
        }
    }

    /// A started target with the default config and a clean call log.
    pub fn started() -> Self {
        Self::started_with(SessionConfig::default())
    }

    /// A started target with a clean call log.
    pub fn started_with(config: SessionConfig) -> Self {
        let harness = Self::new(config);
        block_on(harness.target.start());
        harness.transport.clear_calls();
        harness.source_maps.clear();
        harness
    }

    /// Routes a `{"method", "params"}` event.
    pub fn dispatch(&self, method: &str, params: Value) {
        block_on(
            self.target
                .dispatch_json(json!({ "method": method, "params": params })),
        );
    }

    /// Reports an execution context.
    pub fn context_created(&self, id: i64, name: &str, is_default: bool) {
        self.dispatch(
            "Runtime.executionContextCreated",
            json!({
                "context": {
                    "id": id,
                    "origin": "https://example.com",
                    "name": name,
                    "auxData": { "isDefault": is_default, "frameId": "frame-1" },
                }
            }),
        );
    }

    /// Reports a parsed script spanning `start_line..=end_line`.
    pub fn script_parsed(&self, script_id: &str, url: &str, start_line: u32, end_line: u32) {
        self.dispatch(
            "Debugger.scriptParsed",
            script_event(script_id, url, start_line, 0, end_line, 80),
        );
    }

    /// Reports a pause in `script_id` at `line:column`.
    pub fn paused_at(&self, script_id: &str, line: u32, column: u32) {
        self.dispatch(
            "Debugger.paused",
            json!({
                "callFrames": [call_frame("frame-0", script_id, line, column)],
                "reason": "other",
            }),
        );
    }
}

/// `Debugger.scriptParsed` params.
pub fn script_event(
    script_id: &str,
    url: &str,
    start_line: u32,
    start_column: u32,
    end_line: u32,
    end_column: u32,
) -> Value {
    json!({
        "scriptId": script_id,
        "url": url,
        "startLine": start_line,
        "startColumn": start_column,
        "endLine": end_line,
        "endColumn": end_column,
        "executionContextId": 1,
        "hash": format!("hash-{script_id}"),
    })
}

/// A decoded parse event.
pub fn parsed(script_id: &str, url: &str, start_line: u32, start_column: u32) -> ScriptParsedEvent {
    serde_json::from_value(script_event(
        script_id,
        url,
        start_line,
        start_column,
        start_line + 10,
        0,
    ))
    .expect("valid script event")
}

/// A call frame payload with a local and a global scope.
pub fn call_frame(call_frame_id: &str, script_id: &str, line: u32, column: u32) -> Value {
    json!({
        "callFrameId": call_frame_id,
        "functionName": "handler",
        "location": { "scriptId": script_id, "lineNumber": line, "columnNumber": column },
        "url": "",
        "scopeChain": [
            {
                "type": "local",
                "object": { "type": "object", "objectId": format!("{call_frame_id}-local") },
            },
            {
                "type": "global",
                "object": {
                    "type": "object",
                    "className": "Window",
                    "description": "Window",
                    "objectId": format!("{call_frame_id}-global"),
                },
            },
        ],
        "this": { "type": "undefined" },
        "canBeRestarted": true,
    })
}

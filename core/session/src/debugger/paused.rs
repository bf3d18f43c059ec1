//! Paused state.

use std::{fmt, rc::Rc};

use inspector_protocol::{
    BreakpointId, RemoteObjectPayload, ScriptId, StackTrace, StackTraceId,
    debugger::PausedReason, events::PausedEvent,
};
use serde_json::Value;

use super::{CallFrame, DebuggerEvent, DebuggerSession};
use crate::{
    error::{SessionError, SessionResult},
    remote::RemoteValue,
    runtime::{EvaluationOptions, EvaluationResult, RuntimeSession},
};

/// Description the backend gives async traces of `async function` bodies.
const ASYNC_FUNCTION: &str = "async function";

/// Everything known about one pause.
pub struct DebuggerPausedDetails {
    /// Frames, top first.
    pub call_frames: Vec<Rc<CallFrame>>,
    /// Why execution stopped.
    pub reason: PausedReason,
    /// Reason-specific data, e.g. the thrown value.
    pub aux_data: Option<Value>,
    /// Breakpoints hit by this pause.
    pub breakpoint_ids: Vec<BreakpointId>,
    /// Async parent traces with redundant frames removed.
    pub async_stack_trace: Option<StackTrace>,
    /// Async parent trace stored in another agent.
    pub async_stack_trace_id: Option<StackTraceId>,
    runtime: Rc<RuntimeSession>,
}

impl fmt::Debug for DebuggerPausedDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebuggerPausedDetails")
            .field("call_frames", &self.call_frames)
            .field("reason", &self.reason)
            .field("breakpoint_ids", &self.breakpoint_ids)
            .finish_non_exhaustive()
    }
}

impl DebuggerPausedDetails {
    /// Assembles the details of a pause.
    #[must_use]
    pub fn new(
        runtime: Rc<RuntimeSession>,
        call_frames: Vec<Rc<CallFrame>>,
        reason: PausedReason,
        aux_data: Option<Value>,
        breakpoint_ids: Vec<BreakpointId>,
        async_stack_trace: Option<StackTrace>,
        async_stack_trace_id: Option<StackTraceId>,
    ) -> Self {
        Self {
            call_frames,
            reason,
            aux_data,
            breakpoint_ids,
            async_stack_trace: async_stack_trace.map(clean_redundant_frames),
            async_stack_trace_id,
            runtime,
        }
    }

    /// The thrown value of an exception or promise rejection pause.
    #[must_use]
    pub fn exception(&self) -> Option<Rc<RemoteValue>> {
        if !matches!(
            self.reason,
            PausedReason::Exception | PausedReason::PromiseRejection
        ) {
            return None;
        }
        let payload = serde_json::from_value::<RemoteObjectPayload>(self.aux_data.clone()?)
            .inspect_err(|err| log::debug!("malformed exception data: {err}"))
            .ok()?;
        Some(self.runtime.create_remote_object(payload))
    }
}

/// Drops the marker frame heading `async function` traces and unlinks
/// intermediate traces left without frames. The root is never unlinked.
fn clean_redundant_frames(mut trace: StackTrace) -> StackTrace {
    strip_async_function_marker(&mut trace);
    let mut node = &mut trace;
    while let Some(mut parent) = node.parent.take() {
        strip_async_function_marker(&mut parent);
        if parent.call_frames.is_empty() {
            node.parent = parent.parent.take();
        } else {
            node = &mut **node.parent.insert(parent);
        }
    }
    trace
}

fn strip_async_function_marker(trace: &mut StackTrace) {
    if trace.description.as_deref() == Some(ASYNC_FUNCTION) && !trace.call_frames.is_empty() {
        trace.call_frames.remove(0);
    }
}

impl DebuggerSession {
    /// Handles `Debugger.paused`.
    ///
    /// Instrumentation pauses synchronize breakpoints of the script about to
    /// run and resume without surfacing. Other pauses may be swallowed by an
    /// armed continue-to-location or vetoed by the before-paused policy; a
    /// veto steps on.
    pub async fn paused_script(&self, event: PausedEvent) {
        if event.reason == PausedReason::Instrumentation {
            let script_id = event
                .data
                .as_ref()
                .and_then(|data| data.get("scriptId"))
                .and_then(Value::as_str)
                .map(ScriptId::from)
                .or_else(|| {
                    event
                        .call_frames
                        .first()
                        .map(|frame| frame.location.script_id.clone())
                });
            let script = script_id.and_then(|script_id| self.script_for_id(&script_id));
            let policy = self.policies.synchronize_breakpoints.borrow().clone();
            if let (Some(script), Some(policy)) = (script, policy) {
                policy.synchronize(&script).await;
            }
            self.resume().await;
            return;
        }

        let mut call_frames = CallFrame::from_payload_array(self, event.call_frames);
        let expander = self.policies.expand_call_frames.borrow().clone();
        if let Some(expander) = expander {
            call_frames = expander.expand(call_frames).await;
        }
        let details = Rc::new(DebuggerPausedDetails::new(
            Rc::clone(&self.runtime),
            call_frames,
            event.reason,
            event.data,
            event.hit_breakpoints,
            event.async_stack_trace,
            event.async_stack_trace_id,
        ));

        let continue_to_location = self.continue_to_location.borrow_mut().take();
        if let Some(reached) = continue_to_location
            && reached(details.as_ref())
        {
            return;
        }

        if !self.set_debugger_paused_details(Some(details)) {
            if self.auto_step_over.get() {
                self.step_over().await;
            } else {
                self.step_into().await;
            }
        }
    }

    /// Handles `Debugger.resumed`.
    pub fn resumed_script(&self) {
        self.set_debugger_paused_details(None);
        self.events.dispatch(&DebuggerEvent::Resumed);
    }

    /// Commits or clears the paused state.
    ///
    /// Returns `false` when the before-paused policy vetoed the pause. A
    /// committed pause selects its top frame.
    pub fn set_debugger_paused_details(&self, details: Option<Rc<DebuggerPausedDetails>>) -> bool {
        self.is_pausing.set(false);
        let Some(details) = details else {
            *self.paused_details.borrow_mut() = None;
            self.set_selected_call_frame(None);
            return true;
        };

        *self.paused_details.borrow_mut() = Some(Rc::clone(&details));
        let policy = self.policies.before_paused.borrow().clone();
        if let Some(policy) = policy
            && !policy.before_paused(&details)
        {
            return false;
        }
        self.auto_step_over.set(false);
        self.events
            .dispatch(&DebuggerEvent::Paused(Rc::clone(&details)));
        self.set_selected_call_frame(details.call_frames.first().cloned());
        true
    }

    /// Whether the session holds paused details.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused_details.borrow().is_some()
    }

    /// Details of the current pause.
    #[must_use]
    pub fn debugger_paused_details(&self) -> Option<Rc<DebuggerPausedDetails>> {
        self.paused_details.borrow().clone()
    }

    /// The frame evaluations run in while paused.
    #[must_use]
    pub fn selected_call_frame(&self) -> Option<Rc<CallFrame>> {
        self.selected_call_frame.borrow().clone()
    }

    /// Selects a frame. Selecting the current frame again does nothing.
    pub fn set_selected_call_frame(&self, call_frame: Option<Rc<CallFrame>>) {
        {
            let mut selected = self.selected_call_frame.borrow_mut();
            let unchanged = match (selected.as_ref(), call_frame.as_ref()) {
                (Some(current), Some(next)) => Rc::ptr_eq(current, next),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                return;
            }
            *selected = call_frame.clone();
        }
        self.events
            .dispatch(&DebuggerEvent::CallFrameSelected(call_frame));
    }

    /// Evaluates in the selected call frame.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoCallFrameSelected`] when no frame is selected.
    pub async fn evaluate_on_selected_call_frame(
        &self,
        options: &EvaluationOptions,
    ) -> SessionResult<EvaluationResult> {
        let call_frame = self
            .selected_call_frame()
            .ok_or(SessionError::NoCallFrameSelected)?;
        Ok(call_frame.evaluate(options).await)
    }
}

#[cfg(test)]
mod tests {
    use inspector_protocol::RuntimeCallFrame;

    use super::*;

    fn frame(name: &str) -> RuntimeCallFrame {
        RuntimeCallFrame {
            function_name: name.to_owned(),
            script_id: ScriptId::from("1"),
            ..RuntimeCallFrame::default()
        }
    }

    fn trace(description: Option<&str>, names: &[&str], parent: Option<StackTrace>) -> StackTrace {
        StackTrace {
            description: description.map(str::to_owned),
            call_frames: names.iter().copied().map(frame).collect(),
            parent: parent.map(Box::new),
            parent_id: None,
        }
    }

    fn shape(trace: &StackTrace) -> Vec<Vec<String>> {
        let mut shape = Vec::new();
        let mut current = Some(trace);
        while let Some(node) = current {
            shape.push(
                node.call_frames
                    .iter()
                    .map(|frame| frame.function_name.clone())
                    .collect(),
            );
            current = node.parent.as_deref();
        }
        shape
    }

    #[test]
    fn drops_async_function_marker_frames() {
        let cleaned = clean_redundant_frames(trace(
            Some(ASYNC_FUNCTION),
            &["marker", "caller"],
            Some(trace(Some("await"), &["outer"], None)),
        ));
        assert_eq!(shape(&cleaned), vec![vec!["caller"], vec!["outer"]]);
    }

    #[test]
    fn unlinks_empty_intermediate_traces() {
        let cleaned = clean_redundant_frames(trace(
            Some("await"),
            &["a"],
            Some(trace(
                Some(ASYNC_FUNCTION),
                &["marker"],
                Some(trace(Some("await"), &[], Some(trace(None, &["b"], None)))),
            )),
        ));
        assert_eq!(shape(&cleaned), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn keeps_an_empty_root() {
        let cleaned = clean_redundant_frames(trace(
            Some(ASYNC_FUNCTION),
            &["marker"],
            Some(trace(None, &["a"], None)),
        ));
        assert_eq!(shape(&cleaned), vec![vec![], vec!["a"]]);
    }

    #[test]
    fn drops_an_empty_tail() {
        let cleaned = clean_redundant_frames(trace(
            None,
            &["a"],
            Some(trace(Some("await"), &[], None)),
        ));
        assert_eq!(shape(&cleaned), vec![vec!["a"]]);
    }
}

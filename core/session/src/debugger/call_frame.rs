//! Call frames of a paused stack and their scopes.

use std::{
    cell::{OnceCell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use inspector_protocol::{
    CallFrameId, ScriptId,
    debugger::{
        CallFramePayload, EvaluateOnCallFrame, RestartFrame, ScopePayload, ScopeType,
        SetReturnValue,
    },
    send,
};

use super::DebuggerSession;
use crate::{
    error::{SessionError, SessionResult},
    location::Location,
    remote::{RemoteValue, ScopeRef, payload_call_argument},
    runtime::{EvaluationOptions, EvaluationResult, RuntimeSession, SIDE_EFFECTS_UNSUPPORTED},
    script::Script,
};

/// A frame of the paused stack.
///
/// Frames expanded from inlined functions are "virtual": they share the payload
/// of a real frame but report a different inline index and function name.
pub struct CallFrame {
    debugger: Weak<DebuggerSession>,
    runtime: Rc<RuntimeSession>,
    /// Script the frame is executing.
    pub script: Rc<Script>,
    payload: Rc<CallFramePayload>,
    location: Location,
    function_name: String,
    function_location: Option<Location>,
    scope_chain: Vec<Scope>,
    local_scope: Option<usize>,
    return_value: RefCell<Option<Rc<RemoteValue>>>,
    can_be_restarted: bool,
    inline_frame_index: u32,
    is_virtual: bool,
    this_object: OnceCell<Rc<RemoteValue>>,
}

impl fmt::Debug for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFrame")
            .field("id", &self.payload.call_frame_id)
            .field("function_name", &self.function_name)
            .field("location", &self.location)
            .field("is_virtual", &self.is_virtual)
            .finish_non_exhaustive()
    }
}

impl CallFrame {
    fn new(
        debugger: Weak<DebuggerSession>,
        runtime: Rc<RuntimeSession>,
        script: Rc<Script>,
        payload: Rc<CallFramePayload>,
        inline_frame_index: u32,
        function_name: Option<String>,
        is_virtual: bool,
    ) -> Self {
        let mut location = Location::from_payload(&payload.location);
        location.inline_frame_index = inline_frame_index;

        let scope_chain: Vec<Scope> = payload
            .scope_chain
            .iter()
            .enumerate()
            .map(|(ordinal, scope)| {
                Scope::new(
                    Rc::clone(&runtime),
                    payload.call_frame_id.clone(),
                    ordinal,
                    scope.clone(),
                )
            })
            .collect();
        let local_scope = scope_chain
            .iter()
            .rposition(|scope| scope.kind() == ScopeType::Local);
        let return_value = payload
            .return_value
            .clone()
            .map(|value| runtime.create_remote_object(value));

        Self {
            debugger,
            function_name: function_name.unwrap_or_else(|| payload.function_name.clone()),
            function_location: payload.function_location.as_ref().map(Location::from_payload),
            can_be_restarted: payload.can_be_restarted.unwrap_or(false),
            runtime,
            script,
            location,
            scope_chain,
            local_scope,
            return_value: RefCell::new(return_value),
            inline_frame_index,
            is_virtual,
            this_object: OnceCell::new(),
            payload,
        }
    }

    /// Builds the frames of a pause. Frames in scripts the session does not
    /// know are dropped.
    #[must_use]
    pub fn from_payload_array(
        debugger: &DebuggerSession,
        payloads: Vec<CallFramePayload>,
    ) -> Vec<Rc<Self>> {
        payloads
            .into_iter()
            .filter_map(|payload| {
                let script = debugger.script_for_id(&payload.location.script_id)?;
                Some(Rc::new(Self::new(
                    debugger.weak_self.clone(),
                    Rc::clone(&debugger.runtime),
                    script,
                    Rc::new(payload),
                    0,
                    None,
                    false,
                )))
            })
            .collect()
    }

    /// A frame for an inlined function at `inline_frame_index`, sharing this
    /// frame's backend state.
    #[must_use]
    pub fn create_virtual_call_frame(&self, inline_frame_index: u32, name: &str) -> Rc<Self> {
        Rc::new(Self::new(
            self.debugger.clone(),
            Rc::clone(&self.runtime),
            Rc::clone(&self.script),
            Rc::clone(&self.payload),
            inline_frame_index,
            Some(name.to_owned()),
            true,
        ))
    }

    /// Backend id of the frame.
    #[must_use]
    pub fn id(&self) -> &CallFrameId {
        &self.payload.call_frame_id
    }

    /// Id of the script the frame runs.
    #[must_use]
    pub fn script_id(&self) -> &ScriptId {
        &self.script.script_id
    }

    /// Current location, tagged with the inline frame index.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Name of the function, or the inlined function for virtual frames.
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Where the function starts.
    #[must_use]
    pub fn function_location(&self) -> Option<&Location> {
        self.function_location.as_ref()
    }

    /// Index of the inlined frame; zero for real frames.
    #[must_use]
    pub fn inline_frame_index(&self) -> u32 {
        self.inline_frame_index
    }

    /// Whether the backend offered to restart this frame.
    #[must_use]
    pub fn can_be_restarted(&self) -> bool {
        self.can_be_restarted
    }

    /// `false` for virtual frames.
    #[must_use]
    pub fn exists_in_backend(&self) -> bool {
        !self.is_virtual
    }

    /// Scopes from innermost to outermost.
    #[must_use]
    pub fn scope_chain(&self) -> &[Scope] {
        &self.scope_chain
    }

    /// The last `local` scope of the chain.
    #[must_use]
    pub fn local_scope(&self) -> Option<&Scope> {
        self.local_scope.map(|index| &self.scope_chain[index])
    }

    /// The frame's wire form.
    #[must_use]
    pub fn payload(&self) -> &CallFramePayload {
        &self.payload
    }

    /// The receiver of the frame.
    pub fn this_object(&self) -> Rc<RemoteValue> {
        Rc::clone(
            self.this_object
                .get_or_init(|| self.runtime.create_remote_object(self.payload.this_object.clone())),
        )
    }

    /// Value about to be returned, when paused on a return.
    #[must_use]
    pub fn return_value(&self) -> Option<Rc<RemoteValue>> {
        self.return_value.borrow().clone()
    }

    /// Evaluates `expression` in the frame and makes it the return value.
    ///
    /// Only frames paused on a return have one to replace. Returns the new
    /// value, or `None` if evaluation or the update failed.
    pub async fn set_return_value(&self, expression: &str) -> Option<Rc<RemoteValue>> {
        self.return_value.borrow().as_ref()?;

        let evaluated = send(
            &**self.runtime.transport(),
            &EvaluateOnCallFrame {
                call_frame_id: self.id().clone(),
                expression: expression.to_owned(),
                object_group: Some("backtrace".to_owned()),
                silent: true,
                ..EvaluateOnCallFrame::default()
            },
        )
        .await;
        let evaluated = match evaluated {
            Ok(evaluated) if evaluated.exception_details.is_none() => evaluated,
            Ok(_) => return None,
            Err(err) => {
                log::debug!("evaluating return value failed: {err}");
                return None;
            }
        };

        let response = send(
            &**self.runtime.transport(),
            &SetReturnValue {
                new_value: payload_call_argument(&evaluated.result),
            },
        )
        .await;
        if let Err(err) = response {
            log::debug!("setReturnValue failed: {err}");
            return None;
        }
        let value = self.runtime.create_remote_object(evaluated.result);
        *self.return_value.borrow_mut() = Some(Rc::clone(&value));
        Some(value)
    }

    /// Evaluates in this frame.
    ///
    /// Side-effect options need backend support. An installed evaluation
    /// override answers first; `evaluateOnCallFrame` is the fallback.
    pub async fn evaluate(self: &Rc<Self>, options: &EvaluationOptions) -> EvaluationResult {
        if !self.runtime.allows_termination_options(options).await {
            return EvaluationResult::Error(SIDE_EFFECTS_UNSUPPORTED.to_owned());
        }

        let policy = self
            .debugger
            .upgrade()
            .and_then(|debugger| debugger.evaluate_on_call_frame_callback());
        if let Some(policy) = policy
            && let Some(result) = policy.evaluate(self, options).await
        {
            return result;
        }

        let response = send(
            &**self.runtime.transport(),
            &EvaluateOnCallFrame {
                call_frame_id: self.id().clone(),
                expression: options.expression.clone(),
                object_group: options.object_group.clone(),
                include_command_line_api: options.include_command_line_api,
                silent: options.silent,
                return_by_value: options.return_by_value,
                generate_preview: options.generate_preview,
                throw_on_side_effect: options.throw_on_side_effect,
                timeout: options.timeout,
            },
        )
        .await;
        self.runtime.evaluation_result(response)
    }

    /// Restarts the frame and steps into it.
    ///
    /// # Errors
    ///
    /// [`SessionError::FrameNotRestartable`] if the backend did not offer a
    /// restart. A backend refusal after that is only logged.
    pub async fn restart(&self) -> SessionResult<()> {
        if !self.can_be_restarted {
            return Err(SessionError::FrameNotRestartable);
        }
        let response = send(
            &**self.runtime.transport(),
            &RestartFrame {
                call_frame_id: self.id().clone(),
                mode: "StepInto".to_owned(),
            },
        )
        .await;
        if let Err(err) = response {
            log::error!("failed to restart frame {}: {err}", self.id());
        }
        Ok(())
    }
}

/// A lexical scope of a call frame.
pub struct Scope {
    runtime: Rc<RuntimeSession>,
    call_frame_id: CallFrameId,
    ordinal: usize,
    payload: ScopePayload,
    start_location: Option<Location>,
    end_location: Option<Location>,
    object: OnceCell<Rc<RemoteValue>>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("ordinal", &self.ordinal)
            .field("kind", &self.payload.kind)
            .field("name", &self.payload.name)
            .finish_non_exhaustive()
    }
}

impl Scope {
    fn new(
        runtime: Rc<RuntimeSession>,
        call_frame_id: CallFrameId,
        ordinal: usize,
        payload: ScopePayload,
    ) -> Self {
        Self {
            start_location: payload.start_location.as_ref().map(Location::from_payload),
            end_location: payload.end_location.as_ref().map(Location::from_payload),
            runtime,
            call_frame_id,
            ordinal,
            payload,
            object: OnceCell::new(),
        }
    }

    /// Position in the frame's scope chain.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Kind of the scope.
    #[must_use]
    pub fn kind(&self) -> ScopeType {
        self.payload.kind
    }

    /// Display name of the scope kind.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.payload.kind {
            ScopeType::Local => "Local",
            ScopeType::Closure => "Closure",
            ScopeType::Catch => "Catch block",
            ScopeType::Eval => "Eval",
            ScopeType::Block => "Block",
            ScopeType::Script => "Script",
            ScopeType::With => "With block",
            ScopeType::Global => "Global",
            ScopeType::Module => "Module",
            ScopeType::WasmExpressionStack => "Expression",
        }
    }

    /// Name of the scope, e.g. the closure's function.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.payload.name.as_deref()
    }

    /// Where the scope starts.
    #[must_use]
    pub fn start_location(&self) -> Option<&Location> {
        self.start_location.as_ref()
    }

    /// Where the scope ends.
    #[must_use]
    pub fn end_location(&self) -> Option<&Location> {
        self.end_location.as_ref()
    }

    fn is_declarative(&self) -> bool {
        !matches!(self.payload.kind, ScopeType::With | ScopeType::Global)
    }

    /// The object holding the scope's variables.
    ///
    /// Declarative scopes get a scope-bound object whose writes go through
    /// `Debugger.setVariableValue`; `with` and global scopes are plain objects.
    pub fn object(&self) -> Rc<RemoteValue> {
        let object = self.object.get_or_init(|| {
            if self.is_declarative() {
                self.runtime.create_scope_remote_object(
                    self.payload.object.clone(),
                    ScopeRef {
                        number: self.ordinal,
                        call_frame_id: Some(self.call_frame_id.clone()),
                    },
                )
            } else {
                self.runtime.create_remote_object(self.payload.object.clone())
            }
        });
        Rc::clone(object)
    }

    /// Object description for `with` and global scopes; empty otherwise.
    #[must_use]
    pub fn description(&self) -> &str {
        if self.is_declarative() {
            ""
        } else {
            self.payload.object.description.as_deref().unwrap_or_default()
        }
    }
}

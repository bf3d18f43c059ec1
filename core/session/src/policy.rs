//! Pluggable strategies consulted by the debugger session.
//!
//! Each strategy is optional and a session holds at most one instance of each.
//! Setting a strategy replaces the previous one; setting `None` removes it.
//!
//! Every trait is implemented for matching closures, so a plain `Rc::new(|..| ..)`
//! can be installed directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//!
//! session.set_before_paused_callback(Some(Rc::new(|details: &DebuggerPausedDetails| {
//!     !details.call_frames.is_empty()
//! })));
//! ```

use std::{cell::RefCell, rc::Rc};

use inspector_protocol::LocalBoxFuture;

use crate::{
    debugger::{CallFrame, DebuggerPausedDetails},
    location::RawLocationRange,
    runtime::{EvaluationOptions, EvaluationResult},
    script::Script,
};

/// Kind of step a skip list is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepMode {
    /// `stepInto`.
    StepInto,
    /// `stepOver`.
    StepOver,
    /// `stepOut`.
    StepOut,
}

/// Decides whether a pause is shown to the user.
pub trait BeforePausedPolicy {
    /// Returns `false` to veto the pause. A vetoed pause continues automatically.
    fn before_paused(&self, details: &DebuggerPausedDetails) -> bool;
}

impl<F> BeforePausedPolicy for F
where
    F: Fn(&DebuggerPausedDetails) -> bool,
{
    fn before_paused(&self, details: &DebuggerPausedDetails) -> bool {
        self(details)
    }
}

/// Rewrites the call frames of a pause, e.g. to add inlined frames.
pub trait CallFrameExpander {
    /// Returns the frames to expose instead of `frames`.
    fn expand(&self, frames: Vec<Rc<CallFrame>>) -> LocalBoxFuture<'static, Vec<Rc<CallFrame>>>;
}

impl<F> CallFrameExpander for F
where
    F: Fn(Vec<Rc<CallFrame>>) -> LocalBoxFuture<'static, Vec<Rc<CallFrame>>>,
{
    fn expand(&self, frames: Vec<Rc<CallFrame>>) -> LocalBoxFuture<'static, Vec<Rc<CallFrame>>> {
        self(frames)
    }
}

/// Computes the source ranges a step should not stop inside.
pub trait AutoStepRanges {
    /// Ranges to skip when stepping from `frame` with `mode`.
    fn compute(
        &self,
        mode: StepMode,
        frame: &Rc<CallFrame>,
    ) -> LocalBoxFuture<'static, Vec<RawLocationRange>>;
}

impl<F> AutoStepRanges for F
where
    F: Fn(StepMode, &Rc<CallFrame>) -> LocalBoxFuture<'static, Vec<RawLocationRange>>,
{
    fn compute(
        &self,
        mode: StepMode,
        frame: &Rc<CallFrame>,
    ) -> LocalBoxFuture<'static, Vec<RawLocationRange>> {
        self(mode, frame)
    }
}

/// Overrides evaluation on a call frame.
pub trait CallFrameEvaluator {
    /// Returns `Some` to answer the evaluation, `None` to fall back to the backend.
    fn evaluate(
        &self,
        frame: &Rc<CallFrame>,
        options: &EvaluationOptions,
    ) -> LocalBoxFuture<'static, Option<EvaluationResult>>;
}

impl<F> CallFrameEvaluator for F
where
    F: Fn(&Rc<CallFrame>, &EvaluationOptions) -> LocalBoxFuture<'static, Option<EvaluationResult>>,
{
    fn evaluate(
        &self,
        frame: &Rc<CallFrame>,
        options: &EvaluationOptions,
    ) -> LocalBoxFuture<'static, Option<EvaluationResult>> {
        self(frame, options)
    }
}

/// Pushes breakpoints for a script before it starts running.
pub trait BreakpointSynchronizer {
    /// Completes once every breakpoint of `script` is set.
    fn synchronize(&self, script: &Rc<Script>) -> LocalBoxFuture<'static, ()>;
}

impl<F> BreakpointSynchronizer for F
where
    F: Fn(&Rc<Script>) -> LocalBoxFuture<'static, ()>,
{
    fn synchronize(&self, script: &Rc<Script>) -> LocalBoxFuture<'static, ()> {
        self(script)
    }
}

/// The strategy slots of a session.
#[derive(Default)]
pub(crate) struct Policies {
    pub(crate) before_paused: RefCell<Option<Rc<dyn BeforePausedPolicy>>>,
    pub(crate) expand_call_frames: RefCell<Option<Rc<dyn CallFrameExpander>>>,
    pub(crate) auto_step_ranges: RefCell<Option<Rc<dyn AutoStepRanges>>>,
    pub(crate) evaluate_on_call_frame: RefCell<Option<Rc<dyn CallFrameEvaluator>>>,
    pub(crate) synchronize_breakpoints: RefCell<Option<Rc<dyn BreakpointSynchronizer>>>,
}

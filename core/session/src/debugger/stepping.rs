//! Pause, resume and stepping.

use std::time::Duration;

use inspector_protocol::{
    Command,
    debugger::{
        ContinueToLocation, LocationRangePayload, Pause, Resume, SetSkipAllPauses, StepInto,
        StepOut, StepOver,
    },
    send,
};

use super::{DebuggerPausedDetails, DebuggerSession, ExecutionState, report};
use crate::{
    location::{Location, LocationRange, sort_and_merge_ranges},
    policy::StepMode,
};

impl DebuggerSession {
    /// Whether a pause was requested and not yet reported.
    #[must_use]
    pub fn is_pausing(&self) -> bool {
        self.is_pausing.get()
    }

    /// Running, pausing or paused.
    #[must_use]
    pub fn execution_state(&self) -> ExecutionState {
        if self.is_paused() {
            ExecutionState::Paused
        } else if self.is_pausing.get() {
            ExecutionState::Pausing
        } else {
            ExecutionState::Running
        }
    }

    /// Asks the target to pause. Pending skip-all-pauses are cancelled first.
    pub async fn pause(&self) {
        self.is_pausing.set(true);
        self.skip_all_pauses(false).await;
        report(Pause::NAME, send(&*self.transport, &Pause {}).await);
    }

    /// Resumes execution.
    pub async fn resume(&self) {
        let resumed = send(
            &*self.transport,
            &Resume {
                terminate_on_resume: false,
            },
        );
        self.is_pausing.set(false);
        report(Resume::NAME, resumed.await);
    }

    /// Skip list for a step from the current top frame: the ranges of the
    /// auto-step strategy, sorted and merged.
    async fn compute_auto_step_skip_list(&self, mode: StepMode) -> Vec<LocationRangePayload> {
        let policy = self.policies.auto_step_ranges.borrow().clone();
        let top_frame = self
            .paused_details
            .borrow()
            .as_ref()
            .and_then(|details| details.call_frames.first().cloned());
        let ranges = match (policy, top_frame) {
            (Some(policy), Some(top_frame)) => policy.compute(mode, &top_frame).await,
            _ => Vec::new(),
        };
        let ranges = ranges.iter().map(LocationRange::from_raw).collect();
        sort_and_merge_ranges(ranges)
            .iter()
            .map(LocationRange::payload)
            .collect()
    }

    /// Steps into the next call.
    pub async fn step_into(&self) {
        let skip_list = self.compute_auto_step_skip_list(StepMode::StepInto).await;
        report(
            StepInto::NAME,
            send(
                &*self.transport,
                &StepInto {
                    break_on_async_call: false,
                    skip_list,
                },
            )
            .await,
        );
    }

    /// Steps over the next statement. A vetoed pause after this steps over again.
    pub async fn step_over(&self) {
        self.auto_step_over.set(true);
        let skip_list = self.compute_auto_step_skip_list(StepMode::StepOver).await;
        report(
            StepOver::NAME,
            send(&*self.transport, &StepOver { skip_list }).await,
        );
    }

    /// Steps out of the current function, or over the skipped ranges when
    /// stepping out would land in one.
    pub async fn step_out(&self) {
        let skip_list = self.compute_auto_step_skip_list(StepMode::StepOut).await;
        if skip_list.is_empty() {
            report(StepOut::NAME, send(&*self.transport, &StepOut {}).await);
        } else {
            report(
                StepOver::NAME,
                send(&*self.transport, &StepOver { skip_list }).await,
            );
        }
    }

    /// Steps into the next async call.
    pub async fn schedule_step_into_async(&self) {
        let skip_list = self.compute_auto_step_skip_list(StepMode::StepInto).await;
        report(
            StepInto::NAME,
            send(
                &*self.transport,
                &StepInto {
                    break_on_async_call: true,
                    skip_list,
                },
            )
            .await,
        );
    }

    /// Sets skip-all-pauses, cancelling any pending timeout.
    pub async fn skip_all_pauses(&self, skip: bool) {
        self.skip_all_pauses_timer.set(None);
        report(
            SetSkipAllPauses::NAME,
            send(&*self.transport, &SetSkipAllPauses { skip }).await,
        );
    }

    /// Skips every pause until the next navigation or until `timeout` passes.
    ///
    /// Arming again replaces the pending timeout.
    pub async fn skip_all_pauses_until_reload_or_timeout(&self, timeout: Duration) {
        let token = self.timer_counter.get() + 1;
        self.timer_counter.set(token);
        self.skip_all_pauses_timer.set(Some(token));
        let armed = send(&*self.transport, &SetSkipAllPauses { skip: true });

        let session = self.weak_self.clone();
        self.scheduler.spawn_after(
            timeout,
            Box::pin(async move {
                let Some(session) = session.upgrade() else {
                    return;
                };
                if session.skip_all_pauses_timer.get() == Some(token) {
                    session.skip_all_pauses(false).await;
                }
            }),
        );
        report(SetSkipAllPauses::NAME, armed.await);
    }

    /// Whether a skip-all-pauses timeout is pending.
    #[must_use]
    pub fn has_pending_skip_all_pauses_timer(&self) -> bool {
        self.skip_all_pauses_timer.get().is_some()
    }

    /// Runs to `location` within the current frames.
    ///
    /// With `on_reached`, the next pause at exactly `location` is swallowed and
    /// `on_reached` runs instead.
    pub async fn continue_to_location(
        &self,
        location: &Location,
        on_reached: Option<Box<dyn FnOnce()>>,
    ) {
        if let Some(on_reached) = on_reached {
            let target = location.clone();
            *self.continue_to_location.borrow_mut() =
                Some(Box::new(move |details: &DebuggerPausedDetails| {
                    let reached = details
                        .call_frames
                        .first()
                        .is_some_and(|frame| frame.location().same_position(&target));
                    if reached {
                        on_reached();
                    }
                    reached
                }));
        }
        report(
            ContinueToLocation::NAME,
            send(
                &*self.transport,
                &ContinueToLocation {
                    location: location.payload(),
                    target_call_frames: Some("current".to_owned()),
                },
            )
            .await,
        );
    }
}

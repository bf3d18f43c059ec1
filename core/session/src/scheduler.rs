//! Delayed tasks.
//!
//! Timers are the only place the session core needs an executor. They go through
//! [`Scheduler`] so embedders can plug in their own event loop and tests can fire
//! timers by hand.

use std::{fmt, rc::Rc, time::Duration};

use inspector_protocol::LocalBoxFuture;
use smol::{LocalExecutor, Timer};

/// Runs futures after a delay on the session's thread.
pub trait Scheduler {
    /// Runs `task` once `delay` has elapsed.
    fn spawn_after(&self, delay: Duration, task: LocalBoxFuture<'static, ()>);
}

/// A [`Scheduler`] backed by a smol [`LocalExecutor`].
///
/// Tasks only make progress while the executor is being run by the embedder,
/// e.g. through `LocalExecutor::run`.
#[derive(Clone)]
pub struct SmolScheduler {
    executor: Rc<LocalExecutor<'static>>,
}

impl fmt::Debug for SmolScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmolScheduler").finish_non_exhaustive()
    }
}

impl SmolScheduler {
    /// Creates a scheduler spawning onto `executor`.
    #[must_use]
    pub fn new(executor: Rc<LocalExecutor<'static>>) -> Self {
        Self { executor }
    }

    /// The executor tasks are spawned onto.
    #[must_use]
    pub fn executor(&self) -> &Rc<LocalExecutor<'static>> {
        &self.executor
    }
}

impl Scheduler for SmolScheduler {
    fn spawn_after(&self, delay: Duration, task: LocalBoxFuture<'static, ()>) {
        self.executor
            .spawn(async move {
                Timer::after(delay).await;
                task.await;
            })
            .detach();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures_lite::future::block_on;

    use super::*;

    #[test]
    fn fires_after_delay() {
        let executor = Rc::new(LocalExecutor::new());
        let scheduler = SmolScheduler::new(Rc::clone(&executor));
        let fired = Rc::new(Cell::new(false));
        {
            let fired = Rc::clone(&fired);
            scheduler.spawn_after(
                Duration::from_millis(5),
                Box::pin(async move { fired.set(true) }),
            );
        }
        assert!(!fired.get());
        block_on(executor.run(Timer::after(Duration::from_millis(50))));
        assert!(fired.get());
    }
}

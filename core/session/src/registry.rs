//! Lookup of debugger sessions by their backend-assigned identity.
//!
//! Async stack traces may point into another debugger agent. The owning session
//! is found through a [`SessionRegistry`] shared by every session of a process.
//!
//! # Lifecycle
//!
//! - a session registers itself once its `Debugger.enable` succeeds
//! - it unregisters on disable, dispose, or when it gets a new identity
//! - navigation may change every identity, so [`SessionRegistry::mark_resync_needed`]
//!   makes the next [`SessionRegistry::resolve`] re-enable all sessions first

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use inspector_protocol::UniqueDebuggerId;

use crate::debugger::DebuggerSession;

/// Registry of enabled debugger sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RefCell<HashMap<UniqueDebuggerId, Weak<DebuggerSession>>>,
    should_resync: Cell<bool>,
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.borrow().keys().collect::<Vec<_>>())
            .field("should_resync", &self.should_resync.get())
            .finish()
    }
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Maps `id` to `session`.
    pub fn register(&self, id: UniqueDebuggerId, session: &Rc<DebuggerSession>) {
        log::debug!("registering debugger {id}");
        self.sessions.borrow_mut().insert(id, Rc::downgrade(session));
    }

    /// Forgets `id`.
    pub fn unregister(&self, id: &UniqueDebuggerId) {
        self.sessions.borrow_mut().remove(id);
    }

    /// Requests a resync before the next lookup.
    pub fn mark_resync_needed(&self) {
        self.should_resync.set(true);
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.borrow().len()
    }

    /// Returns `true` if no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.borrow().is_empty()
    }

    /// Finds the session with identity `id`, resyncing first if needed.
    pub async fn resolve(&self, id: &UniqueDebuggerId) -> Option<Rc<DebuggerSession>> {
        if self.should_resync.replace(false) {
            self.resync().await;
        }
        self.sessions.borrow().get(id).and_then(Weak::upgrade)
    }

    async fn resync(&self) {
        let sessions: Vec<Rc<DebuggerSession>> = self
            .sessions
            .borrow()
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        log::debug!("resyncing {} debugger identities", sessions.len());
        for session in sessions {
            if session.debugger_enabled() {
                session.sync_debugger_id().await;
            }
        }
    }
}

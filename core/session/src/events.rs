//! Listener surface exposed to consumers of the sessions.
//!
//! Consumers never mutate session state directly; they observe it through
//! [`EventDispatcher`]s. Breakpoint resolutions are routed per breakpoint id by
//! [`BreakpointEventRouter`], independently of the request that created the
//! breakpoint.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::Rc,
};

use inspector_protocol::BreakpointId;

/// Handle returned by `add_listener`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Rc<dyn Fn(&E)>;

/// An ordered set of listeners for one event type.
pub struct EventDispatcher<E> {
    listeners: RefCell<Vec<(ListenerId, Listener<E>)>>,
    next_id: Cell<u64>,
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<E> fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl<E> EventDispatcher<E> {
    /// Creates a dispatcher without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` and returns its id.
    pub fn add_listener(&self, listener: impl Fn(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Returns `true` if at least one listener is registered.
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        !self.listeners.borrow().is_empty()
    }

    /// Calls every listener registered at the time of the call.
    ///
    /// Listeners may add or remove listeners while being called.
    pub fn dispatch(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }
}

/// Routes breakpoint events to listeners registered for a specific breakpoint id.
pub struct BreakpointEventRouter<E> {
    routes: RefCell<HashMap<BreakpointId, Rc<EventDispatcher<E>>>>,
}

impl<E> Default for BreakpointEventRouter<E> {
    fn default() -> Self {
        Self {
            routes: RefCell::new(HashMap::new()),
        }
    }
}

impl<E> fmt::Debug for BreakpointEventRouter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakpointEventRouter")
            .field("routes", &self.routes.borrow().len())
            .finish()
    }
}

impl<E> BreakpointEventRouter<E> {
    /// Registers `listener` for events of `breakpoint_id`.
    pub fn add_listener(
        &self,
        breakpoint_id: &BreakpointId,
        listener: impl Fn(&E) + 'static,
    ) -> ListenerId {
        let dispatcher = Rc::clone(
            self.routes
                .borrow_mut()
                .entry(breakpoint_id.clone())
                .or_default(),
        );
        dispatcher.add_listener(listener)
    }

    /// Removes a listener of `breakpoint_id`.
    pub fn remove_listener(&self, breakpoint_id: &BreakpointId, id: ListenerId) -> bool {
        let mut routes = self.routes.borrow_mut();
        let Some(dispatcher) = routes.get(breakpoint_id) else {
            return false;
        };
        let removed = dispatcher.remove_listener(id);
        if !dispatcher.has_listeners() {
            routes.remove(breakpoint_id);
        }
        removed
    }

    /// Delivers `event` to the listeners of `breakpoint_id`, if any.
    pub fn dispatch(&self, breakpoint_id: &BreakpointId, event: &E) {
        let dispatcher = self.routes.borrow().get(breakpoint_id).cloned();
        if let Some(dispatcher) = dispatcher {
            dispatcher.dispatch(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_run_in_registration_order() {
        let dispatcher = EventDispatcher::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Rc::clone(&seen);
            dispatcher.add_listener(move |value: &u32| seen.borrow_mut().push(format!("{tag}{value}")));
        }
        dispatcher.dispatch(&1);
        assert_eq!(*seen.borrow(), ["a1", "b1"]);
    }

    #[test]
    fn removed_listeners_stop_receiving() {
        let dispatcher = EventDispatcher::<()>::new();
        let count = Rc::new(Cell::new(0));
        let id = {
            let count = Rc::clone(&count);
            dispatcher.add_listener(move |()| count.set(count.get() + 1))
        };
        dispatcher.dispatch(&());
        assert!(dispatcher.remove_listener(id));
        assert!(!dispatcher.remove_listener(id));
        dispatcher.dispatch(&());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn listeners_may_register_during_dispatch() {
        let dispatcher = Rc::new(EventDispatcher::<()>::new());
        let inner = Rc::clone(&dispatcher);
        dispatcher.add_listener(move |()| {
            inner.add_listener(|()| {});
        });
        dispatcher.dispatch(&());
        dispatcher.dispatch(&());
        assert_eq!(dispatcher.listeners.borrow().len(), 3);
    }

    #[test]
    fn router_only_delivers_to_matching_breakpoint() {
        let router = BreakpointEventRouter::<u32>::default();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let first = BreakpointId::from("1");
        let second = BreakpointId::from("2");
        {
            let hits = Rc::clone(&hits);
            router.add_listener(&first, move |line| hits.borrow_mut().push(*line));
        }
        router.dispatch(&second, &7);
        router.dispatch(&first, &3);
        assert_eq!(*hits.borrow(), [3]);
    }

    #[test]
    fn router_drops_empty_routes() {
        let router = BreakpointEventRouter::<()>::default();
        let id = BreakpointId::from("1");
        let listener = router.add_listener(&id, |()| {});
        assert!(router.remove_listener(&id, listener));
        assert!(router.routes.borrow().is_empty());
    }
}

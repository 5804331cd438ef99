//! Event bus between the client core and whatever renders it.
//!
//! Single-threaded (WASM), interior mutability via RefCell. The session
//! store and chat services publish; the UI drains on its own schedule.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use counsel_types::event::ClientEvent;

/// Shared event queue, clone-cheap via Rc.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<VecDeque<ClientEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ClientEvent) {
        log::debug!("event: {:?}", event);
        self.inner.borrow_mut().push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&self) -> Vec<ClientEvent> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_pending()
    }
}

//! State observers and the subscription handle that detaches them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type Observer<S> = Rc<dyn Fn(&S)>;

/// Ordered list of callbacks notified after every reducer run.
pub(crate) struct Observers<S> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Observer<S>)>>,
}

impl<S> Observers<S> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, observer: impl Fn(&S) + 'static) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, Rc::new(observer)));
        id
    }

    pub(crate) fn remove(&self, id: u64) {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            entries
                .iter()
                .position(|(entry, _)| *entry == id)
                .map(|index| entries.remove(index))
        };
        drop(removed);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Call every observer registered at the time of the call.
    ///
    /// Observers may add or remove observers while being notified; one
    /// removed mid-notification is not called afterwards.
    pub(crate) fn notify(&self, state: &S) {
        let snapshot: Vec<(u64, Observer<S>)> = self
            .entries
            .borrow()
            .iter()
            .map(|(id, observer)| (*id, Rc::clone(observer)))
            .collect();
        for (id, observer) in snapshot {
            let live = self.entries.borrow().iter().any(|(entry, _)| *entry == id);
            if live {
                observer(state);
            }
        }
    }
}

/// Keeps a state observer attached; dropping it detaches the observer.
#[must_use = "the observer is detached as soon as the subscription is dropped"]
pub struct StateSubscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl StateSubscription {
    pub(crate) fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }
}

impl Drop for StateSubscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for StateSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSubscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

//! Subscription plumbing shared by every effect.
//!
//! A [`Subscriber`] is the receiving end of a running effect: it accepts
//! output values and a single completion signal. A [`Cancellable`] is the
//! handle returned when an effect is subscribed and tears the work down.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use super::cancellation::EffectContext;

type OutputHandler<T> = Box<dyn FnMut(T)>;
type CompletionHandler = Box<dyn FnOnce()>;

/// Receiving end of a running effect.
///
/// Cloning produces another handle to the same subscriber. After
/// completion or cancellation every further call is ignored, except a
/// second `complete` without an intervening cancel, which is a contract
/// violation and panics.
pub struct Subscriber<T> {
    inner: Rc<SubscriberInner<T>>,
}

struct SubscriberInner<T> {
    context: EffectContext,
    on_output: RefCell<Option<OutputHandler<T>>>,
    on_complete: RefCell<Option<CompletionHandler>>,
    pending: RefCell<VecDeque<T>>,
    delivering: Cell<bool>,
    completion_requested: Cell<bool>,
    completed: Cell<bool>,
    cancelled: Cell<bool>,
}

impl<T: 'static> Subscriber<T> {
    /// Create a subscriber bound to `context`.
    pub fn new(
        context: EffectContext,
        on_output: impl FnMut(T) + 'static,
        on_complete: impl FnOnce() + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(SubscriberInner {
                context,
                on_output: RefCell::new(Some(Box::new(on_output))),
                on_complete: RefCell::new(Some(Box::new(on_complete))),
                pending: RefCell::new(VecDeque::new()),
                delivering: Cell::new(false),
                completion_requested: Cell::new(false),
                completed: Cell::new(false),
                cancelled: Cell::new(false),
            }),
        }
    }

    /// The store-wide context this subscription runs in.
    pub fn context(&self) -> &EffectContext {
        &self.inner.context
    }

    /// True once the subscriber completed or was cancelled.
    pub fn is_terminated(&self) -> bool {
        self.inner.completed.get() || self.inner.cancelled.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Deliver one output value.
    ///
    /// Values sent re-entrantly from inside the output handler are queued
    /// and delivered in order once the handler returns.
    pub fn send(&self, value: T) {
        if self.is_terminated() || self.inner.completion_requested.get() {
            return;
        }
        self.inner.pending.borrow_mut().push_back(value);
        if self.inner.delivering.replace(true) {
            return;
        }

        loop {
            let next = self.inner.pending.borrow_mut().pop_front();
            let Some(value) = next else { break };
            if self.is_terminated() {
                self.inner.pending.borrow_mut().clear();
                break;
            }
            let handler = self.inner.on_output.borrow_mut().take();
            if let Some(mut handler) = handler {
                handler(value);
                if !self.is_terminated() {
                    *self.inner.on_output.borrow_mut() = Some(handler);
                }
            }
        }

        self.inner.delivering.set(false);
        if self.inner.completion_requested.get() {
            self.finish();
        }
    }

    /// Signal that no further values will be produced.
    ///
    /// # Panics
    /// Panics if the subscriber already completed.
    pub fn complete(&self) {
        if self.inner.cancelled.get() {
            return;
        }
        if self.inner.completed.get() || self.inner.completion_requested.get() {
            panic!("effect subscriber completed more than once");
        }
        if self.inner.delivering.get() {
            self.inner.completion_requested.set(true);
            return;
        }
        self.finish();
    }

    /// Complete unless completion already happened or is pending.
    pub(crate) fn complete_if_live(&self) {
        if self.is_terminated() || self.inner.completion_requested.get() {
            return;
        }
        self.complete();
    }

    /// Stop delivery without running the completion handler.
    pub fn cancel(&self) {
        if self.is_terminated() {
            return;
        }
        self.inner.cancelled.set(true);
        self.inner.completion_requested.set(false);
        self.inner.pending.borrow_mut().clear();
        self.inner.on_output.borrow_mut().take();
        self.inner.on_complete.borrow_mut().take();
    }

    fn finish(&self) {
        self.inner.completion_requested.set(false);
        self.inner.completed.set(true);
        self.inner.on_output.borrow_mut().take();
        let handler = self.inner.on_complete.borrow_mut().take();
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("completed", &self.inner.completed.get())
            .field("cancelled", &self.inner.cancelled.get())
            .finish()
    }
}

/// Handle that tears down a running subscription.
///
/// Cancelling is idempotent. Dropping the handle does not cancel; owners
/// that want cancel-on-drop keep the handle and call [`Cancellable::cancel`].
#[derive(Clone)]
pub struct Cancellable {
    inner: Rc<CancellableInner>,
}

struct CancellableInner {
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
    cancelled: Cell<bool>,
}

impl Cancellable {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(CancellableInner {
                teardown: RefCell::new(Some(Box::new(teardown))),
                cancelled: Cell::new(false),
            }),
        }
    }

    /// A handle with nothing to tear down.
    pub fn empty() -> Self {
        Self::new(|| {})
    }

    /// A handle that cancels every member when cancelled.
    pub fn all(members: Vec<Cancellable>) -> Self {
        Self::new(move || {
            for member in members {
                member.cancel();
            }
        })
    }

    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        let teardown = self.inner.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }
}

impl fmt::Debug for Cancellable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellable")
            .field("cancelled", &self.inner.cancelled.get())
            .finish()
    }
}

//! The runtime that owns state and drives reducers and effects.
//!
//! # Processing order
//!
//! `send` never recurses into the reducer. Actions land in one of two
//! queues:
//!
//! - the **synchronous** lane holds actions sent while the store is idle
//!   and actions an effect emits while it is still being subscribed;
//! - the **buffered** lane holds actions sent while a reducer (or an
//!   observer notified after it) is running.
//!
//! The drain loop always empties the synchronous lane first, so every
//! consequence produced synchronously by an action is processed before
//! anything that arrived from outside in the meantime. Outputs an effect
//! produces later start a fresh `send`.

mod observer;
mod scope;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::StoreConfig;
use crate::effect::{Cancellable, Effect, EffectContext, Subscriber};
use crate::reducer::Reducer;

pub use observer::StateSubscription;

use observer::Observers;

/// How a store turns an action into its next state.
enum Process<S, A> {
    /// Run a reducer against the store's own state.
    Reduce(Box<dyn Fn(&mut S, A) -> Effect<A>>),
    /// Hand the action to another store and return the state to adopt.
    /// The store's state is not borrowed while this runs.
    Forward(Box<dyn Fn(A) -> Option<S>>),
}

/// Handle to a running store.
///
/// Cloning the handle shares the same store. When the last handle of a
/// store is dropped, its live effects are cancelled.
pub struct Store<S, A> {
    core: Rc<StoreCore<S, A>>,
}

struct StoreCore<S, A> {
    state: RefCell<S>,
    process: Process<S, A>,
    config: StoreConfig,
    context: EffectContext,
    synchronous: RefCell<VecDeque<A>>,
    buffered: RefCell<VecDeque<A>>,
    is_sending: Cell<bool>,
    effects: RefCell<HashMap<u64, Cancellable>>,
    next_effect: Cell<u64>,
    observers: Observers<S>,
    parent: RefCell<Option<StateSubscription>>,
}

#[derive(Debug, Clone, Copy)]
enum Lane {
    Synchronous,
    Buffered,
}

impl<S, A> Store<S, A>
where
    S: Clone + 'static,
    A: fmt::Debug + 'static,
{
    pub fn new<R>(initial_state: S, reducer: R, environment: R::Environment) -> Self
    where
        R: Reducer<State = S, Action = A> + 'static,
        R::Environment: 'static,
    {
        Self::with_config(initial_state, reducer, environment, StoreConfig::default())
    }

    pub fn with_config<R>(
        initial_state: S,
        reducer: R,
        environment: R::Environment,
        config: StoreConfig,
    ) -> Self
    where
        R: Reducer<State = S, Action = A> + 'static,
        R::Environment: 'static,
    {
        Self::from_parts(
            initial_state,
            Process::Reduce(Box::new(move |state, action| {
                reducer.reduce(state, action, &environment)
            })),
            config,
        )
    }

    fn from_parts(initial_state: S, process: Process<S, A>, config: StoreConfig) -> Self {
        Self {
            core: Rc::new(StoreCore {
                state: RefCell::new(initial_state),
                process,
                config,
                context: EffectContext::new(),
                synchronous: RefCell::new(VecDeque::new()),
                buffered: RefCell::new(VecDeque::new()),
                is_sending: Cell::new(false),
                effects: RefCell::new(HashMap::new()),
                next_effect: Cell::new(0),
                observers: Observers::new(),
                parent: RefCell::new(None),
            }),
        }
    }

    /// Queue `action` and, unless a reducer is already running, process it
    /// and everything it synchronously produces before returning.
    pub fn send(&self, action: A) {
        self.core.send(action);
    }

    /// A copy of the current state.
    pub fn state(&self) -> S {
        self.core.state.borrow().clone()
    }

    /// Read the current state without cloning it.
    ///
    /// `read` must not send actions to this store or any store it was
    /// scoped from.
    pub fn with_state<R>(&self, read: impl FnOnce(&S) -> R) -> R {
        read(&self.core.state.borrow())
    }

    /// Call `observer` with the new state after every reducer run.
    ///
    /// The observer is not called with the current state on registration.
    /// Actions it sends are buffered behind the ones already queued.
    pub fn observe(&self, observer: impl Fn(&S) + 'static) -> StateSubscription {
        let id = self.core.observers.add(observer);
        let store = Rc::downgrade(&self.core);
        StateSubscription::new(move || {
            if let Some(core) = store.upgrade() {
                core.observers.remove(id);
            }
        })
    }

    /// Number of effects subscribed by this store that have not completed.
    pub fn live_effect_count(&self) -> usize {
        self.core.effects.borrow().len()
    }

    /// The cancellation registry and throttle table used by this store's
    /// effects.
    pub fn effect_context(&self) -> &EffectContext {
        &self.core.context
    }

    pub fn config(&self) -> &StoreConfig {
        &self.core.config
    }

    fn downgrade(&self) -> Weak<StoreCore<S, A>> {
        Rc::downgrade(&self.core)
    }

    /// Replace the state from outside the reducer, notifying observers.
    ///
    /// Used by scoped stores when their parent's state changes.
    fn replace_state(core: &Rc<StoreCore<S, A>>, next: S) {
        *core.state.borrow_mut() = next;
        core.notify_observers();
    }
}

impl<S, A> StoreCore<S, A>
where
    S: Clone + 'static,
    A: fmt::Debug + 'static,
{
    fn send(self: &Rc<Self>, action: A) {
        if self.is_sending.get() {
            self.buffered.borrow_mut().push_back(action);
            return;
        }
        self.synchronous.borrow_mut().push_back(action);
        self.drain();
    }

    fn drain(self: &Rc<Self>) {
        let mut drained = 0usize;
        while let Some((action, lane)) = self.next_action() {
            drained += 1;
            if drained == self.config.drain_warning_threshold + 1 {
                tracing::warn!(
                    target: "unidirect::store",
                    threshold = self.config.drain_warning_threshold,
                    "single send drained more actions than the warning threshold; effects may be feeding back into each other"
                );
            }
            if self.config.trace_actions {
                tracing::debug!(target: "unidirect::store", ?lane, ?action, "processing action");
            }

            let effect = self.run_reducer(action);
            self.subscribe(effect);
        }
    }

    fn next_action(&self) -> Option<(A, Lane)> {
        if let Some(action) = self.synchronous.borrow_mut().pop_front() {
            return Some((action, Lane::Synchronous));
        }
        self.buffered
            .borrow_mut()
            .pop_front()
            .map(|action| (action, Lane::Buffered))
    }

    fn run_reducer(&self, action: A) -> Effect<A> {
        self.is_sending.set(true);
        let _idle = scopeguard::guard(&self.is_sending, |flag| flag.set(false));
        let effect = match &self.process {
            Process::Reduce(reduce) => {
                let mut state = self.state.borrow_mut();
                reduce(&mut state, action)
            }
            Process::Forward(forward) => {
                if let Some(next) = forward(action) {
                    *self.state.borrow_mut() = next;
                }
                Effect::none()
            }
        };
        self.notify_observers();
        effect
    }

    fn notify_observers(&self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.state.borrow().clone();
        self.observers.notify(&snapshot);
    }

    fn subscribe(self: &Rc<Self>, effect: Effect<A>) {
        if effect.is_none() {
            return;
        }
        let id = self.next_effect.get();
        self.next_effect.set(id + 1);

        let subscribing = Rc::new(Cell::new(true));
        let completed = Rc::new(Cell::new(false));

        let on_output = {
            let store = Rc::downgrade(self);
            let subscribing = Rc::clone(&subscribing);
            move |action: A| {
                let Some(core) = store.upgrade() else { return };
                if subscribing.get() {
                    core.synchronous.borrow_mut().push_back(action);
                } else {
                    core.send(action);
                }
            }
        };
        let on_complete = {
            let store = Rc::downgrade(self);
            let completed = Rc::clone(&completed);
            move || {
                completed.set(true);
                let Some(core) = store.upgrade() else { return };
                let finished = core.effects.borrow_mut().remove(&id);
                if finished.is_some() {
                    tracing::trace!(target: "unidirect::store", effect = id, "effect completed");
                }
            }
        };

        let handle = effect.subscribe(Subscriber::new(self.context.clone(), on_output, on_complete));
        subscribing.set(false);

        if !completed.get() {
            tracing::trace!(target: "unidirect::store", effect = id, "effect subscribed");
            self.effects.borrow_mut().insert(id, handle);
        }
    }
}

impl<S, A> Drop for StoreCore<S, A> {
    fn drop(&mut self) {
        let effects = std::mem::take(self.effects.get_mut());
        if effects.is_empty() {
            return;
        }
        tracing::debug!(
            target: "unidirect::store",
            live = effects.len(),
            "store dropped with live effects; cancelling them"
        );
        for (_, handle) in effects {
            handle.cancel();
        }
    }
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Store");
        match self.core.state.try_borrow() {
            Ok(state) => debug.field("state", &*state),
            Err(_) => debug.field("state", &"<being reduced>"),
        };
        debug
            .field("live_effects", &self.core.effects.borrow().len())
            .finish()
    }
}

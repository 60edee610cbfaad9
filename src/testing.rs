//! Exhaustive test harness for reducers.
//!
//! A [`TestStore`] runs a reducer the way a [`Store`](crate::Store) does,
//! except that actions produced by effects are not processed
//! automatically: they are collected, and the test must acknowledge each
//! one with [`TestStore::receive`] together with the state change it
//! causes. Time-based effects are driven by advancing a
//! [`TestScheduler`](crate::scheduler::TestScheduler) between calls.
//!
//! ```
//! use unidirect::{Effect, Reduce, TestStore};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Action { Tap, Tapped }
//!
//! let reducer = Reduce::new(|count: &mut u32, action: Action, _: &()| match action {
//!     Action::Tap => Effect::value(Action::Tapped),
//!     Action::Tapped => {
//!         *count += 1;
//!         Effect::none()
//!     }
//! });
//!
//! let mut store = TestStore::new(0, reducer, ());
//! store.send(Action::Tap, |_| {});
//! store.receive(Action::Tapped, |count| *count = 1);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::effect::{Cancellable, Effect, EffectContext, Subscriber};
use crate::reducer::Reducer;

pub struct TestStore<R: Reducer> {
    state: R::State,
    reducer: R,
    environment: R::Environment,
    context: EffectContext,
    received: Rc<RefCell<VecDeque<R::Action>>>,
    in_flight: Rc<RefCell<HashMap<u64, Cancellable>>>,
    next_effect: u64,
}

impl<R> TestStore<R>
where
    R: Reducer,
    R::State: Clone + PartialEq + fmt::Debug,
    R::Action: PartialEq + fmt::Debug + 'static,
{
    pub fn new(initial_state: R::State, reducer: R, environment: R::Environment) -> Self {
        Self {
            state: initial_state,
            reducer,
            environment,
            context: EffectContext::new(),
            received: Rc::new(RefCell::new(VecDeque::new())),
            in_flight: Rc::new(RefCell::new(HashMap::new())),
            next_effect: 0,
        }
    }

    /// Send `action` and assert the resulting state.
    ///
    /// `update` receives a copy of the state before the action and must
    /// turn it into the expected state after it.
    ///
    /// # Panics
    /// Panics if effect actions are still waiting to be received, or if
    /// the state does not match.
    #[track_caller]
    pub fn send(&mut self, action: R::Action, update: impl FnOnce(&mut R::State)) {
        let pending = self.received.borrow().len();
        if pending > 0 {
            panic!(
                "must handle {pending} received action(s) before sending {action:?}: {:?}",
                self.received.borrow()
            );
        }
        let description = format!("{action:?}");
        self.step(action, &description, update);
    }

    /// Assert that the oldest unhandled effect action equals `expected`,
    /// process it, and assert the resulting state.
    ///
    /// # Panics
    /// Panics if no action was received, the action differs, or the state
    /// does not match.
    #[track_caller]
    pub fn receive(&mut self, expected: R::Action, update: impl FnOnce(&mut R::State)) {
        let next = self.received.borrow_mut().pop_front();
        let Some(action) = next else {
            panic!("expected to receive {expected:?}, but no action was received");
        };
        assert_eq!(action, expected, "received an unexpected action");
        let description = format!("received {action:?}");
        self.step(action, &description, update);
    }

    /// The current state.
    pub fn state(&self) -> &R::State {
        &self.state
    }

    /// Number of effect actions not yet acknowledged with `receive`.
    pub fn received_count(&self) -> usize {
        self.received.borrow().len()
    }

    /// Number of effects that have not completed.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.borrow().len()
    }

    /// Discard every unacknowledged effect action.
    pub fn skip_received(&mut self) {
        let skipped = std::mem::take(&mut *self.received.borrow_mut());
        if !skipped.is_empty() {
            tracing::debug!(target: "unidirect::store", ?skipped, "skipping received actions");
        }
    }

    /// Cancel every effect that is still running.
    pub fn cancel_in_flight(&mut self) {
        let effects = std::mem::take(&mut *self.in_flight.borrow_mut());
        for (_, handle) in effects {
            handle.cancel();
        }
    }

    /// The effect context shared by every effect this store subscribes.
    pub fn effect_context(&self) -> &EffectContext {
        &self.context
    }

    #[track_caller]
    fn step(&mut self, action: R::Action, description: &str, update: impl FnOnce(&mut R::State)) {
        let mut expected = self.state.clone();
        let effect = self
            .reducer
            .reduce(&mut self.state, action, &self.environment);
        update(&mut expected);
        assert_eq!(
            self.state, expected,
            "state after {description} did not match the expected state"
        );
        self.subscribe(effect);
    }

    fn subscribe(&mut self, effect: Effect<R::Action>) {
        if effect.is_none() {
            return;
        }
        let id = self.next_effect;
        self.next_effect += 1;

        let completed = Rc::new(Cell::new(false));
        let received = Rc::clone(&self.received);
        let in_flight = Rc::clone(&self.in_flight);
        let finished = Rc::clone(&completed);
        let handle = effect.subscribe(Subscriber::new(
            self.context.clone(),
            move |action| received.borrow_mut().push_back(action),
            move || {
                finished.set(true);
                let done = in_flight.borrow_mut().remove(&id);
                drop(done);
            },
        ));
        if !completed.get() {
            self.in_flight.borrow_mut().insert(id, handle);
        }
    }
}

impl<R: Reducer> Drop for TestStore<R> {
    fn drop(&mut self) {
        let received = self.received.borrow().len();
        let in_flight = std::mem::take(&mut *self.in_flight.borrow_mut());
        let running = in_flight.len();
        for (_, handle) in in_flight {
            handle.cancel();
        }
        if std::thread::panicking() {
            return;
        }
        if received > 0 {
            panic!("test store dropped with {received} unhandled received action(s)");
        }
        if running > 0 {
            panic!(
                "test store dropped with {running} effect(s) still in flight; \
                 advance the scheduler or call cancel_in_flight"
            );
        }
    }
}

impl<R: Reducer> fmt::Debug for TestStore<R>
where
    R::State: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestStore")
            .field("state", &self.state)
            .field("received", &self.received.borrow().len())
            .field("in_flight", &self.in_flight.borrow().len())
            .finish()
    }
}

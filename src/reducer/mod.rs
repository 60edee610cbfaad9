//! Reducers: the only place where state transitions happen.
//!
//! # Architecture
//!
//! ```text
//! Action ──→ Reducer ──→ State ──→ View
//!    ↑          │
//!    │          └──→ Effect
//!    └──────────────────┘
//! ```
//!
//! A reducer mutates the state it is handed and returns an [`Effect`]
//! describing follow-up work. It must not perform side effects itself,
//! and must not reach back into the store that is running it.

mod compose;

use std::rc::Rc;

use crate::effect::Effect;

pub use compose::CasePath;

/// Transforms state in response to actions.
///
/// Every reducer a store runs, however it was composed, is reduced to
/// this single call contract.
pub trait Reducer {
    /// The state type this reducer operates on.
    type State;

    /// The action type this reducer handles.
    type Action;

    /// Dependencies available to the reducer (clients, clocks, schedulers).
    type Environment;

    /// Process an action, mutating `state` in place.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        environment: &Self::Environment,
    ) -> Effect<Self::Action>;
}

type ReduceFn<S, A, E> = dyn Fn(&mut S, A, &E) -> Effect<A>;

/// A reducer built from a closure, composable with the combinators in
/// this module.
pub struct Reduce<S, A, E> {
    run: Rc<ReduceFn<S, A, E>>,
}

impl<S: 'static, A: 'static, E: 'static> Reduce<S, A, E> {
    pub fn new(run: impl Fn(&mut S, A, &E) -> Effect<A> + 'static) -> Self {
        Self { run: Rc::new(run) }
    }

    /// A reducer that ignores every action.
    pub fn empty() -> Self {
        Self::new(|_, _, _| Effect::none())
    }
}

impl<S, A, E> Clone for Reduce<S, A, E> {
    fn clone(&self) -> Self {
        Self {
            run: Rc::clone(&self.run),
        }
    }
}

impl<S, A, E> Reducer for Reduce<S, A, E> {
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(&self, state: &mut S, action: A, environment: &E) -> Effect<A> {
        (self.run)(state, action, environment)
    }
}

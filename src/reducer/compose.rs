//! Reducer composition: combine, pullback, optional, for_each, traced.

use std::fmt;
use std::rc::Rc;

use super::{Reduce, Reducer};
use crate::effect::Effect;
use crate::identified::{Identifiable, IdentifiedVec};

/// Explicit embed/extract pair relating an enum to one of its cases.
///
/// Used to pull a child reducer back along an action case:
///
/// ```
/// use unidirect::CasePath;
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum AppAction { Counter(i32), Reset }
///
/// let counter = CasePath::new(AppAction::Counter, |action: &AppAction| match action {
///     AppAction::Counter(delta) => Some(*delta),
///     _ => None,
/// });
/// assert_eq!(counter.extract(&AppAction::Counter(3)), Some(3));
/// assert_eq!(counter.extract(&AppAction::Reset), None);
/// assert_eq!(counter.embed(1), AppAction::Counter(1));
/// ```
pub struct CasePath<Root, Value> {
    embed: Rc<dyn Fn(Value) -> Root>,
    extract: Rc<dyn Fn(&Root) -> Option<Value>>,
}

impl<Root: 'static, Value: 'static> CasePath<Root, Value> {
    pub fn new(
        embed: impl Fn(Value) -> Root + 'static,
        extract: impl Fn(&Root) -> Option<Value> + 'static,
    ) -> Self {
        Self {
            embed: Rc::new(embed),
            extract: Rc::new(extract),
        }
    }

    pub fn embed(&self, value: Value) -> Root {
        (self.embed)(value)
    }

    pub fn extract(&self, root: &Root) -> Option<Value> {
        (self.extract)(root)
    }
}

impl<Root: Clone + 'static> CasePath<Root, Root> {
    /// The case path that matches every value.
    pub fn identity() -> Self {
        Self::new(|value| value, |root: &Root| Some(root.clone()))
    }
}

impl<Root, Value> Clone for CasePath<Root, Value> {
    fn clone(&self) -> Self {
        Self {
            embed: Rc::clone(&self.embed),
            extract: Rc::clone(&self.extract),
        }
    }
}

impl<S: 'static, A: 'static, E: 'static> Reduce<S, A, E> {
    /// Run every reducer on each action, in order, merging their effects.
    pub fn combine(reducers: impl IntoIterator<Item = Self>) -> Self
    where
        A: Clone,
    {
        let reducers: Vec<Self> = reducers.into_iter().collect();
        Self::new(move |state, action, environment| {
            let mut effects = Vec::with_capacity(reducers.len());
            for reducer in &reducers {
                effects.push(reducer.reduce(state, action.clone(), environment));
            }
            Effect::merge(effects)
        })
    }

    pub fn combined_with(self, other: Self) -> Self
    where
        A: Clone,
    {
        Self::combine([self, other])
    }

    /// Lift this reducer to work on a larger state, action and environment.
    ///
    /// Global actions that `action` does not extract are ignored. Effects
    /// are mapped back into global actions.
    pub fn pullback<GS, GA, GE>(
        self,
        state: impl Fn(&mut GS) -> &mut S + 'static,
        action: CasePath<GA, A>,
        environment: impl Fn(&GE) -> E + 'static,
    ) -> Reduce<GS, GA, GE>
    where
        GS: 'static,
        GA: 'static,
        GE: 'static,
    {
        Reduce::new(move |global_state, global_action, global_environment| {
            let Some(local_action) = action.extract(&global_action) else {
                return Effect::none();
            };
            let local_environment = environment(global_environment);
            let embed = action.clone();
            self.reduce(state(global_state), local_action, &local_environment)
                .map(move |local| embed.embed(local))
        })
    }

    /// Run this reducer on optional state, only while the state is present.
    pub fn optional(self) -> Reduce<Option<S>, A, E> {
        Reduce::new(move |state: &mut Option<S>, action, environment| match state {
            Some(state) => self.reduce(state, action, environment),
            None => {
                tracing::warn!(
                    target: "unidirect::reducer",
                    action = std::any::type_name::<A>(),
                    "optional reducer received an action while its state was absent"
                );
                Effect::none()
            }
        })
    }

    /// Run this reducer on the element of an [`IdentifiedVec`] that an
    /// `(id, action)` pair addresses.
    pub fn for_each<GS, GA, GE>(
        self,
        state: impl Fn(&mut GS) -> &mut IdentifiedVec<S> + 'static,
        action: CasePath<GA, (S::Id, A)>,
        environment: impl Fn(&GE) -> E + 'static,
    ) -> Reduce<GS, GA, GE>
    where
        S: Identifiable,
        GS: 'static,
        GA: 'static,
        GE: 'static,
    {
        Reduce::new(move |global_state, global_action, global_environment| {
            let Some((id, local_action)) = action.extract(&global_action) else {
                return Effect::none();
            };
            let local_environment = environment(global_environment);
            let Some(element) = state(global_state).get_mut(&id) else {
                tracing::warn!(
                    target: "unidirect::reducer",
                    id = ?id,
                    "for_each reducer received an action for an element that is not present"
                );
                return Effect::none();
            };
            let embed = action.clone();
            self.reduce(element, local_action, &local_environment)
                .map(move |local| embed.embed((id.clone(), local)))
        })
    }

    /// Log every action this reducer receives at debug level.
    pub fn traced(self, label: &'static str) -> Self
    where
        A: fmt::Debug,
    {
        Self::new(move |state, action, environment| {
            tracing::debug!(target: "unidirect::reducer", reducer = label, action = ?action, "received action");
            self.reduce(state, action, environment)
        })
    }
}

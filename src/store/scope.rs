//! Deriving child stores from a parent store.
//!
//! A scoped store has no logic of its own. It forwards every local
//! action to the parent and then re-projects its state from the
//! parent's updated state. Between its own sends it follows the parent
//! through a state observer that holds the child weakly, so dropping the
//! child detaches it and never affects the parent.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::{Process, Store};
use crate::identified::{Identifiable, IdentifiedVec};

type Projection<S, LS> = Rc<dyn Fn(&S) -> Option<LS>>;

impl<S, A> Store<S, A>
where
    S: Clone + 'static,
    A: fmt::Debug + 'static,
{
    /// Derive a store over a projection of this store's state and a
    /// subset of its actions.
    pub fn scope<LS, LA>(
        &self,
        state: impl Fn(&S) -> LS + 'static,
        action: impl Fn(LA) -> A + 'static,
    ) -> Store<LS, LA>
    where
        LS: Clone + 'static,
        LA: fmt::Debug + 'static,
    {
        let initial = self.with_state(&state);
        self.scope_projection(initial, Rc::new(move |parent: &S| Some(state(parent))), action)
    }

    /// Derive a store over a projection of the state that accepts this
    /// store's own actions.
    pub fn scope_state<LS>(&self, state: impl Fn(&S) -> LS + 'static) -> Store<LS, A>
    where
        LS: Clone + 'static,
    {
        self.scope(state, |action| action)
    }

    /// Derive a store over optional child state.
    ///
    /// Returns `None` while the child state is absent. Once created, the
    /// child keeps its last present state if the parent's becomes absent.
    pub fn scope_optional<LS, LA>(
        &self,
        state: impl Fn(&S) -> Option<LS> + 'static,
        action: impl Fn(LA) -> A + 'static,
    ) -> Option<Store<LS, LA>>
    where
        LS: Clone + 'static,
        LA: fmt::Debug + 'static,
    {
        let initial = self.with_state(&state)?;
        Some(self.scope_projection(initial, Rc::new(state), action))
    }

    /// Derive one store per element of an identified collection, in order.
    ///
    /// Each child addresses its element by id; a child whose element is
    /// removed keeps the last state it saw.
    pub fn scope_each<LS, LA>(
        &self,
        state: impl Fn(&S) -> &IdentifiedVec<LS> + 'static,
        action: impl Fn(LS::Id, LA) -> A + 'static,
    ) -> Vec<Store<LS, LA>>
    where
        LS: Identifiable + Clone + 'static,
        LA: fmt::Debug + 'static,
    {
        let state = Rc::new(state);
        let action = Rc::new(action);
        let elements: Vec<(LS::Id, LS)> = self.with_state(|parent| {
            state(parent)
                .iter()
                .map(|element| (element.id(), element.clone()))
                .collect()
        });

        elements
            .into_iter()
            .map(|(id, element)| {
                let lookup = Rc::clone(&state);
                let key = id.clone();
                let embed = Rc::clone(&action);
                self.scope_projection(
                    element,
                    Rc::new(move |parent: &S| lookup(parent).get(&key).cloned()),
                    move |local| embed(id.clone(), local),
                )
            })
            .collect()
    }

    fn scope_projection<LS, LA>(
        &self,
        initial: LS,
        project: Projection<S, LS>,
        embed: impl Fn(LA) -> A + 'static,
    ) -> Store<LS, LA>
    where
        LS: Clone + 'static,
        LA: fmt::Debug + 'static,
    {
        let forwarding = Rc::new(Cell::new(false));

        let forward = {
            let parent = self.clone();
            let project = Rc::clone(&project);
            let forwarding = Rc::clone(&forwarding);
            move |action: LA| -> Option<LS> {
                forwarding.set(true);
                let _done = scopeguard::guard(&forwarding, |flag| flag.set(false));
                parent.send(embed(action));
                parent.with_state(|state| project(state))
            }
        };
        let child = Store::from_parts(
            initial,
            Process::Forward(Box::new(forward)),
            self.core.config.clone(),
        );

        let weak_child = child.downgrade();
        let subscription = self.observe(move |state: &S| {
            if forwarding.get() {
                return;
            }
            let Some(core) = weak_child.upgrade() else { return };
            if let Some(next) = project(state) {
                Store::<LS, LA>::replace_state(&core, next);
            }
        });
        *child.core.parent.borrow_mut() = Some(subscription);
        child
    }
}

//! Effects: descriptions of asynchronous work that emit zero or more
//! outputs and then complete.
//!
//! An [`Effect`] does nothing until it is subscribed, usually by a
//! [`Store`](crate::Store) right after the reducer returns it. There is no
//! failure channel: fallible work maps its errors into output values
//! before they reach the store.
//!
//! # Combinators
//!
//! - [`Effect::none`], [`Effect::value`], [`Effect::fire_and_forget`]
//! - [`Effect::merge`] runs effects concurrently
//! - [`Effect::concatenate`] runs them one after another
//! - [`Effect::cancellable`] / [`Effect::cancel`] (see `cancellation`)
//! - [`Effect::deferred`], [`Effect::debounce`], [`Effect::throttle`],
//!   [`Effect::timer`] (see `timing`)
//! - [`Effect::task`], [`Effect::run`], [`Effect::stream`] (see `task`)

mod cancellation;
mod subscriber;
mod task;
mod timing;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

pub use cancellation::{CancellationRegistry, EffectContext, EffectId};
pub use subscriber::{Cancellable, Subscriber};
pub use task::EffectSender;

type Publisher<T> = Box<dyn FnOnce(Subscriber<T>) -> Cancellable>;

/// A unit of pending asynchronous work producing values of type `T`.
#[must_use = "effects do nothing unless returned to a store or subscribed"]
pub struct Effect<T> {
    operation: Operation<T>,
}

enum Operation<T> {
    None,
    Publisher(Publisher<T>),
}

impl<T: 'static> Effect<T> {
    /// An effect that emits nothing and completes immediately.
    pub fn none() -> Self {
        Self {
            operation: Operation::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.operation, Operation::None)
    }

    /// Build an effect from a subscribe function.
    ///
    /// `publisher` runs once per subscription. It must eventually call
    /// `complete` on the subscriber unless the effect is meant to stay
    /// alive until cancelled, and returns the teardown for its work.
    pub fn from_publisher(publisher: impl FnOnce(Subscriber<T>) -> Cancellable + 'static) -> Self {
        Self {
            operation: Operation::Publisher(Box::new(publisher)),
        }
    }

    /// Emit `value` once, then complete.
    pub fn value(value: T) -> Self {
        Self::from_publisher(move |subscriber| {
            subscriber.send(value);
            subscriber.complete();
            Cancellable::empty()
        })
    }

    /// Run `work` when subscribed and complete without output.
    pub fn fire_and_forget(work: impl FnOnce() + 'static) -> Self {
        Self::from_publisher(move |subscriber| {
            work();
            subscriber.complete();
            Cancellable::empty()
        })
    }

    /// Choose between two effects when the effect is built.
    pub fn when(condition: bool, then: Self, otherwise: Self) -> Self {
        if condition {
            then
        } else {
            otherwise
        }
    }

    /// `make(value)` when `option` holds a value, otherwise [`Effect::none`].
    pub fn if_some<V>(option: Option<V>, make: impl FnOnce(V) -> Self) -> Self {
        option.map_or_else(Self::none, make)
    }

    /// `make()` when `option` is empty, otherwise [`Effect::none`].
    pub fn if_none<V>(option: &Option<V>, make: impl FnOnce() -> Self) -> Self {
        if option.is_none() {
            make()
        } else {
            Self::none()
        }
    }

    /// Transform every output value.
    pub fn map<U: 'static>(self, transform: impl FnMut(T) -> U + 'static) -> Effect<U> {
        match self.operation {
            Operation::None => Effect::none(),
            Operation::Publisher(publisher) => {
                let mut transform = transform;
                Effect::from_publisher(move |downstream: Subscriber<U>| {
                    let output = downstream.clone();
                    let mapped = Subscriber::new(
                        downstream.context().clone(),
                        move |value| output.send(transform(value)),
                        move || downstream.complete(),
                    );
                    Effect {
                        operation: Operation::Publisher(publisher),
                    }
                    .subscribe(mapped)
                })
            }
        }
    }

    /// Run all effects concurrently; complete when every one has completed.
    pub fn merge(effects: impl IntoIterator<Item = Self>) -> Self {
        let mut effects: Vec<Self> = effects.into_iter().filter(|e| !e.is_none()).collect();
        if effects.len() <= 1 {
            return effects.pop().unwrap_or_else(Self::none);
        }

        Self::from_publisher(move |downstream: Subscriber<T>| {
            let remaining = Rc::new(Cell::new(effects.len()));
            let mut handles = Vec::with_capacity(effects.len());
            for effect in effects {
                let output = downstream.clone();
                let completion = downstream.clone();
                let remaining = Rc::clone(&remaining);
                let member = Subscriber::new(
                    downstream.context().clone(),
                    move |value| output.send(value),
                    move || {
                        remaining.set(remaining.get() - 1);
                        if remaining.get() == 0 {
                            completion.complete();
                        }
                    },
                );
                handles.push(effect.subscribe(member));
                if downstream.is_cancelled() {
                    break;
                }
            }
            let handle = Cancellable::all(handles);
            if downstream.is_cancelled() {
                handle.cancel();
            }
            handle
        })
    }

    pub fn merge_with(self, other: Self) -> Self {
        Self::merge([self, other])
    }

    /// Run effects strictly one after another.
    ///
    /// An effect is not subscribed until its predecessor completes; if one
    /// never completes, the rest never start.
    pub fn concatenate(effects: impl IntoIterator<Item = Self>) -> Self {
        let mut effects: VecDeque<Self> = effects.into_iter().filter(|e| !e.is_none()).collect();
        if effects.len() <= 1 {
            return effects.pop_front().unwrap_or_else(Self::none);
        }

        Self::from_publisher(move |downstream: Subscriber<T>| {
            let chain = Rc::new(Concatenation {
                queue: RefCell::new(effects),
                downstream,
                current: RefCell::new(None),
                subscribing: Cell::new(false),
                finished_while_subscribing: Cell::new(false),
            });
            chain.advance();
            Cancellable::new(move || chain.stop())
        })
    }

    pub fn concat_with(self, other: Self) -> Self {
        Self::concatenate([self, other])
    }

    /// Subscribe `subscriber` to this effect and return the teardown handle.
    pub fn subscribe(self, subscriber: Subscriber<T>) -> Cancellable {
        match self.operation {
            Operation::None => {
                subscriber.complete();
                Cancellable::empty()
            }
            Operation::Publisher(publisher) => {
                let upstream = publisher(subscriber.clone());
                Cancellable::new(move || {
                    subscriber.cancel();
                    upstream.cancel();
                })
            }
        }
    }

    /// Subscribe with plain closures, outside of any store.
    pub fn sink(
        self,
        context: &EffectContext,
        on_output: impl FnMut(T) + 'static,
        on_complete: impl FnOnce() + 'static,
    ) -> Cancellable {
        self.subscribe(Subscriber::new(context.clone(), on_output, on_complete))
    }
}

impl<T> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operation {
            Operation::None => f.write_str("Effect::none"),
            Operation::Publisher(_) => f.write_str("Effect { .. }"),
        }
    }
}

/// Drives [`Effect::concatenate`]: subscribes one member at a time.
///
/// Members that complete synchronously are chained in a loop rather than by
/// recursion, so long runs of immediate effects keep a flat stack.
struct Concatenation<T> {
    queue: RefCell<VecDeque<Effect<T>>>,
    downstream: Subscriber<T>,
    current: RefCell<Option<Cancellable>>,
    subscribing: Cell<bool>,
    finished_while_subscribing: Cell<bool>,
}

impl<T: 'static> Concatenation<T> {
    fn advance(self: &Rc<Self>) {
        loop {
            if self.downstream.is_terminated() {
                return;
            }
            let next = self.queue.borrow_mut().pop_front();
            let Some(effect) = next else {
                self.downstream.complete();
                return;
            };

            let output = self.downstream.clone();
            let chain = Rc::clone(self);
            let member = Subscriber::new(
                self.downstream.context().clone(),
                move |value| output.send(value),
                move || chain.member_completed(),
            );

            self.subscribing.set(true);
            self.finished_while_subscribing.set(false);
            let handle = effect.subscribe(member);
            self.subscribing.set(false);

            if !self.finished_while_subscribing.get() {
                *self.current.borrow_mut() = Some(handle);
                return;
            }
        }
    }

    fn member_completed(self: &Rc<Self>) {
        if self.subscribing.get() {
            self.finished_while_subscribing.set(true);
            return;
        }
        self.current.borrow_mut().take();
        self.advance();
    }

    fn stop(&self) {
        let pending = std::mem::take(&mut *self.queue.borrow_mut());
        drop(pending);
        let current = self.current.borrow_mut().take();
        if let Some(current) = current {
            current.cancel();
        }
    }
}

//! Time-based combinators: `deferred`, `debounce`, `throttle`, `timer`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Duration;

use super::cancellation::{EffectId, ThrottleSlot};
use super::subscriber::{Cancellable, Subscriber};
use super::Effect;
use crate::scheduler::Scheduler;

impl<T: 'static> Effect<T> {
    /// Delay subscribing to this effect by `delay` on `scheduler`.
    ///
    /// Unlike delaying outputs, nothing in the effect runs before the
    /// delay has passed.
    pub fn deferred<S: Scheduler>(self, delay: Duration, scheduler: &S) -> Self {
        if self.is_none() {
            return self;
        }
        let scheduler = scheduler.clone();
        Effect::from_publisher(move |downstream: Subscriber<T>| {
            let started: Rc<RefCell<Option<Cancellable>>> = Rc::new(RefCell::new(None));
            let slot = Rc::clone(&started);
            let subscriber = downstream.clone();
            let timer = scheduler.schedule_after(
                delay,
                Box::new(move || {
                    if subscriber.is_terminated() {
                        return;
                    }
                    let output = subscriber.clone();
                    let forward = Subscriber::new(
                        subscriber.context().clone(),
                        move |value| output.send(value),
                        move || subscriber.complete(),
                    );
                    let handle = self.subscribe(forward);
                    *slot.borrow_mut() = Some(handle);
                }),
            );
            Cancellable::new(move || {
                timer.cancel();
                let inner = started.borrow_mut().take();
                if let Some(inner) = inner {
                    inner.cancel();
                }
            })
        })
    }

    /// Start this effect only after `delay` passes without another effect
    /// being started under `id`; each new start restarts the wait.
    pub fn debounce<K, S>(self, id: K, delay: Duration, scheduler: &S) -> Self
    where
        K: Hash + Eq + fmt::Debug + 'static,
        S: Scheduler,
    {
        self.deferred(delay, scheduler).cancellable(id, true)
    }

    /// Let at most one output per `interval` through for `id`.
    ///
    /// The first output, or one arriving at least `interval` after the last
    /// emission, is emitted immediately. Outputs arriving sooner are held
    /// until the window ends: with `latest` the most recent one is emitted,
    /// otherwise the first one held in that window. Emission times and held
    /// values live in the store's effect context, so throttling state is
    /// shared by every effect using the same `id` in one store.
    pub fn throttle<K, S>(self, id: K, interval: Duration, scheduler: &S, latest: bool) -> Self
    where
        K: Hash + Eq + fmt::Debug + 'static,
        S: Scheduler,
    {
        let key = EffectId::new(id);
        let throttled = {
            let key = key.clone();
            let scheduler = scheduler.clone();
            Effect::from_publisher(move |downstream: Subscriber<T>| {
                let gate = Rc::new(Throttle {
                    key,
                    interval,
                    scheduler,
                    latest,
                    downstream,
                    timer: RefCell::new(None),
                    upstream_done: Cell::new(false),
                });
                let receiver = Rc::clone(&gate);
                let finisher = Rc::clone(&gate);
                let upstream = Subscriber::new(
                    gate.downstream.context().clone(),
                    move |value| receiver.receive(value),
                    move || finisher.upstream_completed(),
                );
                gate.adopt();
                let handle = self.subscribe(upstream);
                Cancellable::new(move || {
                    handle.cancel();
                    gate.stop();
                })
            })
        };
        throttled.cancellable(key, true)
    }
}

impl Effect<Duration> {
    /// Emit the scheduler's `now()` every `interval` until cancelled.
    ///
    /// Never completes on its own. Started with cancel-in-flight under
    /// `id`, so cancelling `id` stops it.
    pub fn timer<K, S>(id: K, interval: Duration, scheduler: &S) -> Self
    where
        K: Hash + Eq + fmt::Debug + 'static,
        S: Scheduler,
    {
        let scheduler = scheduler.clone();
        Effect::from_publisher(move |downstream: Subscriber<Duration>| {
            let ticker = Rc::new(Ticker {
                next_tick: Cell::new(scheduler.now() + interval),
                scheduler,
                interval,
                downstream,
                current: RefCell::new(None),
            });
            ticker.schedule();
            Cancellable::new(move || ticker.stop())
        })
        .cancellable(id, true)
    }
}

struct Throttle<T, S> {
    key: EffectId,
    interval: Duration,
    scheduler: S,
    latest: bool,
    downstream: Subscriber<T>,
    timer: RefCell<Option<Cancellable>>,
    upstream_done: Cell<bool>,
}

impl<T: 'static, S: Scheduler> Throttle<T, S> {
    /// Take over a value held by a cancelled predecessor.
    ///
    /// Only a restart at the instant of cancellation (cancel-in-flight)
    /// inherits the held value and its window. Any later start discards it.
    fn adopt(self: &Rc<Self>) {
        let now = self.scheduler.now();
        let wait = {
            let mut slots = self.downstream.context().throttles().borrow_mut();
            let Some(slot) = slots.get_mut(&self.key) else {
                return;
            };
            match slot.orphaned_at.take() {
                Some(at) if at == now && slot.retained.is_some() => {
                    Some((slot.last_emission + self.interval).saturating_sub(now))
                }
                Some(_) => {
                    slot.retained = None;
                    None
                }
                None => None,
            }
        };
        if let Some(wait) = wait {
            self.start_timer(wait);
        }
    }

    fn receive(self: &Rc<Self>, value: T) {
        let now = self.scheduler.now();
        let (emit, wait) = {
            let mut slots = self.downstream.context().throttles().borrow_mut();
            match slots.get_mut(&self.key) {
                None => {
                    slots.insert(
                        self.key.clone(),
                        ThrottleSlot {
                            last_emission: now,
                            retained: None,
                            orphaned_at: None,
                        },
                    );
                    (Some(value), None)
                }
                Some(slot) => {
                    let holds_value = slot.retained.as_ref().is_some_and(|held| held.is::<T>());
                    if self.latest || !holds_value {
                        slot.retained = Some(Box::new(value));
                    }
                    let window_end = slot.last_emission + self.interval;
                    if now >= window_end {
                        slot.last_emission = now;
                        (take_retained::<T>(slot), None)
                    } else {
                        (None, Some(window_end - now))
                    }
                }
            }
        };

        if let Some(value) = emit {
            self.downstream.send(value);
        }
        if let Some(wait) = wait {
            self.start_timer(wait);
        }
    }

    fn start_timer(self: &Rc<Self>, wait: Duration) {
        let gate = Rc::clone(self);
        let timer = self
            .scheduler
            .schedule_after(wait, Box::new(move || gate.window_elapsed()));
        let previous = self.timer.borrow_mut().replace(timer);
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    fn window_elapsed(&self) {
        self.timer.borrow_mut().take();
        let now = self.scheduler.now();
        let value = {
            let mut slots = self.downstream.context().throttles().borrow_mut();
            slots.get_mut(&self.key).and_then(|slot| {
                slot.last_emission = now;
                take_retained::<T>(slot)
            })
        };
        if let Some(value) = value {
            self.downstream.send(value);
        }
        if self.upstream_done.get() {
            self.downstream.complete();
        }
    }

    fn upstream_completed(&self) {
        self.upstream_done.set(true);
        if self.timer.borrow().is_none() {
            self.downstream.complete();
        }
    }

    fn stop(&self) {
        let timer = self.timer.borrow_mut().take();
        if let Some(timer) = timer {
            timer.cancel();
            let now = self.scheduler.now();
            let mut slots = self.downstream.context().throttles().borrow_mut();
            if let Some(slot) = slots.get_mut(&self.key) {
                slot.orphaned_at = Some(now);
            }
        }
    }
}

fn take_retained<T: 'static>(slot: &mut ThrottleSlot) -> Option<T> {
    let held = slot.retained.take()?;
    match held.downcast::<T>() {
        Ok(value) => Some(*value),
        Err(_) => {
            tracing::warn!(
                target: "unidirect::effect",
                "throttle id reused with a different output type; dropping held value"
            );
            None
        }
    }
}

struct Ticker<S> {
    scheduler: S,
    interval: Duration,
    downstream: Subscriber<Duration>,
    next_tick: Cell<Duration>,
    current: RefCell<Option<Cancellable>>,
}

impl<S: Scheduler> Ticker<S> {
    fn schedule(self: &Rc<Self>) {
        let delay = self.next_tick.get().saturating_sub(self.scheduler.now());
        let ticker = Rc::clone(self);
        let handle = self
            .scheduler
            .schedule_after(delay, Box::new(move || ticker.tick()));
        *self.current.borrow_mut() = Some(handle);
    }

    fn tick(self: &Rc<Self>) {
        if self.downstream.is_terminated() {
            return;
        }
        self.downstream.send(self.scheduler.now());
        self.next_tick.set(self.next_tick.get() + self.interval);
        if !self.downstream.is_terminated() {
            self.schedule();
        }
    }

    fn stop(&self) {
        let current = self.current.borrow_mut().take();
        if let Some(current) = current {
            current.cancel();
        }
    }
}

//! Virtual-time scheduler for deterministic tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{abortable, LocalBoxFuture};
use futures::task::LocalSpawnExt;

use super::{Scheduler, Work};
use crate::effect::Cancellable;

/// A scheduler whose clock only moves when told to.
///
/// Work scheduled with [`Scheduler::schedule_after`] runs during
/// [`advance`](TestScheduler::advance) in deadline order (ties in the
/// order they were scheduled), with the clock set to each deadline.
/// Spawned futures are polled until they stall after every step, so a
/// future awaiting [`Scheduler::sleep`] wakes as virtual time passes.
#[derive(Clone)]
pub struct TestScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    now: Cell<Duration>,
    queue: RefCell<BTreeMap<(Duration, u64), Work>>,
    next_seq: Cell<u64>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl TestScheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            inner: Rc::new(Inner {
                now: Cell::new(Duration::ZERO),
                queue: RefCell::new(BTreeMap::new()),
                next_seq: Cell::new(0),
                pool: RefCell::new(pool),
                spawner,
            }),
        }
    }

    /// Move the clock forward by `by`, running everything that comes due.
    pub fn advance(&self, by: Duration) {
        self.advance_to(self.inner.now.get() + by);
    }

    /// Move the clock to `deadline`, running everything that comes due.
    /// Deadlines in the past only run what is already due.
    pub fn advance_to(&self, deadline: Duration) {
        self.run_tasks();
        loop {
            let next = {
                let mut queue = self.inner.queue.borrow_mut();
                match queue.first_key_value() {
                    Some((&(due, _), _)) if due <= deadline => queue.pop_first(),
                    _ => None,
                }
            };
            let Some(((due, _), work)) = next else { break };
            if due > self.inner.now.get() {
                self.inner.now.set(due);
            }
            work();
            self.run_tasks();
        }
        if deadline > self.inner.now.get() {
            self.inner.now.set(deadline);
        }
    }

    /// Run scheduled work until none remains, advancing the clock as needed.
    ///
    /// Never returns if the scheduled work keeps rescheduling itself, as a
    /// timer does.
    pub fn run(&self) {
        self.run_tasks();
        loop {
            let next = self.inner.queue.borrow_mut().pop_first();
            let Some(((due, _), work)) = next else { break };
            if due > self.inner.now.get() {
                self.inner.now.set(due);
            }
            work();
            self.run_tasks();
        }
    }

    /// Number of scheduled, not yet executed work items.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    fn run_tasks(&self) {
        if let Ok(mut pool) = self.inner.pool.try_borrow_mut() {
            pool.run_until_stalled();
        }
    }
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TestScheduler {
    fn now(&self) -> Duration {
        self.inner.now.get()
    }

    fn schedule_after(&self, delay: Duration, work: Work) -> Cancellable {
        let seq = self.inner.next_seq.get();
        self.inner.next_seq.set(seq + 1);
        let key = (self.inner.now.get() + delay, seq);
        self.inner.queue.borrow_mut().insert(key, work);

        let weak = Rc::downgrade(&self.inner);
        Cancellable::new(move || {
            if let Some(inner) = weak.upgrade() {
                let removed = inner.queue.borrow_mut().remove(&key);
                drop(removed);
            }
        })
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) -> Cancellable {
        let (task, handle) = abortable(task);
        if let Err(err) = self.inner.spawner.spawn_local(async move {
            let _ = task.await;
        }) {
            tracing::warn!(target: "unidirect::scheduler", error = %err, "failed to spawn task");
        }
        Cancellable::new(move || handle.abort())
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel::<()>();
        let timer = self.schedule_after(
            duration,
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        Box::pin(async move {
            let timer = scopeguard::guard(timer, |timer| timer.cancel());
            let _ = rx.await;
            drop(timer);
        })
    }
}

impl fmt::Debug for TestScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestScheduler")
            .field("now", &self.inner.now.get())
            .field("pending", &self.inner.queue.borrow().len())
            .finish()
    }
}

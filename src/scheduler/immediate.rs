//! Scheduler that runs everything right away.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{abortable, LocalBoxFuture};
use futures::task::LocalSpawnExt;

use super::{Scheduler, Work};
use crate::effect::Cancellable;

/// Ignores delays: scheduled work runs synchronously and the clock stays
/// at zero. Spawned futures are polled on the calling thread until they
/// stall; a future that stalls forever is simply never resumed.
///
/// Handy for previews and for tests that only care about the order of
/// outputs, not their timing. Do not use it with [`Effect::timer`](crate::Effect::timer),
/// which would reschedule itself forever.
#[derive(Clone)]
pub struct ImmediateScheduler {
    pool: Rc<RefCell<LocalPool>>,
    spawner: LocalSpawner,
}

impl ImmediateScheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: Rc::new(RefCell::new(pool)),
            spawner,
        }
    }

    fn drive(&self) {
        // Re-entrant spawns are picked up by the outer run.
        if let Ok(mut pool) = self.pool.try_borrow_mut() {
            pool.run_until_stalled();
        }
    }
}

impl Default for ImmediateScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ImmediateScheduler {
    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn schedule_after(&self, _delay: Duration, work: Work) -> Cancellable {
        work();
        Cancellable::empty()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) -> Cancellable {
        let (task, handle) = abortable(task);
        match self.spawner.spawn_local(async move {
            let _ = task.await;
        }) {
            Ok(()) => self.drive(),
            Err(err) => {
                tracing::warn!(target: "unidirect::scheduler", error = %err, "failed to spawn task")
            }
        }
        Cancellable::new(move || handle.abort())
    }

    fn sleep(&self, _duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(futures::future::ready(()))
    }
}

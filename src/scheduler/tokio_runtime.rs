//! Wall-clock scheduler backed by the tokio runtime.

use std::time::Duration;

use futures::future::LocalBoxFuture;
use tokio::time::Instant;

use super::{Scheduler, Work};
use crate::effect::Cancellable;

/// Runs effects on the current tokio `LocalSet`.
///
/// Stores are single-threaded, so work is started with
/// [`tokio::task::spawn_local`]: every method except [`Scheduler::now`]
/// panics when called outside a `LocalSet`. Time comes from
/// [`tokio::time`], so paused-clock tests (`start_paused = true`) work
/// unchanged.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    epoch: Instant,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        Instant::now().duration_since(self.epoch)
    }

    fn schedule_after(&self, delay: Duration, work: Work) -> Cancellable {
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            work();
        });
        Cancellable::new(move || handle.abort())
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) -> Cancellable {
        let handle = tokio::task::spawn_local(task);
        Cancellable::new(move || handle.abort())
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

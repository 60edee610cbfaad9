//! Pluggable schedulers for time-based effects.
//!
//! Effects never read the wall clock or spawn tasks directly: they go
//! through a [`Scheduler`], so tests can substitute [`TestScheduler`] and
//! drive virtual time by hand.

mod immediate;
mod tokio_runtime;
mod virtual_time;

use std::time::Duration;

use futures::future::LocalBoxFuture;

use crate::effect::Cancellable;

pub use immediate::ImmediateScheduler;
pub use tokio_runtime::TokioScheduler;
pub use virtual_time::TestScheduler;

/// Unit of work handed to [`Scheduler::schedule_after`].
pub type Work = Box<dyn FnOnce()>;

/// Source of time and execution for effects.
///
/// All work runs on the store's own execution context; implementations are
/// cheap handles that are cloned into the effects using them.
pub trait Scheduler: Clone + 'static {
    /// Time elapsed since this scheduler's epoch.
    fn now(&self) -> Duration;

    /// Run `work` once `delay` has elapsed.
    fn schedule_after(&self, delay: Duration, work: Work) -> Cancellable;

    /// Drive `task` to completion. Cancelling drops the task.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) -> Cancellable;

    /// A future that resolves after `duration` of this scheduler's time.
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

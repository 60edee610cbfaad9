//! Effects backed by futures and streams.

use std::future::Future;

use futures::{Stream, StreamExt};

use super::subscriber::Subscriber;
use super::Effect;
use crate::scheduler::Scheduler;

/// Handle given to [`Effect::run`] bodies for emitting values.
pub struct EffectSender<T> {
    subscriber: Subscriber<T>,
}

impl<T: 'static> EffectSender<T> {
    pub fn send(&self, value: T) {
        self.subscriber.send(value);
    }

    /// True once the effect was cancelled; long-running bodies can stop early.
    pub fn is_cancelled(&self) -> bool {
        self.subscriber.is_cancelled()
    }
}

impl<T: 'static> Effect<T> {
    /// Emit the output of `future` once it resolves, then complete.
    pub fn task<S, F>(scheduler: &S, future: F) -> Self
    where
        S: Scheduler,
        F: Future<Output = T> + 'static,
    {
        let scheduler = scheduler.clone();
        Effect::from_publisher(move |downstream: Subscriber<T>| {
            scheduler.spawn(Box::pin(async move {
                let value = future.await;
                downstream.send(value);
                downstream.complete();
            }))
        })
    }

    /// Run an async body that may emit any number of values.
    ///
    /// The effect completes when the body's future resolves.
    pub fn run<S, F, Fut>(scheduler: &S, body: F) -> Self
    where
        S: Scheduler,
        F: FnOnce(EffectSender<T>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let scheduler = scheduler.clone();
        Effect::from_publisher(move |downstream: Subscriber<T>| {
            let sender = EffectSender {
                subscriber: downstream.clone(),
            };
            scheduler.spawn(Box::pin(async move {
                body(sender).await;
                downstream.complete();
            }))
        })
    }

    /// Forward every item of `stream`; complete when it ends.
    pub fn stream<S, St>(scheduler: &S, stream: St) -> Self
    where
        S: Scheduler,
        St: Stream<Item = T> + 'static,
    {
        let scheduler = scheduler.clone();
        Effect::from_publisher(move |downstream: Subscriber<T>| {
            scheduler.spawn(Box::pin(async move {
                let mut stream = Box::pin(stream);
                while let Some(item) = stream.next().await {
                    if downstream.is_terminated() {
                        return;
                    }
                    downstream.send(item);
                }
                downstream.complete();
            }))
        })
    }
}

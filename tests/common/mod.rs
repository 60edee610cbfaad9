//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use tempfile::TempDir;
use unidirect::{Cancellable, Effect, EffectContext, Scheduler, TestScheduler};

/// Collects what an effect emits, with the virtual time of each output.
pub struct Recorder<T> {
    pub outputs: Rc<RefCell<Vec<(Duration, T)>>>,
    pub completions: Rc<Cell<u32>>,
}

impl<T: 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            outputs: Rc::new(RefCell::new(Vec::new())),
            completions: Rc::new(Cell::new(0)),
        }
    }

    /// Subscribe `effect` in `context`, timestamping outputs with `scheduler`.
    pub fn attach(
        &self,
        effect: Effect<T>,
        context: &EffectContext,
        scheduler: &TestScheduler,
    ) -> Cancellable {
        let outputs = Rc::clone(&self.outputs);
        let completions = Rc::clone(&self.completions);
        let clock = scheduler.clone();
        effect.sink(
            context,
            move |value| outputs.borrow_mut().push((clock.now(), value)),
            move || completions.set(completions.get() + 1),
        )
    }

    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.outputs.borrow().iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn timeline(&self) -> Vec<(Duration, T)>
    where
        T: Clone,
    {
        self.outputs.borrow().clone()
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

pub fn secs(seconds: u64) -> Duration {
    Duration::from_secs(seconds)
}

/// Create a temporary config file with the given contents.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::{ms, secs};
use unidirect::{Effect, Reduce, Scheduler, Store, StoreConfig, TestScheduler};

#[derive(Debug, Clone, PartialEq)]
enum Action {
    A,
    B1,
    B2,
    B3,
    C1,
    C2,
    C3,
}

struct Env {
    scheduler: TestScheduler,
    delay: std::time::Duration,
}

fn chain_reducer() -> Reduce<Vec<Action>, Action, Env> {
    Reduce::new(|log: &mut Vec<Action>, action: Action, env: &Env| {
        log.push(action.clone());
        match action {
            Action::A => {
                let first = if env.delay.is_zero() {
                    Effect::value(Action::B1)
                } else {
                    Effect::value(Action::B1).deferred(env.delay, &env.scheduler)
                };
                Effect::concatenate([first, Effect::value(Action::C1)])
            }
            Action::B1 => Effect::merge([Effect::value(Action::B2), Effect::value(Action::B3)]),
            Action::C1 => Effect::merge([Effect::value(Action::C2), Effect::value(Action::C3)]),
            _ => Effect::none(),
        }
    })
}

#[test]
fn concatenated_effects_drive_actions_in_order() {
    let scheduler = TestScheduler::new();
    let store = Store::new(
        Vec::new(),
        chain_reducer(),
        Env {
            scheduler: scheduler.clone(),
            delay: secs(1),
        },
    );

    store.send(Action::A);
    assert_eq!(store.state(), [Action::A]);
    assert_eq!(store.live_effect_count(), 1);

    scheduler.advance(secs(1));
    assert_eq!(
        store.state(),
        [
            Action::A,
            Action::B1,
            Action::B2,
            Action::B3,
            Action::C1,
            Action::C2,
            Action::C3
        ]
    );
    assert_eq!(store.live_effect_count(), 0);
}

#[test]
fn synchronous_outputs_are_processed_breadth_first() {
    let scheduler = TestScheduler::new();
    let store = Store::new(
        Vec::new(),
        chain_reducer(),
        Env {
            scheduler: scheduler.clone(),
            delay: secs(0),
        },
    );

    store.send(Action::A);
    assert_eq!(
        store.state(),
        [
            Action::A,
            Action::B1,
            Action::C1,
            Action::B2,
            Action::B3,
            Action::C2,
            Action::C3
        ]
    );
}

#[derive(Debug, Clone)]
enum Load {
    Start,
    Loaded(u32),
}

#[test]
fn async_outputs_arrive_through_later_sends() {
    let scheduler = TestScheduler::new();
    let reducer = Reduce::new(|loaded: &mut Vec<u32>, action: Load, scheduler: &TestScheduler| {
        match action {
            Load::Start => {
                let clock = scheduler.clone();
                Effect::task(scheduler, async move {
                    clock.sleep(ms(250)).await;
                    Load::Loaded(7)
                })
            }
            Load::Loaded(value) => {
                loaded.push(value);
                Effect::none()
            }
        }
    });
    let store = Store::new(Vec::new(), reducer, scheduler.clone());

    store.send(Load::Start);
    scheduler.advance(ms(100));
    assert!(store.state().is_empty());
    assert_eq!(store.live_effect_count(), 1);

    scheduler.advance(ms(150));
    assert_eq!(store.state(), [7]);
    assert_eq!(store.live_effect_count(), 0);
}

#[derive(Debug, Clone)]
enum Work {
    Start,
}

#[derive(Debug, Hash, PartialEq, Eq)]
struct WorkId;

fn counting_reducer(
    runs: Rc<Cell<u32>>,
    cancel_in_flight: bool,
) -> Reduce<(), Work, TestScheduler> {
    Reduce::new(move |_: &mut (), action: Work, scheduler: &TestScheduler| match action {
        Work::Start => {
            let runs = Rc::clone(&runs);
            Effect::fire_and_forget(move || runs.set(runs.get() + 1))
                .deferred(secs(1), scheduler)
                .cancellable(WorkId, cancel_in_flight)
        }
    })
}

#[test]
fn cancel_in_flight_through_the_store() {
    let scheduler = TestScheduler::new();
    let runs = Rc::new(Cell::new(0));
    let store = Store::new((), counting_reducer(Rc::clone(&runs), true), scheduler.clone());

    store.send(Work::Start);
    scheduler.advance(ms(500));
    store.send(Work::Start);
    assert_eq!(store.live_effect_count(), 1);

    scheduler.advance(secs(2));
    assert_eq!(runs.get(), 1);
    assert_eq!(store.live_effect_count(), 0);
}

#[test]
fn dropping_the_store_cancels_live_effects() {
    let scheduler = TestScheduler::new();
    let runs = Rc::new(Cell::new(0));
    let store = Store::new((), counting_reducer(Rc::clone(&runs), false), scheduler.clone());

    store.send(Work::Start);
    store.send(Work::Start);
    assert_eq!(store.live_effect_count(), 2);

    drop(store);
    scheduler.advance(secs(5));
    assert_eq!(runs.get(), 0);
    assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn stores_have_separate_cancellation_registries() {
    let scheduler = TestScheduler::new();
    let runs = Rc::new(Cell::new(0));
    let first = Store::new((), counting_reducer(Rc::clone(&runs), true), scheduler.clone());
    let second = Store::new((), counting_reducer(Rc::clone(&runs), true), scheduler.clone());

    first.send(Work::Start);
    second.send(Work::Start);
    scheduler.advance(secs(1));

    assert_eq!(runs.get(), 2);
}

#[test]
fn observers_see_every_reducer_run() {
    let scheduler = TestScheduler::new();
    let store = Store::with_config(
        Vec::new(),
        chain_reducer(),
        Env {
            scheduler: scheduler.clone(),
            delay: secs(0),
        },
        StoreConfig {
            trace_actions: false,
            ..StoreConfig::default()
        },
    );
    let lengths = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&lengths);
    let _subscription = store.observe(move |log: &Vec<Action>| seen.borrow_mut().push(log.len()));

    store.send(Action::A);
    assert_eq!(*lengths.borrow(), [1, 2, 3, 4, 5, 6, 7]);
    assert!(!store.config().trace_actions);
}

#[test]
fn feedback_loops_past_the_warning_threshold_still_drain() {
    #[derive(Debug, Clone)]
    struct Tick;

    let reducer = Reduce::new(|count: &mut u32, _: Tick, _: &()| {
        *count += 1;
        Effect::when(*count < 50, Effect::value(Tick), Effect::none())
    });
    let store = Store::with_config(
        0,
        reducer,
        (),
        StoreConfig {
            drain_warning_threshold: 10,
            ..StoreConfig::default()
        },
    );

    store.send(Tick);
    assert_eq!(store.state(), 50);
}

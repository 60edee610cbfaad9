mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{secs, ms, Recorder};
use unidirect::{Cancellable, Effect, EffectContext, EffectId, Scheduler, TestScheduler};

#[derive(Debug, Hash, PartialEq, Eq)]
struct LoadId;

#[test]
fn merging_with_none_is_identity() {
    let scheduler = TestScheduler::new();
    let context = EffectContext::new();
    let plain = Recorder::new();
    let merged = Recorder::new();

    let _ = plain.attach(Effect::value(1), &context, &scheduler);
    let _ = merged.attach(
        Effect::merge([Effect::value(1), Effect::none()]),
        &context,
        &scheduler,
    );

    assert_eq!(plain.values(), merged.values());
    assert_eq!(merged.completions.get(), 1);
}

#[test]
fn merge_completes_after_every_member() {
    let scheduler = TestScheduler::new();
    let context = EffectContext::new();
    let recorder = Recorder::new();
    let _ = recorder.attach(
        Effect::merge([
            Effect::value("fast"),
            Effect::value("slow").deferred(secs(2), &scheduler),
        ]),
        &context,
        &scheduler,
    );

    assert_eq!(recorder.values(), ["fast"]);
    assert_eq!(recorder.completions.get(), 0);

    scheduler.advance(secs(2));
    assert_eq!(recorder.timeline(), [(secs(0), "fast"), (secs(2), "slow")]);
    assert_eq!(recorder.completions.get(), 1);
}

#[test]
fn concatenate_starts_next_only_after_previous_completes() {
    let scheduler = TestScheduler::new();
    let context = EffectContext::new();
    let started_at = Rc::new(Cell::new(None));

    let clock = scheduler.clone();
    let second_started = Rc::clone(&started_at);
    let second = Effect::from_publisher(move |subscriber| {
        second_started.set(Some(clock.now()));
        subscriber.send(2);
        subscriber.complete();
        Cancellable::empty()
    });

    let recorder = Recorder::new();
    let _ = recorder.attach(
        Effect::concatenate([Effect::value(1).deferred(secs(3), &scheduler), second]),
        &context,
        &scheduler,
    );

    scheduler.advance(secs(2));
    assert_eq!(started_at.get(), None);

    scheduler.advance(secs(1));
    assert_eq!(started_at.get(), Some(secs(3)));
    assert_eq!(recorder.timeline(), [(secs(3), 1), (secs(3), 2)]);
    assert_eq!(recorder.completions.get(), 1);
}

#[test]
fn concatenate_never_starts_after_a_member_that_never_completes() {
    let scheduler = TestScheduler::new();
    let context = EffectContext::new();
    let recorder = Recorder::new();
    let forever = Effect::from_publisher(|_subscriber| Cancellable::empty());

    let _ = recorder.attach(
        Effect::concatenate([forever, Effect::value(1)]),
        &context,
        &scheduler,
    );
    scheduler.advance(secs(60));

    assert!(recorder.values().is_empty());
    assert_eq!(recorder.completions.get(), 0);
}

#[test]
fn cancel_in_flight_silences_previous_effect() {
    let scheduler = TestScheduler::new();
    let context = EffectContext::new();
    let runs = Rc::new(Cell::new(0));

    let work = |runs: &Rc<Cell<u32>>| {
        let runs = Rc::clone(runs);
        Effect::<()>::fire_and_forget(move || runs.set(runs.get() + 1))
            .deferred(secs(1), &scheduler)
            .cancellable(LoadId, true)
    };

    let first = Recorder::new();
    let second = Recorder::new();
    let _ = first.attach(work(&runs), &context, &scheduler);
    scheduler.advance(ms(500));
    let _ = second.attach(work(&runs), &context, &scheduler);

    assert_eq!(first.completions.get(), 1);
    scheduler.advance(secs(2));

    assert_eq!(runs.get(), 1);
    assert_eq!(second.completions.get(), 1);
    assert_eq!(context.registry().active_count(), 0);
}

#[test]
fn cancel_stops_every_effect_under_the_id() {
    let scheduler = TestScheduler::new();
    let context = EffectContext::new();
    let recorder = Recorder::new();

    for value in [1, 2] {
        let _ = recorder.attach(
            Effect::value(value)
                .deferred(secs(1), &scheduler)
                .cancellable(LoadId, false),
            &context,
            &scheduler,
        );
    }
    assert_eq!(context.registry().active_count(), 2);
    assert!(context.registry().is_active(&EffectId::new(LoadId)));

    let control = Recorder::<i32>::new();
    let _ = control.attach(Effect::cancel(LoadId), &context, &scheduler);
    scheduler.advance(secs(5));

    assert!(recorder.values().is_empty());
    assert_eq!(control.completions.get(), 1);
    assert_eq!(context.registry().active_count(), 0);
}

#[test]
fn cancelling_an_unknown_id_just_completes() {
    let scheduler = TestScheduler::new();
    let context = EffectContext::new();
    let recorder = Recorder::<()>::new();
    let _ = recorder.attach(Effect::cancel("nothing here"), &context, &scheduler);
    assert_eq!(recorder.completions.get(), 1);
}

#[test]
fn completed_cancellable_leaves_the_registry() {
    let scheduler = TestScheduler::new();
    let context = EffectContext::new();
    let recorder = Recorder::new();
    let handle = recorder.attach(
        Effect::value(5).cancellable(LoadId, false),
        &context,
        &scheduler,
    );

    assert_eq!(recorder.values(), [5]);
    assert_eq!(context.registry().active_count(), 0);
    handle.cancel();
    assert_eq!(recorder.completions.get(), 1);
}

#[test]
fn cancel_all_covers_each_id() {
    let scheduler = TestScheduler::new();
    let context = EffectContext::new();
    let recorder = Recorder::new();
    let _ = recorder.attach(
        Effect::value("a").deferred(secs(1), &scheduler).cancellable("a", false),
        &context,
        &scheduler,
    );
    let _ = recorder.attach(
        Effect::value("b").deferred(secs(1), &scheduler).cancellable("b", false),
        &context,
        &scheduler,
    );

    let _ = Recorder::<&str>::new().attach(Effect::cancel_all(["a", "b"]), &context, &scheduler);
    scheduler.advance(secs(1));
    assert!(recorder.values().is_empty());
}

#[test]
fn separate_contexts_do_not_share_cancellation() {
    let scheduler = TestScheduler::new();
    let left = EffectContext::new();
    let right = EffectContext::new();
    let recorder = Recorder::new();

    let _ = recorder.attach(
        Effect::value("left").deferred(secs(1), &scheduler).cancellable(LoadId, false),
        &left,
        &scheduler,
    );
    let _ = Recorder::<&str>::new().attach(Effect::cancel(LoadId), &right, &scheduler);
    scheduler.advance(secs(1));

    assert_eq!(recorder.values(), ["left"]);
}

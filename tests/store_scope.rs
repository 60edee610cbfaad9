mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use unidirect::{Effect, Identifiable, IdentifiedVec, Reduce, Store};

#[derive(Debug, Clone, PartialEq)]
struct Counter {
    id: u32,
    count: i32,
}

impl Identifiable for Counter {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CounterAction {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, PartialEq)]
struct AppState {
    title: String,
    counters: IdentifiedVec<Counter>,
    detail: Option<Counter>,
}

#[derive(Debug, Clone, PartialEq)]
enum AppAction {
    Rename(String),
    Counter(u32, CounterAction),
    Detail(CounterAction),
    ShowDetail(u32),
    HideDetail,
    RemoveCounter(u32),
}

fn apply(counter: &mut Counter, action: CounterAction) {
    match action {
        CounterAction::Increment => counter.count += 1,
        CounterAction::Decrement => counter.count -= 1,
    }
}

fn app_store() -> Store<AppState, AppAction> {
    let reducer = Reduce::new(|state: &mut AppState, action: AppAction, _: &()| {
        match action {
            AppAction::Rename(title) => state.title = title,
            AppAction::Counter(id, action) => {
                if let Some(counter) = state.counters.get_mut(&id) {
                    apply(counter, action);
                }
            }
            AppAction::Detail(action) => {
                if let Some(counter) = state.detail.as_mut() {
                    apply(counter, action);
                }
            }
            AppAction::ShowDetail(id) => state.detail = state.counters.get(&id).cloned(),
            AppAction::HideDetail => state.detail = None,
            AppAction::RemoveCounter(id) => {
                state.counters.remove(&id);
            }
        }
        Effect::none()
    });
    let counters = (1..=3).map(|id| Counter { id, count: 0 }).collect();
    Store::new(
        AppState {
            title: "counters".into(),
            counters,
            detail: None,
        },
        reducer,
        (),
    )
}

#[test]
fn child_send_updates_parent_and_projection() {
    let store = app_store();
    let first = store.scope(
        |state: &AppState| state.counters[0].clone(),
        |action| AppAction::Counter(1, action),
    );

    first.send(CounterAction::Increment);
    first.send(CounterAction::Increment);

    assert_eq!(first.state().count, 2);
    assert_eq!(store.state().counters[&1].count, 2);
}

#[test]
fn sibling_scopes_follow_each_others_changes() {
    let store = app_store();
    let writer = store.scope(
        |state: &AppState| state.counters[&2].count,
        |action| AppAction::Counter(2, action),
    );
    let reader = store.scope_state(|state: &AppState| state.counters[&2].count);

    writer.send(CounterAction::Decrement);
    assert_eq!(reader.state(), -1);
}

#[test]
fn child_observers_fire_when_parent_changes() {
    let store = app_store();
    let title = store.scope_state(|state: &AppState| state.title.clone());
    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    let _subscription = title.observe(move |_| counter.set(counter.get() + 1));

    store.send(AppAction::Rename("renamed".into()));
    assert_eq!(title.state(), "renamed");
    assert_eq!(seen.get(), 1);
}

#[test]
fn nested_scopes_forward_to_the_root() {
    let store = app_store();
    let middle = store.scope_state(|state: &AppState| state.counters.clone());
    let leaf = middle.scope(
        |counters: &IdentifiedVec<Counter>| counters[&3].count,
        |action| AppAction::Counter(3, action),
    );

    leaf.send(CounterAction::Increment);

    assert_eq!(leaf.state(), 1);
    assert_eq!(middle.state()[&3].count, 1);
    assert_eq!(store.state().counters[&3].count, 1);
}

#[test]
fn optional_scope_exists_only_while_state_is_present() {
    let store = app_store();
    assert!(store
        .scope_optional(|state: &AppState| state.detail.clone(), AppAction::Detail)
        .is_none());

    store.send(AppAction::ShowDetail(2));
    let detail = store
        .scope_optional(|state: &AppState| state.detail.clone(), AppAction::Detail)
        .expect("detail is shown");

    detail.send(CounterAction::Increment);
    assert_eq!(detail.state().count, 1);

    store.send(AppAction::HideDetail);
    assert_eq!(store.state().detail, None);
    assert_eq!(detail.state(), Counter { id: 2, count: 1 });
}

#[test]
fn scope_each_creates_one_store_per_element() {
    let store = app_store();
    let children = store.scope_each(|state: &AppState| &state.counters, AppAction::Counter);
    assert_eq!(children.len(), 3);

    children[1].send(CounterAction::Increment);
    assert_eq!(children[1].state(), Counter { id: 2, count: 1 });
    assert_eq!(store.state().counters[&2].count, 1);
    assert_eq!(children[0].state().count, 0);

    store.send(AppAction::RemoveCounter(2));
    assert_eq!(store.state().counters.len(), 2);
    assert_eq!(children[1].state(), Counter { id: 2, count: 1 });
}

#[test]
fn releasing_a_child_leaves_the_parent_intact() {
    let store = app_store();
    let child = store.scope_state(|state: &AppState| state.title.clone());
    drop(child);

    store.send(AppAction::Rename("still here".into()));
    assert_eq!(store.state().title, "still here");
}

#[test]
fn child_keeps_its_parent_alive() {
    let child = {
        let store = app_store();
        store.scope(
            |state: &AppState| state.counters[&1].count,
            |action| AppAction::Counter(1, action),
        )
    };

    child.send(CounterAction::Increment);
    assert_eq!(child.state(), 1);
}

#[test]
fn parent_observer_can_read_a_child_while_it_forwards() {
    let store = app_store();
    let child = store.scope(
        |state: &AppState| state.counters[&1].count,
        |action| AppAction::Counter(1, action),
    );

    let seen = Rc::new(RefCell::new(Vec::new()));
    let watched = Rc::new(RefCell::new(Some(child.clone())));
    let _subscription = {
        let seen = Rc::clone(&seen);
        let watched = Rc::clone(&watched);
        store.observe(move |_: &AppState| {
            if let Some(child) = watched.borrow().as_ref() {
                seen.borrow_mut().push(child.state());
                seen.borrow_mut().push(child.with_state(|count| *count));
            }
        })
    };

    child.send(CounterAction::Increment);

    assert_eq!(*seen.borrow(), [0, 0]);
    assert_eq!(child.state(), 1);
    assert_eq!(store.state().counters[&1].count, 1);
    watched.borrow_mut().take();
}

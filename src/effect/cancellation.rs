//! Cancellation keys, the per-store registry of in-flight effects, and the
//! `cancellable` / `cancel` combinators.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::time::Duration;

use super::subscriber::{Cancellable, Subscriber};
use super::Effect;

/// Type-erased cancellation key.
///
/// Any `Hash + Eq + Debug + 'static` value can identify an effect. Two
/// keys are equal only when they have the same concrete type and compare
/// equal as that type.
#[derive(Clone)]
pub struct EffectId(Rc<dyn ErasedKey>);

trait ErasedKey {
    fn as_any(&self) -> &dyn Any;
    fn key_eq(&self, other: &dyn ErasedKey) -> bool;
    fn key_hash(&self, state: &mut dyn Hasher);
    fn key_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<K: Hash + Eq + fmt::Debug + 'static> ErasedKey for K {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key_eq(&self, other: &dyn ErasedKey) -> bool {
        other
            .as_any()
            .downcast_ref::<K>()
            .is_some_and(|other| other == self)
    }

    fn key_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    fn key_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl EffectId {
    pub fn new<K: Hash + Eq + fmt::Debug + 'static>(key: K) -> Self {
        if let Some(id) = (&key as &dyn Any).downcast_ref::<EffectId>() {
            return id.clone();
        }
        Self(Rc::new(key))
    }
}

impl PartialEq for EffectId {
    fn eq(&self, other: &Self) -> bool {
        self.0.key_eq(other.0.as_ref())
    }
}

impl Eq for EffectId {}

impl Hash for EffectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_any().type_id().hash(state);
        self.0.key_hash(state);
    }
}

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EffectId(")?;
        self.0.key_fmt(f)?;
        f.write_str(")")
    }
}

/// Registry of live subscriptions keyed by [`EffectId`].
///
/// Several subscriptions may share one key unless they were started with
/// cancel-in-flight, in which case the previous ones are cancelled first.
#[derive(Default)]
pub struct CancellationRegistry {
    entries: RefCell<HashMap<EffectId, Vec<(u64, Cancellable)>>>,
    next_token: Cell<u64>,
}

impl CancellationRegistry {
    fn register(&self, id: EffectId, handle: Cancellable) -> u64 {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        tracing::trace!(target: "unidirect::effect", id = ?id, token, "registered cancellable effect");
        self.entries.borrow_mut().entry(id).or_default().push((token, handle));
        token
    }

    fn deregister(&self, id: &EffectId, token: u64) {
        let mut entries = self.entries.borrow_mut();
        let now_empty = match entries.get_mut(id) {
            Some(handles) => {
                handles.retain(|(t, _)| *t != token);
                handles.is_empty()
            }
            None => false,
        };
        if now_empty {
            entries.remove(id);
        }
    }

    /// Cancel every live subscription registered under `id`.
    ///
    /// Returns the number of subscriptions cancelled; zero when nothing
    /// is registered.
    pub fn cancel(&self, id: &EffectId) -> usize {
        let handles = self.entries.borrow_mut().remove(id).unwrap_or_default();
        if !handles.is_empty() {
            tracing::trace!(target: "unidirect::effect", id = ?id, count = handles.len(), "cancelling effects");
        }
        let count = handles.len();
        for (_, handle) in handles {
            handle.cancel();
        }
        count
    }

    pub fn is_active(&self, id: &EffectId) -> bool {
        self.entries.borrow().contains_key(id)
    }

    /// Number of live registered subscriptions across all keys.
    pub fn active_count(&self) -> usize {
        self.entries.borrow().values().map(Vec::len).sum()
    }
}

/// Bookkeeping for one throttle key.
pub(crate) struct ThrottleSlot {
    pub(crate) last_emission: Duration,
    pub(crate) retained: Option<Box<dyn Any>>,
    /// Set when the effect holding `retained` was cancelled before its
    /// window closed.
    pub(crate) orphaned_at: Option<Duration>,
}

/// Per-store state shared by all effects a store runs: the cancellation
/// registry and the throttle table.
#[derive(Clone, Default)]
pub struct EffectContext {
    inner: Rc<ContextInner>,
}

#[derive(Default)]
struct ContextInner {
    registry: CancellationRegistry,
    throttles: RefCell<HashMap<EffectId, ThrottleSlot>>,
}

impl EffectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.inner.registry
    }

    pub(crate) fn throttles(&self) -> &RefCell<HashMap<EffectId, ThrottleSlot>> {
        &self.inner.throttles
    }

    fn downgrade(&self) -> Weak<ContextInner> {
        Rc::downgrade(&self.inner)
    }
}

impl fmt::Debug for EffectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectContext")
            .field("active_effects", &self.inner.registry.active_count())
            .finish()
    }
}

impl<T: 'static> Effect<T> {
    /// Register this effect's subscription under `id`.
    ///
    /// With `cancel_in_flight`, any subscription already registered under
    /// `id` is cancelled before this one starts. A subscription cancelled
    /// through the registry simply completes without further output.
    pub fn cancellable<K>(self, id: K, cancel_in_flight: bool) -> Self
    where
        K: Hash + Eq + fmt::Debug + 'static,
    {
        let id = EffectId::new(id);
        if self.is_none() {
            return if cancel_in_flight {
                Effect::cancel(id)
            } else {
                self
            };
        }

        let registered = {
            let id = id.clone();
            Effect::from_publisher(move |downstream: Subscriber<T>| {
                register_subscription(self, id, downstream)
            })
        };

        if cancel_in_flight {
            Effect::concatenate([Effect::cancel(id), registered])
        } else {
            registered
        }
    }

    /// An effect that cancels every live subscription under `id` and
    /// completes immediately. Harmless when nothing is registered.
    pub fn cancel<K>(id: K) -> Self
    where
        K: Hash + Eq + fmt::Debug + 'static,
    {
        let id = EffectId::new(id);
        Effect::from_publisher(move |downstream: Subscriber<T>| {
            downstream.context().registry().cancel(&id);
            downstream.complete();
            Cancellable::empty()
        })
    }

    /// Cancel several keys at once.
    pub fn cancel_all<K, I>(ids: I) -> Self
    where
        K: Hash + Eq + fmt::Debug + 'static,
        I: IntoIterator<Item = K>,
    {
        Self::merge(ids.into_iter().map(Self::cancel))
    }
}

fn register_subscription<T: 'static>(
    effect: Effect<T>,
    id: EffectId,
    downstream: Subscriber<T>,
) -> Cancellable {
    let context = downstream.context().clone();
    let weak_context = context.downgrade();
    let upstream_slot: Rc<RefCell<Option<Cancellable>>> = Rc::new(RefCell::new(None));
    let token_slot: Rc<Cell<Option<u64>>> = Rc::new(Cell::new(None));

    let entry = {
        let upstream_slot = Rc::clone(&upstream_slot);
        let token_slot = Rc::clone(&token_slot);
        let weak_context = weak_context.clone();
        let id = id.clone();
        let downstream = downstream.clone();
        Cancellable::new(move || {
            let upstream = upstream_slot.borrow_mut().take();
            if let Some(upstream) = upstream {
                upstream.cancel();
            }
            if let (Some(context), Some(token)) = (weak_context.upgrade(), token_slot.take()) {
                context.registry.deregister(&id, token);
            }
            downstream.complete_if_live();
        })
    };

    let token = context.registry().register(id.clone(), entry.clone());
    token_slot.set(Some(token));

    let forward = {
        let output = downstream.clone();
        let token_slot = Rc::clone(&token_slot);
        Subscriber::new(
            context.clone(),
            move |value| output.send(value),
            move || {
                if let (Some(context), Some(token)) = (weak_context.upgrade(), token_slot.take()) {
                    context.registry.deregister(&id, token);
                }
                downstream.complete();
            },
        )
    };

    let upstream = effect.subscribe(forward);
    if entry.is_cancelled() {
        upstream.cancel();
    } else {
        *upstream_slot.borrow_mut() = Some(upstream);
    }
    entry
}

//! Unidirectional state management.
//!
//! Application logic is written as [`Reducer`]s: functions that mutate
//! state in response to actions and return [`Effect`]s describing the
//! asynchronous work to run next. A [`Store`] owns the state, runs one
//! reducer call at a time, subscribes to the returned effects and feeds
//! their outputs back in as actions.
//!
//! ```
//! use unidirect::{Effect, Reduce, Store};
//!
//! #[derive(Debug, Clone)]
//! enum Action { Increment, Double }
//!
//! let reducer = Reduce::new(|count: &mut i32, action: Action, _: &()| match action {
//!     Action::Increment => {
//!         *count += 1;
//!         Effect::value(Action::Double)
//!     }
//!     Action::Double => {
//!         *count *= 2;
//!         Effect::none()
//!     }
//! });
//!
//! let store = Store::new(1, reducer, ());
//! store.send(Action::Increment);
//! assert_eq!(store.state(), 4);
//! ```

pub mod config;
pub mod effect;
pub mod identified;
pub mod reducer;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod testing;
pub mod text;

pub use config::{ConfigError, Settings, StoreConfig};
pub use effect::{Cancellable, Effect, EffectContext, EffectId, EffectSender, Subscriber};
pub use identified::{Identifiable, IdentifiedVec};
pub use reducer::{CasePath, Reduce, Reducer};
pub use scheduler::{ImmediateScheduler, Scheduler, TestScheduler, TokioScheduler};
pub use store::{StateSubscription, Store};
pub use testing::TestStore;
pub use text::TextState;

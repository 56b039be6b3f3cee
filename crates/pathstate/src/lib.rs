#![forbid(unsafe_code)]

//! Path-addressed reactive state container.
//!
//! A small in-memory state tree addressed by dot-delimited paths, with
//! atomic multi-path writes, synchronous change notification, and
//! per-tick batching of "path missing" signals. State is a persistent
//! tree: every write produces a new snapshot and old snapshots stay
//! valid forever, which makes history and rollback layers trivial to
//! build on top.
//!
//! # Quick start
//!
//! ```
//! use pathstate::prelude::*;
//!
//! let store = PathStore::builder()
//!     .initial_state(Value::from_entries([(
//!         "counter",
//!         Value::from_entries([("current", 0)]),
//!     )]))
//!     .build();
//!
//! store.subscribe(std::rc::Rc::new(
//!     |_store: &PathStore, changed: &ChangedPaths| {
//!         println!("changed: {changed}");
//!     },
//! ));
//!
//! assert_eq!(store.get(&path!("counter.current")), Some(Value::Int(0)));
//! store.set_path(path!("counter.current"), 1);
//! assert_eq!(store.get(&path!("counter.current")), Some(Value::Int(1)));
//! ```
//!
//! # Feature flags
//!
//! - `serde`: `Serialize`/`Deserialize` for [`Value`].
//! - `console`: the `StoreConsole` debug adapter (REPL-style writes,
//!   snapshot-history rollback).

pub use pathstate_core::{Path, PathError, Value, path};
pub use pathstate_store::{
    ChangeListener, ChangedPaths, FRAME_INTERVAL, ManualScheduler, MissingPathAggregator,
    MissingPathHook, MissingPathsHandler, PathStore, ScheduledCallback, Scheduler, StoreBuilder,
    TimerScheduler, WeakPathStore,
};

#[cfg(feature = "console")]
pub use pathstate_store::{ConsoleError, StoreConsole};

/// Everything most callers need.
pub mod prelude {
    pub use pathstate_core::{Path, Value, path};
    pub use pathstate_store::{
        ChangedPaths, MissingPathAggregator, PathStore, Scheduler, TimerScheduler,
    };
}

#![forbid(unsafe_code)]

//! Path-addressed reactive state store for pathstate.
//!
//! This crate provides the runtime pieces on top of
//! [`pathstate_core`]'s path and tree types:
//!
//! - [`PathStore`]: owns the current state tree, exposes path get/set
//!   with atomic multi-path updates, and fans out change notifications
//!   to subscribers synchronously.
//! - [`ChangedPaths`]: the insertion-ordered path→value mapping produced
//!   by one write call and passed verbatim to every listener.
//! - [`MissingPathAggregator`]: coalesces "path absent" signals raised
//!   by reads within one scheduling tick into a single deduplicated
//!   delivery.
//! - [`Scheduler`]: the single-operation deferral capability the
//!   aggregator schedules its flush on, with a timer-backed default
//!   ([`TimerScheduler`]) and a deterministic test pump
//!   ([`ManualScheduler`]).
//! - `StoreConsole` (feature `console`): an explicit debug adapter with
//!   REPL-style writes and snapshot-history rollback.
//!
//! # Architecture
//!
//! Everything is single-threaded and cooperative. `PathStore` and
//! `MissingPathAggregator` are cheap `Clone` handles over
//! `Rc<RefCell<..>>` state; all operations run to completion without
//! suspension. The one deferred element, the aggregator's flush, runs
//! on a later tick of the same event loop when the host pumps its
//! scheduler, never concurrently with store operations. Scheduled
//! flushes hold only weak references, so tearing down the store or the
//! aggregator silently invalidates anything still queued.
//!
//! # Invariants
//!
//! 1. State is never mutated in place: every write installs a new tree
//!    and any previously obtained snapshot stays valid and unchanged.
//! 2. The subscriber roster holds no duplicate listeners (`Rc`
//!    identity).
//! 3. A read that finds a present value never fires the missing-path
//!    hook.
//! 4. `set_paths` notifies subscribers exactly once per call, in
//!    subscription order, regardless of how many paths the call touched
//!    and regardless of whether any value actually changed.
//! 5. Within one notification pass no listener is invoked zero or two
//!    times due to concurrent subscribe/unsubscribe: additions wait for
//!    the next pass, removals take effect if they happen before the
//!    listener's turn.
//! 6. The aggregator delivers at most one batched callback per
//!    scheduling tick in which at least one miss occurred.

mod aggregator;
mod changed;
mod scheduler;
mod store;

#[cfg(feature = "console")]
mod console;

pub use aggregator::{MissingPathAggregator, MissingPathsHandler};
pub use changed::ChangedPaths;
pub use scheduler::{FRAME_INTERVAL, ManualScheduler, ScheduledCallback, Scheduler, TimerScheduler};
pub use store::{ChangeListener, MissingPathHook, PathStore, StoreBuilder, WeakPathStore};

#[cfg(feature = "console")]
pub use console::{ConsoleError, StoreConsole};

#![forbid(unsafe_code)]

//! Batching of missing-path reads into one delivery per tick.
//!
//! Reads that miss can happen many times within one tick, often for
//! the same path (several consumers deriving from the same absent
//! value). The consumer side, typically a fetch, is expensive, so
//! misses are buffered and delivered once: the first buffered miss
//! schedules a flush on the configured [`Scheduler`], later misses
//! just join the buffer, and the flush hands the consumer the distinct
//! paths in first-recorded order.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use pathstate_core::path;
//! use pathstate_store::{ManualScheduler, MissingPathAggregator, PathStore};
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let aggregator = MissingPathAggregator::new(scheduler.clone());
//! let store = PathStore::builder()
//!     .on_missing_path(aggregator.hook())
//!     .build();
//! aggregator.on_missing_paths(|_store, paths| {
//!     assert_eq!(paths.len(), 2);
//! });
//!
//! let _ = store.get(&path!("a"));
//! let _ = store.get(&path!("b"));
//! let _ = store.get(&path!("a"));
//! assert_eq!(scheduler.run_pending(), 1);
//! ```
//!
//! # Invariants
//!
//! 1. Exactly one flush is scheduled per cycle: scheduling happens on
//!    the transition from empty to non-empty pending, and a flush
//!    empties the buffer so the next miss starts a new cycle.
//! 2. Pending paths are distinct; delivery order is first-recorded
//!    order.
//! 3. A flush invokes the handler at most once; with no handler it is
//!    a no-op that still clears the buffer.
//! 4. A flush that fires after the aggregator or the store has been
//!    torn down does nothing; the scheduled closure holds only weak
//!    references.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use pathstate_core::Path;

use crate::scheduler::Scheduler;
use crate::store::{PathStore, WeakPathStore};

/// Consumer of one batched delivery: the store plus the distinct
/// missing paths recorded since the previous flush.
pub type MissingPathsHandler = Rc<dyn Fn(&PathStore, &[Path])>;

struct AggregatorInner {
    pending: Vec<Path>,
    handler: Option<MissingPathsHandler>,
}

/// Shared handle to a per-tick missing-path batcher.
pub struct MissingPathAggregator {
    inner: Rc<RefCell<AggregatorInner>>,
    scheduler: Rc<dyn Scheduler>,
}

impl Clone for MissingPathAggregator {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            scheduler: Rc::clone(&self.scheduler),
        }
    }
}

impl fmt::Debug for MissingPathAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MissingPathAggregator")
            .field("pending", &inner.pending.len())
            .field("has_handler", &inner.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl MissingPathAggregator {
    /// An aggregator flushing on `scheduler`, with no handler yet.
    #[must_use]
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(AggregatorInner {
                pending: Vec::new(),
                handler: None,
            })),
            scheduler,
        }
    }

    /// Register the batched-delivery consumer, replacing any previous
    /// one.
    pub fn on_missing_paths(&self, handler: impl Fn(&PathStore, &[Path]) + 'static) {
        self.inner.borrow_mut().handler = Some(Rc::new(handler));
    }

    /// Record one missed read.
    ///
    /// On the first miss of a cycle this schedules the flush, then the
    /// path joins the buffer (deduplicated). Duplicate misses within
    /// the cycle are absorbed silently.
    pub fn record(&self, store: &PathStore, path: &Path) {
        let starts_cycle = self.inner.borrow().pending.is_empty();
        if starts_cycle {
            let inner = Rc::downgrade(&self.inner);
            let store = store.downgrade();
            self.scheduler
                .schedule_once(Box::new(move || flush(&inner, &store)));
            tracing::trace!(path = %path, "first miss of cycle; flush scheduled");
        }

        let mut inner = self.inner.borrow_mut();
        if !inner.pending.contains(path) {
            inner.pending.push(path.clone());
        }
    }

    /// A hook closure feeding this aggregator, for
    /// [`StoreBuilder::on_missing_path`](crate::StoreBuilder::on_missing_path).
    #[must_use]
    pub fn hook(&self) -> impl Fn(&PathStore, &Path) + 'static {
        let aggregator = self.clone();
        move |store, path| aggregator.record(store, path)
    }

    /// Misses buffered in the current cycle.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.borrow().pending.len()
    }
}

/// One scheduled flush. Runs on a later tick; by then the aggregator
/// or the store may be gone, in which case there is nothing to do.
fn flush(inner: &Weak<RefCell<AggregatorInner>>, store: &WeakPathStore) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let (paths, handler) = {
        let mut inner = inner.borrow_mut();
        (std::mem::take(&mut inner.pending), inner.handler.clone())
    };
    let Some(store) = store.upgrade() else {
        tracing::trace!(dropped = paths.len(), "store gone before flush");
        return;
    };
    match handler {
        Some(handler) => {
            tracing::trace!(count = paths.len(), "delivering missing paths");
            handler(&store, &paths);
        }
        None => tracing::trace!(cleared = paths.len(), "flush without handler"),
    }
}

#![forbid(unsafe_code)]

//! The path-addressed store: snapshots, atomic writes, synchronous
//! notification.
//!
//! `PathStore` uses `Rc<RefCell<..>>` for single-threaded shared
//! ownership; handles are cheap to clone and all refer to the same
//! store. State is a persistent tree, so `state()` hands out an O(1)
//! snapshot that later writes can never touch, which is all a
//! history/rollback layer needs.
//!
//! # Usage
//!
//! ```
//! use pathstate_core::{Value, path};
//! use pathstate_store::PathStore;
//!
//! let store = PathStore::builder()
//!     .initial_state(Value::from_entries([(
//!         "counter",
//!         Value::from_entries([("current", 0)]),
//!     )]))
//!     .build();
//!
//! assert_eq!(store.get(&path!("counter.current")), Some(Value::Int(0)));
//! store.set_path(path!("counter.current"), 1);
//! assert_eq!(store.get(&path!("counter.current")), Some(Value::Int(1)));
//! ```
//!
//! # Invariants
//!
//! 1. Every write installs a new state tree; the previous tree is left
//!    intact for anyone still holding it.
//! 2. One `set_paths` call applies all its entries atomically and
//!    notifies each subscriber exactly once, in subscription order,
//!    with the exact change set that was passed in.
//! 3. Writes carry no equality check: re-setting a path to its current
//!    value still counts as a change and is reported.
//! 4. Subscribing an already registered listener is a no-op; listener
//!    identity is `Rc::ptr_eq`.
//! 5. During a notification pass, newly added listeners wait for the
//!    next pass and removed listeners are skipped if their turn has not
//!    come yet.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use pathstate_core::{Path, Value};

use crate::ChangedPaths;

/// Change listener: invoked synchronously after every committed write
/// with the store and the exact change set of that write.
pub type ChangeListener = Rc<dyn Fn(&PathStore, &ChangedPaths)>;

/// Hook fired synchronously when a read finds no value at a path.
pub type MissingPathHook = Rc<dyn Fn(&PathStore, &Path)>;

struct StoreInner {
    state: Value,
    listeners: Vec<ChangeListener>,
    on_missing_path: Option<MissingPathHook>,
}

/// Shared handle to a path-addressed state store.
pub struct PathStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl Clone for PathStore {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for PathStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("PathStore")
            .field("listeners", &inner.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for PathStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PathStore {
    /// A store over an empty tree with no missing-path hook.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a store.
    #[must_use]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// The current state tree as an O(1) structurally-shared snapshot.
    ///
    /// The returned value is immutable and detached: subsequent writes
    /// to the store never affect it.
    #[must_use]
    pub fn state(&self) -> Value {
        self.inner.borrow().state.clone()
    }

    /// Read the value at `path`.
    ///
    /// If present (including a stored `Value::Null`), returns it and
    /// fires nothing. If absent, fires the missing-path hook
    /// synchronously with `(store, path)` and returns `None`. A miss
    /// never mutates the store.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Value> {
        let found = self.inner.borrow().state.get_in(path.segments()).cloned();
        if found.is_none() {
            tracing::trace!(path = %path, "read missed");
            let hook = self.inner.borrow().on_missing_path.clone();
            if let Some(hook) = hook {
                hook(self, path);
            }
        }
        found
    }

    /// Read the value at `path`, substituting `default` on a miss.
    ///
    /// The default is ignored when the path is present; the
    /// missing-path hook still fires on a miss.
    #[must_use]
    pub fn get_or(&self, path: &Path, default: impl Into<Value>) -> Value {
        self.get(path).unwrap_or_else(|| default.into())
    }

    /// Assign one path. Sugar for a single-entry [`set_paths`].
    ///
    /// [`set_paths`]: PathStore::set_paths
    pub fn set_path(&self, path: Path, value: impl Into<Value>) {
        self.set_paths(ChangedPaths::new().with(path, value));
    }

    /// Apply every entry of `changed` as one atomic update, then notify
    /// every subscriber once with the exact change set.
    ///
    /// Entries are applied in insertion order; missing intermediate
    /// nodes are created, never an error. There is no equality
    /// short-circuit: the call notifies even when every assigned value
    /// equals what was already stored.
    pub fn set_paths(&self, changed: ChangedPaths) {
        {
            let mut inner = self.inner.borrow_mut();
            let mut state = inner.state.clone();
            for (path, value) in changed.iter() {
                state = state.set_in(path.segments(), value.clone());
            }
            inner.state = state;
        }
        tracing::debug!(paths = %changed, count = changed.len(), "state updated");
        self.notify(&changed);
    }

    /// Replace the whole state tree and notify all subscribers with an
    /// empty change set.
    ///
    /// This is the supported entry point for external rollback layers.
    /// Listeners must treat an empty change set as "state may have
    /// changed arbitrarily" and re-derive whatever they depend on.
    pub fn replace_state(&self, state: Value) {
        self.inner.borrow_mut().state = state;
        tracing::debug!("state replaced wholesale");
        self.notify(&ChangedPaths::new());
    }

    /// Register `listener` unless an identical (`Rc::ptr_eq`)
    /// registration already exists.
    pub fn subscribe(&self, listener: ChangeListener) {
        let mut inner = self.inner.borrow_mut();
        if !inner.listeners.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            inner.listeners.push(listener);
        }
    }

    /// Remove the registration matching `listener`, if any.
    pub fn unsubscribe(&self, listener: &ChangeListener) {
        let mut inner = self.inner.borrow_mut();
        if let Some(index) = inner
            .listeners
            .iter()
            .position(|l| Rc::ptr_eq(l, listener))
        {
            inner.listeners.remove(index);
        }
    }

    /// A weak handle that does not keep the store alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakPathStore {
        WeakPathStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// One notification pass over the roster as it stood at pass start.
    ///
    /// Listeners registered mid-pass are not in the snapshot and wait
    /// for the next pass; listeners removed mid-pass are skipped via
    /// the membership re-check before each invocation. No borrow is
    /// held while a listener runs, so listeners may freely call back
    /// into the store (including reentrant writes, which run a
    /// complete nested pass).
    fn notify(&self, changed: &ChangedPaths) {
        let roster: Vec<ChangeListener> = self.inner.borrow().listeners.clone();
        tracing::trace!(listeners = roster.len(), "notifying subscribers");
        for listener in roster {
            let registered = self
                .inner
                .borrow()
                .listeners
                .iter()
                .any(|l| Rc::ptr_eq(l, &listener));
            if registered {
                listener(self, changed);
            }
        }
    }
}

/// Weak counterpart to [`PathStore`], for liveness guards in deferred
/// callbacks.
#[derive(Clone)]
pub struct WeakPathStore {
    inner: Weak<RefCell<StoreInner>>,
}

impl WeakPathStore {
    /// Upgrade back to a strong handle if the store is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<PathStore> {
        self.inner.upgrade().map(|inner| PathStore { inner })
    }
}

impl fmt::Debug for WeakPathStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPathStore").finish()
    }
}

/// Configuration for a [`PathStore`].
///
/// Recognized options are the initial state (default: empty tree) and
/// the missing-path hook (default: none). Debug instrumentation is not
/// a store option; attach a `StoreConsole` explicitly instead.
pub struct StoreBuilder {
    initial_state: Value,
    on_missing_path: Option<MissingPathHook>,
}

impl StoreBuilder {
    /// A builder with the defaults: empty tree, no hook.
    #[must_use]
    pub fn new() -> Self {
        Self {
            initial_state: Value::empty_map(),
            on_missing_path: None,
        }
    }

    /// Set the initial state tree.
    #[must_use]
    pub fn initial_state(mut self, state: impl Into<Value>) -> Self {
        self.initial_state = state.into();
        self
    }

    /// Set the hook fired synchronously on every missed read.
    #[must_use]
    pub fn on_missing_path(mut self, hook: impl Fn(&PathStore, &Path) + 'static) -> Self {
        self.on_missing_path = Some(Rc::new(hook));
        self
    }

    /// Build the store.
    #[must_use]
    pub fn build(self) -> PathStore {
        PathStore {
            inner: Rc::new(RefCell::new(StoreInner {
                state: self.initial_state,
                listeners: Vec::new(),
                on_missing_path: self.on_missing_path,
            })),
        }
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBuilder")
            .field("has_missing_path_hook", &self.on_missing_path.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathstate_core::path;
    use std::cell::Cell;

    fn counting_listener(count: &Rc<Cell<usize>>) -> ChangeListener {
        let count = Rc::clone(count);
        Rc::new(move |_: &PathStore, _: &ChangedPaths| count.set(count.get() + 1))
    }

    fn seeded_store() -> PathStore {
        PathStore::builder()
            .initial_state(Value::from_entries([(
                "user",
                Value::from_entries([("name", "black bart")]),
            )]))
            .build()
    }

    // ---- get ----

    #[test]
    fn get_returns_initialized_path() {
        let store = seeded_store();
        assert_eq!(
            store.get(&path!("user.name")),
            Some(Value::Str("black bart".into()))
        );
    }

    #[test]
    fn get_returns_none_for_uninitialized_path() {
        let store = seeded_store();
        assert_eq!(store.get(&path!("user.phone")), None);
    }

    #[test]
    fn get_or_substitutes_default_on_miss() {
        let store = seeded_store();
        assert_eq!(
            store.get_or(&path!("user.phone"), "555-555-5555"),
            Value::Str("555-555-5555".into())
        );
    }

    #[test]
    fn get_or_ignores_default_when_present() {
        let store = seeded_store();
        assert_eq!(
            store.get_or(&path!("user.name"), "fallback"),
            Value::Str("black bart".into())
        );
    }

    #[test]
    fn miss_fires_hook_exactly_once_with_path() {
        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let store = PathStore::builder()
            .on_missing_path({
                let seen = Rc::clone(&seen);
                move |_store, path| seen.borrow_mut().push(path.to_string())
            })
            .build();

        assert_eq!(store.get(&path!("missing.x")), None);
        assert_eq!(&*seen.borrow(), &["missing.x"]);
    }

    #[test]
    fn present_value_never_fires_hook() {
        let fired = Rc::new(Cell::new(false));
        let store = PathStore::builder()
            .initial_state(Value::from_entries([("present", Value::Null)]))
            .on_missing_path({
                let fired = Rc::clone(&fired);
                move |_store, _path| fired.set(true)
            })
            .build();

        // A stored null is present; only truly absent keys miss.
        assert_eq!(store.get(&path!("present")), Some(Value::Null));
        assert!(!fired.get(), "hook must not fire for a present value");
    }

    #[test]
    fn miss_does_not_mutate_store() {
        let store = seeded_store();
        let before = store.state();
        let _ = store.get(&path!("user.phone"));
        assert_eq!(store.state(), before);
    }

    // ---- set ----

    #[test]
    fn set_path_round_trips() {
        let store = seeded_store();
        store.set_path(path!("user.name"), "Malicious Marge");
        assert_eq!(
            store.get(&path!("user.name")),
            Some(Value::Str("Malicious Marge".into()))
        );
    }

    #[test]
    fn set_path_creates_intermediates() {
        let store = seeded_store();
        store.set_path(path!("user.preference.phone"), "555-555-5555");
        assert_eq!(
            store.get(&path!("user.preference.phone")),
            Some(Value::Str("555-555-5555".into()))
        );
    }

    #[test]
    fn set_paths_applies_all_entries_atomically() {
        let store = seeded_store();
        let count = Rc::new(Cell::new(0));
        store.subscribe(counting_listener(&count));

        store.set_paths(
            ChangedPaths::new()
                .with(path!("a"), 1)
                .with(path!("b"), 2),
        );

        assert_eq!(count.get(), 1, "one listener invocation per call");
        assert_eq!(store.get(&path!("a")), Some(Value::Int(1)));
        assert_eq!(store.get(&path!("b")), Some(Value::Int(2)));
    }

    #[test]
    fn listeners_receive_exact_change_set() {
        let store = seeded_store();
        let seen: Rc<RefCell<Option<ChangedPaths>>> = Rc::new(RefCell::new(None));
        store.subscribe(Rc::new({
            let seen = Rc::clone(&seen);
            move |_store: &PathStore, changed: &ChangedPaths| {
                *seen.borrow_mut() = Some(changed.clone());
            }
        }));

        let changed = ChangedPaths::new().with(path!("a"), 1).with(path!("b"), 2);
        store.set_paths(changed.clone());
        assert_eq!(seen.borrow().as_ref(), Some(&changed));
    }

    #[test]
    fn notifies_when_value_unchanged() {
        let store = seeded_store();
        let count = Rc::new(Cell::new(0));
        store.subscribe(counting_listener(&count));

        store.set_path(path!("user.name"), "black bart");
        store.set_path(path!("user.name"), "black bart");

        assert_eq!(
            count.get(),
            2,
            "re-setting an identical value must still notify"
        );
    }

    #[test]
    fn snapshot_survives_later_writes() {
        let store = seeded_store();
        let snapshot = store.state();
        store.set_path(path!("user.name"), "Malicious Marge");

        assert_eq!(
            snapshot.get_in(&["user".into(), "name".into()]),
            Some(&Value::Str("black bart".into())),
            "retained snapshot must not observe the write"
        );
    }

    // ---- subscribe / unsubscribe ----

    #[test]
    fn unsubscribed_listener_is_not_notified() {
        let store = seeded_store();
        let count = Rc::new(Cell::new(0));
        let listener = counting_listener(&count);

        store.subscribe(Rc::clone(&listener));
        store.unsubscribe(&listener);
        store.set_path(path!("x"), 1);

        assert_eq!(count.get(), 0);
    }

    #[test]
    fn double_subscribe_registers_once() {
        let store = seeded_store();
        let count = Rc::new(Cell::new(0));
        let listener = counting_listener(&count);

        store.subscribe(Rc::clone(&listener));
        store.subscribe(Rc::clone(&listener));
        store.set_path(path!("x"), 1);

        assert_eq!(count.get(), 1, "duplicate registration must not double-fire");
    }

    #[test]
    fn unsubscribe_unknown_listener_is_noop() {
        let store = seeded_store();
        let count = Rc::new(Cell::new(0));
        let registered = counting_listener(&count);
        let stranger = counting_listener(&count);

        store.subscribe(Rc::clone(&registered));
        store.unsubscribe(&stranger);
        store.set_path(path!("x"), 1);

        assert_eq!(count.get(), 1, "registered listener must survive");
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let store = seeded_store();
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            store.subscribe(Rc::new(move |_: &PathStore, _: &ChangedPaths| {
                order.borrow_mut().push(name);
            }));
        }

        store.set_path(path!("x"), 1);
        assert_eq!(&*order.borrow(), &["first", "second", "third"]);
    }

    // ---- mid-pass roster changes ----

    #[test]
    fn listener_added_mid_pass_waits_for_next_pass() {
        let store = seeded_store();
        let late_count = Rc::new(Cell::new(0));
        let late = counting_listener(&late_count);

        store.subscribe(Rc::new({
            let store_handle = store.clone();
            let late = Rc::clone(&late);
            move |_: &PathStore, _: &ChangedPaths| {
                store_handle.subscribe(Rc::clone(&late));
            }
        }));

        store.set_path(path!("x"), 1);
        assert_eq!(late_count.get(), 0, "added mid-pass: not invoked this pass");

        store.set_path(path!("x"), 2);
        assert_eq!(late_count.get(), 1, "invoked on the following pass");
    }

    #[test]
    fn listener_removed_mid_pass_is_skipped() {
        let store = seeded_store();
        let victim_count = Rc::new(Cell::new(0));
        let victim = counting_listener(&victim_count);

        // Subscribed first: removes the victim before its turn.
        store.subscribe(Rc::new({
            let store_handle = store.clone();
            let victim = Rc::clone(&victim);
            move |_: &PathStore, _: &ChangedPaths| {
                store_handle.unsubscribe(&victim);
            }
        }));
        store.subscribe(Rc::clone(&victim));

        store.set_path(path!("x"), 1);
        assert_eq!(
            victim_count.get(),
            0,
            "removed before its turn: must be skipped"
        );
    }

    #[test]
    fn listener_removed_after_its_turn_still_ran_once() {
        let store = seeded_store();
        let victim_count = Rc::new(Cell::new(0));
        let victim = counting_listener(&victim_count);

        // Victim runs first, then the second listener removes it.
        store.subscribe(Rc::clone(&victim));
        store.subscribe(Rc::new({
            let store_handle = store.clone();
            let victim = Rc::clone(&victim);
            move |_: &PathStore, _: &ChangedPaths| {
                store_handle.unsubscribe(&victim);
            }
        }));

        store.set_path(path!("x"), 1);
        assert_eq!(victim_count.get(), 1, "already ran this pass: exactly once");

        store.set_path(path!("x"), 2);
        assert_eq!(victim_count.get(), 1, "gone on later passes");
    }

    // ---- replace_state ----

    #[test]
    fn replace_state_notifies_with_empty_change_set() {
        let store = seeded_store();
        let sizes: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        store.subscribe(Rc::new({
            let sizes = Rc::clone(&sizes);
            move |_: &PathStore, changed: &ChangedPaths| {
                sizes.borrow_mut().push(changed.len());
            }
        }));

        store.replace_state(Value::empty_map());

        assert_eq!(&*sizes.borrow(), &[0]);
        assert_eq!(store.get_or(&path!("user.name"), "gone"), Value::Str("gone".into()));
    }
}

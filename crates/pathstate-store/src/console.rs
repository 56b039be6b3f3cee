//! REPL-flavored debug adapter over a store.
//!
//! `StoreConsole` is the explicit replacement for ambient debug
//! globals: the caller constructs it with a store handle and gets a
//! textual command surface plus a retained snapshot history. Because
//! state trees are persistent, keeping every snapshot costs only the
//! ancestor chains that writes actually rebuilt.
//!
//! Commands mirror what a developer types at a debug prompt:
//!
//! - [`set_path`](StoreConsole::set_path) applies a write parsed from
//!   JSON text and returns the resulting state as plain JSON.
//! - [`reset_state`](StoreConsole::reset_state) restores a history
//!   entry by index; listeners are re-notified with an empty change
//!   set ("re-derive everything").
//!
//! All output goes through `tracing` at debug level: one line per
//! store change (path list truncated to 80 characters) and one with
//! the elapsed time of each console-issued write.
//!
//! # Invariants
//!
//! 1. History holds the initial state plus one snapshot per non-empty
//!    notification, in commit order. Rollbacks (empty change sets) are
//!    not recorded, so restoring never grows the history.
//! 2. `reset_state` with an out-of-range index fails and leaves both
//!    the store and the history untouched.
//! 3. Dropping the console unsubscribes its recorder; the store side
//!    keeps working undisturbed.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use pathstate_core::{Path, PathError, Value};
use web_time::Instant;

use crate::changed::ChangedPaths;
use crate::store::{ChangeListener, PathStore};

/// Longest path list printed per change before truncation.
const PATH_DISPLAY_LIMIT: usize = 80;

/// Errors from console commands.
#[derive(Debug)]
pub enum ConsoleError {
    /// The path argument did not parse.
    Path(PathError),
    /// The value argument was not valid JSON.
    InvalidJson(String),
    /// `reset_state` index outside the retained history.
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Current history length.
        len: usize,
    },
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(err) => write!(f, "invalid path: {err}"),
            Self::InvalidJson(msg) => write!(f, "invalid JSON value: {msg}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "invalid state index: {index} (history has {len} entries)")
            }
        }
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Path(err) => Some(err),
            _ => None,
        }
    }
}

/// Debug adapter: command surface plus snapshot history.
pub struct StoreConsole {
    store: PathStore,
    history: Rc<RefCell<Vec<Value>>>,
    recorder: ChangeListener,
}

impl StoreConsole {
    /// Attach a console to `store`, retaining the current state as
    /// history entry 0 and recording every subsequent write.
    #[must_use]
    pub fn attach(store: &PathStore) -> Self {
        let history = Rc::new(RefCell::new(vec![store.state()]));
        let recorder: ChangeListener = Rc::new({
            let history = Rc::clone(&history);
            move |store: &PathStore, changed: &ChangedPaths| {
                // Empty change sets are wholesale replacements
                // (rollbacks); only real writes extend the history.
                if changed.is_empty() {
                    return;
                }
                let mut history = history.borrow_mut();
                let index = history.len();
                history.push(store.state());
                tracing::debug!(
                    index,
                    paths = %truncate(&changed.to_string()),
                    "store changed"
                );
            }
        });
        store.subscribe(Rc::clone(&recorder));
        tracing::debug!("console attached; initial state retained as entry 0");
        Self {
            store: store.clone(),
            history,
            recorder,
        }
    }

    /// Apply a write parsed from JSON text and return the resulting
    /// state as plain JSON.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::Path`] when `path` does not parse,
    /// [`ConsoleError::InvalidJson`] when `json` is not a valid JSON
    /// value. The store is untouched on error.
    pub fn set_path(&self, path: &str, json: &str) -> Result<serde_json::Value, ConsoleError> {
        let path: Path = path.parse().map_err(ConsoleError::Path)?;
        let value: Value =
            serde_json::from_str(json).map_err(|err| ConsoleError::InvalidJson(err.to_string()))?;

        let started = Instant::now();
        self.store.set_path(path.clone(), value);
        tracing::debug!(path = %path, elapsed = ?started.elapsed(), "console write");

        Ok(self.snapshot())
    }

    /// Restore the state retained at `index` and return it as plain
    /// JSON. Listeners are re-notified with an empty change set.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::IndexOutOfRange`] when `index` is outside the
    /// history; the store is left unmodified.
    pub fn reset_state(&self, index: usize) -> Result<serde_json::Value, ConsoleError> {
        let snapshot = {
            let history = self.history.borrow();
            history
                .get(index)
                .cloned()
                .ok_or(ConsoleError::IndexOutOfRange {
                    index,
                    len: history.len(),
                })?
        };
        self.store.replace_state(snapshot);
        tracing::debug!(index, "state restored from history");
        Ok(self.snapshot())
    }

    /// Number of retained snapshots (initial state included).
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }

    /// The store's current state as plain JSON.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self.store.state())
            .expect("state trees always serialize to JSON")
    }
}

impl Drop for StoreConsole {
    fn drop(&mut self) {
        self.store.unsubscribe(&self.recorder);
    }
}

impl fmt::Debug for StoreConsole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConsole")
            .field("history_len", &self.history.borrow().len())
            .finish_non_exhaustive()
    }
}

fn truncate(display: &str) -> String {
    if display.len() > PATH_DISPLAY_LIMIT {
        let cut = display
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= PATH_DISPLAY_LIMIT - 3)
            .last()
            .unwrap_or(0);
        format!("{}...", &display[..cut])
    } else {
        display.to_owned()
    }
}

//! The path→value mapping carried by one notification.

use std::fmt;

use pathstate_core::{Path, Value};

/// Insertion-ordered mapping from [`Path`] to newly assigned value.
///
/// Produced by one `set_paths` invocation and passed verbatim, as the
/// same borrow, to every listener of that notification pass.
/// Re-inserting a path overwrites its value but keeps the original
/// position. An *empty* change set has a reserved meaning for
/// listeners: the state may have been replaced wholesale (rollback),
/// so everything should be re-derived.
///
/// # Example
///
/// ```
/// use pathstate_core::path;
/// use pathstate_store::ChangedPaths;
///
/// let changed = ChangedPaths::new()
///     .with(path!("user.name"), "Malicious Marge")
///     .with(path!("user.phone"), "555-555-5555");
/// assert_eq!(changed.len(), 2);
/// assert_eq!(changed.to_string(), "user.name, user.phone");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangedPaths {
    entries: Vec<(Path, Value)>,
}

impl ChangedPaths {
    /// An empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, path: Path, value: impl Into<Value>) -> Self {
        self.insert(path, value);
        self
    }

    /// Insert an entry, overwriting the value (but keeping the
    /// position) of an already present path.
    pub fn insert(&mut self, path: Path, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((path, value)),
        }
    }

    /// The value recorded for `path`, if any.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, value)| value)
    }

    /// Number of distinct paths in the change set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the change set is empty (the wholesale-replacement
    /// marker).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Value)> {
        self.entries.iter().map(|(path, value)| (path, value))
    }

    /// Paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(path, _)| path)
    }
}

impl fmt::Display for ChangedPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for path in self.paths() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{path}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<(Path, Value)> for ChangedPaths {
    fn from_iter<I: IntoIterator<Item = (Path, Value)>>(iter: I) -> Self {
        let mut changed = Self::new();
        for (path, value) in iter {
            changed.insert(path, value);
        }
        changed
    }
}

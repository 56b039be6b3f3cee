//! Dot-delimited addressing into the state tree.
//!
//! A [`Path`] decomposes `"user.profile.name"` into an ordered sequence
//! of segment keys. Construction validates the input; store operations
//! accept only `&Path`, so a malformed path surfaces as a [`PathError`]
//! at the parse site rather than corrupting the tree with empty keys.
//!
//! # Example
//!
//! ```
//! use pathstate_core::Path;
//!
//! let path: Path = "counter.current".parse().unwrap();
//! assert_eq!(path.segments(), ["counter", "current"]);
//! assert_eq!(path.to_string(), "counter.current");
//!
//! assert!("".parse::<Path>().is_err());
//! assert!("a..b".parse::<Path>().is_err());
//! assert!(".a".parse::<Path>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::PathError;

/// A validated location within a state tree.
///
/// Segments are stored in order; the dotted form is recovered by
/// `Display`. Paths are cheap to clone and hash, so they can key change
/// sets and pending-miss collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse a dot-delimited path string.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Empty`] for the empty string and
    /// [`PathError::EmptySegment`] when any segment between dots is
    /// empty (leading, trailing, or doubled dots).
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let mut segments = Vec::new();
        for (index, segment) in raw.split('.').enumerate() {
            if segment.is_empty() {
                return Err(PathError::EmptySegment { index });
            }
            segments.push(segment.to_owned());
        }
        Ok(Self { segments })
    }

    /// Build a path from pre-split segments.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Empty`] for an empty sequence and
    /// [`PathError::EmptySegment`] when any segment is the empty string.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(index) = segments.iter().position(String::is_empty) {
            return Err(PathError::EmptySegment { index });
        }
        Ok(Self { segments })
    }

    /// The ordered segment keys.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments. Always at least 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

/// Parse a path literal, panicking on invalid input.
///
/// Intended for literals in tests and examples where the path is known
/// to be well-formed; fallible call sites should use [`Path::parse`].
///
/// # Examples
///
/// ```
/// use pathstate_core::path;
///
/// let p = path!("user.name");
/// assert_eq!(p.depth(), 2);
/// ```
#[macro_export]
macro_rules! path {
    ($raw:expr) => {
        $raw.parse::<$crate::Path>().expect("invalid path literal")
    };
}

#![forbid(unsafe_code)]

//! Path addressing and the persistent state tree for pathstate.
//!
//! This crate provides the two value types everything else is built on:
//!
//! - [`Path`]: a validated, dot-delimited location within a state tree
//!   (`"user.profile.name"`). Malformed input (an empty string, or an
//!   empty segment from a leading, trailing, or doubled dot) is rejected
//!   at construction with a [`PathError`], so downstream operations only
//!   ever see well-formed paths.
//! - [`Value`]: an immutable, arbitrarily nested keyed tree backed by
//!   persistent collections. Updates return a new tree that shares all
//!   untouched branches with its predecessor, which makes snapshots cheap
//!   to retain and impossible to mutate underfoot.
//!
//! # Invariants
//!
//! 1. A `Path` always has at least one segment and no empty segments.
//! 2. `Value` is never mutated in place; every write builds a new tree.
//! 3. `Value::set_in` rebuilds only the ancestor chain of the assigned
//!    leaf; siblings are shared by reference between old and new trees.
//! 4. Presence is key existence: a stored `Value::Null` is present.

mod error;
mod path;
mod value;

pub use error::PathError;
pub use path::Path;
pub use value::Value;

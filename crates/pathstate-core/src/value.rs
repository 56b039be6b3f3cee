//! The persistent state tree.
//!
//! [`Value`] is an immutable map-of-maps with arbitrary leaves, backed
//! by the `im` crate's persistent collections. Cloning is O(1) and
//! structurally shared, which is what makes retained snapshots cheap:
//! any component may hold an old tree and inspect it long after the
//! store has moved on.
//!
//! # Invariants
//!
//! 1. No operation mutates a tree in place; [`Value::set_in`] returns a
//!    new tree and leaves the receiver untouched.
//! 2. `set_in` rebuilds only the ancestor chain of the assigned leaf.
//!    Sibling branches are shared by reference between the old and new
//!    trees.
//! 3. Presence is key existence, not non-null-ness: a stored
//!    [`Value::Null`] is a present value and [`Value::get_in`] returns
//!    it rather than reporting a miss.
//!
//! # Failure Modes
//!
//! | Operation | Condition | Behavior |
//! |-----------|-----------|----------|
//! | `get_in`  | segment absent | `None` |
//! | `get_in`  | non-map intermediate | `None` |
//! | `set_in`  | missing intermediates | created as empty maps |
//! | `set_in`  | non-map intermediate | replaced by a fresh map |

use im::{HashMap, Vector};

/// An immutable state tree node: a keyed map, a list, or a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An explicit null. Present when stored, unlike an absent key.
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Integer leaf.
    Int(i64),
    /// Floating-point leaf.
    Float(f64),
    /// String leaf.
    Str(String),
    /// Ordered sequence of values.
    List(Vector<Value>),
    /// Keyed subtree.
    Map(HashMap<String, Value>),
}

impl Value {
    /// An empty keyed subtree, the root of a fresh store.
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(HashMap::new())
    }

    /// Build a map from `(key, value)` entries.
    ///
    /// ```
    /// use pathstate_core::Value;
    ///
    /// let user = Value::from_entries([("name", "black bart"), ("role", "pirate")]);
    /// assert_eq!(user.get("name"), Some(&Value::Str("black bart".into())));
    /// ```
    #[must_use]
    pub fn from_entries<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Whether this node is the explicit null leaf.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean leaf value, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer leaf value, if this is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The float leaf value, if this is one.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// The string leaf value, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The list contents, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&Vector<Value>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The keyed subtree, if this is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a direct child by key. `None` on leaves and lists.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Walk `segments` down the tree.
    ///
    /// Returns `None` as soon as a segment is absent or a non-map
    /// intermediate is reached. A stored [`Value::Null`] at the final
    /// segment is returned as `Some(&Value::Null)`: it is present.
    #[must_use]
    pub fn get_in(&self, segments: &[String]) -> Option<&Value> {
        let mut node = self;
        for segment in segments {
            node = node.get(segment)?;
        }
        Some(node)
    }

    /// Whether a value exists at `segments`.
    #[must_use]
    pub fn contains_in(&self, segments: &[String]) -> bool {
        self.get_in(segments).is_some()
    }

    /// Assign `value` at `segments`, returning the new tree.
    ///
    /// Missing intermediates are created as empty maps; an existing
    /// non-map intermediate is replaced by a fresh map, so assignment
    /// is total. Only the ancestor chain of the leaf is rebuilt;
    /// sibling branches are shared with the receiver.
    #[must_use = "set_in returns the new tree; the receiver is unchanged"]
    pub fn set_in(&self, segments: &[String], value: Value) -> Value {
        match segments.split_first() {
            None => value,
            Some((head, rest)) => {
                let map = match self {
                    Self::Map(map) => map.clone(),
                    _ => HashMap::new(),
                };
                let child = map
                    .get(head.as_str())
                    .cloned()
                    .unwrap_or_else(Value::empty_map);
                let updated = child.set_in(rest, value);
                Self::Map(map.update(head.clone(), updated))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items.into_iter().collect())
    }
}

impl From<Vector<Value>> for Value {
    fn from(items: Vector<Value>) -> Self {
        Self::List(items)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::Value;
    use serde::de::{self, MapAccess, SeqAccess, Visitor};
    use serde::ser::{SerializeMap, SerializeSeq};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Value::Null => serializer.serialize_unit(),
                Value::Bool(b) => serializer.serialize_bool(*b),
                Value::Int(n) => serializer.serialize_i64(*n),
                Value::Float(n) => serializer.serialize_f64(*n),
                Value::Str(s) => serializer.serialize_str(s),
                Value::List(items) => {
                    let mut seq = serializer.serialize_seq(Some(items.len()))?;
                    for item in items {
                        seq.serialize_element(item)?;
                    }
                    seq.end()
                }
                Value::Map(map) => {
                    let mut out = serializer.serialize_map(Some(map.len()))?;
                    for (key, value) in map {
                        out.serialize_entry(key, value)?;
                    }
                    out.end()
                }
            }
        }
    }

    struct ValueVisitor;

    impl<'de> Visitor<'de> for ValueVisitor {
        type Value = Value;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a state value (null, bool, number, string, list, or map)")
        }

        fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
            Ok(Value::Bool(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
            Ok(Value::Int(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
            i64::try_from(v)
                .map(Value::Int)
                .map_err(|_| E::custom(format!("integer {v} out of range")))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
            Ok(Value::Float(v))
        }

        fn visit_str<E>(self, v: &str) -> Result<Value, E> {
            Ok(Value::Str(v.to_owned()))
        }

        fn visit_string<E>(self, v: String) -> Result<Value, E> {
            Ok(Value::Str(v))
        }

        fn visit_unit<E>(self) -> Result<Value, E> {
            Ok(Value::Null)
        }

        fn visit_none<E>(self) -> Result<Value, E> {
            Ok(Value::Null)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
            Deserialize::deserialize(deserializer)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
            let mut items = im::Vector::new();
            while let Some(item) = seq.next_element()? {
                items.push_back(item);
            }
            Ok(Value::List(items))
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
            let mut map = im::HashMap::new();
            while let Some((key, value)) = access.next_entry::<String, Value>()? {
                map.insert(key, value);
            }
            Ok(Value::Map(map))
        }
    }

    impl<'de> Deserialize<'de> for Value {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(ValueVisitor)
        }
    }
}

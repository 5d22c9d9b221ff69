//! Dynamic value types for synchronized state

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A dynamic value that can represent any piece of hub state
///
/// Containers keep their contents behind `Arc`, so cloning a value never
/// copies nested data and an untouched nested container keeps its identity
/// across state transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    /// No value / null
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// List of values
    List(Arc<Vec<Value>>),
    /// Map of string keys to values
    Map(Arc<ValueMap>),
}

/// A map of string keys to dynamic values
///
/// Uses IndexMap to preserve insertion order (diffs and wire output stay deterministic)
pub type ValueMap = IndexMap<String, Value>;

impl Value {
    /// Wrap a map
    pub fn map(map: ValueMap) -> Self {
        Value::Map(Arc::new(map))
    }

    /// Wrap a list
    pub fn list(list: Vec<Value>) -> Self {
        Value::List(Arc::new(list))
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Try to get this value as a map
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a field when this value is a map
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Set a field, copying the map only if it is shared
    ///
    /// A non-map value is replaced by a single-entry map.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        if !matches!(self, Value::Map(_)) {
            *self = Value::map(ValueMap::new());
        }
        match self {
            Value::Map(map) => Arc::make_mut(map).insert(key.into(), value.into()),
            _ => None,
        }
    }

    /// Compare one level deep
    ///
    /// Scalars compare by value, floats by bit pattern. Lists and maps
    /// compare by identity: two containers are equal only when they are the
    /// same allocation, so an unchanged nested container is never traversed.
    pub fn shallow_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::List(_) | Value::Map(_), _) | (_, Value::List(_) | Value::Map(_)) => false,
            // Bit pattern, so an unchanged NaN stays unchanged
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::map(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(vec: Vec<T>) -> Self {
        Value::list(vec.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Float(2.5).as_float(), Some(2.5));
        assert_eq!(Value::Int(42).as_float(), Some(42.0));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
    }

    #[test]
    fn test_from_iter_builds_ordered_map() {
        let value = Value::from_iter([("b", 2), ("a", 1)]);
        let keys: Vec<_> = value.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(value.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_insert_copies_shared_map() {
        let original = Value::from_iter([("a", 1)]);
        let mut next = original.clone();
        next.insert("a", 2);

        assert_eq!(original.get("a"), Some(&Value::Int(1)));
        assert_eq!(next.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_insert_on_scalar_makes_map() {
        let mut value = Value::Int(7);
        value.insert("x", true);
        assert_eq!(value.get("x"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_shallow_eq_scalars() {
        assert!(Value::Int(1).shallow_eq(&Value::Int(1)));
        assert!(!Value::Int(1).shallow_eq(&Value::Int(2)));
        assert!(!Value::Int(1).shallow_eq(&Value::Float(1.0)));
        assert!(Value::from("x").shallow_eq(&Value::from("x")));
    }

    #[test]
    fn test_shallow_eq_floats_by_bits() {
        assert!(Value::Float(f64::NAN).shallow_eq(&Value::Float(f64::NAN)));
        assert!(Value::Float(1.5).shallow_eq(&Value::Float(1.5)));
        assert!(!Value::Float(0.0).shallow_eq(&Value::Float(-0.0)));
    }

    #[test]
    fn test_shallow_eq_containers_use_identity() {
        let nested = Value::from_iter([("k", 1)]);
        let shared = nested.clone();
        let rebuilt = Value::from_iter([("k", 1)]);

        assert!(nested.shallow_eq(&shared));
        // Structurally equal but a different allocation
        assert_eq!(nested, rebuilt);
        assert!(!nested.shallow_eq(&rebuilt));

        let list = Value::from(vec![1, 2]);
        assert!(list.shallow_eq(&list.clone()));
        assert!(!list.shallow_eq(&Value::from(vec![1, 2])));
    }

    #[test]
    fn test_display() {
        let value = Value::from_iter([("a", Value::from(1)), ("b", Value::from(vec!["x"]))]);
        assert_eq!(value.to_string(), "{a: 1, b: [\"x\"]}");
    }
}

//! Shallow diffing between views
//!
//! A view is a flat record of fields. Only top-level fields are compared,
//! and nested containers are compared by identity through
//! [`Value::shallow_eq`]. A nested list that changed produces a whole-field
//! `update`, never an element-level patch.

use crate::{Error, Result, Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::slice;

/// Operation names used on the wire
pub const OP_CREATE: &str = "create";
pub const OP_UPDATE: &str = "update";
pub const OP_DELETE: &str = "delete";

/// One top-level field transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Change {
    /// Field absent before, present now
    Create { key: String, value: Value },
    /// Field present before with a different value
    Update { key: String, value: Value },
    /// Field present before, absent now
    Delete { key: String },
}

impl Change {
    /// The field this change applies to
    pub fn key(&self) -> &str {
        match self {
            Change::Create { key, .. } | Change::Update { key, .. } | Change::Delete { key } => key,
        }
    }

    /// The wire name of this operation
    pub fn op(&self) -> &'static str {
        match self {
            Change::Create { .. } => OP_CREATE,
            Change::Update { .. } => OP_UPDATE,
            Change::Delete { .. } => OP_DELETE,
        }
    }

    /// Encode as `{op, key, value?}`
    pub fn to_value(&self) -> Value {
        let mut fields = ValueMap::new();
        fields.insert("op".into(), self.op().into());
        fields.insert("key".into(), self.key().into());
        match self {
            Change::Create { value, .. } | Change::Update { value, .. } => {
                fields.insert("value".into(), value.clone());
            }
            Change::Delete { .. } => {}
        }
        Value::map(fields)
    }

    /// Decode from `{op, key, value?}`
    pub fn from_value(value: &Value) -> Result<Self> {
        let key = value
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedMessage("patch operation without a key".into()))?
            .to_string();
        let op = value
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedMessage(format!("patch operation on {key} without an op")))?;
        let new_value = || value.get("value").cloned().unwrap_or_default();

        match op {
            OP_CREATE => Ok(Change::Create { key, value: new_value() }),
            OP_UPDATE => Ok(Change::Update { key, value: new_value() }),
            OP_DELETE => Ok(Change::Delete { key }),
            other => Err(Error::MalformedMessage(format!("unknown patch op: {other}"))),
        }
    }
}

/// An ordered list of changes between two views
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    changes: Vec<Change>,
}

impl Patch {
    /// Create an empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterate over the changes in order
    pub fn iter(&self) -> slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Append a change
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Encode as a list of operation maps
    pub fn to_value(&self) -> Value {
        Value::list(self.changes.iter().map(Change::to_value).collect())
    }

    /// Decode from a list of operation maps
    pub fn from_value(value: &Value) -> Result<Self> {
        let ops = value
            .as_list()
            .ok_or_else(|| Error::MalformedMessage(format!("patch must be a list, got {}", value.type_name())))?;
        let changes = ops.iter().map(Change::from_value).collect::<Result<Vec<_>>>()?;
        Ok(Self { changes })
    }
}

impl From<Vec<Change>> for Patch {
    fn from(changes: Vec<Change>) -> Self {
        Self { changes }
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a Change;
    type IntoIter = slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Compute the changes that turn `previous` into `next`
///
/// Creates and updates come first, in `next` key order, followed by
/// deletes in `previous` key order. An empty patch means nothing should be
/// sent; suppressing it is up to the caller.
pub fn diff(previous: &ValueMap, next: &ValueMap) -> Patch {
    let mut patch = Patch::new();

    for (key, value) in next {
        match previous.get(key) {
            None => patch.push(Change::Create {
                key: key.clone(),
                value: value.clone(),
            }),
            Some(old) if !old.shallow_eq(value) => patch.push(Change::Update {
                key: key.clone(),
                value: value.clone(),
            }),
            Some(_) => {}
        }
    }

    for key in previous.keys() {
        if !next.contains_key(key) {
            patch.push(Change::Delete { key: key.clone() });
        }
    }

    patch
}

/// Apply a patch to a view, returning the patched view
///
/// Existing fields keep their position; created fields are appended.
pub fn apply(view: &ValueMap, patch: &Patch) -> ValueMap {
    let mut next = view.clone();
    for change in patch {
        match change {
            Change::Create { key, value } | Change::Update { key, value } => {
                next.insert(key.clone(), value.clone());
            }
            Change::Delete { key } => {
                next.shift_remove(key);
            }
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(pairs: &[(&str, Value)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let a = view(&[("a", 1.into()), ("b", "x".into())]);
        assert!(diff(&a, &a).is_empty());
    }

    #[test]
    fn test_diff_update() {
        let a = view(&[("a", 1.into()), ("b", 2.into())]);
        let b = view(&[("a", 1.into()), ("b", 3.into())]);

        let patch = diff(&a, &b);
        assert_eq!(
            patch,
            Patch::from(vec![Change::Update {
                key: "b".into(),
                value: 3.into()
            }])
        );
    }

    #[test]
    fn test_diff_create_and_delete_order() {
        let a = view(&[("gone", 1.into()), ("kept", 2.into()), ("also_gone", 3.into())]);
        let b = view(&[("new", 9.into()), ("kept", 2.into())]);

        let patch = diff(&a, &b);
        let ops: Vec<_> = patch.iter().map(|c| (c.op(), c.key().to_string())).collect();
        assert_eq!(
            ops,
            vec![
                ("create", "new".to_string()),
                ("delete", "gone".to_string()),
                ("delete", "also_gone".to_string()),
            ]
        );
    }

    #[test]
    fn test_diff_unchanged_nan_field_is_empty() {
        let a = view(&[("x", Value::Float(f64::NAN)), ("y", 1.into())]);
        let b = view(&[("x", Value::Float(f64::NAN)), ("y", 2.into())]);

        assert!(diff(&a, &a).is_empty());
        let keys: Vec<_> = diff(&a, &b).iter().map(|c| c.key().to_string()).collect();
        assert_eq!(keys, vec!["y"]);
    }

    #[test]
    fn test_diff_shares_unchanged_nested_values() {
        let nested = Value::from_iter([("deep", 1)]);
        let a = view(&[("n", nested.clone())]);
        let b = view(&[("n", nested)]);
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn test_diff_rebuilt_nested_value_is_whole_field_update() {
        let a = view(&[("items", Value::from(vec![1, 2]))]);
        let b = view(&[("items", Value::from(vec![1, 2, 3]))]);

        let patch = diff(&a, &b);
        assert_eq!(patch.len(), 1);
        assert_eq!(
            patch.iter().next(),
            Some(&Change::Update {
                key: "items".into(),
                value: Value::from(vec![1, 2, 3])
            })
        );
    }

    #[test]
    fn test_apply_preserves_order() {
        let a = view(&[("a", 1.into()), ("b", 2.into()), ("c", 3.into())]);
        let b = view(&[("a", 1.into()), ("c", 4.into()), ("d", 5.into())]);

        let patched = apply(&a, &diff(&a, &b));
        assert_eq!(patched, b);
        let keys: Vec<_> = patched.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_change_wire_shape() {
        let update = Change::Update {
            key: "b".into(),
            value: 3.into(),
        };
        let encoded = update.to_value();
        assert_eq!(encoded.get("op"), Some(&Value::from("update")));
        assert_eq!(encoded.get("key"), Some(&Value::from("b")));
        assert_eq!(encoded.get("value"), Some(&Value::Int(3)));

        let delete = Change::Delete { key: "a".into() }.to_value();
        assert_eq!(delete.get("value"), None);
        assert_eq!(Change::from_value(&delete).unwrap(), Change::Delete { key: "a".into() });
    }

    #[test]
    fn test_patch_rejects_unknown_op() {
        let bogus = Value::list(vec![Value::from_iter([("op", "move"), ("key", "a")])]);
        assert!(matches!(
            Patch::from_value(&bogus),
            Err(Error::MalformedMessage(_))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::OnceLock;

    /// One nested list reused across views, so diffs see the same allocation
    fn shared() -> Value {
        static SHARED: OnceLock<Value> = OnceLock::new();
        SHARED
            .get_or_init(|| Value::list(vec![Value::Int(1), Value::Int(2)]))
            .clone()
    }

    fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-5i64..5).prop_map(Value::Int),
            Just(Value::Float(f64::NAN)),
            any::<f64>().prop_map(Value::Float),
            "[a-c]{0,2}".prop_map(Value::String),
        ]
    }

    fn arb_field() -> impl Strategy<Value = Value> {
        prop_oneof![
            4 => arb_scalar(),
            1 => Just(()).prop_map(|_| shared()),
            1 => prop::collection::vec((-3i64..3).prop_map(Value::Int), 0..3).prop_map(Value::list),
            1 => prop::collection::vec(("[x-z]", arb_scalar()), 0..3)
                .prop_map(|pairs| Value::map(pairs.into_iter().collect())),
        ]
    }

    fn arb_view() -> impl Strategy<Value = ValueMap> {
        prop::collection::vec(("[a-f]", arb_field()), 0..6)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        /// Property: a view diffed against itself produces no changes
        #[test]
        fn prop_diff_self_is_empty(a in arb_view()) {
            prop_assert!(diff(&a, &a).is_empty());
        }

        /// Property: applying diff(a, b) to a yields b, nested values by identity
        #[test]
        fn prop_apply_diff_reaches_target(a in arb_view(), b in arb_view()) {
            let patched = apply(&a, &diff(&a, &b));
            prop_assert_eq!(patched.len(), b.len());
            for (key, value) in &b {
                prop_assert!(patched.get(key).is_some_and(|v| v.shallow_eq(value)));
            }
        }

        /// Property: a field changes exactly when it is new or not shallowly equal
        #[test]
        fn prop_changes_follow_shallow_equality(a in arb_view(), b in arb_view()) {
            let patch = diff(&a, &b);
            for (key, value) in &b {
                let changed = patch.iter().any(|c| c.key() == key.as_str());
                let same = a.get(key).is_some_and(|old| old.shallow_eq(value));
                prop_assert_eq!(changed, !same);
            }
        }
    }
}

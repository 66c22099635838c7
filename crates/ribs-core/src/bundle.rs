//! Opaque state blobs.
//!
//! A [`Bundle`] is an ordered, nested, string-keyed map of primitives, raw
//! bytes, lists and further bundles. Nodes produce one from
//! [`Node::save_state`](crate::node::Node::save_state) and consume it in
//! [`Node::attach`](crate::node::Node::attach). The framework never interprets
//! bundles produced by application components; it only nests them under the
//! keys in [`keys`].
//!
//! Any `serde` type can be stored with [`Bundle::put_value`] and read back
//! with [`Bundle::get_value`]. The backstack uses this to persist navigation
//! configurations.
//!
//! ```
//! use ribs_core::bundle::Bundle;
//!
//! let mut bundle = Bundle::new();
//! bundle.put("counter", 3);
//! bundle.bundle_mut("nested").put("name", "inbox");
//!
//! assert_eq!(bundle.get_integer("counter"), Some(3));
//! assert_eq!(bundle.get_bundle("nested").and_then(|b| b.get_str("name")), Some("inbox"));
//! ```

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::BundleError;

/// Keys the framework itself writes into bundles.
pub mod keys {
    /// Router state of a node.
    pub const ROUTER: &str = "node.router";
    /// Business-logic state of a node.
    pub const INTERACTOR: &str = "node.interactor";
    /// Child node blobs, keyed by child tag.
    pub const CHILDREN: &str = "node.children";
    /// Saved view hierarchy state.
    pub const VIEW_STATE: &str = "view.state";
    /// Persisted interactor tag.
    pub const INTERACTOR_TAG: &str = "interactor.tag";
    /// Persisted navigation stack.
    pub const BACK_STACK_STATE: &str = "BackStackManager.State";
}

/// A single value inside a [`Bundle`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum BundleValue {
    /// Absent value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Integer(i64),
    /// Integer above `i64::MAX`.
    Unsigned(u64),
    /// Floating point value.
    Float(f64),
    /// UTF-8 string value.
    String(String),
    /// Opaque binary value.
    Bytes(Vec<u8>),
    /// Ordered list of values.
    List(Vec<BundleValue>),
    /// Nested bundle.
    Bundle(Bundle),
}

impl BundleValue {
    /// Short name of the value kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            BundleValue::Null => "null",
            BundleValue::Bool(_) => "bool",
            BundleValue::Integer(_) => "integer",
            BundleValue::Unsigned(_) => "unsigned",
            BundleValue::Float(_) => "float",
            BundleValue::String(_) => "string",
            BundleValue::Bytes(_) => "bytes",
            BundleValue::List(_) => "list",
            BundleValue::Bundle(_) => "bundle",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BundleValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BundleValue::Integer(v) => Some(*v),
            BundleValue::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            BundleValue::Unsigned(v) => Some(*v),
            BundleValue::Integer(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            BundleValue::Float(v) => Some(*v),
            BundleValue::Integer(v) => Some(*v as f64),
            BundleValue::Unsigned(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BundleValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BundleValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BundleValue]> {
        match self {
            BundleValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bundle(&self) -> Option<&Bundle> {
        match self {
            BundleValue::Bundle(v) => Some(v),
            _ => None,
        }
    }

    fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => BundleValue::Null,
            Value::Bool(v) => BundleValue::Bool(v),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(v), _) => BundleValue::Integer(v),
                (None, Some(v)) => BundleValue::Unsigned(v),
                (None, None) => BundleValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(v) => BundleValue::String(v),
            Value::Array(items) => {
                BundleValue::List(items.into_iter().map(BundleValue::from_json).collect())
            }
            Value::Object(map) => BundleValue::Bundle(Bundle {
                entries: map
                    .into_iter()
                    .map(|(k, v)| (k, BundleValue::from_json(v)))
                    .collect(),
            }),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            BundleValue::Null => Value::Null,
            BundleValue::Bool(v) => Value::Bool(*v),
            BundleValue::Integer(v) => Value::from(*v),
            BundleValue::Unsigned(v) => Value::from(*v),
            BundleValue::Float(v) => Value::from(*v),
            BundleValue::String(v) => Value::String(v.clone()),
            BundleValue::Bytes(v) => Value::Array(v.iter().map(|b| Value::from(*b)).collect()),
            BundleValue::List(items) => Value::Array(items.iter().map(BundleValue::to_json).collect()),
            BundleValue::Bundle(bundle) => Value::Object(
                bundle
                    .entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for BundleValue {
    fn from(v: bool) -> Self {
        BundleValue::Bool(v)
    }
}

impl From<i32> for BundleValue {
    fn from(v: i32) -> Self {
        BundleValue::Integer(v as i64)
    }
}

impl From<i64> for BundleValue {
    fn from(v: i64) -> Self {
        BundleValue::Integer(v)
    }
}

impl From<u64> for BundleValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => BundleValue::Integer(v),
            Err(_) => BundleValue::Unsigned(v),
        }
    }
}

impl From<f64> for BundleValue {
    fn from(v: f64) -> Self {
        BundleValue::Float(v)
    }
}

impl From<&str> for BundleValue {
    fn from(v: &str) -> Self {
        BundleValue::String(v.to_string())
    }
}

impl From<String> for BundleValue {
    fn from(v: String) -> Self {
        BundleValue::String(v)
    }
}

impl From<Vec<u8>> for BundleValue {
    fn from(v: Vec<u8>) -> Self {
        BundleValue::Bytes(v)
    }
}

impl From<Vec<BundleValue>> for BundleValue {
    fn from(v: Vec<BundleValue>) -> Self {
        BundleValue::List(v)
    }
}

impl From<Bundle> for BundleValue {
    fn from(v: Bundle) -> Self {
        BundleValue::Bundle(v)
    }
}

/// An ordered, nested key/value state blob.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle {
    entries: BTreeMap<String, BundleValue>,
}

impl Bundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Store a value, replacing any previous value under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<BundleValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&BundleValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<BundleValue> {
        self.entries.remove(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(BundleValue::as_bool)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(BundleValue::as_integer)
    }

    pub fn get_unsigned(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(BundleValue::as_unsigned)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(BundleValue::as_float)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(BundleValue::as_str)
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(BundleValue::as_bytes)
    }

    pub fn get_bundle(&self, key: &str) -> Option<&Bundle> {
        self.get(key).and_then(BundleValue::as_bundle)
    }

    /// Nested bundle under `key`, created if missing.
    ///
    /// A non-bundle value stored under `key` is replaced.
    pub fn bundle_mut(&mut self, key: impl Into<String>) -> &mut Bundle {
        let slot = self
            .entries
            .entry(key.into())
            .or_insert_with(|| BundleValue::Bundle(Bundle::new()));
        if !matches!(slot, BundleValue::Bundle(_)) {
            *slot = BundleValue::Bundle(Bundle::new());
        }
        match slot {
            BundleValue::Bundle(bundle) => bundle,
            _ => unreachable!("slot was just replaced by a bundle"),
        }
    }

    /// Store any serializable value.
    pub fn put_value<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), BundleError> {
        let json = serde_json::to_value(value)?;
        self.entries.insert(key.into(), BundleValue::from_json(json));
        Ok(())
    }

    /// Read back a value stored with [`put_value`](Self::put_value).
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, BundleError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.to_json())?)),
        }
    }

    /// Like [`get_bundle`](Self::get_bundle) but fails if the key holds
    /// something other than a bundle.
    pub fn try_get_bundle(&self, key: &str) -> Result<Option<&Bundle>, BundleError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(BundleValue::Bundle(bundle)) => Ok(Some(bundle)),
            Some(_) => Err(BundleError::TypeMismatch {
                key: key.to_string(),
                expected: "bundle",
            }),
        }
    }

    /// Serialize to JSON for external persistence.
    pub fn to_json(&self) -> Result<String, BundleError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a bundle written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, BundleError> {
        Ok(serde_json::from_str(json)?)
    }
}

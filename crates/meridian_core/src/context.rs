//! The per-request context record.
//!
//! A [`RequestContext`] is created once per logical operation and threaded
//! through every phase. Cloning it clones the *handle*: all clones observe
//! and mutate the same map, so identity is stable for the whole request.
//! Hooks grow it with [`extend`](RequestContext::extend), a shallow in-place
//! merge; nothing ever swaps the record out.
//!
//! # Example
//!
//! ```ignore
//! let context = RequestContext::new();
//! let seen_by_hook = context.clone();
//!
//! seen_by_hook.extend(json!({ "user": "ada" }))?;
//! context.extend(json!({ "role": "admin" }))?;
//!
//! assert!(context.ptr_eq(&seen_by_hook));
//! assert_eq!(context.get("user"), Some(json!("ada")));
//! ```

use core::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::PipelineError;

/// Shared, in-place mutable key/value record for one request.
#[derive(Clone, Default)]
pub struct RequestContext {
    values: Arc<RwLock<Map<String, Value>>>,
}

impl RequestContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context seeded with `map`.
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            values: Arc::new(RwLock::new(map)),
        }
    }

    /// Creates a context from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidContextExtension`] if `value` is not an
    /// object.
    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(PipelineError::invalid_extension(&other)),
        }
    }

    /// Shallow-merges `extension` into this context.
    ///
    /// Keys present in `extension` overwrite existing keys; all other keys
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidContextExtension`] if `extension` is
    /// not an object. The context is left untouched.
    pub fn extend(&self, extension: Value) -> Result<(), PipelineError> {
        match extension {
            Value::Object(map) => {
                self.extend_map(map);
                Ok(())
            }
            other => Err(PipelineError::invalid_extension(&other)),
        }
    }

    /// Shallow-merges an already-validated map into this context.
    pub fn extend_map(&self, extension: Map<String, Value>) {
        let mut values = self.values.write();
        for (key, value) in extension {
            values.insert(key, value);
        }
    }

    /// Inserts a single key, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.write().insert(key.into(), value)
    }

    /// Returns a copy of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Returns a copy of the whole record.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.read().clone()
    }

    /// Returns a copy of the whole record as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.snapshot())
    }

    /// Number of keys in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns `true` if the record has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Returns `true` if both handles refer to the same record.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

impl From<Map<String, Value>> for RequestContext {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_map(map)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestContext")
            .field(&*self.values.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn extend_merges_in_place() {
        let context = RequestContext::new();
        let alias = context.clone();

        context.extend(json!({ "a": 1 })).unwrap();
        alias.extend(json!({ "b": 2 })).unwrap();

        assert!(context.ptr_eq(&alias));
        assert_eq!(context.to_value(), json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn extend_overwrites_shallowly() {
        let context = RequestContext::from_value(json!({ "user": { "id": 1, "name": "x" } })).unwrap();
        context.extend(json!({ "user": { "id": 2 } })).unwrap();

        assert_eq!(context.get("user"), Some(json!({ "id": 2 })));
    }

    #[test]
    fn non_object_extension_is_rejected() {
        let context = RequestContext::new();
        context.insert("kept", json!(true));

        let error = context.extend(json!([1, 2])).unwrap_err();

        assert!(matches!(error, PipelineError::InvalidContextExtension(_)));
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn from_value_rejects_scalars() {
        assert!(RequestContext::from_value(json!(3)).is_err());
        assert!(RequestContext::from_value(json!({})).unwrap().is_empty());
    }

    #[test]
    fn distinct_contexts_do_not_share_identity() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert!(!a.ptr_eq(&b));
    }

    proptest! {
        #[test]
        fn merges_are_additive(
            first in proptest::collection::btree_map("[a-m]{1,4}", any::<i64>(), 0..8),
            second in proptest::collection::btree_map("[n-z]{1,4}", any::<i64>(), 0..8),
        ) {
            let context = RequestContext::new();
            let to_object = |entries: &std::collections::BTreeMap<String, i64>| {
                Value::Object(entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect())
            };

            context.extend(to_object(&first)).unwrap();
            context.extend(to_object(&second)).unwrap();

            prop_assert_eq!(context.len(), first.len() + second.len());
            for (key, value) in first.iter().chain(second.iter()) {
                prop_assert_eq!(context.get(key), Some(json!(value)));
            }
        }
    }
}

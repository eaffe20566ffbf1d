//! Argument payloads passed to the adapter's configuration entry points.
//!
//! This module provides:
//! - Opaque adapter arguments ([`AdapterArgs`]) with deep-merge support
//! - Flag value sets ([`FlagSet`]) for the default-flags bootstrap
//! - Merge policy for reconfiguration requests ([`ReconfigureOptions`])

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Merge policy for a single reconfiguration request.
///
/// With `overwrite` set, the incoming argument set discards the previous
/// one entirely. Otherwise the two sets are deep-merged, with the incoming
/// set's leaf values winning on key conflict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconfigureOptions {
    /// Discard the previous argument set instead of merging into it.
    pub overwrite: bool,
}

impl ReconfigureOptions {
    /// Options for a deep-merging request (the default).
    #[must_use]
    pub const fn merge() -> Self {
        Self { overwrite: false }
    }

    /// Options for an overwriting request.
    #[must_use]
    pub const fn overwrite() -> Self {
        Self { overwrite: true }
    }
}

/// Error converting a JSON value into adapter arguments.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// Adapter arguments must be a JSON object at the top level.
    #[error("Adapter arguments must be an object, got {kind}")]
    NotAnObject {
        /// JSON type name of the rejected value
        kind: &'static str,
    },
}

/// Opaque configuration payload forwarded verbatim to the adapter.
///
/// The controller interprets no internal structure except that two
/// instances can be deep-merged. Stored as a JSON object so arbitrarily
/// nested key/value configuration round-trips through TOML and serde.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdapterArgs(Map<String, Value>);

impl AdapterArgs {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns true if no arguments are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value for a top-level key, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts a top-level key/value pair, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Merges `incoming` into this set per the given options.
    ///
    /// - `overwrite`: the result is exactly `incoming`, discarding `self`.
    /// - otherwise: recursive merge on objects, replace on arrays,
    ///   incoming wins on scalar conflict.
    #[must_use]
    pub fn merged(self, incoming: Self, options: ReconfigureOptions) -> Self {
        if options.overwrite {
            return incoming;
        }

        let mut base = self.0;
        deep_merge_objects(&mut base, incoming.0);
        Self(base)
    }
}

impl From<Map<String, Value>> for AdapterArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for AdapterArgs {
    type Error = ArgsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ArgsError::NotAnObject {
                kind: value_kind(&other),
            }),
        }
    }
}

/// A set of feature-flag values keyed by flag name.
///
/// Used only for the one-shot default-flags bootstrap pushed to the
/// adapter's flag-change sink at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet(Map<String, Value>);

impl FlagSet {
    /// Creates an empty flag set.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns true if no flags are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of flags in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the value for a flag, if present.
    #[must_use]
    pub fn get(&self, flag: &str) -> Option<&Value> {
        self.0.get(flag)
    }

    /// Inserts a flag value, replacing any previous value.
    pub fn insert(&mut self, flag: impl Into<String>, value: Value) {
        self.0.insert(flag.into(), value);
    }
}

impl From<Map<String, Value>> for FlagSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Recursively merges `incoming` into `base`.
///
/// Object values merge key-wise; every other value (scalars and arrays)
/// is replaced by the incoming side.
fn deep_merge_objects(base: &mut Map<String, Value>, incoming: Map<String, Value>) {
    use serde_json::map::Entry;

    for (key, incoming_value) in incoming {
        match base.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(incoming_value);
            }
            Entry::Occupied(mut slot) => match (slot.get_mut(), incoming_value) {
                (Value::Object(existing), Value::Object(nested)) => {
                    deep_merge_objects(existing, nested);
                }
                (existing, incoming_value) => *existing = incoming_value,
            },
        }
    }
}

/// Returns the JSON type name of a value, for error messages.
const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

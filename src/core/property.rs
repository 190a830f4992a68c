//! Dynamic Property Bag
//!
//! Interchange documents carry arbitrary per-object properties. They are kept
//! as `serde_json::Value` (null/bool/number/string/array/object) in document
//! order, with typed accessors that fall back to a caller default instead of
//! failing on missing or mismatched data.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered `name -> Value` map attached to every asset object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyBag {
    entries: Map<String, Value>,
}

impl PropertyBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bag from a JSON object's entries.
    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Best-effort typed read.
    ///
    /// Returns `default` when the property is absent or cannot be converted.
    /// String values get a second chance as embedded JSON, so `"42"` reads
    /// as a number and `"true"` as a bool.
    pub fn get<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        let Some(value) = self.entries.get(name) else {
            return default;
        };

        if let Ok(converted) = T::deserialize(value) {
            return converted;
        }

        match value {
            Value::String(text) => serde_json::from_str(text).unwrap_or(default),
            _ => default,
        }
    }

    /// Raw access to a property value.
    pub fn get_raw(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Store a value. Values that fail to serialize are stored as null.
    pub fn set<T: Serialize>(&mut self, name: impl Into<String>, value: T) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.entries.insert(name.into(), value);
    }

    /// Store a raw JSON value.
    pub fn insert_raw(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    /// Check if a property exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no properties are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

//! Render context bound to a merge

use crate::json_parser::get_nested_value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Data bound to a merge operation
///
/// The root is normally a JSON object; its keys are reachable from templates
/// as `.Key`. The engine never mutates a context while merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderContext(JsonValue);

impl RenderContext {
    /// Create an empty context (an empty object)
    pub fn new() -> Self {
        Self(JsonValue::Object(Map::new()))
    }

    /// Wrap an arbitrary JSON value
    pub fn from_value(value: JsonValue) -> Self {
        Self(value)
    }

    /// The root value, bound to `.` and `$` when a template starts
    pub fn root(&self) -> &JsonValue {
        &self.0
    }

    /// Unwrap the root value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Look up a dotted path such as `customer.address.city` or `Items.0`
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        get_nested_value(&self.0, path)
    }

    /// Set a top-level key, returning the previous value
    ///
    /// A non-object root is replaced by an empty object first.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Option<JsonValue> {
        if !self.0.is_object() {
            self.0 = JsonValue::Object(Map::new());
        }
        match &mut self.0 {
            JsonValue::Object(map) => map.insert(key.into(), value.into()),
            _ => None,
        }
    }

    /// Builder form of [`RenderContext::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(key, value);
        self
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl From<JsonValue> for RenderContext {
    fn from(value: JsonValue) -> Self {
        Self::from_value(value)
    }
}

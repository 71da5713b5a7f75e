//! JSON loader for render contexts

use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::context::RenderContext;
use crate::error::{MailMergeError, Result};

/// JSON loader configuration
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Path to the object used as the context root (e.g., "data.report")
    pub root_path: Option<String>,
}

impl JsonConfig {
    /// Create a new JSON config with default settings
    pub fn new() -> Self {
        Self { root_path: None }
    }

    /// Set the root path for the context object
    pub fn with_root_path(mut self, path: impl Into<String>) -> Self {
        self.root_path = Some(path.into());
        self
    }
}

/// Loads JSON documents into render contexts
#[derive(Debug, Clone, Default)]
pub struct JsonParser {
    config: JsonConfig,
}

impl JsonParser {
    /// Create a new JSON parser with default configuration
    pub fn new() -> Self {
        Self {
            config: JsonConfig::new(),
        }
    }

    /// Create a new JSON parser with custom configuration
    pub fn with_config(config: JsonConfig) -> Self {
        Self { config }
    }

    /// Parse a JSON file into a render context
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<RenderContext> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MailMergeError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), bytes = content.len(), "loaded data file");
        self.parse_string(&content)
    }

    /// Parse a JSON string into a render context
    pub fn parse_string(&self, data: &str) -> Result<RenderContext> {
        let json: JsonValue = serde_json::from_str(data)?;
        self.parse_json_value(json)
    }

    /// Select the configured root and check it is an object
    fn parse_json_value(&self, json: JsonValue) -> Result<RenderContext> {
        let root = match self.config.root_path {
            Some(ref path) => navigate_to_path(&json, path)?.clone(),
            None => json,
        };

        match root {
            JsonValue::Object(_) => Ok(RenderContext::from_value(root)),
            other => Err(MailMergeError::InvalidDataSource(format!(
                "Expected JSON object at the data root, got {}",
                kind_name(&other)
            ))),
        }
    }
}

fn kind_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Navigate to a nested path in a JSON value
fn navigate_to_path<'a>(json: &'a JsonValue, path: &str) -> Result<&'a JsonValue> {
    let mut current = json;

    for part in path.split('.') {
        match current {
            JsonValue::Object(obj) => {
                current = obj.get(part).ok_or_else(|| {
                    MailMergeError::InvalidPath(format!("Path '{}' not found", path))
                })?;
            }
            JsonValue::Array(arr) => {
                // Support numeric indices for arrays
                let index: usize = part.parse().map_err(|_| {
                    MailMergeError::InvalidPath(format!(
                        "Expected numeric index for array access, got '{}'",
                        part
                    ))
                })?;
                current = arr.get(index).ok_or_else(|| {
                    MailMergeError::InvalidPath(format!("Array index {} out of bounds", index))
                })?;
            }
            _ => {
                return Err(MailMergeError::InvalidPath(format!(
                    "Cannot access '{}' on non-object/array value",
                    part
                )));
            }
        }
    }

    Ok(current)
}

/// Get a nested value from JSON using dot notation
pub fn get_nested_value<'a>(json: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    navigate_to_path(json, path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_object() {
        let ctx = JsonParser::new()
            .parse_string(r#"{"Customer": "ACME", "Items": [{"ItemNo": 1}]}"#)
            .unwrap();

        assert_eq!(ctx.get("Customer"), Some(&json!("ACME")));
        assert_eq!(ctx.get("Items.0.ItemNo"), Some(&json!(1)));
    }

    #[test]
    fn test_parse_with_root_path() {
        let json = r#"{
            "status": "ok",
            "data": {
                "report": {"Title": "Quarterly"}
            }
        }"#;

        let parser = JsonParser::with_config(JsonConfig::new().with_root_path("data.report"));
        let ctx = parser.parse_string(json).unwrap();

        assert_eq!(ctx.root(), &json!({"Title": "Quarterly"}));
    }

    #[test]
    fn test_array_root_rejected() {
        let result = JsonParser::new().parse_string(r#"[{"name": "Alice"}]"#);
        assert!(matches!(result, Err(MailMergeError::InvalidDataSource(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = JsonParser::new().parse_string(r#"{"name": "#);
        assert!(matches!(result, Err(MailMergeError::JsonParse(_))));
    }

    #[test]
    fn test_invalid_root_path() {
        let parser = JsonParser::with_config(JsonConfig::new().with_root_path("data.missing"));
        let result = parser.parse_string(r#"{"data": {}}"#);
        assert!(matches!(result, Err(MailMergeError::InvalidPath(_))));
    }

    #[test]
    fn test_navigate_to_path() {
        let json = json!({"a": {"b": [10, 20, {"c": "deep"}]}});

        assert_eq!(get_nested_value(&json, "a.b.1"), Some(&json!(20)));
        assert_eq!(get_nested_value(&json, "a.b.2.c"), Some(&json!("deep")));
        assert!(get_nested_value(&json, "a.b.x").is_none());
        assert!(get_nested_value(&json, "a.b.2.c.d").is_none());
    }

    #[test]
    fn test_parse_file() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(file, r#"{{"GrandTotal": "$ 150.00"}}"#).unwrap();

        let ctx = JsonParser::new().parse_file(file.path()).unwrap();
        assert_eq!(ctx.get("GrandTotal"), Some(&json!("$ 150.00")));
    }

    #[test]
    fn test_parse_missing_file() {
        let result = JsonParser::new().parse_file("/nonexistent/data.json");
        assert!(matches!(result, Err(MailMergeError::FileNotFound(_))));
    }
}

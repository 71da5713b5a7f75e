//! Mail Merge
//!
//! Render contexts and the template merge engine used to fill report
//! templates.
//!
//! # Features
//!
//! - JSON data files loaded into a [`RenderContext`], with an optional root path
//! - A text template language with `{{.Field}}` interpolation, `if`, `range`
//!   and `with` blocks, variables, pipelines and builtin functions
//! - Configurable missing-key handling and escaping of interpolated values
//!
//! # Example
//!
//! ```rust
//! use mail_merge::{JsonParser, MergeEngine, MergeOptions};
//!
//! let ctx = JsonParser::new()
//!     .parse_string(r#"{"Items": [{"Name": "Pen"}, {"Name": "Pad"}]}"#)
//!     .unwrap();
//!
//! let engine = MergeEngine::new(MergeOptions::default());
//! let out = engine
//!     .merge("rows", "{{range .Items}}[{{.Name}}]{{end}}", &ctx)
//!     .unwrap();
//!
//! assert_eq!(out, "[Pen][Pad]");
//! ```

mod context;
mod error;
mod json_parser;
pub mod merge_engine;
pub mod template;

// Re-export main types
pub use context::RenderContext;
pub use error::{MailMergeError, Result};
pub use json_parser::{get_nested_value, JsonConfig, JsonParser};
pub use merge_engine::{MergeEngine, MergeOptions, MissingKeyPolicy, ValueEscape};
pub use template::Template;

/// Load a JSON data file into a render context
pub fn load_context_from_file(path: impl AsRef<std::path::Path>, config: JsonConfig) -> Result<RenderContext> {
    JsonParser::with_config(config).parse_file(path)
}

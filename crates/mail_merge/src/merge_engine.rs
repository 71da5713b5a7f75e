//! Template Merge Engine
//!
//! Parses template text and evaluates it against a render context,
//! producing the full merged text or an error.

use crate::context::RenderContext;
use crate::error::Result;
use crate::template::Template;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a field lookup on a missing key produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy { Zero, Error }

impl Default for MissingKeyPolicy { fn default() -> Self { MissingKeyPolicy::Zero } }

/// Escaping applied to values printed by actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueEscape { Xml, None }

impl Default for ValueEscape { fn default() -> Self { ValueEscape::Xml } }

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub missing_key: MissingKeyPolicy,
    pub escape: ValueEscape,
}

impl MergeOptions {
    /// Fail on missing keys instead of printing nothing
    pub fn strict() -> Self { Self { missing_key: MissingKeyPolicy::Error, ..Default::default() } }
    pub fn with_missing_key(mut self, policy: MissingKeyPolicy) -> Self { self.missing_key = policy; self }
    pub fn with_escape(mut self, escape: ValueEscape) -> Self { self.escape = escape; self }
}

#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    options: MergeOptions,
}

impl MergeEngine {
    pub fn new(options: MergeOptions) -> Self { Self { options } }

    /// Parse without executing, to surface syntax errors early
    pub fn parse(&self, name: &str, text: &str) -> Result<Template> { Template::parse(name, text) }

    /// Parse `text` and execute it against `ctx`
    ///
    /// The context is read only. Either the whole merged text is returned
    /// or an error naming the template and line.
    pub fn merge(&self, name: &str, text: &str, ctx: &RenderContext) -> Result<String> {
        let template = self.parse(name, text)?;
        let merged = template.execute(ctx, &self.options)?;
        debug!(template = name, input = text.len(), output = merged.len(), "merged template");
        Ok(merged)
    }

    pub fn options(&self) -> &MergeOptions { &self.options }
}

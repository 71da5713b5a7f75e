//! Rendering options

use mail_merge::MergeOptions;
use serde::{Deserialize, Serialize};

/// Directive keywords that turn an annotation into a loop marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopMarkers {
    /// Opens a loop; the marker goes before the row
    pub start: String,
    /// Closes a loop; the marker goes after the row
    pub end: String,
}

impl Default for LoopMarkers {
    fn default() -> Self {
        Self {
            start: "range".to_string(),
            end: "end".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareOptions {
    /// Indent the prepared XML; for inspecting templates only
    pub pretty_print: bool,
    pub loop_markers: LoopMarkers,
}

impl PrepareOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    pub fn with_loop_markers(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.loop_markers = LoopMarkers {
            start: start.into(),
            end: end.into(),
        };
        self
    }
}

/// Options for a full render: preparation plus merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub prepare: PrepareOptions,
    pub merge: MergeOptions,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prepare(mut self, prepare: PrepareOptions) -> Self {
        self.prepare = prepare;
        self
    }

    pub fn with_merge(mut self, merge: MergeOptions) -> Self {
        self.merge = merge;
        self
    }
}

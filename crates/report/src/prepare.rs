//! Preparation pipeline for a single XML entry
//!
//! `parse -> merge spans -> [rewrite annotations] -> serialize -> restore quotes`

use crate::annotations::rewrite_annotations;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, TracingSink};
use crate::error::PrepareError;
use crate::normalize::merge_spans;
use crate::options::PrepareOptions;
use crate::xml::{parse_document, write_document};

/// Per-entry state threaded through the preparation passes
pub struct PrepareContext<'a> {
    entry: &'a str,
    options: &'a PrepareOptions,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> PrepareContext<'a> {
    pub fn new(entry: &'a str, options: &'a PrepareOptions, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self { entry, options, sink }
    }

    pub fn entry(&self) -> &str {
        self.entry
    }

    pub fn options(&self) -> &PrepareOptions {
        self.options
    }

    pub(crate) fn debug(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.sink.emit(Diagnostic::debug(kind, self.entry, message));
    }

    pub(crate) fn info(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.sink.emit(Diagnostic::info(kind, self.entry, message));
    }
}

/// Merge split spans with default options
pub fn normalize(raw: &str) -> Result<String, PrepareError> {
    let options = PrepareOptions::default();
    let mut sink = TracingSink;
    normalize_with(raw, &mut PrepareContext::new("", &options, &mut sink))
}

/// Merge split spans and drop soft-space placeholders
///
/// Annotations are left in place.
pub fn normalize_with(raw: &str, ctx: &mut PrepareContext<'_>) -> Result<String, PrepareError> {
    let mut tree = parse_document(raw)?;
    merge_spans(&mut tree, ctx);
    let xml = write_document(&tree, ctx.options().pretty_print)?;
    Ok(restore_directive_quotes(&xml))
}

/// Normalize an entry and turn loop annotations into row markers
///
/// The result is ready to be parsed as a template.
pub fn prepare_template(raw: &str, ctx: &mut PrepareContext<'_>) -> Result<String, PrepareError> {
    let mut tree = parse_document(raw)?;
    merge_spans(&mut tree, ctx);
    rewrite_annotations(&mut tree, ctx)?;
    let xml = write_document(&tree, ctx.options().pretty_print)?;
    Ok(restore_directive_quotes(&xml))
}

/// Turn `&quot;` back into `"` inside `{{ ... }}` actions
///
/// Character data is already written with literal quotes; this covers
/// directives placed in attribute values. Markup outside actions is left
/// untouched.
pub fn restore_directive_quotes(xml: &str) -> String {
    const QUOT: &str = "&quot;";

    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let action = &rest[open..];
        match action.find("}}") {
            Some(close) => {
                let end = close + 2;
                out.push_str(&action[..end].replace(QUOT, "\""));
                rest = &action[end..];
            }
            None => {
                out.push_str(action);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

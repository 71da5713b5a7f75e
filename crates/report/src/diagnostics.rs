//! Diagnostics emitted while preparing and merging a document
//!
//! The pipeline reports what it did through a [`DiagnosticSink`] handed to
//! it by the caller. [`TracingSink`] forwards events to `tracing`;
//! [`MemorySink`] keeps them for inspection.

use tracing::{debug, info, warn};

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warn,
}

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A span was folded into the preceding span with the same style
    SpanMerged,
    /// A soft-space placeholder was dropped
    SpaceRemoved,
    /// A loop marker was placed next to a table row
    LoopMarkerInserted,
    /// An annotation (or annotation end) was removed
    AnnotationRemoved,
    /// An entry was normalized and rewritten
    EntryPrepared,
    /// An entry was merged with data
    EntryMerged,
    /// An optional entry was not present
    EntrySkipped,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::SpanMerged => write!(f, "Span merged"),
            DiagnosticKind::SpaceRemoved => write!(f, "Space removed"),
            DiagnosticKind::LoopMarkerInserted => write!(f, "Loop marker inserted"),
            DiagnosticKind::AnnotationRemoved => write!(f, "Annotation removed"),
            DiagnosticKind::EntryPrepared => write!(f, "Entry prepared"),
            DiagnosticKind::EntryMerged => write!(f, "Entry merged"),
            DiagnosticKind::EntrySkipped => write!(f, "Entry skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub kind: DiagnosticKind,
    /// Package entry being processed
    pub entry: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, kind: DiagnosticKind, entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            entry: entry.into(),
            message: message.into(),
        }
    }

    pub fn debug(kind: DiagnosticKind, entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Debug, kind, entry, message)
    }

    pub fn info(kind: DiagnosticKind, entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, kind, entry, message)
    }

    pub fn warn(kind: DiagnosticKind, entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, kind, entry, message)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.entry, self.kind, self.message)
    }
}

/// Receiver for pipeline diagnostics
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, d: Diagnostic) {
        match d.level {
            DiagnosticLevel::Debug => debug!(entry = %d.entry, kind = %d.kind, "{}", d.message),
            DiagnosticLevel::Info => info!(entry = %d.entry, kind = %d.kind, "{}", d.message),
            DiagnosticLevel::Warn => warn!(entry = %d.entry, kind = %d.kind, "{}", d.message),
        }
    }
}

/// Records diagnostics in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Vec<Diagnostic>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    /// Diagnostics of a specific kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<&Diagnostic> {
        self.events.iter().filter(|d| d.kind == kind).collect()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events.iter().filter(|d| d.kind == kind).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.events.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let mut sink = MemorySink::new();
        sink.emit(Diagnostic::debug(DiagnosticKind::SpanMerged, "content.xml", "merged T1"));
        sink.emit(Diagnostic::warn(DiagnosticKind::EntrySkipped, "styles.xml", "not present"));

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.count(DiagnosticKind::EntrySkipped), 1);
        assert_eq!(sink.of_kind(DiagnosticKind::SpanMerged)[0].entry, "content.xml");

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_sink_through_mut_reference() {
        fn report<S: DiagnosticSink>(mut sink: S) {
            sink.emit(Diagnostic::info(DiagnosticKind::EntryMerged, "content.xml", "812 bytes"));
        }

        let mut sink = MemorySink::new();
        report(&mut sink);
        report(&mut sink);
        assert_eq!(sink.count(DiagnosticKind::EntryMerged), 2);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::warn(DiagnosticKind::EntrySkipped, "styles.xml", "not present");
        assert_eq!(d.to_string(), "styles.xml: Entry skipped: not present");
        assert!(DiagnosticLevel::Warn > DiagnosticLevel::Debug);
    }
}

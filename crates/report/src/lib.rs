//! Report - Open Document report templates
//!
//! Documents authored in an office suite are turned into templates and
//! merged with data:
//!
//! - split `text:span` runs with the same style are folded back together so
//!   `{{ ... }}` directives typed into the document survive
//! - comments (`office:annotation`) holding `{{range ...}}` / `{{end}}` are
//!   moved around the table row they sit in, so the row repeats
//! - `content.xml` and `styles.xml` are merged against a JSON context
//!
//! ```no_run
//! use mail_merge::{load_context_from_file, JsonConfig};
//! use report::OpenDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = load_context_from_file("invoice.json", JsonConfig::default())?;
//! let mut doc = OpenDocument::open("invoice.odt")?;
//! doc.execute(&data)?;
//! doc.write_file("invoice-out.odt")?;
//! # Ok(())
//! # }
//! ```

mod annotations;
mod diagnostics;
mod document;
mod error;
mod normalize;
mod options;
mod prepare;

pub mod names;
pub mod xml;

pub use annotations::{classify_marker, rewrite_annotations, MarkerKind};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLevel, DiagnosticSink, MemorySink, TracingSink};
pub use document::{DocumentState, OpenDocument, TEMPLATE_ENTRIES};
pub use error::{PrepareError, ReportError, Result};
pub use normalize::merge_spans;
pub use options::{LoopMarkers, PrepareOptions, RenderOptions};
pub use prepare::{normalize, normalize_with, prepare_template, restore_directive_quotes, PrepareContext};

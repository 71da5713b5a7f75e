//! Open Document orchestration
//!
//! An [`OpenDocument`] owns one unpacked package and drives the templated
//! entries through preparation and merging before the package is written
//! back out.

use std::path::Path;

use mail_merge::{MergeEngine, RenderContext};
use store::{Package, StoreError, CONTENT_ENTRY, STYLES_ENTRY};
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, TracingSink};
use crate::error::{ReportError, Result};
use crate::options::RenderOptions;
use crate::prepare::{prepare_template, PrepareContext};

/// Entries run through the merge engine, in merge order
pub const TEMPLATE_ENTRIES: [&str; 2] = [CONTENT_ENTRY, STYLES_ENTRY];

/// Lifecycle of an [`OpenDocument`]
///
/// Writing the package consumes the document, so there is no packaged
/// state to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Package loaded, nothing rewritten yet
    Opened,
    /// Content stream normalized and loop markers placed
    Prepared,
    /// Data merged into every templated entry
    Merged,
}

/// A report template loaded into memory
pub struct OpenDocument<S: DiagnosticSink = TracingSink> {
    package: Package,
    state: DocumentState,
    options: RenderOptions,
    sink: S,
}

impl OpenDocument<TracingSink> {
    /// Unpack a document from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let package = Package::read_from_file(path)?;
        info!("Opened {} ({} entries)", path.display(), package.len());
        Ok(Self::from_package(package))
    }

    /// Unpack a document held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_package(Package::from_bytes(bytes)?))
    }

    pub fn from_package(package: Package) -> Self {
        Self {
            package,
            state: DocumentState::Opened,
            options: RenderOptions::default(),
            sink: TracingSink,
        }
    }
}

impl<S: DiagnosticSink> OpenDocument<S> {
    /// Replace the diagnostic sink
    pub fn with_sink<T: DiagnosticSink>(self, sink: T) -> OpenDocument<T> {
        OpenDocument {
            package: self.package,
            state: self.state,
            options: self.options,
            sink,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Current text of an entry
    pub fn entry(&self, name: &str) -> Result<&str> {
        Ok(self.package.get_str(name)?)
    }

    /// Normalize the content stream and turn loop annotations into markers
    ///
    /// The package then holds a template that can be merged later, by this
    /// document or after being written out and reopened.
    pub fn prepare(&mut self) -> Result<()> {
        if self.state != DocumentState::Opened {
            return Err(ReportError::InvalidState {
                operation: "prepare",
                state: self.state,
            });
        }

        let prepared = self.prepared_content()?;
        let size = prepared.len();
        self.package.insert(CONTENT_ENTRY, prepared);
        self.state = DocumentState::Prepared;
        self.sink.emit(Diagnostic::info(
            DiagnosticKind::EntryPrepared,
            CONTENT_ENTRY,
            format!("{} bytes", size),
        ));
        Ok(())
    }

    /// Merge `data` into every templated entry
    ///
    /// Entries are rendered into scratch buffers; the package only changes
    /// once all of them succeeded.
    pub fn execute(&mut self, data: &RenderContext) -> Result<()> {
        if self.state == DocumentState::Merged {
            return Err(ReportError::InvalidState {
                operation: "execute",
                state: self.state,
            });
        }

        let engine = MergeEngine::new(self.options.merge.clone());
        let mut merged: Vec<(&'static str, String)> = Vec::with_capacity(TEMPLATE_ENTRIES.len());

        for name in TEMPLATE_ENTRIES {
            let template = match name {
                CONTENT_ENTRY if self.state == DocumentState::Opened => self.prepared_content()?,
                _ => match self.package.get_str(name) {
                    Ok(text) => text.to_string(),
                    Err(StoreError::MissingEntry(_)) if name != CONTENT_ENTRY => {
                        self.sink.emit(Diagnostic::warn(
                            DiagnosticKind::EntrySkipped,
                            name,
                            "not present in package",
                        ));
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                },
            };

            let output = engine.merge(name, &template, data)?;
            debug!("Merged {} ({} bytes)", name, output.len());
            merged.push((name, output));
        }

        for (name, output) in merged {
            self.sink.emit(Diagnostic::info(
                DiagnosticKind::EntryMerged,
                name,
                format!("{} bytes", output.len()),
            ));
            self.package.insert(name, output);
        }
        self.state = DocumentState::Merged;
        Ok(())
    }

    /// Package the document and write it to `path`
    ///
    /// The file is replaced atomically; on failure nothing is written.
    pub fn write_file(self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.package.write_to_file(path)?;
        info!("Wrote {}", path.display());
        Ok(())
    }

    /// Package the document into an in-memory archive
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        Ok(self.package.to_bytes()?)
    }

    pub fn into_package(self) -> Package {
        self.package
    }

    fn prepared_content(&mut self) -> Result<String> {
        let raw = self.package.get_str(CONTENT_ENTRY)?;
        let mut ctx = PrepareContext::new(CONTENT_ENTRY, &self.options.prepare, &mut self.sink);
        prepare_template(raw, &mut ctx).map_err(|e| ReportError::from_prepare(CONTENT_ENTRY, e))
    }
}

impl<S: DiagnosticSink> std::fmt::Debug for OpenDocument<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenDocument")
            .field("state", &self.state)
            .field("entries", &self.package.len())
            .field("options", &self.options)
            .finish()
    }
}

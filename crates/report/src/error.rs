//! Error types for report preparation and rendering

use mail_merge::MailMergeError;
use store::StoreError;
use thiserror::Error;

use crate::document::DocumentState;

/// Failures of the preparation pass over a single XML entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    /// Input is not well-formed XML
    #[error("XML parse error: {message}")]
    Parse { message: String },

    /// A loop annotation has no enclosing table row
    #[error("found annotation with {marker:?} but no parent table-row")]
    Structure { marker: String },

    /// The rewritten tree could not be written back out
    #[error("XML write error: {message}")]
    Serialize { message: String },
}

impl PrepareError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn serialize(message: impl Into<String>) -> Self {
        Self::Serialize {
            message: message.into(),
        }
    }
}

impl From<quick_xml::Error> for PrepareError {
    fn from(err: quick_xml::Error) -> Self {
        PrepareError::parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for PrepareError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        PrepareError::parse(format!("Attribute error: {}", err))
    }
}

/// Errors surfaced while rendering a document
#[derive(Debug, Error)]
pub enum ReportError {
    /// An entry is not well-formed XML
    #[error("{entry}: XML parse error: {message}")]
    Parse { entry: String, message: String },

    /// A loop annotation sits outside any table row
    #[error("{entry}: found annotation with {marker:?} but no parent table-row")]
    Structure { entry: String, marker: String },

    /// A prepared entry could not be serialized
    #[error("{entry}: XML write error: {message}")]
    Serialize { entry: String, message: String },

    /// Directive syntax does not parse
    #[error("template: {entry}:{line}: {message}")]
    TemplateSyntax {
        entry: String,
        line: usize,
        message: String,
    },

    /// A directive failed against the render context
    #[error("template: {entry}:{line}: executing: {message}")]
    TemplateExecution {
        entry: String,
        line: usize,
        message: String,
    },

    /// Package could not be read or written
    #[error("Container error: {0}")]
    Container(#[from] StoreError),

    /// Data file missing or malformed
    #[error("Data load error: {0}")]
    DataLoad(#[source] MailMergeError),

    /// Operation invoked out of the document lifecycle
    #[error("Cannot {operation} a document in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: DocumentState,
    },
}

impl ReportError {
    /// Attach the entry name to a preparation failure
    pub fn from_prepare(entry: &str, err: PrepareError) -> Self {
        let entry = entry.to_string();
        match err {
            PrepareError::Parse { message } => Self::Parse { entry, message },
            PrepareError::Structure { marker } => Self::Structure { entry, marker },
            PrepareError::Serialize { message } => Self::Serialize { entry, message },
        }
    }

    /// Name of the entry the error is attributed to, if any
    pub fn entry(&self) -> Option<&str> {
        match self {
            Self::Parse { entry, .. }
            | Self::Structure { entry, .. }
            | Self::Serialize { entry, .. }
            | Self::TemplateSyntax { entry, .. }
            | Self::TemplateExecution { entry, .. } => Some(entry),
            _ => None,
        }
    }
}

impl From<MailMergeError> for ReportError {
    fn from(err: MailMergeError) -> Self {
        match err {
            MailMergeError::TemplateSyntax { name, line, message } => Self::TemplateSyntax {
                entry: name,
                line,
                message,
            },
            MailMergeError::TemplateExecution { name, line, message } => Self::TemplateExecution {
                entry: name,
                line,
                message,
            },
            other => Self::DataLoad(other),
        }
    }
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_error_display() {
        let err = PrepareError::Structure {
            marker: "{{range .X}}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "found annotation with \"{{range .X}}\" but no parent table-row"
        );
    }

    #[test]
    fn test_from_prepare_attaches_entry() {
        let err = ReportError::from_prepare("content.xml", PrepareError::parse("unexpected EOF"));
        assert_eq!(err.entry(), Some("content.xml"));
        assert_eq!(err.to_string(), "content.xml: XML parse error: unexpected EOF");
    }

    #[test]
    fn test_template_errors_keep_their_class() {
        let syntax: ReportError = MailMergeError::TemplateSyntax {
            name: "styles.xml".to_string(),
            line: 3,
            message: "unexpected {{end}}".to_string(),
        }
        .into();
        assert!(matches!(syntax, ReportError::TemplateSyntax { line: 3, .. }));
        assert_eq!(syntax.entry(), Some("styles.xml"));

        let data: ReportError = MailMergeError::FileNotFound("data.json".to_string()).into();
        assert!(matches!(data, ReportError::DataLoad(_)));
        assert_eq!(data.entry(), None);
    }

    #[test]
    fn test_container_error_from_store() {
        let err: ReportError = StoreError::missing_entry("content.xml").into();
        assert_eq!(err.to_string(), "Container error: Missing package entry: content.xml");
    }
}

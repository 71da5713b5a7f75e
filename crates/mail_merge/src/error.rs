//! Error types for mail merge operations

use thiserror::Error;

/// Errors that can occur while loading data or merging templates
#[derive(Debug, Error)]
pub enum MailMergeError {
    /// IO error reading/writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing JSON data
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Data file does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Invalid path expression for JSON traversal
    #[error("Invalid path expression: {0}")]
    InvalidPath(String),

    /// Data is not usable as a render context
    #[error("Invalid data source: {0}")]
    InvalidDataSource(String),

    /// Template text does not parse
    #[error("template: {name}:{line}: {message}")]
    TemplateSyntax {
        name: String,
        line: usize,
        message: String,
    },

    /// Template failed while evaluating against the context
    #[error("template: {name}:{line}: executing: {message}")]
    TemplateExecution {
        name: String,
        line: usize,
        message: String,
    },
}

impl MailMergeError {
    /// Whether this error came from loading the data file rather than from a template
    pub fn is_data_error(&self) -> bool {
        !matches!(
            self,
            Self::TemplateSyntax { .. } | Self::TemplateExecution { .. }
        )
    }
}

/// Result type for mail merge operations
pub type Result<T> = std::result::Result<T, MailMergeError>;

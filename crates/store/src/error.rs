//! Error types for package operations

use thiserror::Error;

/// Errors that can occur while reading, writing or extracting a package
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A required entry is not present in the package
    #[error("Missing package entry: {0}")]
    MissingEntry(String),

    /// Entry name would escape the extraction folder
    #[error("Invalid package entry name: {0}")]
    InvalidEntryName(String),

    /// Entry is expected to hold UTF-8 text but does not
    #[error("Entry {entry} is not valid UTF-8: {source}")]
    Utf8 {
        entry: String,
        #[source]
        source: std::str::Utf8Error,
    },
}

impl StoreError {
    /// Create a missing entry error
    pub fn missing_entry(name: impl Into<String>) -> Self {
        Self::MissingEntry(name.into())
    }
}

/// Result type for package operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::missing_entry("content.xml");
        assert_eq!(err.to_string(), "Missing package entry: content.xml");
    }

    #[test]
    fn test_error_from_zip() {
        let err: StoreError = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(err, StoreError::Zip(_)));
    }
}

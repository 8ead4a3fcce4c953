//! Error kinds for infracc operations

use strum_macros::{Display, IntoStaticStr};

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling logic.
/// Users can match on ErrorKind to decide how to handle specific error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Provider errors
    // =========================================================================
    /// Requested provider identifier is not registered
    UnknownProvider,

    /// A provider with this identifier is already registered
    DuplicateProvider,

    /// A provider's rule configuration failed to load or parse
    ProviderLoadFailed,

    // =========================================================================
    // Graph errors
    // =========================================================================
    /// A rewrite pass required a structural anchor that is absent or ambiguous
    MissingResource,

    /// Resource identifier not present in the graph
    ResourceNotFound,

    /// Malformed resource identifier
    InvalidResourceId,

    /// Graph rewrite pass failed
    PassFailed,

    // =========================================================================
    // Serialization errors
    // =========================================================================
    /// Serialization failed
    SerializationFailed,

    /// Deserialization failed
    DeserializationFailed,

    /// Invalid interchange document format
    InvalidFormat,

    // =========================================================================
    // File/IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::IoFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::UnknownProvider.to_string(), "UnknownProvider");
        assert_eq!(ErrorKind::MissingResource.to_string(), "MissingResource");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::IoFailed.is_retryable());
        assert!(!ErrorKind::MissingResource.is_retryable());
        assert!(!ErrorKind::DuplicateProvider.is_retryable());
    }
}

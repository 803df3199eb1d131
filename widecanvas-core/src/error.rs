//! Error types for preview operations.

use thiserror::Error;

/// Result type for preview operations.
pub type PreviewResult<T> = Result<T, PreviewError>;

/// Errors that can occur in preview, editor, export and storage operations.
///
/// The `Display` output of each variant is the message shown to the user.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// A network request could not be completed.
    #[error("Network error: {0}")]
    Transport(String),

    /// The entity, link or app does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The user has no conversions left.
    #[error("Usage limit reached. Please upgrade your plan.")]
    QuotaExceeded,

    /// The conversion service answered with a non-success status.
    #[error("Failed to convert code")]
    ConversionFailed,

    /// Another mutating operation for the same key is still in flight.
    #[error("Another operation is already in progress for {0}")]
    Busy(String),

    /// A framework identifier outside the catalog was supplied.
    #[error("Unknown framework: {0}")]
    UnknownFramework(String),

    /// Preview dimensions must be positive and finite.
    #[error("Invalid preview dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Rejected width.
        width: f64,
        /// Rejected height.
        height: f64,
    },

    /// The editor overlay is closed.
    #[error("Editor is not open")]
    EditorClosed,

    /// The export dialog preconditions are not met.
    #[error("Export unavailable: {0}")]
    ExportUnavailable(&'static str),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persistence I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else.
    #[error("An unknown error occurred: {0}")]
    Unexpected(String),
}

/// Coarse classification of a [`PreviewError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or transport failure.
    Transport,
    /// Entity or link absent.
    NotFound,
    /// Business-rule rejection because the quota is exhausted.
    QuotaExceeded,
    /// Unknown or unexpected failure.
    Unexpected,
}

impl PreviewError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::ConversionFailed => ErrorKind::Transport,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::QuotaExceeded => ErrorKind::QuotaExceeded,
            Self::Busy(_)
            | Self::UnknownFramework(_)
            | Self::InvalidDimensions { .. }
            | Self::EditorClosed
            | Self::ExportUnavailable(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Message suitable for an inline error or toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

//! Error types for the try-on client.
//!
//! [`SubmissionError`] is the closed taxonomy of failures a try-on submission
//! can end in. Every failure that reaches the orchestrator is one of its
//! variants. [`TryOnError`] is the crate-level error that additionally covers
//! configuration loading, image loading, and I/O.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A specialized `Result` type for try-on client operations.
pub type Result<T> = std::result::Result<T, TryOnError>;

/// Message shown when a submission is attempted without both images.
pub const MISSING_INPUTS_MESSAGE: &str = "Please upload both a portrait and clothing image";

/// Message shown when an input does not declare an image media type.
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid file format. Please upload an image file.";

/// Message shown when an input exceeds the upload size limit.
pub const FILE_TOO_LARGE_MESSAGE: &str =
    "File size too large. Please upload an image smaller than 10MB.";

/// Message shown when a success response carries no image reference.
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Invalid response from server: missing image URL";

/// Message shown when the service cannot be reached.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error: Unable to connect to server. Please check your connection.";

/// Message shown when the service does not answer before the request timeout.
pub const TIMEOUT_MESSAGE: &str =
    "Network error: The server did not respond in time. Please try again.";

/// Message shown for failures that fit no other category.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Which of the two upload slots an input belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    /// The photo of the person.
    Portrait,
    /// The photo of the garment.
    Clothing,
}

impl ImageSlot {
    /// Returns the multipart field name used for this slot.
    #[must_use]
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Clothing => "clothing",
        }
    }
}

impl std::fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Failures a try-on submission can end in.
///
/// The display string of every variant is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// Submission was attempted before both images were selected.
    #[error("{}", MISSING_INPUTS_MESSAGE)]
    MissingInputs,

    /// An input's declared media type is not an image type.
    #[error("{}", INVALID_FORMAT_MESSAGE)]
    InvalidFormat {
        /// Slot of the rejected input.
        slot: ImageSlot,
        /// The declared media type.
        media_type: String,
    },

    /// An input exceeds the upload size limit.
    #[error("{}", FILE_TOO_LARGE_MESSAGE)]
    FileTooLarge {
        /// Slot of the rejected input.
        slot: ImageSlot,
        /// Size of the input in bytes.
        size_bytes: u64,
    },

    /// The service answered with a non-success status.
    #[error("{message}")]
    ServerError {
        /// HTTP status code of the response.
        status: u16,
        /// Response body, or an `HTTP {status}: {reason}` fallback.
        message: String,
    },

    /// The service answered with success but the body lacks the image reference.
    #[error("{}", MALFORMED_RESPONSE_MESSAGE)]
    MalformedResponse,

    /// The request never completed at the transport level.
    #[error("{message}")]
    NetworkError {
        /// User-facing description of the transport failure.
        message: String,
    },

    /// Any failure that fits no other category.
    #[error("{}", UNKNOWN_ERROR_MESSAGE)]
    UnknownError {
        /// Underlying cause, for logs only.
        detail: String,
    },
}

/// Field-less classification of a [`SubmissionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Both images are required.
    MissingInputs,
    /// Input is not an image.
    InvalidFormat,
    /// Input is larger than the limit.
    FileTooLarge,
    /// Non-success HTTP status.
    ServerError,
    /// Success status without an image reference.
    MalformedResponse,
    /// Transport-level failure.
    NetworkError,
    /// Anything else.
    UnknownError,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingInputs => write!(f, "missing_inputs"),
            Self::InvalidFormat => write!(f, "invalid_format"),
            Self::FileTooLarge => write!(f, "file_too_large"),
            Self::ServerError => write!(f, "server_error"),
            Self::MalformedResponse => write!(f, "malformed_response"),
            Self::NetworkError => write!(f, "network_error"),
            Self::UnknownError => write!(f, "unknown_error"),
        }
    }
}

impl SubmissionError {
    /// Creates a `ServerError` with the given status and message.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// Creates a `NetworkError` with the standard connection message.
    #[must_use]
    pub fn network() -> Self {
        Self::NetworkError {
            message: NETWORK_ERROR_MESSAGE.to_string(),
        }
    }

    /// Creates a `NetworkError` for a request that timed out.
    #[must_use]
    pub fn timeout() -> Self {
        Self::NetworkError {
            message: TIMEOUT_MESSAGE.to_string(),
        }
    }

    /// Creates an `UnknownError` recording the underlying cause.
    #[must_use]
    pub fn unknown(detail: impl std::fmt::Display) -> Self {
        Self::UnknownError {
            detail: detail.to_string(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::MissingInputs => FailureKind::MissingInputs,
            Self::InvalidFormat { .. } => FailureKind::InvalidFormat,
            Self::FileTooLarge { .. } => FailureKind::FileTooLarge,
            Self::ServerError { .. } => FailureKind::ServerError,
            Self::MalformedResponse => FailureKind::MalformedResponse,
            Self::NetworkError { .. } => FailureKind::NetworkError,
            Self::UnknownError { .. } => FailureKind::UnknownError,
        }
    }

    /// Returns the HTTP status code, if the service produced one.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the error was raised before any network activity.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingInputs | Self::InvalidFormat { .. } | Self::FileTooLarge { .. }
        )
    }
}

/// Errors that can occur in the try-on client outside the submission flow.
#[derive(Debug, thiserror::Error)]
pub enum TryOnError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your tryon.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Image Loading Errors
    // ========================================================================
    /// Image file was not found at the given path.
    #[error("Image not found: '{path}'\n\nSuggestion: Check the path to the portrait or clothing photo")]
    ImageNotFound {
        /// Path where the image was expected.
        path: PathBuf,
    },

    // ========================================================================
    // Submission Errors
    // ========================================================================
    /// A submission or download failed.
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TryOnError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `ImageNotFound` error.
    #[must_use]
    pub fn image_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ImageNotFound { path: path.into() }
    }
}

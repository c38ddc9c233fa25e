//! Error types for checkrun.
//!
//! Two families live here: [`Error`] covers everything around the runner
//! (configuration, I/O, the CLI), while [`CheckError`] is what a failed
//! [`CheckResult`](crate::core::check::CheckResult) carries. The runner itself
//! never returns an error.

use crate::core::context::CancelReason;
use std::path::PathBuf;
use std::sync::Arc;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by check functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// All possible errors in checkrun.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path where config was expected.
        path: PathBuf,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        /// Description of the parse error.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    ConfigInvalid {
        /// Field name that is invalid.
        field: String,
        /// Description of why it's invalid.
        message: String,
    },

    // =========================================================================
    // Check selection and execution errors
    // =========================================================================
    /// Check not found.
    #[error("Check not found: {name}")]
    CheckNotFound {
        /// Name of the check that wasn't found.
        name: String,
    },

    /// Category not found.
    #[error("Category not found: {name}")]
    CategoryNotFound {
        /// Name of the category that wasn't found.
        name: String,
    },

    /// Check command exited unsuccessfully.
    #[error("Check '{name}' failed: {message}")]
    CheckFailed {
        /// Name of the check that failed.
        name: String,
        /// Error message or output.
        message: String,
        /// Exit code if available.
        exit_code: Option<i32>,
    },

    /// Check timed out.
    #[error("Check '{name}' timed out after {timeout}")]
    CheckTimeout {
        /// Name of the check that timed out.
        name: String,
        /// Timeout duration as string.
        timeout: String,
    },

    /// Command not found.
    #[error("Command not found: {command}")]
    CommandNotFound {
        /// The command that wasn't found.
        command: String,
    },

    // =========================================================================
    // I/O errors
    // =========================================================================
    /// File I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of what failed.
        message: String,
        /// Source error.
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal errors
    // =========================================================================
    /// Internal error (should never happen).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration parse error with source.
    pub fn config_parse_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new invalid configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new I/O error with context.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a new check failed error.
    pub fn check_failed(
        name: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::CheckFailed {
            name: name.into(),
            message: message.into(),
            exit_code,
        }
    }

    /// Returns true if this is a user-correctable error.
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigInvalid { .. }
                | Self::CheckNotFound { .. }
                | Self::CategoryNotFound { .. }
        )
    }

    /// Returns an exit code appropriate for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CheckFailed { exit_code, .. } => exit_code.unwrap_or(1),
            Self::CheckTimeout { .. } => 124, // Standard timeout exit code
            Self::ConfigNotFound { .. } | Self::ConfigParse { .. } | Self::ConfigInvalid { .. } => {
                78
            }, // EX_CONFIG
            Self::CheckNotFound { .. } | Self::CategoryNotFound { .. } => 64, // EX_USAGE
            _ => 1,
        }
    }
}

/// Why a single check failed.
///
/// Cloneable so that results can be copied out of a run; the original error
/// returned by the check is kept behind an [`Arc`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckError {
    /// The check's function returned an error.
    #[error("{0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync>),

    /// The check panicked; holds the panic payload rendered as text.
    #[error("panic: {0}")]
    Panicked(String),

    /// The run was cancelled before the check started.
    #[error("{0}")]
    Cancelled(CancelReason),
}

impl CheckError {
    /// Wraps an error returned by a check function.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(Arc::from(err.into()))
    }

    /// Returns true if the failure came from a panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    /// Returns true if the check never ran because of cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl From<CancelReason> for CheckError {
    fn from(reason: CancelReason) -> Self {
        Self::Cancelled(reason)
    }
}

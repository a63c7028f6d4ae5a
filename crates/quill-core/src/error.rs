//! Error types for quill-core

use thiserror::Error;

/// Result type alias using quill-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quill-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No valid credential is available; the caller should prompt re-login
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The remote notification API could not be reached or returned an error
    #[error("Remote API unavailable: {0}")]
    RemoteUnavailable(String),

    /// The persisted cache could not be read or written
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the next scheduled poll can be expected to retry naturally.
    ///
    /// Recoverable failures are logged and swallowed by the scheduler;
    /// anything else is surfaced to the caller.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::RemoteUnavailable(_))
    }
}

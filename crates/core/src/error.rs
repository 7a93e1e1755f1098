//! Unified error types for shellcache.
//!
//! Display strings lead with a stable code so log lines and tool errors can
//! be matched without parsing the detail.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type shared by the store, the engine and the server.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be parsed or uses an unsupported scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Namespace name does not follow the `{kind}-v{version}` form.
    #[error("INVALID_NAMESPACE: {0}")]
    InvalidNamespace(String),

    /// Origin unreachable, connection reset, DNS failure.
    #[error("NETWORK_ERROR: {0}")]
    NetworkError(String),

    /// Origin did not answer in time.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Origin response exceeded the configured body limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// The durable store could not be opened, read or written.
    #[error("STORAGE_UNAVAILABLE: {0}")]
    StorageUnavailable(String),

    /// A write was rejected for capacity.
    #[error("STORAGE_QUOTA_EXCEEDED: {0}")]
    StorageQuotaExceeded(String),

    /// Lookup miss.
    #[error("NO_CACHE_ENTRY: {0}")]
    NoCacheEntry(String),

    /// An install-time asset could not be fetched.
    #[error("MANIFEST_FETCH_FAILED: {url}: {reason}")]
    ManifestFetchFailed { url: String, reason: String },

    /// Migration failed to apply.
    #[error("MIGRATION_FAILED: {0}")]
    MigrationFailed(String),

    /// Lifecycle step requested from the wrong state.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),

    /// The control loop is gone.
    #[error("CONTROL_CHANNEL_CLOSED")]
    ControlChannelClosed,
}

impl Error {
    /// True for failures that mean "no response came back from the origin".
    ///
    /// Timeouts and oversize bodies count: the caller never got a usable
    /// response, which is what the fallback paths key on.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkError(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_))
    }

    /// True for durable-store failures that resolution absorbs.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_) | Error::StorageQuotaExceeded(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::StorageUnavailable("connection closed".into()),
            tokio_rusqlite::Error::Close((_, e)) => Error::from(e),
            _ => Error::StorageUnavailable("connection closed".into()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => Error::from(e),
            other => Error::StorageUnavailable(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::DiskFull) {
            Error::StorageQuotaExceeded(err.to_string())
        } else {
            Error::StorageUnavailable(err.to_string())
        }
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::InvalidNamespace(_) => -32004,
            Error::NetworkError(_) => -32005,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::StorageUnavailable(_) | Error::MigrationFailed(_) => -32002,
            Error::StorageQuotaExceeded(_) => -32008,
            Error::NoCacheEntry(_) => -32001,
            Error::ManifestFetchFailed { .. } => -32009,
            Error::Lifecycle(_) => -32010,
            Error::ControlChannelClosed => -32011,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

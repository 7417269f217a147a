//! Unified error types for sevacache.
//!
//! Failures crossing the request-interceptor boundary are always converted
//! into a served response; these variants only travel between internal
//! components.

use tokio_rusqlite::rusqlite;

/// Unified error types for the cache engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored record could not be decoded.
    #[error("STORE_ERROR: corrupt record: {0}")]
    CorruptRecord(String),

    /// Attempted to cache a response with a non-success status.
    #[error("NOT_CACHEABLE: status {0}")]
    NotCacheable(u16),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The transport client could not be constructed.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// Network call failed (DNS, connect, timeout, mid-body).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Response body exceeded the configured limit.
    #[error("BODY_TOO_LARGE: {0}")]
    BodyTooLarge(String),

    /// A critical asset could not be populated during installation.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Lifecycle operation called from the wrong phase.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

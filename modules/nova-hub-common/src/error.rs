use thiserror::Error;

/// The hub's error taxonomy as real types. Only the HTTP adapter in
/// `nova-hub-server` converts these into status codes; every other crate
/// propagates a `NovaHubError` instead of a raw runtime exception.
#[derive(Error, Debug)]
pub enum NovaHubError {
    /// Filename grammar, game/league mismatch, nodelist-upload attempt.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or inactive membership, wrong bbs_index for src/dst.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Unknown packet or league where auto-create is not permitted.
    #[error("not found: {0}")]
    NotFound(String),

    /// Disk ENOSPC, emulator fork failure, watched directory removed.
    #[error("transient I/O error: {0}")]
    TransientIo(String),

    /// Emulator wall-clock timeout.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Duplicate unresolved alert, duplicate outbound filename, etc.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// A policy decision (e.g. "league auto-create disallowed on download").
    #[error("policy violation: {0}")]
    Policy(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type HubResult<T> = std::result::Result<T, NovaHubError>;

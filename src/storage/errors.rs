use thiserror::Error;

/// Errors that can arise while interacting with the persisted property slots.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[cfg(feature = "sled-backend")]
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around JSON serialization errors.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, file locks, archives).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes were not valid UTF-8.
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// A snapshot id that is not listed in the snapshot index.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Snapshot archive does not match its recorded checksum.
    #[error("snapshot checksum mismatch for {0}")]
    ChecksumMismatch(String),

    /// Configured backend is not compiled into this build.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),
}

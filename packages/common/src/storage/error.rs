/// Errors returned by a [`MediaStore`](super::MediaStore).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Local I/O failed (reading the staged file, writing the object).
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The store answered but refused the request.
    #[error("media store rejected the request: {0}")]
    Rejected(String),
    /// The store could not be reached or misbehaved at the transport level.
    #[error("media store unavailable: {0}")]
    Unavailable(String),
    /// The public id cannot name an object in this store.
    #[error("invalid public id: {0:?}")]
    InvalidPublicId(String),
    /// The store is missing required configuration.
    #[error("media store misconfigured: {0}")]
    Config(String),
}

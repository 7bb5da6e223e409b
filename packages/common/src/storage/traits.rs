use async_trait::async_trait;

use super::error::StorageError;
use crate::staging::StagedFile;

/// Location of an object after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Canonical object identifier, used for deletion.
    pub public_id: String,
    /// Durable public URL of the object.
    pub url: String,
}

/// Remote store holding post media.
///
/// Object URLs follow the `.../{public_id}.{ext}` convention so the id can
/// also be recovered with [`public_id_from_url`](super::public_id_from_url).
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload a staged file and return where it now lives.
    async fn upload(&self, file: &StagedFile) -> Result<StoredMedia, StorageError>;

    /// Delete an object by its public id.
    ///
    /// Returns `true` if an object was deleted, `false` if none existed.
    async fn delete(&self, public_id: &str) -> Result<bool, StorageError>;
}

mod error;
mod public_id;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

use std::sync::Arc;

pub use error::StorageError;
pub use public_id::{new_public_id, public_id_from_url, validate_public_id};
pub use traits::{MediaStore, StoredMedia};

use crate::config::{StorageBackend, StorageConfig};

/// Build the media store selected by `config.backend`.
pub async fn build_media_store(
    config: &StorageConfig,
) -> Result<Arc<dyn MediaStore>, StorageError> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store = filesystem::FilesystemMediaStore::new(
                config.filesystem.root.clone(),
                config.filesystem.public_base_url.clone(),
            )
            .await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => {
            let s3_config = config
                .s3
                .as_ref()
                .ok_or_else(|| StorageError::Config("storage.s3 section is missing".into()))?;
            Ok(Arc::new(s3::S3MediaStore::new(s3_config)?))
        }
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => Err(StorageError::Config(
            "built without the object-storage feature".into(),
        )),
    }
}

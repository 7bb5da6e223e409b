use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::public_id::{new_public_id, validate_public_id};
use super::traits::{MediaStore, StoredMedia};
use crate::staging::{IMAGE_EXTENSIONS, StagedFile};

/// Filesystem-backed media store.
///
/// Objects are stored flat as `{root}/{public_id}.{ext}` and are expected to
/// be served at `{public_base_url}/{public_id}.{ext}`.
pub struct FilesystemMediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemMediaStore {
    pub async fn new(root: PathBuf, public_base_url: String) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn object_path(&self, public_id: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{public_id}.{extension}"))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    async fn upload(&self, file: &StagedFile) -> Result<StoredMedia, StorageError> {
        let public_id = new_public_id();
        let object_path = self.object_path(&public_id, file.extension());

        // Copy then rename so a reader never observes a half-written object.
        let temp_path = self.temp_path();
        if let Err(e) = fs::copy(file.path(), &temp_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(StoredMedia {
            url: format!(
                "{}/{}.{}",
                self.public_base_url,
                public_id,
                file.extension()
            ),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<bool, StorageError> {
        validate_public_id(public_id)?;

        let mut deleted = false;
        for ext in IMAGE_EXTENSIONS {
            match fs::remove_file(self.object_path(public_id, ext)).await {
                Ok(()) => deleted = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(deleted)
    }
}

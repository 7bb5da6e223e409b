use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::debug;

use super::error::StorageError;
use super::public_id::{new_public_id, validate_public_id};
use super::traits::{MediaStore, StoredMedia};
use crate::config::S3StorageConfig;
use crate::staging::StagedFile;

/// S3-compatible media store.
///
/// Objects are keyed `{key_prefix}{public_id}.{ext}` and exposed at
/// `{public_base_url}/{key}`.
pub struct S3MediaStore {
    bucket: Box<Bucket>,
    key_prefix: String,
    public_base_url: String,
}

impl S3MediaStore {
    pub fn new(config: &S3StorageConfig) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Config(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            key_prefix: config.key_prefix.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn key(&self, public_id: &str, extension: &str) -> String {
        format!("{}{}.{}", self.key_prefix, public_id, extension)
    }
}

fn check_status(status: u16, action: &str) -> Result<(), StorageError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(StorageError::Rejected(format!("{action} returned HTTP {status}")))
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(&self, file: &StagedFile) -> Result<StoredMedia, StorageError> {
        let data = tokio::fs::read(file.path()).await?;
        let public_id = new_public_id();
        let key = self.key(&public_id, file.extension());

        let response = self
            .bucket
            .put_object_with_content_type(&key, &data, file.content_type())
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        check_status(response.status_code(), "PUT")?;

        debug!(key = %key, size = data.len(), "Uploaded object");
        Ok(StoredMedia {
            url: format!("{}/{}", self.public_base_url, key),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<bool, StorageError> {
        validate_public_id(public_id)?;

        // The extension is not part of the id, so find the key by prefix.
        let prefix = format!("{}{}.", self.key_prefix, public_id);
        let listing = self
            .bucket
            .list(prefix, None)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        let mut deleted = false;
        for object in listing.into_iter().flat_map(|page| page.contents) {
            let response = self
                .bucket
                .delete_object(&object.key)
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
            check_status(response.status_code(), "DELETE")?;
            debug!(key = %object.key, "Deleted object");
            deleted = true;
        }
        Ok(deleted)
    }
}

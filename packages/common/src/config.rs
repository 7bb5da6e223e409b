use std::path::PathBuf;

use serde::Deserialize;

/// Which remote object store backs post media.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Objects are written under a local root and served by the API itself.
    #[default]
    Filesystem,
    /// Objects are written to an S3-compatible bucket.
    S3,
}

/// Media storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Upper bound for a single remote call (upload, delete, record write).
    /// Default: 30.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub filesystem: FilesystemStorageConfig,
    /// Required when `backend = "s3"`.
    pub s3: Option<S3StorageConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemStorageConfig {
    /// Directory holding uploaded objects. Default: "./data/media".
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
    /// URL prefix under which `root` is publicly reachable.
    /// Default: "http://127.0.0.1:3000/media".
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Key prefix inside the bucket, e.g. "posts/". Default: "".
    #[serde(default)]
    pub key_prefix: String,
    /// Public URL prefix for stored objects. Object URLs are
    /// `{public_base_url}/{key}`.
    pub public_base_url: String,
    #[serde(default)]
    pub path_style: bool,
}

/// Staging area for inbound uploads.
#[derive(Debug, Deserialize, Clone)]
pub struct StagingConfig {
    /// Directory for staged files. Default: "./data/uploads".
    #[serde(default = "default_staging_dir")]
    pub dir: PathBuf,
    /// Maximum accepted file size in bytes. Default: 5 MiB.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}
fn default_media_root() -> PathBuf {
    PathBuf::from("./data/media")
}
fn default_public_base_url() -> String {
    "http://127.0.0.1:3000/media".into()
}
fn default_staging_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}
fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

impl Default for FilesystemStorageConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            public_base_url: default_public_base_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            request_timeout_secs: default_request_timeout_secs(),
            filesystem: FilesystemStorageConfig::default(),
            s3: None,
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: default_staging_dir(),
            max_file_size: default_max_file_size(),
        }
    }
}

pub mod config;
pub mod staging;
pub mod storage;

pub use config::{StagingConfig, StorageBackend, StorageConfig};

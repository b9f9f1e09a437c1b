use std::sync::Arc;

use super::config::{BackendKind, StorageConfig};
use super::error::{StorageError, StorageResult};
use super::local::LocalStorage;
use super::provider::ObjectStorage;
use super::s3::S3CompatibleStorage;
use crate::util::timing::{measure_dur_async, TimingLevel};

/// Factory for creating object storages
pub struct StorageProviderFactory;

impl StorageProviderFactory {
    /// Create an object storage from a configuration.
    ///
    /// The configuration is validated before any client is built, so an
    /// incomplete configuration fails without touching the network.
    ///
    /// # Arguments
    ///
    /// * `config` - The storage configuration specifying the backend and its settings
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok(Arc<dyn ObjectStorage>)` - A thread-safe reference to the initialized storage
    /// * `Err(StorageError)` - If the storage cannot be created
    ///
    /// # Errors
    ///
    /// This function will return a `StorageError::ConfigError` if:
    /// * A field required by the backend is missing or blank
    /// * The AWS region is not a known region identifier
    /// * A tuning option cannot be parsed
    /// * The local root path does not exist
    pub async fn from_config(config: StorageConfig) -> StorageResult<Arc<dyn ObjectStorage>> {
        config.validate()?;
        let backend = config.backend;
        measure_dur_async(
            &format!("build_storage backend={}", backend),
            TimingLevel::Info,
            async move {
                let storage: Arc<dyn ObjectStorage> = match backend {
                    BackendKind::Local => Arc::new(LocalStorage::new(config)?),
                    BackendKind::Aws | BackendKind::Minio | BackendKind::Oci => {
                        Arc::new(S3CompatibleStorage::new(config).await?)
                    }
                };
                Ok::<_, StorageError>(storage)
            },
        )
        .await
    }
}

// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::error::{StorageError, StorageResult};

/// Storage backend type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Amazon S3
    Aws,
    /// MinIO or any other self-hosted S3 endpoint
    Minio,
    /// OCI Object Storage through its S3 compatibility API
    Oci,
    /// Buckets as directories under a local root path
    Local,
}

impl BackendKind {
    /// Lowercase name, as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Aws => "aws",
            BackendKind::Minio => "minio",
            BackendKind::Oci => "oci",
            BackendKind::Local => "local",
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" | "s3" => Ok(BackendKind::Aws),
            "minio" => Ok(BackendKind::Minio),
            "oci" | "oracle" => Ok(BackendKind::Oci),
            "local" | "file" => Ok(BackendKind::Local),
            _ => Err(StorageError::ConfigError(format!(
                "Unknown storage backend: {}",
                s
            ))),
        }
    }
}

/// Default multipart part size (8 MiB).
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

/// Smallest part size S3 accepts for all but the last part (5 MiB).
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Options consumed by client construction rather than passed through.
pub(crate) const TUNING_OPTIONS: [&str; 4] = [
    "timeout",
    "connect_timeout",
    "max_retries",
    "multipart_part_size",
];

/// Configuration for one storage backend.
///
/// Field names follow the S3 vocabulary; the property names used by older
/// deployments (`accessKey`, `secretKey`, `regions`, `bucket`) are accepted as
/// aliases when deserializing.
///
/// # Examples
///
/// ## MinIO
/// ```
/// use unistore::storage::StorageConfig;
///
/// let config = StorageConfig::minio()
///     .with_endpoint("localhost:9000")
///     .with_credentials("minioadmin", "minioadmin")
///     .with_bucket("b1");
/// assert!(config.validate().is_ok());
/// ```
///
/// ## AWS S3
/// ```
/// use unistore::storage::StorageConfig;
///
/// // Without keys the ambient credential chain is used.
/// let config = StorageConfig::aws()
///     .with_region("eu-west-1")
///     .with_bucket("my-bucket");
/// ```
///
/// ## OCI
/// ```
/// use unistore::storage::StorageConfig;
///
/// let config = StorageConfig::oci()
///     .with_namespace("axaxnpcrorw5")
///     .with_region("us-ashburn-1")
///     .with_credentials("ACCESS_KEY", "SECRET_KEY");
/// ```
///
/// ## Local
/// ```
/// use unistore::storage::StorageConfig;
///
/// let config = StorageConfig::local().with_option("path", "/tmp/buckets");
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(rename = "type")]
    pub backend: BackendKind,

    /// Service endpoint (required for MinIO, optional override for AWS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Region identifier
    #[serde(
        default,
        alias = "regions",
        skip_serializing_if = "Option::is_none"
    )]
    pub region: Option<String>,

    /// OCI object storage namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(
        default,
        alias = "access_key",
        alias = "accessKeyId",
        alias = "accessKey",
        alias = "accesskey",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_key_id: Option<String>,

    #[serde(
        default,
        alias = "secret_key",
        alias = "secretAccessKey",
        alias = "secretKey",
        alias = "secretkey",
        skip_serializing_if = "Option::is_none"
    )]
    pub secret_access_key: Option<String>,

    /// Default bucket used by [`init_default_bucket`](super::ObjectStorage::init_default_bucket)
    #[serde(
        default,
        alias = "bucket",
        alias = "bucketName",
        skip_serializing_if = "Option::is_none"
    )]
    pub bucket_name: Option<String>,

    /// OCI SDK configuration file (native API only)
    #[serde(
        default,
        alias = "ociConfigFilePath",
        alias = "configFilePath",
        skip_serializing_if = "Option::is_none"
    )]
    pub config_file_path: Option<String>,

    /// Public URL prefix objects are served under
    #[serde(
        default,
        alias = "cdnPrefix",
        skip_serializing_if = "Option::is_none"
    )]
    pub cdn_prefix: Option<String>,

    /// Tuning and backend-specific options
    ///
    /// Common options:
    /// - timeout: per-attempt request timeout in seconds ("0"/"disabled" for none)
    /// - connect_timeout: connect timeout in seconds ("0"/"disabled" for none)
    /// - max_retries: retries performed by the SDK after the first attempt
    /// - multipart_part_size: part size in bytes for multipart uploads
    ///
    /// AWS:
    /// - force_path_style: "true" for path-style addressing on custom endpoints
    ///
    /// MinIO:
    /// - secure: "true" to use https for endpoints given without a scheme
    ///
    /// Local:
    /// - path: Root directory holding one sub-directory per bucket
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl StorageConfig {
    /// Create a new configuration for the given backend with default options.
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            endpoint: None,
            region: None,
            namespace: None,
            access_key_id: None,
            secret_access_key: None,
            bucket_name: None,
            config_file_path: None,
            cdn_prefix: None,
            options: Self::default_options(),
        }
    }

    pub fn aws() -> Self {
        Self::new(BackendKind::Aws)
    }

    pub fn minio() -> Self {
        Self::new(BackendKind::Minio)
    }

    pub fn oci() -> Self {
        Self::new(BackendKind::Oci)
    }

    /// Local directory backend. Local storage has no network tuning, so the
    /// option map starts empty.
    pub fn local() -> Self {
        Self {
            options: HashMap::new(),
            ..Self::new(BackendKind::Local)
        }
    }

    /// Parse a configuration from a JSON document.
    ///
    /// Options missing from the document keep their defaults.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let mut config: StorageConfig = serde_json::from_str(json)
            .map_err(|e| StorageError::ConfigError(format!("Invalid configuration: {}", e)))?;
        if config.backend != BackendKind::Local {
            let mut options = Self::default_options();
            options.extend(config.options);
            config.options = options;
        }
        Ok(config)
    }

    /// Get default options for network backends.
    ///
    /// # Returns
    ///
    /// A HashMap containing default timeout, retry and multipart settings.
    pub fn default_options() -> HashMap<String, String> {
        [
            ("timeout", "1200"),
            ("connect_timeout", "30"),
            ("max_retries", "3"),
            ("multipart_part_size", "8388608"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the access key id and secret together.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket_name = Some(bucket.into());
        self
    }

    pub fn with_config_file_path(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    pub fn with_cdn_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cdn_prefix = Some(prefix.into());
        self
    }

    /// Add a configuration option.
    ///
    /// # Arguments
    ///
    /// * `key` - The option key
    /// * `value` - The option value
    ///
    /// # Returns
    ///
    /// The `StorageConfig` instance with the added option (for method chaining).
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple configuration options.
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    /// Get a configuration option.
    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// Options other than the timeout, retry and part-size tuning knobs.
    pub fn clean_options(&self) -> HashMap<String, String> {
        self.options
            .iter()
            .filter(|(k, _)| !TUNING_OPTIONS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// True when the option is set to "true" (case-insensitive).
    pub(crate) fn flag(&self, key: &str) -> bool {
        self.options
            .get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Get the backend type as a string.
    pub fn backend_str(&self) -> &str {
        self.backend.as_str()
    }

    /// Both static credential fields are present and non-blank.
    pub fn has_static_credentials(&self) -> bool {
        !is_blank(&self.access_key_id) && !is_blank(&self.secret_access_key)
    }

    /// Duration option in whole seconds; `0` or `disabled` turns it off.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` for anything that is not a number.
    pub fn seconds_option(&self, key: &str) -> StorageResult<Option<Duration>> {
        let value = match self.options.get(key).map(|v| v.trim()) {
            None | Some("") | Some("0") => return Ok(None),
            Some(v) if v.eq_ignore_ascii_case("disabled") => return Ok(None),
            Some(v) => v,
        };
        let secs: u64 = value.parse().map_err(|_| {
            StorageError::ConfigError(format!(
                "Option '{}' must be a number of seconds or 'disabled', got '{}'",
                key, value
            ))
        })?;
        Ok(Some(Duration::from_secs(secs)))
    }

    /// Number of SDK retries after the first attempt, if configured.
    pub fn max_retries(&self) -> StorageResult<Option<u32>> {
        match self.options.get("max_retries").map(|v| v.trim()) {
            None | Some("") => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| {
                StorageError::ConfigError(format!(
                    "Option 'max_retries' must be a non-negative integer, got '{}'",
                    v
                ))
            }),
        }
    }

    /// Multipart part size in bytes, raised to [`MIN_PART_SIZE`] when smaller.
    pub fn multipart_part_size(&self) -> StorageResult<usize> {
        let size = match self.options.get("multipart_part_size").map(|v| v.trim()) {
            None | Some("") => DEFAULT_PART_SIZE,
            Some(v) => v.parse().map_err(|_| {
                StorageError::ConfigError(format!(
                    "Option 'multipart_part_size' must be a size in bytes, got '{}'",
                    v
                ))
            })?,
        };
        Ok(size.max(MIN_PART_SIZE))
    }

    /// Check that every field the backend needs is present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` naming the missing field (or field
    /// group, for OCI) when the configuration cannot produce a client.
    pub fn validate(&self) -> StorageResult<()> {
        match self.backend {
            BackendKind::Aws => {
                require(&self.region, "AWS", "region")?;
            }
            BackendKind::Minio => {
                require(&self.endpoint, "MinIO", "endpoint")?;
                require(&self.access_key_id, "MinIO", "access_key_id")?;
                require(&self.secret_access_key, "MinIO", "secret_access_key")?;
            }
            BackendKind::Oci => {
                let credentials = missing(&[
                    ("access_key_id", &self.access_key_id),
                    ("secret_access_key", &self.secret_access_key),
                ]);
                if !credentials.is_empty() {
                    let hint = if is_blank(&self.config_file_path) {
                        ""
                    } else {
                        " (the native OCI API configured by config_file_path is not supported; \
                         use customer secret keys with the S3 compatibility API)"
                    };
                    return Err(StorageError::ConfigError(format!(
                        "OCI requires non-blank access_key_id, secret_access_key; missing: {}{}",
                        credentials.join(", "),
                        hint
                    )));
                }
                let location = missing(&[
                    ("namespace", &self.namespace),
                    ("region", &self.region),
                ]);
                if !location.is_empty() {
                    return Err(StorageError::ConfigError(format!(
                        "OCI requires non-blank namespace, region; missing: {}",
                        location.join(", ")
                    )));
                }
            }
            BackendKind::Local => {
                let path = self.options.get("path").filter(|p| !p.trim().is_empty());
                let path = path.ok_or_else(|| {
                    StorageError::ConfigError("Local storage requires 'path' option".to_string())
                })?;
                if !Path::new(path).is_dir() {
                    return Err(StorageError::ConfigError(format!(
                        "Local storage path is not an existing directory: {}",
                        path
                    )));
                }
            }
        }
        Ok(())
    }

    /// Public URL of an object under the configured CDN prefix.
    pub fn cdn_url(&self, bucket: &str, key: &str) -> Option<String> {
        let prefix = self.cdn_prefix.as_deref().filter(|p| !p.trim().is_empty())?;
        Some(format!(
            "{}/{}/{}",
            prefix.trim_end_matches('/'),
            bucket,
            key.trim_start_matches('/')
        ))
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn require(value: &Option<String>, backend: &str, field: &str) -> StorageResult<()> {
    if is_blank(value) {
        return Err(StorageError::ConfigError(format!(
            "{} requires non-blank '{}'",
            backend, field
        )));
    }
    Ok(())
}

fn missing<'a>(fields: &[(&'a str, &Option<String>)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(name, _)| *name)
        .collect()
}

impl Debug for StorageConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("namespace", &self.namespace)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("bucket_name", &self.bucket_name)
            .field("config_file_path", &self.config_file_path)
            .field("cdn_prefix", &self.cdn_prefix)
            .field("options", &self.options)
            .finish()
    }
}

impl From<StorageConfig> for String {
    fn from(config: StorageConfig) -> Self {
        config.backend_str().to_string()
    }
}

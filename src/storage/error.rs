// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use thiserror::Error;

/// Boxed cause carried by backend failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`StorageError`].
///
/// Callers branch on this to decide whether to abort (`Config`, `InvalidInput`),
/// treat the result as absence (`NotFound`) or retry/ignore (`Storage`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing configuration, raised before any backend call
    Config,
    /// The backend signalled that the bucket or object does not exist
    NotFound,
    /// Any other failure while talking to the backend
    Storage,
    /// A request argument was rejected locally
    InvalidInput,
}

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {}", target(.bucket, .key.as_deref()))]
    NotFound { bucket: String, key: Option<String> },

    #[error("Storage error in {operation} ({}): {source}", target(.bucket, .key.as_deref()))]
    Backend {
        operation: &'static str,
        bucket: String,
        key: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error("Interrupted during {operation} ({})", target(.bucket, .key.as_deref()))]
    Interrupted {
        operation: &'static str,
        bucket: String,
        key: Option<String>,
    },

    #[error("Operation {operation} is not supported by the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

fn target(bucket: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => format!("bucket={}, key={}", bucket, key),
        None => format!("bucket={}", bucket),
    }
}

impl StorageError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::ConfigError(_) => ErrorKind::Config,
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::InvalidInput(_) => ErrorKind::InvalidInput,
            StorageError::ObjectStoreError(object_store::Error::NotFound { .. }) => {
                ErrorKind::NotFound
            }
            StorageError::Backend { .. }
            | StorageError::Interrupted { .. }
            | StorageError::Unsupported { .. }
            | StorageError::IoError(_)
            | StorageError::ObjectStoreError(_)
            | StorageError::UrlParseError(_) => ErrorKind::Storage,
        }
    }

    /// Shorthand for `self.kind() == ErrorKind::NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Wrap an arbitrary backend failure with bucket and object context.
    pub fn backend(
        operation: &'static str,
        bucket: impl Into<String>,
        key: Option<&str>,
        source: impl Into<BoxError>,
    ) -> Self {
        StorageError::Backend {
            operation,
            bucket: bucket.into(),
            key: key.map(str::to_string),
            source: source.into(),
        }
    }

    pub fn not_found(bucket: impl Into<String>, key: Option<&str>) -> Self {
        StorageError::NotFound {
            bucket: bucket.into(),
            key: key.map(str::to_string),
        }
    }

    pub fn interrupted(operation: &'static str, bucket: impl Into<String>, key: &str) -> Self {
        StorageError::Interrupted {
            operation,
            bucket: bucket.into(),
            key: Some(key.to_string()),
        }
    }

    /// Bucket named by the error, if it carries one.
    pub fn bucket(&self) -> Option<&str> {
        match self {
            StorageError::NotFound { bucket, .. }
            | StorageError::Backend { bucket, .. }
            | StorageError::Interrupted { bucket, .. } => Some(bucket),
            _ => None,
        }
    }

    /// Object key named by the error, if it carries one.
    pub fn key(&self) -> Option<&str> {
        match self {
            StorageError::NotFound { key, .. }
            | StorageError::Backend { key, .. }
            | StorageError::Interrupted { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_config_error() {
        let error = StorageError::ConfigError("Invalid configuration".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration"
        );
        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_not_found_with_key() {
        let error = StorageError::not_found("b1", Some("f.txt"));
        assert_eq!(error.to_string(), "Not found: bucket=b1, key=f.txt");
        assert!(error.is_not_found());
        assert_eq!(error.bucket(), Some("b1"));
        assert_eq!(error.key(), Some("f.txt"));
    }

    #[test]
    fn test_not_found_bucket_only() {
        let error = StorageError::not_found("b1", None);
        assert_eq!(error.to_string(), "Not found: bucket=b1");
        assert_eq!(error.key(), None);
    }

    #[test]
    fn test_backend_error_carries_context_and_source() {
        let cause = io::Error::new(io::ErrorKind::ConnectionReset, "connection reset");
        let error = StorageError::backend("put_object", "b1", Some("a/b.txt"), cause);

        assert_eq!(error.kind(), ErrorKind::Storage);
        let msg = error.to_string();
        assert!(msg.contains("put_object"));
        assert!(msg.contains("bucket=b1, key=a/b.txt"));
        assert!(msg.contains("connection reset"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_interrupted_is_storage_kind() {
        let error = StorageError::interrupted("put_object_multipart", "b1", "big.bin");
        assert_eq!(error.kind(), ErrorKind::Storage);
        assert!(error.to_string().contains("Interrupted"));
        assert_eq!(error.key(), Some("big.bin"));
    }

    #[test]
    fn test_unsupported() {
        let error = StorageError::Unsupported {
            operation: "presign_url",
            backend: "local",
        };
        assert_eq!(
            error.to_string(),
            "Operation presign_url is not supported by the local backend"
        );
        assert_eq!(error.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_invalid_input_kind() {
        let error = StorageError::InvalidInput("expiry too long".to_string());
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let storage_error: StorageError = io_error.into();

        match storage_error {
            StorageError::IoError(_) => {
                assert!(storage_error.to_string().contains("IO error"));
            }
            _ => panic!("Expected IoError variant"),
        }
    }

    #[test]
    fn test_object_store_not_found_is_not_found_kind() {
        let error: StorageError = object_store::Error::NotFound {
            path: "b1/missing".to_string(),
            source: "missing".into(),
        }
        .into();
        assert!(error.is_not_found());
    }

    #[test]
    fn test_url_parse_error_conversion() {
        let url_error = url::ParseError::EmptyHost;
        let storage_error: StorageError = url_error.into();

        match storage_error {
            StorageError::UrlParseError(_) => {
                assert!(storage_error.to_string().contains("URL parse error"));
            }
            _ => panic!("Expected UrlParseError variant"),
        }
    }

    #[test]
    fn test_storage_result_err() {
        let result: StorageResult<i32> = Err(StorageError::ConfigError("error".to_string()));
        assert!(result.is_err());
    }
}

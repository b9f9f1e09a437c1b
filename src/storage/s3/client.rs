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

//! Construction of `aws_sdk_s3::Client` for the S3-protocol backends.

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{
    Builder, Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::Client;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::storage::config::{BackendKind, StorageConfig};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::oci;

/// Region used when a MinIO configuration does not name one.
pub const DEFAULT_MINIO_REGION: &str = "us-east-1";

static AWS_REGION: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^(us|eu|ap|sa|ca|me|af|il|mx|cn|us-gov|us-iso|us-isob)-[a-z]+-\d+$")
});

/// Check that `region` looks like an AWS region identifier.
pub(crate) fn validate_aws_region(region: &str) -> StorageResult<()> {
    let pattern = AWS_REGION
        .as_ref()
        .map_err(|e| StorageError::ConfigError(format!("Invalid region pattern: {}", e)))?;
    if pattern.is_match(region) {
        Ok(())
    } else {
        Err(StorageError::ConfigError(format!(
            "Unknown AWS region: {}",
            region
        )))
    }
}

/// Prefix a scheme onto endpoints given as `host:port`.
pub(crate) fn normalize_endpoint(endpoint: &str, secure: bool) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else if secure {
        format!("https://{}", endpoint)
    } else {
        format!("http://{}", endpoint)
    }
}

/// Build the SDK client for an S3-protocol backend.
///
/// # Errors
///
/// Returns `StorageError::ConfigError` when the configuration is incomplete,
/// names an unknown AWS region or carries malformed tuning options.
pub(crate) async fn build_client(config: &StorageConfig) -> StorageResult<Client> {
    let builder = match config.backend {
        BackendKind::Aws => aws_builder(config).await?,
        BackendKind::Minio => minio_builder(config)?,
        BackendKind::Oci => oci_builder(config)?,
        BackendKind::Local => {
            return Err(StorageError::ConfigError(
                "Local storage does not use an S3 client".to_string(),
            ))
        }
    };
    let builder = apply_tuning(builder, config)?;
    debug!(
        "Backend options: backend={}, options={:?}",
        config.backend,
        config.clean_options()
    );
    Ok(Client::from_conf(builder.build()))
}

fn base_builder(region: &str) -> Builder {
    aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
}

fn static_credentials(config: &StorageConfig) -> Option<Credentials> {
    if !config.has_static_credentials() {
        return None;
    }
    let access_key = config.access_key_id.as_deref()?;
    let secret_key = config.secret_access_key.as_deref()?;
    Some(Credentials::new(access_key, secret_key, None, None, "static"))
}

fn required<'a>(value: &'a Option<String>, field: &str) -> StorageResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StorageError::ConfigError(format!("Missing required field '{}'", field)))
}

async fn aws_builder(config: &StorageConfig) -> StorageResult<Builder> {
    let region = required(&config.region, "region")?;
    validate_aws_region(region)?;

    let mut builder = base_builder(region).force_path_style(config.flag("force_path_style"));
    if let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        builder = builder.endpoint_url(normalize_endpoint(endpoint, true));
    }

    if let Some(credentials) = static_credentials(config) {
        builder = builder.credentials_provider(credentials);
    } else {
        // Environment, profile, web identity and instance metadata, in that order
        debug!("No static credentials configured, using the default credential chain");
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        if let Some(provider) = sdk_config.credentials_provider() {
            builder = builder.credentials_provider(provider);
        }
    }

    info!("Building AWS S3 client: region={}", region);
    Ok(builder)
}

fn minio_builder(config: &StorageConfig) -> StorageResult<Builder> {
    let endpoint = required(&config.endpoint, "endpoint")?;
    let credentials = static_credentials(config).ok_or_else(|| {
        StorageError::ConfigError(
            "MinIO requires non-blank access_key_id and secret_access_key".to_string(),
        )
    })?;
    let region = config
        .region
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or(DEFAULT_MINIO_REGION);
    let endpoint = normalize_endpoint(endpoint, config.flag("secure"));

    info!("Building MinIO client: endpoint={}, region={}", endpoint, region);
    Ok(base_builder(region)
        .endpoint_url(endpoint)
        .force_path_style(true)
        .credentials_provider(credentials)
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .response_checksum_validation(ResponseChecksumValidation::WhenRequired))
}

fn oci_builder(config: &StorageConfig) -> StorageResult<Builder> {
    let namespace = required(&config.namespace, "namespace")?;
    let region = required(&config.region, "region")?;
    let credentials = static_credentials(config).ok_or_else(|| {
        StorageError::ConfigError(
            "OCI requires non-blank access_key_id and secret_access_key".to_string(),
        )
    })?;
    let endpoint = match config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(endpoint) => normalize_endpoint(endpoint, true),
        None => oci::compat_endpoint(namespace, region),
    };

    info!(
        "Building OCI Object Storage client: endpoint={}, region={}",
        endpoint, region
    );
    // The compatibility API only understands path-style requests and rejects
    // the newer default checksum headers
    Ok(base_builder(region)
        .endpoint_url(endpoint)
        .force_path_style(true)
        .credentials_provider(credentials)
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .response_checksum_validation(ResponseChecksumValidation::WhenRequired))
}

fn apply_tuning(mut builder: Builder, config: &StorageConfig) -> StorageResult<Builder> {
    let attempt_timeout = config.seconds_option("timeout")?;
    let connect_timeout = config.seconds_option("connect_timeout")?;
    if attempt_timeout.is_some() || connect_timeout.is_some() {
        let mut timeouts = TimeoutConfig::builder();
        if let Some(timeout) = attempt_timeout {
            timeouts = timeouts.operation_attempt_timeout(timeout);
        }
        if let Some(timeout) = connect_timeout {
            timeouts = timeouts.connect_timeout(timeout);
        }
        builder = builder.timeout_config(timeouts.build());
    }

    if let Some(retries) = config.max_retries()? {
        let attempts = retries.checked_add(1).ok_or_else(|| {
            StorageError::ConfigError(format!("Option 'max_retries' is too large: {}", retries))
        })?;
        builder = builder.retry_config(RetryConfig::standard().with_max_attempts(attempts));
    }

    debug!(
        "Applied client tuning: timeout={:?}, connect_timeout={:?}",
        attempt_timeout, connect_timeout
    );
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_aws_regions() {
        for region in [
            "us-east-1",
            "eu-west-3",
            "ap-southeast-2",
            "us-gov-west-1",
            "cn-north-1",
            "il-central-1",
        ] {
            assert!(validate_aws_region(region).is_ok(), "{}", region);
        }
    }

    #[test]
    fn test_unknown_aws_regions() {
        for region in ["", "mars-1", "us-east", "US-EAST-1", "us-ashburn"] {
            let err = validate_aws_region(region).unwrap_err();
            assert!(matches!(err, StorageError::ConfigError(_)), "{}", region);
        }
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("localhost:9000", false),
            "http://localhost:9000"
        );
        assert_eq!(
            normalize_endpoint("minio.internal:9000/", true),
            "https://minio.internal:9000"
        );
        assert_eq!(
            normalize_endpoint("https://s3.example.com", false),
            "https://s3.example.com"
        );
    }

    #[tokio::test]
    async fn test_build_minio_client() {
        let config = StorageConfig::minio()
            .with_endpoint("localhost:9000")
            .with_credentials("k", "s")
            .with_bucket("b1");
        let client = build_client(&config).await.unwrap();
        assert_eq!(
            client.config().region().map(|r| r.as_ref()),
            Some(DEFAULT_MINIO_REGION)
        );
    }

    #[tokio::test]
    async fn test_build_oci_client() {
        let config = StorageConfig::oci()
            .with_namespace("ns")
            .with_region("us-ashburn-1")
            .with_credentials("ak", "sk");
        let client = build_client(&config).await.unwrap();
        assert_eq!(
            client.config().region().map(|r| r.as_ref()),
            Some("us-ashburn-1")
        );
    }

    #[tokio::test]
    async fn test_build_aws_client_with_static_credentials() {
        let config = StorageConfig::aws()
            .with_region("eu-west-1")
            .with_credentials("ak", "sk");
        assert!(build_client(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_build_aws_client_rejects_unknown_region() {
        let config = StorageConfig::aws()
            .with_region("moon-base-1")
            .with_credentials("ak", "sk");
        let err = build_client(&config).await.unwrap_err();
        assert!(err.to_string().contains("moon-base-1"));
    }

    #[tokio::test]
    async fn test_build_minio_client_without_credentials() {
        let config = StorageConfig::minio().with_endpoint("localhost:9000");
        assert!(matches!(
            build_client(&config).await,
            Err(StorageError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_tuning_option() {
        let config = StorageConfig::minio()
            .with_endpoint("localhost:9000")
            .with_credentials("k", "s")
            .with_option("max_retries", "many");
        assert!(matches!(
            build_client(&config).await,
            Err(StorageError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_max_retries_at_u32_limit_is_config_error() {
        let config = StorageConfig::minio()
            .with_endpoint("localhost:9000")
            .with_credentials("k", "s")
            .with_option("max_retries", u32::MAX.to_string());
        let err = build_client(&config).await.unwrap_err();
        assert!(matches!(err, StorageError::ConfigError(_)));
        assert!(err.to_string().contains("max_retries"));

        let config = config.with_option("max_retries", (u32::MAX - 1).to_string());
        assert!(build_client(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_timeouts() {
        let config = StorageConfig::minio()
            .with_endpoint("localhost:9000")
            .with_credentials("k", "s")
            .with_option("timeout", "disabled")
            .with_option("connect_timeout", "0");
        assert!(build_client(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_local_has_no_s3_client() {
        let config = StorageConfig::local();
        assert!(build_client(&config).await.is_err());
    }
}

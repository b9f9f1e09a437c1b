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

//! S3-protocol storage shared by the AWS, MinIO and OCI backends.
//!
//! The three backends differ only in how the client is built (see
//! [`client`]); every operation goes through the same `aws-sdk-s3` calls.

pub mod client;
pub(crate) mod errors;
mod multipart;
#[cfg(test)]
mod testing;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use url::Url;

use self::errors::{describe, is_not_found, translate};
use super::config::{BackendKind, StorageConfig};
use super::error::{StorageError, StorageResult};
use super::model::{
    BatchDeleteResult, BucketInfo, Interrupt, ObjectContent, ObjectMetadata, ObjectRef,
    PresignMethod, PresignRequest, PutAck, UploadBody,
};
use super::provider::{folder_key, ObjectStorage};
use crate::util::timing::{measure_dur_async, TimingLevel};

/// Most keys a single DeleteObjects request accepts.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Object storage over an S3-compatible API.
pub struct S3CompatibleStorage {
    kind: BackendKind,
    client: Client,
    config: StorageConfig,
    part_size: usize,
}

impl S3CompatibleStorage {
    /// Build the client described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` when `config` is not an AWS, MinIO
    /// or OCI configuration or cannot produce a client.
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let client = client::build_client(&config).await?;
        Self::with_client(client, config)
    }

    /// Wrap an already-built client.
    pub fn with_client(client: Client, config: StorageConfig) -> StorageResult<Self> {
        let part_size = config.multipart_part_size()?;
        Ok(Self {
            kind: config.backend,
            client,
            config,
            part_size,
        })
    }

    /// The underlying SDK client, for calls not covered by [`ObjectStorage`].
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn location_constraint(&self) -> Option<CreateBucketConfiguration> {
        if self.kind != BackendKind::Aws {
            return None;
        }
        let region = self.config.region.as_deref()?.trim();
        // us-east-1 is the default location and must not be sent explicitly
        if region.is_empty() || region == "us-east-1" {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        )
    }

    async fn into_byte_stream(
        body: UploadBody,
        object: &ObjectRef,
    ) -> StorageResult<(ByteStream, u64)> {
        match body {
            UploadBody::Bytes(bytes) => {
                let length = bytes.len() as u64;
                Ok((ByteStream::from(bytes), length))
            }
            UploadBody::File(path) => {
                let length = tokio::fs::metadata(&path).await?.len();
                let stream = ByteStream::from_path(&path).await.map_err(|e| {
                    StorageError::backend("put_object", &object.bucket, Some(&object.key), e)
                })?;
                Ok((stream, length))
            }
            body @ UploadBody::Stream { .. } => {
                let bytes = body.into_bytes().await?;
                let length = bytes.len() as u64;
                Ok((ByteStream::from(bytes), length))
            }
        }
    }

    async fn get(
        &self,
        operation: &'static str,
        object: &ObjectRef,
        range: Option<String>,
    ) -> StorageResult<ObjectContent> {
        let output = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .set_range(range)
            .send()
            .await
            .map_err(|e| translate(e, operation, &object.bucket, Some(&object.key)))?;

        let content_length = output.content_length().and_then(|l| u64::try_from(l).ok());
        let content_type = output.content_type().map(str::to_string);
        let e_tag = output.e_tag().map(str::to_string);
        let bucket = object.bucket.clone();
        let key = object.key.clone();
        let body = stream::unfold(output.body, move |mut body| {
            let bucket = bucket.clone();
            let key = key.clone();
            async move {
                match body.next().await {
                    Some(Ok(chunk)) => Some((Ok(chunk), body)),
                    Some(Err(e)) => Some((
                        Err(StorageError::backend(operation, bucket, Some(&key), e)),
                        body,
                    )),
                    None => None,
                }
            }
        });
        Ok(ObjectContent::new(
            content_length,
            content_type,
            e_tag,
            body.boxed(),
        ))
    }
}

/// HTTP range header value for `length` bytes starting at `offset`.
pub(crate) fn range_header(offset: u64, length: u64) -> StorageResult<String> {
    if length == 0 {
        return Err(StorageError::InvalidInput(
            "Range length must be greater than zero".to_string(),
        ));
    }
    let last = offset.checked_add(length - 1).ok_or_else(|| {
        StorageError::InvalidInput(format!(
            "Range offset={} length={} overflows",
            offset, length
        ))
    })?;
    Ok(format!("bytes={}-{}", offset, last))
}

/// Value of the `x-amz-copy-source` header: bucket plus URL-encoded key.
pub(crate) fn copy_source(source: &ObjectRef) -> String {
    let key = source
        .key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", source.bucket, key)
}

fn to_chrono(timestamp: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

fn build_delete(keys: &[&String]) -> Result<Delete, aws_sdk_s3::error::BuildError> {
    let objects = keys
        .iter()
        .map(|key| ObjectIdentifier::builder().key(key.as_str()).build())
        .collect::<Result<Vec<_>, _>>()?;
    Delete::builder().set_objects(Some(objects)).quiet(false).build()
}

#[async_trait]
impl ObjectStorage for S3CompatibleStorage {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn config(&self) -> &StorageConfig {
        &self.config
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self.bucket_exists(bucket).await? {
            debug!("Bucket already exists: bucket={}", bucket);
            return Ok(());
        }
        let result = self
            .client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(self.location_constraint())
            .send()
            .await;
        match result {
            Ok(_) => {
                info!("Created bucket: backend={}, bucket={}", self.kind, bucket);
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_bucket_already_owned_by_you())
                    .unwrap_or(false) =>
            {
                debug!("Bucket created concurrently: bucket={}", bucket);
                Ok(())
            }
            Err(e) => Err(translate(e, "create_bucket", bucket, None)),
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(StorageError::backend("bucket_exists", bucket, None, e)),
        }
    }

    async fn list_buckets(&self) -> StorageResult<Vec<BucketInfo>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| StorageError::backend("list_buckets", "*", None, e))?;
        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| {
                b.name().map(|name| BucketInfo {
                    name: name.to_string(),
                    creation_date: b.creation_date().and_then(to_chrono),
                })
            })
            .collect())
    }

    async fn remove_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| translate(e, "remove_bucket", bucket, None))?;
        info!("Removed bucket: backend={}, bucket={}", self.kind, bucket);
        Ok(())
    }

    async fn bucket_policy(&self, bucket: &str) -> StorageResult<Option<String>> {
        match self.client.get_bucket_policy().bucket(bucket).send().await {
            Ok(output) => Ok(output.policy().map(str::to_string)),
            // Checked before absence: a missing policy is also a 404
            Err(e) if describe(&e).0.as_deref() == Some("NoSuchBucketPolicy") => Ok(None),
            Err(e) => Err(translate(e, "bucket_policy", bucket, None)),
        }
    }

    async fn put_object(
        &self,
        object: &ObjectRef,
        body: UploadBody,
        content_type: Option<&str>,
    ) -> StorageResult<PutAck> {
        let (stream, length) = Self::into_byte_stream(body, object).await?;
        let output = self
            .client
            .put_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .content_length(length as i64)
            .set_content_type(content_type.map(str::to_string))
            .body(stream)
            .send()
            .await
            .map_err(|e| translate(e, "put_object", &object.bucket, Some(&object.key)))?;
        debug!(
            "Put object: bucket={}, key={}, length={}",
            object.bucket, object.key, length
        );
        Ok(PutAck {
            e_tag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn put_object_multipart(
        &self,
        object: &ObjectRef,
        body: UploadBody,
        content_type: Option<&str>,
        interrupt: Interrupt,
    ) -> StorageResult<PutAck> {
        let (reader, length) = body.into_reader().await?;
        if length == 0 {
            // Multipart uploads need at least one non-empty part
            return self
                .put_object(object, UploadBody::from(Bytes::new()), content_type)
                .await;
        }
        measure_dur_async(
            "put_object_multipart",
            TimingLevel::Debug,
            multipart::upload(
                &self.client,
                object,
                reader,
                length,
                content_type,
                self.part_size,
                interrupt,
            ),
        )
        .await
    }

    async fn get_object(&self, object: &ObjectRef) -> StorageResult<ObjectContent> {
        self.get("get_object", object, None).await
    }

    async fn get_object_range(
        &self,
        object: &ObjectRef,
        offset: u64,
        length: u64,
    ) -> StorageResult<ObjectContent> {
        let range = range_header(offset, length)?;
        self.get("get_object_range", object, Some(range)).await
    }

    async fn stat_object(&self, object: &ObjectRef) -> StorageResult<ObjectMetadata> {
        let output = self
            .client
            .head_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| translate(e, "stat_object", &object.bucket, Some(&object.key)))?;
        Ok(ObjectMetadata {
            key: object.key.clone(),
            content_length: output
                .content_length()
                .and_then(|l| u64::try_from(l).ok())
                .unwrap_or(0),
            content_type: output.content_type().map(str::to_string),
            e_tag: output.e_tag().map(str::to_string),
            last_modified: output.last_modified().and_then(to_chrono),
            user_metadata: output.metadata().cloned().unwrap_or_default(),
        })
    }

    async fn copy_object(
        &self,
        source: &ObjectRef,
        destination: &ObjectRef,
    ) -> StorageResult<()> {
        self.client
            .copy_object()
            .copy_source(copy_source(source))
            .bucket(&destination.bucket)
            .key(&destination.key)
            .send()
            .await
            .map_err(|e| translate(e, "copy_object", &source.bucket, Some(&source.key)))?;
        debug!("Copied object: from={}, to={}", source, destination);
        Ok(())
    }

    async fn delete_object(&self, object: &ObjectRef) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| translate(e, "delete_object", &object.bucket, Some(&object.key)))?;
        debug!("Deleted object: bucket={}, key={}", object.bucket, object.key);
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> StorageResult<BatchDeleteResult> {
        let keys: Vec<&String> = keys.iter().filter(|k| !k.trim().is_empty()).collect();
        let mut result = BatchDeleteResult::default();

        for chunk in keys.chunks(MAX_DELETE_BATCH) {
            let delete = match build_delete(chunk) {
                Ok(delete) => delete,
                Err(e) => {
                    for key in chunk {
                        result.failed(key.as_str(), None, e.to_string());
                    }
                    continue;
                }
            };
            match self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
            {
                Ok(output) => {
                    for deleted in output.deleted() {
                        if let Some(key) = deleted.key() {
                            result.deleted(key);
                        }
                    }
                    for error in output.errors() {
                        let key = error.key().unwrap_or_default();
                        warn!(
                            "Failed to delete object: bucket={}, key={}, code={:?}",
                            bucket,
                            key,
                            error.code()
                        );
                        result.failed(
                            key,
                            error.code().map(str::to_string),
                            error.message().unwrap_or("delete failed"),
                        );
                    }
                }
                Err(e) => {
                    let (code, message) = describe(&e);
                    warn!(
                        "Batch delete request failed: bucket={}, keys={}, error={}",
                        bucket,
                        chunk.len(),
                        message
                    );
                    for key in chunk {
                        result.failed(key.as_str(), code.clone(), message.clone());
                    }
                }
            }
        }
        Ok(result)
    }

    async fn presign_url(&self, request: &PresignRequest) -> StorageResult<Url> {
        request.validate()?;
        let presigning = PresigningConfig::expires_in(request.expires_in)
            .map_err(|e| StorageError::InvalidInput(e.to_string()))?;
        let object = &request.object;
        let (bucket, key) = (object.bucket.as_str(), object.key.as_str());

        let presigned = match request.method {
            PresignMethod::Get => self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|e| translate(e, "presign_url", bucket, Some(key)))?,
            PresignMethod::Put => self
                .client
                .put_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|e| translate(e, "presign_url", bucket, Some(key)))?,
            PresignMethod::Delete => self
                .client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|e| translate(e, "presign_url", bucket, Some(key)))?,
            PresignMethod::Head => self
                .client
                .head_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|e| translate(e, "presign_url", bucket, Some(key)))?,
        };
        Ok(Url::parse(presigned.uri())?)
    }

    async fn folder_exists(&self, bucket: &str, folder: &str) -> StorageResult<bool> {
        let marker = folder_key(folder);
        // One entry under `folder/` is enough
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(&marker)
            .delimiter("/")
            .max_keys(1)
            .send()
            .await
            .map_err(|e| translate(e, "folder_exists", bucket, Some(folder)))?;
        Ok(!output.contents().is_empty() || !output.common_prefixes().is_empty())
    }

    async fn list_object_keys(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: i32,
    ) -> StorageResult<Vec<String>> {
        let mut request = self.client.list_objects_v2().bucket(bucket);
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if max_keys >= 0 {
            request = request.max_keys(max_keys);
        }
        let output = request
            .send()
            .await
            .map_err(|e| translate(e, "list_object_keys", bucket, None))?;
        Ok(output
            .contents()
            .iter()
            .filter_map(|o| o.key().map(str::to_string))
            .collect())
    }
}

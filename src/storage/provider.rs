// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use async_trait::async_trait;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

use super::config::{BackendKind, StorageConfig};
use super::error::StorageResult;
use super::model::{
    BatchDeleteResult, BucketInfo, Interrupt, ObjectContent, ObjectMetadata, ObjectRef,
    PresignRequest, PutAck, UploadBody,
};

/// Backend-agnostic object storage
///
/// This trait provides a unified interface over AWS S3, MinIO, OCI Object
/// Storage (through its S3 compatibility API) and a local directory. An
/// implementation is selected once by
/// [`StorageProviderFactory`](super::StorageProviderFactory) and shared as
/// `Arc<dyn ObjectStorage>`.
///
/// Backend failures surface as [`StorageError`](super::StorageError) values
/// carrying the operation name, bucket and key. The only operation that
/// swallows failures is [`object_exists`](ObjectStorage::object_exists).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Backend this storage talks to.
    fn kind(&self) -> BackendKind;

    /// Configuration the storage was built from.
    fn config(&self) -> &StorageConfig;

    /// The configured default bucket, if any.
    fn default_bucket(&self) -> Option<&str> {
        self.config().bucket_name.as_deref()
    }

    /// Create a bucket unless it already exists.
    ///
    /// Calling this for an existing bucket is not an error, including when a
    /// concurrent caller created it in between the check and the create.
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Check whether a bucket exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The bucket exists
    /// * `Ok(false)` - The backend reported the bucket as missing
    /// * `Err(StorageError)` - Any other failure
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// List all buckets visible to the configured credentials.
    async fn list_buckets(&self) -> StorageResult<Vec<BucketInfo>>;

    /// Remove an empty bucket.
    ///
    /// # Errors
    ///
    /// Fails with a storage error when the bucket still holds objects; this is
    /// left to the backend and not checked beforehand.
    async fn remove_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Fetch the bucket policy document, `None` when the bucket has none.
    async fn bucket_policy(&self, bucket: &str) -> StorageResult<Option<String>>;

    /// Upload an object in a single request.
    async fn put_object(
        &self,
        object: &ObjectRef,
        body: UploadBody,
        content_type: Option<&str>,
    ) -> StorageResult<PutAck>;

    /// Upload an object in parts.
    ///
    /// The returned future resolves once the upload is complete. Any failure
    /// aborts the upload on the backend. Firing `interrupt` aborts the upload
    /// as well and returns `StorageError::Interrupted`.
    async fn put_object_multipart(
        &self,
        object: &ObjectRef,
        body: UploadBody,
        content_type: Option<&str>,
        interrupt: Interrupt,
    ) -> StorageResult<PutAck>;

    /// Download an object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the bucket or object is missing.
    async fn get_object(&self, object: &ObjectRef) -> StorageResult<ObjectContent>;

    /// Download `length` bytes starting at `offset`.
    ///
    /// A zero `length` is rejected with `StorageError::InvalidInput`.
    async fn get_object_range(
        &self,
        object: &ObjectRef,
        offset: u64,
        length: u64,
    ) -> StorageResult<ObjectContent>;

    /// Fetch object metadata.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the bucket or object is missing.
    async fn stat_object(&self, object: &ObjectRef) -> StorageResult<ObjectMetadata>;

    /// Server-side copy, within a bucket or across buckets.
    async fn copy_object(&self, source: &ObjectRef, destination: &ObjectRef)
        -> StorageResult<()>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete_object(&self, object: &ObjectRef) -> StorageResult<()>;

    /// Delete many objects and report the outcome of every key.
    ///
    /// Blank keys are dropped before any request is sent. A failed request
    /// marks its whole chunk of keys as failed and the remaining chunks are
    /// still processed.
    async fn delete_objects(&self, bucket: &str, keys: &[String])
        -> StorageResult<BatchDeleteResult>;

    /// Generate a presigned URL.
    ///
    /// # Errors
    ///
    /// * `StorageError::InvalidInput` - The expiry is zero or longer than seven days
    /// * `StorageError::Unsupported` - The backend cannot presign
    async fn presign_url(&self, request: &PresignRequest) -> StorageResult<Url>;

    /// Check whether `folder/` exists as a directory entry in `bucket`.
    async fn folder_exists(&self, bucket: &str, folder: &str) -> StorageResult<bool>;

    /// List object keys under `prefix`, one page only.
    ///
    /// An empty prefix lists from the bucket root. A negative `max_keys` uses
    /// the backend's default page size of 1000.
    async fn list_object_keys(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: i32,
    ) -> StorageResult<Vec<String>>;

    /// Look up a single bucket by name.
    async fn bucket_info(&self, bucket: &str) -> StorageResult<Option<BucketInfo>> {
        let buckets = self.list_buckets().await?;
        Ok(buckets.into_iter().find(|b| b.name == bucket))
    }

    /// Create the configured default bucket. Does nothing when none is set.
    async fn init_default_bucket(&self) -> StorageResult<()> {
        match self.default_bucket() {
            Some(bucket) if !bucket.trim().is_empty() => {
                info!("Initializing default bucket: bucket={}", bucket);
                self.create_bucket(bucket).await
            }
            _ => Ok(()),
        }
    }

    /// Check whether an object exists.
    ///
    /// Every failure, including transient network errors, is reported as
    /// `false` and logged at warn level. Use
    /// [`stat_object`](ObjectStorage::stat_object) to tell a missing object
    /// apart from a failed request.
    async fn object_exists(&self, object: &ObjectRef) -> bool {
        match self.stat_object(object).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                warn!(
                    "Object existence check failed, reporting absent: bucket={}, key={}, error={}",
                    object.bucket, object.key, e
                );
                false
            }
        }
    }

    /// Upload a local file, guessing the content type from its extension.
    async fn put_file(&self, object: &ObjectRef, path: &Path) -> StorageResult<PutAck> {
        let content_type = mime_guess::from_path(path).first().map(|m| m.to_string());
        debug!(
            "Uploading file: path={}, bucket={}, key={}, content_type={:?}",
            path.display(),
            object.bucket,
            object.key,
            content_type
        );
        self.put_object(object, UploadBody::from_file(path), content_type.as_deref())
            .await
    }

    /// Write a zero-byte `folder/` marker object.
    async fn create_folder(&self, bucket: &str, folder: &str) -> StorageResult<PutAck> {
        let marker = ObjectRef::new(bucket, folder_key(folder));
        self.put_object(&marker, UploadBody::from(Vec::new()), None)
            .await
    }

    /// Stream an object into a local file and return the number of bytes written.
    async fn download_to_file(&self, object: &ObjectRef, path: &Path) -> StorageResult<u64> {
        let content = self.get_object(object).await?;
        content.write_to(path).await
    }

    /// Move an object within a bucket.
    ///
    /// This is a copy followed by a delete and is not atomic: if the delete
    /// fails both keys exist.
    async fn rename_object(&self, bucket: &str, from: &str, to: &str) -> StorageResult<()> {
        let source = ObjectRef::new(bucket, from);
        let destination = ObjectRef::new(bucket, to);
        self.copy_object(&source, &destination).await?;
        self.delete_object(&source).await
    }

    /// Public CDN URL for an object, when a CDN prefix is configured.
    fn public_url(&self, object: &ObjectRef) -> Option<String> {
        self.config().cdn_url(&object.bucket, &object.key)
    }
}

impl Debug for dyn ObjectStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "ObjectStorage(backend={})", self.kind())
    }
}

/// Normalize a folder name to its marker key, `a/b` -> `a/b/`.
pub(crate) fn folder_key(folder: &str) -> String {
    format!("{}/", folder.trim_end_matches('/'))
}

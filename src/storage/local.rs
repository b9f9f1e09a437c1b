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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use object_store::local::LocalFileSystem;
use object_store::path::{Path as ObjectPath, PathPart};
use object_store::{GetOptions, ObjectStore, PutPayload, WriteMultipart};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};
use url::Url;

use super::config::{BackendKind, StorageConfig};
use super::error::{StorageError, StorageResult};
use super::model::{
    BatchDeleteResult, BucketInfo, Interrupt, ObjectContent, ObjectMetadata, ObjectRef,
    PresignRequest, PutAck, UploadBody,
};
use super::provider::ObjectStorage;
use crate::util::io::read_chunk;

/// Page size used when `list_object_keys` is called with a negative limit.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Concurrent part writes allowed during a multipart upload.
const MULTIPART_CONCURRENCY: usize = 4;

/// Object storage backed by a local directory.
///
/// Each bucket is a sub-directory of the configured root and each object a
/// file under it. Folder markers (`folder/` keys) are directories. Key
/// segments are percent-encoded on disk and decoded again when listed, so any
/// key round-trips except those with empty segments (`a//b`, `/a`), which are
/// rejected with `InvalidInput`.
pub struct LocalStorage {
    config: StorageConfig,
    root: PathBuf,
    store: Arc<LocalFileSystem>,
    part_size: usize,
}

impl LocalStorage {
    /// Create a local storage rooted at `options["path"]`.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The 'path' option is missing from configuration
    /// * The path cannot be canonicalized (doesn't exist or permission denied)
    /// * The path is not a directory
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let path = config.options.get("path").ok_or_else(|| {
            StorageError::ConfigError("Local storage requires 'path' option".to_string())
        })?;

        // Canonicalize the path (handles both relative and absolute paths, resolves symlinks)
        let root = PathBuf::from(path).canonicalize().map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to resolve path '{}': {} (path must exist)",
                path, e
            ))
        })?;
        if !root.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "Base path is not a directory: {}",
                root.display()
            )));
        }

        let store = LocalFileSystem::new_with_prefix(&root).map_err(|e| {
            StorageError::ConfigError(format!("Failed to create local store: {}", e))
        })?;
        let part_size = config.multipart_part_size()?;

        info!("Opened local storage: root={}", root.display());
        Ok(Self {
            config,
            root,
            store: Arc::new(store),
            part_size,
        })
    }

    /// Root directory holding the buckets.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        if bucket.is_empty()
            || bucket == "."
            || bucket == ".."
            || bucket.contains(['/', '\\'])
        {
            return Err(StorageError::InvalidInput(format!(
                "Invalid bucket name: '{}'",
                bucket
            )));
        }
        let path = ObjectPath::from_iter([PathPart::from(bucket)]);
        self.store
            .path_to_filesystem(&path)
            .map_err(|e| StorageError::backend("bucket_dir", bucket, None, e))
    }

    /// Resolve the bucket directory, failing with `NotFound` when it is missing.
    async fn existing_bucket(&self, bucket: &str) -> StorageResult<PathBuf> {
        let dir = self.bucket_dir(bucket)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(StorageError::not_found(bucket, None)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::not_found(bucket, None))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn key_path(bucket: &str, key: &str) -> StorageResult<ObjectPath> {
        let segments: Vec<&str> = key.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(StorageError::InvalidInput(format!(
                "Key '{}' in bucket '{}' has an empty path segment",
                key, bucket
            )));
        }
        Ok(std::iter::once(bucket)
            .chain(segments)
            .map(PathPart::from)
            .collect())
    }

    fn object_path(object: &ObjectRef) -> StorageResult<ObjectPath> {
        Self::key_path(&object.bucket, &object.key)
    }

    /// Directory backing the folder marker `{folder}/`.
    fn folder_dir(
        &self,
        operation: &'static str,
        bucket: &str,
        folder: &str,
    ) -> StorageResult<PathBuf> {
        let path = Self::key_path(bucket, folder)?;
        self.store
            .path_to_filesystem(&path)
            .map_err(|e| translate(e, operation, bucket, Some(folder)))
    }

    /// Delete one key; missing keys and markers count as deleted.
    async fn delete_key(
        &self,
        operation: &'static str,
        bucket: &str,
        key: &str,
    ) -> StorageResult<()> {
        if let Some(folder) = key.strip_suffix('/') {
            let dir = self.folder_dir(operation, bucket, folder)?;
            return match tokio::fs::metadata(&dir).await {
                // remove_dir refuses markers that still hold objects
                Ok(meta) if meta.is_dir() => tokio::fs::remove_dir(&dir)
                    .await
                    .map_err(|e| StorageError::backend(operation, bucket, Some(key), e)),
                Ok(_) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StorageError::backend(operation, bucket, Some(key), e)),
            };
        }
        match self.store.delete(&Self::key_path(bucket, key)?).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(translate(e, operation, bucket, Some(key))),
        }
    }

    async fn write_parts(
        writer: &mut WriteMultipart,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        part_size: usize,
        length: u64,
    ) -> StorageResult<()> {
        let mut written = 0u64;
        loop {
            writer.wait_for_capacity(MULTIPART_CONCURRENCY).await?;
            let chunk = read_chunk(reader, part_size).await?;
            if chunk.is_empty() {
                break;
            }
            written += chunk.len() as u64;
            writer.write(&chunk);
        }
        if written != length {
            return Err(StorageError::InvalidInput(format!(
                "Upload body ended after {} of {} declared bytes",
                written, length
            )));
        }
        Ok(())
    }
}

/// Key of a listed location: the decoded segments after the bucket.
fn decode_key(location: &ObjectPath) -> Result<String, std::string::FromUtf8Error> {
    let segments = location
        .parts()
        .skip(1)
        .map(|part| urlencoding::decode(part.as_ref()).map(|s| s.into_owned()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

fn translate(
    err: object_store::Error,
    operation: &'static str,
    bucket: &str,
    key: Option<&str>,
) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::not_found(bucket, key),
        other => StorageError::backend(operation, bucket, key, other),
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn config(&self) -> &StorageConfig {
        &self.config
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self.bucket_exists(bucket).await? {
            debug!("Bucket already exists: bucket={}", bucket);
            return Ok(());
        }
        let dir = self.bucket_dir(bucket)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::backend("create_bucket", bucket, None, e))?;
        info!("Created bucket: backend=local, bucket={}", bucket);
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match self.existing_bucket(bucket).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_buckets(&self) -> StorageResult<Vec<BucketInfo>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut buckets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_dir() {
                continue;
            }
            let creation_date = meta
                .created()
                .or_else(|_| meta.modified())
                .ok()
                .map(DateTime::<Utc>::from);
            let file_name = entry.file_name();
            let name = urlencoding::decode(&file_name.to_string_lossy())
                .map(|n| n.into_owned())
                .unwrap_or_else(|_| file_name.to_string_lossy().into_owned());
            buckets.push(BucketInfo { name, creation_date });
        }
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    async fn remove_bucket(&self, bucket: &str) -> StorageResult<()> {
        let dir = self.existing_bucket(bucket).await?;
        // remove_dir refuses non-empty directories
        tokio::fs::remove_dir(&dir)
            .await
            .map_err(|e| StorageError::backend("remove_bucket", bucket, None, e))?;
        info!("Removed bucket: backend=local, bucket={}", bucket);
        Ok(())
    }

    async fn bucket_policy(&self, _bucket: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unsupported {
            operation: "bucket_policy",
            backend: "local",
        })
    }

    async fn put_object(
        &self,
        object: &ObjectRef,
        body: UploadBody,
        content_type: Option<&str>,
    ) -> StorageResult<PutAck> {
        self.existing_bucket(&object.bucket).await?;
        if let Some(folder) = object.key.strip_suffix('/') {
            let length = body.content_length().await?;
            if length > 0 {
                return Err(StorageError::InvalidInput(format!(
                    "Folder marker '{}' cannot hold {} bytes of content",
                    object.key, length
                )));
            }
            let dir = self.folder_dir("put_object", &object.bucket, folder)?;
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::backend("put_object", &object.bucket, Some(&object.key), e)
            })?;
            return Ok(PutAck::default());
        }

        let path = Self::object_path(object)?;
        let data = body.into_bytes().await?;
        let length = data.len();
        let result = self
            .store
            .put(&path, PutPayload::from(data))
            .await
            .map_err(|e| translate(e, "put_object", &object.bucket, Some(&object.key)))?;
        debug!(
            "Put object: bucket={}, key={}, length={}, content_type={:?}",
            object.bucket, object.key, length, content_type
        );
        Ok(PutAck {
            e_tag: result.e_tag,
            version_id: result.version,
        })
    }

    async fn put_object_multipart(
        &self,
        object: &ObjectRef,
        body: UploadBody,
        content_type: Option<&str>,
        interrupt: Interrupt,
    ) -> StorageResult<PutAck> {
        self.existing_bucket(&object.bucket).await?;
        let (mut reader, length) = body.into_reader().await?;
        if length == 0 {
            return self
                .put_object(object, UploadBody::from(Vec::new()), content_type)
                .await;
        }

        let path = Self::object_path(object)?;
        let upload = self
            .store
            .put_multipart(&path)
            .await
            .map_err(|e| translate(e, "put_object_multipart", &object.bucket, Some(&object.key)))?;
        let mut writer = WriteMultipart::new_with_chunk_size(upload, self.part_size);

        let outcome = tokio::select! {
            biased;
            _ = interrupt.fired() => Err(StorageError::interrupted(
                "put_object_multipart",
                &object.bucket,
                &object.key,
            )),
            written = Self::write_parts(&mut writer, reader.as_mut(), self.part_size, length) => written,
        };

        match outcome {
            Ok(()) => {
                let result = writer.finish().await.map_err(|e| {
                    translate(e, "put_object_multipart", &object.bucket, Some(&object.key))
                })?;
                info!(
                    "Completed multipart upload: bucket={}, key={}, length={}",
                    object.bucket, object.key, length
                );
                Ok(PutAck {
                    e_tag: result.e_tag,
                    version_id: result.version,
                })
            }
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    warn!(
                        "Failed to abort multipart upload: bucket={}, key={}, error={}",
                        object.bucket, object.key, abort_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn get_object(&self, object: &ObjectRef) -> StorageResult<ObjectContent> {
        self.existing_bucket(&object.bucket).await?;
        let result = self
            .store
            .get(&Self::object_path(object)?)
            .await
            .map_err(|e| translate(e, "get_object", &object.bucket, Some(&object.key)))?;
        let content_length = Some(result.meta.size);
        let e_tag = result.meta.e_tag.clone();
        let content_type = mime_guess::from_path(&object.key)
            .first()
            .map(|m| m.to_string());
        let stream = result
            .into_stream()
            .map(|chunk| chunk.map_err(StorageError::from))
            .boxed();
        Ok(ObjectContent::new(content_length, content_type, e_tag, stream))
    }

    async fn get_object_range(
        &self,
        object: &ObjectRef,
        offset: u64,
        length: u64,
    ) -> StorageResult<ObjectContent> {
        if length == 0 {
            return Err(StorageError::InvalidInput(
                "Range length must be greater than zero".to_string(),
            ));
        }
        let end = offset.checked_add(length).ok_or_else(|| {
            StorageError::InvalidInput(format!(
                "Range offset={} length={} overflows",
                offset, length
            ))
        })?;
        self.existing_bucket(&object.bucket).await?;
        let options = GetOptions {
            range: Some((offset..end).into()),
            ..Default::default()
        };
        let result = self
            .store
            .get_opts(&Self::object_path(object)?, options)
            .await
            .map_err(|e| translate(e, "get_object_range", &object.bucket, Some(&object.key)))?;
        let content_length = Some(result.range.end - result.range.start);
        let e_tag = result.meta.e_tag.clone();
        let stream = result
            .into_stream()
            .map(|chunk| chunk.map_err(StorageError::from))
            .boxed();
        Ok(ObjectContent::new(content_length, None, e_tag, stream))
    }

    async fn stat_object(&self, object: &ObjectRef) -> StorageResult<ObjectMetadata> {
        self.existing_bucket(&object.bucket).await?;
        if let Some(folder) = object.key.strip_suffix('/') {
            let dir = self.folder_dir("stat_object", &object.bucket, folder)?;
            return match tokio::fs::metadata(&dir).await {
                Ok(meta) if meta.is_dir() => Ok(ObjectMetadata {
                    key: object.key.clone(),
                    last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
                    ..Default::default()
                }),
                Ok(_) => Err(StorageError::not_found(&object.bucket, Some(&object.key))),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(StorageError::not_found(&object.bucket, Some(&object.key)))
                }
                Err(e) => Err(e.into()),
            };
        }
        let meta = self
            .store
            .head(&Self::object_path(object)?)
            .await
            .map_err(|e| translate(e, "stat_object", &object.bucket, Some(&object.key)))?;
        Ok(ObjectMetadata {
            key: object.key.clone(),
            content_length: meta.size,
            content_type: mime_guess::from_path(&object.key)
                .first()
                .map(|m| m.to_string()),
            e_tag: meta.e_tag,
            last_modified: Some(meta.last_modified),
            user_metadata: Default::default(),
        })
    }

    async fn copy_object(
        &self,
        source: &ObjectRef,
        destination: &ObjectRef,
    ) -> StorageResult<()> {
        self.existing_bucket(&source.bucket).await?;
        self.existing_bucket(&destination.bucket).await?;
        self.store
            .copy(&Self::object_path(source)?, &Self::object_path(destination)?)
            .await
            .map_err(|e| translate(e, "copy_object", &source.bucket, Some(&source.key)))?;
        debug!("Copied object: from={}, to={}", source, destination);
        Ok(())
    }

    async fn delete_object(&self, object: &ObjectRef) -> StorageResult<()> {
        self.existing_bucket(&object.bucket).await?;
        self.delete_key("delete_object", &object.bucket, &object.key).await?;
        debug!("Deleted object: bucket={}, key={}", object.bucket, object.key);
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> StorageResult<BatchDeleteResult> {
        self.existing_bucket(bucket).await?;
        let mut result = BatchDeleteResult::default();
        for key in keys.iter().filter(|k| !k.trim().is_empty()) {
            match self.delete_key("delete_objects", bucket, key).await {
                Ok(()) => result.deleted(key.as_str()),
                Err(e) => {
                    warn!(
                        "Failed to delete object: bucket={}, key={}, error={}",
                        bucket, key, e
                    );
                    result.failed(key.as_str(), None, e.to_string());
                }
            }
        }
        Ok(result)
    }

    async fn presign_url(&self, request: &PresignRequest) -> StorageResult<Url> {
        request.validate()?;
        Err(StorageError::Unsupported {
            operation: "presign_url",
            backend: "local",
        })
    }

    async fn folder_exists(&self, bucket: &str, folder: &str) -> StorageResult<bool> {
        self.existing_bucket(bucket).await?;
        let folder = folder.trim_end_matches('/');
        if folder.is_empty() {
            return Ok(false);
        }
        let dir = self.folder_dir("folder_exists", bucket, folder)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::backend("folder_exists", bucket, Some(folder), e)),
        }
    }

    async fn list_object_keys(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: i32,
    ) -> StorageResult<Vec<String>> {
        self.existing_bucket(bucket).await?;
        let limit = usize::try_from(max_keys).unwrap_or(DEFAULT_PAGE_SIZE);
        let bucket_path = ObjectPath::from_iter([PathPart::from(bucket)]);

        let mut listing = self.store.list(Some(&bucket_path));
        let mut keys = Vec::new();
        while let Some(meta) = listing.next().await {
            let meta = meta.map_err(|e| translate(e, "list_object_keys", bucket, None))?;
            let key = decode_key(&meta.location)
                .map_err(|e| StorageError::backend("list_object_keys", bucket, None, e))?;
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        keys.truncate(limit);
        Ok(keys)
    }
}

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

//! Values passed to and returned from [`ObjectStorage`](super::ObjectStorage).

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::oneshot;

use super::error::{StorageError, StorageResult};

/// Longest expiry accepted for presigned URLs (SigV4 limit).
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Identifies a stored object.
///
/// Keys are passed to the backend untouched; no length or charset validation
/// happens locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Metadata about a stored object
#[derive(Debug, Clone, Default)]
pub struct ObjectMetadata {
    /// Object key within its bucket
    pub key: String,

    /// Object size in bytes
    pub content_length: u64,

    pub content_type: Option<String>,

    pub e_tag: Option<String>,

    /// Last modified timestamp (if available)
    pub last_modified: Option<DateTime<Utc>>,

    /// User-defined metadata attached at upload time
    pub user_metadata: HashMap<String, String>,
}

/// A bucket as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
}

/// Write acknowledgment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutAck {
    pub e_tag: Option<String>,
    pub version_id: Option<String>,
}

/// Source of an upload.
///
/// Uploads take the body by value: the storage implementation owns it and it
/// is dropped (closing any file or stream) on every exit path.
pub enum UploadBody {
    /// In-memory content with a known size
    Bytes(Bytes),
    /// A local file, read from disk during the upload
    File(PathBuf),
    /// A raw byte stream; exactly `length` bytes are uploaded
    Stream {
        reader: Box<dyn AsyncRead + Send + Unpin>,
        length: u64,
    },
}

type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

impl UploadBody {
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static, length: u64) -> Self {
        UploadBody::Stream {
            reader: Box::new(reader),
            length,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Self {
        UploadBody::File(path.as_ref().to_path_buf())
    }

    /// Declared size of the body, read from disk for files.
    pub fn content_length(
        &self,
    ) -> impl std::future::Future<Output = StorageResult<u64>> + Send + 'static {
        let source = match self {
            UploadBody::Bytes(bytes) => Ok(bytes.len() as u64),
            UploadBody::File(path) => Err(path.clone()),
            UploadBody::Stream { length, .. } => Ok(*length),
        };
        async move {
            match source {
                Ok(length) => Ok(length),
                Err(path) => Ok(tokio::fs::metadata(path).await?.len()),
            }
        }
    }

    /// Turn the body into a reader bounded to its declared length.
    pub(crate) async fn into_reader(self) -> StorageResult<(BodyReader, u64)> {
        match self {
            UploadBody::Bytes(bytes) => {
                let length = bytes.len() as u64;
                Ok((Box::new(Cursor::new(bytes)), length))
            }
            UploadBody::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let length = file.metadata().await?.len();
                Ok((Box::new(file.take(length)), length))
            }
            UploadBody::Stream { reader, length } => Ok((Box::new(reader.take(length)), length)),
        }
    }

    /// Buffer the whole body.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` when a stream ends before its
    /// declared length.
    pub(crate) async fn into_bytes(self) -> StorageResult<Bytes> {
        if let UploadBody::Bytes(bytes) = self {
            return Ok(bytes);
        }
        let (mut reader, length) = self.into_reader().await?;
        let mut buffer = Vec::with_capacity(length.min(64 * 1024 * 1024) as usize);
        reader.read_to_end(&mut buffer).await?;
        if buffer.len() as u64 != length {
            return Err(StorageError::InvalidInput(format!(
                "Upload body ended after {} of {} declared bytes",
                buffer.len(),
                length
            )));
        }
        Ok(Bytes::from(buffer))
    }
}

impl Debug for UploadBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadBody::Bytes(bytes) => write!(f, "UploadBody::Bytes(len={})", bytes.len()),
            UploadBody::File(path) => write!(f, "UploadBody::File({})", path.display()),
            UploadBody::Stream { length, .. } => write!(f, "UploadBody::Stream(length={})", length),
        }
    }
}

impl From<Bytes> for UploadBody {
    fn from(bytes: Bytes) -> Self {
        UploadBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for UploadBody {
    fn from(bytes: Vec<u8>) -> Self {
        UploadBody::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static str> for UploadBody {
    fn from(s: &'static str) -> Self {
        UploadBody::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for UploadBody {
    fn from(s: String) -> Self {
        UploadBody::Bytes(Bytes::from(s))
    }
}

/// A downloaded object: headers plus a byte stream.
pub struct ObjectContent {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub e_tag: Option<String>,
    stream: BoxStream<'static, StorageResult<Bytes>>,
}

impl ObjectContent {
    pub fn new(
        content_length: Option<u64>,
        content_type: Option<String>,
        e_tag: Option<String>,
        stream: BoxStream<'static, StorageResult<Bytes>>,
    ) -> Self {
        Self {
            content_length,
            content_type,
            e_tag,
            stream,
        }
    }

    pub fn into_stream(self) -> BoxStream<'static, StorageResult<Bytes>> {
        self.stream
    }

    /// Collect the whole body in memory.
    pub async fn bytes(mut self) -> StorageResult<Bytes> {
        let mut buffer = BytesMut::with_capacity(self.content_length.unwrap_or(0) as usize);
        while let Some(chunk) = self.stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    /// Stream the body into a local file, creating or truncating it.
    ///
    /// Returns the number of bytes written.
    pub async fn write_to(mut self, path: impl AsRef<Path>) -> StorageResult<u64> {
        let mut file = tokio::fs::File::create(path.as_ref()).await?;
        let mut written = 0u64;
        while let Some(chunk) = self.stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

impl Debug for ObjectContent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectContent")
            .field("content_length", &self.content_length)
            .field("content_type", &self.content_type)
            .field("e_tag", &self.e_tag)
            .finish_non_exhaustive()
    }
}

/// HTTP method a presigned URL is valid for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PresignMethod {
    #[default]
    Get,
    Put,
    Delete,
    Head,
}

/// Request for a time-bounded, credential-free URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignRequest {
    pub object: ObjectRef,
    pub expires_in: Duration,
    pub method: PresignMethod,
}

impl PresignRequest {
    /// A GET URL for `object`.
    pub fn new(object: ObjectRef, expires_in: Duration) -> Self {
        Self {
            object,
            expires_in,
            method: PresignMethod::default(),
        }
    }

    pub fn with_method(mut self, method: PresignMethod) -> Self {
        self.method = method;
        self
    }

    /// Reject expiries outside `(0, MAX_PRESIGN_EXPIRY]`.
    pub fn validate(&self) -> StorageResult<()> {
        if self.expires_in.is_zero() {
            return Err(StorageError::InvalidInput(
                "Presigned URL expiry must be greater than zero".to_string(),
            ));
        }
        if self.expires_in > MAX_PRESIGN_EXPIRY {
            return Err(StorageError::InvalidInput(format!(
                "Presigned URL expiry of {}s exceeds the maximum of {}s",
                self.expires_in.as_secs(),
                MAX_PRESIGN_EXPIRY.as_secs()
            )));
        }
        Ok(())
    }
}

/// Outcome of deleting one key in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStatus {
    Deleted,
    Failed {
        code: Option<String>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub key: String,
    pub status: DeleteStatus,
}

/// Per-key results of a batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeleteResult {
    pub outcomes: Vec<DeleteOutcome>,
}

impl BatchDeleteResult {
    pub(crate) fn deleted(&mut self, key: impl Into<String>) {
        self.outcomes.push(DeleteOutcome {
            key: key.into(),
            status: DeleteStatus::Deleted,
        });
    }

    pub(crate) fn failed(
        &mut self,
        key: impl Into<String>,
        code: Option<String>,
        message: impl Into<String>,
    ) {
        self.outcomes.push(DeleteOutcome {
            key: key.into(),
            status: DeleteStatus::Failed {
                code,
                message: message.into(),
            },
        });
    }

    pub fn deleted_keys(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeleteStatus::Deleted)
            .map(|o| o.key.as_str())
            .collect()
    }

    pub fn failures(&self) -> Vec<&DeleteOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status != DeleteStatus::Deleted)
            .collect()
    }

    pub fn all_deleted(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn status_of(&self, key: &str) -> Option<&DeleteStatus> {
        self.outcomes.iter().find(|o| o.key == key).map(|o| &o.status)
    }
}

/// Cancellation signal for long-running uploads.
///
/// An `Interrupt` created with [`Interrupt::never`] never fires. One created
/// with [`Interrupt::channel`] fires when its [`InterruptHandle`] is
/// triggered; dropping the handle without triggering it does not fire.
#[derive(Debug, Default)]
pub struct Interrupt(Option<oneshot::Receiver<()>>);

/// Triggers the paired [`Interrupt`].
#[derive(Debug)]
pub struct InterruptHandle(oneshot::Sender<()>);

impl Interrupt {
    pub fn never() -> Self {
        Interrupt(None)
    }

    pub fn channel() -> (InterruptHandle, Interrupt) {
        let (tx, rx) = oneshot::channel();
        (InterruptHandle(tx), Interrupt(Some(rx)))
    }

    /// Resolves once the interrupt fires; pends forever otherwise.
    pub(crate) async fn fired(self) {
        if let Some(rx) = self.0 {
            if rx.await.is_ok() {
                return;
            }
        }
        futures::future::pending::<()>().await
    }
}

impl InterruptHandle {
    pub fn interrupt(self) {
        let _ = self.0.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    #[test]
    fn test_object_ref_display() {
        let object = ObjectRef::new("b1", "dir/f.txt");
        assert_eq!(object.to_string(), "b1/dir/f.txt");
    }

    #[test]
    fn test_presign_default_method_is_get() {
        let request = PresignRequest::new(ObjectRef::new("b", "k"), Duration::from_secs(60));
        assert_eq!(request.method, PresignMethod::Get);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_presign_expiry_bounds() {
        let object = ObjectRef::new("b", "k");
        assert!(PresignRequest::new(object.clone(), MAX_PRESIGN_EXPIRY)
            .validate()
            .is_ok());

        let too_long = PresignRequest::new(object.clone(), MAX_PRESIGN_EXPIRY + Duration::from_secs(1));
        let err = too_long.validate().unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
        assert!(err.to_string().contains("604800"));

        let zero = PresignRequest::new(object, Duration::ZERO);
        assert!(matches!(
            zero.validate().unwrap_err(),
            StorageError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_upload_body_bytes() {
        let body = UploadBody::from("hello");
        assert_eq!(body.content_length().await.unwrap(), 5);
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_upload_body_stream_is_bounded_by_length() {
        let body = UploadBody::from_reader(Cursor::new(b"hello world".to_vec()), 5);
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_upload_body_short_stream_is_rejected() {
        let body = UploadBody::from_reader(Cursor::new(b"abc".to_vec()), 10);
        let err = body.into_bytes().await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_upload_body_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        std::fs::write(&path, b"file content").unwrap();

        let body = UploadBody::from_file(&path);
        assert_eq!(body.content_length().await.unwrap(), 12);
        let (mut reader, length) = body.into_reader().await.unwrap();
        assert_eq!(length, 12);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"file content");
    }

    #[tokio::test]
    async fn test_object_content_bytes_and_write_to() {
        let chunks = vec![Ok(Bytes::from_static(b"hel")), Ok(Bytes::from_static(b"lo"))];
        let content = ObjectContent::new(Some(5), None, None, stream::iter(chunks).boxed());
        assert_eq!(content.bytes().await.unwrap(), Bytes::from_static(b"hello"));

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.txt");
        let chunks = vec![Ok(Bytes::from_static(b"abc"))];
        let content = ObjectContent::new(Some(3), None, None, stream::iter(chunks).boxed());
        assert_eq!(content.write_to(&path).await.unwrap(), 3);
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_object_content_propagates_stream_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(StorageError::not_found("b", Some("k"))),
        ];
        let content = ObjectContent::new(None, None, None, stream::iter(chunks).boxed());
        assert!(content.bytes().await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_batch_delete_result_accessors() {
        let mut result = BatchDeleteResult::default();
        result.deleted("a");
        result.deleted("b");
        result.failed("c", Some("AccessDenied".to_string()), "denied");

        assert_eq!(result.deleted_keys(), vec!["a", "b"]);
        assert_eq!(result.failures().len(), 1);
        assert!(!result.all_deleted());
        assert_eq!(result.status_of("a"), Some(&DeleteStatus::Deleted));
        assert!(matches!(
            result.status_of("c"),
            Some(DeleteStatus::Failed { .. })
        ));
        assert_eq!(result.status_of("zzz"), None);
    }

    #[tokio::test]
    async fn test_interrupt_fires() {
        let (handle, interrupt) = Interrupt::channel();
        handle.interrupt();
        tokio::time::timeout(Duration::from_secs(1), interrupt.fired())
            .await
            .expect("interrupt should fire");
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_fire() {
        let (handle, interrupt) = Interrupt::channel();
        drop(handle);
        let result = tokio::time::timeout(Duration::from_millis(50), interrupt.fired()).await;
        assert!(result.is_err());

        let result = tokio::time::timeout(Duration::from_millis(50), Interrupt::never().fired()).await;
        assert!(result.is_err());
    }
}

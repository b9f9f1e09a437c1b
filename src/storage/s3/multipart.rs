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

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use super::errors::translate;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::model::{Interrupt, ObjectRef, PutAck};
use crate::util::io::read_chunk;

const OPERATION: &str = "put_object_multipart";

/// S3 rejects uploads with more parts than this.
pub(crate) const MAX_PARTS: u64 = 10_000;

/// Grow `part_size` so that `length` bytes fit in [`MAX_PARTS`] parts.
pub(crate) fn effective_part_size(part_size: usize, length: u64) -> usize {
    let needed = length.div_ceil(MAX_PARTS);
    part_size.max(usize::try_from(needed).unwrap_or(usize::MAX))
}

/// Upload `length` bytes from `reader` as a multipart upload.
///
/// The upload is aborted on the backend when any part fails, when completion
/// fails, or when `interrupt` fires.
pub(crate) async fn upload(
    client: &Client,
    object: &ObjectRef,
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
    length: u64,
    content_type: Option<&str>,
    part_size: usize,
    interrupt: Interrupt,
) -> StorageResult<PutAck> {
    let part_size = effective_part_size(part_size, length);

    let mut create = client
        .create_multipart_upload()
        .bucket(&object.bucket)
        .key(&object.key);
    if let Some(content_type) = content_type {
        create = create.content_type(content_type);
    }
    let created = create
        .send()
        .await
        .map_err(|e| translate(e, OPERATION, &object.bucket, Some(&object.key)))?;
    let upload_id = created.upload_id().map(str::to_string).ok_or_else(|| {
        StorageError::backend(
            OPERATION,
            &object.bucket,
            Some(&object.key),
            "backend returned no upload id",
        )
    })?;

    info!(
        "Started multipart upload: bucket={}, key={}, length={}, part_size={}, upload_id={}",
        object.bucket, object.key, length, part_size, upload_id
    );

    let outcome = tokio::select! {
        biased;
        _ = interrupt.fired() => {
            Err(StorageError::interrupted(OPERATION, &object.bucket, &object.key))
        }
        parts = upload_parts(client, object, &upload_id, &mut reader, part_size, length) => parts,
    };

    let completed = match outcome {
        Ok(parts) => {
            client
                .complete_multipart_upload()
                .bucket(&object.bucket)
                .key(&object.key)
                .upload_id(&upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder()
                        .set_parts(Some(parts))
                        .build(),
                )
                .send()
                .await
                .map_err(|e| translate(e, OPERATION, &object.bucket, Some(&object.key)))
        }
        Err(e) => Err(e),
    };

    match completed {
        Ok(output) => {
            info!(
                "Completed multipart upload: bucket={}, key={}, upload_id={}",
                object.bucket, object.key, upload_id
            );
            Ok(PutAck {
                e_tag: output.e_tag().map(str::to_string),
                version_id: output.version_id().map(str::to_string),
            })
        }
        Err(e) => {
            abort(client, object, &upload_id).await;
            Err(e)
        }
    }
}

async fn upload_parts<R>(
    client: &Client,
    object: &ObjectRef,
    upload_id: &str,
    reader: &mut R,
    part_size: usize,
    length: u64,
) -> StorageResult<Vec<CompletedPart>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut parts = Vec::new();
    let mut uploaded = 0u64;
    let mut part_number: i32 = 1;

    loop {
        let chunk = read_chunk(reader, part_size).await?;
        if chunk.is_empty() {
            break;
        }
        let chunk_len = chunk.len() as u64;
        let output = client
            .upload_part()
            .bucket(&object.bucket)
            .key(&object.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length(chunk_len as i64)
            .body(ByteStream::from(chunk))
            .send()
            .await
            .map_err(|e| translate(e, OPERATION, &object.bucket, Some(&object.key)))?;

        parts.push(
            CompletedPart::builder()
                .set_e_tag(output.e_tag().map(str::to_string))
                .part_number(part_number)
                .build(),
        );
        uploaded += chunk_len;
        debug!(
            "Uploaded part: key={}, part={}, bytes={}, total={}/{}",
            object.key, part_number, chunk_len, uploaded, length
        );
        part_number += 1;
    }

    if uploaded != length {
        return Err(StorageError::InvalidInput(format!(
            "Upload body ended after {} of {} declared bytes",
            uploaded, length
        )));
    }
    Ok(parts)
}

async fn abort(client: &Client, object: &ObjectRef, upload_id: &str) {
    let result = client
        .abort_multipart_upload()
        .bucket(&object.bucket)
        .key(&object.key)
        .upload_id(upload_id)
        .send()
        .await;
    match result {
        Ok(_) => info!(
            "Aborted multipart upload: bucket={}, key={}, upload_id={}",
            object.bucket, object.key, upload_id
        ),
        // Incomplete uploads are left to the bucket's lifecycle rules
        Err(e) => warn!(
            "Failed to abort multipart upload: bucket={}, key={}, upload_id={}, error={}",
            object.bucket,
            object.key,
            upload_id,
            DisplayErrorContext(&e)
        ),
    }
}

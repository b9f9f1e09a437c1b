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

//! Translation of `aws-sdk-s3` errors into [`StorageError`].

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use crate::storage::error::StorageError;

/// Error codes S3-compatible services use to signal absence.
const NOT_FOUND_CODES: [&str; 3] = ["NoSuchKey", "NoSuchBucket", "NotFound"];

/// True when the code or HTTP status means the bucket or object is missing.
pub(crate) fn is_absence(code: Option<&str>, status: Option<u16>) -> bool {
    match code {
        Some(code) if NOT_FOUND_CODES.contains(&code) => true,
        _ => status == Some(404),
    }
}

pub(crate) fn is_not_found<E>(err: &SdkError<E, HttpResponse>) -> bool
where
    E: ProvideErrorMetadata,
{
    is_absence(err.code(), http_status(err))
}

fn http_status<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|r| r.status().as_u16())
}

/// Wrap an SDK failure, mapping absence to `StorageError::NotFound`.
pub(crate) fn translate<E>(
    err: SdkError<E, HttpResponse>,
    operation: &'static str,
    bucket: &str,
    key: Option<&str>,
) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if is_not_found(&err) {
        return StorageError::not_found(bucket, key);
    }
    StorageError::backend(operation, bucket, key, err)
}

/// Code and human-readable message for per-key reporting.
pub(crate) fn describe<E>(err: &SdkError<E, HttpResponse>) -> (Option<String>, String)
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(err).to_string());
    (code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::head_object::HeadObjectError;
    use std::io;

    #[test]
    fn test_absence_codes() {
        assert!(is_absence(Some("NoSuchKey"), Some(404)));
        assert!(is_absence(Some("NoSuchBucket"), None));
        assert!(is_absence(Some("NotFound"), None));
        assert!(!is_absence(Some("AccessDenied"), Some(403)));
        assert!(!is_absence(None, None));
    }

    #[test]
    fn test_bare_404_is_absence() {
        // HEAD responses carry no body, so no code
        assert!(is_absence(None, Some(404)));
        assert!(is_absence(Some("UnknownError"), Some(404)));
        assert!(!is_absence(None, Some(500)));
    }

    #[test]
    fn test_transport_failure_is_not_not_found() {
        let err: SdkError<HeadObjectError, HttpResponse> = SdkError::construction_failure(
            io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        );
        assert!(!is_not_found(&err));

        let translated = translate(err, "stat_object", "b1", Some("f.txt"));
        assert!(!translated.is_not_found());
        assert!(matches!(
            translated,
            StorageError::Backend {
                operation: "stat_object",
                ..
            }
        ));
        assert_eq!(translated.bucket(), Some("b1"));
        assert_eq!(translated.key(), Some("f.txt"));
    }

    #[test]
    fn test_service_error_metadata() {
        let err = HeadObjectError::generic(
            ErrorMetadata::builder()
                .code("NoSuchKey")
                .message("The specified key does not exist.")
                .build(),
        );
        assert_eq!(err.code(), Some("NoSuchKey"));
        assert!(is_absence(err.code(), None));
    }

    #[test]
    fn test_describe_without_metadata() {
        let err: SdkError<HeadObjectError, HttpResponse> =
            SdkError::construction_failure(io::Error::new(io::ErrorKind::Other, "bad request"));
        let (code, message) = describe(&err);
        assert_eq!(code, None);
        assert!(!message.is_empty());
    }
}

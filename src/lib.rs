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

//! # Unistore
//!
//! A uniform object storage API over AWS S3, MinIO, OCI Object Storage and
//! local directories.
//!
//! Application code is written once against the [`ObjectStorage`] trait; the
//! backend is chosen by configuration and built by
//! [`StorageProviderFactory`].
//!
//! ## Features
//!
//! - **Bucket lifecycle**: idempotent create, existence checks, listing, removal
//! - **Objects**: single-shot and multipart uploads, streamed and ranged downloads,
//!   metadata, server-side copy, single and batch delete
//! - **Presigned URLs**: GET, PUT, DELETE and HEAD, up to seven days
//! - **One error type**: [`StorageError`] tagged with an [`ErrorKind`] to branch on
//!
//! ## Quick Start
//!
//! ### MinIO Example
//!
//! ```rust,no_run
//! use unistore::{ObjectRef, StorageConfig, StorageProviderFactory, UploadBody};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = StorageConfig::minio()
//!     .with_endpoint("localhost:9000")
//!     .with_credentials("minioadmin", "minioadmin")
//!     .with_bucket("b1");
//!
//! let storage = StorageProviderFactory::from_config(config).await?;
//! storage.init_default_bucket().await?;
//!
//! let object = ObjectRef::new("b1", "f.txt");
//! storage
//!     .put_object(&object, UploadBody::from("hello"), Some("text/plain"))
//!     .await?;
//! let content = storage.get_object(&object).await?.bytes().await?;
//! assert_eq!(content.as_ref(), b"hello");
//! # Ok(())
//! # }
//! ```
//!
//! ### AWS S3 Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use unistore::{ObjectRef, PresignRequest, StorageConfig, StorageProviderFactory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! // Credentials come from the default AWS chain when none are configured
//! let config = StorageConfig::aws().with_region("eu-west-1");
//! let storage = StorageProviderFactory::from_config(config).await?;
//!
//! let request = PresignRequest::new(
//!     ObjectRef::new("my-bucket", "report.pdf"),
//!     Duration::from_secs(3600),
//! );
//! println!("{}", storage.presign_url(&request).await?);
//! # Ok(())
//! # }
//! ```
//!
//! For runnable programs, see the `demos/` directory.
//!
//! ## Modules
//!
//! - [`storage`] - Object storage abstraction layer
//! - [`util`] - Utility functions and helpers

pub mod storage;
pub mod util;

// Re-export commonly used types
pub use storage::{
    BackendKind, ErrorKind, Interrupt, ObjectRef, ObjectStorage, PresignMethod, PresignRequest,
    StorageConfig, StorageError, StorageProviderFactory, StorageResult, UploadBody,
};

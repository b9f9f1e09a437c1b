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

//! Object storage abstraction layer
//!
//! This module provides a unified interface over AWS S3, MinIO, OCI Object
//! Storage and a local directory.
//!
//! The three network backends all speak the S3 protocol and share one
//! implementation over `aws-sdk-s3`; they differ only in how the client is
//! configured. The local backend is built on the `object_store` crate's
//! filesystem store.

pub mod config;
pub mod error;
pub mod factory;
pub mod local;
pub mod model;
pub mod oci;
pub mod provider;
pub mod s3;

// Public exports
pub use config::{BackendKind, StorageConfig};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use factory::StorageProviderFactory;
pub use local::LocalStorage;
pub use model::{
    BatchDeleteResult, BucketInfo, DeleteOutcome, DeleteStatus, Interrupt, InterruptHandle,
    ObjectContent, ObjectMetadata, ObjectRef, PresignMethod, PresignRequest, PutAck, UploadBody,
    MAX_PRESIGN_EXPIRY,
};
pub use provider::ObjectStorage;
pub use s3::S3CompatibleStorage;

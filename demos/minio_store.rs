// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use std::time::Duration;
use unistore::storage::Interrupt;
use unistore::{ObjectRef, PresignRequest, StorageConfig, StorageProviderFactory, UploadBody};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let storage_config = StorageConfig::minio()
        .with_endpoint("localhost:9000")
        .with_credentials("minioadmin", "minioadmin")
        .with_bucket("b1");
    let storage = StorageProviderFactory::from_config(storage_config)
        .await
        .unwrap();
    storage.init_default_bucket().await.unwrap();

    let object = ObjectRef::new("b1", "f.txt");
    storage
        .put_object(&object, UploadBody::from("hello"), Some("text/plain"))
        .await
        .unwrap();

    // Large payloads go through multipart; the handle can cancel from another task
    let (_handle, interrupt) = Interrupt::channel();
    let big = ObjectRef::new("b1", "big.bin");
    storage
        .put_object_multipart(&big, UploadBody::from(vec![0u8; 12 * 1024 * 1024]), None, interrupt)
        .await
        .unwrap();

    let url = storage
        .presign_url(&PresignRequest::new(object.clone(), Duration::from_secs(600)))
        .await
        .unwrap();
    println!("Presigned GET: {}", url);

    storage.delete_object(&object).await.unwrap();
    storage.delete_object(&big).await.unwrap();
}

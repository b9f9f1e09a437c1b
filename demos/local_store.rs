// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use unistore::{ObjectRef, StorageConfig, StorageProviderFactory, UploadBody};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let root = std::env::temp_dir().join("unistore-demo");
    std::fs::create_dir_all(&root).unwrap();

    let storage_config = StorageConfig::local()
        .with_option("path", root.to_string_lossy())
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

    let metadata = storage.stat_object(&object).await.unwrap();
    let content = storage.get_object(&object).await.unwrap().bytes().await.unwrap();
    println!(
        "{} ({} bytes): {}",
        object,
        metadata.content_length,
        String::from_utf8_lossy(&content)
    );

    let keys = storage.list_object_keys("b1", "", -1).await.unwrap();
    let result = storage.delete_objects("b1", &keys).await.unwrap();
    println!("Deleted: {:?}", result.deleted_keys());
}

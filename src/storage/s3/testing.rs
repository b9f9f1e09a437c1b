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

//! Offline S3 storage whose HTTP layer is answered by a closure.

use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation, StalledStreamProtectionConfig,
};
use aws_sdk_s3::primitives::SdkBody;
use aws_sdk_s3::Client;
use aws_smithy_http_client::test_util::infallible_client_fn;
use std::sync::{Arc, Mutex};

use super::S3CompatibleStorage;
use crate::storage::config::{StorageConfig, MIN_PART_SIZE};

pub(crate) type Request = http::Request<SdkBody>;
pub(crate) type Response = http::Response<String>;

/// One request as seen by the fake endpoint.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub method: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|(k, _)| k == name)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Calls(Arc<Mutex<Vec<Call>>>);

impl Calls {
    pub fn all(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// Requests with `method` that carry the query parameter `param`.
    pub fn count(&self, method: &str, param: &str) -> usize {
        self.all()
            .iter()
            .filter(|c| c.method == method && c.has_param(param))
            .count()
    }
}

pub(crate) fn query_params(request: &Request) -> Vec<(String, String)> {
    let query = request.uri().query().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub(crate) fn query_param(request: &Request, name: &str) -> Option<String> {
    query_params(request)
        .into_iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v)
}

pub(crate) fn body_text(request: &Request) -> String {
    String::from_utf8_lossy(request.body().bytes().unwrap_or_default()).into_owned()
}

/// Values of every `<Key>` element in an XML body.
pub(crate) fn xml_keys(body: &str) -> Vec<String> {
    body.split("<Key>")
        .skip(1)
        .filter_map(|s| s.split("</Key>").next())
        .map(str::to_string)
        .collect()
}

pub(crate) fn respond(status: u16, body: impl Into<String>) -> Response {
    http::Response::builder()
        .status(status)
        .body(body.into())
        .unwrap()
}

pub(crate) fn access_denied() -> Response {
    respond(
        403,
        "<Error><Code>AccessDenied</Code><Message>Access Denied</Message>\
         <RequestId>req-1</RequestId></Error>",
    )
}

/// MinIO-flavoured storage on `localhost:9000` with 5 MiB parts and no
/// retries, whose requests are answered by `handler`.
pub(crate) fn fake_storage<F>(handler: F) -> (S3CompatibleStorage, Calls)
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    let calls = Calls::default();
    let recorded = calls.clone();
    let http_client = infallible_client_fn(move |request: Request| {
        recorded.0.lock().unwrap().push(Call {
            method: request.method().to_string(),
            params: query_params(&request),
        });
        handler(&request)
    });

    let client_config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .endpoint_url("http://localhost:9000")
        .force_path_style(true)
        .credentials_provider(Credentials::new("k", "s", None, None, "test"))
        .retry_config(RetryConfig::disabled())
        .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .http_client(http_client)
        .build();
    let config = StorageConfig::minio()
        .with_endpoint("localhost:9000")
        .with_credentials("k", "s")
        .with_bucket("b1")
        .with_option("multipart_part_size", MIN_PART_SIZE.to_string());
    let storage =
        S3CompatibleStorage::with_client(Client::from_conf(client_config), config).unwrap();
    (storage, calls)
}

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

//! OCI Object Storage URL helpers.
//!
//! OCI is reached through its S3 compatibility API, whose endpoint is derived
//! from the tenancy namespace and the region.

/// S3 compatibility endpoint for a namespace and region.
///
/// ```
/// use unistore::storage::oci::compat_endpoint;
///
/// assert_eq!(
///     compat_endpoint("axaxnpcrorw5", "us-ashburn-1"),
///     "https://axaxnpcrorw5.compat.objectstorage.us-ashburn-1.oraclecloud.com"
/// );
/// ```
pub fn compat_endpoint(namespace: &str, region: &str) -> String {
    format!(
        "https://{}.compat.objectstorage.{}.oraclecloud.com",
        namespace.trim(),
        region.trim()
    )
}

/// URL of an object shared through a pre-authenticated request.
///
/// `access_uri` is the path returned when the request was created, e.g.
/// `/p/<token>/n/<namespace>/b/<bucket>/o/`. The object name is appended as
/// given.
pub fn preauth_url(region: &str, access_uri: &str, object_name: &str) -> String {
    format!(
        "https://objectstorage.{}.oraclecloud.com{}{}",
        region.trim(),
        access_uri,
        object_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compat_endpoint_trims_input() {
        assert_eq!(
            compat_endpoint(" ns ", "eu-frankfurt-1"),
            "https://ns.compat.objectstorage.eu-frankfurt-1.oraclecloud.com"
        );
    }

    #[test]
    fn test_preauth_url() {
        assert_eq!(
            preauth_url("us-ashburn-1", "/p/abc123/n/ns/b/b1/o/", "reports/q1.pdf"),
            "https://objectstorage.us-ashburn-1.oraclecloud.com/p/abc123/n/ns/b/b1/o/reports/q1.pdf"
        );
    }

    #[test]
    fn test_preauth_url_parses() {
        let url = preauth_url("ap-tokyo-1", "/p/t/n/ns/b/b1/o/", "a.txt");
        let parsed = url::Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("objectstorage.ap-tokyo-1.oraclecloud.com"));
        assert!(parsed.path().ends_with("/o/a.txt"));
    }
}

//! Amazon S3 object store.
//!
//! Downloads uploaded documents with signed `GetObject` requests against the
//! S3 REST API. Signing is AWS Signature V4 implemented on `hmac` + `sha2`,
//! so no C library dependencies are pulled in.
//!
//! # Configuration
//!
//! ```toml
//! [storage]
//! backend = "s3"
//!
//! [storage.s3]
//! bucket = "chatpdf-uploads"
//! region = "us-east-1"
//! # endpoint_url = "http://localhost:9000"   # MinIO
//! ```
//!
//! With `endpoint_url` set, requests use path-style addressing
//! (`{endpoint}/{bucket}/{key}`); otherwise virtual-hosted style
//! (`https://{bucket}.s3.{region}.amazonaws.com/{key}`).
//!
//! # Environment Variables
//!
//! - `AWS_ACCESS_KEY_ID` (required)
//! - `AWS_SECRET_ACCESS_KEY` (required)
//! - `AWS_SESSION_TOKEN` (optional, temporary credentials)

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use pdfchat_core::source::ObjectStore;
use pdfchat_core::{PipelineError, Result};

use crate::config::S3Config;

type HmacSha256 = Hmac<Sha256>;

/// AWS credentials used to sign requests.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Load credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// and optionally `AWS_SESSION_TOKEN`.
    pub fn from_env() -> anyhow::Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// [`ObjectStore`] backed by a single S3 bucket.
pub struct S3ObjectStore {
    client: reqwest::Client,
    config: S3Config,
    creds: AwsCredentials,
}

impl S3ObjectStore {
    pub fn from_config(config: &S3Config) -> anyhow::Result<Self> {
        Self::new(config.clone(), AwsCredentials::from_env()?)
    }

    pub fn new(config: S3Config, creds: AwsCredentials) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build S3 HTTP client")?;
        Ok(Self {
            client,
            config,
            creds,
        })
    }

    /// Request URL and canonical URI for `key`.
    fn object_location(&self, key: &str) -> (String, String) {
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        match &self.config.endpoint_url {
            Some(endpoint) => {
                let canonical_uri = format!("/{}/{}", uri_encode(&self.config.bucket), encoded_key);
                let url = format!("{}{}", endpoint.trim_end_matches('/'), canonical_uri);
                (url, canonical_uri)
            }
            None => {
                let canonical_uri = format!("/{}", encoded_key);
                let url = format!("https://{}{}", s3_host(&self.config), canonical_uri);
                (url, canonical_uri)
            }
        }
    }

    /// Signed headers for a `GET` of `canonical_uri` at the current time.
    fn sign_get(
        &self,
        canonical_uri: &str,
    ) -> std::result::Result<Vec<(String, String)>, InvalidLength> {
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let payload_hash = hex_sha256(b"");

        let mut headers = vec![
            ("host".to_string(), s3_host(&self.config)),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "GET\n{}\n\n{}\n{}\n{}",
            canonical_uri, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.config.region,
            "s3",
        )?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.creds.access_key_id, credential_scope, signed_headers, signature
        );

        // reqwest fills in Host from the URL.
        let mut out: Vec<(String, String)> =
            headers.into_iter().filter(|(k, _)| k != "host").collect();
        out.push(("authorization".to_string(), authorization));
        Ok(out)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn backend(&self) -> &str {
        "s3"
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let (url, canonical_uri) = self.object_location(key);
        let headers = self
            .sign_get(&canonical_uri)
            .map_err(|e| PipelineError::source_fetch(key, format!("request signing failed: {}", e)))?;

        let mut req_builder = self.client.get(&url);
        for (name, value) in &headers {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!(bucket = %self.config.bucket, key, "fetching object");

        let resp = req_builder.send().await.map_err(|e| {
            PipelineError::source_fetch(
                key,
                format!("failed to get s3://{}/{}: {}", self.config.bucket, key, e),
            )
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(PipelineError::source_fetch(
                key,
                format!("S3 GetObject failed (HTTP {})", status),
            ));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| PipelineError::source_fetch(key, e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

// ============ AWS SigV4 Helpers ============

/// Hostname requests are addressed to (and signed for).
fn s3_host(config: &S3Config) -> String {
    if let Some(ref endpoint) = config.endpoint_url {
        endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string()
    } else {
        format!("{}.s3.{}.amazonaws.com", config.bucket, config.region)
    }
}

/// Lowercase hex SHA-256, used for the payload hash and the canonical request.
fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// One HMAC-SHA256 round of the signing chain.
fn hmac_sha256(key: &[u8], data: &[u8]) -> std::result::Result<Vec<u8>, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the SigV4 signing key by chaining HMACs over the credential scope:
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> std::result::Result<Vec<u8>, InvalidLength> {
    let seed = format!("AWS4{}", secret_key).into_bytes();
    [date_stamp, region, service, "aws4_request"]
        .iter()
        .try_fold(seed, |key, part| hmac_sha256(&key, part.as_bytes()))
}

/// Percent-encode one path segment for the canonical URI. Only the RFC 3986
/// unreserved set (`A-Z a-z 0-9 - _ . ~`) passes through unescaped.
fn uri_encode(segment: &str) -> String {
    segment.bytes().fold(String::with_capacity(segment.len()), |mut out, b| {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: None,
        }
    }

    fn s3_config(endpoint_url: Option<String>) -> S3Config {
        S3Config {
            bucket: "uploads".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_signing_key_matches_aws_example() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("report v2.pdf"), "report%20v2.pdf");
        assert_eq!(uri_encode("a~b_c-d.e"), "a~b_c-d.e");
        assert_eq!(uri_encode("ü"), "%C3%BC");
        assert_eq!(uri_encode("a/b+c"), "a%2Fb%2Bc");
    }

    #[test]
    fn test_hex_sha256_of_empty_payload() {
        assert_eq!(
            hex_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_virtual_hosted_location() {
        let store = S3ObjectStore::new(s3_config(None), creds()).unwrap();
        let (url, canonical) = store.object_location("uploads/17 report.pdf");
        assert_eq!(
            url,
            "https://uploads.s3.us-east-1.amazonaws.com/uploads/17%20report.pdf"
        );
        assert_eq!(canonical, "/uploads/17%20report.pdf");
    }

    #[test]
    fn test_path_style_location_with_endpoint() {
        let store =
            S3ObjectStore::new(s3_config(Some("http://localhost:9000/".to_string())), creds())
                .unwrap();
        let (url, canonical) = store.object_location("a/b.pdf");
        assert_eq!(url, "http://localhost:9000/uploads/a/b.pdf");
        assert_eq!(canonical, "/uploads/a/b.pdf");
        assert_eq!(s3_host(&store.config), "localhost:9000");
    }

    #[tokio::test]
    async fn test_fetch_returns_object_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uploads/docs/paper.pdf"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(header("x-amz-content-sha256", hex_sha256(b"").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 body".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let store = S3ObjectStore::new(s3_config(Some(server.uri())), creds()).unwrap();
        let bytes = store.fetch("docs/paper.pdf").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4 body");
        assert_eq!(store.backend(), "s3");
    }

    #[tokio::test]
    async fn test_missing_object_is_source_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = S3ObjectStore::new(s3_config(Some(server.uri())), creds()).unwrap();
        let err = store.fetch("missing.pdf").await.unwrap_err();
        match err {
            PipelineError::SourceFetch { key, message } => {
                assert_eq!(key, "missing.pdf");
                assert!(message.contains("404"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

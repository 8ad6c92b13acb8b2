//! S3-compatible object storage (AWS, MinIO, DigitalOcean Spaces, ...).
//!
//! Requests are signed with AWS Signature Version 4. An empty access key
//! sends unsigned requests, which works for public buckets.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode, Url};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::BlobStore;
use crate::config::S3Config;
use crate::error::{MigrateError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

/// Where an object lives: the URL to call, the Host header and the
/// canonical URI that gets signed.
#[derive(Debug, PartialEq)]
struct ObjectLocation {
    url: String,
    host: String,
    canonical_uri: String,
}

/// S3 bucket blob store.
pub struct S3BlobStore {
    client: Client,
    config: S3Config,
    endpoint: Url,
}

impl S3BlobStore {
    pub fn new(config: S3Config) -> Result<Self> {
        let endpoint = Url::parse(&config.get_endpoint()).map_err(|e| {
            MigrateError::Config(format!("invalid storage.s3.endpoint: {}", e))
        })?;
        if endpoint.host_str().is_none() {
            return Err(MigrateError::Config(
                "storage.s3.endpoint must include a host".into(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MigrateError::Config(format!("unable to build S3 client: {}", e)))?;

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    fn locate(&self, key: &str) -> ObjectLocation {
        let endpoint_host = match (self.endpoint.host_str(), self.endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        let encoded_key = uri_encode(key.trim_start_matches('/'));

        let (host, canonical_uri) = if self.config.force_path_style {
            (
                endpoint_host,
                format!("/{}/{}", uri_encode(&self.config.bucket), encoded_key),
            )
        } else {
            (
                format!("{}.{}", self.config.bucket, endpoint_host),
                format!("/{}", encoded_key),
            )
        };

        ObjectLocation {
            url: format!("{}://{}{}", self.endpoint.scheme(), host, canonical_uri),
            host,
            canonical_uri,
        }
    }

    /// `Authorization` header value for a request made at `now`.
    fn authorization(
        &self,
        method: &str,
        location: &ObjectLocation,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            location.host, payload_hash, amz_date
        );
        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method, location.canonical_uri, canonical_headers, SIGNED_HEADERS, payload_hash
        );

        let scope = format!("{}/{}/s3/aws4_request", date, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = signing_key(&self.config.secret, &date, &self.config.region, "s3")?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        Ok(format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.config.access_key, scope, SIGNED_HEADERS, signature
        ))
    }

    fn request(
        &self,
        method: reqwest::Method,
        location: &ObjectLocation,
        payload_hash: &str,
    ) -> Result<reqwest::RequestBuilder> {
        let mut builder = self.client.request(method.clone(), &location.url);
        if !self.config.access_key.is_empty() {
            let now = Utc::now();
            builder = builder
                .header(
                    "Authorization",
                    self.authorization(method.as_str(), location, payload_hash, now)?,
                )
                .header("x-amz-date", now.format("%Y%m%dT%H%M%SZ").to_string())
                .header("x-amz-content-sha256", payload_hash);
        }
        Ok(builder)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let location = self.locate(key);
        let empty_hash = hex::encode(Sha256::digest(b""));
        debug!("GET {}", location.url);

        let resp = self
            .request(reqwest::Method::GET, &location, &empty_hash)?
            .send()
            .await
            .map_err(|e| MigrateError::blob(key, e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(MigrateError::blob(key, "not found"));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MigrateError::blob(
                key,
                format!("GET failed: HTTP {} {}", status, body),
            ));
        }
        resp.bytes().await.map_err(|e| MigrateError::blob(key, e))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let location = self.locate(key);
        let payload_hash = hex::encode(Sha256::digest(&data));
        debug!("PUT {} ({} bytes)", location.url, data.len());

        let resp = self
            .request(reqwest::Method::PUT, &location, &payload_hash)?
            .body(data)
            .send()
            .await
            .map_err(|e| MigrateError::blob(key, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MigrateError::blob(
                key,
                format!("PUT failed: HTTP {} {}", status, body),
            ));
        }
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| MigrateError::Config(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the SigV4 signing key for a day, region and service.
fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Percent-encode an object key, keeping `/` separators.
fn uri_encode(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

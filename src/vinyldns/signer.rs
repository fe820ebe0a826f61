//! AWS Signature Version 4 request signing.
//!
//! VinylDNS authenticates API users with an access/secret key pair and
//! expects every request to carry a SigV4 `Authorization` header scoped to
//! the `VinylDNS` service.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use reqwest::Url;
use ring::{digest, hmac};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_SERVICE: &str = "VinylDNS";
const SIGNED_HEADERS: &str = "host;x-amz-date";

/// Headers to attach to a signed request.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub amz_date: String,
    pub authorization: String,
}

#[derive(Clone)]
pub struct Signer {
    access_key: String,
    secret_key: String,
    region: String,
    service: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

impl Signer {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: DEFAULT_REGION.into(),
            service: DEFAULT_SERVICE.into(),
        }
    }

    /// Override the credential scope (`us-east-1` / `VinylDNS` by default).
    pub fn with_scope(mut self, region: impl Into<String>, service: impl Into<String>) -> Self {
        self.region = region.into();
        self.service = service.into();
        self
    }

    pub fn sign(&self, method: &str, url: &Url, body: &[u8], now: DateTime<Utc>) -> Signature {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);

        let canonical_request = format!(
            "{method}\n{uri}\n{query}\nhost:{host}\nx-amz-date:{amz_date}\n\n{SIGNED_HEADERS}\n{payload}",
            uri = canonical_uri(url),
            query = canonical_query(url),
            host = host_header(url),
            payload = hex::encode(digest::digest(&digest::SHA256, body)),
        );

        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(digest::digest(&digest::SHA256, canonical_request.as_bytes()))
        );

        let mut key = hmac_sha256(format!("AWS4{}", self.secret_key).as_bytes(), date.as_bytes());
        for part in [self.region.as_str(), self.service.as_str(), "aws4_request"] {
            key = hmac_sha256(&key, part.as_bytes());
        }
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

        Signature {
            authorization: format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
                self.access_key
            ),
            amz_date,
        }
    }
}

/// Host header value as reqwest sends it: port only when non-default.
pub fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn canonical_uri(url: &Url) -> &str {
    match url.path() {
        "" => "/",
        path => path,
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn uri_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&key, data).as_ref().to_vec()
}

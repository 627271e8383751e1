//! AWS Signature Version 4 request signing
//!
//! Only what the connector needs: header-based signing of a request whose
//! headers are already known. Header names must be lowercase.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::credentials::Credentials;
use crate::error::CloudWatchError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// `X-Amz-Date` format
pub fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Value for the `Host` header as the HTTP client will send it
pub fn host_header(url: &Url) -> Result<String, CloudWatchError> {
    let host = url
        .host_str()
        .ok_or_else(|| CloudWatchError::Endpoint(format!("{url} has no host")))?;

    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Scope of a signature
#[derive(Debug, Clone, Copy)]
pub struct SigningScope<'a> {
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningScope<'_> {
    fn date(&self) -> String {
        self.time.format("%Y%m%d").to_string()
    }

    fn credential_scope(&self) -> String {
        format!("{}/{}/{}/aws4_request", self.date(), self.region, self.service)
    }
}

/// Compute the `Authorization` header for a request
///
/// `headers` must contain every header to be signed, including `host` and
/// `x-amz-date`.
pub fn authorization(
    method: &str,
    url: &Url,
    headers: &BTreeMap<String, String>,
    payload: &[u8],
    credentials: &Credentials,
    scope: SigningScope<'_>,
) -> Result<String, CloudWatchError> {
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let canonical_request = canonical_request(method, url, headers, &signed_headers, payload);

    let string_to_sign = format!(
        "{ALGORITHM}\n{}\n{}\n{}",
        amz_date(scope.time),
        scope.credential_scope(),
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(&credentials.secret_access_key, scope)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(format!(
        "{ALGORITHM} Credential={}/{}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id,
        scope.credential_scope()
    ))
}

fn canonical_request(
    method: &str,
    url: &Url,
    headers: &BTreeMap<String, String>,
    signed_headers: &str,
    payload: &[u8],
) -> String {
    let path = match url.path() {
        "" => "/",
        path => path,
    };

    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    query.sort();
    let query = query
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", normalize_whitespace(value)))
        .collect();

    format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{}",
        hex::encode(Sha256::digest(payload))
    )
}

fn signing_key(secret: &str, scope: SigningScope<'_>) -> Result<Vec<u8>, CloudWatchError> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), scope.date().as_bytes())?;
    let k_region = hmac_sha256(&k_date, scope.region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, scope.service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CloudWatchError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| CloudWatchError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// RFC 3986 encoding, leaving only unreserved characters as-is
fn uri_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

//! AWS Signature Version 4
//!
//! Header-based signing for S3 requests:
//! <https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-header-based-auth.html>
//!
//! 1. Create a canonical request
//! 2. Create the string to sign
//! 3. Derive the signing key
//! 4. Add the signature to the request as an `Authorization` header

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use super::credentials::Credentials;
use crate::error::{AgentError, Result};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Hash of an empty payload
pub const EMPTY_PAYLOAD_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// SigV4 signer for one set of credentials and region
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: Credentials,
    region: String,
}

impl SigV4Signer {
    pub fn new(credentials: Credentials, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
        }
    }

    /// Sign a request, returning the full header set to send
    ///
    /// `headers` holds any extra headers to sign (e.g. `range`); names must be
    /// lowercase. `host`, `x-amz-date`, `x-amz-content-sha256` and, for
    /// temporary credentials, `x-amz-security-token` are added here.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &BTreeMap<String, String>,
        payload_hash: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<BTreeMap<String, String>> {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        let mut signed = headers.clone();
        signed.insert("host".to_string(), host_header(url));
        signed.insert("x-amz-date".to_string(), amz_date.clone());
        signed.insert("x-amz-content-sha256".to_string(), payload_hash.to_string());
        if let Some(token) = &self.credentials.session_token {
            signed.insert("x-amz-security-token".to_string(), token.clone());
        }

        let canonical_request = canonical_request(method, url, &signed, payload_hash);

        let scope = format!("{}/{}/{}/aws4_request", date_stamp, self.region, SERVICE);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let signing_key = self.signing_key(&date_stamp)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.credentials.access_key_id,
            scope,
            signed_header_names(&signed),
            signature
        );
        signed.insert("authorization".to_string(), authorization);
        Ok(signed)
    }

    /// kSigning = HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")
    fn signing_key(&self, date_stamp: &str) -> Result<Vec<u8>> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac_sha256(secret.as_bytes(), date_stamp.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, SERVICE.as_bytes())?;
        hmac_sha256(&k_service, b"aws4_request")
    }
}

/// Build the canonical request string
///
/// The URL path is used as sent (already percent-encoded); query parameters
/// are re-encoded and sorted.
pub fn canonical_request(
    method: &str,
    url: &Url,
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> String {
    let path = if url.path().is_empty() { "/" } else { url.path() };
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        path,
        canonical_query(url),
        canonical_headers(headers),
        signed_header_names(headers),
        payload_hash
    )
}

fn canonical_query(url: &Url) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    params.sort();
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// `name:value\n` per header, BTreeMap keys are already sorted
fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect()
}

fn signed_header_names(headers: &BTreeMap<String, String>) -> String {
    headers.keys().cloned().collect::<Vec<_>>().join(";")
}

/// `Host` header value, with the port only when it is not the scheme default
pub fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// URI-encode everything except RFC 3986 unreserved characters
pub fn uri_encode(input: &str) -> String {
    use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

    const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'.')
        .remove(b'_')
        .remove(b'~');

    utf8_percent_encode(input, UNRESERVED).to_string()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AgentError::Config(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

//! S3-compatible object store
//!
//! Talks to the S3 REST API over blocking HTTP.
//!
//! ## Transfer strategy
//! - **Download**: `HEAD` for the size, then ranged `GET`s of `part_size`
//!   fetched by `download_concurrency` workers. Parts are written at their
//!   offsets on the calling thread as they arrive.
//! - **Upload**: the body is read in `part_size` chunks on the calling thread.
//!   A body that fits in one part is sent with a single `PUT`; anything larger
//!   becomes a multipart upload whose parts are sent by `upload_concurrency`
//!   workers. The first failed part stops the upload, which is then aborted.
//!
//! No retries: a failed request fails the transfer.

mod credentials;
mod signing;
mod xml;

pub use credentials::{load_profile, parse_profile, resolve, Credentials};
pub use signing::{canonical_request, host_header, sha256_hex, uri_encode, SigV4Signer, EMPTY_PAYLOAD_HASH};
pub use xml::{complete_multipart_body, parse_error, parse_upload_id, S3ErrorBody};

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use crossbeam::channel;
use reqwest::blocking::{Client, Response};
use reqwest::Method;
use url::Url;

use super::{read_part, ObjectStore, StoreConnector, TransferOptions};
use crate::config::{Config, StorageSettings};
use crate::error::{AgentError, Result};
use crate::progress::WriteAt;

/// Smallest part S3 accepts for any but the last part of a multipart upload
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Connects to S3 using the agent configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Connector;

impl StoreConnector for S3Connector {
    fn connect(&self, config: &Config) -> Result<Box<dyn ObjectStore>> {
        Ok(Box::new(S3Store::new(config)?))
    }
}

/// Object store for one bucket on an S3-compatible endpoint
pub struct S3Store {
    http: Client,
    endpoint: Url,
    settings: StorageSettings,

    /// `None` sends unsigned requests
    signer: Option<SigV4Signer>,

    options: TransferOptions,
}

impl S3Store {
    /// Build a store from the agent configuration
    pub fn new(config: &Config) -> Result<Self> {
        let settings = config.storage_settings()?;
        let credentials = resolve(config)?;

        let mut options = TransferOptions::from_config(config);
        if options.part_size < MIN_PART_SIZE {
            tracing::warn!(
                "Part size {} is below the S3 minimum, using {}",
                options.part_size,
                MIN_PART_SIZE
            );
            options.part_size = MIN_PART_SIZE;
        }
        Self::with_parts(settings, credentials, options)
    }

    /// Build a store from already resolved parts
    pub fn with_parts(
        settings: StorageSettings,
        credentials: Option<Credentials>,
        options: TransferOptions,
    ) -> Result<Self> {
        let endpoint = Url::parse(&settings.endpoint).map_err(|e| {
            AgentError::Config(format!("invalid endpoint {}: {}", settings.endpoint, e))
        })?;
        if endpoint.host_str().is_none() {
            return Err(AgentError::Config(format!(
                "endpoint {} has no host",
                settings.endpoint
            )));
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| AgentError::Config(format!("cannot build HTTP client: {}", e)))?;

        let signer = credentials.map(|c| SigV4Signer::new(c, settings.region.clone()));

        Ok(Self {
            http,
            endpoint,
            settings,
            signer,
            options,
        })
    }

    pub fn options(&self) -> TransferOptions {
        self.options
    }

    /// URL of `key`, path-style or virtual-hosted
    pub fn object_url(&self, key: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        let base = self.endpoint.path().trim_end_matches('/');
        let key = key
            .split('/')
            .map(uri_encode)
            .collect::<Vec<_>>()
            .join("/");

        if self.settings.use_path_style {
            url.set_path(&format!("{}/{}/{}", base, uri_encode(&self.settings.bucket), key));
        } else {
            let host = format!(
                "{}.{}",
                self.settings.bucket,
                self.endpoint.host_str().unwrap_or_default()
            );
            url.set_host(Some(&host))
                .map_err(|e| AgentError::Config(format!("invalid bucket host {}: {}", host, e)))?;
            url.set_path(&format!("{}/{}", base, key));
        }
        Ok(url)
    }

    // =========================================================================
    // Single requests
    // =========================================================================

    /// Object size from `HEAD`
    pub fn head_object(&self, key: &str) -> Result<u64> {
        let url = self.object_url(key)?;
        let response = self.send(Method::HEAD, url, BTreeMap::new(), None)?;

        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                AgentError::RemoteTransfer(format!("HEAD {}: missing Content-Length", key))
            })
    }

    /// Bytes `start..=end` of `key`
    pub fn get_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        let url = self.object_url(key)?;
        let mut headers = BTreeMap::new();
        headers.insert("range".to_string(), format!("bytes={}-{}", start, end));

        let data = self.send(Method::GET, url, headers, None)?.bytes()?;
        let expected = end - start + 1;
        if data.len() as u64 != expected {
            return Err(AgentError::RemoteTransfer(format!(
                "GET {} bytes={}-{}: got {} bytes, expected {}",
                key,
                start,
                end,
                data.len(),
                expected
            )));
        }
        Ok(data)
    }

    pub fn put_object(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let url = self.object_url(key)?;
        self.send(Method::PUT, url, BTreeMap::new(), Some(body))?;
        Ok(())
    }

    pub fn create_multipart_upload(&self, key: &str) -> Result<String> {
        let mut url = self.object_url(key)?;
        url.set_query(Some("uploads"));
        let body = self.send(Method::POST, url, BTreeMap::new(), None)?.text()?;
        parse_upload_id(&body)
    }

    /// Upload one part, returning its ETag
    pub fn upload_part(&self, key: &str, upload_id: &str, number: u32, data: Vec<u8>) -> Result<String> {
        let mut url = self.object_url(key)?;
        url.query_pairs_mut()
            .append_pair("partNumber", &number.to_string())
            .append_pair("uploadId", upload_id);

        let response = self.send(Method::PUT, url, BTreeMap::new(), Some(data))?;
        response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                AgentError::RemoteTransfer(format!("part {} of {}: missing ETag", number, key))
            })
    }

    pub fn complete_multipart_upload(&self, key: &str, upload_id: &str, parts: &[(u32, String)]) -> Result<()> {
        let mut url = self.object_url(key)?;
        url.query_pairs_mut().append_pair("uploadId", upload_id);

        let body = complete_multipart_body(parts).into_bytes();
        let text = self.send(Method::POST, url, BTreeMap::new(), Some(body))?.text()?;

        // S3 may report a failure inside a 200 response.
        if let Some(error) = parse_error(&text) {
            return Err(remote_error("POST", key, "200 OK", Some(error)));
        }
        Ok(())
    }

    pub fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        let mut url = self.object_url(key)?;
        url.query_pairs_mut().append_pair("uploadId", upload_id);
        self.send(Method::DELETE, url, BTreeMap::new(), None)?;
        Ok(())
    }

    /// Sign (when credentials are present), send, and check the status
    fn send(
        &self,
        method: Method,
        url: Url,
        mut headers: BTreeMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        if let Some(signer) = &self.signer {
            let payload_hash = match &body {
                Some(data) => sha256_hex(data),
                None => EMPTY_PAYLOAD_HASH.to_string(),
            };
            headers = signer.sign(method.as_str(), &url, &headers, &payload_hash, Utc::now())?;
        }
        // reqwest derives Host from the URL itself.
        headers.remove("host");

        tracing::debug!("{} {}", method, url);

        let mut request = self.http.request(method.clone(), url.clone());
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(data) = body {
            request = request.body(data);
        }

        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().unwrap_or_default();
        Err(remote_error(
            method.as_str(),
            url.path(),
            &status.to_string(),
            parse_error(&text),
        ))
    }

    // =========================================================================
    // Multipart upload
    // =========================================================================

    fn upload_multipart(&self, key: &str, first: Vec<u8>, second: Vec<u8>, body: &mut dyn Read) -> Result<u64> {
        let upload_id = self.create_multipart_upload(key)?;
        tracing::debug!("Started multipart upload {} for {}", upload_id, key);

        let workers = self.options.upload_concurrency;
        let (job_tx, job_rx) = channel::bounded::<(u32, Vec<u8>)>(workers);
        let (result_tx, result_rx) = channel::unbounded::<Result<(u32, String)>>();

        // Set by the first failing part; stops the feeder from reading on.
        let stopped = AtomicBool::new(false);

        let (fed, mut parts, failure) = thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let upload_id = upload_id.as_str();
                let stopped = &stopped;
                scope.spawn(move || {
                    for (number, data) in job_rx.iter() {
                        let result = self
                            .upload_part(key, upload_id, number, data)
                            .map(|etag| (number, etag));
                        let failed = result.is_err();
                        if failed {
                            stopped.store(true, Ordering::SeqCst);
                        }
                        if result_tx.send(result).is_err() || failed {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            // Feed parts from the body; this thread owns the reader.
            let fed = (|| -> Result<u64> {
                let mut total = (first.len() + second.len()) as u64;
                let send = |number: u32, data: Vec<u8>| {
                    if stopped.load(Ordering::SeqCst) {
                        return Err(AgentError::RemoteTransfer("part upload failed".to_string()));
                    }
                    job_tx
                        .send((number, data))
                        .map_err(|_| AgentError::RemoteTransfer("part workers stopped".to_string()))
                };
                send(1, first)?;
                send(2, second)?;

                let mut number = 2;
                loop {
                    let part = read_part(body, self.options.part_size)?;
                    if part.is_empty() {
                        return Ok(total);
                    }
                    number += 1;
                    total += part.len() as u64;
                    send(number, part)?;
                }
            })();
            drop(job_tx);

            let mut parts = Vec::new();
            let mut failure = None;
            for result in result_rx.iter() {
                match result {
                    Ok(part) => parts.push(part),
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                }
            }
            (fed, parts, failure)
        });

        // Prefer the part's error over the feeder's.
        let outcome = match (fed, failure) {
            (_, Some(e)) | (Err(e), None) => Err(e),
            (Ok(total), None) => {
                parts.sort_by_key(|(number, _)| *number);
                self.complete_multipart_upload(key, &upload_id, &parts)
                    .map(|_| total)
            }
        };

        if outcome.is_err() {
            if let Err(e) = self.abort_multipart_upload(key, &upload_id) {
                tracing::warn!("Unable to abort multipart upload {}: {}", upload_id, e);
            }
        }
        outcome
    }
}

impl ObjectStore for S3Store {
    fn upload(&self, key: &str, body: &mut dyn Read) -> Result<u64> {
        let part_size = self.options.part_size;

        let first = read_part(body, part_size)?;
        if first.len() < part_size {
            let size = first.len() as u64;
            self.put_object(key, first)?;
            return Ok(size);
        }

        let second = read_part(body, part_size)?;
        if second.is_empty() {
            let size = first.len() as u64;
            self.put_object(key, first)?;
            return Ok(size);
        }

        self.upload_multipart(key, first, second, body)
    }

    fn download(&self, key: &str, dest: &mut dyn WriteAt) -> Result<u64> {
        let size = self.head_object(key)?;
        if size == 0 {
            return Ok(0);
        }

        let part_size = self.options.part_size as u64;
        let (job_tx, job_rx) = channel::unbounded::<(u64, u64)>();
        let mut start = 0;
        while start < size {
            let end = (start + part_size).min(size) - 1;
            // Receiver is alive; the send cannot fail.
            let _ = job_tx.send((start, end));
            start = end + 1;
        }
        drop(job_tx);

        let workers = self.options.download_concurrency;
        let (result_tx, result_rx) = channel::bounded::<Result<(u64, Bytes)>>(workers);

        // Moving the receiver in drops it on an early return, which stops the
        // workers instead of leaving them blocked on a full channel.
        thread::scope(move |scope| -> Result<u64> {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (start, end) in job_rx.iter() {
                        let result = self.get_range(key, start, end).map(|data| (start, data));
                        let failed = result.is_err();
                        if result_tx.send(result).is_err() || failed {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            let mut written = 0;
            for result in result_rx.iter() {
                let (offset, data) = result?;
                dest.write_all_at(&data, offset)?;
                written += data.len() as u64;
            }
            Ok(written)
        })
    }
}

fn remote_error(method: &str, target: &str, status: &str, body: Option<S3ErrorBody>) -> AgentError {
    match body {
        Some(S3ErrorBody { code, message }) => AgentError::RemoteTransfer(format!(
            "{} {}: {} {}: {}",
            method,
            target,
            status,
            code,
            message.unwrap_or_default()
        )),
        None => AgentError::RemoteTransfer(format!("{} {}: {}", method, target, status)),
    }
}

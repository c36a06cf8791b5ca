//! Configuration for lfs-s3
//!
//! Resolved once at startup (from the environment plus CLI overrides) and
//! passed by reference to everything that needs it.

use std::path::PathBuf;

use crate::error::{AgentError, Result};

/// Environment variable holding the S3 endpoint URL
pub const ENV_ENDPOINT: &str = "AWS_S3_ENDPOINT";
/// Environment variable holding the bucket name
pub const ENV_BUCKET: &str = "S3_BUCKET";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const ENV_PROFILE: &str = "AWS_PROFILE";
pub const ENV_PATH_STYLE: &str = "S3_USEPATHSTYLE";
pub const ENV_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

/// Default multipart part size (5 MiB)
pub const DEFAULT_PART_SIZE: usize = 5 * 1024 * 1024;

/// Region used for signing when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Main configuration for the transfer agent
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// S3 endpoint URL (required)
    pub endpoint: Option<String>,

    /// Bucket holding the LFS objects, keyed by oid (required)
    pub bucket: Option<String>,

    pub region: Option<String>,

    /// Use `<endpoint>/<bucket>/<key>` instead of `<bucket>.<host>/<key>`
    pub use_path_style: bool,

    // -------------------------------------------------------------------------
    // Credentials
    // -------------------------------------------------------------------------
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,

    /// Named profile from the shared credentials file; wins over static keys
    pub profile: Option<String>,

    /// Shared credentials file; `~/.aws/credentials` when unset
    pub credentials_file: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Transfer Configuration
    // -------------------------------------------------------------------------
    /// Root of the local object cache
    /// Internal structure:
    ///   {lfs_root}/
    ///     └── ab/cd/abcdef0123...
    pub lfs_root: PathBuf,

    /// Size of each ranged GET / multipart part (in bytes)
    pub part_size: usize,

    /// Number of parts fetched in parallel during a download
    pub download_concurrency: usize,

    /// Number of parts sent in parallel during an upload
    pub upload_concurrency: usize,

    /// Send an error-bearing `complete` when a transfer fails
    pub report_transfer_errors: bool,
}

/// Storage values that must be present to talk to the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub use_path_style: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: None,
            region: None,
            use_path_style: false,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            profile: None,
            credentials_file: None,
            lfs_root: PathBuf::from(".git/lfs/objects"),
            part_size: DEFAULT_PART_SIZE,
            download_concurrency: 1,
            upload_concurrency: 5,
            report_transfer_errors: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolve configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset. A path-style flag that fails to
    /// parse falls back to `false`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        Self {
            endpoint: get(ENV_ENDPOINT),
            bucket: get(ENV_BUCKET),
            region: get(ENV_REGION),
            use_path_style: get(ENV_PATH_STYLE)
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            access_key_id: get(ENV_ACCESS_KEY_ID),
            secret_access_key: get(ENV_SECRET_ACCESS_KEY),
            session_token: get(ENV_SESSION_TOKEN),
            profile: get(ENV_PROFILE),
            credentials_file: get(ENV_CREDENTIALS_FILE).map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Check that every required value is present (endpoint first, then bucket)
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [(ENV_ENDPOINT, &self.endpoint), (ENV_BUCKET, &self.bucket)] {
            if value.is_none() {
                return Err(AgentError::Config(format!(
                    "environment variable {} not defined",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Resolve the values needed to reach the bucket
    pub fn storage_settings(&self) -> Result<StorageSettings> {
        self.validate()?;
        let (Some(endpoint), Some(bucket)) = (&self.endpoint, &self.bucket) else {
            return Err(AgentError::Config("storage settings incomplete".to_string()));
        };

        Ok(StorageSettings {
            endpoint: endpoint.clone(),
            bucket: bucket.clone(),
            region: self
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            use_path_style: self.use_path_style,
        })
    }
}

/// Accepts `1`, `t`, `true` in the usual casings; anything else is false
fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an already resolved config (e.g. from the environment)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.bucket = Some(bucket.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    pub fn use_path_style(mut self, enabled: bool) -> Self {
        self.config.use_path_style = enabled;
        self
    }

    /// Set static credentials
    pub fn credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.config.access_key_id = Some(access_key_id.into());
        self.config.secret_access_key = Some(secret_access_key.into());
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config.profile = Some(profile.into());
        self
    }

    pub fn credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.credentials_file = Some(path.into());
        self
    }

    /// Set the root of the local object cache
    pub fn lfs_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.lfs_root = path.into();
        self
    }

    /// Set the part size (in bytes, clamped to at least 1)
    pub fn part_size(mut self, size: usize) -> Self {
        self.config.part_size = size.max(1);
        self
    }

    pub fn download_concurrency(mut self, workers: usize) -> Self {
        self.config.download_concurrency = workers.max(1);
        self
    }

    pub fn upload_concurrency(mut self, workers: usize) -> Self {
        self.config.upload_concurrency = workers.max(1);
        self
    }

    /// Choose whether failed transfers are reported to the peer
    pub fn report_transfer_errors(mut self, enabled: bool) -> Self {
        self.config.report_transfer_errors = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

//! Credential resolution
//!
//! A named profile wins over static keys. Profiles are read from the shared
//! credentials file (`AWS_SHARED_CREDENTIALS_FILE`, else
//! `~/.aws/credentials`). With neither, requests go out unsigned.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{AgentError, Result};

/// Access keys used for signing
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

/// Resolve the credentials to sign with, if any
pub fn resolve(config: &Config) -> Result<Option<Credentials>> {
    if let Some(profile) = &config.profile {
        let path = match &config.credentials_file {
            Some(path) => path.clone(),
            None => default_credentials_file()?,
        };
        return load_profile(&path, profile).map(Some);
    }

    match (&config.access_key_id, &config.secret_access_key) {
        (Some(key), Some(secret)) => {
            let mut credentials = Credentials::new(key, secret);
            credentials.session_token = config.session_token.clone();
            Ok(Some(credentials))
        }
        _ => Ok(None),
    }
}

fn default_credentials_file() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".aws").join("credentials"))
        .ok_or_else(|| AgentError::Config("cannot locate home directory".to_string()))
}

/// Load one profile from a credentials file
pub fn load_profile(path: &Path, profile: &str) -> Result<Credentials> {
    let contents = fs::read_to_string(path).map_err(|e| {
        AgentError::Config(format!(
            "cannot read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_profile(&contents, profile).ok_or_else(|| {
        AgentError::Config(format!(
            "profile {} not found or incomplete in {}",
            profile,
            path.display()
        ))
    })
}

/// Parse the INI-style credentials format and pick out `profile`
///
/// ```text
/// [default]
/// aws_access_key_id = AKIA...
/// aws_secret_access_key = ...
/// aws_session_token = ...     ; optional
/// ```
pub fn parse_profile(contents: &str, profile: &str) -> Option<Credentials> {
    let mut in_section = false;
    let mut key_id = None;
    let mut secret = None;
    let mut token = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim();
            in_section = name == profile || name.strip_prefix("profile ") == Some(profile);
            continue;
        }

        if !in_section {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().to_string();
            match key.trim() {
                "aws_access_key_id" => key_id = Some(value),
                "aws_secret_access_key" => secret = Some(value),
                "aws_session_token" => token = Some(value),
                _ => {}
            }
        }
    }

    Some(Credentials {
        access_key_id: key_id?,
        secret_access_key: secret?,
        session_token: token,
    })
}

//! Tests for configuration resolution

use std::collections::HashMap;
use std::path::PathBuf;

use lfs_s3::config::{Config, DEFAULT_PART_SIZE, DEFAULT_REGION};
use lfs_s3::AgentError;

// =============================================================================
// Helper Functions
// =============================================================================

fn from_vars(vars: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|name| map.get(name).cloned())
}

// =============================================================================
// Environment Resolution Tests
// =============================================================================

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.lfs_root, PathBuf::from(".git/lfs/objects"));
    assert_eq!(config.part_size, DEFAULT_PART_SIZE);
    assert_eq!(config.part_size, 5 * 1024 * 1024);
    assert_eq!(config.download_concurrency, 1);
    assert!(config.report_transfer_errors);
    assert!(!config.use_path_style);
}

#[test]
fn test_from_lookup_reads_all_values() {
    let config = from_vars(&[
        ("AWS_S3_ENDPOINT", "https://s3.example.com"),
        ("S3_BUCKET", "lfs"),
        ("AWS_REGION", "eu-west-1"),
        ("AWS_ACCESS_KEY_ID", "AKID"),
        ("AWS_SECRET_ACCESS_KEY", "SECRET"),
        ("AWS_SESSION_TOKEN", "TOKEN"),
        ("AWS_PROFILE", "work"),
        ("S3_USEPATHSTYLE", "true"),
        ("AWS_SHARED_CREDENTIALS_FILE", "/tmp/creds"),
    ]);

    assert_eq!(config.endpoint.as_deref(), Some("https://s3.example.com"));
    assert_eq!(config.bucket.as_deref(), Some("lfs"));
    assert_eq!(config.region.as_deref(), Some("eu-west-1"));
    assert_eq!(config.access_key_id.as_deref(), Some("AKID"));
    assert_eq!(config.secret_access_key.as_deref(), Some("SECRET"));
    assert_eq!(config.session_token.as_deref(), Some("TOKEN"));
    assert_eq!(config.profile.as_deref(), Some("work"));
    assert_eq!(config.credentials_file, Some(PathBuf::from("/tmp/creds")));
    assert!(config.use_path_style);
}

#[test]
fn test_empty_values_are_unset() {
    let config = from_vars(&[("AWS_S3_ENDPOINT", ""), ("S3_BUCKET", "lfs")]);
    assert!(config.endpoint.is_none());
    assert!(config.validate().is_err());
}

#[test]
fn test_path_style_parse_failure_is_false() {
    assert!(!from_vars(&[("S3_USEPATHSTYLE", "yes please")]).use_path_style);
    assert!(!from_vars(&[("S3_USEPATHSTYLE", "false")]).use_path_style);
    assert!(from_vars(&[("S3_USEPATHSTYLE", "1")]).use_path_style);
    assert!(from_vars(&[("S3_USEPATHSTYLE", "T")]).use_path_style);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validate_reports_endpoint_first() {
    let err = from_vars(&[]).validate().unwrap_err();
    match err {
        AgentError::Config(message) => {
            assert_eq!(message, "environment variable AWS_S3_ENDPOINT not defined")
        }
        other => panic!("Expected config error, got {:?}", other),
    }
}

#[test]
fn test_validate_reports_missing_bucket() {
    let err = from_vars(&[("AWS_S3_ENDPOINT", "http://localhost:9000")])
        .validate()
        .unwrap_err();
    assert!(err.to_string().contains("S3_BUCKET"));
    assert_eq!(err.code(), 1);
}

#[test]
fn test_storage_settings_defaults_region() {
    let config = Config::builder()
        .endpoint("http://localhost:9000")
        .bucket("lfs")
        .use_path_style(true)
        .build();
    let settings = config.storage_settings().unwrap();

    assert_eq!(settings.endpoint, "http://localhost:9000");
    assert_eq!(settings.bucket, "lfs");
    assert_eq!(settings.region, DEFAULT_REGION);
    assert!(settings.use_path_style);
}

// =============================================================================
// Builder Tests
// =============================================================================

#[test]
fn test_builder_clamps_sizes() {
    let config = Config::builder()
        .part_size(0)
        .download_concurrency(0)
        .upload_concurrency(0)
        .build();
    assert_eq!(config.part_size, 1);
    assert_eq!(config.download_concurrency, 1);
    assert_eq!(config.upload_concurrency, 1);
}

#[test]
fn test_builder_overrides_environment() {
    let base = from_vars(&[("AWS_S3_ENDPOINT", "http://a"), ("S3_BUCKET", "b")]);
    let config = lfs_s3::config::ConfigBuilder::from_config(base)
        .lfs_root("/data/lfs")
        .report_transfer_errors(false)
        .build();

    assert_eq!(config.endpoint.as_deref(), Some("http://a"));
    assert_eq!(config.lfs_root, PathBuf::from("/data/lfs"));
    assert!(!config.report_transfer_errors);
}

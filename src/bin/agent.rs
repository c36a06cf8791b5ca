//! lfs-s3 Agent Binary
//!
//! Started by `git lfs` as a custom transfer agent. Speaks the protocol on
//! stdin/stdout; diagnostics go to stderr.

use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use lfs_s3::config::ConfigBuilder;
use lfs_s3::storage::S3Connector;
use lfs_s3::{Agent, Config, ServeOutcome};
use tracing_subscriber::{fmt, EnvFilter};

/// lfs-s3 custom transfer agent
#[derive(Parser, Debug)]
#[command(name = "lfs-s3")]
#[command(about = "Git LFS custom transfer agent for S3-compatible storage")]
#[command(version)]
struct Args {
    /// Local LFS object directory
    #[arg(long, default_value = ".git/lfs/objects")]
    lfs_dir: PathBuf,

    /// Part size in MiB for ranged downloads and multipart uploads (S3 minimum is 5)
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(5..=5120))]
    part_size_mb: u64,

    /// Parts fetched in parallel per download
    #[arg(long, default_value = "1")]
    download_concurrency: usize,

    /// Parts sent in parallel per upload
    #[arg(long, default_value = "5")]
    upload_concurrency: usize,

    /// Do not send an error-bearing `complete` when a transfer fails
    #[arg(long)]
    silent_errors: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    // stdout belongs to the protocol; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    tracing::debug!("lfs-s3 v{}", lfs_s3::VERSION);

    let config = ConfigBuilder::from_config(Config::from_env())
        .lfs_root(&args.lfs_dir)
        .part_size((args.part_size_mb as usize).saturating_mul(1024 * 1024))
        .download_concurrency(args.download_concurrency)
        .upload_concurrency(args.upload_concurrency)
        .report_transfer_errors(!args.silent_errors)
        .build();

    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());

    let mut agent = Agent::new(config, S3Connector);
    match agent.serve(stdin, stdout) {
        Ok(ServeOutcome::Terminated) | Ok(ServeOutcome::InputClosed) => {}
        Ok(ServeOutcome::InitFailed) => std::process::exit(1),
        Err(e) => {
            tracing::error!("Agent stopped: {}", e);
            std::process::exit(1);
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use crate::ConfigError;

/// Upper bound on concurrent crawl sessions. Each session drives its own
/// browser, so this is kept deliberately small.
pub const MAX_WORKERS: usize = 3;

/// Where partial artifacts and master snapshots live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// Plain files under `output_dir`.
    Local,
    /// Objects in an S3 bucket under `prefix`. Credentials come from the
    /// standard `AWS_*` environment variables.
    S3 {
        bucket: String,
        prefix: String,
        region: Option<String>,
        endpoint: Option<String>,
    },
}

#[derive(Clone)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub targets_path: PathBuf,
    pub log_level: String,
    /// Chrome/Chromium binary; `None` lets the launcher search the usual
    /// install locations.
    pub chrome_path: Option<PathBuf>,
    /// Pass `--no-sandbox`; needed when running as root in a container.
    pub chrome_no_sandbox: bool,
    pub headless: bool,
    pub workers: usize,
    /// Records per mid-session checkpoint flush. `0` means flush only at
    /// session end.
    pub checkpoint_size: usize,
    pub review_limit: usize,
    pub wait_timeout_ms: u64,
    pub short_wait_ms: u64,
    pub poll_interval_ms: u64,
    pub settle_ms: u64,
    pub request_timeout_secs: u64,
    pub session_retries: u32,
    pub session_backoff_base_secs: u64,
    pub master_prefix: String,
    pub storage: StorageMode,
}

impl AppConfig {
    #[must_use]
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    #[must_use]
    pub fn short_wait(&self) -> Duration {
        Duration::from_millis(self.short_wait_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Apply a command-line worker count under the same bounds as
    /// `PLACECRAWL_WORKERS`. A single worker turns mid-session flushing off.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `workers` is outside
    /// `1..=MAX_WORKERS`.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, ConfigError> {
        if !(1..=MAX_WORKERS).contains(&workers) {
            return Err(ConfigError::Validation(format!(
                "workers must be between 1 and {MAX_WORKERS}, got {workers}"
            )));
        }
        self.workers = workers;
        if workers == 1 {
            self.checkpoint_size = 0;
        }
        Ok(self)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // A custom S3 endpoint may embed credentials (user:pass@host).
        let storage = match &self.storage {
            StorageMode::S3 {
                bucket,
                prefix,
                region,
                endpoint: Some(endpoint),
            } if endpoint.contains('@') => format!(
                "S3 {{ bucket: {bucket:?}, prefix: {prefix:?}, region: {region:?}, \
                 endpoint: [redacted] }}"
            ),
            other => format!("{other:?}"),
        };
        f.debug_struct("AppConfig")
            .field("output_dir", &self.output_dir)
            .field("targets_path", &self.targets_path)
            .field("log_level", &self.log_level)
            .field("chrome_path", &self.chrome_path)
            .field("chrome_no_sandbox", &self.chrome_no_sandbox)
            .field("headless", &self.headless)
            .field("workers", &self.workers)
            .field("checkpoint_size", &self.checkpoint_size)
            .field("review_limit", &self.review_limit)
            .field("wait_timeout_ms", &self.wait_timeout_ms)
            .field("short_wait_ms", &self.short_wait_ms)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("settle_ms", &self.settle_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("session_retries", &self.session_retries)
            .field("session_backoff_base_secs", &self.session_backoff_base_secs)
            .field("master_prefix", &self.master_prefix)
            .field("storage", &format_args!("{storage}"))
            .finish()
    }
}

use std::path::PathBuf;

use crate::app_config::{AppConfig, StorageMode, MAX_WORKERS};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if any value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if any value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build configuration from an arbitrary env-var lookup so tests can feed a
/// plain `HashMap` instead of mutating the process environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let output_dir = PathBuf::from(or_default("PLACECRAWL_OUTPUT_DIR", "./results"));
    let targets_path = PathBuf::from(or_default(
        "PLACECRAWL_TARGETS_PATH",
        "./config/targets.yaml",
    ));
    let log_level = or_default("PLACECRAWL_LOG_LEVEL", "info");
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let chrome_path = optional("PLACECRAWL_CHROME_PATH").map(PathBuf::from);

    let chrome_no_sandbox = parse_bool(&or_default("PLACECRAWL_CHROME_NO_SANDBOX", "false"))
        .ok_or_else(|| {
            invalid(
                "PLACECRAWL_CHROME_NO_SANDBOX",
                "expected true/false/1/0".to_string(),
            )
        })?;
    let headless = parse_bool(&or_default("PLACECRAWL_HEADLESS", "true"))
        .ok_or_else(|| invalid("PLACECRAWL_HEADLESS", "expected true/false/1/0".to_string()))?;

    let workers = parse_usize("PLACECRAWL_WORKERS", "3")?;
    if !(1..=MAX_WORKERS).contains(&workers) {
        return Err(invalid(
            "PLACECRAWL_WORKERS",
            format!("must be between 1 and {MAX_WORKERS}, got {workers}"),
        ));
    }

    // A single session has nobody to race with, so mid-run flushing only adds I/O.
    let checkpoint_size = parse_usize("PLACECRAWL_CHECKPOINT_SIZE", "100")?;
    let checkpoint_size = if workers == 1 { 0 } else { checkpoint_size };

    let review_limit = parse_usize("PLACECRAWL_REVIEW_LIMIT", "5")?;
    let wait_timeout_ms = parse_u64("PLACECRAWL_WAIT_TIMEOUT_MS", "10000")?;
    let short_wait_ms = parse_u64("PLACECRAWL_SHORT_WAIT_MS", "2000")?;
    let poll_interval_ms = parse_u64("PLACECRAWL_POLL_INTERVAL_MS", "500")?;
    let settle_ms = parse_u64("PLACECRAWL_SETTLE_MS", "2000")?;
    let request_timeout_secs = parse_u64("PLACECRAWL_REQUEST_TIMEOUT_SECS", "30")?;
    let session_retries = parse_u32("PLACECRAWL_SESSION_RETRIES", "2")?;
    let session_backoff_base_secs = parse_u64("PLACECRAWL_SESSION_BACKOFF_BASE_SECS", "2")?;

    let master_prefix = or_default("PLACECRAWL_MASTER_PREFIX", "master");
    if master_prefix.is_empty() || master_prefix.contains(['/', '\\']) {
        return Err(invalid(
            "PLACECRAWL_MASTER_PREFIX",
            "must be a non-empty file name prefix".to_string(),
        ));
    }

    let storage = match or_default("PLACECRAWL_STORAGE_MODE", "local")
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "local" => StorageMode::Local,
        "s3" => StorageMode::S3 {
            bucket: optional("PLACECRAWL_S3_BUCKET").ok_or_else(|| {
                invalid(
                    "PLACECRAWL_S3_BUCKET",
                    "required when PLACECRAWL_STORAGE_MODE=s3".to_string(),
                )
            })?,
            prefix: optional("PLACECRAWL_S3_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_default(),
            region: optional("PLACECRAWL_S3_REGION"),
            endpoint: optional("PLACECRAWL_S3_ENDPOINT"),
        },
        other => {
            return Err(invalid(
                "PLACECRAWL_STORAGE_MODE",
                format!("expected local or s3, got {other:?}"),
            ))
        }
    };

    Ok(AppConfig {
        output_dir,
        targets_path,
        log_level,
        chrome_path,
        chrome_no_sandbox,
        headless,
        workers,
        checkpoint_size,
        review_limit,
        wait_timeout_ms,
        short_wait_ms,
        poll_interval_ms,
        settle_ms,
        request_timeout_secs,
        session_retries,
        session_backoff_base_secs,
        master_prefix,
        storage,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

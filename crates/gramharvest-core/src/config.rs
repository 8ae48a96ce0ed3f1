use std::path::PathBuf;

use crate::app_config::{DownloadFailurePolicy, HarvestConfig};
use crate::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://www.instagram.com";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load harvest configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_config() -> Result<HarvestConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_config_from_env()
}

/// Load harvest configuration from environment variables already in the process.
///
/// Unlike [`load_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_config_from_env() -> Result<HarvestConfig, ConfigError> {
    build_config(|key| std::env::var(key))
}

/// Build configuration using the provided env-var lookup function, so tests
/// can drive it from a plain `HashMap`.
fn build_config<F>(lookup: F) -> Result<HarvestConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional_path = |var: &str| -> Option<PathBuf> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let output_dir = PathBuf::from(or_default("GRAMHARVEST_OUTPUT_DIR", "./output"));
    let log_level = or_default("GRAMHARVEST_LOG_LEVEL", "info");
    let log_file = optional_path("GRAMHARVEST_LOG_FILE");
    let base_url = or_default("GRAMHARVEST_BASE_URL", DEFAULT_BASE_URL);
    let request_timeout_secs = parse_u64("GRAMHARVEST_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("GRAMHARVEST_USER_AGENT", DEFAULT_USER_AGENT);

    let page_size = parse_u32("GRAMHARVEST_PAGE_SIZE", "50")?;
    if page_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "GRAMHARVEST_PAGE_SIZE".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let inter_request_delay_ms = parse_u64("GRAMHARVEST_INTER_REQUEST_DELAY_MS", "0")?;
    let session_file = optional_path("GRAMHARVEST_SESSION_FILE");

    let download_failure_policy = or_default("GRAMHARVEST_DOWNLOAD_FAILURE_POLICY", "skip-item")
        .parse::<DownloadFailurePolicy>()
        .map_err(|reason| ConfigError::InvalidEnvVar {
            var: "GRAMHARVEST_DOWNLOAD_FAILURE_POLICY".to_string(),
            reason,
        })?;

    Ok(HarvestConfig {
        output_dir,
        log_level,
        log_file,
        base_url,
        request_timeout_secs,
        user_agent,
        page_size,
        inter_request_delay_ms,
        session_file,
        download_failure_policy,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::collections::HashMap;
use std::env::VarError;
use std::path::Path;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_config_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.output_dir, Path::new("./output"));
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.log_file.is_none());
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(cfg.page_size, 50);
    assert_eq!(cfg.inter_request_delay_ms, 0);
    assert!(cfg.session_file.is_none());
    assert_eq!(cfg.download_failure_policy, DownloadFailurePolicy::SkipItem);
}

#[test]
fn build_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("GRAMHARVEST_OUTPUT_DIR", "/tmp/harvest");
    map.insert("GRAMHARVEST_LOG_FILE", "harvest.log");
    map.insert("GRAMHARVEST_PAGE_SIZE", "12");
    map.insert("GRAMHARVEST_INTER_REQUEST_DELAY_MS", "500");
    map.insert("GRAMHARVEST_SESSION_FILE", "session.json");
    map.insert("GRAMHARVEST_DOWNLOAD_FAILURE_POLICY", "keep-record");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.output_dir, Path::new("/tmp/harvest"));
    assert_eq!(cfg.log_file.as_deref(), Some(Path::new("harvest.log")));
    assert_eq!(cfg.page_size, 12);
    assert_eq!(cfg.inter_request_delay_ms, 500);
    assert_eq!(cfg.session_file.as_deref(), Some(Path::new("session.json")));
    assert_eq!(
        cfg.download_failure_policy,
        DownloadFailurePolicy::KeepRecord
    );
}

#[test]
fn blank_session_file_is_treated_as_unset() {
    let mut map = HashMap::new();
    map.insert("GRAMHARVEST_SESSION_FILE", "  ");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.session_file.is_none());
}

#[test]
fn invalid_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("GRAMHARVEST_REQUEST_TIMEOUT_SECS", "not-a-number");
    let result = build_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GRAMHARVEST_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(GRAMHARVEST_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn zero_page_size_is_rejected() {
    let mut map = HashMap::new();
    map.insert("GRAMHARVEST_PAGE_SIZE", "0");
    let result = build_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GRAMHARVEST_PAGE_SIZE"),
        "expected InvalidEnvVar(GRAMHARVEST_PAGE_SIZE), got: {result:?}"
    );
}

#[test]
fn unknown_download_policy_is_rejected() {
    let mut map = HashMap::new();
    map.insert("GRAMHARVEST_DOWNLOAD_FAILURE_POLICY", "retry");
    let result = build_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, ref reason }) if var == "GRAMHARVEST_DOWNLOAD_FAILURE_POLICY" && reason.contains("retry")),
        "expected InvalidEnvVar(GRAMHARVEST_DOWNLOAD_FAILURE_POLICY), got: {result:?}"
    );
}

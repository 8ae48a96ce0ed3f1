use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What to do with an item whose media download failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadFailurePolicy {
    /// Drop the whole item: no post record, no comments.
    #[default]
    SkipItem,
    /// Log the failure and extract the record anyway.
    KeepRecord,
}

impl fmt::Display for DownloadFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadFailurePolicy::SkipItem => write!(f, "skip-item"),
            DownloadFailurePolicy::KeepRecord => write!(f, "keep-record"),
        }
    }
}

impl FromStr for DownloadFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip-item" => Ok(DownloadFailurePolicy::SkipItem),
            "keep-record" => Ok(DownloadFailurePolicy::KeepRecord),
            other => Err(format!(
                "unknown policy \"{other}\" (expected skip-item or keep-record)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub output_dir: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub page_size: u32,
    pub inter_request_delay_ms: u64,
    pub session_file: Option<PathBuf>,
    pub download_failure_policy: DownloadFailurePolicy,
}

//! Domain types shared across the gramharvest crates: what to harvest
//! ([`TargetDescriptor`]), how much of it ([`WindowSpec`]), what comes out
//! ([`PostRecord`], [`CommentRecord`], [`NormalizedPost`]) and the
//! environment-driven [`HarvestConfig`].

use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod records;
pub mod target;
pub mod window;

pub use app_config::{DownloadFailurePolicy, HarvestConfig};
pub use config::{load_config, load_config_from_env};
pub use records::{
    normalized_columns, CommentRecord, FieldValue, Location, NormalizedPost, PostField,
    PostRecord, Scalar, COMMENT_COLUMNS, LOCATION_COLUMNS, TIMESTAMP_FORMAT,
};
pub use target::{parse_queries, TargetDescriptor, TargetKind};
pub use window::{parse_day, WindowSpec};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown target kind \"{0}\"")]
    UnknownTargetKind(String),

    #[error("no query given for target kind {0}")]
    EmptyQuery(TargetKind),

    #[error("invalid date \"{input}\": expected YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("empty date window: since {since} is not before until {until}")]
    EmptyWindow { since: String, until: String },
}

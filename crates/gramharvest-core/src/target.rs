use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::CoreError;

/// The kind of logical entity a harvest reads from.
///
/// Public profiles, hashtags and single posts are readable anonymously;
/// every other kind needs an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    PublicProfile,
    Hashtag,
    SinglePost,
    PrivateProfile,
    Location,
    Story,
    Feed,
    Saved,
}

impl TargetKind {
    pub const ALL: [TargetKind; 8] = [
        TargetKind::PublicProfile,
        TargetKind::Hashtag,
        TargetKind::SinglePost,
        TargetKind::PrivateProfile,
        TargetKind::Location,
        TargetKind::Story,
        TargetKind::Feed,
        TargetKind::Saved,
    ];

    #[must_use]
    pub fn requires_login(self) -> bool {
        !matches!(
            self,
            TargetKind::PublicProfile | TargetKind::Hashtag | TargetKind::SinglePost
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::PublicProfile => "public-profile",
            TargetKind::Hashtag => "hashtag",
            TargetKind::SinglePost => "single-post",
            TargetKind::PrivateProfile => "private-profile",
            TargetKind::Location => "location",
            TargetKind::Story => "story",
            TargetKind::Feed => "feed",
            TargetKind::Saved => "saved",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = CoreError;

    /// Accepts the canonical dashed names plus the spaced/underscored
    /// spellings (`"public profile"`, `"location id"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '_' { '-' } else { c })
            .collect();
        match key.as_str() {
            "public-profile" | "profile" => Ok(TargetKind::PublicProfile),
            "hashtag" | "tag" => Ok(TargetKind::Hashtag),
            "single-post" | "post" => Ok(TargetKind::SinglePost),
            "private-profile" => Ok(TargetKind::PrivateProfile),
            "location" | "location-id" => Ok(TargetKind::Location),
            "story" | "stories" => Ok(TargetKind::Story),
            "feed" => Ok(TargetKind::Feed),
            "saved" => Ok(TargetKind::Saved),
            _ => Err(CoreError::UnknownTargetKind(s.to_owned())),
        }
    }
}

/// One harvestable target: a kind plus the query string naming it
/// (username, tag, location id or shortcode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub kind: TargetKind,
    pub query: String,
}

impl TargetDescriptor {
    /// Builds a descriptor, trimming the query and dropping the decoration
    /// users tend to paste along with it (`#tag`, `@user`, post URLs).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyQuery`] if nothing is left after trimming.
    pub fn new(kind: TargetKind, query: &str) -> Result<Self, CoreError> {
        let trimmed = query.trim();
        let cleaned = match kind {
            TargetKind::Hashtag => trimmed.trim_start_matches('#'),
            TargetKind::PublicProfile
            | TargetKind::PrivateProfile
            | TargetKind::Story
            | TargetKind::Saved => trimmed.trim_start_matches('@'),
            TargetKind::SinglePost => shortcode_from_url(trimmed),
            TargetKind::Location | TargetKind::Feed => trimmed,
        };
        if cleaned.is_empty() {
            return Err(CoreError::EmptyQuery(kind));
        }
        Ok(Self {
            kind,
            query: cleaned.to_owned(),
        })
    }

    #[must_use]
    pub fn requires_login(&self) -> bool {
        self.kind.requires_login()
    }

    /// A filesystem-safe directory name for this target's output.
    ///
    /// Keeps alphanumerics in any script plus `_`, `.` and `-`, and drops
    /// leading dots. A query that loses characters to this (or all of
    /// them) gets a suffix hashed from the full query, so two queries never
    /// share a directory.
    #[must_use]
    pub fn dir_name(&self) -> String {
        let cleaned: String = self
            .query
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
            .collect();
        let cleaned = cleaned.trim_start_matches('.');
        if !cleaned.is_empty() && cleaned == self.query {
            return cleaned.to_owned();
        }
        let base = if cleaned.is_empty() {
            self.kind.as_str()
        } else {
            cleaned
        };
        format!("{base}-{}", query_digest(&self.query))
    }
}

/// First 8 hex digits of the SHA-256 of `query`.
fn query_digest(query: &str) -> String {
    let mut hex = format!("{:x}", Sha256::digest(query.as_bytes()));
    hex.truncate(8);
    hex
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.query)
    }
}

/// Splits a comma-separated query list into one descriptor per query.
/// Blank entries are skipped.
///
/// # Errors
///
/// Returns [`CoreError::EmptyQuery`] if the input holds no usable query.
pub fn parse_queries(kind: TargetKind, input: &str) -> Result<Vec<TargetDescriptor>, CoreError> {
    let targets: Vec<TargetDescriptor> = input
        .split(',')
        .filter(|q| !q.trim().is_empty())
        .map(|q| TargetDescriptor::new(kind, q))
        .collect::<Result<_, _>>()?;
    if targets.is_empty() {
        return Err(CoreError::EmptyQuery(kind));
    }
    Ok(targets)
}

/// `https://www.instagram.com/p/ABC123/?igsh=x` -> `ABC123`. Plain
/// shortcodes pass through unchanged.
fn shortcode_from_url(query: &str) -> &str {
    for marker in ["/p/", "/reel/", "/tv/"] {
        if let Some(idx) = query.find(marker) {
            let rest = &query[idx + marker.len()..];
            let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
            return &rest[..end];
        }
    }
    query
}

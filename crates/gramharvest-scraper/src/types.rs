//! Response shapes from the content source's web GraphQL and profile
//! endpoints.
//!
//! ## Observed shape
//!
//! ### Envelope
//! Every GraphQL response is `{"data": {...}, "status": "ok"}`. Failures
//! come back as HTTP 200 with `"status": "fail"` and a `"message"`, or
//! with `data` present but the requested entity set to `null` (unknown
//! hashtag, deleted post).
//!
//! ### Connections
//! Media lists, comment lists and answer lists are all the same
//! connection shape:
//! `{"count": 123, "page_info": {"has_next_page": true, "end_cursor": "..."},
//! "edges": [{"node": {...}}]}`. `count` is absent on some feeds.
//!
//! ### Media nodes
//! Kept as raw `serde_json::Value` (see [`crate::item::RawItem`]); the
//! attribute set varies by `__typename` (`GraphImage`, `GraphVideo`,
//! `GraphSidecar`, `GraphStoryImage`, `GraphStoryVideo`) and by which
//! endpoint returned the node.
//!
//! ### Comment nodes
//! `id` and `owner.id` are numeric strings. `created_at` is a unix
//! timestamp. Likes are in `edge_liked_by.count`. Top-level comments embed
//! their first answers in `edge_threaded_comments`, a connection that may
//! report further pages.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct GraphqlEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// A media connection; nodes stay untyped.
#[derive(Debug, Deserialize)]
pub struct MediaConnection {
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<MediaEdge>,
}

#[derive(Debug, Deserialize)]
pub struct MediaEdge {
    pub node: Value,
}

/// `GET /api/v1/users/web_profile_info/?username=...`
#[derive(Debug, Deserialize)]
pub struct ProfileInfoResponse {
    pub data: ProfileInfoData,
}

#[derive(Debug, Deserialize)]
pub struct ProfileInfoData {
    #[serde(default)]
    pub user: Option<ProfileUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub is_private: bool,
    /// Only meaningful with a session; `false` when anonymous.
    #[serde(default)]
    pub followed_by_viewer: bool,
}

#[derive(Debug, Deserialize)]
pub struct CommentConnection {
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<CommentEdge>,
}

#[derive(Debug, Deserialize)]
pub struct CommentEdge {
    pub node: CommentNode,
}

#[derive(Debug, Deserialize)]
pub struct CommentNode {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub owner: Option<CommentOwner>,
    #[serde(default)]
    pub edge_liked_by: Option<CountOnly>,
    #[serde(default)]
    pub edge_threaded_comments: Option<CommentConnection>,
}

#[derive(Debug, Deserialize)]
pub struct CommentOwner {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CountOnly {
    #[serde(default)]
    pub count: i64,
}

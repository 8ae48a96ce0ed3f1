//! Raw source objects: media items and comments as the source returned
//! them, before extraction.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::pagination::next_cursor;
use crate::types::CommentNode;

const SHORTCODE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// One media item. The attribute set is not fixed: which keys exist
/// depends on the item type and the endpoint it came from, so the node is
/// kept as untyped JSON and read field by field.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    node: Value,
}

impl RawItem {
    #[must_use]
    pub fn from_node(node: Value) -> Self {
        Self { node }
    }

    #[must_use]
    pub fn node(&self) -> &Value {
        &self.node
    }

    /// Looks up a JSON pointer (`/owner/username`), treating `null` as absent.
    #[must_use]
    pub fn lookup(&self, pointer: &str) -> Option<&Value> {
        self.node.pointer(pointer).filter(|v| !v.is_null())
    }

    /// First of several alternative pointers that is present.
    #[must_use]
    pub fn lookup_any(&self, pointers: &[&str]) -> Option<&Value> {
        pointers.iter().find_map(|p| self.lookup(p))
    }

    /// The item's shortcode, derived from the media id for nodes that do
    /// not carry one (story items).
    #[must_use]
    pub fn shortcode(&self) -> Option<String> {
        if let Some(code) = self.lookup_any(&["/shortcode", "/code"]).and_then(Value::as_str) {
            return Some(code.to_owned());
        }
        self.media_id()
            .and_then(|id| u64::try_from(id).ok())
            .map(mediaid_to_shortcode)
    }

    #[must_use]
    pub fn media_id(&self) -> Option<i64> {
        self.lookup_any(&["/id", "/pk"]).and_then(json_i64)
    }

    /// Creation time in UTC.
    #[must_use]
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.lookup_any(&["/taken_at_timestamp", "/taken_at", "/date"])
            .and_then(json_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    #[must_use]
    pub fn typename(&self) -> Option<&str> {
        self.lookup("/__typename").and_then(Value::as_str)
    }

    #[must_use]
    pub fn is_video(&self) -> bool {
        self.lookup("/is_video")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn display_url(&self) -> Option<&str> {
        self.lookup_any(&["/display_url", "/display_src"])
            .and_then(Value::as_str)
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.lookup("/video_url").and_then(Value::as_str)
    }

    /// Number of comments the source reports for this item.
    #[must_use]
    pub fn comment_count(&self) -> Option<i64> {
        self.lookup_any(&[
            "/edge_media_to_comment/count",
            "/edge_media_preview_comment/count",
            "/comment_count",
        ])
        .and_then(json_i64)
    }

    /// Child items of a sidecar (carousel) post; empty for everything else.
    #[must_use]
    pub fn sidecar_children(&self) -> Vec<RawItem> {
        self.lookup("/edge_sidecar_to_children/edges")
            .and_then(Value::as_array)
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|edge| edge.get("node"))
                    .map(|node| RawItem::from_node(node.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A comment with the answers the source returned for it so far.
/// `answers_cursor` is set when the source reported more answer pages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawComment {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub text: String,
    pub owner_id: Option<String>,
    pub likes_count: Option<i64>,
    pub answers: Vec<RawComment>,
    pub answers_cursor: Option<String>,
}

impl From<CommentNode> for RawComment {
    fn from(node: CommentNode) -> Self {
        let (answers, answers_cursor) = match node.edge_threaded_comments {
            Some(thread) => (
                thread
                    .edges
                    .into_iter()
                    .map(|edge| RawComment::from(edge.node))
                    .collect(),
                next_cursor(&thread.page_info),
            ),
            None => (Vec::new(), None),
        };
        Self {
            id: node.id,
            created_at: node
                .created_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            text: node.text,
            owner_id: node.owner.and_then(|o| o.id),
            likes_count: node.edge_liked_by.map(|l| l.count),
            answers,
            answers_cursor,
        }
    }
}

/// Encodes a numeric media id in the source's shortcode alphabet
/// (big-endian base 64, no leading zero digits).
#[must_use]
pub fn mediaid_to_shortcode(mut id: u64) -> String {
    let mut digits = Vec::new();
    while id > 0 {
        // id % 64 < 64, so the index is in range and the cast is lossless.
        #[allow(clippy::cast_possible_truncation)]
        digits.push(SHORTCODE_ALPHABET[(id % 64) as usize]);
        id /= 64;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Reads an integer the source may send either as a number or as a
/// numeric string.
pub(crate) fn json_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Reads an identifier the source may send as a string or a number.
pub(crate) fn json_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

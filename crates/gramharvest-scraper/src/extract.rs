//! Attribute extraction: one raw item into one schema-shaped record.
//!
//! Every field is read independently. A field that is absent or has an
//! unexpected shape is logged and left empty; it never costs the item its
//! record.

use std::sync::LazyLock;

use chrono::{DateTime, Local, Utc};
use gramharvest_core::{FieldValue, Location, PostField, PostRecord};
use regex::Regex;
use serde_json::Value;

use crate::error::FieldError;
use crate::item::{json_i64, json_string, RawItem};

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(&?)#(\w+)").expect("valid regex"));
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w])@(\w(?:[\w.]{0,28}\w)?)").expect("valid regex")
});

/// Longest printable caption kept verbatim.
const PCAPTION_MAX: usize = 31;
/// Length printable captions are cut to when longer than [`PCAPTION_MAX`].
const PCAPTION_CUT: usize = 30;

/// Builds the record for `item` over `schema`.
///
/// Total: whatever the item looks like, the record has exactly one value
/// per schema field.
#[must_use]
pub fn extract_post(item: &RawItem, schema: &[PostField]) -> PostRecord {
    let mut record = PostRecord::with_schema(schema);
    for &field in schema {
        match read_field(item, field) {
            Ok(value) => record.set(field, value),
            Err(e) => {
                tracing::warn!(
                    shortcode = item.shortcode().as_deref().unwrap_or("?"),
                    field = %field,
                    error = %e,
                    "could not read field; leaving it empty"
                );
            }
        }
    }
    record
}

/// Reads one field from `item`.
///
/// Optional attributes (caption, view count, location, video URL on a
/// photo) come back as [`FieldValue::Empty`]; list fields come back as an
/// empty list. Attributes every post has are reported as
/// [`FieldError::Missing`] when absent.
///
/// # Errors
///
/// [`FieldError::Missing`] or [`FieldError::Malformed`] as above.
pub fn read_field(item: &RawItem, field: PostField) -> Result<FieldValue, FieldError> {
    match field {
        PostField::Shortcode => item
            .shortcode()
            .map(FieldValue::Text)
            .ok_or(FieldError::Missing(field)),
        PostField::Mediaid => {
            let raw = item
                .lookup_any(&["/id", "/pk"])
                .ok_or(FieldError::Missing(field))?;
            json_i64(raw)
                .map(FieldValue::Integer)
                .ok_or_else(|| malformed(field, "media id is not numeric"))
        }
        PostField::OwnerUsername => required_text(item, field, &["/owner/username", "/user/username"]),
        PostField::OwnerId => {
            let raw = item
                .lookup_any(&["/owner/id", "/user/pk", "/user/id"])
                .ok_or(FieldError::Missing(field))?;
            json_string(raw)
                .map(FieldValue::Text)
                .ok_or_else(|| malformed(field, "owner id is not a string or number"))
        }
        PostField::DateUtc => taken_at(item, field)
            .map(|ts| FieldValue::Timestamp(ts.naive_utc())),
        PostField::DateLocal => taken_at(item, field)
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Local).naive_local())),
        PostField::Url => item
            .display_url()
            .map(|u| FieldValue::Text(u.to_owned()))
            .ok_or(FieldError::Missing(field)),
        PostField::Typename => item
            .typename()
            .map(|t| FieldValue::Text(t.to_owned()))
            .ok_or(FieldError::Missing(field)),
        PostField::Caption => Ok(caption(item).map(str::to_owned).into()),
        PostField::CaptionHashtags => Ok(FieldValue::List(
            caption(item).map(caption_hashtags).unwrap_or_default(),
        )),
        PostField::CaptionMentions => Ok(FieldValue::List(
            caption(item).map(caption_mentions).unwrap_or_default(),
        )),
        PostField::Pcaption => Ok(caption(item).map(printable_caption).into()),
        PostField::TaggedUsers => tagged_users(item).map(FieldValue::List),
        PostField::VideoUrl => {
            if !item.is_video() {
                return Ok(FieldValue::Empty);
            }
            match item.lookup("/video_url") {
                None => Err(FieldError::Missing(field)),
                Some(Value::String(url)) => Ok(FieldValue::Text(url.clone())),
                Some(_) => Err(malformed(field, "video_url is not a string")),
            }
        }
        PostField::VideoViewCount => match item.lookup("/video_view_count") {
            None => Ok(FieldValue::Empty),
            Some(raw) => json_i64(raw)
                .map(FieldValue::Integer)
                .ok_or_else(|| malformed(field, "view count is not numeric")),
        },
        PostField::Likes => required_count(
            item,
            field,
            &[
                "/edge_media_preview_like/count",
                "/edge_liked_by/count",
                "/like_count",
            ],
        ),
        PostField::Comments => item
            .comment_count()
            .map(FieldValue::Integer)
            .ok_or(FieldError::Missing(field)),
        PostField::Location => location(item),
    }
}

fn malformed(field: PostField, reason: &str) -> FieldError {
    FieldError::Malformed {
        field,
        reason: reason.to_owned(),
    }
}

fn required_text(
    item: &RawItem,
    field: PostField,
    pointers: &[&str],
) -> Result<FieldValue, FieldError> {
    let raw = item.lookup_any(pointers).ok_or(FieldError::Missing(field))?;
    raw.as_str()
        .map(|s| FieldValue::Text(s.to_owned()))
        .ok_or_else(|| malformed(field, "expected a string"))
}

fn required_count(
    item: &RawItem,
    field: PostField,
    pointers: &[&str],
) -> Result<FieldValue, FieldError> {
    let raw = item.lookup_any(pointers).ok_or(FieldError::Missing(field))?;
    json_i64(raw)
        .map(FieldValue::Integer)
        .ok_or_else(|| malformed(field, "expected a count"))
}

fn taken_at(item: &RawItem, field: PostField) -> Result<DateTime<Utc>, FieldError> {
    item.taken_at().ok_or(FieldError::Missing(field))
}

/// Caption text. Older nodes carry it directly, newer ones as the first
/// edge of `edge_media_to_caption`.
fn caption(item: &RawItem) -> Option<&str> {
    item.lookup_any(&[
        "/edge_media_to_caption/edges/0/node/text",
        "/caption/text",
        "/caption",
    ])
    .and_then(Value::as_str)
}

fn tagged_users(item: &RawItem) -> Result<Vec<String>, FieldError> {
    let Some(edges) = item.lookup("/edge_media_to_tagged_user/edges") else {
        return Ok(Vec::new());
    };
    let edges = edges
        .as_array()
        .ok_or_else(|| malformed(PostField::TaggedUsers, "tag edges are not a list"))?;
    Ok(edges
        .iter()
        .filter_map(|edge| edge.pointer("/node/user/username"))
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect())
}

fn location(item: &RawItem) -> Result<FieldValue, FieldError> {
    let Some(raw) = item.lookup("/location") else {
        return Ok(FieldValue::Empty);
    };
    let obj = raw
        .as_object()
        .ok_or_else(|| malformed(PostField::Location, "location is not an object"))?;
    let id = obj
        .get("id")
        .and_then(json_string)
        .ok_or(FieldError::Missing(PostField::Location))?;
    Ok(FieldValue::Location(Location {
        id,
        lat: obj.get("lat").and_then(Value::as_f64),
        lng: obj.get("lng").and_then(Value::as_f64),
        name: obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
    }))
}

/// Lowercased hashtags in the order they appear. `&#123;` style entities
/// are not hashtags.
#[must_use]
pub fn caption_hashtags(caption: &str) -> Vec<String> {
    HASHTAG_RE
        .captures_iter(caption)
        .filter(|c| c.get(1).is_none_or(|amp| amp.as_str().is_empty()))
        .filter_map(|c| c.get(2))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Lowercased `@mentions` in the order they appear. E-mail addresses do
/// not count.
#[must_use]
pub fn caption_mentions(caption: &str) -> Vec<String> {
    MENTION_RE
        .captures_iter(caption)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// One-line caption for directory listings and logs: non-empty lines
/// joined by spaces, `/` swapped for a lookalike so it is path-safe, and
/// long captions cut with an ellipsis.
#[must_use]
pub fn printable_caption(caption: &str) -> String {
    let joined = caption
        .lines()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('/', "\u{2215}");
    if joined.chars().count() > PCAPTION_MAX {
        let mut cut: String = joined.chars().take(PCAPTION_CUT).collect();
        cut.push('\u{2026}');
        cut
    } else {
        joined
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;

//! Record types produced by a harvest.
//!
//! A [`PostRecord`] is the raw extraction result: one [`FieldValue`] per
//! schema column, possibly list- or struct-valued. The schema normalizer
//! turns it into a [`NormalizedPost`], a flat row of [`Scalar`] columns
//! ready for a table. Comments are flat from the start ([`CommentRecord`]).

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

/// Format used for every timestamp written to a table.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Columns the nested location field expands into.
pub const LOCATION_COLUMNS: [&str; 4] = ["loc_id", "loc_lat", "loc_lng", "loc_name"];

/// Comment table header, in [`CommentRecord`] field order.
pub const COMMENT_COLUMNS: [&str; 7] = [
    "post_shortcode",
    "answer_to_comment",
    "created_at_utc",
    "id",
    "likes_count",
    "owner",
    "text",
];

/// One column of the post schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostField {
    Shortcode,
    Mediaid,
    OwnerUsername,
    OwnerId,
    DateLocal,
    DateUtc,
    Url,
    Typename,
    Caption,
    CaptionHashtags,
    CaptionMentions,
    Pcaption,
    TaggedUsers,
    VideoUrl,
    VideoViewCount,
    Likes,
    Comments,
    Location,
}

impl PostField {
    /// The full post schema in column order.
    pub const ALL: [PostField; 18] = [
        PostField::Shortcode,
        PostField::Mediaid,
        PostField::OwnerUsername,
        PostField::OwnerId,
        PostField::DateLocal,
        PostField::DateUtc,
        PostField::Url,
        PostField::Typename,
        PostField::Caption,
        PostField::CaptionHashtags,
        PostField::CaptionMentions,
        PostField::Pcaption,
        PostField::TaggedUsers,
        PostField::VideoUrl,
        PostField::VideoViewCount,
        PostField::Likes,
        PostField::Comments,
        PostField::Location,
    ];

    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            PostField::Shortcode => "shortcode",
            PostField::Mediaid => "mediaid",
            PostField::OwnerUsername => "owner_username",
            PostField::OwnerId => "owner_id",
            PostField::DateLocal => "date_local",
            PostField::DateUtc => "date_utc",
            PostField::Url => "url",
            PostField::Typename => "typename",
            PostField::Caption => "caption",
            PostField::CaptionHashtags => "caption_hashtags",
            PostField::CaptionMentions => "caption_mentions",
            PostField::Pcaption => "pcaption",
            PostField::TaggedUsers => "tagged_users",
            PostField::VideoUrl => "video_url",
            PostField::VideoViewCount => "video_view_count",
            PostField::Likes => "likes",
            PostField::Comments => "comments",
            PostField::Location => "location",
        }
    }
}

impl fmt::Display for PostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A tagged place attached to a post.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub name: String,
}

/// The value extracted for one post field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// Absent attribute or a field whose retrieval failed.
    #[default]
    Empty,
    Text(String),
    Integer(i64),
    Timestamp(NaiveDateTime),
    List(Vec<String>),
    Location(Location),
}

impl FieldValue {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FieldValue::Empty, FieldValue::Text)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(FieldValue::Empty, FieldValue::Integer)
    }
}

/// One extracted post: a value for every column of the schema it was
/// built with, in schema order. Columns never go missing; a field that
/// could not be read holds [`FieldValue::Empty`].
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    fields: Vec<(PostField, FieldValue)>,
}

impl PostRecord {
    /// A record with every schema column present and empty.
    #[must_use]
    pub fn with_schema(schema: &[PostField]) -> Self {
        Self {
            fields: schema.iter().map(|&f| (f, FieldValue::Empty)).collect(),
        }
    }

    /// Sets `field` if it belongs to this record's schema. Values for
    /// columns outside the schema are ignored.
    pub fn set(&mut self, field: PostField, value: FieldValue) {
        if let Some(slot) = self.fields.iter_mut().find(|(f, _)| *f == field) {
            slot.1 = value;
        }
    }

    #[must_use]
    pub fn get(&self, field: PostField) -> Option<&FieldValue> {
        self.fields.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    /// Text value of `field`, if it is populated with text.
    #[must_use]
    pub fn text(&self, field: PostField) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &(PostField, FieldValue)> {
        self.fields.iter()
    }

    #[must_use]
    pub fn into_fields(self) -> Vec<(PostField, FieldValue)> {
        self.fields
    }
}

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    #[default]
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Empty => Ok(()),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Integer(n) => write!(f, "{n}"),
            // Debug keeps the fractional part: 10.0 stays "10.0".
            Scalar::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// A post flattened into named scalar columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedPost {
    columns: Vec<(&'static str, Scalar)>,
}

impl NormalizedPost {
    pub fn push(&mut self, name: &'static str, value: Scalar) {
        self.columns.push((name, value));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.columns.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(n, _)| *n)
    }

    /// Cell values rendered for a text table, in column order.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        self.columns.iter().map(|(_, v)| v.to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Table header for posts normalized from `schema`: every scalar column in
/// schema order, with `location` replaced by [`LOCATION_COLUMNS`] at the end.
#[must_use]
pub fn normalized_columns(schema: &[PostField]) -> Vec<&'static str> {
    let mut columns: Vec<&'static str> = schema
        .iter()
        .filter(|f| **f != PostField::Location)
        .map(|f| f.column())
        .collect();
    if schema.contains(&PostField::Location) {
        columns.extend(LOCATION_COLUMNS);
    }
    columns
}

/// One comment or answer. Answers carry the id of the comment they reply
/// to in `answer_to_comment`; top-level comments leave it empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub post_shortcode: String,
    pub answer_to_comment: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at_utc: Option<NaiveDateTime>,
    pub id: String,
    pub likes_count: Option<i64>,
    pub owner: Option<String>,
    pub text: String,
}

impl CommentRecord {
    #[must_use]
    pub fn is_answer(&self) -> bool {
        self.answer_to_comment.is_some()
    }
}

#[allow(clippy::ref_option)] // serde's serialize_with hands us `&Option<T>`
fn serialize_timestamp<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.collect_str(&ts.format(TIMESTAMP_FORMAT)),
        None => serializer.serialize_none(),
    }
}

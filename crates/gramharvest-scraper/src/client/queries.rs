//! GraphQL query identifiers and the per-kind feed queries built from them.

use gramharvest_core::TargetKind;
use serde_json::{json, Map, Value};

use crate::source::FeedQuery;

pub(super) const PROFILE_POSTS: &str = "003056d32c2554def87228bc3fd9668a";
pub(super) const HASHTAG_POSTS: &str = "9b498c08113f1e09617a1703c22b2f32";
pub(super) const LOCATION_POSTS: &str = "1b84447a4d8b6d6d0426fefb34514485";
pub(super) const SINGLE_POST: &str = "2b0673e0dc4580674a88d426fe00ea90";
pub(super) const FEED_POSTS: &str = "d6f4427fbe92d846298cf93df0b937d3";
pub(super) const SAVED_POSTS: &str = "f883d95537fbcd400f466f63d42bd8a1";
pub(super) const STORY_REELS: &str = "303a4ae99711322310f25250d988f3b7";
pub(super) const POST_COMMENTS: &str = "97b41c52301f77ce508f55e66d17620e";
pub(super) const COMMENT_ANSWERS: &str = "51fdd02b67508306ad4484ff574a0b62";

fn vars(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Timeline of a profile, by numeric user id.
pub(super) fn profile_posts(kind: TargetKind, username: &str, user_id: &str) -> FeedQuery {
    FeedQuery {
        kind,
        label: username.to_owned(),
        query_hash: PROFILE_POSTS,
        variables: vars(json!({ "id": user_id })),
        connection_path: &["user", "edge_owner_to_timeline_media"],
        cursor_variable: "after",
        size_variable: Some("first"),
        posts_only: false,
    }
}

pub(super) fn hashtag_posts(tag: &str) -> FeedQuery {
    FeedQuery {
        kind: TargetKind::Hashtag,
        label: tag.to_owned(),
        query_hash: HASHTAG_POSTS,
        variables: vars(json!({ "tag_name": tag })),
        connection_path: &["hashtag", "edge_hashtag_to_media"],
        cursor_variable: "after",
        size_variable: Some("first"),
        posts_only: false,
    }
}

pub(super) fn location_posts(location_id: &str) -> FeedQuery {
    FeedQuery {
        kind: TargetKind::Location,
        label: location_id.to_owned(),
        query_hash: LOCATION_POSTS,
        variables: vars(json!({ "id": location_id })),
        connection_path: &["location", "edge_location_to_media"],
        cursor_variable: "after",
        size_variable: Some("first"),
        posts_only: false,
    }
}

/// The logged-in user's home feed. Suggestions and ads in between posts
/// have no shortcode and are dropped.
pub(super) fn feed_posts() -> FeedQuery {
    FeedQuery {
        kind: TargetKind::Feed,
        label: "feed".to_owned(),
        query_hash: FEED_POSTS,
        variables: vars(json!({
            "fetch_comment_count": 4,
            "fetch_like": 10,
            "has_stories": false,
        })),
        connection_path: &["user", "edge_web_feed_timeline"],
        cursor_variable: "fetch_media_item_cursor",
        size_variable: Some("fetch_media_item_count"),
        posts_only: true,
    }
}

pub(super) fn saved_posts(username: &str, user_id: &str) -> FeedQuery {
    FeedQuery {
        kind: TargetKind::Saved,
        label: username.to_owned(),
        query_hash: SAVED_POSTS,
        variables: vars(json!({ "id": user_id })),
        connection_path: &["user", "edge_saved_media"],
        cursor_variable: "after",
        size_variable: Some("first"),
        posts_only: false,
    }
}

pub(super) fn single_post_variables(shortcode: &str) -> Map<String, Value> {
    vars(json!({ "shortcode": shortcode }))
}

pub(super) fn story_variables(user_id: &str) -> Map<String, Value> {
    vars(json!({ "reel_ids": [user_id], "precomposed_overlay": false }))
}

/// Variables for one page of `feed`.
pub(super) fn page_variables(
    feed: &FeedQuery,
    page_size: u32,
    cursor: Option<&str>,
) -> Map<String, Value> {
    let mut variables = feed.variables.clone();
    if let Some(size) = feed.size_variable {
        variables.insert(size.to_owned(), Value::from(page_size));
    }
    if let Some(cursor) = cursor {
        variables.insert(feed.cursor_variable.to_owned(), Value::from(cursor));
    }
    variables
}

/// Variables for a comment or answer page: `key` names the parent.
pub(super) fn thread_variables(
    key: &str,
    parent: &str,
    page_size: u32,
    cursor: Option<&str>,
) -> Map<String, Value> {
    let mut variables = Map::new();
    variables.insert(key.to_owned(), Value::from(parent));
    variables.insert("first".to_owned(), Value::from(page_size));
    if let Some(cursor) = cursor {
        variables.insert("after".to_owned(), Value::from(cursor));
    }
    variables
}

/// Follows `path` from `data`. `None` when any step is absent or `null`.
pub(super) fn walk<'v>(data: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter()
        .try_fold(data, |value, key| value.get(*key))
        .filter(|v| !v.is_null())
}

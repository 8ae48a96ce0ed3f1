//! The content-source seam: everything the harvest needs from the remote
//! side, behind one trait so the pipeline can run against a fake.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use gramharvest_core::{TargetDescriptor, TargetKind};
use serde_json::{Map, Value};

use crate::error::ScraperError;
use crate::item::{RawComment, RawItem};
use crate::pagination::{paginate, Page};

/// A resolved, paginated item query.
///
/// Built by [`ContentSource::resolve`] once the target exists; each page
/// request re-sends `variables` with the cursor added under
/// `cursor_variable`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub kind: TargetKind,
    /// Human-readable name of what is being read, for logs.
    pub label: String,
    pub query_hash: &'static str,
    pub variables: Map<String, Value>,
    /// Path from `data` to the media connection in the response.
    pub connection_path: &'static [&'static str],
    pub cursor_variable: &'static str,
    /// Variable carrying the page size, if the query takes one.
    pub size_variable: Option<&'static str>,
    /// Drop nodes that are not posts (feed pages interleave suggestions).
    pub posts_only: bool,
}

/// What a resolved target reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemFeed {
    /// A cursor-paginated connection.
    Paged(FeedQuery),
    /// Items the resolution step already returned in full (a single post,
    /// a story reel).
    Fixed(Vec<RawItem>),
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Whether requests carry a logged-in session.
    fn is_authenticated(&self) -> bool;

    /// Checks that `target` exists and is readable, and returns how to read
    /// its items.
    ///
    /// # Errors
    ///
    /// [`ScraperError::TargetUnavailable`] when the target does not exist or
    /// is not visible to this session; transport errors otherwise.
    async fn resolve(&self, target: &TargetDescriptor) -> Result<ItemFeed, ScraperError>;

    /// One page of items, newest first.
    async fn item_page(
        &self,
        feed: &FeedQuery,
        cursor: Option<&str>,
    ) -> Result<Page<RawItem>, ScraperError>;

    /// One page of top-level comments on a post.
    async fn comment_page(
        &self,
        shortcode: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawComment>, ScraperError>;

    /// One page of answers to a comment.
    async fn answer_page(
        &self,
        comment_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawComment>, ScraperError>;
}

/// Opens the lazy, newest-first item stream for `target`.
///
/// Nothing beyond the resolution request is fetched until the stream is
/// polled. A page that fails mid-stream shows up as an `Err` item and ends
/// the stream.
///
/// # Errors
///
/// [`ScraperError::LoginRequired`] for a login-only kind on an anonymous
/// source, without contacting the source. Resolution failures from
/// [`ContentSource::resolve`] are passed through.
pub async fn open_items<'a, S>(
    source: &'a Arc<S>,
    target: &TargetDescriptor,
) -> Result<BoxStream<'a, Result<RawItem, ScraperError>>, ScraperError>
where
    S: ContentSource + ?Sized + 'a,
{
    if target.requires_login() && !source.is_authenticated() {
        return Err(ScraperError::LoginRequired(target.kind));
    }
    match source.resolve(target).await? {
        ItemFeed::Fixed(items) => Ok(stream::iter(items.into_iter().map(Ok)).boxed()),
        ItemFeed::Paged(feed) => {
            tracing::debug!(kind = %feed.kind, label = %feed.label, "opening item stream");
            let feed = Arc::new(feed);
            let items = paginate(None, move |cursor| {
                let source = Arc::clone(source);
                let feed = Arc::clone(&feed);
                async move { source.item_page(&feed, cursor.as_deref()).await }
            });
            Ok(items.boxed())
        }
    }
}

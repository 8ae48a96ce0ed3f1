//! The per-query harvest: source, window, per-item extraction and comment
//! flattening, then normalization.
//!
//! Items are processed one at a time in source order. An item either
//! lands completely (its post record and all its comment rows) or not at
//! all; a failing item is logged and skipped. A page that fails after the
//! target resolved ends the query early with what was collected so far.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use gramharvest_core::{
    normalized_columns, CommentRecord, DownloadFailurePolicy, NormalizedPost, PostField,
    PostRecord, TargetDescriptor, WindowSpec,
};

use crate::error::ScraperError;
use crate::extract::extract_post;
use crate::item::RawItem;
use crate::media::MediaDownloader;
use crate::normalize::normalize_posts;
use crate::source::{open_items, ContentSource};
use crate::thread::comment_records;
use crate::window::apply_window;

/// Per-run harvest settings, shared by every query of the run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub schema: Vec<PostField>,
    pub window: WindowSpec,
    pub comments: bool,
    pub download_failure_policy: DownloadFailurePolicy,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            schema: PostField::ALL.to_vec(),
            window: WindowSpec::default(),
            comments: true,
            download_failure_policy: DownloadFailurePolicy::default(),
        }
    }
}

/// Cooperative stop signal, checked before each item is pulled.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a previous cancellation so the next query can run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Why a query's item loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The windowed stream ran out.
    Exhausted,
    /// Stopped by the user; results are partial.
    Cancelled,
    /// A page fetch failed after the target resolved; results are partial.
    SourceFailed(String),
}

impl QueryOutcome {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !matches!(self, QueryOutcome::Exhausted)
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Exhausted => f.write_str("complete"),
            QueryOutcome::Cancelled => f.write_str("cancelled"),
            QueryOutcome::SourceFailed(reason) => write!(f, "source failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestPhase {
    Idle,
    Fetching,
    Windowing,
    Extracting,
    Flattening,
    Normalizing,
    Done,
}

/// Everything one query produced, ready for persistence.
#[derive(Debug)]
pub struct HarvestResult {
    pub target: TargetDescriptor,
    /// Post table header; every row in `posts` has exactly these columns.
    pub columns: Vec<&'static str>,
    pub posts: Vec<NormalizedPost>,
    pub comments: Vec<CommentRecord>,
    pub outcome: QueryOutcome,
    pub skipped_items: usize,
}

/// Buffers owned by the query in flight. Dropped when the query ends.
struct QueryContext<'t> {
    target: &'t TargetDescriptor,
    phase: HarvestPhase,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    skipped_items: usize,
}

impl<'t> QueryContext<'t> {
    fn new(target: &'t TargetDescriptor) -> Self {
        Self {
            target,
            phase: HarvestPhase::Idle,
            posts: Vec::new(),
            comments: Vec::new(),
            skipped_items: 0,
        }
    }

    fn enter(&mut self, phase: HarvestPhase) {
        if self.phase == phase {
            return;
        }
        tracing::trace!(target_query = %self.target, from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
    }

    fn commit(&mut self, post: PostRecord, comments: Vec<CommentRecord>) {
        self.posts.push(post);
        self.comments.extend(comments);
    }
}

/// Runs harvests against one source and downloader.
pub struct Harvester<S: ?Sized, D: ?Sized> {
    source: Arc<S>,
    downloader: Arc<D>,
    options: HarvestOptions,
    cancel: CancelFlag,
}

impl<S, D> Harvester<S, D>
where
    S: ContentSource + ?Sized,
    D: MediaDownloader + ?Sized,
{
    pub fn new(
        source: Arc<S>,
        downloader: Arc<D>,
        options: HarvestOptions,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            source,
            downloader,
            options,
            cancel,
        }
    }

    #[must_use]
    pub fn options(&self) -> &HarvestOptions {
        &self.options
    }

    /// Harvests one target.
    ///
    /// # Errors
    ///
    /// Returns the resolution error ([`ScraperError::TargetUnavailable`],
    /// [`ScraperError::LoginRequired`], or the transport error from the
    /// resolution request) when the target cannot be opened. Nothing is
    /// produced in that case. Every later failure is folded into the
    /// returned [`HarvestResult`].
    pub async fn harvest(&self, target: &TargetDescriptor) -> Result<HarvestResult, ScraperError> {
        let mut ctx = QueryContext::new(target);

        ctx.enter(HarvestPhase::Fetching);
        let items = open_items(&self.source, target).await?;

        ctx.enter(HarvestPhase::Windowing);
        let mut items = apply_window(items, &self.options.window);

        let dir = target.dir_name();
        let mut pulled_any = false;
        let outcome = loop {
            if self.cancel.is_cancelled() {
                tracing::info!(target_query = %target, "harvest cancelled; keeping partial results");
                break QueryOutcome::Cancelled;
            }
            let item = match items.next().await {
                None => break QueryOutcome::Exhausted,
                Some(Ok(item)) => item,
                Some(Err(e)) if !pulled_any && e.is_resolution_failure() => return Err(e),
                Some(Err(e)) => {
                    tracing::error!(
                        target_query = %target,
                        error = %e,
                        "page fetch failed; stopping this query"
                    );
                    break QueryOutcome::SourceFailed(e.to_string());
                }
            };
            pulled_any = true;

            if let Err(e) = self.process_item(&mut ctx, &item, &dir).await {
                ctx.skipped_items += 1;
                tracing::warn!(
                    target_query = %target,
                    shortcode = item.shortcode().as_deref().unwrap_or("?"),
                    error = %e,
                    "skipping item"
                );
            }
        };

        ctx.enter(HarvestPhase::Normalizing);
        let result = HarvestResult {
            target: target.clone(),
            columns: normalized_columns(&self.options.schema),
            posts: normalize_posts(std::mem::take(&mut ctx.posts)),
            comments: std::mem::take(&mut ctx.comments),
            outcome,
            skipped_items: ctx.skipped_items,
        };
        ctx.enter(HarvestPhase::Done);
        tracing::info!(
            target_query = %target,
            posts = result.posts.len(),
            comments = result.comments.len(),
            skipped = result.skipped_items,
            outcome = %result.outcome,
            "harvest finished"
        );
        Ok(result)
    }

    /// Downloads, extracts and flattens one item, committing to `ctx` only
    /// if every step it needs succeeded.
    async fn process_item(
        &self,
        ctx: &mut QueryContext<'_>,
        item: &RawItem,
        dir: &str,
    ) -> Result<(), ScraperError> {
        ctx.enter(HarvestPhase::Extracting);
        if let Err(e) = self.downloader.download(item, dir).await {
            match self.options.download_failure_policy {
                DownloadFailurePolicy::SkipItem => {
                    return Err(ScraperError::Item {
                        shortcode: item.shortcode().unwrap_or_default(),
                        reason: format!("media download failed: {e}"),
                    });
                }
                DownloadFailurePolicy::KeepRecord => {
                    tracing::warn!(
                        shortcode = item.shortcode().as_deref().unwrap_or("?"),
                        error = %e,
                        "media download failed; keeping the record"
                    );
                }
            }
        }
        let post = extract_post(item, &self.options.schema);

        let mut comments = Vec::new();
        if self.options.comments && item.comment_count().unwrap_or(0) > 0 {
            ctx.enter(HarvestPhase::Flattening);
            let shortcode = item.shortcode().ok_or_else(|| ScraperError::Item {
                shortcode: String::new(),
                reason: "item has comments but no shortcode".to_owned(),
            })?;
            comments = comment_records(&self.source, shortcode.clone())
                .try_collect()
                .await
                .map_err(|e| ScraperError::Item {
                    shortcode,
                    reason: format!("comment thread failed: {e}"),
                })?;
        }

        ctx.commit(post, comments);
        Ok(())
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;

//! Temporal and count windowing over a newest-first item stream.

use futures::future;
use futures::stream::{BoxStream, StreamExt};
use gramharvest_core::WindowSpec;

use crate::error::ScraperError;
use crate::item::RawItem;

/// Restricts `items` to `window`, lazily.
///
/// Items at or after `until` are skipped, taking stops at the first item at
/// or before `since`, and at most `limit` items come through. The source
/// is only polled as far as the window needs: once `since` or `limit` ends
/// the window, no further page is requested.
///
/// Items without a creation time cannot be placed: they are skipped while
/// still looking for the `until` boundary and end the window when `since`
/// is set. Errors pass through untouched so the caller sees them in order.
pub fn apply_window<'a>(
    items: BoxStream<'a, Result<RawItem, ScraperError>>,
    window: &WindowSpec,
) -> BoxStream<'a, Result<RawItem, ScraperError>> {
    let window = *window;
    let limit = window.limit.unwrap_or(usize::MAX);
    items
        .skip_while(move |item| {
            let skip = match item {
                Ok(item) => match item.taken_at() {
                    Some(ts) => window.is_after_until(ts),
                    None => window.until.is_some(),
                },
                Err(_) => false,
            };
            future::ready(skip)
        })
        .take_while(move |item| {
            let keep = match item {
                Ok(item) => match item.taken_at() {
                    Some(ts) => !window.is_at_or_before_since(ts),
                    None => window.since.is_none(),
                },
                Err(_) => true,
            };
            future::ready(keep)
        })
        .take(limit)
        .boxed()
}

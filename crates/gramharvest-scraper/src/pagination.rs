//! Cursor-based pagination over the content source's connections.
//!
//! Every list the source serves (media, comments, answers) is a
//! connection that reports `page_info.has_next_page` and an opaque
//! `end_cursor`. [`paginate`] turns a page-fetching closure into a lazy
//! item stream: a page is requested only once the consumer has drained
//! the previous one, so a consumer that stops early never triggers the
//! next request.

use std::collections::VecDeque;
use std::future::Future;

use futures::stream::{self, Stream};

use crate::error::ScraperError;
use crate::types::PageInfo;

/// One fetched page and the cursor of the page after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }
}

/// Cursor for the next page, or `None` on the last page.
///
/// The source sometimes reports `has_next_page: true` with an empty
/// cursor; that is treated as the end.
#[must_use]
pub fn next_cursor(page_info: &PageInfo) -> Option<String> {
    if !page_info.has_next_page {
        return None;
    }
    page_info
        .end_cursor
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
}

struct Pager<T> {
    buffer: VecDeque<T>,
    /// `Some(c)` while more pages exist; the fetch for `c` has not happened.
    pending: Option<Option<String>>,
}

/// Lazily walks a paginated connection, starting at `start` (`None` for
/// the first page).
///
/// `fetch` is called with the cursor of the page to load. The stream ends
/// after the last page, after the first error (which it yields), or when
/// the source hands back the same cursor it was asked for.
pub fn paginate<'a, T, F, Fut>(
    start: Option<String>,
    fetch: F,
) -> impl Stream<Item = Result<T, ScraperError>> + Send + 'a
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>, ScraperError>> + Send + 'a,
{
    let pager = Pager {
        buffer: VecDeque::new(),
        pending: Some(start),
    };
    stream::try_unfold((pager, fetch), |(mut pager, mut fetch)| async move {
        loop {
            if let Some(item) = pager.buffer.pop_front() {
                return Ok(Some((item, (pager, fetch))));
            }
            let Some(cursor) = pager.pending.take() else {
                return Ok(None);
            };
            let page = fetch(cursor.clone()).await?;
            pager.buffer.extend(page.items);
            pager.pending = match page.next_cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(cursor = %next, "source repeated page cursor; stopping");
                    None
                }
                Some(next) => Some(Some(next)),
                None => None,
            };
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use futures::{StreamExt, TryStreamExt};

    use super::*;

    fn pages() -> Vec<Page<u32>> {
        vec![
            Page {
                items: vec![1, 2],
                next_cursor: Some("c1".to_owned()),
            },
            Page {
                items: vec![3, 4],
                next_cursor: Some("c2".to_owned()),
            },
            Page::last(vec![5]),
        ]
    }

    fn cursor_index(cursor: Option<&str>) -> usize {
        match cursor {
            None => 0,
            Some("c1") => 1,
            Some("c2") => 2,
            Some(other) => panic!("unexpected cursor {other}"),
        }
    }

    #[test]
    fn next_cursor_requires_has_next_page() {
        let info = PageInfo {
            has_next_page: false,
            end_cursor: Some("abc".to_owned()),
        };
        assert!(next_cursor(&info).is_none());
    }

    #[test]
    fn next_cursor_ignores_empty_cursor() {
        let info = PageInfo {
            has_next_page: true,
            end_cursor: Some(String::new()),
        };
        assert!(next_cursor(&info).is_none());
    }

    #[test]
    fn next_cursor_returns_end_cursor() {
        let info = PageInfo {
            has_next_page: true,
            end_cursor: Some("abc".to_owned()),
        };
        assert_eq!(next_cursor(&info).as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn walks_every_page_in_order() {
        let all = pages();
        let items: Vec<u32> = paginate(None, move |cursor| {
            let page = all[cursor_index(cursor.as_deref())].clone();
            async move { Ok(page) }
        })
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, [1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn fetches_only_pages_the_consumer_reaches() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fetches);
        let all = pages();
        let items: Vec<u32> = paginate(None, move |cursor| {
            counter.fetch_add(1, Ordering::SeqCst);
            let page = all[cursor_index(cursor.as_deref())].clone();
            async move { Ok(page) }
        })
        .take(3)
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, [1, 2, 3]);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn starts_from_given_cursor() {
        let all = pages();
        let items: Vec<u32> = paginate(Some("c2".to_owned()), move |cursor| {
            let page = all[cursor_index(cursor.as_deref())].clone();
            async move { Ok(page) }
        })
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, [5]);
    }

    #[tokio::test]
    async fn error_is_yielded_after_earlier_items_then_stream_ends() {
        let items: Vec<Result<u32, ScraperError>> = paginate(None, |cursor| async move {
            match cursor.as_deref() {
                None => Ok(Page {
                    items: vec![1],
                    next_cursor: Some("c1".to_owned()),
                }),
                _ => Err(ScraperError::NotFound {
                    url: "https://example.test/graphql".to_owned(),
                }),
            }
        })
        .collect()
        .await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Ok(1)));
        assert!(matches!(items[1], Err(ScraperError::NotFound { .. })));
    }

    #[tokio::test]
    async fn repeated_cursor_stops_the_walk() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fetches);
        let items: Vec<u32> = paginate(Some("same".to_owned()), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(Page {
                    items: vec![7],
                    next_cursor: Some("same".to_owned()),
                })
            }
        })
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, [7]);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_last_page_ends_stream() {
        let items: Vec<u32> = paginate(None, |_| async { Ok(Page::last(Vec::<u32>::new())) })
            .try_collect()
            .await
            .unwrap();
        assert!(items.is_empty());
    }
}

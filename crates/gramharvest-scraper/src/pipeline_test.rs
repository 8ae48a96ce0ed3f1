use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gramharvest_core::{parse_day, Scalar, TargetKind};
use serde_json::json;

use super::*;
use crate::error::DownloadError;
use crate::item::RawComment;
use crate::source::fake::FakeSource;

/// Records every download and fails for the configured shortcodes. Can
/// raise the cancel flag once a given number of items went through.
#[derive(Default)]
struct FakeDownloader {
    fail_for: HashSet<String>,
    cancel_after: Option<(usize, CancelFlag)>,
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaDownloader for FakeDownloader {
    async fn download(&self, item: &RawItem, _target_dir: &str) -> Result<(), DownloadError> {
        let code = item.shortcode().unwrap_or_default();
        let seen = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(code.clone());
            seen.len()
        };
        if let Some((after, flag)) = &self.cancel_after {
            if seen >= *after {
                flag.cancel();
            }
        }
        if self.fail_for.contains(&code) {
            return Err(DownloadError::Status {
                status: 403,
                url: format!("https://cdn.example/{code}.jpg"),
            });
        }
        Ok(())
    }
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
}

fn post(code: &str, day: u32, comments: i64) -> RawItem {
    RawItem::from_node(json!({
        "__typename": "GraphImage",
        "id": "1",
        "shortcode": code,
        "owner": {"id": "7", "username": "someone"},
        "taken_at_timestamp": at(day).timestamp(),
        "display_url": format!("https://cdn.example/{code}.jpg"),
        "edge_media_preview_like": {"count": 1},
        "edge_media_to_comment": {"count": comments}
    }))
}

/// Five posts on days 9..5, two per page.
fn five_posts() -> Vec<Vec<RawItem>> {
    vec![
        vec![post("p1", 9, 0), post("p2", 8, 0)],
        vec![post("p3", 7, 0), post("p4", 6, 0)],
        vec![post("p5", 5, 0)],
    ]
}

fn hashtag() -> TargetDescriptor {
    TargetDescriptor::new(TargetKind::Hashtag, "nature").unwrap()
}

fn harvester(
    source: &Arc<FakeSource>,
    downloader: FakeDownloader,
    options: HarvestOptions,
) -> Harvester<FakeSource, FakeDownloader> {
    Harvester::new(
        Arc::clone(source),
        Arc::new(downloader),
        options,
        CancelFlag::new(),
    )
}

fn shortcodes(result: &HarvestResult) -> Vec<String> {
    result
        .posts
        .iter()
        .filter_map(|p| p.get("shortcode"))
        .map(ToString::to_string)
        .collect()
}

fn comment(id: &str, answers: Vec<RawComment>) -> RawComment {
    RawComment {
        id: id.to_owned(),
        text: format!("comment {id}"),
        answers,
        ..RawComment::default()
    }
}

#[tokio::test]
async fn count_cap_yields_first_n_in_order() {
    let source = Arc::new(FakeSource::with_pages(five_posts()));
    let options = HarvestOptions {
        window: WindowSpec::with_limit(3),
        ..HarvestOptions::default()
    };
    let result = harvester(&source, FakeDownloader::default(), options)
        .harvest(&hashtag())
        .await
        .unwrap();

    assert_eq!(shortcodes(&result), ["p1", "p2", "p3"]);
    assert_eq!(result.outcome, QueryOutcome::Exhausted);
    assert_eq!(source.item_fetches(), 2);
}

#[tokio::test]
async fn since_stops_without_fetching_further_pages() {
    let source = Arc::new(FakeSource::with_pages(five_posts()));
    let options = HarvestOptions {
        window: WindowSpec::new(Some(parse_day("2024-03-08").unwrap()), None, None).unwrap(),
        ..HarvestOptions::default()
    };
    let result = harvester(&source, FakeDownloader::default(), options)
        .harvest(&hashtag())
        .await
        .unwrap();

    assert_eq!(shortcodes(&result), ["p1", "p2"]);
    // p3 on page two ends the window; page three is never requested.
    assert_eq!(source.item_fetches(), 2);
}

#[tokio::test]
async fn rows_match_header() {
    let source = Arc::new(FakeSource::with_pages(five_posts()));
    let result = harvester(&source, FakeDownloader::default(), HarvestOptions::default())
        .harvest(&hashtag())
        .await
        .unwrap();

    assert_eq!(result.posts.len(), 5);
    for row in &result.posts {
        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, result.columns);
    }
    assert_eq!(result.posts[0].get("loc_id"), Some(&Scalar::Empty));
}

#[tokio::test]
async fn failed_download_skips_item_by_default() {
    let source = Arc::new(FakeSource::with_pages(five_posts()));
    let downloader = FakeDownloader {
        fail_for: HashSet::from(["p2".to_owned()]),
        ..FakeDownloader::default()
    };
    let result = harvester(&source, downloader, HarvestOptions::default())
        .harvest(&hashtag())
        .await
        .unwrap();

    assert_eq!(shortcodes(&result), ["p1", "p3", "p4", "p5"]);
    assert_eq!(result.skipped_items, 1);
    assert_eq!(result.outcome, QueryOutcome::Exhausted);
}

#[tokio::test]
async fn keep_record_policy_survives_failed_download() {
    let source = Arc::new(FakeSource::with_pages(five_posts()));
    let downloader = FakeDownloader {
        fail_for: HashSet::from(["p2".to_owned()]),
        ..FakeDownloader::default()
    };
    let options = HarvestOptions {
        download_failure_policy: DownloadFailurePolicy::KeepRecord,
        ..HarvestOptions::default()
    };
    let result = harvester(&source, downloader, options)
        .harvest(&hashtag())
        .await
        .unwrap();

    assert_eq!(result.posts.len(), 5);
    assert_eq!(result.skipped_items, 0);
}

#[tokio::test]
async fn comments_are_flattened_for_posts_that_report_them() {
    let source = Arc::new(FakeSource {
        item_pages: vec![vec![post("a", 9, 3), post("b", 8, 0)]],
        comments: HashMap::from([(
            "a".to_owned(),
            vec![comment("c1", vec![comment("c2", Vec::new()), comment("c3", Vec::new())])],
        )]),
        ..FakeSource::default()
    });
    let result = harvester(&source, FakeDownloader::default(), HarvestOptions::default())
        .harvest(&hashtag())
        .await
        .unwrap();

    assert_eq!(result.comments.len(), 3);
    assert!(result.comments.iter().all(|c| c.post_shortcode == "a"));
    assert_eq!(result.comments[0].answer_to_comment, None);
    assert_eq!(result.comments[1].answer_to_comment.as_deref(), Some("c1"));
    assert_eq!(result.comments[2].answer_to_comment.as_deref(), Some("c1"));
    // "b" reports no comments, so its thread is never requested.
    assert_eq!(*source.comment_requests.lock().unwrap(), ["a"]);
}

#[tokio::test]
async fn comments_disabled_requests_no_threads() {
    let source = Arc::new(FakeSource::with_pages(vec![vec![post("a", 9, 3)]]));
    let options = HarvestOptions {
        comments: false,
        ..HarvestOptions::default()
    };
    let result = harvester(&source, FakeDownloader::default(), options)
        .harvest(&hashtag())
        .await
        .unwrap();

    assert_eq!(result.posts.len(), 1);
    assert!(result.comments.is_empty());
    assert!(source.comment_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failing_thread_drops_the_whole_item() {
    // "a" reports comments but the fake has no thread for it.
    let source = Arc::new(FakeSource::with_pages(vec![vec![post("a", 9, 2), post("b", 8, 0)]]));
    let result = harvester(&source, FakeDownloader::default(), HarvestOptions::default())
        .harvest(&hashtag())
        .await
        .unwrap();

    assert_eq!(shortcodes(&result), ["b"]);
    assert!(result.comments.is_empty());
    assert_eq!(result.skipped_items, 1);
}

#[tokio::test]
async fn later_page_failure_keeps_earlier_posts() {
    let source = Arc::new(FakeSource {
        item_pages: five_posts(),
        fail_after_page: Some(0),
        ..FakeSource::default()
    });
    let result = harvester(&source, FakeDownloader::default(), HarvestOptions::default())
        .harvest(&hashtag())
        .await
        .unwrap();

    assert_eq!(shortcodes(&result), ["p1", "p2"]);
    assert!(matches!(result.outcome, QueryOutcome::SourceFailed(_)));
    assert!(result.outcome.is_partial());
}

#[tokio::test]
async fn unresolvable_target_is_an_error() {
    let source = Arc::new(FakeSource {
        unavailable: true,
        ..FakeSource::default()
    });
    let err = harvester(&source, FakeDownloader::default(), HarvestOptions::default())
        .harvest(&hashtag())
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::TargetUnavailable { .. }));
}

#[tokio::test]
async fn target_missing_on_first_page_is_an_error() {
    let source = Arc::new(FakeSource {
        item_pages: five_posts(),
        vanishes_on_first_page: true,
        ..FakeSource::default()
    });
    let err = harvester(&source, FakeDownloader::default(), HarvestOptions::default())
        .harvest(&hashtag())
        .await
        .unwrap_err();
    assert!(err.is_resolution_failure());
}

#[tokio::test]
async fn login_kinds_need_a_session() {
    let source = Arc::new(FakeSource::with_pages(five_posts()));
    let target = TargetDescriptor::new(TargetKind::Feed, "feed").unwrap();
    let err = harvester(&source, FakeDownloader::default(), HarvestOptions::default())
        .harvest(&target)
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::LoginRequired(TargetKind::Feed)));
}

#[tokio::test]
async fn cancellation_stops_at_item_boundary() {
    let source = Arc::new(FakeSource::with_pages(five_posts()));
    let cancel = CancelFlag::new();
    let downloader = FakeDownloader {
        cancel_after: Some((2, cancel.clone())),
        ..FakeDownloader::default()
    };
    let harvester = Harvester::new(
        Arc::clone(&source),
        Arc::new(downloader),
        HarvestOptions::default(),
        cancel.clone(),
    );
    let result = harvester.harvest(&hashtag()).await.unwrap();

    // The second item finishes before the flag is looked at.
    assert_eq!(shortcodes(&result), ["p1", "p2"]);
    assert_eq!(result.outcome, QueryOutcome::Cancelled);
    assert_eq!(source.item_fetches(), 1);

    // After a reset the next query runs again; the downloader's counter is
    // already past its threshold, so it stops after one item.
    cancel.reset();
    let again = harvester.harvest(&hashtag()).await.unwrap();
    assert_eq!(shortcodes(&again), ["p1"]);
    assert_eq!(again.outcome, QueryOutcome::Cancelled);
}

#[tokio::test]
async fn cancelled_before_start_fetches_nothing() {
    let source = Arc::new(FakeSource::with_pages(five_posts()));
    let cancel = CancelFlag::new();
    cancel.cancel();
    let harvester = Harvester::new(
        Arc::clone(&source),
        Arc::new(FakeDownloader::default()),
        HarvestOptions::default(),
        cancel,
    );
    let result = harvester.harvest(&hashtag()).await.unwrap();
    assert!(result.posts.is_empty());
    assert_eq!(source.item_fetches(), 0);
}

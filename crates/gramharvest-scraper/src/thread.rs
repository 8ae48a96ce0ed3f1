//! Comment threads flattened into rows.
//!
//! Threads are two levels deep: top-level comments and their answers.
//! Each comment becomes one record, immediately followed by one record per
//! answer pointing back at it.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use gramharvest_core::CommentRecord;

use crate::error::ScraperError;
use crate::item::RawComment;
use crate::pagination::paginate;
use crate::source::ContentSource;

/// Rows for one comment and the answers it carries.
///
/// Answers are not followed further: an answer's own answers are ignored.
#[must_use]
pub fn flatten_comment(post_shortcode: &str, comment: &RawComment) -> Vec<CommentRecord> {
    let mut records = Vec::with_capacity(1 + comment.answers.len());
    records.push(comment_record(post_shortcode, comment, None));
    records.extend(
        comment
            .answers
            .iter()
            .map(|answer| comment_record(post_shortcode, answer, Some(&comment.id))),
    );
    records
}

fn comment_record(
    post_shortcode: &str,
    comment: &RawComment,
    answer_to: Option<&str>,
) -> CommentRecord {
    CommentRecord {
        post_shortcode: post_shortcode.to_owned(),
        answer_to_comment: answer_to.map(str::to_owned),
        created_at_utc: comment.created_at.map(|ts| ts.naive_utc()),
        id: comment.id.clone(),
        likes_count: comment.likes_count,
        owner: comment.owner_id.clone(),
        text: comment.text.clone(),
    }
}

/// Lazily walks every comment page of a post and yields flattened rows.
///
/// A comment whose answers did not fit in the embedded preview has the
/// rest of them fetched before its rows are emitted, so ordering stays
/// comment-then-answers. The first failing page ends the stream with that
/// error.
pub fn comment_records<'a, S>(
    source: &'a Arc<S>,
    post_shortcode: String,
) -> BoxStream<'a, Result<CommentRecord, ScraperError>>
where
    S: ContentSource + ?Sized + 'a,
{
    let shortcode = Arc::<str>::from(post_shortcode);
    let page_shortcode = Arc::clone(&shortcode);
    paginate(None, move |cursor| {
        let source = Arc::clone(source);
        let shortcode = Arc::clone(&page_shortcode);
        async move { source.comment_page(&shortcode, cursor.as_deref()).await }
    })
    .and_then(move |comment| complete_answers(Arc::clone(source), comment))
    .map_ok(move |comment| {
        stream::iter(flatten_comment(&shortcode, &comment).into_iter().map(Ok))
    })
    .try_flatten()
    .boxed()
}

/// Appends the answer pages a comment only referenced by cursor.
async fn complete_answers<S>(
    source: Arc<S>,
    mut comment: RawComment,
) -> Result<RawComment, ScraperError>
where
    S: ContentSource + ?Sized,
{
    let Some(cursor) = comment.answers_cursor.take() else {
        return Ok(comment);
    };
    let comment_id = Arc::<str>::from(comment.id.as_str());
    let rest: Vec<RawComment> = paginate(Some(cursor), move |cursor| {
        let source = Arc::clone(&source);
        let comment_id = Arc::clone(&comment_id);
        async move { source.answer_page(&comment_id, cursor.as_deref()).await }
    })
    .try_collect()
    .await?;
    comment.answers.extend(rest);
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::DateTime;

    use super::*;
    use crate::source::fake::FakeSource;

    fn comment(id: &str, answers: Vec<RawComment>) -> RawComment {
        RawComment {
            id: id.to_owned(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0),
            text: format!("text of {id}"),
            owner_id: Some("42".to_owned()),
            likes_count: Some(1),
            answers,
            answers_cursor: None,
        }
    }

    #[test]
    fn comment_without_answers_is_one_record() {
        let records = flatten_comment("abc", &comment("1", Vec::new()));
        assert_eq!(records.len(), 1);
        assert!(records[0].answer_to_comment.is_none());
        assert_eq!(records[0].post_shortcode, "abc");
    }

    #[test]
    fn two_answers_make_three_records() {
        let c = comment("1", vec![comment("2", Vec::new()), comment("3", Vec::new())]);
        let records = flatten_comment("abc", &c);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "1");
        assert!(!records[0].is_answer());
        for answer in &records[1..] {
            assert_eq!(answer.answer_to_comment.as_deref(), Some("1"));
        }
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn answers_do_not_recurse() {
        let nested = comment("3", vec![comment("4", Vec::new())]);
        let c = comment("1", vec![nested]);
        let records = flatten_comment("abc", &c);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.id != "4"));
    }

    #[test]
    fn record_copies_comment_fields() {
        let records = flatten_comment("abc", &comment("7", Vec::new()));
        let r = &records[0];
        assert_eq!(r.owner.as_deref(), Some("42"));
        assert_eq!(r.likes_count, Some(1));
        assert_eq!(r.text, "text of 7");
        assert_eq!(
            r.created_at_utc.map(|t| t.to_string()).as_deref(),
            Some("2023-11-14 22:13:20")
        );
    }

    #[tokio::test]
    async fn stream_fetches_remaining_answer_pages() {
        let mut first = comment("1", vec![comment("2", Vec::new())]);
        first.answers_cursor = Some("more".to_owned());
        let source = Arc::new(FakeSource {
            comments: HashMap::from([(
                "abc".to_owned(),
                vec![first, comment("5", Vec::new())],
            )]),
            answers: HashMap::from([("1".to_owned(), vec![comment("3", Vec::new())])]),
            ..FakeSource::default()
        });
        let records: Vec<CommentRecord> = comment_records(&source, "abc".to_owned())
            .try_collect()
            .await
            .unwrap();
        let rows: Vec<(&str, Option<&str>)> = records
            .iter()
            .map(|r| (r.id.as_str(), r.answer_to_comment.as_deref()))
            .collect();
        assert_eq!(
            rows,
            [("1", None), ("2", Some("1")), ("3", Some("1")), ("5", None)]
        );
    }

    #[tokio::test]
    async fn failing_comment_page_surfaces_error() {
        let source = Arc::new(FakeSource::default());
        let result: Result<Vec<CommentRecord>, _> =
            comment_records(&source, "missing".to_owned()).try_collect().await;
        assert!(matches!(result, Err(ScraperError::NotFound { .. })));
    }
}

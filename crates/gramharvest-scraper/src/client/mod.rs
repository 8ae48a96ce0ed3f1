//! HTTP client for the content source's web endpoints.

mod queries;
mod session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gramharvest_core::{HarvestConfig, TargetDescriptor, TargetKind};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ScraperError;
use crate::item::{RawComment, RawItem};
use crate::pagination::{next_cursor, Page};
use crate::source::{ContentSource, FeedQuery, ItemFeed};
use crate::types::{
    CommentConnection, GraphqlEnvelope, MediaConnection, ProfileInfoResponse, ProfileUser,
};

pub use session::Session;

/// Application id the web front end sends with every API request.
const WEB_APP_ID: &str = "936619743392459";

/// Connection settings for [`InstagramClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub page_size: u32,
    pub inter_request_delay_ms: u64,
}

impl ClientSettings {
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            page_size: config.page_size,
            inter_request_delay_ms: config.inter_request_delay_ms,
        }
    }
}

/// Reads profiles, hashtags, locations, posts, stories, the home feed and
/// saved posts, plus comment threads.
///
/// Responses map to typed errors: 429 to [`ScraperError::RateLimited`],
/// 404 to [`ScraperError::NotFound`], other non-2xx to
/// [`ScraperError::UnexpectedStatus`]. Nothing is retried; the harvest
/// decides what a failure means.
pub struct InstagramClient {
    client: Client,
    base_url: Url,
    page_size: u32,
    inter_request_delay_ms: u64,
    session: Option<Session>,
    sent_first_request: AtomicBool,
}

impl InstagramClient {
    /// # Errors
    ///
    /// - [`ScraperError::InvalidBaseUrl`] if `settings.base_url` is not an
    ///   absolute http(s) URL.
    /// - [`ScraperError::Http`] if the underlying `reqwest::Client` cannot
    ///   be constructed.
    pub fn new(settings: &ClientSettings, session: Option<Session>) -> Result<Self, ScraperError> {
        let base_url = Self::parse_base_url(&settings.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&settings.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            page_size: settings.page_size,
            inter_request_delay_ms: settings.inter_request_delay_ms,
            session,
            sent_first_request: AtomicBool::new(false),
        })
    }

    /// Parses the base URL, making sure it ends in `/` so relative joins
    /// keep any path prefix.
    fn parse_base_url(raw: &str) -> Result<Url, ScraperError> {
        let invalid = |reason: String| ScraperError::InvalidBaseUrl {
            base_url: raw.to_owned(),
            reason,
        };
        let mut normalized = raw.trim().to_owned();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let url = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
        }
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ScraperError> {
        self.base_url
            .join(path)
            .map_err(|e| ScraperError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// `graphql/query/?query_hash=...&variables=...`
    fn graphql_url(
        &self,
        query_hash: &str,
        variables: &Map<String, Value>,
    ) -> Result<Url, ScraperError> {
        let mut url = self.endpoint("graphql/query/")?;
        let variables = serde_json::to_string(variables).map_err(|e| ScraperError::Deserialize {
            context: "graphql variables".to_owned(),
            source: e,
        })?;
        url.query_pairs_mut()
            .append_pair("query_hash", query_hash)
            .append_pair("variables", &variables);
        Ok(url)
    }

    fn profile_url(&self, username: &str) -> Result<Url, ScraperError> {
        let mut url = self.endpoint("api/v1/users/web_profile_info/")?;
        url.query_pairs_mut().append_pair("username", username);
        Ok(url)
    }

    async fn pace(&self) {
        let first = !self.sent_first_request.swap(true, Ordering::SeqCst);
        if !first && self.inter_request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.inter_request_delay_ms)).await;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, context: &str) -> Result<T, ScraperError> {
        self.pace().await;
        tracing::debug!(url = %url, "GET");

        let mut request = self
            .client
            .get(url.clone())
            .header("X-IG-App-ID", WEB_APP_ID)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9");
        if let Some(session) = &self.session {
            request = request.header(reqwest::header::COOKIE, session.cookie_header());
            if let Some(token) = session.csrf_token() {
                request = request.header("X-CSRFToken", token);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        let url = url.to_string();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited {
                url,
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound { url });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| ScraperError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }

    /// Runs a GraphQL query and returns its `data` object.
    async fn graphql(
        &self,
        query_hash: &str,
        variables: &Map<String, Value>,
        context: &str,
    ) -> Result<Value, ScraperError> {
        let url = self.graphql_url(query_hash, variables)?;
        let envelope: GraphqlEnvelope = self.get_json(url, context).await?;
        if envelope.status.as_deref() == Some("fail") {
            return Err(ScraperError::Api {
                context: context.to_owned(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request failed".to_owned()),
            });
        }
        envelope.data.ok_or_else(|| ScraperError::Api {
            context: context.to_owned(),
            message: "response has no data".to_owned(),
        })
    }

    /// Looks up a profile by username.
    ///
    /// # Errors
    ///
    /// [`ScraperError::TargetUnavailable`] if no such profile exists.
    pub async fn profile(&self, kind: TargetKind, username: &str) -> Result<ProfileUser, ScraperError> {
        let url = self.profile_url(username)?;
        let unavailable = |reason: &str| ScraperError::TargetUnavailable {
            kind,
            query: username.to_owned(),
            reason: reason.to_owned(),
        };
        let response: ProfileInfoResponse =
            match self.get_json(url, &format!("profile {username}")).await {
                Err(ScraperError::NotFound { .. }) => {
                    return Err(unavailable("profile does not exist"))
                }
                other => other?,
            };
        response
            .data
            .user
            .ok_or_else(|| unavailable("profile does not exist"))
    }

    /// Profile lookup plus the visibility rules of `kind`: a public-profile
    /// target must not be private, and a private profile must be followed
    /// by the session.
    async fn visible_profile(
        &self,
        target: &TargetDescriptor,
    ) -> Result<ProfileUser, ScraperError> {
        let user = self.profile(target.kind, &target.query).await?;
        let unavailable = |reason: &str| ScraperError::TargetUnavailable {
            kind: target.kind,
            query: target.query.clone(),
            reason: reason.to_owned(),
        };
        match target.kind {
            TargetKind::PublicProfile if user.is_private => Err(unavailable(
                "profile is private; harvest it as private-profile with a session",
            )),
            TargetKind::PrivateProfile | TargetKind::Story
                if user.is_private && !user.followed_by_viewer =>
            {
                Err(unavailable("profile is private and not followed by this session"))
            }
            _ => Ok(user),
        }
    }

    async fn single_post(&self, target: &TargetDescriptor) -> Result<ItemFeed, ScraperError> {
        let variables = queries::single_post_variables(&target.query);
        let context = format!("post {}", target.query);
        let data = match self.graphql(queries::SINGLE_POST, &variables, &context).await {
            Err(ScraperError::NotFound { .. }) => Value::Null,
            other => other?,
        };
        match queries::walk(&data, &["shortcode_media"]) {
            Some(node) => Ok(ItemFeed::Fixed(vec![RawItem::from_node(node.clone())])),
            None => Err(ScraperError::TargetUnavailable {
                kind: target.kind,
                query: target.query.clone(),
                reason: "post does not exist or was removed".to_owned(),
            }),
        }
    }

    async fn stories(&self, target: &TargetDescriptor) -> Result<ItemFeed, ScraperError> {
        let user = self.visible_profile(target).await?;
        let variables = queries::story_variables(&user.id);
        let data = self
            .graphql(
                queries::STORY_REELS,
                &variables,
                &format!("stories of {}", user.username),
            )
            .await?;
        // No current stories comes back as an empty `reels_media` list.
        let items = data
            .pointer("/reels_media/0/items")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().cloned().map(RawItem::from_node).collect())
            .unwrap_or_default();
        Ok(ItemFeed::Fixed(items))
    }
}

#[async_trait]
impl ContentSource for InstagramClient {
    fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    async fn resolve(&self, target: &TargetDescriptor) -> Result<ItemFeed, ScraperError> {
        match target.kind {
            TargetKind::PublicProfile | TargetKind::PrivateProfile => {
                let user = self.visible_profile(target).await?;
                Ok(ItemFeed::Paged(queries::profile_posts(
                    target.kind,
                    &user.username,
                    &user.id,
                )))
            }
            TargetKind::Hashtag => Ok(ItemFeed::Paged(queries::hashtag_posts(&target.query))),
            TargetKind::Location => Ok(ItemFeed::Paged(queries::location_posts(&target.query))),
            TargetKind::SinglePost => self.single_post(target).await,
            TargetKind::Story => self.stories(target).await,
            TargetKind::Feed => Ok(ItemFeed::Paged(queries::feed_posts())),
            TargetKind::Saved => {
                let user = self.profile(target.kind, &target.query).await?;
                Ok(ItemFeed::Paged(queries::saved_posts(&user.username, &user.id)))
            }
        }
    }

    async fn item_page(
        &self,
        feed: &FeedQuery,
        cursor: Option<&str>,
    ) -> Result<Page<RawItem>, ScraperError> {
        let variables = queries::page_variables(feed, self.page_size, cursor);
        let context = format!("{} {} page", feed.kind, feed.label);
        let data = self.graphql(feed.query_hash, &variables, &context).await?;

        let Some(raw) = queries::walk(&data, feed.connection_path) else {
            // A missing connection on the first page means the target itself
            // does not exist (unknown hashtag or location).
            if cursor.is_none() {
                return Err(ScraperError::TargetUnavailable {
                    kind: feed.kind,
                    query: feed.label.clone(),
                    reason: "not found".to_owned(),
                });
            }
            return Err(ScraperError::Api {
                context,
                message: "page has no media connection".to_owned(),
            });
        };
        let connection: MediaConnection =
            serde_json::from_value(raw.clone()).map_err(|e| ScraperError::Deserialize {
                context: context.clone(),
                source: e,
            })?;

        let items = connection
            .edges
            .into_iter()
            .map(|edge| RawItem::from_node(edge.node))
            .filter(|item| !feed.posts_only || item.lookup("/shortcode").is_some())
            .collect();
        tracing::debug!(
            kind = %feed.kind,
            label = %feed.label,
            count = connection.count,
            has_next = connection.page_info.has_next_page,
            "item page fetched"
        );
        Ok(Page {
            items,
            next_cursor: next_cursor(&connection.page_info),
        })
    }

    async fn comment_page(
        &self,
        shortcode: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawComment>, ScraperError> {
        let variables = queries::thread_variables("shortcode", shortcode, self.page_size, cursor);
        let context = format!("comments on {shortcode}");
        let data = self
            .graphql(queries::POST_COMMENTS, &variables, &context)
            .await?;
        thread_page(
            &data,
            &["shortcode_media", "edge_media_to_parent_comment"],
            context,
        )
    }

    async fn answer_page(
        &self,
        comment_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawComment>, ScraperError> {
        let variables =
            queries::thread_variables("comment_id", comment_id, self.page_size, cursor);
        let context = format!("answers to comment {comment_id}");
        let data = self
            .graphql(queries::COMMENT_ANSWERS, &variables, &context)
            .await?;
        thread_page(&data, &["comment", "edge_threaded_comments"], context)
    }
}

fn thread_page(data: &Value, path: &[&str], context: String) -> Result<Page<RawComment>, ScraperError> {
    let raw = queries::walk(data, path).ok_or_else(|| ScraperError::Api {
        context: context.clone(),
        message: "response has no comment connection".to_owned(),
    })?;
    let connection: CommentConnection =
        serde_json::from_value(raw.clone()).map_err(|e| ScraperError::Deserialize {
            context,
            source: e,
        })?;
    Ok(Page {
        next_cursor: next_cursor(&connection.page_info),
        items: connection
            .edges
            .into_iter()
            .map(|edge| RawComment::from(edge.node))
            .collect(),
    })
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;

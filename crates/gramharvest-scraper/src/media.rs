//! The per-item media download side effect.
//!
//! Each item gets a JSON metadata sidecar next to its media files, named
//! after its shortcode, inside the target's output directory. Which media
//! files are fetched is controlled by [`MediaOptions`]; extraction does
//! not depend on it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{DownloadError, ScraperError};
use crate::item::RawItem;

/// Which media kinds to download, and how to write the metadata sidecar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaOptions {
    pub pictures: bool,
    pub videos: bool,
    pub thumbnails: bool,
    /// Write sidecars as compact single-line JSON instead of pretty-printed.
    pub compress_json: bool,
}

#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Stores the media and metadata for `item` under `target_dir`.
    ///
    /// # Errors
    ///
    /// Any [`DownloadError`]; the caller decides whether the item survives.
    async fn download(&self, item: &RawItem, target_dir: &str) -> Result<(), DownloadError>;
}

/// One file to fetch for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub url: String,
    pub file_name: String,
}

/// Lists the media files `options` asks for. Sidecar posts number their
/// children from 1 (`{shortcode}_1.jpg`).
#[must_use]
pub fn plan_files(item: &RawItem, shortcode: &str, options: &MediaOptions) -> Vec<MediaFile> {
    let children = item.sidecar_children();
    if children.is_empty() {
        return plan_single(item, shortcode, options);
    }
    children
        .iter()
        .enumerate()
        .flat_map(|(idx, child)| plan_single(child, &format!("{shortcode}_{}", idx + 1), options))
        .collect()
}

fn plan_single(item: &RawItem, stem: &str, options: &MediaOptions) -> Vec<MediaFile> {
    let mut files = Vec::new();
    let file = |url: &str, suffix: &str| MediaFile {
        url: url.to_owned(),
        file_name: format!("{stem}{suffix}"),
    };
    if item.is_video() {
        if options.videos {
            if let Some(url) = item.video_url() {
                files.push(file(url, ".mp4"));
            }
        }
        if options.thumbnails {
            if let Some(url) = item.display_url() {
                files.push(file(url, "_thumb.jpg"));
            }
        }
    } else if options.pictures {
        if let Some(url) = item.display_url() {
            files.push(file(url, ".jpg"));
        }
    }
    files
}

/// Downloads over HTTP into `{output_dir}/{target_dir}/`.
///
/// Files that already exist are left alone, so re-running a harvest over
/// the same directory only fetches what is new.
pub struct HttpMediaDownloader {
    client: Client,
    output_dir: PathBuf,
    options: MediaOptions,
}

impl HttpMediaDownloader {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(
        output_dir: impl Into<PathBuf>,
        options: MediaOptions,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            output_dir: output_dir.into(),
            options,
        })
    }

    #[must_use]
    pub fn options(&self) -> &MediaOptions {
        &self.options
    }

    async fn write_sidecar(
        &self,
        item: &RawItem,
        shortcode: &str,
        dir: &Path,
    ) -> Result<(), DownloadError> {
        let json = if self.options.compress_json {
            serde_json::to_vec(item.node())
        } else {
            serde_json::to_vec_pretty(item.node())
        }
        .map_err(|source| DownloadError::Metadata {
            shortcode: shortcode.to_owned(),
            source,
        })?;
        let path = dir.join(format!("{shortcode}.json"));
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| io_error(&path, source))
    }

    async fn fetch_to(&self, file: &MediaFile, dir: &Path) -> Result<(), DownloadError> {
        let path = dir.join(&file.file_name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), "media file exists; skipping");
            return Ok(());
        }
        let http_error = |source| DownloadError::Http {
            url: file.url.clone(),
            source,
        };
        let response = self
            .client
            .get(&file.url)
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
                url: file.url.clone(),
            });
        }
        let body = response.bytes().await.map_err(http_error)?;
        tokio::fs::write(&path, &body)
            .await
            .map_err(|source| io_error(&path, source))?;
        tracing::debug!(path = %path.display(), bytes = body.len(), "media file written");
        Ok(())
    }
}

#[async_trait]
impl MediaDownloader for HttpMediaDownloader {
    async fn download(&self, item: &RawItem, target_dir: &str) -> Result<(), DownloadError> {
        let shortcode = item.shortcode().ok_or(DownloadError::NoShortcode)?;
        let dir = self.output_dir.join(target_dir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_error(&dir, source))?;

        self.write_sidecar(item, &shortcode, &dir).await?;
        for file in plan_files(item, &shortcode, &self.options) {
            self.fetch_to(&file, &dir).await?;
        }
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> DownloadError {
    DownloadError::Io {
        path: path.display().to_string(),
        source,
    }
}

//! The `harvest` command: one harvester for the run, one query at a time.
//!
//! A query that cannot be opened (unknown target, private profile, missing
//! login) fails the run. Anything that goes wrong after that is reported
//! in the query's outcome and its partial results are still written.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use gramharvest_core::{parse_day, parse_queries, HarvestConfig, TargetKind, WindowSpec};
use gramharvest_scraper::{
    CancelFlag, ClientSettings, HarvestOptions, Harvester, HttpMediaDownloader, InstagramClient,
    MediaOptions, Session,
};

use crate::output;

#[derive(Debug, Args)]
pub struct HarvestArgs {
    /// Target kind (run `gramharvest targets` for the list)
    #[arg(long)]
    pub target: TargetKind,

    /// Comma-separated queries: usernames, tags, location ids or shortcodes
    #[arg(long)]
    pub queries: String,

    /// Download pictures
    #[arg(long)]
    pub pictures: bool,

    /// Download videos
    #[arg(long)]
    pub videos: bool,

    /// Download video thumbnails
    #[arg(long)]
    pub thumbnails: bool,

    /// Skip comment threads
    #[arg(long)]
    pub no_comments: bool,

    /// Write metadata sidecars as compact JSON
    #[arg(long)]
    pub compress_json: bool,

    /// Use a stored session (required for every kind but public-profile,
    /// hashtag and single-post)
    #[arg(long)]
    pub login: bool,

    /// Session cookie file; overrides GRAMHARVEST_SESSION_FILE
    #[arg(long, requires = "login")]
    pub session_file: Option<PathBuf>,

    /// Only items posted after this day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    pub since: Option<DateTime<Utc>>,

    /// Only items posted before this day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    pub until: Option<DateTime<Utc>>,

    /// Stop after this many items per query
    #[arg(long)]
    pub limit: Option<usize>,
}

impl HarvestArgs {
    fn media_options(&self) -> MediaOptions {
        MediaOptions {
            pictures: self.pictures,
            videos: self.videos,
            thumbnails: self.thumbnails,
            compress_json: self.compress_json,
        }
    }

    pub(crate) fn harvest_options(&self, config: &HarvestConfig) -> anyhow::Result<HarvestOptions> {
        let window = WindowSpec::new(self.since, self.until, self.limit)?;
        Ok(HarvestOptions {
            window,
            comments: !self.no_comments,
            download_failure_policy: config.download_failure_policy,
            ..HarvestOptions::default()
        })
    }
}

/// Loads the session when `--login` was given. Without a usable session
/// file a login run cannot start.
pub(crate) fn load_session(config: &HarvestConfig, args: &HarvestArgs) -> anyhow::Result<Option<Session>> {
    if !args.login {
        return Ok(None);
    }
    let path = args
        .session_file
        .as_ref()
        .or(config.session_file.as_ref())
        .context("--login needs a session file (--session-file or GRAMHARVEST_SESSION_FILE)")?;
    let session = Session::load(path)?;
    tracing::info!(path = %path.display(), "session loaded");
    Ok(Some(session))
}

/// What a Ctrl-C should do given the current cancellation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InterruptAction {
    /// Let the query in flight finish with what it has.
    FinishQuery,
    /// A query was already asked to stop; give up on the run.
    Exit,
}

/// Raises `cancel` on the first interrupt. An interrupt that arrives while
/// the flag is still raised means the user does not want to wait.
pub(crate) fn on_interrupt(cancel: &CancelFlag) -> InterruptAction {
    if cancel.is_cancelled() {
        return InterruptAction::Exit;
    }
    cancel.cancel();
    InterruptAction::FinishQuery
}

/// Exit status for a run killed by a repeated Ctrl-C (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// The first Ctrl-C lets the harvester finish the current query from its
/// next item on. A second one before the query ends exits the process.
fn spawn_interrupt_handler(cancel: CancelFlag) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&cancel) {
                InterruptAction::FinishQuery => {
                    tracing::warn!("interrupt received; finishing current query (press again to exit)");
                }
                InterruptAction::Exit => {
                    tracing::error!("second interrupt received; exiting without writing");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        }
    });
}

/// # Errors
///
/// Returns an error if the arguments or configuration are invalid, the
/// session cannot be loaded, a query cannot be opened, or its output
/// cannot be written.
pub(crate) async fn run_harvest(config: &HarvestConfig, args: &HarvestArgs) -> anyhow::Result<()> {
    let targets = parse_queries(args.target, &args.queries)?;
    let options = args.harvest_options(config)?;
    let session = load_session(config, args)?;

    let client = InstagramClient::new(&ClientSettings::from_config(config), session)
        .context("failed to build HTTP client")?;
    let downloader = HttpMediaDownloader::new(
        &config.output_dir,
        args.media_options(),
        config.request_timeout_secs,
        &config.user_agent,
    )
    .context("failed to build media downloader")?;

    let cancel = CancelFlag::new();
    spawn_interrupt_handler(cancel.clone());
    let harvester = Harvester::new(Arc::new(client), Arc::new(downloader), options, cancel.clone());

    let target_count = targets.len();
    for (idx, target) in targets.iter().enumerate() {
        cancel.reset();
        tracing::info!(
            query = %target,
            position = idx + 1,
            total = target_count,
            "harvesting"
        );

        let result = harvester
            .harvest(target)
            .await
            .with_context(|| format!("cannot harvest {target}"))?;
        let written = output::write_result(&config.output_dir, &result)?;

        println!(
            "{target}: {} posts, {} comments, {} skipped ({}) -> {}",
            result.posts.len(),
            result.comments.len(),
            result.skipped_items,
            result.outcome,
            written.display()
        );
    }

    Ok(())
}

//! CSV persistence of a harvest result.
//!
//! Each query gets its own directory under the output root, named after
//! the sanitized query, holding `<name>.csv` for posts and
//! `<name>_comments.csv` for comments. Both files always carry a header
//! row, even when empty.

use std::path::{Path, PathBuf};

use anyhow::Context;
use gramharvest_core::COMMENT_COLUMNS;
use gramharvest_scraper::HarvestResult;

/// Writes both tables for `result` and returns the query directory.
///
/// # Errors
///
/// Returns an error if the directory or either file cannot be written.
pub(crate) fn write_result(output_dir: &Path, result: &HarvestResult) -> anyhow::Result<PathBuf> {
    let name = result.target.dir_name();
    let dir = output_dir.join(&name);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create output directory {}", dir.display()))?;

    let posts_path = dir.join(format!("{name}.csv"));
    write_posts(&posts_path, result)
        .with_context(|| format!("cannot write {}", posts_path.display()))?;

    let comments_path = dir.join(format!("{name}_comments.csv"));
    write_comments(&comments_path, result)
        .with_context(|| format!("cannot write {}", comments_path.display()))?;

    tracing::info!(
        query = %result.target,
        posts = result.posts.len(),
        comments = result.comments.len(),
        outcome = %result.outcome,
        dir = %dir.display(),
        "results written"
    );
    Ok(dir)
}

fn write_posts(path: &Path, result: &HarvestResult) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&result.columns)?;
    for post in &result.posts {
        writer.write_record(post.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

fn write_comments(path: &Path, result: &HarvestResult) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(COMMENT_COLUMNS)?;
    for comment in &result.comments {
        writer.serialize(comment)?;
    }
    writer.flush()?;
    Ok(())
}

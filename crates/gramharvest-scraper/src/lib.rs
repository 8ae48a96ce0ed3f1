pub mod client;
pub mod error;
pub mod extract;
pub mod item;
pub mod media;
pub mod normalize;
pub mod pagination;
pub mod pipeline;
pub mod source;
pub mod thread;
pub mod types;
pub mod window;

pub use client::{ClientSettings, InstagramClient, Session};
pub use error::{DownloadError, FieldError, ScraperError};
pub use extract::{extract_post, read_field};
pub use item::{RawComment, RawItem};
pub use media::{HttpMediaDownloader, MediaDownloader, MediaOptions};
pub use normalize::{normalize_post, normalize_posts};
pub use pagination::{paginate, Page};
pub use pipeline::{
    CancelFlag, HarvestOptions, HarvestPhase, HarvestResult, Harvester, QueryOutcome,
};
pub use source::{open_items, ContentSource, FeedQuery, ItemFeed};
pub use thread::{comment_records, flatten_comment};
pub use window::apply_window;

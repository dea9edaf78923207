//! tgcm - channel workspace manager.
//!
//! Keeps a per-channel index of published posts, detects duplicates of
//! candidate posts by link or topic, and validates the markdown content
//! queue against that index.

pub mod channel;
pub mod config;
pub mod error;
pub mod index;
pub mod keywords;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod queue;

pub use channel::ChannelPaths;
pub use config::Config;
pub use error::{Error, Result};
pub use index::{add_post, ingest_posts, load_index, save_index, FetchedPost, IndexDocument, PostRecord};
pub use matcher::{check_links, check_topic, MatchMethod, MatchResult, Matcher};
pub use queue::{validate_channel_queue, Diagnostic, Level, QueueReport};

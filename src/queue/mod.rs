//! Content queue (`content-queue.md`) parsing, validation and
//! reconciliation against the channel index.

mod parser;
mod reconcile;
mod validator;

pub use parser::{parse_queue, QueuePost, TEXT_FIELD};
pub use reconcile::{apply_fixes, check_statuses, Reconciliation, StatusFix, PUBLISHED, UNKNOWN_MSG_ID};
pub use validator::{is_url, starts_with_emoji, validate_format, REQUIRED_FIELDS, VALID_STATUSES};

use crate::channel::ChannelPaths;
use crate::index::{load_index, save_index, sort_posts};
use crate::matcher::Matcher;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
}

/// One finding about a queue post
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub post: u64,
    pub line: usize,
    pub level: Level,
    pub message: String,
}

impl Diagnostic {
    pub fn error(post: u64, line: usize, message: impl Into<String>) -> Self {
        Self { post, line, level: Level::Error, message: message.into() }
    }

    pub fn warning(post: u64, line: usize, message: impl Into<String>) -> Self {
        Self { post, line, level: Level::Warning, message: message.into() }
    }
}

/// Outcome of validating one channel's queue
#[derive(Serialize, Debug, Clone, Default)]
pub struct QueueReport {
    pub posts: usize,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// Status lines rewritten to `published`
    #[serde(skip_serializing_if = "is_zero")]
    pub fixed: usize,
    /// Published posts appended to the index
    #[serde(skip_serializing_if = "is_zero")]
    pub synced: usize,
    /// Post numbers with no findings, ascending
    #[serde(skip)]
    pub ok_posts: Vec<u64>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl QueueReport {
    pub fn exit_code(&self) -> i32 {
        if self.errors.is_empty() { 0 } else { 1 }
    }
}

/// Validate a channel's queue and reconcile it with the index.
///
/// Published posts missing from the index are always appended to it (with
/// `msgId` 0). Status rewrites are applied to the queue only when
/// `fix` is set.
pub fn validate_channel_queue(channel_dir: &Path, fix: bool, matcher: &Matcher) -> Result<QueueReport> {
    let paths = ChannelPaths::new(channel_dir);
    if !paths.queue.is_file() {
        return Err(Error::QueueNotFound(paths.queue));
    }

    let content = fs::read_to_string(&paths.queue)?;
    let posts = parse_queue(&content);
    let (errors, mut warnings) = validate_format(&posts);

    let mut index = load_index(&paths.index);
    let reconciliation = check_statuses(&posts, &index, matcher);
    warnings.extend(reconciliation.warnings);

    let synced = reconciliation.index_additions.len();
    if synced > 0 {
        index.extend(reconciliation.index_additions);
        sort_posts(&mut index);
        save_index(&paths.index, &index)?;
        tracing::info!(synced, "synced published posts to index");
    }

    let mut fixed = 0;
    if fix && !reconciliation.fixes.is_empty() {
        let (updated, changed) = apply_fixes(&content, &reconciliation.fixes);
        if changed > 0 {
            fs::write(&paths.queue, updated)?;
            fixed = changed;
        }
    }

    let flagged: BTreeSet<u64> = errors.iter().chain(warnings.iter()).map(|d| d.post).collect();
    let ok_posts: BTreeSet<u64> = posts.iter()
        .map(|p| p.number)
        .filter(|n| !flagged.contains(n))
        .collect();

    Ok(QueueReport {
        posts: posts.len(),
        errors,
        warnings,
        fixed,
        synced,
        ok_posts: ok_posts.into_iter().collect(),
    })
}

//! The per-channel index of published posts (`content-index.json`).
//!
//! The file is either a bare array of posts or a `{"version", "posts"}`
//! wrapper. Both load into a flat `Vec<PostRecord>`; saving keeps whatever
//! shape the file already had. Loads and saves are not atomic: two
//! processes doing load-modify-save on one channel can lose an update.

use crate::keywords::{extract_keywords, truncate_chars};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Topics derived from fetched post text are cut to this many characters
const FETCHED_TOPIC_LEN: usize = 200;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostRecord {
    #[serde(rename = "msgId")]
    pub msg_id: i64,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl PostRecord {
    pub fn new(msg_id: i64, topic: &str, links: Vec<String>, keywords: Vec<String>) -> Self {
        let keywords = if keywords.is_empty() {
            extract_keywords(topic).into_iter().collect()
        } else {
            keywords
        };
        Self {
            msg_id,
            topic: topic.to_string(),
            links,
            keywords,
        }
    }
}

/// On-disk shape of an index file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexShape {
    Flat,
    Versioned(u64),
}

/// Index file contents. Any object with a `posts` array is a wrapper; its
/// `version` is kept only when it is a non-negative integer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum IndexDocument {
    Flat(Vec<PostRecord>),
    Versioned {
        #[serde(default, deserialize_with = "lenient_version", skip_serializing_if = "Option::is_none")]
        version: Option<u64>,
        posts: Vec<PostRecord>,
    },
}

fn lenient_version<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_u64()))
}

impl IndexDocument {
    pub fn new(shape: IndexShape, posts: Vec<PostRecord>) -> Self {
        match shape {
            IndexShape::Flat => IndexDocument::Flat(posts),
            IndexShape::Versioned(version) => IndexDocument::Versioned { version: Some(version), posts },
        }
    }

    /// Strict read: `Ok(None)` if the file is absent, `Err` if unreadable or malformed.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// A wrapper without an integer `version` saves back flat.
    pub fn shape(&self) -> IndexShape {
        match self {
            IndexDocument::Versioned { version: Some(version), .. } => IndexShape::Versioned(*version),
            _ => IndexShape::Flat,
        }
    }

    pub fn into_posts(self) -> Vec<PostRecord> {
        match self {
            IndexDocument::Flat(posts) => posts,
            IndexDocument::Versioned { posts, .. } => posts,
        }
    }
}

/// Shape of the file currently at `path`.
///
/// Only a readable document with an integer `version` counts as versioned.
/// Missing, unreadable or malformed files all report `Flat`.
pub fn probe_shape(path: &Path) -> IndexShape {
    match IndexDocument::read(path) {
        Ok(Some(doc)) => doc.shape(),
        _ => IndexShape::Flat,
    }
}

/// Load the posts at `path`, treating a missing or corrupt file as empty.
pub fn load_index(path: &Path) -> Vec<PostRecord> {
    match IndexDocument::read(path) {
        Ok(Some(doc)) => doc.into_posts(),
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::warn!("corrupt index {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Write `posts` sorted by id, keeping the file's current shape.
pub fn save_index(path: &Path, posts: &[PostRecord]) -> Result<()> {
    let mut posts = posts.to_vec();
    sort_posts(&mut posts);
    let doc = IndexDocument::new(probe_shape(path), posts);
    fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}

/// Stable sort by `msgId`
pub fn sort_posts(posts: &mut [PostRecord]) {
    posts.sort_by_key(|p| p.msg_id);
}

/// Add one post unless its id is already indexed.
///
/// Returns `false` and leaves the file untouched on a duplicate id, even if
/// the topic differs. Empty `keywords` are derived from the topic.
pub fn add_post(
    path: &Path,
    msg_id: i64,
    topic: &str,
    links: Option<Vec<String>>,
    keywords: Option<Vec<String>>,
) -> Result<bool> {
    let mut posts = load_index(path);
    if posts.iter().any(|p| p.msg_id == msg_id) {
        return Ok(false);
    }

    posts.push(PostRecord::new(
        msg_id,
        topic,
        links.unwrap_or_default(),
        keywords.unwrap_or_default(),
    ));
    save_index(path, &posts)?;
    Ok(true)
}

/// A post as handed over by a channel fetcher
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FetchedPost {
    #[serde(rename = "msgId")]
    pub msg_id: i64,
    pub text: String,
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub added: usize,
    pub skipped: usize,
}

/// Append fetched posts whose ids are not yet indexed.
///
/// Unlike `load_index`, a corrupt index is an error here: silently
/// replacing it with fetched posts would drop everything already stored.
pub fn ingest_posts(path: &Path, fetched: &[FetchedPost], dry_run: bool) -> Result<IngestSummary> {
    let mut posts = IndexDocument::read(path)?
        .map(IndexDocument::into_posts)
        .unwrap_or_default();
    let mut seen: HashSet<i64> = posts.iter().map(|p| p.msg_id).collect();
    let mut summary = IngestSummary::default();

    for post in fetched {
        if !seen.insert(post.msg_id) {
            summary.skipped += 1;
            continue;
        }
        let first_line = post.text.split('\n').next().unwrap_or_default();
        let topic = truncate_chars(first_line, FETCHED_TOPIC_LEN);
        posts.push(PostRecord::new(post.msg_id, &topic, post.links.clone(), Vec::new()));
        summary.added += 1;
    }

    if !dry_run && summary.added > 0 {
        save_index(path, &posts)?;
        tracing::info!(added = summary.added, skipped = summary.skipped, "ingested fetched posts");
    }

    Ok(summary)
}

//! Channel workspace layout: `<workspace>/tgcm/<name>/...`

use crate::index::{IndexDocument, IndexShape};
use crate::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

lazy_static! {
    static ref CHANNEL_NAME_RE: Regex = Regex::new(r"^[a-z0-9][a-z0-9_-]{0,62}$").expect("valid regex");
}

pub const ROOT_DIR: &str = "tgcm";
pub const INDEX_FILE: &str = "content-index.json";
pub const QUEUE_FILE: &str = "content-queue.md";
pub const PERF_LOG_FILE: &str = "content-perf.log";
pub const META_FILE: &str = "channel.json";
pub const CHANNELS_FILE: &str = "channels.json";

/// Files belonging to one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPaths {
    pub dir: PathBuf,
    pub index: PathBuf,
    pub queue: PathBuf,
    pub perf_log: PathBuf,
    pub meta: PathBuf,
}

impl ChannelPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            index: dir.join(INDEX_FILE),
            queue: dir.join(QUEUE_FILE),
            perf_log: dir.join(PERF_LOG_FILE),
            meta: dir.join(META_FILE),
        }
    }

    /// Paths of channel `name` under `workspace`, made absolute
    pub fn for_channel(workspace: &Path, name: &str) -> Self {
        Self::new(&channels_root(workspace).join(name))
    }

    /// Existing channel directory or `ChannelNotFound`
    pub fn existing(workspace: &Path, name: &str) -> Result<Self> {
        let paths = Self::for_channel(workspace, name);
        if !paths.dir.is_dir() {
            return Err(Error::ChannelNotFound(name.to_string()));
        }
        Ok(paths)
    }
}

pub fn channels_root(workspace: &Path) -> PathBuf {
    let workspace = std::path::absolute(workspace).unwrap_or_else(|_| workspace.to_path_buf());
    workspace.join(ROOT_DIR)
}

pub fn validate_channel_name(name: &str) -> Result<()> {
    if CHANNEL_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidChannelName(name.to_string()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChannelMeta {
    pub name: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
    #[serde(rename = "channelId", default)]
    pub channel_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    /// Keys written by other tools, kept as-is on save
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry of `tgcm/channels.json`
#[derive(Serialize, Debug)]
struct ChannelSummary<'a> {
    name: &'a str,
    #[serde(rename = "channelId")]
    channel_id: Option<&'a str>,
    status: &'a str,
    #[serde(rename = "createdAt")]
    created_at: &'a str,
}

fn default_status() -> String {
    "initialized".to_string()
}

impl ChannelMeta {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn utc_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Create a channel with an empty versioned index and an empty queue.
pub fn init_channel(workspace: &Path, name: &str) -> Result<ChannelPaths> {
    validate_channel_name(name)?;

    let paths = ChannelPaths::for_channel(workspace, name);
    if paths.dir.exists() {
        return Err(Error::ChannelExists(name.to_string()));
    }
    fs::create_dir_all(&paths.dir)?;

    let index = IndexDocument::new(IndexShape::Versioned(1), Vec::new());
    fs::write(&paths.index, serde_json::to_string_pretty(&index)?)?;
    fs::write(&paths.queue, "")?;

    ChannelMeta {
        name: name.to_string(),
        created_at: utc_now(),
        channel_id: None,
        status: default_status(),
        extra: serde_json::Map::new(),
    }
    .save(&paths.meta)?;

    sync_channels_index(workspace)?;
    Ok(paths)
}

/// Every channel with a readable `channel.json`, sorted by directory name.
pub fn list_channels(workspace: &Path) -> Vec<ChannelMeta> {
    let root = channels_root(workspace);
    if !root.is_dir() {
        return Vec::new();
    }

    WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter_map(|entry| {
            let meta_path = entry.path().join(META_FILE);
            if !meta_path.is_file() {
                return None;
            }
            match ChannelMeta::load(&meta_path) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", entry.file_name().to_string_lossy(), e);
                    None
                }
            }
        })
        .collect()
}

/// Record the platform channel id for `name`.
pub fn bind_channel(workspace: &Path, name: &str, channel_id: &str) -> Result<ChannelMeta> {
    let paths = ChannelPaths::existing(workspace, name)?;
    let mut meta = ChannelMeta::load(&paths.meta)?;
    if let Some(existing) = &meta.channel_id {
        return Err(Error::AlreadyBound {
            name: name.to_string(),
            channel_id: existing.clone(),
        });
    }

    meta.channel_id = Some(channel_id.to_string());
    meta.status = "connected".to_string();
    meta.save(&paths.meta)?;
    sync_channels_index(workspace)?;
    Ok(meta)
}

/// Rewrite `tgcm/channels.json` from the per-channel metadata.
pub fn sync_channels_index(workspace: &Path) -> Result<()> {
    let root = channels_root(workspace);
    if !root.is_dir() {
        return Ok(());
    }
    let channels = list_channels(workspace);
    let summary: Vec<ChannelSummary> = channels
        .iter()
        .map(|c| ChannelSummary {
            name: &c.name,
            channel_id: c.channel_id.as_deref(),
            status: &c.status,
            created_at: &c.created_at,
        })
        .collect();
    fs::write(root.join(CHANNELS_FILE), serde_json::to_string_pretty(&summary)?)?;
    Ok(())
}

/// Append one timing line to the channel's perf log.
pub fn append_perf_line(paths: &ChannelPaths, message: &str, elapsed_ms: u128) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.perf_log)?;
    writeln!(file, "{} {} {}ms", utc_now(), message, elapsed_ms)?;
    Ok(())
}

/// Steps for rebuilding a channel index from its public history.
pub fn rebuild_instructions(name: &str, channel_id: Option<&str>) -> String {
    let channel_id = channel_id.unwrap_or("<channelId>");
    format!(
        "To rebuild the index for '{name}' (channel {channel_id}):\n\
         \x20 1. Export the channel history as a JSON array of {{\"msgId\", \"text\", \"links\"}} objects.\n\
         \x20 2. Run: tgcm import {name} <export.json>\n\
         \x20 3. Run: tgcm validate {name} to sync published queue posts into the index.\n\
         Existing ids are kept; only new posts are added.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_paths() {
        let paths = ChannelPaths::new(Path::new("/tmp/chan"));
        assert_eq!(paths.index, Path::new("/tmp/chan/content-index.json"));
        assert_eq!(paths.queue, Path::new("/tmp/chan/content-queue.md"));
        assert_eq!(paths.perf_log, Path::new("/tmp/chan/content-perf.log"));

        let relative = ChannelPaths::for_channel(Path::new("."), "news");
        assert!(relative.index.is_absolute());
        assert!(relative.dir.ends_with("tgcm/news"));
    }

    #[test]
    fn test_validate_channel_name() {
        assert!(validate_channel_name("tech-news_2").is_ok());
        assert!(validate_channel_name("a").is_ok());
        assert!(validate_channel_name("-bad").is_err());
        assert!(validate_channel_name("Upper").is_err());
        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_init_creates_files() {
        let ws = tempfile::tempdir().unwrap();
        let paths = init_channel(ws.path(), "news").unwrap();

        let index: serde_json::Value = serde_json::from_str(&fs::read_to_string(&paths.index).unwrap()).unwrap();
        assert_eq!(index, serde_json::json!({"version": 1, "posts": []}));
        assert_eq!(fs::read_to_string(&paths.queue).unwrap(), "");

        let meta = ChannelMeta::load(&paths.meta).unwrap();
        assert_eq!(meta.status, "initialized");
        assert!(meta.channel_id.is_none());
        assert!(meta.created_at.ends_with('Z'));

        assert!(matches!(init_channel(ws.path(), "news"), Err(Error::ChannelExists(_))));
        assert!(matches!(init_channel(ws.path(), "Bad Name"), Err(Error::InvalidChannelName(_))));
    }

    #[test]
    fn test_list_and_bind() {
        let ws = tempfile::tempdir().unwrap();
        assert!(list_channels(ws.path()).is_empty());

        init_channel(ws.path(), "zeta").unwrap();
        init_channel(ws.path(), "alpha").unwrap();
        fs::create_dir_all(channels_root(ws.path()).join("stray")).unwrap();

        let names: Vec<String> = list_channels(ws.path()).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        let meta = bind_channel(ws.path(), "alpha", "-100999").unwrap();
        assert_eq!(meta.status, "connected");
        assert!(matches!(bind_channel(ws.path(), "alpha", "-1"), Err(Error::AlreadyBound { .. })));
        assert!(matches!(bind_channel(ws.path(), "missing", "-1"), Err(Error::ChannelNotFound(_))));

        let summary: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(channels_root(ws.path()).join(CHANNELS_FILE)).unwrap(),
        ).unwrap();
        assert_eq!(summary[0]["channelId"], "-100999");
        assert_eq!(summary[1]["channelId"], serde_json::Value::Null);
    }

    #[test]
    fn test_bind_keeps_unknown_meta_keys() {
        let ws = tempfile::tempdir().unwrap();
        let paths = init_channel(ws.path(), "news").unwrap();

        let mut raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&paths.meta).unwrap()).unwrap();
        raw["title"] = serde_json::json!("Daily News");
        fs::write(&paths.meta, serde_json::to_string_pretty(&raw).unwrap()).unwrap();

        bind_channel(ws.path(), "news", "-1001234567890").unwrap();

        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&paths.meta).unwrap()).unwrap();
        assert_eq!(saved["title"], "Daily News");
        assert_eq!(saved["channelId"], "-1001234567890");

        let summary: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(channels_root(ws.path()).join(CHANNELS_FILE)).unwrap(),
        ).unwrap();
        assert!(summary[0].get("title").is_none());
        assert_eq!(summary[0].as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_perf_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ChannelPaths::new(dir.path());
        append_perf_line(&paths, "check links=1", 12).unwrap();
        append_perf_line(&paths, "check links=0", 3).unwrap();

        let log = fs::read_to_string(&paths.perf_log).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.lines().next().unwrap().ends_with("check links=1 12ms"));
    }

    #[test]
    fn test_rebuild_instructions() {
        assert!(rebuild_instructions("news", None).contains("<channelId>"));
        assert!(rebuild_instructions("news", Some("-100123")).contains("-100123"));
    }
}

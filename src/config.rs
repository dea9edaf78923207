use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings read from `.tgcm.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub matching: MatchConfig,
    pub perf: PerfConfig,
}

/// Thresholds for the topic check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum overlap ratio, inclusive
    pub min_score: f64,
    /// Minimum number of shared tokens; single-word overlaps never match
    pub min_overlap: usize,
    /// Length of the prefix used as a crude stem
    pub stem_len: usize,
    /// Stored topics are cut to this many characters in results
    pub topic_display_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_score: 0.4,
            min_overlap: 2,
            stem_len: 5,
            topic_display_len: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerfConfig {
    pub enabled: bool,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load config from `path`. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

use crate::config::MatchConfig;
use crate::index::PostRecord;
use crate::keywords::{extract_keywords, is_stopword, stem, stems, truncate_chars};
use crate::normalize::normalize_url;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Appended to overlap words that matched only through their stem
pub const STEM_MARKER: char = '*';

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Link,
    Topic,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::Link => write!(f, "link"),
            MatchMethod::Topic => write!(f, "topic"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MatchResult {
    #[serde(rename = "msgId")]
    pub msg_id: i64,
    pub topic: String,
    pub score: f64,
    pub method: MatchMethod,
    /// Stored index link that matched (link method only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub link: Option<String>,
    /// Shared tokens (topic method only); stem-only matches end in `*`
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub overlap: Vec<String>,
}

/// Duplicate detection against a channel's index.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Every index post holding a link equal (after normalization) to a candidate.
    ///
    /// Hits are concatenated per candidate in index order; a post matched by
    /// two candidates shows up twice.
    pub fn check_links(&self, candidates: &[String], index: &[PostRecord]) -> Vec<MatchResult> {
        let mut matches = Vec::new();

        for candidate in candidates {
            let wanted = normalize_url(candidate);
            for post in index {
                if let Some(link) = post.links.iter().find(|l| normalize_url(l) == wanted) {
                    matches.push(MatchResult {
                        msg_id: post.msg_id,
                        topic: truncate_chars(&post.topic, self.config.topic_display_len),
                        score: 1.0,
                        method: MatchMethod::Link,
                        link: Some(link.clone()),
                        overlap: Vec::new(),
                    });
                }
            }
        }

        matches
    }

    /// Index posts whose keywords overlap the candidate topic, best first.
    pub fn check_topic(&self, topic: &str, index: &[PostRecord]) -> Vec<MatchResult> {
        let topic_words = extract_keywords(topic);
        if topic_words.is_empty() {
            return Vec::new();
        }
        let topic_stems = stems(&topic_words, self.config.stem_len);

        let mut matches = Vec::new();

        for post in index {
            let post_words: BTreeSet<String> = post.keywords.iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !is_stopword(k))
                .collect();
            if post_words.is_empty() {
                continue;
            }

            let exact: BTreeSet<&String> = topic_words.intersection(&post_words).collect();
            let post_stems = stems(&post_words, self.config.stem_len);
            let stem_overlap: HashSet<&String> = topic_stems.intersection(&post_stems).collect();

            let best_overlap = exact.len().max(stem_overlap.len());
            let score = best_overlap as f64 / topic_words.len().min(post_words.len()) as f64;

            if score < self.config.min_score || best_overlap < self.config.min_overlap {
                continue;
            }

            let mut overlap: Vec<String> = exact.iter().map(|w| w.to_string()).collect();
            for word in &topic_words {
                if exact.contains(word) {
                    continue;
                }
                let stem_hit = stem(word, self.config.stem_len)
                    .is_some_and(|s| stem_overlap.contains(&s));
                if stem_hit {
                    overlap.push(format!("{}{}", word, STEM_MARKER));
                }
            }

            matches.push(MatchResult {
                msg_id: post.msg_id,
                topic: truncate_chars(&post.topic, self.config.topic_display_len),
                score,
                method: MatchMethod::Topic,
                link: None,
                overlap,
            });
        }

        // Stable: ties keep index order
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        tracing::debug!(topic_words = topic_words.len(), matches = matches.len(), "topic check");
        matches
    }

    /// Single best match for a queue post.
    ///
    /// A link hit on `source` wins outright; otherwise the top topic hit.
    pub fn best_match(&self, source: &str, topic: &str, index: &[PostRecord]) -> Option<MatchResult> {
        if !source.is_empty() {
            let by_link = self.check_links(&[source.to_string()], index);
            if let Some(hit) = by_link.into_iter().next() {
                return Some(hit);
            }
        }
        if topic.is_empty() {
            return None;
        }
        self.check_topic(topic, index).into_iter().next()
    }
}

/// `Matcher::check_links` with default thresholds
pub fn check_links(candidates: &[String], index: &[PostRecord]) -> Vec<MatchResult> {
    Matcher::default().check_links(candidates, index)
}

/// `Matcher::check_topic` with default thresholds
pub fn check_topic(topic: &str, index: &[PostRecord]) -> Vec<MatchResult> {
    Matcher::default().check_topic(topic, index)
}

use super::parser::QueuePost;
use super::Diagnostic;
use crate::index::PostRecord;
use crate::keywords::extract_keywords;
use crate::matcher::Matcher;
use std::collections::BTreeMap;

pub const PUBLISHED: &str = "published";

/// Id given to index additions synced from the queue; the real message id
/// is not recoverable from the queue document.
pub const UNKNOWN_MSG_ID: i64 = 0;

/// Proposed rewrite of one post's `Status` to `published`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFix {
    pub post: u64,
    /// Line holding the `Status` field (header line when the field is missing)
    pub line: usize,
    pub old_status: String,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub warnings: Vec<Diagnostic>,
    pub fixes: Vec<StatusFix>,
    pub index_additions: Vec<PostRecord>,
}

/// Cross-check declared statuses against the index.
pub fn check_statuses(posts: &[QueuePost], index: &[PostRecord], matcher: &Matcher) -> Reconciliation {
    let mut out = Reconciliation::default();

    for post in posts {
        let status = post.field("Status");
        let topic = post.field("Topic");
        let source = post.field("Source");
        let found = matcher.best_match(source, topic, index);

        match (found, status == PUBLISHED) {
            (Some(m), false) => {
                out.warnings.push(Diagnostic::warning(
                    post.number,
                    post.line,
                    format!(
                        "found in index (msg {}, score {}, {}) but Status is \"{}\"",
                        m.msg_id, format_score(m.score), m.method, status
                    ),
                ));
                out.fixes.push(StatusFix {
                    post: post.number,
                    line: post.field_line("Status"),
                    old_status: status.to_string(),
                });
            }
            (None, true) => {
                let links = if source.is_empty() { Vec::new() } else { vec![source.to_string()] };
                out.index_additions.push(PostRecord {
                    msg_id: UNKNOWN_MSG_ID,
                    topic: topic.to_string(),
                    links,
                    keywords: extract_keywords(topic).into_iter().collect(),
                });
            }
            (Some(_), true) => {
                out.warnings.push(Diagnostic::warning(
                    post.number,
                    post.line,
                    "published post should be removed from queue",
                ));
            }
            (None, false) => {}
        }
    }

    out
}

/// Score rounded to two places, shortest form: `1.0`, `0.5`, `0.67`
fn format_score(score: f64) -> String {
    let rounded = (score * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

/// Rewrite `Status` lines named by `fixes`. Returns the new document and
/// how many lines changed; every other byte is left as it was.
pub fn apply_fixes(content: &str, fixes: &[StatusFix]) -> (String, usize) {
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();

    let by_line: BTreeMap<usize, &str> = fixes.iter()
        .filter(|f| !f.old_status.is_empty())
        .map(|f| (f.line, f.old_status.as_str()))
        .collect();

    let mut changed = 0;
    for (lineno, old_status) in by_line {
        let Some(line) = lineno.checked_sub(1).and_then(|idx| lines.get_mut(idx)) else {
            continue;
        };
        let from = format!("**Status:** {}", old_status);
        let to = format!("**Status:** {}", PUBLISHED);
        let updated = line.replace(&from, &to);
        if updated != *line {
            *line = updated;
            changed += 1;
        }
    }

    (lines.join("\n"), changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{parse_queue, Level};

    fn index() -> Vec<PostRecord> {
        vec![PostRecord {
            msg_id: 101,
            topic: "Python asyncio tutorial for beginners".to_string(),
            links: vec!["https://example.com/asyncio-guide".to_string()],
            keywords: ["python", "asyncio", "tutorial", "beginners"].iter().map(|s| s.to_string()).collect(),
        }]
    }

    fn queue(status: &str, topic: &str, source: &str) -> String {
        format!(
            "### 1\n- **Status:** {status}\n- **Rubric:** 👗 Мода\n- **Topic:** {topic}\n- **Source:** {source}\n- **Text:**\n\nТекст.\n"
        )
    }

    #[test]
    fn test_draft_found_by_link() {
        let content = queue("draft", "Something unrelated", "https://example.com/asyncio-guide");
        let result = check_statuses(&parse_queue(&content), &index(), &Matcher::default());

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].level, Level::Warning);
        assert_eq!(result.warnings[0].message, "found in index (msg 101, score 1.0, link) but Status is \"draft\"");
        assert_eq!(result.fixes, vec![StatusFix { post: 1, line: 2, old_status: "draft".into() }]);
        assert!(result.index_additions.is_empty());
    }

    #[test]
    fn test_pending_found_by_topic() {
        let content = queue("pending", "Python asyncio tutorial deep dive", "https://other.org/x");
        let result = check_statuses(&parse_queue(&content), &index(), &Matcher::default());

        assert_eq!(result.fixes.len(), 1);
        assert!(result.warnings[0].message.contains("topic"));
    }

    #[test]
    fn test_score_format() {
        assert_eq!(format_score(1.0), "1.0");
        assert_eq!(format_score(0.5), "0.5");
        assert_eq!(format_score(0.75), "0.75");
        assert_eq!(format_score(2.0 / 3.0), "0.67");
    }

    #[test]
    fn test_published_missing_from_index_is_synced() {
        let content = queue("published", "ChatGPT как стилист: капсульный гардероб", "https://example.com/article1");
        let result = check_statuses(&parse_queue(&content), &[], &Matcher::default());

        assert!(result.warnings.is_empty());
        assert!(result.fixes.is_empty());
        assert_eq!(result.index_additions.len(), 1);
        let added = &result.index_additions[0];
        assert_eq!(added.msg_id, 0);
        assert_eq!(added.topic, "ChatGPT как стилист: капсульный гардероб");
        assert_eq!(added.links, vec!["https://example.com/article1"]);
        assert!(added.keywords.contains(&"chatgpt".to_string()));
        assert!(added.keywords.contains(&"стилист".to_string()));
    }

    #[test]
    fn test_published_without_source_syncs_empty_links() {
        let content = "### 4\n- **Status:** published\n- **Topic:** Rust ownership explained\n- **Text:**\nbody\n";
        let result = check_statuses(&parse_queue(content), &[], &Matcher::default());
        assert!(result.index_additions[0].links.is_empty());
    }

    #[test]
    fn test_published_and_indexed_should_be_removed() {
        let content = queue("published", "x", "https://www.example.com/asyncio-guide/");
        let result = check_statuses(&parse_queue(&content), &index(), &Matcher::default());

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].message, "published post should be removed from queue");
        assert!(result.fixes.is_empty());
        assert!(result.index_additions.is_empty());
    }

    #[test]
    fn test_draft_not_indexed_is_quiet() {
        let content = queue("draft", "Cooking pasta at home", "https://food.example/pasta");
        let result = check_statuses(&parse_queue(&content), &index(), &Matcher::default());
        assert!(result.warnings.is_empty());
        assert!(result.fixes.is_empty());
        assert!(result.index_additions.is_empty());
    }

    #[test]
    fn test_apply_fixes_touches_only_status_line() {
        let content = "intro **Status:** draft\r\n### 1\r\n- **Status:** draft\r\n- **Topic:** keep  spacing \r\n";
        let fixes = vec![StatusFix { post: 1, line: 3, old_status: "draft".into() }];

        let (updated, changed) = apply_fixes(content, &fixes);
        assert_eq!(changed, 1);
        assert_eq!(updated, "intro **Status:** draft\r\n### 1\r\n- **Status:** published\r\n- **Topic:** keep  spacing \r\n");
    }

    #[test]
    fn test_apply_fixes_skips_stale_and_empty() {
        let content = "### 1\n- **Status:** pending\n";
        let fixes = vec![
            StatusFix { post: 1, line: 2, old_status: "draft".into() },
            StatusFix { post: 1, line: 1, old_status: String::new() },
            StatusFix { post: 1, line: 99, old_status: "draft".into() },
        ];
        let (updated, changed) = apply_fixes(content, &fixes);
        assert_eq!(changed, 0);
        assert_eq!(updated, content);
    }
}

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

lazy_static! {
    // Runs of letters: word characters minus digits and underscore, 4+ long
    static ref WORD_RE: Regex = Regex::new(r"[\w--[\d_]]{4,}").expect("valid regex");

    static ref STOPWORDS: HashSet<&'static str> = [
        "this", "that", "with", "from", "have", "been", "will", "what", "when",
        "which", "their", "about", "would", "could", "should", "more", "some",
        "into", "than", "other", "these", "those", "just", "also", "only",
        "agent", "agents",
    ].into_iter().collect();
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Significant lowercase tokens of `text`.
///
/// Tokens are maximal runs of letters (any script) at least four characters
/// long; purely numeric runs never qualify. Stopwords are removed. The
/// result is ordered so that anything persisted from it is deterministic.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    WORD_RE.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| !is_stopword(w))
        .map(str::to_string)
        .collect()
}

/// First `len` characters of `word`, or `None` when the word is shorter.
pub fn stem(word: &str, len: usize) -> Option<String> {
    if word.chars().count() < len {
        return None;
    }
    Some(word.chars().take(len).collect())
}

/// Stems of every word long enough to have one
pub fn stems<'a, I>(words: I, len: usize) -> HashSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    words.into_iter().filter_map(|w| stem(w, len)).collect()
}

/// Cut `text` to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords() {
        let keywords = extract_keywords("Python ASYNCIO Tutorial for beginners");

        assert!(keywords.contains("python"));
        assert!(keywords.contains("asyncio"));
        assert!(keywords.contains("tutorial"));
        assert!(keywords.contains("beginners"));
        // "for" is too short
        assert_eq!(keywords.len(), 4);
    }

    #[test]
    fn test_stopwords_removed() {
        assert!(extract_keywords("this that with from have been").is_empty());
        let keywords = extract_keywords("agent agents platform");
        assert_eq!(keywords.into_iter().collect::<Vec<_>>(), vec!["platform"]);
    }

    #[test]
    fn test_short_and_numeric_tokens_dropped() {
        assert!(extract_keywords("go is at on to").is_empty());

        let keywords = extract_keywords("2024 release 12345 python3");
        assert!(!keywords.contains("2024"));
        assert!(!keywords.contains("12345"));
        assert!(keywords.contains("release"));
        // digits end the run
        assert!(keywords.contains("python"));
    }

    #[test]
    fn test_non_latin_scripts() {
        let keywords = extract_keywords("Питон асинхронность обзор");
        assert!(keywords.contains("питон"));
        assert!(keywords.contains("асинхронность"));
        assert!(keywords.contains("обзор"));

        let cjk = extract_keywords("测试主题内容 其他内容文本");
        assert!(cjk.contains("测试主题内容"));
        assert!(cjk.contains("其他内容文本"));
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("deployment", 5).as_deref(), Some("deplo"));
        assert_eq!(stem("deploying", 5).as_deref(), Some("deplo"));
        assert_eq!(stem("code", 5), None);
        // counted in characters, not bytes
        assert_eq!(stem("асинхронность", 5).as_deref(), Some("асинх"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("обзор", 2), "об");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}

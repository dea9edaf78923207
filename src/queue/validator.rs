use super::parser::QueuePost;
use super::Diagnostic;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r"^https?://.+").expect("valid regex");
}

pub const VALID_STATUSES: [&str; 3] = ["draft", "pending", "published"];
pub const REQUIRED_FIELDS: [&str; 4] = ["Status", "Rubric", "Topic", "Source"];

/// Emoji heuristic: Unicode "Symbol, other" plus the usual emoji blocks
fn is_emoji(ch: char) -> bool {
    lazy_static! {
        static ref SYMBOL_RE: Regex = Regex::new(r"^\p{So}$").expect("valid regex");
    }
    let mut buf = [0u8; 4];
    if SYMBOL_RE.is_match(ch.encode_utf8(&mut buf)) {
        return true;
    }
    matches!(ch as u32,
        0x1F600..=0x1F64F   // emoticons
        | 0x1F300..=0x1F5FF // pictographs
        | 0x1F680..=0x1F6FF // transport and map
        | 0x1F900..=0x1F9FF // supplemental symbols
        | 0x2600..=0x26FF   // misc symbols
        | 0x2700..=0x27BF   // dingbats
        | 0xFE00..=0xFE0F   // variation selectors
        | 0x200D            // zero-width joiner
    )
}

pub fn starts_with_emoji(text: &str) -> bool {
    text.chars().next().is_some_and(is_emoji)
}

pub fn is_url(value: &str) -> bool {
    URL_RE.is_match(value)
}

/// Structural checks over parsed posts. Returns `(errors, warnings)`.
pub fn validate_format(posts: &[QueuePost]) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut seen: HashMap<u64, usize> = HashMap::new();

    for post in posts {
        let n = post.number;

        if let Some(first) = seen.get(&n) {
            errors.push(Diagnostic::error(n, post.line, format!("duplicate post number (first at line {})", first)));
        } else {
            seen.insert(n, post.line);
        }

        for field in REQUIRED_FIELDS {
            if !post.has_field(field) {
                errors.push(Diagnostic::error(n, post.line, format!("missing field {}", field)));
            }
        }

        let status = post.field("Status");
        if !status.is_empty() && !VALID_STATUSES.contains(&status) {
            errors.push(Diagnostic::error(
                n,
                post.field_line("Status"),
                format!("invalid Status \"{}\" (expected: {})", status, VALID_STATUSES.join(", ")),
            ));
        }

        let rubric = post.field("Rubric");
        if !rubric.is_empty() && !starts_with_emoji(rubric) {
            errors.push(Diagnostic::error(n, post.field_line("Rubric"), "Rubric must start with an emoji"));
        }

        if post.has_field("Topic") && post.field("Topic").is_empty() {
            errors.push(Diagnostic::error(n, post.field_line("Topic"), "Topic is empty"));
        }

        let source = post.field("Source");
        if !source.is_empty() && !is_url(source) {
            errors.push(Diagnostic::error(n, post.field_line("Source"), format!("invalid Source URL: {}", source)));
        }

        let image = post.field("Image");
        if !image.is_empty() && !is_url(image) {
            warnings.push(Diagnostic::warning(n, post.field_line("Image"), format!("invalid Image URL: {}", image)));
        }

        if post.text.trim().is_empty() {
            errors.push(Diagnostic::error(n, post.line, "empty post text"));
        }
    }

    (errors, warnings)
}

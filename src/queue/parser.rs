use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref POST_HEADER_RE: Regex = Regex::new(r"^### ([0-9]+)\s*$").expect("valid regex");
    static ref FIELD_RE: Regex = Regex::new(r"^- \*\*(\w+):\*\*\s*(.*)").expect("valid regex");
}

/// Field whose line switches the parser into raw body mode
pub const TEXT_FIELD: &str = "Text";

/// One `### N` section of the content queue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueuePost {
    pub number: u64,
    /// 1-based line of the `### N` header
    pub line: usize,
    pub fields: HashMap<String, String>,
    pub field_lines: HashMap<String, usize>,
    /// Body after `- **Text:**`, trailing newlines trimmed
    pub text: String,
}

impl QueuePost {
    fn new(number: u64, line: usize) -> Self {
        Self {
            number,
            line,
            ..Self::default()
        }
    }

    /// Field value, empty when absent
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Line of `name`, falling back to the header line
    pub fn field_line(&self, name: &str) -> usize {
        self.field_lines.get(name).copied().unwrap_or(self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the first header
    Outside,
    /// Inside a section, reading field lines
    Fields,
    /// After `- **Text:**`; only a `### N` header leaves this state
    Body,
}

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Header(u64),
    Field(&'a str, &'a str),
    Other,
}

fn classify(raw: &str) -> Line<'_> {
    if let Some(caps) = POST_HEADER_RE.captures(raw) {
        if let Ok(number) = caps[1].parse() {
            return Line::Header(number);
        }
    }
    if let Some(caps) = FIELD_RE.captures(raw) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        return Line::Field(name, value);
    }
    Line::Other
}

/// Parse a content queue document into its posts.
///
/// Lines before the first header are ignored. Inside a body, sub-headings
/// and field-looking lines are kept verbatim; only `### <digits>` starts
/// the next post.
pub fn parse_queue(content: &str) -> Vec<QueuePost> {
    let mut posts: Vec<QueuePost> = Vec::new();
    let mut state = State::Outside;

    for (i, raw) in content.split('\n').enumerate() {
        let lineno = i + 1;
        let kind = classify(raw);

        state = match (state, kind) {
            (_, Line::Header(number)) => {
                posts.push(QueuePost::new(number, lineno));
                State::Fields
            }
            (State::Outside, _) => State::Outside,
            (State::Body, _) => {
                if let Some(post) = posts.last_mut() {
                    post.text.push_str(raw);
                    post.text.push('\n');
                }
                State::Body
            }
            (State::Fields, Line::Field(name, value)) => {
                if let Some(post) = posts.last_mut() {
                    post.fields.insert(name.to_string(), value.trim().to_string());
                    post.field_lines.insert(name.to_string(), lineno);
                }
                if name == TEXT_FIELD {
                    State::Body
                } else {
                    State::Fields
                }
            }
            (State::Fields, Line::Other) => State::Fields,
        };
    }

    for post in &mut posts {
        let trimmed = post.text.trim_end_matches('\n').len();
        post.text.truncate(trimmed);
    }

    posts
}

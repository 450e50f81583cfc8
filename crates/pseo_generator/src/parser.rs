//! Recovers a [`GeneratedArticle`] from raw model output.
//!
//! Model responses are supposed to be one JSON object but routinely arrive
//! wrapped in code fences, followed by commentary, or with literal newlines
//! inside string values. Recovery is an ordered chain of stages; each stage
//! runs only when the previous one failed, and whatever stage succeeds the
//! result still has to pass the quality gates in [`validate`].

use lazy_static::lazy_static;
use pseo_core::GeneratedArticle;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Articles shorter than this many characters are rejected.
pub const MIN_CONTENT_CHARS: usize = 800;

/// Size of the window at the end of the content checked for a sentence end.
const TAIL_CHARS: usize = 100;

/// Tails this short (after trimming) are not judged by the truncation check.
const MIN_TAIL_CHARS: usize = 20;

lazy_static! {
    static ref LEADING_FENCE: Regex = Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").unwrap();
    static ref TRAILING_FENCE: Regex = Regex::new(r"\r?\n?```[ \t]*$").unwrap();
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?]$").unwrap();
    static ref KEYWORDS_ARRAY: Regex = Regex::new(r#"(?s)"keywords"\s*:\s*\[(.*?)\]"#).unwrap();
    static ref QUOTED_STRING: Regex = Regex::new(r#"(?s)"((?:[^"\\]|\\.)*)""#).unwrap();
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing or malformed field `{0}`")]
    MissingField(&'static str),
}

pub type Stage = fn(&str) -> Result<GeneratedArticle, ParseError>;

/// Recovery stages in the order they are attempted.
pub const STAGES: &[(&str, Stage)] = &[
    ("direct", parse_direct),
    ("control-character repair", parse_repaired),
    ("field extraction", extract_fields),
];

/// Parse a raw model response. Returns `None` when no stage recovers all
/// required fields or when the recovered article fails the quality gates.
pub fn parse(raw: &str) -> Option<GeneratedArticle> {
    let json = strip_wrapping(raw);

    for (name, stage) in STAGES {
        match stage(&json) {
            Ok(article) => {
                debug!("Parser stage '{}' recovered an article", name);
                return match validate(article) {
                    Ok(article) => Some(article),
                    Err(reason) => {
                        debug!("Rejected article from stage '{}': {}", name, reason);
                        None
                    }
                };
            }
            Err(e) => debug!("Parser stage '{}' failed: {}", name, e),
        }
    }

    None
}

/// Remove code fences and keep only the span from the first `{` to the last `}`.
pub fn strip_wrapping(raw: &str) -> String {
    let trimmed = raw.trim();
    let unfenced = LEADING_FENCE.replace(trimmed, "");
    let unfenced = TRAILING_FENCE.replace(&unfenced, "");

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => unfenced[start..=end].to_string(),
        _ => unfenced.trim().to_string(),
    }
}

pub fn parse_direct(json: &str) -> Result<GeneratedArticle, ParseError> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_repaired(json: &str) -> Result<GeneratedArticle, ParseError> {
    parse_direct(&repair_control_characters(json))
}

/// Escape raw newlines, carriage returns and tabs inside JSON string values
/// and drop any other raw control character found there. Text outside string
/// values is passed through untouched.
pub fn repair_control_characters(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if escaped {
            escaped = false;
            match c {
                // backslash followed by a raw line break
                '\n' => out.push('n'),
                '\r' => out.push('r'),
                '\t' => out.push('t'),
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '\\' if in_string => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = !in_string;
                out.push(c);
            }
            '\n' if in_string => out.push_str("\\n"),
            '\r' if in_string => out.push_str("\\r"),
            '\t' if in_string => out.push_str("\\t"),
            c if in_string && (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }

    out
}

/// Last resort: pull each field out independently with an escape-aware
/// quoted-string pattern. Tolerates a broken document as long as the four
/// required string fields are individually well formed.
pub fn extract_fields(json: &str) -> Result<GeneratedArticle, ParseError> {
    let keywords = KEYWORDS_ARRAY
        .captures(json)
        .and_then(|caps| caps.get(1))
        .map(|inner| {
            QUOTED_STRING
                .captures_iter(inner.as_str())
                .filter_map(|caps| caps.get(1))
                .map(|m| unescape(m.as_str()))
                .collect()
        })
        .unwrap_or_default();

    Ok(GeneratedArticle {
        title: string_field(json, "title").ok_or(ParseError::MissingField("title"))?,
        content: string_field(json, "content").ok_or(ParseError::MissingField("content"))?,
        excerpt: string_field(json, "excerpt").ok_or(ParseError::MissingField("excerpt"))?,
        keywords,
        meta_description: string_field(json, "metaDescription")
            .ok_or(ParseError::MissingField("metaDescription"))?,
    })
}

fn string_field(json: &str, name: &str) -> Option<String> {
    let pattern = format!(r#"(?s)"{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    re.captures(json)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
}

/// Undo the JSON escapes a model is likely to emit.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Quality gates applied whichever stage produced the article.
pub fn validate(article: GeneratedArticle) -> Result<GeneratedArticle, String> {
    if article.title.trim().is_empty() {
        return Err("empty title".to_string());
    }

    let length = article.content.chars().count();
    if length < MIN_CONTENT_CHARS {
        return Err(format!(
            "content too short ({} < {} characters)",
            length, MIN_CONTENT_CHARS
        ));
    }

    if looks_truncated(&article.content) {
        return Err("content does not end with a complete sentence".to_string());
    }

    Ok(article)
}

/// True when the end of `content` looks cut off mid-sentence.
pub fn looks_truncated(content: &str) -> bool {
    let count = content.chars().count();
    let tail: String = content.chars().skip(count.saturating_sub(TAIL_CHARS)).collect();
    let tail = tail.trim();

    tail.chars().count() > MIN_TAIL_CHARS && !SENTENCE_END.is_match(tail)
}

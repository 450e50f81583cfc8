//! Paragraph-scoped internal link injection for markdown article bodies.

use lazy_static::lazy_static;
use pseo_core::LinkCandidate;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n\s*\n").unwrap();
}

/// Left-to-right scan of markdown link structure.
///
/// `[` opens link text and `]` closes it only when one is open. A `(` starts a
/// link target only directly after the closing `]`, and the target ends at its
/// matching `)`. Stray brackets and parentheses in prose change nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkScan {
    bracket_depth: usize,
    paren_depth: usize,
    after_close_bracket: bool,
}

impl LinkScan {
    pub fn over(text: &str) -> Self {
        let mut scan = Self::default();
        for c in text.chars() {
            scan.step(c);
        }
        scan
    }

    fn step(&mut self, c: char) {
        let after_close_bracket = std::mem::take(&mut self.after_close_bracket);

        if self.paren_depth > 0 {
            match c {
                '(' => self.paren_depth += 1,
                ')' => self.paren_depth -= 1,
                _ => {}
            }
            return;
        }

        match c {
            '[' => self.bracket_depth += 1,
            ']' if self.bracket_depth > 0 => {
                self.bracket_depth -= 1;
                self.after_close_bracket = self.bracket_depth == 0;
            }
            '(' if after_close_bracket => self.paren_depth = 1,
            _ => {}
        }
    }

    pub fn inside_bracket(&self) -> bool {
        self.bracket_depth > 0
    }

    pub fn inside_paren(&self) -> bool {
        self.paren_depth > 0
    }

    pub fn inside_link(&self) -> bool {
        self.inside_bracket() || self.inside_paren()
    }
}

/// Add at most one markdown link per candidate per paragraph. Only the first
/// occurrence of a candidate is considered; if it sits inside an existing
/// link, or the paragraph already links that text anywhere, it is left alone.
/// Running this twice yields the same text.
pub fn inject(content: &str, candidates: &[LinkCandidate]) -> String {
    let mut out = String::with_capacity(content.len() + candidates.len() * 32);
    let mut last = 0;

    for separator in PARAGRAPH_BREAK.find_iter(content) {
        out.push_str(&inject_paragraph(&content[last..separator.start()], candidates));
        out.push_str(separator.as_str());
        last = separator.end();
    }
    out.push_str(&inject_paragraph(&content[last..], candidates));

    out
}

fn inject_paragraph(paragraph: &str, candidates: &[LinkCandidate]) -> String {
    let mut text = paragraph.to_string();
    let mut linked_concepts: HashSet<String> = HashSet::new();

    for candidate in candidates {
        let concept = candidate.text.trim().to_lowercase();
        if concept.is_empty() || linked_concepts.contains(&concept) {
            continue;
        }

        // already linked in this paragraph, to this url or any other
        let existing = format!("[{}](", candidate.text.trim()).to_lowercase();
        if text.to_lowercase().contains(&existing) {
            continue;
        }

        let Some(pattern) = candidate_pattern(&candidate.text) else {
            continue;
        };
        let Some(found) = pattern.find(&text) else {
            continue;
        };

        if LinkScan::over(&text[..found.start()]).inside_link() {
            continue;
        }

        let range = found.range();
        let link = format!("[{}]({})", found.as_str(), candidate.url);
        text.replace_range(range, &link);
        linked_concepts.insert(concept);
    }

    text
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive match for `text`, with word boundaries asserted on the
/// sides where `text` starts or ends with a word character.
fn candidate_pattern(text: &str) -> Option<Regex> {
    let text = text.trim();
    let leading = if text.chars().next().is_some_and(is_word_char) { r"\b" } else { "" };
    let trailing = if text.chars().last().is_some_and(is_word_char) { r"\b" } else { "" };

    Regex::new(&format!("(?i){}{}{}", leading, regex::escape(text), trailing)).ok()
}

//! Standard text canonicalization.
//!
//! Rules run in a fixed order and each is a pure `&str -> String` transform.
//! Only rules whose output differs from their input are reported. Running the
//! canonicalizer on its own output changes nothing.

use obligo_types::change_fingerprint;
use regex::Regex;
use tracing::trace;

use crate::collaborators::{CanonicalText, Canonicalizer};
use crate::error::{PipelineError, Result};

/// Rule names in application order.
pub const STANDARD_RULES: [&str; 6] = [
    "normalize_newlines",
    "collapse_inline_whitespace",
    "strip_page_numbers",
    "trim_lines",
    "collapse_blank_lines",
    "trim_document",
];

// `[^\S\n]` is whitespace other than a newline.
const PAGE_MARKER: &str = r"(?mi)^[^\S\n]*(?:page[^\S\n]+\d+(?:[^\S\n]+of[^\S\n]+\d+)?|-[^\S\n]*\d+[^\S\n]*-|\d{1,4})[^\S\n]*$\n?";
const INLINE_WHITESPACE: &str = r"[^\S\n]+";
const BLANK_LINES: &str = r"\n{3,}";

#[derive(Debug, Clone)]
pub struct StandardCanonicalizer {
    page_marker: Regex,
    inline_whitespace: Regex,
    blank_lines: Regex,
}

impl StandardCanonicalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            page_marker: compile("strip_page_numbers", PAGE_MARKER)?,
            inline_whitespace: compile("collapse_inline_whitespace", INLINE_WHITESPACE)?,
            blank_lines: compile("collapse_blank_lines", BLANK_LINES)?,
        })
    }

    fn apply(&self, rule: &str, text: &str) -> String {
        match rule {
            "normalize_newlines" => text.replace("\r\n", "\n").replace('\r', "\n"),
            "collapse_inline_whitespace" => self.inline_whitespace.replace_all(text, " ").into_owned(),
            "strip_page_numbers" => self.page_marker.replace_all(text, "").into_owned(),
            "trim_lines" => text.split('\n').map(str::trim).collect::<Vec<_>>().join("\n"),
            "collapse_blank_lines" => self.blank_lines.replace_all(text, "\n\n").into_owned(),
            "trim_document" => text.trim().to_string(),
            _ => text.to_string(),
        }
    }
}

impl Canonicalizer for StandardCanonicalizer {
    fn canonicalize(&self, raw: &str) -> CanonicalText {
        let mut text = raw.to_string();
        let mut applied_rules = Vec::new();

        for rule in STANDARD_RULES {
            let next = self.apply(rule, &text);
            if next != text {
                trace!(rule, before = text.len(), after = next.len(), "canonical rule applied");
                applied_rules.push(rule.to_string());
                text = next;
            }
        }

        let hash = change_fingerprint(&text);
        CanonicalText {
            text,
            applied_rules,
            hash,
        }
    }
}

/// Leaves text untouched; for callers whose input is already canonical.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCanonicalizer;

impl Canonicalizer for IdentityCanonicalizer {
    fn canonicalize(&self, raw: &str) -> CanonicalText {
        CanonicalText {
            text: raw.to_string(),
            applied_rules: Vec::new(),
            hash: change_fingerprint(raw),
        }
    }
}

fn compile(rule: &'static str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PipelineError::InvalidCanonicalRule {
        rule,
        reason: e.to_string(),
    })
}

//! Lexical matcher seam.
//!
//! A matcher is a pure function of its input: `scan` keeps no cursor between
//! calls and returns every non-overlapping match in ascending order.

use regex::Regex;

use crate::error::MatcherError;

/// One raw match in byte offsets, before char conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    pub start: usize,
    pub end: usize,
    /// One entry per capture group, `None` when the group did not participate.
    pub groups: Vec<Option<(usize, usize)>>,
}

/// A lexical rule that can be scanned over a text.
pub trait LexicalMatcher: Send + Sync {
    /// Number of capture groups each match reports.
    fn capture_count(&self) -> usize;

    /// All non-overlapping matches, in ascending byte order.
    fn scan(&self, text: &str) -> Result<Vec<RawMatch>, MatcherError>;

    /// Human-readable form of the rule, used in diagnostics.
    fn describe(&self) -> String;
}

/// [`LexicalMatcher`] backed by a compiled regular expression.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl LexicalMatcher for RegexMatcher {
    fn capture_count(&self) -> usize {
        // Group 0 is the whole match.
        self.regex.captures_len() - 1
    }

    fn scan(&self, text: &str) -> Result<Vec<RawMatch>, MatcherError> {
        Ok(self
            .regex
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let groups = (1..caps.len())
                    .map(|i| caps.get(i).map(|g| (g.start(), g.end())))
                    .collect();
                Some(RawMatch {
                    start: whole.start(),
                    end: whole.end(),
                    groups,
                })
            })
            .collect())
    }

    fn describe(&self) -> String {
        format!("regex({})", self.regex.as_str())
    }
}

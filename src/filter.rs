use std::fmt;

use log::trace;
use regex::{NoExpand, Regex};

use crate::utils::{Filter, ParseErrorKind, RegexResultExt, Word};

/// Default cap on the number of matches a single rule replaces
pub const MAX_FILTER_MATCHES: usize = 20;

/// A rule by which parts of a word are replaced by literal text
#[derive(Clone)]
pub struct FilterRule {
    pattern: Regex,
    replacement: String,
}

impl FilterRule {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, ParseErrorKind> {
        Ok(FilterRule {
            pattern: Regex::new(pattern).or_invalid_regex(pattern)?,
            replacement: replacement.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replaces up to `limit` non-overlapping matches, left to right.
    /// A limit of zero leaves the text unchanged.
    pub fn apply(&self, text: &str, limit: usize) -> String {
        // replacen treats 0 as no limit
        if limit == 0 {
            return text.to_string();
        }
        self.pattern
            .replacen(text, limit, NoExpand(&self.replacement))
            .into_owned()
    }
}

impl fmt::Debug for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} > {}", self.pattern.as_str(), self.replacement)
    }
}

/// Ordered series of filter rules, each one working on the output of the
/// previous one
#[derive(Debug, Clone)]
pub struct FilterChain {
    rules: Vec<FilterRule>,
    max_matches: usize,
}

impl Default for FilterChain {
    fn default() -> Self {
        FilterChain::new(MAX_FILTER_MATCHES)
    }
}

impl FilterChain {
    pub fn new(max_matches: usize) -> Self {
        FilterChain {
            rules: Vec::new(),
            max_matches,
        }
    }

    /// Compiles `pattern` and appends the rule to the chain
    pub fn add(&mut self, pattern: &str, replacement: &str) -> Result<&mut Self, ParseErrorKind> {
        let rule = FilterRule::new(pattern, replacement)?;
        trace!("filter rule {:?}", rule);
        self.rules.push(rule);
        Ok(self)
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Filter for FilterChain {
    fn apply(&self, word: &Word) -> Word {
        let mut text = word.as_str().to_string();
        for rule in &self.rules {
            text = rule.apply(&text, self.max_matches);
        }
        Word::from(text)
    }
}

use log::trace;
use regex::Regex;

use crate::utils::{ParseErrorKind, RegexResultExt, Validator, Word};

/// Patterns marking invalid words. A word matching any of them anywhere is
/// rejected.
#[derive(Debug, Clone, Default)]
pub struct RejectionList {
    patterns: Vec<Regex>,
}

impl RejectionList {
    pub fn new() -> Self {
        RejectionList::default()
    }

    pub fn add(&mut self, pattern: &str) -> Result<&mut Self, ParseErrorKind> {
        let regex = Regex::new(pattern).or_invalid_regex(pattern)?;
        trace!("rejection rule {}", pattern);
        self.patterns.push(regex);
        Ok(self)
    }

    pub fn is_valid(&self, text: &str) -> bool {
        !self.patterns.iter().any(|p| p.is_match(text))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Validator for RejectionList {
    fn ok(&self, word: &Word) -> bool {
        self.is_valid(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_on_any_match() {
        let mut rejections = RejectionList::new();
        rejections.add("bc").unwrap().add("^n").unwrap();

        assert!(rejections.ok(&Word::from("bas")));
        assert!(!rejections.ok(&Word::from("abca")));
        assert!(!rejections.ok(&Word::from("na")));
        assert!(rejections.ok(&Word::from("an")));
    }

    #[test]
    fn test_empty_list_accepts_everything() {
        let rejections = RejectionList::new();
        assert!(rejections.ok(&Word::from("anything")));
        assert!(rejections.ok(&Word::default()));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut rejections = RejectionList::new();
        assert!(matches!(
            rejections.add("("),
            Err(ParseErrorKind::InvalidRegex { .. })
        ));
    }
}

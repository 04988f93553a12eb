use std::fmt;
use std::io;
use std::ops::Deref;

use serde::Serialize;
use thiserror::Error;

/// Custom error types for the word generator
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("in line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },

    #[error("definitions don't contain 'words:'")]
    MissingWords,

    #[error("index {index} is out of range, the grammar has {count} expansions")]
    IndexOutOfRange { index: u128, count: u128 },

    #[error("number of expansions of '{0}' doesn't fit into 128 bits")]
    CountOverflow(String),

    #[error("no valid word found after {0} attempts")]
    Exhausted(usize),

    #[error("non-terminals form a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// What went wrong on a single line of a definition file
#[derive(Error, Debug)]
pub enum ParseErrorKind {
    #[error("expect one non-terminal before '=' but got '{0}'")]
    MalformedNonTerminal(String),

    #[error("rule '{0}' doesn't contain '>'")]
    MissingArrow(String),

    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("'{0}' has no valid weight")]
    InvalidWeight(String),

    #[error("either use weights for all options or none")]
    MixedWeights,

    #[error("weights of an alternative list must not sum to zero")]
    ZeroWeightSum,

    #[error("at least one option needs to be given")]
    NoAlternatives,

    #[error("'{0}' is not a valid random-rate")]
    InvalidRandomRate(String),

    #[error("random-rate must be in range [0, 100] but is {0}")]
    RandomRateOutOfRange(f64),

    #[error("table doesn't have correct length: columns = {expected}, but got {found}")]
    TableRowLength { expected: usize, found: usize },
}

impl ParseErrorKind {
    /// Attach a 1-based line number
    pub fn at(self, line: usize) -> GrammarError {
        GrammarError::Parse { line, kind: self }
    }
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// A string of characters in a language.
///
/// The empty word is what [`crate::Lexicon::get`] returns for an index whose
/// expansion is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Word(String);

impl Word {
    pub fn new(text: impl Into<String>) -> Self {
        Word(text.into())
    }

    /// True for the empty sentinel
    pub fn is_rejected(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for Word {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Word {
    fn from(text: String) -> Self {
        Word(text)
    }
}

impl From<&str> for Word {
    fn from(text: &str) -> Self {
        Word(text.to_string())
    }
}

impl PartialEq<&str> for Word {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Makes systematic changes to generated words
pub trait Filter: fmt::Debug {
    fn apply(&self, word: &Word) -> Word;
}

/// Decides whether a word is valid in a language
pub trait Validator: fmt::Debug {
    fn ok(&self, word: &Word) -> bool;
}

/// Trait extension for Result<T, regex::Error> to convert to a parse error
pub trait RegexResultExt<T> {
    fn or_invalid_regex(self, pattern: &str) -> std::result::Result<T, ParseErrorKind>;
}

impl<T> RegexResultExt<T> for std::result::Result<T, regex::Error> {
    fn or_invalid_regex(self, pattern: &str) -> std::result::Result<T, ParseErrorKind> {
        self.map_err(|source| ParseErrorKind::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })
    }
}

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use log::{debug, trace};
use serde::Deserialize;

use crate::filter::{FilterChain, MAX_FILTER_MATCHES};
use crate::parser;
use crate::random::RandomSource;
use crate::symbol::{SymbolId, SymbolTable};
use crate::utils::{Filter, GrammarError, Result, Validator, Word};
use crate::validator::RejectionList;

/// Name of the root non-terminal defined by `words:`
pub const WORDS: &str = "#words";

/// Default likelihood of an optional (`?`) character being kept
pub const DEFAULT_RANDOM_RATE: f64 = 0.1;

/// Configuration options for parsing and filtering
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrammarConfig {
    /// Likelihood in [0, 1] of keeping an optional character, unless the
    /// definitions contain a `random-rate:` line
    pub random_rate: f64,
    /// Maximum number of matches a filter rule replaces in one word, 0 disables
    /// replacement
    pub max_filter_matches: usize,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            random_rate: DEFAULT_RANDOM_RATE,
            max_filter_matches: MAX_FILTER_MATCHES,
        }
    }
}

impl GrammarConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: GrammarConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GrammarConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.random_rate) {
            return Err(GrammarError::InvalidConfig(format!(
                "random_rate must be in range [0, 1] but is {}",
                self.random_rate
            )));
        }
        Ok(())
    }
}

/// Creates words of a language, either the i-th word or a random one.
/// Words are not filtered or validated here, see [`Lexicon`].
#[derive(Debug, Clone)]
pub struct Creator {
    symbols: SymbolTable,
    root: SymbolId,
    random_rate: f64,
}

impl Creator {
    pub(crate) fn new(symbols: SymbolTable, root: SymbolId, random_rate: f64) -> Self {
        Creator {
            symbols,
            root,
            random_rate,
        }
    }

    /// Number of derivations of the root. Rejected words are included.
    pub fn count(&self) -> Result<u128> {
        self.symbols.count(self.root)
    }

    /// The i-th derivation of the root
    pub fn get(&self, index: u128) -> Result<Word> {
        self.symbols.get_by_index(self.root, index).map(Word::from)
    }

    /// A random derivation of the root, chosen by weight
    pub fn choose<R: RandomSource + ?Sized>(&self, rnd: &mut R) -> Word {
        Word::from(self.symbols.choose(rnd, self.root))
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn root(&self) -> SymbolId {
        self.root
    }

    /// The rate used for optional characters when the definitions were parsed
    pub fn random_rate(&self) -> f64 {
        self.random_rate
    }
}

/// A parsed language: its creator, rejection list and filter chain
#[derive(Debug, Clone)]
pub struct Lexicon {
    creator: Creator,
    validator: RejectionList,
    filter: FilterChain,
}

impl Lexicon {
    pub(crate) fn from_parts(creator: Creator, validator: RejectionList, filter: FilterChain) -> Self {
        Lexicon {
            creator,
            validator,
            filter,
        }
    }

    /// Parse definitions with the default configuration
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse(text, &GrammarConfig::default())
    }

    pub fn parse_with_config(text: &str, config: &GrammarConfig) -> Result<Self> {
        config.validate()?;
        parser::parse(text, config)
    }

    /// Parse a definition file with the default configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file_with_config(path, &GrammarConfig::default())
    }

    pub fn from_file_with_config<P: AsRef<Path>>(path: P, config: &GrammarConfig) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading definitions from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::parse_with_config(&text, config)
    }

    /// Number of derivations, including those that are rejected
    pub fn count(&self) -> Result<u128> {
        self.creator.count()
    }

    /// The i-th word after filtering, or the empty word if it is rejected.
    /// Fails for indices not below [`Lexicon::count`].
    pub fn get(&self, index: u128) -> Result<Word> {
        let word = self.filter.apply(&self.creator.get(index)?);
        if self.validator.ok(&word) {
            Ok(word)
        } else {
            trace!("word {} '{}' is rejected", index, word);
            Ok(Word::default())
        }
    }

    /// A random valid word.
    ///
    /// Samples until a word passes the rejection list. This never returns if
    /// every word of the language is rejected; use
    /// [`Lexicon::choose_bounded`] for untrusted definitions.
    pub fn choose<R: RandomSource + ?Sized>(&self, rnd: &mut R) -> Word {
        loop {
            if let Some(word) = self.sample(rnd) {
                return word;
            }
        }
    }

    /// Like [`Lexicon::choose`], giving up after `max_attempts` rejected words
    pub fn choose_bounded<R: RandomSource + ?Sized>(&self, rnd: &mut R, max_attempts: usize) -> Result<Word> {
        for _ in 0..max_attempts {
            if let Some(word) = self.sample(rnd) {
                return Ok(word);
            }
        }
        Err(GrammarError::Exhausted(max_attempts))
    }

    fn sample<R: RandomSource + ?Sized>(&self, rnd: &mut R) -> Option<Word> {
        let word = self.filter.apply(&self.creator.choose(rnd));
        if self.validator.ok(&word) {
            Some(word)
        } else {
            trace!("rejected '{}', sampling again", word);
            None
        }
    }

    /// Fails if a non-terminal reachable from the root refers to itself.
    /// Counting and indexing don't terminate for such definitions.
    pub fn check_acyclic(&self) -> Result<()> {
        match self.creator.symbols.find_cycle(self.creator.root) {
            Some(cycle) => Err(GrammarError::Cycle(cycle)),
            None => Ok(()),
        }
    }

    pub fn creator(&self) -> &Creator {
        &self.creator
    }

    pub fn validator(&self) -> &RejectionList {
        &self.validator
    }

    pub fn filter(&self) -> &FilterChain {
        &self.filter
    }

    pub fn into_parts(self) -> (Creator, RejectionList, FilterChain) {
        (self.creator, self.validator, self.filter)
    }
}

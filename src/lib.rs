//! Conlang-Gen creates words for invented languages.
//!
//! A language is described by a small definition file: non-terminals that
//! expand into sequences of characters, optional characters, regular
//! expressions that rewrite or reject words, and compatibility tables. Words
//! can be enumerated by index or sampled by weight.
//!
//! # Example
//!
//! ```rust
//! use conlang_gen::{Cycle, Lexicon};
//!
//! let lexicon = Lexicon::parse(
//!     "C = b c\n\
//!      V = a e\n\
//!      words: CV\n\
//!      reject: ce\n\
//!      filter: ca>ka",
//! )
//! .unwrap();
//!
//! assert_eq!(lexicon.count().unwrap(), 4);
//! assert_eq!(lexicon.get(0).unwrap(), "ba");
//! assert_eq!(lexicon.get(1).unwrap(), "ka");
//! // rejected words come back empty
//! assert_eq!(lexicon.get(3).unwrap(), "");
//!
//! let mut rnd = Cycle::new(vec![0.0, 0.9, 0.0]);
//! assert_eq!(lexicon.choose(&mut rnd), "ka");
//! ```

pub mod filter;
pub mod grammar;
pub mod parser;
pub mod random;
pub mod symbol;
pub mod utils;
pub mod validator;
pub mod weights;

pub use filter::{FilterChain, FilterRule};
pub use grammar::{Creator, GrammarConfig, Lexicon};
pub use random::{Cycle, Flat, Natural, RandomSource};
pub use utils::{Filter, GrammarError, ParseErrorKind, Result, Validator, Word};
pub use validator::RejectionList;

// Re-export the expansion tree
pub use symbol::{Alternative, Symbol, SymbolId, SymbolTable};

/// Parse definitions with the default configuration
pub fn parse(text: &str) -> Result<Lexicon> {
    Lexicon::parse(text)
}

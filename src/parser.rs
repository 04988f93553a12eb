//! Line-oriented compiler for definition files.
//!
//! ```text
//! random-rate: 20              # percent, default 10
//! C = b c d                    # non-terminal
//! V = a:3 e:1                  # explicit weights
//! words: CV CVC?               # root, '?' makes the preceding character optional
//! reject: ^d e$                # regular expressions of invalid words
//! filter: ce>se;;d$>t          # ';'-separated rewrite rules
//! %a e                         # table header
//! b + -                        # 'be' is rejected
//! c + ke                       # 'ce' is rewritten to 'ke'
//! ```

use log::{debug, trace, warn};

use crate::filter::FilterChain;
use crate::grammar::{Creator, GrammarConfig, Lexicon, WORDS};
use crate::symbol::SymbolTable;
use crate::utils::{GrammarError, ParseErrorKind, Result};
use crate::validator::RejectionList;

const RANDOM_RATE: &str = "random-rate:";

/// Compiles definitions into a [`Lexicon`]. Fails on the first invalid line.
pub fn parse(text: &str, config: &GrammarConfig) -> Result<Lexicon> {
    let lines: Vec<&str> = text.lines().map(strip_comment).collect();
    let random_rate = find_random_rate(&lines, config.random_rate)?;
    debug!("random-rate is {}", random_rate);

    let mut parser = Parser {
        random_rate,
        symbols: SymbolTable::new(),
        rejections: RejectionList::new(),
        filters: FilterChain::new(config.max_filter_matches),
        table: None,
    };

    for (i, line) in lines.iter().enumerate() {
        parser.parse_line(line).map_err(|kind| kind.at(i + 1))?;
    }
    parser.close_table();

    let root = parser.symbols.lookup(WORDS).ok_or(GrammarError::MissingWords)?;
    debug!(
        "parsed {} symbols, {} rejections and {} filters",
        parser.symbols.len(),
        parser.rejections.len(),
        parser.filters.len()
    );

    Ok(Lexicon::from_parts(
        Creator::new(parser.symbols, root, random_rate),
        parser.rejections,
        parser.filters,
    ))
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// The rate has to be known before any `?` is expanded, so it is read ahead
/// of everything else. The last `random-rate:` line wins.
fn find_random_rate(lines: &[&str], default: f64) -> Result<f64> {
    let mut rate = default;
    for (i, line) in lines.iter().enumerate() {
        if let Some(value) = line.strip_prefix(RANDOM_RATE) {
            let value = value.trim();
            let percent: f64 = value
                .parse()
                .map_err(|_| ParseErrorKind::InvalidRandomRate(value.to_string()).at(i + 1))?;
            if !(0.0..=100.0).contains(&percent) {
                return Err(ParseErrorKind::RandomRateOutOfRange(percent).at(i + 1));
            }
            rate = percent / 100.0;
        }
    }
    Ok(rate)
}

/// An open `%` table
struct Table {
    columns: Vec<String>,
    rows: usize,
}

struct Parser {
    random_rate: f64,
    symbols: SymbolTable,
    rejections: RejectionList,
    filters: FilterChain,
    table: Option<Table>,
}

impl Parser {
    fn parse_line(&mut self, line: &str) -> std::result::Result<(), ParseErrorKind> {
        if let Some(header) = line.strip_prefix('%') {
            self.close_table();
            self.table = Some(Table {
                columns: header.split_whitespace().map(str::to_string).collect(),
                rows: 0,
            });
            return Ok(());
        }

        if self.table.is_some() {
            // whitespace-only lines close a table too
            if line.trim().is_empty() {
                self.close_table();
                return Ok(());
            }
            return self.parse_row(line);
        }

        if let Some(rest) = line.strip_prefix("words:") {
            self.define(WORDS, rest)
        } else if let Some(rest) = line.strip_prefix("reject:") {
            for pattern in rest.split_whitespace() {
                self.rejections.add(pattern)?;
            }
            Ok(())
        } else if let Some(rest) = line.strip_prefix("filter:") {
            self.parse_filters(rest)
        } else if let Some(idx) = line.find('=') {
            let head: Vec<&str> = line[..idx].split_whitespace().collect();
            match head.as_slice() {
                [name] => self.define(name, &line[idx + 1..]),
                _ => Err(ParseErrorKind::MalformedNonTerminal(line[..idx].to_string())),
            }
        } else {
            if !line.trim().is_empty() {
                trace!("ignoring line '{}'", line.trim());
            }
            Ok(())
        }
    }

    fn define(&mut self, name: &str, alternatives: &str) -> std::result::Result<(), ParseErrorKind> {
        let tokens: Vec<&str> = alternatives.split_whitespace().collect();
        let id = self.symbols.ensure(name);
        if self.symbols.is_non_terminal(id) {
            warn!("'{}' is defined more than once, adding to its alternatives", name);
        }

        let added = self.symbols.add_alternatives(id, &tokens, self.random_rate)?;
        debug!("non-terminal '{}' has {} new alternatives", name, added);
        Ok(())
    }

    fn parse_filters(&mut self, rules: &str) -> std::result::Result<(), ParseErrorKind> {
        for rule in rules.split(';') {
            if rule.trim().is_empty() {
                continue;
            }
            let (pattern, replacement) = rule
                .split_once('>')
                .ok_or_else(|| ParseErrorKind::MissingArrow(rule.to_string()))?;
            self.filters.add(pattern.trim(), replacement.trim())?;
        }
        Ok(())
    }

    /// A row label followed by one cell per column: `+` allows the
    /// combination, `-` rejects it and anything else replaces it.
    fn parse_row(&mut self, line: &str) -> std::result::Result<(), ParseErrorKind> {
        let Some(table) = self.table.as_mut() else {
            return Ok(());
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some((label, cells)) = fields.split_first() else {
            return Ok(());
        };
        if cells.len() != table.columns.len() {
            return Err(ParseErrorKind::TableRowLength {
                expected: table.columns.len(),
                found: cells.len(),
            });
        }

        for (column, &cell) in table.columns.iter().zip(cells) {
            let combination = format!("{}{}", label, column);
            match cell {
                "+" => {}
                "-" => {
                    self.rejections.add(&combination)?;
                }
                replacement => {
                    self.filters.add(&combination, replacement)?;
                }
            }
        }
        table.rows += 1;
        Ok(())
    }

    fn close_table(&mut self) {
        if let Some(table) = self.table.take() {
            debug!(
                "table with columns {:?} has {} rows",
                table.columns, table.rows
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_default(text: &str) -> Result<Lexicon> {
        parse(text, &GrammarConfig::default())
    }

    fn line_of(err: GrammarError) -> usize {
        match err {
            GrammarError::Parse { line, .. } => line,
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("C = b c # consonants"), "C = b c ");
        assert_eq!(strip_comment("# only a comment"), "");
        assert_eq!(strip_comment("words: CV"), "words: CV");
    }

    #[test]
    fn test_random_rate() {
        assert_eq!(find_random_rate(&["words: a"], 0.1).unwrap(), 0.1);
        assert_eq!(find_random_rate(&["random-rate: 25 "], 0.1).unwrap(), 0.25);
        assert_eq!(find_random_rate(&["random-rate:50", "random-rate:100"], 0.1).unwrap(), 1.0);

        let err = find_random_rate(&["words: a", "random-rate: 120"], 0.1).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Parse { line: 2, kind: ParseErrorKind::RandomRateOutOfRange(_) }
        ));
        let err = find_random_rate(&["random-rate: lots"], 0.1).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Parse { line: 1, kind: ParseErrorKind::InvalidRandomRate(_) }
        ));
    }

    #[test]
    fn test_malformed_non_terminal() {
        let err = parse_default("words: Ca\n = b c").unwrap_err();
        assert_eq!(line_of(err), 2);
        let err = parse_default("C D = b c\nwords: Ca").unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Parse { line: 1, kind: ParseErrorKind::MalformedNonTerminal(ref head) } if head == "C D "
        ));
    }

    #[test]
    fn test_filter_rules() {
        let lexicon = parse_default("words: a\nfilter: na > ma;;b$>p; ").unwrap();
        let rules: Vec<(&str, &str)> = lexicon
            .filter()
            .rules()
            .iter()
            .map(|r| (r.pattern(), r.replacement()))
            .collect();
        assert_eq!(rules, vec![("na", "ma"), ("b$", "p")]);

        let err = parse_default("words: a\nfilter: na;b$>p").unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Parse { line: 2, kind: ParseErrorKind::MissingArrow(ref rule) } if rule == " na"
        ));
    }

    #[test]
    fn test_table_compiles_to_rules() {
        let lexicon = parse_default("C = b\nV = a e i\nwords: CV\n%a e i\nb + - +").unwrap();
        let rejections: Vec<&str> = lexicon.validator().patterns().collect();
        assert_eq!(rejections, vec!["be"]);
        assert!(lexicon.filter().is_empty());
    }

    #[test]
    fn test_table_replacements_keep_parse_order() {
        let text = "words: a\nfilter: x>y\n%a e\nb ba +\nc - ce\n\nfilter: z>w";
        let lexicon = parse_default(text).unwrap();
        let patterns: Vec<&str> = lexicon.filter().rules().iter().map(|r| r.pattern()).collect();
        assert_eq!(patterns, vec!["x", "ba", "ce", "z"]);
        let rejections: Vec<&str> = lexicon.validator().patterns().collect();
        assert_eq!(rejections, vec!["ca"]);
    }

    #[test]
    fn test_blank_line_closes_table() {
        let text = "%a e\nb + -\n\nC = b c\nwords: Ca";
        let lexicon = parse_default(text).unwrap();
        assert_eq!(lexicon.count().unwrap(), 2);

        // without the blank line the definition is read as a row
        let err = parse_default("%a e\nb + -\nC = b c\nwords: Ca").unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Parse {
                line: 3,
                kind: ParseErrorKind::TableRowLength { expected: 2, found: 3 }
            }
        ));
    }

    #[test]
    fn test_whitespace_line_closes_table() {
        let lexicon = parse_default("%a e\nb + -\n  \t\nC = b c\nwords: Ca").unwrap();
        assert_eq!(lexicon.validator().len(), 1);
        assert_eq!(lexicon.count().unwrap(), 2);

        // a comment-only line is blank once the comment is stripped
        let lexicon = parse_default("%a e\nb + -\n# rows end here\nwords: a").unwrap();
        assert_eq!(lexicon.validator().len(), 1);
    }

    #[test]
    fn test_table_row_length() {
        let text = "V=a e i\nC=b c d\nwords: CV\n%a e i\nb + + - +\nc - - -";
        let err = parse_default(text).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Parse {
                line: 5,
                kind: ParseErrorKind::TableRowLength { expected: 3, found: 4 }
            }
        ));
    }

    #[test]
    fn test_invalid_regex_in_table() {
        let err = parse_default("words: a\n%a e i\n( + - +").unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Parse { line: 3, kind: ParseErrorKind::InvalidRegex { .. } }
        ));
    }

    #[test]
    fn test_missing_words() {
        assert!(matches!(parse_default(""), Err(GrammarError::MissingWords)));
        assert!(matches!(
            parse_default("letters: a b s\n"),
            Err(GrammarError::MissingWords)
        ));
    }

    #[test]
    fn test_empty_words() {
        let err = parse_default("letters: a b d s\nwords: ").unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Parse { line: 2, kind: ParseErrorKind::NoAlternatives }
        ));
    }

    #[test]
    fn test_comments_and_crlf() {
        let text = "# consonants\r\nC = b c # two\r\nwords: Ca\r\n";
        let lexicon = parse_default(text).unwrap();
        assert_eq!(lexicon.get(0).unwrap(), "ba");
        assert_eq!(lexicon.get(1).unwrap(), "ca");
    }

    #[test]
    fn test_random_rate_applies_before_definitions() {
        let lexicon = parse_default("words: a?b\nrandom-rate: 100").unwrap();
        let mut rnd = crate::random::Cycle::new(vec![0.999]);
        assert_eq!(lexicon.choose(&mut rnd), "ab");
    }
}

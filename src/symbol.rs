//! The expansion tree.
//!
//! Symbols live in an arena owned by [`SymbolTable`] and refer to each other
//! by [`SymbolId`], so a rule may reference a non-terminal that is only
//! defined further down in the file.

use std::collections::HashMap;

use crate::random::RandomSource;
use crate::utils::{GrammarError, ParseErrorKind, Result};
use crate::weights::{calc_weights, expand_optional};

/// Handle of a symbol inside its [`SymbolTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(usize);

/// A symbol is either final text or a choice between sequences of symbols
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// Literal text, by default the name of the symbol itself
    Terminal(String),
    /// A symbol that is replaced by one of its alternatives
    NonTerminal(NonTerminal),
}

/// Alternatives of a non-terminal together with the sum of their weights
#[derive(Debug, Clone, PartialEq)]
pub struct NonTerminal {
    alternatives: Vec<Alternative>,
    weight_sum: f64,
}

impl NonTerminal {
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Sum of all weights, one up to rounding
    pub fn weight_sum(&self) -> f64 {
        self.weight_sum
    }

    /// Picks the first alternative whose cumulative weight exceeds `p`,
    /// falling back to the last one.
    pub fn pick(&self, p: f64) -> Option<&Alternative> {
        let (last, init) = self.alternatives.split_last()?;

        let mut sum = 0.0;
        for alternative in init {
            sum += alternative.weight;
            if sum > p {
                return Some(alternative);
            }
        }
        Some(last)
    }
}

/// A sequence of symbols and the likelihood of choosing it
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub symbols: Vec<SymbolId>,
    pub weight: f64,
}

/// Registry of all symbols, keyed by name
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    symbols: Vec<Symbol>,
    ids: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Returns the symbol called `name`, registering it as a terminal if it
    /// doesn't exist yet.
    pub fn ensure(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }

        let id = SymbolId(self.symbols.len());
        self.names.push(name.to_string());
        self.symbols.push(Symbol::Terminal(name.to_string()));
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.names[id.0]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn is_non_terminal(&self, id: SymbolId) -> bool {
        matches!(self.symbols[id.0], Symbol::NonTerminal(_))
    }

    /// Compiles `tokens` into alternatives of `id`, which becomes a
    /// non-terminal. Returns the number of alternatives added, which exceeds
    /// `tokens.len()` when optional characters were expanded.
    ///
    /// Every character except `$` ends a symbol name, so `ab` refers to the
    /// symbols `a` and `b` while `$C` is a single symbol.
    pub fn add_alternatives(
        &mut self,
        id: SymbolId,
        tokens: &[&str],
        random_rate: f64,
    ) -> std::result::Result<usize, ParseErrorKind> {
        let mut alternatives = Vec::new();

        for token in calc_weights(tokens)? {
            for variant in expand_optional(&token.text, token.weight, random_rate) {
                let mut symbols = Vec::new();
                let mut name = String::new();
                for c in variant.text.chars() {
                    name.push(c);
                    if c != '$' {
                        symbols.push(self.ensure(&name));
                        name.clear();
                    }
                }
                alternatives.push(Alternative {
                    symbols,
                    weight: variant.weight,
                });
            }
        }

        let added = alternatives.len();
        let weight: f64 = alternatives.iter().map(|a| a.weight).sum();
        match &mut self.symbols[id.0] {
            Symbol::NonTerminal(nt) => {
                // every definition line keeps an equal share of the total
                let total = nt.weight_sum + weight;
                nt.alternatives.extend(alternatives);
                for alternative in &mut nt.alternatives {
                    alternative.weight /= total;
                }
                nt.weight_sum = nt.alternatives.iter().map(|a| a.weight).sum();
            }
            symbol => {
                *symbol = Symbol::NonTerminal(NonTerminal {
                    alternatives,
                    weight_sum: weight,
                });
            }
        }

        Ok(added)
    }

    /// Number of distinct derivations of `id`. Different derivations that
    /// spell the same text are counted separately.
    ///
    /// Doesn't terminate for cyclic grammars, see [`SymbolTable::find_cycle`].
    pub fn count(&self, id: SymbolId) -> Result<u128> {
        Counter::new(self).count(id)
    }

    /// The `index`-th derivation of `id`.
    ///
    /// Alternatives are numbered in order. Within an alternative the index is
    /// split in mixed radix over the counts of its symbols, the first symbol
    /// varying fastest.
    pub fn get_by_index(&self, id: SymbolId, index: u128) -> Result<String> {
        let mut counter = Counter::new(self);
        let count = counter.count(id)?;
        if index >= count {
            return Err(GrammarError::IndexOutOfRange { index, count });
        }

        let mut text = String::new();
        self.expand_index(&mut counter, id, index, &mut text)?;
        Ok(text)
    }

    fn expand_index(
        &self,
        counter: &mut Counter<'_>,
        id: SymbolId,
        mut index: u128,
        text: &mut String,
    ) -> Result<()> {
        let nt = match &self.symbols[id.0] {
            Symbol::Terminal(value) => {
                text.push_str(value);
                return Ok(());
            }
            Symbol::NonTerminal(nt) => nt,
        };

        for alternative in &nt.alternatives {
            let product = counter.product(&alternative.symbols)?;
            if index < product {
                for &symbol in &alternative.symbols {
                    let n = counter.count(symbol)?;
                    self.expand_index(counter, symbol, index % n, text)?;
                    index /= n;
                }
                return Ok(());
            }
            index -= product;
        }

        // index < count(id) was checked by the caller
        unreachable!("index exceeds the expansions of '{}'", self.name(id))
    }

    /// Resolves `id` to text, choosing alternatives by weight
    pub fn choose<R: RandomSource + ?Sized>(&self, rnd: &mut R, id: SymbolId) -> String {
        let mut text = String::new();
        self.choose_into(rnd, id, &mut text);
        text
    }

    fn choose_into<R: RandomSource + ?Sized>(&self, rnd: &mut R, id: SymbolId, text: &mut String) {
        match &self.symbols[id.0] {
            Symbol::Terminal(value) => text.push_str(value),
            Symbol::NonTerminal(nt) => {
                let p = rnd.float(nt.weight_sum);
                if let Some(alternative) = nt.pick(p) {
                    for &symbol in &alternative.symbols {
                        self.choose_into(rnd, symbol, text);
                    }
                }
            }
        }
    }

    /// Searches the non-terminals reachable from `root` for a cycle and
    /// returns its names, starting and ending with the same non-terminal.
    pub fn find_cycle(&self, root: SymbolId) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnPath,
            Done,
        }

        fn visit(
            table: &SymbolTable,
            id: SymbolId,
            marks: &mut [Mark],
            path: &mut Vec<SymbolId>,
        ) -> Option<Vec<String>> {
            match marks[id.0] {
                Mark::Done => return None,
                Mark::OnPath => {
                    let start = path.iter().position(|&p| p == id).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|&p| table.name(p).to_string()).collect();
                    cycle.push(table.name(id).to_string());
                    return Some(cycle);
                }
                Mark::Unvisited => {}
            }

            if let Symbol::NonTerminal(nt) = &table.symbols[id.0] {
                marks[id.0] = Mark::OnPath;
                path.push(id);
                for alternative in &nt.alternatives {
                    for &symbol in &alternative.symbols {
                        if let Some(cycle) = visit(table, symbol, marks, path) {
                            return Some(cycle);
                        }
                    }
                }
                path.pop();
            }
            marks[id.0] = Mark::Done;
            None
        }

        let mut marks = vec![Mark::Unvisited; self.symbols.len()];
        visit(self, root, &mut marks, &mut Vec::new())
    }
}

/// Memoizes derivation counts for the duration of one lookup
struct Counter<'a> {
    table: &'a SymbolTable,
    memo: HashMap<SymbolId, u128>,
}

impl<'a> Counter<'a> {
    fn new(table: &'a SymbolTable) -> Self {
        Counter {
            table,
            memo: HashMap::new(),
        }
    }

    fn count(&mut self, id: SymbolId) -> Result<u128> {
        if let Some(&n) = self.memo.get(&id) {
            return Ok(n);
        }

        let table = self.table;
        let n = match table.symbol(id) {
            Symbol::Terminal(_) => 1,
            Symbol::NonTerminal(nt) => {
                let mut n: u128 = 0;
                for alternative in &nt.alternatives {
                    let product = self.product(&alternative.symbols)?;
                    n = n
                        .checked_add(product)
                        .ok_or_else(|| self.overflow(id))?;
                }
                n
            }
        };

        self.memo.insert(id, n);
        Ok(n)
    }

    fn product(&mut self, symbols: &[SymbolId]) -> Result<u128> {
        let mut product: u128 = 1;
        for &symbol in symbols {
            let n = self.count(symbol)?;
            product = product
                .checked_mul(n)
                .ok_or_else(|| self.overflow(symbol))?;
        }
        Ok(product)
    }

    fn overflow(&self, id: SymbolId) -> GrammarError {
        GrammarError::CountOverflow(self.table.name(id).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Cycle;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn table(rules: &[(&str, &[&str])]) -> SymbolTable {
        let mut table = SymbolTable::new();
        for (name, tokens) in rules {
            let id = table.ensure(name);
            table.add_alternatives(id, tokens, 0.1).unwrap();
        }
        table
    }

    fn all(table: &SymbolTable, name: &str) -> Vec<String> {
        let id = table.lookup(name).unwrap();
        let count = table.count(id).unwrap();
        (0..count).map(|i| table.get_by_index(id, i).unwrap()).collect()
    }

    #[test]
    fn test_symbols_start_as_terminals() {
        let mut table = SymbolTable::new();
        let id = table.ensure("a");
        assert_eq!(table.ensure("a"), id);
        assert_eq!(table.symbol(id), &Symbol::Terminal("a".to_string()));
        assert_eq!(table.count(id).unwrap(), 1);
        assert_eq!(table.get_by_index(id, 0).unwrap(), "a");
    }

    #[test]
    fn test_definition_turns_terminal_into_non_terminal() {
        let table = table(&[("W", &["Ca"]), ("C", &["b", "c"])]);
        let c = table.lookup("C").unwrap();
        assert!(table.is_non_terminal(c));
        assert_eq!(all(&table, "W"), vec!["ba", "ca"]);
    }

    #[test]
    fn test_mixed_radix_order() {
        let table = table(&[("W", &["CV", "na"]), ("C", &["b", "c"]), ("V", &["a", "e"])]);
        assert_eq!(all(&table, "W"), vec!["ba", "ca", "be", "ce", "na"]);
    }

    #[test]
    fn test_dollar_joins_symbol_names() {
        let table = table(&[("W", &["$C$C"]), ("$C", &["b", "c"])]);
        assert_eq!(table.lookup("C"), None);
        assert_eq!(all(&table, "W"), vec!["bb", "cb", "bc", "cc"]);
    }

    #[test]
    fn test_index_is_a_bijection_on_derivations() {
        let table = table(&[
            ("W", &["CVC?", "V"]),
            ("C", &["b", "c", "d"]),
            ("V", &["a", "e"]),
        ]);
        let w = table.lookup("W").unwrap();
        // CVC: 18, CV: 6, V: 2
        assert_eq!(table.count(w).unwrap(), 26);

        let words = all(&table, "W");
        let distinct: HashSet<&String> = words.iter().collect();
        assert_eq!(distinct.len(), words.len());
    }

    #[test]
    fn test_duplicate_spellings_are_counted() {
        let table = table(&[("W", &["a", "A"]), ("A", &["a"])]);
        assert_eq!(all(&table, "W"), vec!["a", "a"]);
    }

    #[test]
    fn test_index_out_of_range() {
        let table = table(&[("W", &["a", "b"])]);
        let w = table.lookup("W").unwrap();
        assert!(matches!(
            table.get_by_index(w, 2),
            Err(GrammarError::IndexOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_count_overflow() {
        let mut table = SymbolTable::new();
        let x = table.ensure("X");
        table.add_alternatives(x, &["0", "1", "2", "3"], 0.1).unwrap();
        let long = "X".repeat(70);
        let w = table.ensure("W");
        table.add_alternatives(w, &[long.as_str()], 0.1).unwrap();
        assert!(matches!(table.count(w), Err(GrammarError::CountOverflow(_))));
    }

    #[test]
    fn test_large_counts_without_materializing() {
        let mut table = SymbolTable::new();
        let x = table.ensure("X");
        table
            .add_alternatives(x, &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"], 0.1)
            .unwrap();
        let long = "X".repeat(30);
        let w = table.ensure("W");
        table.add_alternatives(w, &[long.as_str()], 0.1).unwrap();

        assert_eq!(table.count(w).unwrap(), 10u128.pow(30));
        let word = table.get_by_index(w, 10u128.pow(30) - 1).unwrap();
        assert_eq!(word, "9".repeat(30));
        let word = table.get_by_index(w, 123).unwrap();
        assert_eq!(word, format!("321{}", "0".repeat(27)));
    }

    #[test]
    fn test_weights_sum_to_one() {
        let table = table(&[("W", &["a?b", "c", "d?e?"])]);
        let w = table.lookup("W").unwrap();
        match table.symbol(w) {
            Symbol::NonTerminal(nt) => {
                assert_eq!(nt.alternatives().len(), 7);
                let sum: f64 = nt.alternatives().iter().map(|a| a.weight).sum();
                assert!((sum - 1.0).abs() < 1e-12);
                assert!((nt.weight_sum() - 1.0).abs() < 1e-12);
            }
            Symbol::Terminal(_) => panic!("Expected NonTerminal"),
        }
    }

    #[test]
    fn test_pick_boundaries() {
        let table = table(&[("W", &["a:1", "b:1"])]);
        let w = table.lookup("W").unwrap();
        let Symbol::NonTerminal(nt) = table.symbol(w) else {
            panic!("Expected NonTerminal");
        };
        let a = table.lookup("a").unwrap();
        let b = table.lookup("b").unwrap();
        assert_eq!(nt.pick(0.0).unwrap().symbols, vec![a]);
        assert_eq!(nt.pick(0.5).unwrap().symbols, vec![b]);
        assert_eq!(nt.pick(2.0).unwrap().symbols, vec![b]);
    }

    #[test]
    fn test_choose_follows_replayed_values() {
        let table = table(&[("W", &["CV", "na"]), ("C", &["b", "c"]), ("V", &["a", "e"])]);
        let w = table.lookup("W").unwrap();
        let mut rnd = Cycle::new(vec![0.0, 1.0, 1.0]);
        assert_eq!(table.choose(&mut rnd, w), "ce");
        let mut rnd = Cycle::new(vec![1.0]);
        assert_eq!(table.choose(&mut rnd, w), "na");
    }

    #[test]
    fn test_redefinition_appends_alternatives() {
        let table = table(&[("W", &["a"]), ("W", &["b"])]);
        let w = table.lookup("W").unwrap();
        assert_eq!(all(&table, "W"), vec!["a", "b"]);

        let mut rnd = Cycle::new(vec![0.75]);
        assert_eq!(table.choose(&mut rnd, w), "b");
        let mut rnd = Cycle::new(vec![0.25]);
        assert_eq!(table.choose(&mut rnd, w), "a");

        let Symbol::NonTerminal(nt) = table.symbol(w) else {
            panic!("Expected NonTerminal");
        };
        let weights: Vec<f64> = nt.alternatives().iter().map(|a| a.weight).collect();
        assert_eq!(weights, vec![0.5, 0.5]);
        assert_eq!(nt.weight_sum(), 1.0);
    }

    #[test]
    fn test_redefinition_keeps_relative_weights() {
        let table = table(&[("W", &["a:3", "b:1"]), ("W", &["c", "d"])]);
        let Symbol::NonTerminal(nt) = table.symbol(table.lookup("W").unwrap()) else {
            panic!("Expected NonTerminal");
        };
        let weights: Vec<f64> = nt.alternatives().iter().map(|a| a.weight).collect();
        assert!((weights[0] - 0.375).abs() < 1e-12, "{:?}", weights);
        assert!((weights[1] - 0.125).abs() < 1e-12, "{:?}", weights);
        assert!((weights[0] / weights[1] - 3.0).abs() < 1e-12);
        assert!((weights[2] + weights[3] - 0.5).abs() < 1e-12);
        assert!((nt.weight_sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_find_cycle() {
        let acyclic = table(&[("W", &["CV", "V"]), ("C", &["b"]), ("V", &["a"])]);
        assert_eq!(acyclic.find_cycle(acyclic.lookup("W").unwrap()), None);

        let cyclic = table(&[("W", &["aX"]), ("X", &["b", "Yc"]), ("Y", &["W"])]);
        assert_eq!(
            cyclic.find_cycle(cyclic.lookup("W").unwrap()),
            Some(vec!["W".to_string(), "X".into(), "Y".into(), "W".into()])
        );
    }
}

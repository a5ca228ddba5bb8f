//! Predictive parsing table construction.

use std::collections::{BTreeMap, BTreeSet};

use super::first_follow::{first_of_sequence, FirstFollowProvider, SymbolSet};
use super::grammar::{Grammar, GrammarError, Production, Symbol};

/// A table cell that was claimed by two productions of the same
/// non-terminal. The later production wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConflict {
    pub nonterminal: Symbol,
    pub lookahead: Symbol,
    pub replaced: Production,
    pub winner: Production,
}

/// (non-terminal, lookahead terminal) -> production.
#[derive(Debug, Clone, Default)]
pub struct ParsingTable {
    nonterminals: BTreeSet<Symbol>,
    entries: BTreeMap<Symbol, BTreeMap<Symbol, Production>>,
    conflicts: Vec<TableConflict>,
}

impl ParsingTable {
    /// Build the table for `grammar` from the given FIRST/FOLLOW sets.
    ///
    /// For each production `N -> a`, every terminal in FIRST(a) maps to `a`;
    /// if FIRST(a) contains `EPSILON`, so does every terminal in FOLLOW(N).
    /// A missing FIRST entry for a non-terminal, or a missing FOLLOW entry for
    /// a non-terminal with a nullable production, aborts construction.
    pub fn build<P>(grammar: &Grammar, sets: &P) -> Result<Self, GrammarError>
    where
        P: FirstFollowProvider + ?Sized,
    {
        let mut table = ParsingTable {
            nonterminals: grammar.nonterminals().cloned().collect(),
            ..Default::default()
        };

        for nt in grammar.nonterminals() {
            if sets.first(nt).is_none() {
                return Err(GrammarError::MissingFirst(nt.to_string()));
            }
        }

        let first_of = |sym: &Symbol| -> Result<SymbolSet, GrammarError> {
            match sets.first(sym) {
                Some(set) => Ok(set.clone()),
                None if grammar.is_nonterminal(sym) => {
                    Err(GrammarError::MissingFirst(sym.to_string()))
                }
                None => Ok(SymbolSet::from([sym.clone()])),
            }
        };

        for (nt, productions) in grammar.rules() {
            for production in productions {
                let first = first_of_sequence(production.symbols(), &first_of)?;
                for t in first.iter().filter(|s| !s.is_epsilon()) {
                    table.insert(nt, t, production);
                }
                if first.iter().any(Symbol::is_epsilon) {
                    let follow = sets
                        .follow(nt)
                        .ok_or_else(|| GrammarError::MissingFollow(nt.to_string()))?;
                    for t in follow.iter().filter(|s| !s.is_epsilon()) {
                        table.insert(nt, t, production);
                    }
                }
            }
        }

        log::debug!(
            "parsing table built: {} cells over {} non-terminals, {} overwritten",
            table.len(),
            table.nonterminals.len(),
            table.conflicts.len()
        );
        Ok(table)
    }

    fn insert(&mut self, nonterminal: &Symbol, lookahead: &Symbol, production: &Production) {
        let row = self.entries.entry(nonterminal.clone()).or_default();
        if let Some(previous) = row.insert(lookahead.clone(), production.clone()) {
            if previous != *production {
                log::warn!(
                    "grammar is not LL(1): cell ({nonterminal}, {lookahead}) '{previous}' replaced by '{production}'"
                );
                self.conflicts.push(TableConflict {
                    nonterminal: nonterminal.clone(),
                    lookahead: lookahead.clone(),
                    replaced: previous,
                    winner: production.clone(),
                });
            }
        }
    }

    pub fn lookup(&self, nonterminal: &Symbol, lookahead: &Symbol) -> Option<&Production> {
        self.entries.get(nonterminal)?.get(lookahead)
    }

    pub fn is_nonterminal(&self, symbol: &Symbol) -> bool {
        self.nonterminals.contains(symbol)
    }

    /// Cells that were overwritten during construction, in insertion order.
    pub fn conflicts(&self) -> &[TableConflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All cells, ordered by non-terminal then lookahead.
    pub fn entries(&self) -> impl Iterator<Item = (&Symbol, &Symbol, &Production)> {
        self.entries
            .iter()
            .flat_map(|(nt, row)| row.iter().map(move |(t, p)| (nt, t, p)))
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.entries()
            .map(|(nt, t, p)| format!("M[{nt}, {t}] = {nt} -> {p}"))
            .collect()
    }
}

//! FIRST and FOLLOW sets.
//!
//! The table builder consumes sets through [`FirstFollowProvider`], so they
//! can be computed from the grammar here or loaded from a JSON document.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::grammar::{Grammar, GrammarError, Symbol};
use super::lexer::kind;

pub type SymbolSet = BTreeSet<Symbol>;

pub trait FirstFollowProvider {
    /// FIRST set of a grammar symbol (may contain `EPSILON`).
    fn first(&self, symbol: &Symbol) -> Option<&SymbolSet>;

    /// FOLLOW set of a non-terminal.
    fn follow(&self, nonterminal: &Symbol) -> Option<&SymbolSet>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstFollowSets {
    #[serde(default)]
    pub first: BTreeMap<Symbol, SymbolSet>,
    #[serde(default)]
    pub follow: BTreeMap<Symbol, SymbolSet>,
}

impl FirstFollowProvider for FirstFollowSets {
    fn first(&self, symbol: &Symbol) -> Option<&SymbolSet> {
        self.first.get(symbol)
    }

    fn follow(&self, nonterminal: &Symbol) -> Option<&SymbolSet> {
        self.follow.get(nonterminal)
    }
}

/// FIRST of a symbol sequence: accumulate while every prefix symbol is
/// nullable; if all of them are, the result contains `EPSILON`.
pub fn first_of_sequence<F>(symbols: &[Symbol], mut first_of: F) -> Result<SymbolSet, GrammarError>
where
    F: FnMut(&Symbol) -> Result<SymbolSet, GrammarError>,
{
    let mut out = SymbolSet::new();
    for sym in symbols {
        if sym.is_epsilon() {
            continue;
        }
        let set = first_of(sym)?;
        let nullable = set.iter().any(Symbol::is_epsilon);
        out.extend(set.into_iter().filter(|s| !s.is_epsilon()));
        if !nullable {
            return Ok(out);
        }
    }
    out.insert(Symbol::epsilon());
    Ok(out)
}

impl FirstFollowSets {
    /// Compute both sets by fixed-point iteration. FOLLOW of the start symbol
    /// is seeded with the `EOF` marker.
    pub fn compute(grammar: &Grammar) -> Self {
        let first = compute_first(grammar);
        let follow = compute_follow(grammar, &first);
        log::debug!(
            "computed FIRST for {} symbols and FOLLOW for {} non-terminals",
            first.len(),
            follow.len()
        );
        Self { first, follow }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn lookup(first: &BTreeMap<Symbol, SymbolSet>, sym: &Symbol) -> SymbolSet {
    first
        .get(sym)
        .cloned()
        .unwrap_or_else(|| SymbolSet::from([sym.clone()]))
}

fn compute_first(grammar: &Grammar) -> BTreeMap<Symbol, SymbolSet> {
    let mut first: BTreeMap<Symbol, SymbolSet> = BTreeMap::new();
    for t in grammar.terminals() {
        first.insert(t.clone(), SymbolSet::from([t]));
    }
    first.insert(Symbol::epsilon(), SymbolSet::from([Symbol::epsilon()]));
    for nt in grammar.nonterminals() {
        first.insert(nt.clone(), SymbolSet::new());
    }

    loop {
        let mut changed = false;
        for (nt, productions) in grammar.rules() {
            for p in productions {
                let Ok(set) = first_of_sequence(p.symbols(), |s| Ok(lookup(&first, s))) else {
                    continue;
                };
                if let Some(entry) = first.get_mut(nt) {
                    for s in set {
                        changed |= entry.insert(s);
                    }
                }
            }
        }
        if !changed {
            return first;
        }
    }
}

fn compute_follow(
    grammar: &Grammar,
    first: &BTreeMap<Symbol, SymbolSet>,
) -> BTreeMap<Symbol, SymbolSet> {
    let mut follow: BTreeMap<Symbol, SymbolSet> = grammar
        .nonterminals()
        .map(|nt| (nt.clone(), SymbolSet::new()))
        .collect();
    if let Some(start) = follow.get_mut(grammar.start()) {
        start.insert(Symbol::new(kind::EOF));
    }

    loop {
        let mut changed = false;
        for (nt, productions) in grammar.rules() {
            for p in productions {
                let symbols = p.symbols();
                for (i, sym) in symbols.iter().enumerate() {
                    if !grammar.is_nonterminal(sym) {
                        continue;
                    }
                    let Ok(rest) = first_of_sequence(&symbols[i + 1..], |s| Ok(lookup(first, s)))
                    else {
                        continue;
                    };
                    let mut additions: Vec<Symbol> =
                        rest.iter().filter(|s| !s.is_epsilon()).cloned().collect();
                    if rest.iter().any(Symbol::is_epsilon) {
                        if let Some(inherited) = follow.get(nt) {
                            additions.extend(inherited.iter().cloned());
                        }
                    }
                    if let Some(entry) = follow.get_mut(sym) {
                        for s in additions {
                            changed |= entry.insert(s);
                        }
                    }
                }
            }
        }
        if !changed {
            return follow;
        }
    }
}

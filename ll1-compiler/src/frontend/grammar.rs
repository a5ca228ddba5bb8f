//! Context-free grammar model.
//!
//! A [`Grammar`] maps each non-terminal to its ordered productions. It is
//! built once, either from the built-in language grammar or from a grammar
//! file in the same textual rule format, and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

const BUILTIN_GRAMMAR: &str = include_str!("language.grammar");

/// A grammar symbol, terminal or non-terminal. Equal iff the names match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Reserved name of the empty-production marker.
    pub const EPSILON: &'static str = "EPSILON";

    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn epsilon() -> Self {
        Symbol(Self::EPSILON.to_string())
    }

    pub fn is_epsilon(&self) -> bool {
        self.0 == Self::EPSILON
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol(s.to_string())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One right-hand side of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Production(Vec<Symbol>);

impl Production {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Production(symbols)
    }

    pub fn epsilon() -> Self {
        Production(vec![Symbol::epsilon()])
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for the empty production (`EPSILON` alone).
    pub fn is_epsilon(&self) -> bool {
        self.0.iter().all(Symbol::is_epsilon)
    }
}

impl<S: Into<Symbol>> FromIterator<S> for Production {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Production(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sym) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{sym}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("no FIRST set for symbol '{0}'")]
    MissingFirst(String),

    #[error("no FOLLOW set for non-terminal '{0}'")]
    MissingFollow(String),

    #[error("grammar line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("grammar has no rules")]
    Empty,

    #[error("rule '{rule}' uses EPSILON inside a longer production")]
    EpsilonInSequence { rule: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    start: Symbol,
    /// Non-terminals in declaration order.
    order: Vec<Symbol>,
    rules: BTreeMap<Symbol, Vec<Production>>,
}

impl Grammar {
    /// Build a grammar from `(name, productions)` pairs. The first rule is the
    /// start symbol; repeated names append to the earlier rule.
    pub fn new(rules: Vec<(Symbol, Vec<Production>)>) -> Result<Self, GrammarError> {
        let start = rules.first().map(|(name, _)| name.clone()).ok_or(GrammarError::Empty)?;
        let mut order = Vec::new();
        let mut map: BTreeMap<Symbol, Vec<Production>> = BTreeMap::new();

        for (name, productions) in rules {
            for p in &productions {
                if p.len() > 1 && p.symbols().iter().any(Symbol::is_epsilon) {
                    return Err(GrammarError::EpsilonInSequence {
                        rule: name.to_string(),
                    });
                }
            }
            if !map.contains_key(&name) {
                order.push(name.clone());
            }
            map.entry(name).or_default().extend(productions);
        }

        Ok(Self {
            start,
            order,
            rules: map,
        })
    }

    /// The grammar of the source language.
    pub fn builtin() -> Result<Self, GrammarError> {
        Self::parse(BUILTIN_GRAMMAR)
    }

    /// Parse the textual rule format:
    ///
    /// ```text
    /// Name -> A B | c | EPSILON
    ///      |  d
    /// ```
    ///
    /// `#` starts a comment and blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        let mut rules: Vec<(Symbol, Vec<Production>)> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            let (name, body) = if let Some(rest) = content.strip_prefix('|') {
                match rules.last() {
                    Some((name, _)) => (name.clone(), rest),
                    None => {
                        return Err(GrammarError::Malformed {
                            line,
                            message: "continuation line before any rule".to_string(),
                        })
                    }
                }
            } else {
                let (lhs, rhs) = content.split_once("->").ok_or_else(|| GrammarError::Malformed {
                    line,
                    message: format!("expected 'Name -> ...', found '{content}'"),
                })?;
                let lhs = lhs.trim();
                if lhs.is_empty() || lhs.contains(char::is_whitespace) {
                    return Err(GrammarError::Malformed {
                        line,
                        message: format!("invalid rule name '{lhs}'"),
                    });
                }
                rules.push((Symbol::new(lhs), Vec::new()));
                (Symbol::new(lhs), rhs)
            };

            let mut productions = Vec::new();
            for alternative in body.split('|') {
                let symbols: Vec<Symbol> = alternative.split_whitespace().map(Symbol::from).collect();
                if symbols.is_empty() {
                    return Err(GrammarError::Malformed {
                        line,
                        message: format!("empty alternative in rule '{name}' (write EPSILON)"),
                    });
                }
                productions.push(Production::new(symbols));
            }
            if let Some((_, existing)) = rules.last_mut() {
                existing.extend(productions);
            }
        }

        Self::new(rules)
    }

    pub fn start(&self) -> &Symbol {
        &self.start
    }

    pub fn is_nonterminal(&self, symbol: &Symbol) -> bool {
        self.rules.contains_key(symbol)
    }

    /// Non-terminals in declaration order.
    pub fn nonterminals(&self) -> impl Iterator<Item = &Symbol> {
        self.order.iter()
    }

    pub fn productions(&self, nonterminal: &Symbol) -> &[Production] {
        self.rules.get(nonterminal).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = (&Symbol, &[Production])> {
        self.order.iter().map(move |nt| (nt, self.productions(nt)))
    }

    /// Every symbol used on a right-hand side that has no rule of its own.
    pub fn terminals(&self) -> BTreeSet<Symbol> {
        self.rules
            .values()
            .flatten()
            .flat_map(|p| p.symbols())
            .filter(|s| !s.is_epsilon() && !self.is_nonterminal(s))
            .cloned()
            .collect()
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.rules()
            .map(|(nt, prods)| {
                let alternatives: Vec<String> = prods.iter().map(|p| p.to_string()).collect();
                format!("{nt} -> {}", alternatives.join(" | "))
            })
            .collect()
    }
}

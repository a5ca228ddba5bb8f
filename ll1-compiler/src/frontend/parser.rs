//! Table-driven predictive (LL(1)) parser.
//!
//! The derivation is simulated with two stacks kept in lock-step: pending
//! grammar symbols and the parse-tree nodes they will become. The tree is
//! materialized while parsing; no backtracking, one token of lookahead.

use std::collections::VecDeque;

use super::grammar::Symbol;
use super::lexer::Token;
use super::parse_tree::{NodeId, ParseTree};
use super::table::ParsingTable;
use crate::{CompileError, SyntaxErrorKind};

/// Pull-based token supply. Once input is exhausted an implementation keeps
/// returning its end-of-input token.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Token, CompileError>;
}

/// A pre-scanned token list; yields `EOF` forever after the last token.
pub struct TokenStream {
    tokens: VecDeque<Token>,
    eof_line: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof_line = tokens.last().map(|t| t.line).unwrap_or(1);
        Self {
            tokens: tokens.into(),
            eof_line,
        }
    }
}

impl TokenSource for TokenStream {
    fn next_token(&mut self) -> Result<Token, CompileError> {
        Ok(self
            .tokens
            .pop_front()
            .unwrap_or_else(|| Token::eof(self.eof_line)))
    }
}

pub struct PredictiveParser<'t> {
    table: &'t ParsingTable,
    start: Symbol,
}

impl<'t> PredictiveParser<'t> {
    pub fn new(table: &'t ParsingTable, start: Symbol) -> Self {
        Self { table, start }
    }

    /// Run the derivation to completion and return the parse tree.
    ///
    /// Parsing stops at the first error: a terminal on top of the stack that
    /// does not match the lookahead, or a non-terminal with no table entry
    /// for it.
    pub fn parse<S>(&self, source: &mut S) -> Result<ParseTree, CompileError>
    where
        S: TokenSource + ?Sized,
    {
        let (mut tree, start_node) = ParseTree::new(&self.start);
        let mut symbols: Vec<Symbol> = vec![self.start.clone()];
        let mut nodes: Vec<NodeId> = vec![start_node];
        let mut lookahead = source.next_token()?;
        let mut expansions = 0usize;

        while let (Some(top), Some(&node)) = (symbols.last(), nodes.last()) {
            if *top == lookahead.kind {
                symbols.pop();
                nodes.pop();
                let leaf = tree.node_mut(node);
                leaf.attribute = lookahead.attribute.take();
                leaf.line = Some(lookahead.line);
                log::trace!("match {} at line {}", lookahead.kind, lookahead.line);
                lookahead = source.next_token()?;
                continue;
            }

            if !self.table.is_nonterminal(top) {
                return Err(CompileError::Syntax {
                    kind: SyntaxErrorKind::TerminalMismatch,
                    line: lookahead.line,
                    message: format!("expected {top}, found {}", describe(&lookahead)),
                });
            }

            let Some(production) = self.table.lookup(top, &lookahead.kind) else {
                return Err(CompileError::Syntax {
                    kind: SyntaxErrorKind::NoProduction,
                    line: lookahead.line,
                    message: format!(
                        "no production for token {} while expanding {top}",
                        describe(&lookahead)
                    ),
                });
            };
            log::trace!("expand {top} -> {production} on {}", lookahead.kind);

            symbols.pop();
            nodes.pop();
            expansions += 1;

            // The popped node becomes the expansion point; children are added
            // left to right and pushed right to left.
            let children: Vec<(Symbol, NodeId)> = production
                .symbols()
                .iter()
                .map(|sym| (sym.clone(), tree.add_child(node, sym.clone())))
                .collect();
            for (sym, child) in children.into_iter().rev() {
                if sym.is_epsilon() {
                    continue;
                }
                symbols.push(sym);
                nodes.push(child);
            }
        }

        log::debug!(
            "parse finished: {expansions} expansions, {} tree nodes",
            tree.len()
        );
        Ok(tree)
    }
}

fn describe(token: &Token) -> String {
    match &token.attribute {
        Some(attr) => format!("{} '{}'", token.kind, attr),
        None => token.kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::first_follow::FirstFollowSets;
    use crate::frontend::grammar::Grammar;

    const BRACKETS: &str = "Start -> S EOF\nS -> LP S RP S | EPSILON\n";

    fn table(text: &str) -> (Grammar, ParsingTable) {
        let g = Grammar::parse(text).unwrap();
        let sets = FirstFollowSets::compute(&g);
        let t = ParsingTable::build(&g, &sets).unwrap();
        (g, t)
    }

    fn stream(kinds: &str) -> TokenStream {
        TokenStream::new(
            kinds
                .split_whitespace()
                .map(|k| Token::new(k, None, 1))
                .collect(),
        )
    }

    fn parse(text: &str, kinds: &str) -> Result<ParseTree, CompileError> {
        let (g, t) = table(text);
        PredictiveParser::new(&t, g.start().clone()).parse(&mut stream(kinds))
    }

    #[test]
    fn accepts_balanced_brackets() {
        for input in ["", "LP RP", "LP LP RP RP", "LP RP LP RP", "LP LP RP LP RP RP"] {
            assert!(parse(BRACKETS, input).is_ok(), "rejected '{input}'");
        }
    }

    #[test]
    fn rejects_unbalanced_brackets() {
        let unclosed = parse(BRACKETS, "LP LP RP").unwrap_err();
        assert!(matches!(
            unclosed,
            CompileError::Syntax {
                kind: SyntaxErrorKind::TerminalMismatch,
                ..
            }
        ));

        // S derives EPSILON on RP, leaving EOF on the stack to mismatch
        let stray = parse(BRACKETS, "LP RP RP").unwrap_err();
        assert!(matches!(
            stray,
            CompileError::Syntax {
                kind: SyntaxErrorKind::TerminalMismatch,
                ..
            }
        ));

        for input in ["RP", "ID"] {
            let err = parse(BRACKETS, input).unwrap_err();
            assert!(matches!(
                err,
                CompileError::Syntax {
                    kind: SyntaxErrorKind::NoProduction,
                    ..
                }
            ));
        }
    }

    #[test]
    fn tree_mirrors_the_derivation() {
        let tree = parse(BRACKETS, "LP RP").unwrap();
        let root = tree.root();
        assert_eq!(tree.label(root).as_str(), ParseTree::ROOT_LABEL);
        assert_eq!(tree.children(root).len(), 1);

        let start = tree.children(root)[0];
        assert_eq!(tree.children(start).len(), 2); // S EOF

        let s = tree.children(start)[0];
        let labels: Vec<&str> = tree
            .children(s)
            .iter()
            .map(|c| tree.label(*c).as_str())
            .collect();
        assert_eq!(labels, vec!["LP", "S", "RP", "S"]);

        // Both inner S nodes expanded to a recorded EPSILON child
        for inner in [tree.children(s)[1], tree.children(s)[3]] {
            let kids = tree.children(inner);
            assert_eq!(kids.len(), 1);
            assert!(tree.label(kids[0]).is_epsilon());
            assert!(tree.children(kids[0]).is_empty());
        }
    }

    #[test]
    fn every_expansion_has_one_child_per_production_symbol() {
        let (g, t) = table(BRACKETS);
        let tree = PredictiveParser::new(&t, g.start().clone())
            .parse(&mut stream("LP LP RP RP LP RP"))
            .unwrap();
        for i in 0..tree.len() {
            let id = NodeId(i);
            let label = tree.label(id);
            if !g.is_nonterminal(label) {
                continue;
            }
            let n = tree.children(id).len();
            let matches_a_production = g.productions(label).iter().any(|p| p.len() == n);
            assert!(matches_a_production, "{label} has {n} children");
        }
    }

    #[test]
    fn terminal_leaves_carry_attribute_and_line() {
        let (g, t) = table("S -> ID NUM EOF\n");
        let mut tokens = TokenStream::new(vec![
            Token::new("ID", Some("x".into()), 3),
            Token::new("NUM", Some("7".into()), 4),
        ]);
        let tree = PredictiveParser::new(&t, g.start().clone())
            .parse(&mut tokens)
            .unwrap();
        let leaves = tree.leaves(tree.root());
        assert_eq!(leaves[0].attribute.as_deref(), Some("x"));
        assert_eq!(leaves[0].line, Some(3));
        assert_eq!(leaves[1].attribute.as_deref(), Some("7"));
        assert_eq!(leaves[1].line, Some(4));
        // EOF was synthesized by the stream after the last real token
        assert_eq!(leaves[2].line, Some(4));
    }

    #[test]
    fn errors_report_the_lookahead_line() {
        let (g, t) = table("S -> ID EQ NUM EOF\n");
        let mut tokens = TokenStream::new(vec![
            Token::new("ID", Some("x".into()), 2),
            Token::new("NUM", Some("1".into()), 5),
        ]);
        let err = PredictiveParser::new(&t, g.start().clone())
            .parse(&mut tokens)
            .unwrap_err();
        match err {
            CompileError::Syntax { kind, line, message } => {
                assert_eq!(kind, SyntaxErrorKind::TerminalMismatch);
                assert_eq!(line, 5);
                assert_eq!(message, "expected EQ, found NUM '1'");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

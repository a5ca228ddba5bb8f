//! Front end: scanner, grammar model, FIRST/FOLLOW sets, LL(1) table and
//! the predictive parser that produces the parse tree.

pub mod first_follow;
pub mod grammar;
pub mod lexer;
pub mod parse_tree;
pub mod parser;
pub mod table;

pub use first_follow::{FirstFollowProvider, FirstFollowSets};
pub use grammar::{Grammar, GrammarError, Production, Symbol};
pub use lexer::{tokenize, LexicalError, Scanner, Token};
pub use parse_tree::{NodeId, ParseNode, ParseTree};
pub use parser::{PredictiveParser, TokenSource, TokenStream};
pub use table::{ParsingTable, TableConflict};

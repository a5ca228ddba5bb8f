pub mod frontend;
pub mod ir;
mod driver;

pub use driver::{compile_to_tac, Compiler, CompilerOptions};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error: {0}")]
    Lexical(#[from] frontend::lexer::LexicalError),

    #[error("Grammar error: {0}")]
    Grammar(#[from] frontend::grammar::GrammarError),

    #[error("SyntaxError:{kind} (line {line}) - {message}")]
    Syntax {
        kind: SyntaxErrorKind,
        line: usize,
        message: String,
    },

    #[error("Internal lowering error: {0}")]
    Lowering(#[from] ir::LoweringError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FIRST/FOLLOW document: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    /// Source line the error points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Lexical(e) => Some(e.line()),
            CompileError::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// The lookahead does not match the terminal on top of the stack.
    TerminalMismatch,
    /// No table entry for the non-terminal on top of the stack and the lookahead.
    NoProduction,
}

impl std::fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxErrorKind::TerminalMismatch => write!(f, "TerminalMismatch"),
            SyntaxErrorKind::NoProduction => write!(f, "NoProduction"),
        }
    }
}

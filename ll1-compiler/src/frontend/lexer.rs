use logos::Logos;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

use crate::frontend::grammar::Symbol;
use crate::frontend::parser::TokenSource;
use crate::CompileError;

/// Token kinds synthesized by the scanner rather than matched from text.
pub mod kind {
    pub const NEWLINE: &str = "NEWLINE";
    pub const BEGIN: &str = "BEGIN";
    pub const END: &str = "END";
    pub const EOF: &str = "EOF";
}

/// Columns a tab advances the indentation by.
const TAB_WIDTH: usize = 4;

#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\r]+")] // Whitespace inside a line
#[logos(skip r"#[^\n]*")] // Comments run to the end of the line
pub enum Lexeme {
    // --- Keywords ---
    #[token("def")]
    Def,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("do")]
    Do,
    #[token("until")]
    Until,
    #[token("return")]
    Return,
    #[token("int")]
    Int,
    #[token("char")]
    Char,

    // --- Identifiers and literals ---
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9]+", |lex| lex.slice().to_string())]
    Number(String),

    #[regex(r"'[^'\\\n]'", |lex| lex.slice().chars().nth(1))]
    CharLit(char),

    // --- Operators ---
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    #[token("not")]
    Not,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // --- Punctuation ---
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
}

impl Lexeme {
    /// The grammar terminal this lexeme is classified as.
    pub fn kind(&self) -> &'static str {
        match self {
            Lexeme::Def => "DEF",
            Lexeme::If => "IF",
            Lexeme::Elif => "ELIF",
            Lexeme::Else => "ELSE",
            Lexeme::While => "WHILE",
            Lexeme::For => "FOR",
            Lexeme::Do => "DO",
            Lexeme::Until => "UNTIL",
            Lexeme::Return => "RETURN",
            Lexeme::Int => "INT",
            Lexeme::Char => "CHAR",
            Lexeme::Ident(_) => "ID",
            Lexeme::Number(_) => "NUM",
            Lexeme::CharLit(_) => "CHARLIT",
            Lexeme::EqEq => "EQEQ",
            Lexeme::Ne => "NE",
            Lexeme::Le => "LE",
            Lexeme::Ge => "GE",
            Lexeme::Lt => "LT",
            Lexeme::Gt => "GT",
            Lexeme::And => "AND",
            Lexeme::Or => "OR",
            Lexeme::Not => "NOT",
            Lexeme::Inc => "INC",
            Lexeme::Dec => "DEC",
            Lexeme::Assign => "EQ",
            Lexeme::Plus => "PLUS",
            Lexeme::Minus => "MINUS",
            Lexeme::Star => "STAR",
            Lexeme::Slash => "SLASH",
            Lexeme::Percent => "PERCENT",
            Lexeme::LParen => "LPAREN",
            Lexeme::RParen => "RPAREN",
            Lexeme::Colon => "COLON",
            Lexeme::Comma => "COMMA",
            Lexeme::Semi => "SEMI",
        }
    }

    /// Literal text carried into the parse tree, if any.
    pub fn attribute(&self) -> Option<String> {
        match self {
            Lexeme::Ident(name) => Some(name.clone()),
            Lexeme::Number(digits) => Some(digits.clone()),
            Lexeme::CharLit(c) => Some(c.to_string()),
            _ => None,
        }
    }
}

/// A classified token as handed to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: Symbol,
    pub attribute: Option<String>,
    pub line: usize,
}

impl Token {
    pub fn new(kind: &str, attribute: Option<String>, line: usize) -> Self {
        Self {
            kind: Symbol::new(kind),
            attribute,
            line,
        }
    }

    pub fn eof(line: usize) -> Self {
        Self::new(kind::EOF, None, line)
    }

    pub fn is_eof(&self) -> bool {
        self.kind.as_str() == kind::EOF
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "{}({})", self.kind, attr),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexicalError {
    #[error("Unexpected character '{ch}' at line {line}, column {column}\n  Context: {context}")]
    UnexpectedChar {
        line: usize,
        column: usize,
        ch: char,
        context: String,
    },

    #[error("Inconsistent dedent at line {line}: indentation {width} matches no enclosing block")]
    InconsistentDedent { line: usize, width: usize },

    #[error("Reserved name '{name}' at line {line}, column {column}: temporaries, parameter slots and generated labels use this form")]
    ReservedName {
        line: usize,
        column: usize,
        name: String,
    },
}

impl LexicalError {
    pub fn line(&self) -> usize {
        match self {
            LexicalError::UnexpectedChar { line, .. } => *line,
            LexicalError::InconsistentDedent { line, .. } => *line,
            LexicalError::ReservedName { line, .. } => *line,
        }
    }
}

/// Whether `name` has the shape of a generated TAC name: `t<n>`,
/// `param<n>` or `L<n>`.
pub fn is_reserved_name(name: &str) -> bool {
    ["t", "param", "L"].iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    })
}

/// Width of the leading whitespace of `text`, expanding tabs.
pub fn indent_width(text: &str) -> usize {
    let mut width = 0;
    for ch in text.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += TAB_WIDTH - width % TAB_WIDTH,
            _ => break,
        }
    }
    width
}

/// Pull-based scanner over preprocessed source text.
///
/// Lines are read one at a time; the tokens of the current line are buffered
/// until the parser asks for them. Indentation changes become `BEGIN`/`END`
/// tokens and every non-blank line ends with `NEWLINE`. Once the input is
/// exhausted `EOF` is yielded forever.
pub struct Scanner<'source> {
    lines: std::iter::Enumerate<std::str::Lines<'source>>,
    indents: Vec<usize>,
    pending: VecDeque<Token>,
    last_line: usize,
    finished: bool,
}

impl<'source> Scanner<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            lines: source.lines().enumerate(),
            indents: vec![0],
            pending: VecDeque::new(),
            last_line: 1,
            finished: false,
        }
    }

    fn fill(&mut self) -> Result<(), LexicalError> {
        match self.lines.next() {
            Some((index, text)) => self.scan_line(index + 1, text),
            None => {
                // Close every block still open, then report EOF on the last line seen
                while self.indents.len() > 1 {
                    self.indents.pop();
                    self.pending
                        .push_back(Token::new(kind::END, None, self.last_line));
                }
                self.finished = true;
                Ok(())
            }
        }
    }

    fn scan_line(&mut self, line: usize, text: &str) -> Result<(), LexicalError> {
        let content = text.trim_start_matches([' ', '\t']);
        if content.trim().is_empty() || content.starts_with('#') {
            return Ok(());
        }
        self.last_line = line;

        self.adjust_indent(line, indent_width(text))?;

        let lead = text.len() - content.len();
        let mut lexer = Lexeme::lexer(content);
        while let Some(result) = lexer.next() {
            match result {
                Ok(Lexeme::Ident(name)) if is_reserved_name(&name) => {
                    return Err(LexicalError::ReservedName {
                        line,
                        column: lead + lexer.span().start + 1,
                        name,
                    });
                }
                Ok(lexeme) => {
                    self.pending
                        .push_back(Token::new(lexeme.kind(), lexeme.attribute(), line));
                }
                Err(()) => {
                    let span = lexer.span();
                    return Err(LexicalError::UnexpectedChar {
                        line,
                        column: lead + span.start + 1,
                        ch: content[span.start..].chars().next().unwrap_or('\0'),
                        context: text.trim().to_string(),
                    });
                }
            }
        }
        self.pending.push_back(Token::new(kind::NEWLINE, None, line));
        Ok(())
    }

    fn adjust_indent(&mut self, line: usize, width: usize) -> Result<(), LexicalError> {
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.pending.push_back(Token::new(kind::BEGIN, None, line));
            return Ok(());
        }
        while width < self.indents.last().copied().unwrap_or(0) {
            self.indents.pop();
            self.pending.push_back(Token::new(kind::END, None, line));
        }
        if self.indents.last().copied().unwrap_or(0) != width {
            return Err(LexicalError::InconsistentDedent { line, width });
        }
        Ok(())
    }
}

impl TokenSource for Scanner<'_> {
    fn next_token(&mut self) -> Result<Token, CompileError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            if self.finished {
                return Ok(Token::eof(self.last_line));
            }
            self.fill()?;
        }
    }
}

/// Scan the whole input, including the terminating `EOF`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut scanner = Scanner::new(source);
    let mut out = Vec::new();
    loop {
        let token = scanner.next_token()?;
        let done = token.is_eof();
        out.push(token);
        if done {
            return Ok(out);
        }
    }
}

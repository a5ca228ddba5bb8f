//! Closed classification of parse-tree labels.
//!
//! The generator dispatches on [`NodeKind`] instead of comparing label
//! strings, so a grammar symbol it does not know about is reported as a
//! [`LoweringError`] up front rather than falling through a string match.

use thiserror::Error;

use crate::frontend::grammar::Symbol;
use crate::frontend::parse_tree::ParseTree;

use super::tac::TacOp;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error("unexpected '{found}' while lowering {context}")]
    UnexpectedNode { context: &'static str, found: String },

    #[error("{context} node has no child {index}")]
    MissingChild { context: &'static str, index: usize },

    #[error("'{label}' leaf carries no literal")]
    MissingAttribute { label: String },

    #[error("invalid literal '{text}'")]
    BadLiteral { text: String },

    #[error("operator chain has {operators} operators for {operands} operands")]
    MalformedChain { operands: usize, operators: usize },
}

/// Terminal symbols of the built-in language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    Def,
    If,
    Elif,
    Else,
    While,
    For,
    Do,
    Until,
    Return,
    Int,
    Char,
    Id,
    Num,
    CharLit,
    EqEq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    And,
    Or,
    Not,
    Inc,
    Dec,
    Eq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Colon,
    Comma,
    Semi,
    Newline,
    Begin,
    End,
    Eof,
}

impl Terminal {
    pub fn from_name(name: &str) -> Option<Self> {
        use Terminal::*;
        Some(match name {
            "DEF" => Def,
            "IF" => If,
            "ELIF" => Elif,
            "ELSE" => Else,
            "WHILE" => While,
            "FOR" => For,
            "DO" => Do,
            "UNTIL" => Until,
            "RETURN" => Return,
            "INT" => Int,
            "CHAR" => Char,
            "ID" => Id,
            "NUM" => Num,
            "CHARLIT" => CharLit,
            "EQEQ" => EqEq,
            "NE" => Ne,
            "LE" => Le,
            "GE" => Ge,
            "LT" => Lt,
            "GT" => Gt,
            "AND" => And,
            "OR" => Or,
            "NOT" => Not,
            "INC" => Inc,
            "DEC" => Dec,
            "EQ" => Eq,
            "PLUS" => Plus,
            "MINUS" => Minus,
            "STAR" => Star,
            "SLASH" => Slash,
            "PERCENT" => Percent,
            "LPAREN" => LParen,
            "RPAREN" => RParen,
            "COLON" => Colon,
            "COMMA" => Comma,
            "SEMI" => Semi,
            "NEWLINE" => Newline,
            "BEGIN" => Begin,
            "END" => End,
            "EOF" => Eof,
            _ => return None,
        })
    }

    /// The TAC operator a binary-operator token lowers to.
    pub fn binary_op(self) -> Option<TacOp> {
        Some(match self {
            Terminal::Plus => TacOp::Add,
            Terminal::Minus => TacOp::Sub,
            Terminal::Star => TacOp::Mul,
            Terminal::Slash => TacOp::Div,
            Terminal::Percent => TacOp::Mod,
            Terminal::Lt => TacOp::Lt,
            Terminal::Le => TacOp::Le,
            Terminal::Gt => TacOp::Gt,
            Terminal::Ge => TacOp::Ge,
            Terminal::EqEq => TacOp::Eq,
            Terminal::Ne => TacOp::Ne,
            Terminal::And => TacOp::And,
            Terminal::Or => TacOp::Or,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Epsilon,
    Program,
    FuncList,
    FuncDef,
    Params,
    ParamTail,
    Param,
    Type,
    Block,
    BlockBody,
    StmtList,
    Stmt,
    SimpleStmt,
    Decl,
    DeclInit,
    IdSuffix,
    AssignOp,
    ReturnStmt,
    ReturnValue,
    IfStmt,
    ElifList,
    ElseOpt,
    WhileStmt,
    ForStmt,
    ForStep,
    DoStmt,
    Args,
    ArgTail,
    Expr,
    ExprTail,
    RelOp,
    ArithExpr,
    ArithTail,
    AddOp,
    Term,
    TermTail,
    MulOp,
    Factor,
    FactorTail,
    Terminal(Terminal),
}

impl NodeKind {
    pub fn from_label(label: &Symbol) -> Option<Self> {
        use NodeKind::*;
        Some(match label.as_str() {
            ParseTree::ROOT_LABEL => Root,
            Symbol::EPSILON => Epsilon,
            "Program" => Program,
            "FuncList" => FuncList,
            "FuncDef" => FuncDef,
            "Params" => Params,
            "ParamTail" => ParamTail,
            "Param" => Param,
            "Type" => Type,
            "Block" => Block,
            "BlockBody" => BlockBody,
            "StmtList" => StmtList,
            "Stmt" => Stmt,
            "SimpleStmt" => SimpleStmt,
            "Decl" => Decl,
            "DeclInit" => DeclInit,
            "IdSuffix" => IdSuffix,
            "AssignOp" => AssignOp,
            "ReturnStmt" => ReturnStmt,
            "ReturnValue" => ReturnValue,
            "IfStmt" => IfStmt,
            "ElifList" => ElifList,
            "ElseOpt" => ElseOpt,
            "WhileStmt" => WhileStmt,
            "ForStmt" => ForStmt,
            "ForStep" => ForStep,
            "DoStmt" => DoStmt,
            "Args" => Args,
            "ArgTail" => ArgTail,
            "Expr" => Expr,
            "ExprTail" => ExprTail,
            "RelOp" => RelOp,
            "ArithExpr" => ArithExpr,
            "ArithTail" => ArithTail,
            "AddOp" => AddOp,
            "Term" => Term,
            "TermTail" => TermTail,
            "MulOp" => MulOp,
            "Factor" => Factor,
            "FactorTail" => FactorTail,
            other => NodeKind::Terminal(self::Terminal::from_name(other)?),
        })
    }
}

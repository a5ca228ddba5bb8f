//! Parse tree to TAC lowering.
//!
//! A syntax-directed, single-pass translation: each node kind has one
//! lowering rule, and instructions are appended in emission order.

pub mod context;
pub mod expr;
pub mod stmt;

use crate::frontend::parse_tree::ParseTree;
use crate::ir::tac::TacProgram;
use crate::CompileError;

pub use context::{Gen, NameGen};

/// Lower a parse tree of the built-in grammar. `entry` names the function
/// that gets no synthesized default return.
pub fn lower(tree: &ParseTree, entry: &str) -> Result<TacProgram, CompileError> {
    let mut g = Gen::new(tree, entry);
    g.lower_program()?;
    let program = g.finish();
    log::debug!(
        "lowered {} functions to {} instructions",
        program.functions().len(),
        program.len()
    );
    Ok(program)
}

//! Compile driver: scan, parse and lower one source text.

use std::fs;
use std::path::PathBuf;

use crate::frontend::first_follow::{FirstFollowProvider, FirstFollowSets};
use crate::frontend::grammar::Grammar;
use crate::frontend::lexer::Scanner;
use crate::frontend::parse_tree::ParseTree;
use crate::frontend::parser::PredictiveParser;
use crate::frontend::table::ParsingTable;
use crate::ir::{self, TacProgram};
use crate::CompileError;

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Function that gets no synthesized default return.
    pub entry_function: String,
    /// Where to write the textual TAC dump after a successful compile.
    pub dump_path: Option<PathBuf>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            entry_function: "main".to_string(),
            dump_path: None,
        }
    }
}

/// Grammar and parsing table, built once and shared read-only by every
/// compile. Each [`Compiler::compile`] call lowers with its own generator.
#[derive(Debug, Clone)]
pub struct Compiler {
    grammar: Grammar,
    table: ParsingTable,
    options: CompilerOptions,
}

impl Compiler {
    /// Built-in grammar with FIRST/FOLLOW computed from it.
    pub fn new(options: CompilerOptions) -> Result<Self, CompileError> {
        let grammar = Grammar::builtin()?;
        let sets = FirstFollowSets::compute(&grammar);
        Self::with_grammar(grammar, &sets, options)
    }

    pub fn with_grammar<P>(grammar: Grammar, sets: &P, options: CompilerOptions) -> Result<Self, CompileError>
    where
        P: FirstFollowProvider + ?Sized,
    {
        let table = ParsingTable::build(&grammar, sets)?;
        log::info!(
            "parsing table ready: {} cells, {} overwritten",
            table.len(),
            table.conflicts().len()
        );
        Ok(Self {
            grammar,
            table,
            options,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn table(&self) -> &ParsingTable {
        &self.table
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn parse(&self, source: &str) -> Result<ParseTree, CompileError> {
        let mut scanner = Scanner::new(source);
        let tree = PredictiveParser::new(&self.table, self.grammar.start().clone()).parse(&mut scanner)?;
        log::info!("parsed {} tree nodes", tree.len());
        Ok(tree)
    }

    pub fn compile(&self, source: &str) -> Result<TacProgram, CompileError> {
        let tree = self.parse(source)?;
        let program = ir::lower(&tree, &self.options.entry_function)?;
        log::info!("generated {} TAC instructions", program.len());

        if let Some(path) = &self.options.dump_path {
            fs::write(path, program.dump_text())?;
            log::info!("wrote TAC dump to {}", path.display());
        }
        Ok(program)
    }
}

/// Compile with the built-in grammar and default options.
pub fn compile_to_tac(source: &str) -> Result<TacProgram, CompileError> {
    Compiler::new(CompilerOptions::default())?.compile(source)
}

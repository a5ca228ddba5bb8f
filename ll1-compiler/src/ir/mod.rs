//! Intermediate representation: the TAC model, its source map and the
//! generator that lowers parse trees to it.

pub mod ir_generator;
pub mod node_kind;
pub mod source_map;
pub mod tac;

pub use ir_generator::lower;
pub use node_kind::{LoweringError, NodeKind, Terminal};
pub use source_map::{ControlFlowComponent, Provenance, SourceMap};
pub use tac::{Operand, TacFunction, TacInstr, TacOp, TacProgram};

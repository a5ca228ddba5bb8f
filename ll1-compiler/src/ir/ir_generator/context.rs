use crate::frontend::parse_tree::{NodeId, ParseTree};
use crate::ir::node_kind::{LoweringError, NodeKind, Terminal};
use crate::ir::source_map::{ControlFlowComponent, Provenance};
use crate::ir::tac::{Operand, TacInstr, TacProgram};
use crate::CompileError;

/// Temporary and label counters. Owned by one generator; never shared.
#[derive(Debug, Clone, Default)]
pub struct NameGen {
    temps: usize,
    labels: usize,
}

impl NameGen {
    pub fn next_temp(&mut self) -> Operand {
        let t = Operand::Temp(self.temps);
        self.temps += 1;
        t
    }

    pub fn next_label(&mut self) -> String {
        let l = format!("L{}", self.labels);
        self.labels += 1;
        l
    }
}

#[derive(Debug, Clone)]
pub struct FunctionCtx {
    pub name: String,
    /// Index of the function's opening label.
    pub start: usize,
    pub had_return: bool,
}

pub struct Gen<'t> {
    pub tree: &'t ParseTree,
    pub entry: String,
    pub out: TacProgram,
    pub names: NameGen,
    pub fn_ctx: Option<FunctionCtx>,
    pub current_line: Option<usize>,
    pub component: Option<ControlFlowComponent>,
}

impl<'t> Gen<'t> {
    pub fn new(tree: &'t ParseTree, entry: impl Into<String>) -> Self {
        Self {
            tree,
            entry: entry.into(),
            out: TacProgram::new(),
            names: NameGen::default(),
            fn_ctx: None,
            current_line: None,
            component: None,
        }
    }

    pub fn finish(self) -> TacProgram {
        self.out
    }

    pub fn new_temp(&mut self) -> Operand {
        self.names.next_temp()
    }

    pub fn new_label(&mut self) -> String {
        self.names.next_label()
    }

    pub fn emit(&mut self, instr: TacInstr) {
        let index = self.out.instrs.len();
        self.out.dump.push(instr.dump_line());
        self.out.instrs.push(instr);
        self.out.source_map.add_mapping(
            index,
            Provenance {
                line: self.current_line,
                component: self.component,
            },
        );
    }

    /// Run `f` with instructions attributed to the first source line under `node`.
    pub fn with_line<F, R>(&mut self, node: NodeId, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let prev = self.current_line;
        if let Some(line) = self.tree.first_line(node) {
            self.current_line = Some(line);
        }
        let result = f(self);
        self.current_line = prev;
        result
    }

    pub fn with_component<F, R>(&mut self, component: ControlFlowComponent, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let prev = self.component;
        self.component = Some(component);
        let result = f(self);
        self.component = prev;
        result
    }

    pub fn kind(&self, node: NodeId) -> Result<NodeKind, CompileError> {
        let label = self.tree.label(node);
        NodeKind::from_label(label).ok_or_else(|| {
            LoweringError::UnexpectedNode {
                context: "parse tree",
                found: label.to_string(),
            }
            .into()
        })
    }

    pub fn child(&self, node: NodeId, index: usize, context: &'static str) -> Result<NodeId, CompileError> {
        self.tree
            .children(node)
            .get(index)
            .copied()
            .ok_or_else(|| LoweringError::MissingChild { context, index }.into())
    }

    /// The child at `index`, which must be of kind `expected`.
    pub fn expect(
        &self,
        node: NodeId,
        index: usize,
        expected: NodeKind,
        context: &'static str,
    ) -> Result<NodeId, CompileError> {
        let child = self.child(node, index, context)?;
        if self.kind(child)? == expected {
            Ok(child)
        } else {
            Err(self.unexpected(child, context))
        }
    }

    pub fn unexpected(&self, node: NodeId, context: &'static str) -> CompileError {
        LoweringError::UnexpectedNode {
            context,
            found: self.tree.label(node).to_string(),
        }
        .into()
    }

    /// The token literal on a leaf.
    pub fn attr(&self, node: NodeId) -> Result<&'t str, CompileError> {
        let tree: &'t ParseTree = self.tree;
        let n = tree.node(node);
        n.attribute.as_deref().ok_or_else(|| {
            LoweringError::MissingAttribute {
                label: n.label.to_string(),
            }
            .into()
        })
    }

    /// Name carried by the `ID` child at `index`.
    pub fn ident(&self, node: NodeId, index: usize, context: &'static str) -> Result<&'t str, CompileError> {
        let id = self.expect(node, index, NodeKind::Terminal(Terminal::Id), context)?;
        self.attr(id)
    }

    /// Whether `node` derived the empty production.
    pub fn is_empty(&self, node: NodeId) -> Result<bool, CompileError> {
        match self.tree.children(node).first() {
            Some(&first) => Ok(self.kind(first)? == NodeKind::Epsilon),
            None => Ok(false),
        }
    }

    /// Flatten a right-recursive list (`X -> ... X | EPSILON`) into its
    /// non-empty nodes, outermost first. The recursive child is the last one.
    pub fn unroll(&self, node: NodeId) -> Result<Vec<NodeId>, CompileError> {
        let kind = self.kind(node)?;
        let mut out = Vec::new();
        let mut cur = node;
        while !self.is_empty(cur)? {
            out.push(cur);
            match self.tree.children(cur).last() {
                Some(&next) if self.kind(next)? == kind => cur = next,
                _ => break,
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_monotonic_and_private_to_one_generator() {
        let mut a = NameGen::default();
        assert_eq!(a.next_temp(), Operand::Temp(0));
        assert_eq!(a.next_temp(), Operand::Temp(1));
        assert_eq!(a.next_label(), "L0");
        assert_eq!(a.next_label(), "L1");

        let mut b = NameGen::default();
        assert_eq!(b.next_temp(), Operand::Temp(0));
        assert_eq!(b.next_label(), "L0");
    }
}

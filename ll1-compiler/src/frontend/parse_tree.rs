//! Arena-backed parse tree.
//!
//! Nodes are addressed by [`NodeId`]; child lists hold ids, so a node is owned
//! by exactly one parent and the parser can expand a node in place.

use super::grammar::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub label: Symbol,
    /// Literal copied from the token that matched this leaf.
    pub attribute: Option<String>,
    /// Source line of the matching token, for terminals.
    pub line: Option<usize>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ParseTree {
    nodes: Vec<ParseNode>,
    root: NodeId,
}

impl ParseTree {
    /// Label of the synthetic root above the start symbol.
    pub const ROOT_LABEL: &'static str = "<root>";

    /// A tree holding the synthetic root and its single start-symbol child.
    pub fn new(start: &Symbol) -> (Self, NodeId) {
        let mut tree = ParseTree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = tree.alloc(Symbol::new(Self::ROOT_LABEL));
        tree.root = root;
        let child = tree.add_child(root, start.clone());
        (tree, child)
    }

    fn alloc(&mut self, label: Symbol) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ParseNode {
            label,
            attribute: None,
            line: None,
            children: Vec::new(),
        });
        id
    }

    pub fn add_child(&mut self, parent: NodeId, label: Symbol) -> NodeId {
        let id = self.alloc(label);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &ParseNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut ParseNode {
        &mut self.nodes[id.0]
    }

    pub fn label(&self, id: NodeId) -> &Symbol {
        &self.nodes[id.0].label
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Line of the first matched token at or below `id`.
    pub fn first_line(&self, id: NodeId) -> Option<usize> {
        let node = self.node(id);
        node.line
            .or_else(|| node.children.iter().find_map(|c| self.first_line(*c)))
    }

    /// Leaf nodes under `id`, left to right.
    pub fn leaves(&self, id: NodeId) -> Vec<&ParseNode> {
        let mut out = Vec::new();
        self.collect_leaves(id, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, id: NodeId, out: &mut Vec<&'a ParseNode>) {
        let node = self.node(id);
        if node.children.is_empty() {
            out.push(node);
        }
        for c in &node.children {
            self.collect_leaves(*c, out);
        }
    }

    /// Indented text rendering, two spaces per level.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root, 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        out.push_str(&"  ".repeat(depth));
        out.push_str(node.label.as_str());
        if let Some(attr) = &node.attribute {
            out.push('(');
            out.push_str(attr);
            out.push(')');
        }
        out.push('\n');
        for c in &node.children {
            self.render_node(*c, depth + 1, out);
        }
    }
}

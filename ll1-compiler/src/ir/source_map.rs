//! This module provides a `SourceMap` to keep track of the relationship between
//! TAC instructions and the source lines and control-flow parts they came from.

use std::collections::BTreeMap;

/// Which part of a control-flow construct produced an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFlowComponent {
    /// Condition of if/elif/while/for/until
    Condition,
    /// Body of an if or elif arm
    ThenBranch,
    /// Body of an else
    ElseBranch,
    /// Loop body of a while/for/do
    LoopBody,
    /// Labels and jumps gluing branches and loops together
    ControlFlowGlue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Provenance {
    pub line: Option<usize>,
    pub component: Option<ControlFlowComponent>,
}

/// `SourceMap` stores one [`Provenance`] per emitted instruction.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    mappings: Vec<Provenance>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(&mut self, instr_index: usize, provenance: Provenance) {
        if self.mappings.len() <= instr_index {
            self.mappings.resize_with(instr_index + 1, Default::default);
        }
        self.mappings[instr_index] = provenance;
    }

    pub fn get_mapping(&self, instr_index: usize) -> Option<&Provenance> {
        self.mappings.get(instr_index)
    }

    pub fn line_of(&self, instr_index: usize) -> Option<usize> {
        self.mappings.get(instr_index)?.line
    }

    pub fn get_instrs_for_line(&self, line: usize) -> Vec<usize> {
        self.mappings
            .iter()
            .enumerate()
            .filter(|(_, m)| m.line == Some(line))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn get_instrs_for_component(&self, component: ControlFlowComponent) -> Vec<usize> {
        self.mappings
            .iter()
            .enumerate()
            .filter(|(_, m)| m.component == Some(component))
            .map(|(i, _)| i)
            .collect()
    }

    /// Source line -> instruction indices, in line order.
    pub fn by_line(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut out: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, m) in self.mappings.iter().enumerate() {
            if let Some(line) = m.line {
                out.entry(line).or_default().push(i);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

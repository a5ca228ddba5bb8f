use super::context::Gen;
use crate::frontend::parse_tree::NodeId;
use crate::ir::node_kind::{LoweringError, NodeKind, Terminal};
use crate::ir::tac::{Operand, TacInstr, TacOp};
use crate::CompileError;

impl<'t> Gen<'t> {
    /// Lower `ArithExpr (RelOp ArithExpr)*` to a place.
    ///
    /// Every operand is lowered first; the operator chain is then reduced by
    /// precedence climbing, so comparisons group before `&&`/`||`.
    pub fn lower_expr(&mut self, expr: NodeId) -> Result<Operand, CompileError> {
        let head = self.expect(expr, 0, NodeKind::ArithExpr, "expression")?;
        let tail = self.expect(expr, 1, NodeKind::ExprTail, "expression")?;

        let mut operands = vec![self.lower_arith(head)?];
        let mut ops = Vec::new();
        for link in self.unroll(tail)? {
            let rel = self.expect(link, 0, NodeKind::RelOp, "relational chain")?;
            ops.push(self.operator(rel, "relational operator")?);
            let rhs = self.expect(link, 1, NodeKind::ArithExpr, "relational chain")?;
            operands.push(self.lower_arith(rhs)?);
        }
        self.reduce_chain(operands, ops)
    }

    /// Shunting-yard over already-lowered operands: before pushing an
    /// operator, pop and emit every stacked operator that binds at least as
    /// tightly.
    ///
    /// `operands` must hold exactly one more entry than `ops`.
    fn reduce_chain(&mut self, operands: Vec<Operand>, ops: Vec<TacOp>) -> Result<Operand, CompileError> {
        let malformed = LoweringError::MalformedChain {
            operands: operands.len(),
            operators: ops.len(),
        };
        if operands.len() != ops.len() + 1 {
            return Err(malformed.into());
        }

        let mut operands = operands.into_iter();
        let mut values: Vec<Operand> = operands.next().into_iter().collect();
        let mut stack: Vec<TacOp> = Vec::new();

        for (op, rhs) in ops.into_iter().zip(operands) {
            while let Some(&top) = stack.last() {
                if top.precedence() < op.precedence() {
                    break;
                }
                stack.pop();
                self.apply(top, &mut values, &malformed)?;
            }
            stack.push(op);
            values.push(rhs);
        }
        while let Some(top) = stack.pop() {
            self.apply(top, &mut values, &malformed)?;
        }
        match (values.pop(), values.is_empty()) {
            (Some(place), true) => Ok(place),
            _ => Err(malformed.into()),
        }
    }

    fn apply(&mut self, op: TacOp, values: &mut Vec<Operand>, malformed: &LoweringError) -> Result<(), CompileError> {
        let (Some(rhs), Some(lhs)) = (values.pop(), values.pop()) else {
            return Err(malformed.clone().into());
        };
        let t = self.new_temp();
        self.emit(TacInstr::binary(op, lhs, rhs, t.clone()));
        values.push(t);
        Ok(())
    }

    /// `Term (AddOp Term)*`, folded left to right.
    pub fn lower_arith(&mut self, arith: NodeId) -> Result<Operand, CompileError> {
        let head = self.expect(arith, 0, NodeKind::Term, "arithmetic expression")?;
        let tail = self.expect(arith, 1, NodeKind::ArithTail, "arithmetic expression")?;
        let mut acc = self.lower_term(head)?;
        for link in self.unroll(tail)? {
            let add = self.expect(link, 0, NodeKind::AddOp, "additive chain")?;
            let op = self.operator(add, "additive operator")?;
            let term = self.expect(link, 1, NodeKind::Term, "additive chain")?;
            let rhs = self.lower_term(term)?;
            acc = self.fold(op, acc, rhs);
        }
        Ok(acc)
    }

    /// `Factor (MulOp Factor)*`, folded left to right.
    pub fn lower_term(&mut self, term: NodeId) -> Result<Operand, CompileError> {
        let head = self.expect(term, 0, NodeKind::Factor, "term")?;
        let tail = self.expect(term, 1, NodeKind::TermTail, "term")?;
        let mut acc = self.lower_factor(head)?;
        for link in self.unroll(tail)? {
            let mul = self.expect(link, 0, NodeKind::MulOp, "multiplicative chain")?;
            let op = self.operator(mul, "multiplicative operator")?;
            let factor = self.expect(link, 1, NodeKind::Factor, "multiplicative chain")?;
            let rhs = self.lower_factor(factor)?;
            acc = self.fold(op, acc, rhs);
        }
        Ok(acc)
    }

    fn fold(&mut self, op: TacOp, lhs: Operand, rhs: Operand) -> Operand {
        let t = self.new_temp();
        self.emit(TacInstr::binary(op, lhs, rhs, t.clone()));
        t
    }

    pub fn lower_factor(&mut self, factor: NodeId) -> Result<Operand, CompileError> {
        let first = self.child(factor, 0, "factor")?;
        match self.kind(first)? {
            NodeKind::Terminal(Terminal::Id) => {
                let name = self.attr(first)?;
                let tail = self.expect(factor, 1, NodeKind::FactorTail, "factor")?;
                if self.is_empty(tail)? {
                    return Ok(Operand::name(name));
                }
                let args = self.expect(tail, 1, NodeKind::Args, "call")?;
                self.lower_call(name, args)
            }
            NodeKind::Terminal(Terminal::Num) => Ok(Operand::Num(self.attr(first)?.to_string())),
            NodeKind::Terminal(Terminal::CharLit) => {
                let text = self.attr(first)?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Operand::Char(c)),
                    _ => Err(LoweringError::BadLiteral { text: text.to_string() }.into()),
                }
            }
            NodeKind::Terminal(Terminal::LParen) => {
                let inner = self.expect(factor, 1, NodeKind::Expr, "parenthesized expression")?;
                self.lower_expr(inner)
            }
            NodeKind::Terminal(Terminal::Not) => {
                let operand = self.expect(factor, 1, NodeKind::Factor, "negation")?;
                let place = self.lower_factor(operand)?;
                let t = self.new_temp();
                self.emit(TacInstr::not(place, t.clone()));
                Ok(t)
            }
            _ => Err(self.unexpected(first, "factor")),
        }
    }

    /// A call used as a value: its result lands in a fresh temp.
    pub fn lower_call(&mut self, callee: &str, args: NodeId) -> Result<Operand, CompileError> {
        let argc = self.lower_params(args)?;
        let t = self.new_temp();
        self.emit(TacInstr::call(callee, argc, Some(t.clone())));
        Ok(t)
    }

    /// A call statement; the result is discarded.
    pub fn lower_call_stmt(&mut self, callee: &str, args: NodeId) -> Result<(), CompileError> {
        let argc = self.lower_params(args)?;
        self.emit(TacInstr::call(callee, argc, None));
        Ok(())
    }

    /// Evaluate every argument left to right, then emit one `param` each.
    fn lower_params(&mut self, args: NodeId) -> Result<usize, CompileError> {
        let places = self.lower_args(args)?;
        let argc = places.len();
        for place in places {
            self.emit(TacInstr::param(place));
        }
        Ok(argc)
    }

    fn lower_args(&mut self, args: NodeId) -> Result<Vec<Operand>, CompileError> {
        if self.is_empty(args)? {
            return Ok(Vec::new());
        }
        let first = self.expect(args, 0, NodeKind::Expr, "argument list")?;
        let mut places = vec![self.lower_expr(first)?];
        let tail = self.expect(args, 1, NodeKind::ArgTail, "argument list")?;
        for link in self.unroll(tail)? {
            let expr = self.expect(link, 1, NodeKind::Expr, "argument list")?;
            places.push(self.lower_expr(expr)?);
        }
        Ok(places)
    }

    /// The TAC operator named by a single-token operator node.
    fn operator(&self, node: NodeId, context: &'static str) -> Result<TacOp, CompileError> {
        let token = self.child(node, 0, context)?;
        match self.kind(token)? {
            NodeKind::Terminal(t) => t.binary_op().ok_or_else(|| self.unexpected(token, context)),
            _ => Err(self.unexpected(token, context)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_tree::ParseTree;

    fn try_reduce(operands: &[&str], ops: &[TacOp]) -> Result<Vec<String>, CompileError> {
        let (tree, _) = ParseTree::new(&"Program".into());
        let mut g = Gen::new(&tree, "main");
        g.reduce_chain(
            operands.iter().map(|s| Operand::name(*s)).collect(),
            ops.to_vec(),
        )?;
        Ok(g.finish().to_lines())
    }

    fn reduce(operands: &[&str], ops: &[TacOp]) -> Vec<String> {
        try_reduce(operands, ops).unwrap()
    }

    #[test]
    fn comparisons_reduce_before_boolean_operators() {
        assert_eq!(
            reduce(&["a", "b", "c", "d"], &[TacOp::Lt, TacOp::And, TacOp::Lt]),
            vec!["t0 = a < b", "t1 = c < d", "t2 = t0 && t1"]
        );
    }

    #[test]
    fn equal_precedence_groups_left() {
        assert_eq!(
            reduce(&["a", "b", "c"], &[TacOp::And, TacOp::Or]),
            vec!["t0 = a && b", "t1 = t0 || c"]
        );
        assert_eq!(
            reduce(&["a", "b", "c", "d", "e"], &[TacOp::Lt, TacOp::And, TacOp::Lt, TacOp::Or]),
            vec![
                "t0 = a < b",
                "t1 = c < d",
                "t2 = t0 && t1",
                "t3 = t2 || e",
            ]
        );
    }

    #[test]
    fn boolean_then_comparison_defers_the_boolean() {
        assert_eq!(
            reduce(&["a", "b", "c"], &[TacOp::Or, TacOp::Eq]),
            vec!["t0 = b == c", "t1 = a || t0"]
        );
    }

    #[test]
    fn single_operand_emits_nothing() {
        assert!(reduce(&["a"], &[]).is_empty());
    }

    #[test]
    fn operand_count_mismatch_is_a_lowering_error() {
        for (operands, ops) in [
            (&["a"][..], &[TacOp::Lt][..]),
            (&["a", "b"][..], &[][..]),
            (&[][..], &[][..]),
        ] {
            let err = try_reduce(operands, ops).unwrap_err();
            assert!(
                matches!(
                    err,
                    CompileError::Lowering(LoweringError::MalformedChain { .. })
                ),
                "{operands:?} {ops:?}: {err}"
            );
        }
    }
}

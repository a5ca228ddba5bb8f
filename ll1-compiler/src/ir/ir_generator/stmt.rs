use super::context::{FunctionCtx, Gen};
use crate::frontend::parse_tree::NodeId;
use crate::ir::node_kind::{NodeKind, Terminal};
use crate::ir::source_map::ControlFlowComponent;
use crate::ir::tac::{Operand, TacInstr, TacOp};
use crate::CompileError;

impl<'t> Gen<'t> {
    pub fn lower_program(&mut self) -> Result<(), CompileError> {
        let root = self.tree.root();
        let program = self.expect(root, 0, NodeKind::Program, "root")?;
        let funcs = self.expect(program, 0, NodeKind::FuncList, "program")?;
        for list in self.unroll(funcs)? {
            let def = self.expect(list, 0, NodeKind::FuncDef, "function list")?;
            self.with_line(def, |this| this.lower_function(def))?;
        }
        Ok(())
    }

    /// `label f`, parameter moves, body, default return, `label end_f`.
    pub fn lower_function(&mut self, def: NodeId) -> Result<(), CompileError> {
        let name = self.ident(def, 1, "function definition")?;
        log::debug!("lowering function '{name}'");

        let start = self.out.instrs.len();
        self.emit(TacInstr::label(name));
        self.fn_ctx = Some(FunctionCtx {
            name: name.to_string(),
            start,
            had_return: false,
        });

        let params = self.expect(def, 3, NodeKind::Params, "function definition")?;
        for (i, param_name) in self.param_names(params)?.into_iter().enumerate() {
            self.emit(TacInstr::assign(
                Operand::name(param_name),
                Operand::Param(i + 1),
            ));
        }

        let block = self.expect(def, 5, NodeKind::Block, "function definition")?;
        self.lower_block(block)?;

        let ctx = self.fn_ctx.take();
        let had_return = ctx.as_ref().is_some_and(|c| c.had_return);
        if name != self.entry && !had_return {
            let value = self.default_return_value(start);
            log::debug!("'{name}' has no return; synthesizing 'return {value}'");
            self.emit(TacInstr::ret(Some(value)));
        }

        self.emit(TacInstr::label(format!("end_{name}")));
        Ok(())
    }

    fn param_names(&self, params: NodeId) -> Result<Vec<&'t str>, CompileError> {
        if self.is_empty(params)? {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        let first = self.expect(params, 0, NodeKind::Param, "parameter list")?;
        names.push(self.ident(first, 1, "parameter")?);

        let tail = self.expect(params, 1, NodeKind::ParamTail, "parameter list")?;
        for link in self.unroll(tail)? {
            let param = self.expect(link, 1, NodeKind::Param, "parameter list")?;
            names.push(self.ident(param, 1, "parameter")?);
        }
        Ok(names)
    }

    /// The most recently assigned named variable in the current function,
    /// else literal `0`.
    fn default_return_value(&self, start: usize) -> Operand {
        self.out.instrs[start..]
            .iter()
            .rev()
            .find_map(|ins| match (&ins.op, &ins.result) {
                (TacOp::Assign, Some(target @ Operand::Name(_))) => Some(target.clone()),
                _ => None,
            })
            .unwrap_or(Operand::Imm(0))
    }

    pub fn lower_block(&mut self, block: NodeId) -> Result<(), CompileError> {
        let body = self.expect(block, 1, NodeKind::BlockBody, "block")?;
        let first = self.child(body, 0, "block body")?;
        match self.kind(first)? {
            NodeKind::Terminal(Terminal::Newline) => {
                let list = self.expect(body, 2, NodeKind::StmtList, "block body")?;
                for link in self.unroll(list)? {
                    let stmt = self.expect(link, 0, NodeKind::Stmt, "statement list")?;
                    self.with_line(stmt, |this| this.lower_stmt(stmt))?;
                }
                Ok(())
            }
            NodeKind::SimpleStmt => self.with_line(first, |this| this.lower_simple_stmt(first)),
            _ => Err(self.unexpected(first, "block body")),
        }
    }

    pub fn lower_stmt(&mut self, stmt: NodeId) -> Result<(), CompileError> {
        let inner = self.child(stmt, 0, "statement")?;
        match self.kind(inner)? {
            NodeKind::SimpleStmt => self.lower_simple_stmt(inner),
            NodeKind::IfStmt => self.lower_if(inner),
            NodeKind::WhileStmt => self.lower_while(inner),
            NodeKind::ForStmt => self.lower_for(inner),
            NodeKind::DoStmt => self.lower_do(inner),
            _ => Err(self.unexpected(inner, "statement")),
        }
    }

    pub fn lower_simple_stmt(&mut self, stmt: NodeId) -> Result<(), CompileError> {
        let first = self.child(stmt, 0, "simple statement")?;
        match self.kind(first)? {
            NodeKind::Decl => self.lower_decl(first),
            NodeKind::ReturnStmt => self.lower_return(first),
            NodeKind::Terminal(Terminal::Id) => {
                let name = self.attr(first)?;
                let suffix = self.expect(stmt, 1, NodeKind::IdSuffix, "simple statement")?;
                let inner = self.child(suffix, 0, "identifier suffix")?;
                match self.kind(inner)? {
                    NodeKind::AssignOp => self.lower_assign_op(name, inner),
                    NodeKind::Terminal(Terminal::LParen) => {
                        let args = self.expect(suffix, 1, NodeKind::Args, "call")?;
                        self.lower_call_stmt(name, args)
                    }
                    _ => Err(self.unexpected(inner, "identifier suffix")),
                }
            }
            _ => Err(self.unexpected(first, "simple statement")),
        }
    }

    /// `Type ID [= Expr]`; a declaration without initializer emits nothing.
    pub fn lower_decl(&mut self, decl: NodeId) -> Result<(), CompileError> {
        let name = self.ident(decl, 1, "declaration")?;
        let init = self.expect(decl, 2, NodeKind::DeclInit, "declaration")?;
        if self.is_empty(init)? {
            return Ok(());
        }
        let expr = self.expect(init, 1, NodeKind::Expr, "initializer")?;
        let place = self.lower_expr(expr)?;
        self.emit(TacInstr::assign(Operand::name(name), place));
        Ok(())
    }

    /// `= Expr`, `++` or `--` applied to `target`.
    pub fn lower_assign_op(&mut self, target: &str, op: NodeId) -> Result<(), CompileError> {
        let first = self.child(op, 0, "assignment")?;
        let step = match self.kind(first)? {
            NodeKind::Terminal(Terminal::Eq) => {
                let expr = self.expect(op, 1, NodeKind::Expr, "assignment")?;
                let place = self.lower_expr(expr)?;
                self.emit(TacInstr::assign(Operand::name(target), place));
                return Ok(());
            }
            NodeKind::Terminal(Terminal::Inc) => TacOp::Add,
            NodeKind::Terminal(Terminal::Dec) => TacOp::Sub,
            _ => return Err(self.unexpected(first, "assignment")),
        };
        let t = self.new_temp();
        self.emit(TacInstr::binary(
            step,
            Operand::name(target),
            Operand::Imm(1),
            t.clone(),
        ));
        self.emit(TacInstr::assign(Operand::name(target), t));
        Ok(())
    }

    pub fn lower_return(&mut self, ret: NodeId) -> Result<(), CompileError> {
        let value = self.expect(ret, 1, NodeKind::ReturnValue, "return")?;
        let place = if self.is_empty(value)? {
            None
        } else {
            let expr = self.expect(value, 0, NodeKind::Expr, "return")?;
            Some(self.lower_expr(expr)?)
        };
        self.emit(TacInstr::ret(place));
        if let Some(ctx) = self.fn_ctx.as_mut() {
            ctx.had_return = true;
        }
        Ok(())
    }

    /// `if` / `elif`* / `else`?: each arm tests its condition and jumps to
    /// the next arm when false; every arm body ends with a jump to the shared
    /// end, including a last arm whose false jump already targets it.
    pub fn lower_if(&mut self, stmt: NodeId) -> Result<(), CompileError> {
        let end = self.new_label();

        let mut arms = vec![(
            self.expect(stmt, 2, NodeKind::Expr, "if")?,
            self.expect(stmt, 4, NodeKind::Block, "if")?,
        )];
        let elifs = self.expect(stmt, 5, NodeKind::ElifList, "if")?;
        for elif in self.unroll(elifs)? {
            arms.push((
                self.expect(elif, 2, NodeKind::Expr, "elif")?,
                self.expect(elif, 4, NodeKind::Block, "elif")?,
            ));
        }
        let else_opt = self.expect(stmt, 6, NodeKind::ElseOpt, "if")?;
        let else_block = if self.is_empty(else_opt)? {
            None
        } else {
            Some(self.expect(else_opt, 1, NodeKind::Block, "else")?)
        };

        let count = arms.len();
        for (i, (cond, block)) in arms.into_iter().enumerate() {
            let falls_to_end = i + 1 == count && else_block.is_none();
            let next = if falls_to_end {
                end.clone()
            } else {
                self.new_label()
            };

            self.with_line(cond, |this| {
                this.with_component(ControlFlowComponent::Condition, |this| {
                    let place = this.lower_expr(cond)?;
                    this.emit(TacInstr::if_false(place, next.clone()));
                    Ok::<(), CompileError>(())
                })
            })?;
            self.with_component(ControlFlowComponent::ThenBranch, |this| this.lower_block(block))?;

            self.with_component(ControlFlowComponent::ControlFlowGlue, |this| {
                this.emit(TacInstr::goto(end.clone()));
                if !falls_to_end {
                    this.emit(TacInstr::label(next));
                }
            });
        }

        if let Some(block) = else_block {
            self.with_component(ControlFlowComponent::ElseBranch, |this| this.lower_block(block))?;
        }
        self.with_component(ControlFlowComponent::ControlFlowGlue, |this| {
            this.emit(TacInstr::label(end))
        });
        Ok(())
    }

    pub fn lower_while(&mut self, stmt: NodeId) -> Result<(), CompileError> {
        let cond = self.expect(stmt, 2, NodeKind::Expr, "while")?;
        let body = self.expect(stmt, 4, NodeKind::Block, "while")?;
        let start = self.new_label();
        let end = self.new_label();

        self.emit_glue(TacInstr::label(start.clone()));
        self.lower_loop_test(cond, end.clone())?;
        self.with_component(ControlFlowComponent::LoopBody, |this| this.lower_block(body))?;
        self.emit_glue(TacInstr::goto(start));
        self.emit_glue(TacInstr::label(end));
        Ok(())
    }

    /// The initializer runs once before the loop; the step runs after the
    /// body on every iteration.
    pub fn lower_for(&mut self, stmt: NodeId) -> Result<(), CompileError> {
        let init = self.expect(stmt, 2, NodeKind::Decl, "for")?;
        let cond = self.expect(stmt, 4, NodeKind::Expr, "for")?;
        let step = self.expect(stmt, 6, NodeKind::ForStep, "for")?;
        let body = self.expect(stmt, 8, NodeKind::Block, "for")?;

        self.lower_decl(init)?;
        let start = self.new_label();
        let end = self.new_label();

        self.emit_glue(TacInstr::label(start.clone()));
        self.lower_loop_test(cond, end.clone())?;
        self.with_component(ControlFlowComponent::LoopBody, |this| {
            this.lower_block(body)?;
            let target = this.ident(step, 0, "for step")?;
            let op = this.expect(step, 1, NodeKind::AssignOp, "for step")?;
            this.lower_assign_op(target, op)
        })?;
        self.emit_glue(TacInstr::goto(start));
        self.emit_glue(TacInstr::label(end));
        Ok(())
    }

    /// Body first, then the test; a false `until` condition loops back.
    pub fn lower_do(&mut self, stmt: NodeId) -> Result<(), CompileError> {
        let body = self.expect(stmt, 1, NodeKind::Block, "do")?;
        let cond = self.expect(stmt, 4, NodeKind::Expr, "do")?;
        let start = self.new_label();

        self.emit_glue(TacInstr::label(start.clone()));
        self.with_component(ControlFlowComponent::LoopBody, |this| this.lower_block(body))?;
        self.with_line(cond, |this| this.lower_loop_test(cond, start))
    }

    fn lower_loop_test(&mut self, cond: NodeId, target: String) -> Result<(), CompileError> {
        self.with_component(ControlFlowComponent::Condition, |this| {
            let place = this.lower_expr(cond)?;
            this.emit(TacInstr::if_false(place, target));
            Ok::<(), CompileError>(())
        })
    }

    fn emit_glue(&mut self, instr: TacInstr) {
        self.with_component(ControlFlowComponent::ControlFlowGlue, |this| this.emit(instr));
    }
}

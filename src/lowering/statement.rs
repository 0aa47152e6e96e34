// src/lowering/statement.rs

use super::expression::{binary_opcode, lower_assignment};
use super::{LowerAst, LowerCtx, LoopLabels, LoweringError};
use crate::ir::{Instruction, Opcode, Value};
use crate::parser::ast::*;

impl LowerAst for Stmt {
    type Output = ();

    fn lower(&self, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
        match &self.kind {
            StmtKind::VarDecl(decl) => {
                let offset = ctx.frame.allocate(&decl.name.name);
                if let Some(init) = &decl.initializer {
                    init.lower(ctx)?;
                    ctx.store(Value::Slot(offset));
                }
                Ok(())
            }
            StmtKind::Function(_) => Err(LoweringError::Unsupported {
                construct: "nested function declarations",
                span: self.span,
            }),
            StmtKind::Class(_) => Err(LoweringError::Unsupported {
                construct: "class declarations",
                span: self.span,
            }),
            StmtKind::If(stmt) => lower_if(stmt, ctx),
            StmtKind::For(stmt) => lower_for(stmt, self, ctx),
            StmtKind::While(stmt) => lower_while(stmt, ctx),
            StmtKind::DoWhile(stmt) => lower_do_while(stmt, ctx),
            StmtKind::Try(_) => Err(LoweringError::Unsupported {
                construct: "try statements",
                span: self.span,
            }),
            StmtKind::Throw(_) => Err(LoweringError::Unsupported {
                construct: "throw statements",
                span: self.span,
            }),
            StmtKind::Return(value) => {
                match value {
                    Some(value) => value.lower(ctx)?,
                    None => ctx.constant(Value::Int(0)),
                }
                ctx.ret();
                Ok(())
            }
            StmtKind::Break => {
                let target = innermost_loop(ctx, "break", self)?.break_label;
                ctx.jump(&target);
                Ok(())
            }
            StmtKind::Continue => {
                let target = innermost_loop(ctx, "continue", self)?.continue_label;
                ctx.jump(&target);
                Ok(())
            }
            StmtKind::Assign(assign) => lower_assignment(&assign.target, assign.op, &assign.value, ctx),
            StmtKind::Expr(expr) => expr.lower(ctx),
            StmtKind::Block(block) => block.lower(ctx),
            StmtKind::Embed(embed) => {
                ctx.emit(
                    Instruction::new(Opcode::Inline)
                        .with_src1(Value::Text(embed.language.clone()))
                        .with_src2(Value::Text(embed.code.clone())),
                );
                Ok(())
            }
        }
    }
}

impl LowerAst for Block {
    type Output = ();

    fn lower(&self, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
        ctx.frame.enter_scope();
        ctx.lower_statements(&self.statements);
        ctx.frame.exit_scope();
        Ok(())
    }
}

fn innermost_loop(ctx: &LowerCtx<'_>, keyword: &'static str, stmt: &Stmt) -> Result<LoopLabels, LoweringError> {
    ctx.loops
        .last()
        .cloned()
        .ok_or(LoweringError::OutsideLoop {
            keyword,
            span: stmt.span,
        })
}

/// Runs `body` with `labels` as the innermost loop.
fn in_loop(ctx: &mut LowerCtx<'_>, labels: LoopLabels, body: &Block) -> Result<(), LoweringError> {
    ctx.loops.push(labels);
    let result = body.lower(ctx);
    ctx.loops.pop();
    result
}

// cond; JUMP_IF_NOT else; then; JUMP end; else:; else-branch; end:
fn lower_if(stmt: &IfStmt, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
    let [else_label, end_label] = ctx.fresh_labels(["L_ELSE", "L_END_IF"]);

    // 1. Condition into r0, then branch away when it is false.
    stmt.condition.lower(ctx)?;
    // 2. Without an else branch the false edge goes straight to the end label.
    match &stmt.else_branch {
        Some(else_branch) => {
            ctx.jump_if_not(&else_label);
            stmt.then_block.lower(ctx)?;
            ctx.jump(&end_label);
            ctx.label(&else_label);
            else_branch.lower(ctx)?;
        }
        None => {
            ctx.jump_if_not(&end_label);
            stmt.then_block.lower(ctx)?;
        }
    }
    ctx.label(&end_label);
    Ok(())
}

// start:; cond; JUMP_IF_NOT end; body; JUMP start; end:
fn lower_while(stmt: &WhileStmt, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
    let [start_label, end_label] = ctx.fresh_labels(["L_WHILE_START", "L_WHILE_END"]);

    // The condition is re-evaluated on every pass, so it sits after the start label.
    ctx.label(&start_label);
    stmt.condition.lower(ctx)?;
    ctx.jump_if_not(&end_label);
    let labels = LoopLabels {
        continue_label: start_label.clone(),
        break_label: end_label.clone(),
    };
    in_loop(ctx, labels, &stmt.body)?;
    ctx.jump(&start_label);
    ctx.label(&end_label);
    Ok(())
}

/// The body runs once before the first test. `continue` jumps to the test, not the top.
fn lower_do_while(stmt: &DoWhileStmt, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
    let [start_label, cond_label, end_label] = ctx.fresh_labels(["L_DO_START", "L_DO_COND", "L_DO_END"]);

    ctx.label(&start_label);
    let labels = LoopLabels {
        continue_label: cond_label.clone(),
        break_label: end_label.clone(),
    };
    in_loop(ctx, labels, &stmt.body)?;
    ctx.label(&cond_label);
    stmt.condition.lower(ctx)?;
    ctx.jump_if_not(&end_label);
    ctx.jump(&start_label);
    ctx.label(&end_label);
    Ok(())
}

/// `for i in range(a, b)` becomes a counted loop over `[a, b)`, with `b`
/// evaluated once into a hidden slot.
fn lower_for(stmt: &ForStmt, node: &Stmt, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
    let ForIterable::Range(range) = &stmt.iterable else {
        return Err(LoweringError::Unsupported {
            construct: "iteration over collections",
            span: node.span,
        });
    };

    // The counter is only visible inside the loop.
    ctx.frame.enter_scope();
    let result = lower_counted_loop(stmt, range, ctx);
    ctx.frame.exit_scope();
    result
}

fn lower_counted_loop(stmt: &ForStmt, range: &RangeExpr, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
    let [start_label, step_label, end_label] = ctx.fresh_labels(["L_FOR_START", "L_FOR_STEP", "L_FOR_END"]);
    let counter_offset = ctx.frame.reserve(&stmt.variable.name);
    let counter = Value::Slot(counter_offset);
    let bound = Value::Slot(ctx.frame.allocate_hidden("range_end"));

    // 1. Initialize the counter and the bound. Both are evaluated before the loop
    //    variable comes into scope.
    match &range.start {
        Some(start) => start.lower(ctx)?,
        None => ctx.constant(Value::Int(0)),
    }
    ctx.store(counter.clone());
    range.end.lower(ctx)?;
    ctx.store(bound.clone());
    ctx.frame.bind(&stmt.variable.name, counter_offset);

    // 2. Test `counter < bound` at the top of every pass.
    ctx.label(&start_label);
    ctx.load(counter.clone());
    ctx.push();
    ctx.load(bound);
    ctx.combine(binary_opcode(BinaryOp::Lt));
    ctx.jump_if_not(&end_label);

    let labels = LoopLabels {
        continue_label: step_label.clone(),
        break_label: end_label.clone(),
    };
    // 3. The body. `continue` lands on the step, so the counter still advances.
    in_loop(ctx, labels, &stmt.body)?;

    // 4. Step and loop back.
    ctx.label(&step_label);
    ctx.load(counter.clone());
    ctx.push();
    ctx.constant(Value::Int(1));
    ctx.combine(binary_opcode(BinaryOp::Add));
    ctx.store(counter);
    ctx.jump(&start_label);
    ctx.label(&end_label);
    Ok(())
}

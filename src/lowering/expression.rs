// src/lowering/expression.rs

use super::{LowerAst, LowerCtx, LoweringError};
use crate::analyzer::{DataType, number_type};
use crate::ir::{Instruction, Opcode, PrintFormat, Value};
use crate::parser::ast::*;

const PRINT: &str = "print";

impl LowerAst for Expr {
    type Output = ();

    /// Leaves the expression's value in the accumulator.
    fn lower(&self, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
        match &self.kind {
            ExprKind::Literal(literal) => lower_literal(literal, self, ctx),
            ExprKind::Identifier(name) => {
                let place = ctx.place_of(name, self.span)?;
                ctx.load(place);
                Ok(())
            }
            ExprKind::Binary { op, left, right } => {
                left.lower(ctx)?;
                ctx.push();
                right.lower(ctx)?;
                ctx.combine(binary_opcode(*op));
                Ok(())
            }
            ExprKind::Unary { op, operand } => {
                operand.lower(ctx)?;
                let opcode = match op {
                    UnaryOp::Not => Opcode::Not,
                    UnaryOp::Neg => Opcode::Neg,
                };
                ctx.emit(Instruction::new(opcode).with_dest(Value::acc()).with_src1(Value::acc()));
                Ok(())
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                let [else_label, end_label] = ctx.fresh_labels(["L_TERN_ELSE", "L_TERN_END"]);
                condition.lower(ctx)?;
                ctx.jump_if_not(&else_label);
                then_branch.lower(ctx)?;
                ctx.jump(&end_label);
                ctx.label(&else_label);
                else_branch.lower(ctx)?;
                ctx.label(&end_label);
                Ok(())
            }
            ExprKind::Assign { target, value } => lower_assignment(target, None, value, ctx),
            ExprKind::Call { callee, args } => lower_call(callee, args, self, ctx),
            ExprKind::Member { .. } => Err(unsupported("member access", self)),
            ExprKind::Index { .. } => Err(unsupported("index access", self)),
            ExprKind::Array(_) => Err(unsupported("array literals", self)),
            ExprKind::Object(_) => Err(unsupported("object literals", self)),
        }
    }
}

fn unsupported(construct: &'static str, expr: &Expr) -> LoweringError {
    LoweringError::Unsupported {
        construct,
        span: expr.span,
    }
}

pub(super) fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Ge => Opcode::Ge,
        BinaryOp::And => Opcode::And,
        BinaryOp::Or => Opcode::Or,
    }
}

fn lower_literal(literal: &Literal, expr: &Expr, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
    let value = match literal {
        Literal::Number(text) => number_value(text).ok_or(LoweringError::Unsupported {
            construct: "malformed numeric literals",
            span: expr.span,
        })?,
        Literal::Str(text) => Value::Str(ctx.intern(text)),
        Literal::Bool(flag) => Value::Int(i64::from(*flag)),
        Literal::Null => Value::Int(0),
    };
    ctx.constant(value);
    Ok(())
}

/// The lexer has already rejected literals that do not fit, so `None` here means the
/// tree did not come from `tokenize`.
fn number_value(text: &str) -> Option<Value> {
    match number_type(text) {
        DataType::Int => {
            let (negative, digits) = match text.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, text.strip_prefix('+').unwrap_or(text)),
            };
            let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                Some(hex) => i64::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<i64>().ok()?,
            };
            Some(Value::Int(if negative { -magnitude } else { magnitude }))
        }
        DataType::Float => text.parse::<f64>().ok().map(Value::Float),
        _ => None,
    }
}

/// `target = value`, or `target op= value` as load, push, value, pop, op.
pub(super) fn lower_assignment(
    target: &Expr,
    op: Option<BinaryOp>,
    value: &Expr,
    ctx: &mut LowerCtx<'_>,
) -> Result<(), LoweringError> {
    let place = match &target.kind {
        ExprKind::Identifier(name) => ctx.place_of(name, target.span)?,
        ExprKind::Member { .. } => return Err(unsupported("member assignment", target)),
        ExprKind::Index { .. } => return Err(unsupported("index assignment", target)),
        _ => return Err(unsupported("assignment to this target", target)),
    };

    match op {
        Some(op) => {
            ctx.load(place.clone());
            ctx.push();
            value.lower(ctx)?;
            ctx.combine(binary_opcode(op));
        }
        None => value.lower(ctx)?,
    }
    ctx.store(place);
    Ok(())
}

fn lower_call(callee: &Expr, args: &[Expr], call: &Expr, ctx: &mut LowerCtx<'_>) -> Result<(), LoweringError> {
    let Some(name) = callee.as_identifier() else {
        return Err(unsupported("calls through expressions", call));
    };

    // 1. `print` is not a real function: each argument gets a PRINT picked by its
    //    analyzed type. A user function named `print` wins.
    if name == PRINT && !ctx.lowerer.functions.contains_key(PRINT) {
        for arg in args {
            arg.lower(ctx)?;
            ctx.emit(Instruction::new(Opcode::Print(PrintFormat::for_type(arg.ty))).with_src1(Value::acc()));
        }
        return Ok(());
    }

    if !ctx.lowerer.functions.contains_key(name) {
        return Err(LoweringError::UnresolvedFunction {
            name: name.to_string(),
            span: callee.span,
        });
    }

    // 2. Last argument first, so argument 0 ends up on top.
    for arg in args.iter().rev() {
        arg.lower(ctx)?;
        ctx.push();
    }
    // 3. Call, then the caller releases what it pushed.
    let argc = args.len() as i64;
    ctx.emit(
        Instruction::new(Opcode::Call)
            .with_dest(Value::Label(name.to_string()))
            .with_src1(Value::Int(argc)),
    );
    if argc > 0 {
        ctx.emit(Instruction::new(Opcode::Drop).with_src1(Value::Int(argc)));
    }
    Ok(())
}

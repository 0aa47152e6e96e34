// src/analyzer/expression.rs

use super::types::DataType;
use super::{AnalysisContext, Check, SemanticError};
use crate::parser::ast::*;
use crate::utils::Span;

impl Check for Expr {
    type Output = DataType;

    /// Infers the expression's type and records it on the node.
    fn check(&mut self, ctx: &mut AnalysisContext) -> DataType {
        let span = self.span;
        let ty = match &mut self.kind {
            ExprKind::Literal(literal) => literal_type(literal),
            ExprKind::Identifier(name) => check_identifier(name, span, ctx),
            ExprKind::Binary { op, left, right } => {
                let left = left.check(ctx);
                let right = right.check(ctx);
                binary_type(*op, left, right, span, ctx)
            }
            ExprKind::Unary { op, operand } => {
                let found = operand.check(ctx);
                unary_type(*op, found, span, ctx)
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                let found = condition.check(ctx);
                if found != DataType::Bool && !found.is_dynamic() {
                    ctx.report(SemanticError::TernaryCondition {
                        found,
                        span: condition.span,
                    });
                }
                let then_type = then_branch.check(ctx);
                let else_type = else_branch.check(ctx);
                if !then_type.compatible(else_type) {
                    ctx.report(SemanticError::TernaryBranches {
                        then_type,
                        else_type,
                        span,
                    });
                }
                if then_type.is_dynamic() { else_type } else { then_type }
            }
            ExprKind::Assign { target, value } => check_assignment(target, None, value, span, ctx),
            ExprKind::Call { callee, args } => check_call(callee, args, span, ctx),
            ExprKind::Member { object, .. } => {
                object.check(ctx);
                DataType::Unknown
            }
            ExprKind::Index { object, index } => {
                let target = object.check(ctx);
                if !matches!(target, DataType::Array | DataType::String) && !target.is_dynamic() {
                    ctx.report(SemanticError::IndexTarget {
                        found: target,
                        span: object.span,
                    });
                }
                let found = index.check(ctx);
                if found != DataType::Int && !found.is_dynamic() {
                    ctx.report(SemanticError::IndexType {
                        found,
                        span: index.span,
                    });
                }
                if target == DataType::String {
                    DataType::String
                } else {
                    DataType::Unknown
                }
            }
            ExprKind::Array(elements) => {
                let mut first: Option<DataType> = None;
                for element in elements.iter_mut() {
                    let found = element.check(ctx);
                    match first {
                        None if !found.is_dynamic() => first = Some(found),
                        Some(first) if !first.compatible(found) => {
                            ctx.report(SemanticError::ArrayElements {
                                first,
                                found,
                                span: element.span,
                            });
                        }
                        _ => {}
                    }
                }
                DataType::Array
            }
            ExprKind::Object(fields) => {
                for (_, value) in fields.iter_mut() {
                    value.check(ctx);
                }
                DataType::Object
            }
        };
        self.ty = ty;
        ty
    }
}

pub(super) fn literal_type(literal: &Literal) -> DataType {
    match literal {
        Literal::Number(text) => number_type(text),
        Literal::Str(_) => DataType::String,
        Literal::Bool(_) => DataType::Bool,
        Literal::Null => DataType::Null,
    }
}

/// `Int` or `Float` by shape; anything unparseable is `Unknown`.
pub fn number_type(text: &str) -> DataType {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);

    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            DataType::Int
        } else {
            DataType::Unknown
        };
    }

    if digits.contains(['e', 'E']) {
        return match digits.parse::<f64>() {
            Ok(_) => DataType::Float,
            Err(_) => DataType::Unknown,
        };
    }

    let dots = digits.chars().filter(|&c| c == '.').count();
    let well_formed = digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && dots <= 1;
    match (well_formed, dots) {
        (false, _) => DataType::Unknown,
        (true, 0) => DataType::Int,
        (true, _) => DataType::Float,
    }
}

fn check_identifier(name: &str, span: Span, ctx: &mut AnalysisContext) -> DataType {
    let Some(id) = ctx.symbols.lookup(name) else {
        ctx.report(SemanticError::UndefinedVariable {
            name: name.to_string(),
            span,
        });
        return DataType::Unknown;
    };
    let symbol = ctx.symbols.get(id);
    let ty = symbol.data_type;
    if !symbol.is_initialized {
        ctx.report(SemanticError::UsedBeforeInit {
            name: name.to_string(),
            span,
        });
    }
    ty
}

/// Result type of a binary operation. Errors are reported here and yield `Unknown`.
fn binary_type(op: BinaryOp, left: DataType, right: DataType, span: Span, ctx: &mut AnalysisContext) -> DataType {
    use DataType as T;

    if op == BinaryOp::Add && (left == T::String || right == T::String) {
        let convertible = matches!(left, T::String | T::Int | T::Float | T::Bool) || left.is_dynamic();
        if !convertible {
            ctx.report(SemanticError::StringConcat { found: left, span });
        }
        return T::String;
    }

    if op.is_arithmetic() {
        if left.is_numeric() && right.is_numeric() {
            return left.promote(right);
        }
        let operand_ok = |ty: DataType| ty.is_numeric() || ty.is_dynamic();
        if operand_ok(left) && operand_ok(right) {
            return if left == T::Unknown || right == T::Unknown {
                T::Unknown
            } else {
                T::Auto
            };
        }
        ctx.report(SemanticError::InvalidOperands {
            op: op.as_str(),
            left,
            right,
            span,
        });
        return T::Unknown;
    }

    if op.is_comparison() {
        let comparable = (left == T::String && right == T::String)
            || (left.is_numeric() && right.is_numeric())
            || left.is_dynamic()
            || right.is_dynamic();
        if comparable {
            return T::Bool;
        }
        ctx.report(SemanticError::InvalidComparison { left, right, span });
        return T::Unknown;
    }

    for (side, found) in [("left", left), ("right", right)] {
        if found != T::Bool && !found.is_dynamic() {
            ctx.report(SemanticError::LogicalOperand {
                op: op.as_str(),
                found,
                side,
                span,
            });
        }
    }
    T::Bool
}

fn unary_type(op: UnaryOp, found: DataType, span: Span, ctx: &mut AnalysisContext) -> DataType {
    match op {
        UnaryOp::Not => {
            if found != DataType::Bool && !found.is_dynamic() {
                ctx.report(SemanticError::NotOperand { found, span });
            }
            DataType::Bool
        }
        UnaryOp::Neg => {
            if found.is_numeric() || found.is_dynamic() {
                found
            } else {
                ctx.report(SemanticError::NegOperand { found, span });
                DataType::Unknown
            }
        }
    }
}

fn check_call(callee: &mut Expr, args: &mut [Expr], span: Span, ctx: &mut AnalysisContext) -> DataType {
    let arg_types: Vec<(DataType, Span)> = args.iter_mut().map(|arg| (arg.check(ctx), arg.span)).collect();

    let Some(name) = callee.as_identifier().map(str::to_string) else {
        callee.check(ctx);
        // Method calls resolve at run time.
        if !matches!(callee.kind, ExprKind::Member { .. }) {
            ctx.report(SemanticError::NotCallable { span: callee.span });
        }
        return DataType::Unknown;
    };

    let Some(id) = ctx.symbols.lookup(&name) else {
        ctx.report(SemanticError::UndefinedFunction {
            name,
            span: callee.span,
        });
        return DataType::Unknown;
    };

    let symbol = ctx.symbols.get(id);
    if !symbol.is_function {
        // A dynamic variable may hold a function value; nothing can be checked.
        let ty = symbol.data_type;
        callee.ty = ty;
        if !ty.is_dynamic() && ty != DataType::Function {
            ctx.report(SemanticError::NotCallable { span: callee.span });
        }
        return DataType::Unknown;
    }

    let params = symbol.param_types.clone();
    let return_type = symbol.return_type;
    callee.ty = DataType::Function;

    if params.len() != arg_types.len() {
        ctx.report(SemanticError::ArgumentCount {
            name,
            expected: params.len(),
            found: arg_types.len(),
            span,
        });
        return DataType::Unknown;
    }
    for (position, (expected, (found, arg_span))) in params.into_iter().zip(arg_types).enumerate() {
        if !expected.compatible(found) {
            ctx.report(SemanticError::ArgumentType {
                position: position + 1,
                name: name.clone(),
                expected,
                found,
                span: arg_span,
            });
        }
    }
    return_type
}

/// Checks `target = value` (or `target op= value`) and returns the assigned type.
/// Checks an expression whose value is stored. A void result is reported once and
/// treated as unknown from then on.
pub(super) fn check_value(expr: &mut Expr, ctx: &mut AnalysisContext) -> DataType {
    let found = expr.check(ctx);
    if found == DataType::Void {
        ctx.report(SemanticError::VoidValue { span: expr.span });
        expr.ty = DataType::Unknown;
        return DataType::Unknown;
    }
    found
}

pub(super) fn check_assignment(
    target: &mut Expr,
    op: Option<BinaryOp>,
    value: &mut Expr,
    span: Span,
    ctx: &mut AnalysisContext,
) -> DataType {
    let name = match &target.kind {
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Member { .. } | ExprKind::Index { .. } => {
            let target_type = target.check(ctx);
            let value_type = value.check(ctx);
            return match op {
                Some(op) => binary_type(op, target_type, value_type, span, ctx),
                None => value_type,
            };
        }
        _ => {
            ctx.report(SemanticError::InvalidAssignTarget(target.span));
            value.check(ctx);
            return DataType::Unknown;
        }
    };

    let Some(id) = ctx.symbols.lookup(&name) else {
        ctx.report(SemanticError::UndefinedAssignTarget {
            name,
            span: target.span,
        });
        value.check(ctx);
        return DataType::Unknown;
    };

    let symbol = ctx.symbols.get(id);
    let (is_constant, is_initialized, target_type) = (symbol.is_constant, symbol.is_initialized, symbol.data_type);
    target.ty = target_type;
    if is_constant {
        ctx.report(SemanticError::AssignToConst {
            name,
            span: target.span,
        });
        value.check(ctx);
        return DataType::Unknown;
    }

    let mut value_type = check_value(value, ctx);
    if let Some(op) = op {
        // `x op= v` reads `x` first.
        if !is_initialized {
            ctx.report(SemanticError::UsedBeforeInit {
                name: name.clone(),
                span: target.span,
            });
        }
        value_type = binary_type(op, target_type, value_type, span, ctx);
    }

    if !target_type.compatible(value_type) {
        ctx.report(SemanticError::AssignMismatch {
            target: target_type,
            value: value_type,
            span: value.span,
        });
        return DataType::Unknown;
    }

    let entry = ctx.symbols.get_mut(id);
    if entry.data_type == DataType::Auto && value_type != DataType::Unknown {
        entry.data_type = value_type;
    }
    entry.is_initialized = true;
    value_type
}

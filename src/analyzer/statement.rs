// src/analyzer/statement.rs

use super::expression::{check_assignment, check_value};
use super::symbols::Symbol;
use super::types::DataType;
use super::{AnalysisContext, Check, SemanticError, functions};
use crate::parser::ast::*;
use crate::utils::Span;

pub(super) fn check_statements(statements: &mut [Stmt], ctx: &mut AnalysisContext) {
    for stmt in statements {
        stmt.check(ctx);
    }
}

impl Check for Block {
    type Output = ();

    fn check(&mut self, ctx: &mut AnalysisContext) {
        ctx.scoped(|ctx| check_statements(&mut self.statements, ctx));
    }
}

impl Check for Stmt {
    type Output = ();

    fn check(&mut self, ctx: &mut AnalysisContext) {
        let span = self.span;
        match &mut self.kind {
            StmtKind::VarDecl(decl) => check_var_decl(decl, ctx),
            StmtKind::Function(decl) => {
                let symbol = functions::declare_function(decl, ctx);
                functions::check_function(decl, symbol, ctx);
            }
            StmtKind::Class(class) => check_class(class, ctx),
            StmtKind::If(stmt) => {
                check_condition("If", &mut stmt.condition, ctx);
                stmt.then_block.check(ctx);
                if let Some(else_branch) = stmt.else_branch.as_deref_mut() {
                    else_branch.check(ctx);
                }
            }
            StmtKind::For(stmt) => check_for(stmt, ctx),
            StmtKind::While(stmt) => {
                check_condition("While", &mut stmt.condition, ctx);
                in_loop(ctx, |ctx| stmt.body.check(ctx));
            }
            StmtKind::DoWhile(stmt) => {
                in_loop(ctx, |ctx| stmt.body.check(ctx));
                check_condition("Do-while", &mut stmt.condition, ctx);
            }
            StmtKind::Try(stmt) => {
                stmt.body.check(ctx);
                if let Some(catch) = &mut stmt.catch {
                    ctx.scoped(|ctx| {
                        if let Some(binding) = &catch.binding {
                            let mut error = Symbol::variable(&binding.name, DataType::Auto, binding.span);
                            error.is_initialized = true;
                            // The catch scope is fresh, so the binding cannot clash.
                            let _ = ctx.symbols.declare(error);
                        }
                        check_statements(&mut catch.body.statements, ctx);
                    });
                }
                if let Some(finally) = &mut stmt.finally {
                    finally.check(ctx);
                }
            }
            StmtKind::Throw(value) => {
                value.check(ctx);
            }
            StmtKind::Return(value) => check_return(value.as_mut(), span, ctx),
            StmtKind::Break => check_loop_control("break", span, ctx),
            StmtKind::Continue => check_loop_control("continue", span, ctx),
            StmtKind::Assign(assign) => {
                check_assignment(&mut assign.target, assign.op, &mut assign.value, span, ctx);
            }
            StmtKind::Expr(expr) => {
                expr.check(ctx);
            }
            StmtKind::Block(block) => block.check(ctx),
            StmtKind::Embed(_) => {}
        }
    }
}

fn in_loop(ctx: &mut AnalysisContext, f: impl FnOnce(&mut AnalysisContext)) {
    ctx.loop_depth += 1;
    f(ctx);
    ctx.loop_depth -= 1;
}

fn check_condition(construct: &'static str, condition: &mut Expr, ctx: &mut AnalysisContext) {
    let found = condition.check(ctx);
    if found != DataType::Bool && !found.is_dynamic() {
        ctx.report(SemanticError::Condition {
            construct,
            found,
            span: condition.span,
        });
    }
}

fn check_var_decl(decl: &mut VarDecl, ctx: &mut AnalysisContext) {
    let declared = ctx.resolve_annotation(decl.annotation.as_ref());

    let mut symbol = Symbol::variable(&decl.name.name, declared.unwrap_or(DataType::Auto), decl.name.span);
    symbol.is_constant = decl.is_const();
    // Declared before the initializer is walked, so `var x = x` reads an uninitialized `x`.
    let id = match ctx.symbols.declare(symbol) {
        Ok(id) => Some(id),
        Err(existing) => {
            let previous = ctx.symbols.get(existing).span;
            ctx.report(SemanticError::AlreadyDeclared {
                what: "Variable",
                name: decl.name.name.clone(),
                span: decl.name.span,
                previous,
            });
            None
        }
    };

    let initial = decl.initializer.as_mut().map(|init| (check_value(init, ctx), init.span));

    let resolved = match (declared, initial) {
        (Some(declared), Some((value, value_span))) if !declared.is_dynamic() => {
            if !declared.compatible(value) {
                ctx.report(SemanticError::AssignMismatch {
                    target: declared,
                    value,
                    span: value_span,
                });
            }
            declared
        }
        (Some(declared), None) if !declared.is_dynamic() => declared,
        (_, Some((value, _))) if value != DataType::Unknown => value,
        _ => DataType::Auto,
    };

    decl.data_type = resolved;
    if let Some(id) = id {
        let entry = ctx.symbols.get_mut(id);
        entry.data_type = resolved;
        entry.is_initialized = initial.is_some();
    }

    if decl.is_const() && decl.initializer.is_none() {
        ctx.report(SemanticError::ConstWithoutInit {
            name: decl.name.name.clone(),
            span: decl.name.span,
        });
    }
}

fn check_class(class: &mut ClassDecl, ctx: &mut AnalysisContext) {
    let mut symbol = Symbol::variable(&class.name.name, DataType::Object, class.name.span);
    symbol.is_initialized = true;
    if let Err(existing) = ctx.symbols.declare(symbol) {
        let previous = ctx.symbols.get(existing).span;
        ctx.report(SemanticError::AlreadyDeclared {
            what: "Class",
            name: class.name.name.clone(),
            span: class.name.span,
            previous,
        });
    }
    class.body.check(ctx);
}

fn check_for(stmt: &mut ForStmt, ctx: &mut AnalysisContext) {
    let variable_type = match &mut stmt.iterable {
        ForIterable::Range(range) => {
            let bounds = range.start.iter_mut().chain(std::iter::once(&mut range.end));
            for bound in bounds {
                let found = bound.check(ctx);
                if found != DataType::Int && !found.is_dynamic() {
                    ctx.report(SemanticError::RangeBound {
                        found,
                        span: bound.span,
                    });
                }
            }
            DataType::Int
        }
        ForIterable::Collection(collection) => match collection.check(ctx) {
            DataType::String => DataType::String,
            _ => DataType::Auto,
        },
    };

    // The loop variable lives in the loop's own scope, next to the body's declarations.
    ctx.scoped(|ctx| {
        let mut variable = Symbol::variable(&stmt.variable.name, variable_type, stmt.variable.span);
        variable.is_initialized = true;
        let _ = ctx.symbols.declare(variable);
        in_loop(ctx, |ctx| check_statements(&mut stmt.body.statements, ctx));
    });
}

fn check_return(value: Option<&mut Expr>, span: Span, ctx: &mut AnalysisContext) {
    let found = value.map(|expr| (expr.check(ctx), expr.span));

    // A top-level `return` ends the entry function and carries no type contract.
    let Some(scope) = &mut ctx.function else {
        return;
    };
    let (expected, symbol) = (scope.return_type, scope.symbol);

    let settled = match found {
        Some((found, _)) if expected == DataType::Unknown => {
            if found.is_dynamic() {
                scope.returns_value = true;
                None
            } else {
                Some(found)
            }
        }
        Some((found, value_span)) => {
            if !expected.compatible(found) {
                ctx.report(SemanticError::ReturnMismatch {
                    found,
                    expected,
                    span: value_span,
                });
            }
            None
        }
        None if expected == DataType::Unknown => Some(DataType::Void),
        None => {
            if expected != DataType::Void && !expected.is_dynamic() {
                ctx.report(SemanticError::ReturnMismatch {
                    found: DataType::Void,
                    expected,
                    span,
                });
            }
            None
        }
    };

    if let Some(ty) = settled {
        if let Some(scope) = &mut ctx.function {
            scope.return_type = ty;
        }
        // Recursive calls later in the body see the settled type.
        if let Some(id) = symbol {
            ctx.symbols.get_mut(id).return_type = ty;
        }
    }
}

fn check_loop_control(keyword: &'static str, span: Span, ctx: &mut AnalysisContext) {
    if ctx.loop_depth == 0 {
        ctx.report(SemanticError::OutsideLoop { keyword, span });
    }
}

// src/analyzer/functions.rs

use super::symbols::{Symbol, SymbolId};
use super::types::DataType;
use super::{AnalysisContext, FunctionScope, SemanticError, statement};
use crate::parser::ast::{FunctionDecl, Program, StmtKind, TypeAnnotation};

/// Declares every top-level function before any body is walked.
/// Returns one entry per top-level statement, `Some` for successfully declared functions.
pub(super) fn hoist(ctx: &mut AnalysisContext, program: &Program) -> Vec<Option<SymbolId>> {
    program
        .statements
        .iter()
        .map(|stmt| match &stmt.kind {
            StmtKind::Function(decl) => declare_function(decl, ctx),
            _ => None,
        })
        .collect()
}

/// Registers a function's signature in the current scope.
///
/// Annotations are resolved quietly here; unknown type names are reported once,
/// when the body is checked.
pub(super) fn declare_function(decl: &FunctionDecl, ctx: &mut AnalysisContext) -> Option<SymbolId> {
    let param_types = decl
        .params
        .iter()
        .map(|param| quiet_type(param.annotation.as_ref(), DataType::Auto))
        .collect();
    let return_type = match quiet_type(decl.return_annotation.as_ref(), DataType::Unknown) {
        DataType::Auto => DataType::Unknown,
        ty => ty,
    };
    let symbol = Symbol::function(&decl.name.name, param_types, return_type, decl.name.span);

    match ctx.symbols.declare(symbol) {
        Ok(id) => Some(id),
        Err(existing) => {
            let previous = ctx.symbols.get(existing).span;
            ctx.report(SemanticError::AlreadyDeclared {
                what: "Function",
                name: decl.name.name.clone(),
                span: decl.name.span,
                previous,
            });
            None
        }
    }
}

fn quiet_type(annotation: Option<&TypeAnnotation>, missing: DataType) -> DataType {
    match annotation {
        Some(annotation) => DataType::from_name(&annotation.name).unwrap_or(DataType::Unknown),
        None => missing,
    }
}

/// Walks a function body in its own scope and settles its return type.
pub(super) fn check_function(decl: &mut FunctionDecl, symbol: Option<SymbolId>, ctx: &mut AnalysisContext) {
    let declared = match ctx.resolve_annotation(decl.return_annotation.as_ref()) {
        Some(DataType::Auto) | None => DataType::Unknown,
        Some(ty) => ty,
    };

    let enclosing = ctx.function.replace(FunctionScope {
        name: decl.name.name.clone(),
        symbol,
        return_type: declared,
        returns_value: false,
    });
    // Loops around a nested function do not reach into its body.
    let enclosing_loops = std::mem::replace(&mut ctx.loop_depth, 0);

    ctx.scoped(|ctx| {
        for param in &decl.params {
            let ty = ctx
                .resolve_annotation(param.annotation.as_ref())
                .unwrap_or(DataType::Auto);
            let mut entry = Symbol::variable(&param.name.name, ty, param.name.span);
            entry.is_initialized = true;
            if let Err(existing) = ctx.symbols.declare(entry) {
                let previous = ctx.symbols.get(existing).span;
                ctx.report(SemanticError::AlreadyDeclared {
                    what: "Parameter",
                    name: param.name.name.clone(),
                    span: param.name.span,
                    previous,
                });
            }
        }
        statement::check_statements(&mut decl.body.statements, ctx);
    });

    ctx.loop_depth = enclosing_loops;
    let finished = std::mem::replace(&mut ctx.function, enclosing);

    let resolved = match finished {
        Some(scope) if scope.return_type != DataType::Unknown => scope.return_type,
        Some(scope) if scope.returns_value => DataType::Generic,
        _ => DataType::Void,
    };
    decl.return_type = resolved;
    if let Some(id) = symbol {
        ctx.symbols.get_mut(id).return_type = resolved;
    }
    tracing::trace!(function = %decl.name.name, return_type = %resolved, "function checked");
}

// src/lowering/function.rs

use super::{LowerAst, LowerCtx, Lowerer, LoweringError};
use crate::analyzer::DataType;
use crate::ir::{Instruction, IrFunction, Opcode, Value};
use crate::parser::ast::{FunctionDecl, Program, StmtKind};

pub(super) fn top_level_functions(program: &Program) -> impl Iterator<Item = &FunctionDecl> {
    program.statements.iter().filter_map(|stmt| match &stmt.kind {
        StmtKind::Function(decl) => Some(decl),
        _ => None,
    })
}

/// Registers every global and every callable function before any body is lowered.
pub(super) fn declare_module(lowerer: &mut Lowerer, program: &Program) {
    lowerer.functions.insert(lowerer.entry_point.clone(), 0);
    for stmt in &program.statements {
        match &stmt.kind {
            StmtKind::Function(decl) if decl.name.name != lowerer.entry_point => {
                lowerer
                    .functions
                    .insert(decl.name.name.clone(), decl.params.len());
            }
            StmtKind::VarDecl(decl) => {
                lowerer
                    .globals
                    .insert(decl.name.name.clone(), emitted_type(decl.data_type));
            }
            _ => {}
        }
    }
    tracing::trace!(
        functions = lowerer.functions.len(),
        globals = lowerer.globals.len(),
        "module declared"
    );
}

/// The entry function runs every top-level statement, then the body of a
/// user-written function with the entry point's name.
pub(super) fn lower_entry(lowerer: &mut Lowerer, program: &Program) -> IrFunction {
    let function = IrFunction::new(lowerer.entry_point.clone(), DataType::Int, Vec::new());
    let mut ctx = LowerCtx::new(lowerer, function);

    // 1. Top-level statements in source order. Function declarations emit nothing here.
    let mut user_entry = None;
    for stmt in &program.statements {
        let result = match &stmt.kind {
            StmtKind::Function(decl) if decl.name.name == ctx.lowerer.entry_point => {
                user_entry = Some(decl);
                Ok(())
            }
            StmtKind::Function(_) => Ok(()),
            // Top-level declarations initialize globals.
            StmtKind::VarDecl(decl) => match &decl.initializer {
                Some(init) => init.lower(&mut ctx).map(|()| {
                    ctx.store(Value::Global(decl.name.name.clone()));
                }),
                None => Ok(()),
            },
            _ => stmt.lower(&mut ctx),
        };
        if let Err(error) = result {
            ctx.record(error);
        }
    }

    // 2. The user's own entry function runs after them, in a scope of its own.
    if let Some(decl) = user_entry {
        if let Some(param) = decl.params.first() {
            ctx.record(LoweringError::Unsupported {
                construct: "parameters on the entry function",
                span: param.span,
            });
        }
        ctx.frame.enter_scope();
        ctx.lower_statements(&decl.body.statements);
        ctx.frame.exit_scope();
    }

    implicit_return(&mut ctx);
    ctx.finish()
}

pub(super) fn lower_function(lowerer: &mut Lowerer, decl: &FunctionDecl) -> IrFunction {
    let params = decl.params.iter().map(|p| p.name.name.clone()).collect();
    let function = IrFunction::new(decl.name.name.clone(), emitted_type(decl.return_type), params);
    let mut ctx = LowerCtx::new(lowerer, function);

    // Parameters get the first slots, in declaration order.
    for (index, param) in decl.params.iter().enumerate() {
        let offset = ctx.frame.allocate(&param.name.name);
        ctx.emit(
            Instruction::new(Opcode::Param)
                .with_dest(Value::Slot(offset))
                .with_src1(Value::Int(index as i64)),
        );
    }
    ctx.lower_statements(&decl.body.statements);

    implicit_return(&mut ctx);
    tracing::trace!(function = %decl.name.name, "function lowered");
    ctx.finish()
}

/// Types still open after analysis are emitted as Generic.
fn emitted_type(ty: DataType) -> DataType {
    match ty {
        DataType::Unknown | DataType::Auto => DataType::Generic,
        ty => ty,
    }
}

/// Every function ends in `return 0`, so falling off the end is well defined.
fn implicit_return(ctx: &mut LowerCtx<'_>) {
    ctx.constant(Value::Int(0));
    ctx.ret();
}

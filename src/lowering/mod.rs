// src/lowering/mod.rs

mod expression;
mod frame;
mod function;
mod statement;
mod strings;

#[cfg(test)]
mod test;

use indexmap::IndexMap;
use thiserror::Error;

use crate::CompileOptions;
use crate::analyzer::DataType;
use crate::diagnostics::{Diagnostic, Label, codes::*};
use crate::ir::{Global, Instruction, IrFunction, IrModule, Opcode, Value};
use crate::parser::ast::{Program, Stmt};
use crate::utils::Span;

pub use frame::Frame;
pub use strings::StringPool;

/// Lowering assumes a program that passed analysis. These errors mean that
/// assumption was broken, or that the program uses something the IR cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error("unresolved symbol '{name}' reached lowering")]
    UnresolvedSymbol { name: String, span: Span },
    #[error("call to unresolved function '{name}' reached lowering")]
    UnresolvedFunction { name: String, span: Span },
    #[error("'{keyword}' outside of a loop reached lowering")]
    OutsideLoop { keyword: &'static str, span: Span },
    #[error("{construct} cannot be lowered to IR")]
    Unsupported { construct: &'static str, span: Span },
}

impl LoweringError {
    pub fn span(&self) -> Span {
        match self {
            LoweringError::UnresolvedSymbol { span, .. }
            | LoweringError::UnresolvedFunction { span, .. }
            | LoweringError::OutsideLoop { span, .. }
            | LoweringError::Unsupported { span, .. } => *span,
        }
    }

    pub fn is_internal(&self) -> bool {
        !matches!(self, LoweringError::Unsupported { .. })
    }
}

impl From<LoweringError> for Diagnostic {
    fn from(error: LoweringError) -> Self {
        let span = error.span();
        let message = error.to_string();
        if error.is_internal() {
            Diagnostic::new(&E0300_INTERNAL_LOWERING_ERROR, Label::new(span, "while lowering this"))
                .with_dynamic_message(message)
                .with_note("internal compiler error: analysis should have rejected this program")
        } else {
            Diagnostic::new(&E0301_UNSUPPORTED_CONSTRUCT, Label::new(span, "not supported by the IR"))
                .with_dynamic_message(message)
        }
    }
}

// --- Module-wide state ---

/// Owns everything shared between the functions of the module being built.
pub struct Lowerer {
    entry_point: String,
    strings: StringPool,
    globals: IndexMap<String, DataType>,
    /// Callable functions and their parameter counts.
    functions: IndexMap<String, usize>,
    next_label: u32,
    errors: Vec<LoweringError>,
}

impl Lowerer {
    pub fn new(options: &CompileOptions) -> Self {
        Self {
            entry_point: options.entry_point.clone(),
            strings: StringPool::new(options.dedupe_strings),
            globals: IndexMap::new(),
            functions: IndexMap::new(),
            next_label: 0,
            errors: Vec::new(),
        }
    }

    /// Lowers a checked program into a module.
    pub fn run(mut self, program: &Program) -> Result<IrModule, Vec<LoweringError>> {
        // PASS 1: globals and function signatures, so bodies can refer to anything.
        function::declare_module(&mut self, program);

        // PASS 2: the entry function first, then every other function in order.
        let mut functions = vec![function::lower_entry(&mut self, program)];
        for decl in function::top_level_functions(program) {
            if decl.name.name != self.entry_point {
                functions.push(function::lower_function(&mut self, decl));
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        let module = IrModule {
            entry_point: self.entry_point,
            functions,
            globals: self
                .globals
                .into_iter()
                .map(|(name, data_type)| Global { name, data_type })
                .collect(),
            strings: self.strings.into_constants(),
        };
        tracing::debug!(
            functions = module.functions.len(),
            globals = module.globals.len(),
            strings = module.strings.len(),
            "lowering finished"
        );
        Ok(module)
    }

    fn fresh_label_id(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;
        id
    }
}

/// Lowers `program` with the given options.
pub fn lower(program: &Program, options: &CompileOptions) -> Result<IrModule, Vec<LoweringError>> {
    Lowerer::new(options).run(program)
}

// --- Per-function context ---

/// Targets of `continue` and `break` for the innermost loop.
#[derive(Debug, Clone)]
pub struct LoopLabels {
    pub continue_label: String,
    pub break_label: String,
}

// --- Per-function context helpers ---
// Every emit helper works on the accumulator `r0`; only `combine` touches `r1`.

/// The function currently being emitted, plus a handle back to the module state.
pub struct LowerCtx<'a> {
    pub lowerer: &'a mut Lowerer,
    pub function: IrFunction,
    pub frame: Frame,
    pub loops: Vec<LoopLabels>,
}

pub trait LowerAst {
    type Output;
    fn lower(&self, ctx: &mut LowerCtx<'_>) -> Result<Self::Output, LoweringError>;
}

impl<'a> LowerCtx<'a> {
    pub fn new(lowerer: &'a mut Lowerer, function: IrFunction) -> Self {
        Self {
            lowerer,
            function,
            frame: Frame::new(),
            loops: Vec::new(),
        }
    }

    pub fn finish(self) -> IrFunction {
        let mut function = self.function;
        function.locals = self.frame.into_locals();
        function
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.function.emit(instruction);
    }

    /// Mints label names `<prefix>_<n>` sharing one module-wide number.
    pub fn fresh_labels<const N: usize>(&mut self, prefixes: [&str; N]) -> [String; N] {
        let id = self.lowerer.fresh_label_id();
        let labels = prefixes.map(|prefix| format!("{prefix}_{id}"));
        tracing::trace!(?labels, "labels minted");
        labels
    }

    pub fn label(&mut self, label: &str) {
        self.emit(Instruction::new(Opcode::Label).with_dest(Value::Label(label.to_string())));
    }

    pub fn jump(&mut self, label: &str) {
        self.emit(Instruction::new(Opcode::Jump).with_dest(Value::Label(label.to_string())));
    }

    /// Jumps when the accumulator is false.
    pub fn jump_if_not(&mut self, label: &str) {
        self.emit(
            Instruction::new(Opcode::JumpIfNot)
                .with_dest(Value::Label(label.to_string()))
                .with_src1(Value::acc()),
        );
    }

    pub fn constant(&mut self, value: Value) {
        self.emit(Instruction::new(Opcode::Const).with_dest(Value::acc()).with_src1(value));
    }

    pub fn load(&mut self, place: Value) {
        self.emit(Instruction::new(Opcode::Load).with_dest(Value::acc()).with_src1(place));
    }

    pub fn store(&mut self, place: Value) {
        self.emit(Instruction::new(Opcode::Store).with_dest(place).with_src1(Value::acc()));
    }

    pub fn push(&mut self) {
        self.emit(Instruction::new(Opcode::Push).with_src1(Value::acc()));
    }

    /// Pops the saved left operand and combines it with the accumulator.
    pub fn combine(&mut self, opcode: Opcode) {
        self.emit(Instruction::new(Opcode::Pop).with_dest(Value::scratch()));
        self.emit(
            Instruction::new(opcode)
                .with_dest(Value::acc())
                .with_src1(Value::scratch())
                .with_src2(Value::acc()),
        );
    }

    pub fn ret(&mut self) {
        let name = self.function.name.clone();
        self.emit(
            Instruction::new(Opcode::Return)
                .with_src1(Value::acc())
                .with_comment(name),
        );
    }

    /// Where a named variable lives: a frame slot, else a global.
    pub fn place_of(&self, name: &str, span: Span) -> Result<Value, LoweringError> {
        if let Some(offset) = self.frame.lookup(name) {
            return Ok(Value::Slot(offset));
        }
        if self.lowerer.globals.contains_key(name) {
            return Ok(Value::Global(name.to_string()));
        }
        if self.lowerer.functions.contains_key(name) {
            return Err(LoweringError::Unsupported {
                construct: "function values",
                span,
            });
        }
        Err(LoweringError::UnresolvedSymbol {
            name: name.to_string(),
            span,
        })
    }

    pub fn intern(&mut self, value: &str) -> String {
        self.lowerer.strings.intern(value)
    }

    /// Lowers each statement, recording failures and carrying on with the next one.
    pub fn lower_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            if let Err(error) = stmt.lower(self) {
                self.record(error);
            }
        }
    }

    pub fn record(&mut self, error: LoweringError) {
        tracing::error!(function = %self.function.name, "{error}");
        self.lowerer.errors.push(error);
    }
}

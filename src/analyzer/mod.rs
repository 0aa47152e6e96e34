// src/analyzer/mod.rs

mod expression;
mod functions;
mod semantic_error;
mod statement;
pub mod symbols;
pub mod types;


use crate::diagnostics::Diagnostic;
use crate::parser::ast::{Program, StmtKind, TypeAnnotation};

pub use expression::number_type;
pub use semantic_error::SemanticError;
pub use symbols::{Symbol, SymbolId, SymbolTable};
pub use types::DataType;

// --- Context and the checking trait ---

/// The function whose body is being walked.
#[derive(Debug, Clone)]
pub struct FunctionScope {
    pub name: String,
    pub symbol: Option<SymbolId>,
    /// `Unknown` until an annotation or the first `return` fixes it.
    pub return_type: DataType,
    /// Set when a `return` carried a value of no static type.
    pub returns_value: bool,
}

/// Everything a node needs while it is checked.
pub struct AnalysisContext {
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
    pub function: Option<FunctionScope>,
    pub loop_depth: u32,
}

impl AnalysisContext {
    fn new() -> Self {
        let mut symbols = SymbolTable::new();
        for builtin in builtins() {
            // A fresh table cannot already hold a built-in.
            let _ = symbols.declare(builtin);
        }
        Self {
            symbols,
            diagnostics: Vec::new(),
            function: None,
            loop_depth: 0,
        }
    }

    pub fn report(&mut self, error: SemanticError) {
        self.diagnostics.push(error.into());
    }

    /// Resolves an optional annotation. Unknown names are reported and become `Unknown`.
    pub fn resolve_annotation(&mut self, annotation: Option<&TypeAnnotation>) -> Option<DataType> {
        let annotation = annotation?;
        match DataType::from_name(&annotation.name) {
            Some(ty) => Some(ty),
            None => {
                self.report(SemanticError::UnknownType {
                    name: annotation.name.clone(),
                    span: annotation.span,
                });
                Some(DataType::Unknown)
            }
        }
    }

    /// Runs `f` inside a fresh lexical scope.
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.symbols.enter_scope();
        let result = f(self);
        self.symbols.exit_scope();
        result
    }
}

/// Functions every program can call without declaring them.
fn builtins() -> Vec<Symbol> {
    vec![Symbol::function(
        "print",
        vec![DataType::Auto],
        DataType::Void,
        Default::default(),
    )]
}

pub trait Check {
    type Output;
    fn check(&mut self, ctx: &mut AnalysisContext) -> Self::Output;
}

// --- Analyzer ---

/// Outcome of checking one program.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn is_success(&self) -> bool {
        self.error_count() == 0
    }
}

pub struct Analyzer {
    ctx: AnalysisContext,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            ctx: AnalysisContext::new(),
        }
    }

    /// Checks the whole program, writing resolved types into its nodes.
    pub fn analyze(mut self, program: &mut Program) -> CheckReport {
        // PASS 1: top-level functions are visible everywhere, whatever their order.
        let hoisted = functions::hoist(&mut self.ctx, program);

        // PASS 2: walk every statement in order.
        for (stmt, symbol) in program.statements.iter_mut().zip(hoisted) {
            match &mut stmt.kind {
                StmtKind::Function(decl) => functions::check_function(decl, symbol, &mut self.ctx),
                _ => stmt.check(&mut self.ctx),
            }
        }

        let report = CheckReport {
            diagnostics: self.ctx.diagnostics,
        };
        tracing::debug!(
            statements = program.statements.len(),
            errors = report.error_count(),
            "semantic analysis finished"
        );
        report
    }
}

/// Type-checks `program` in place.
pub fn check(program: &mut Program) -> CheckReport {
    Analyzer::new().analyze(program)
}

pub mod analyzer;
pub mod diagnostics;
pub mod ir;
pub mod lexer;
pub mod lowering;
pub mod parser;
pub mod utils;

use diagnostics::DiagnosticBag;
use ir::IrModule;
use lexer::Token;
use parser::ast::Program;

/// Knobs for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Identical string literals share one pool entry.
    pub dedupe_strings: bool,
    /// Name of the function that runs the top-level statements.
    pub entry_point: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dedupe_strings: true,
            entry_point: "main".to_string(),
        }
    }
}

/// Everything one run of the pipeline produced.
#[derive(Debug)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    /// The checked program, with resolved types written into its nodes.
    pub program: Program,
    pub diagnostics: DiagnosticBag,
    /// Present only when no stage reported an error.
    pub module: Option<IrModule>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn into_result(self) -> Result<IrModule, DiagnosticBag> {
        match self.module {
            Some(module) if !self.diagnostics.has_errors() => Ok(module),
            _ => Err(self.diagnostics),
        }
    }
}

/// Runs every stage over `source`.
///
/// Lexing, parsing and analysis always run, so one call reports every problem
/// they can find. Lowering only runs on a program without errors.
pub fn compile(source: &str, options: &CompileOptions) -> Compilation {
    let mut diagnostics = DiagnosticBag::new(source);

    // 1. Lexing
    let (tokens, lex_errors) = lexer::tokenize(source);
    diagnostics.extend(lex_errors);

    // 2. Parsing
    let (mut program, parse_errors) = parser::parse(&tokens);
    diagnostics.extend(parse_errors);

    // 3. Semantic analysis
    let report = analyzer::check(&mut program);
    diagnostics.extend(report.diagnostics);

    // 4. Lowering, gated on a clean front end
    let module = if diagnostics.has_errors() {
        tracing::debug!(errors = diagnostics.error_count(), "skipping lowering");
        None
    } else {
        match lowering::lower(&program, options) {
            Ok(module) => Some(module),
            Err(errors) => {
                diagnostics.extend(errors.into_iter().map(Into::into));
                None
            }
        }
    };

    Compilation {
        tokens,
        program,
        diagnostics,
        module,
    }
}

#[cfg(test)]
mod test;

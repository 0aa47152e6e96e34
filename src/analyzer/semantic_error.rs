use super::types::DataType;
use crate::diagnostics::{Diagnostic, Label, codes::*};
use crate::utils::Span;

/// Problems found while checking a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    UndefinedVariable { name: String, span: Span },
    UndefinedAssignTarget { name: String, span: Span },
    UsedBeforeInit { name: String, span: Span },
    AlreadyDeclared {
        what: &'static str,
        name: String,
        span: Span,
        previous: Span,
    },
    ConstWithoutInit { name: String, span: Span },
    AssignToConst { name: String, span: Span },
    InvalidAssignTarget(Span),
    AssignMismatch {
        target: DataType,
        value: DataType,
        span: Span,
    },
    StringConcat { found: DataType, span: Span },
    InvalidOperands {
        op: &'static str,
        left: DataType,
        right: DataType,
        span: Span,
    },
    InvalidComparison {
        left: DataType,
        right: DataType,
        span: Span,
    },
    LogicalOperand {
        op: &'static str,
        found: DataType,
        side: &'static str,
        span: Span,
    },
    NotOperand { found: DataType, span: Span },
    NegOperand { found: DataType, span: Span },
    /// A call to a function returning void used where a value is needed.
    VoidValue { span: Span },
    UndefinedFunction { name: String, span: Span },
    NotCallable { span: Span },
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    ArgumentType {
        position: usize,
        name: String,
        expected: DataType,
        found: DataType,
        span: Span,
    },
    ArrayElements {
        first: DataType,
        found: DataType,
        span: Span,
    },
    IndexTarget { found: DataType, span: Span },
    IndexType { found: DataType, span: Span },
    TernaryCondition { found: DataType, span: Span },
    TernaryBranches {
        then_type: DataType,
        else_type: DataType,
        span: Span,
    },
    Condition {
        construct: &'static str,
        found: DataType,
        span: Span,
    },
    RangeBound { found: DataType, span: Span },
    ReturnMismatch {
        found: DataType,
        expected: DataType,
        span: Span,
    },
    OutsideLoop { keyword: &'static str, span: Span },
    UnknownType { name: String, span: Span },
}

impl From<SemanticError> for Diagnostic {
    fn from(error: SemanticError) -> Self {
        match error {
            SemanticError::UndefinedVariable { name, span } => Diagnostic::new(
                &E0200_UNDEFINED_VARIABLE,
                Label::new(span, "not found in this scope"),
            )
            .with_dynamic_message(format!("Undefined variable '{name}'")),

            SemanticError::UndefinedAssignTarget { name, span } => Diagnostic::new(
                &E0200_UNDEFINED_VARIABLE,
                Label::new(span, "assigned before any declaration"),
            )
            .with_dynamic_message(format!("Undefined variable '{name}' in assignment")),

            SemanticError::UsedBeforeInit { name, span } => Diagnostic::new(
                &E0206_USED_BEFORE_INIT,
                Label::new(span, "read here before any value was assigned"),
            )
            .with_dynamic_message(format!("Variable '{name}' used before initialization")),

            SemanticError::AlreadyDeclared {
                what,
                name,
                span,
                previous,
            } => {
                let diag = Diagnostic::new(&E0201_ALREADY_DECLARED, Label::new(span, "redeclared here"))
                    .with_dynamic_message(format!("{what} '{name}' already declared in this scope"));
                if previous.is_empty() {
                    diag.with_note(format!("'{name}' is a built-in"))
                } else {
                    diag.with_secondary_label(Label::new(previous, "first declared here"))
                }
            }

            SemanticError::ConstWithoutInit { name, span } => Diagnostic::new(
                &E0207_CONST_WITHOUT_INIT,
                Label::new(span, format!("'{name}' needs a value")),
            ),

            SemanticError::AssignToConst { name, span } => Diagnostic::new(
                &E0208_ASSIGNMENT_TO_CONST,
                Label::new(span, "cannot be reassigned"),
            )
            .with_dynamic_message(format!("Cannot assign to const variable '{name}'")),

            SemanticError::InvalidAssignTarget(span) => Diagnostic::new(
                &E0203_INVALID_ASSIGN_TARGET,
                Label::new(span, "this expression cannot be assigned to"),
            )
            .with_dynamic_message("Assignment target must be identifier or member access"),

            SemanticError::AssignMismatch { target, value, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Cannot assign {value} to variable of type {target}"),
            ),

            SemanticError::StringConcat { found, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Cannot convert {found} to string for concatenation"),
            ),

            SemanticError::InvalidOperands {
                op,
                left,
                right,
                span,
            } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Cannot apply operator '{op}' to {left} and {right}"),
            ),

            SemanticError::InvalidComparison { left, right, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Cannot compare {left} with {right}"),
            ),

            SemanticError::LogicalOperand {
                op,
                found,
                side,
                span,
            } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Logical operator '{op}' requires boolean, got {found} on {side} side"),
            ),

            SemanticError::NotOperand { found, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Logical NOT requires boolean, got {found}"),
            ),

            SemanticError::NegOperand { found, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Unary minus requires numeric type, got {found}"),
            ),

            SemanticError::VoidValue { span } => Diagnostic::new(
                &E0202_TYPE_MISMATCH,
                Label::new(span, "this produces no value"),
            )
            .with_dynamic_message("Type error: Cannot use a void value"),

            SemanticError::UndefinedFunction { name, span } => Diagnostic::new(
                &E0204_UNDEFINED_FUNCTION,
                Label::new(span, "no function with this name"),
            )
            .with_dynamic_message(format!("Undefined function '{name}'")),

            SemanticError::NotCallable { span } => Diagnostic::new(
                &E0204_UNDEFINED_FUNCTION,
                Label::new(span, "only named functions can be called"),
            )
            .with_dynamic_message("Call target is not a function name"),

            SemanticError::ArgumentCount {
                name,
                expected,
                found,
                span,
            } => Diagnostic::at(
                &E0205_WRONG_ARGUMENT_COUNT,
                span,
                format!("Function '{name}' expects {expected} arguments, got {found}"),
            ),

            SemanticError::ArgumentType {
                position,
                name,
                expected,
                found,
                span,
            } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Argument {position} to '{name}' expects {expected}, got {found}"),
            ),

            SemanticError::ArrayElements { first, found, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Array literal contains incompatible types {first} and {found}"),
            ),

            SemanticError::IndexTarget { found, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Cannot index into non-array type {found}"),
            ),

            SemanticError::IndexType { found, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Array index must be integer, got {found}"),
            ),

            SemanticError::TernaryCondition { found, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Ternary condition must be boolean, got {found}"),
            ),

            SemanticError::TernaryBranches {
                then_type,
                else_type,
                span,
            } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Ternary branches have incompatible types {then_type} and {else_type}"),
            ),

            SemanticError::Condition {
                construct,
                found,
                span,
            } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: {construct} condition must be boolean, got {found}"),
            ),

            SemanticError::RangeBound { found, span } => Diagnostic::at(
                &E0202_TYPE_MISMATCH,
                span,
                format!("Type error: Range bound must be integer, got {found}"),
            ),

            SemanticError::ReturnMismatch {
                found,
                expected,
                span,
            } => Diagnostic::at(
                &E0209_RETURN_TYPE_MISMATCH,
                span,
                format!("Type error: Return type {found} does not match function return type {expected}"),
            ),

            SemanticError::OutsideLoop { keyword, span } => Diagnostic::new(
                &E0210_CONTROL_FLOW_OUTSIDE_LOOP,
                Label::new(span, "not inside a loop body"),
            )
            .with_dynamic_message(format!("'{keyword}' outside of a loop")),

            SemanticError::UnknownType { name, span } => Diagnostic::new(
                &E0211_UNKNOWN_TYPE,
                Label::new(span, "not a known type"),
            )
            .with_dynamic_message(format!("Unknown type '{name}'")),
        }
    }
}

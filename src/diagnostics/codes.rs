// src/diagnostics/codes.rs

use crate::diagnostics::DiagnosticLevel;

/// A diagnostic code together with its default message.
/// Every diagnostic the compiler can produce is declared here.
#[derive(Debug, Clone)]
pub struct ErrorCode {
    pub code: &'static str,
    pub level: DiagnosticLevel,
    pub message: &'static str,
    pub explanation: &'static str,
}

/*
E00xx: lexical analysis
E01xx: syntax analysis
E02xx: semantic analysis
E03xx: IR lowering (internal)
*/

// --- E00xx: Lexical Analysis Errors ---

pub const E0000_UNEXPECTED_CHAR: ErrorCode = ErrorCode {
    code: "E0000",
    level: DiagnosticLevel::Error,
    message: "Unexpected character",
    explanation: "The character is not part of the language. Scanning continues with the next character.",
};

pub const E0001_UNTERMINATED_STRING: ErrorCode = ErrorCode {
    code: "E0001",
    level: DiagnosticLevel::Error,
    message: "Unterminated string",
    explanation: "A string literal reached the end of the input before its closing quote. \
                  The text read so far is still emitted as a string token.",
};

pub const E0002_UNTERMINATED_COMMENT: ErrorCode = ErrorCode {
    code: "E0002",
    level: DiagnosticLevel::Error,
    message: "Unterminated block comment",
    explanation: "A `/*` comment (block comments nest) was never closed. The rest of the input is treated as comment.",
};

pub const E0003_INVALID_ESCAPE: ErrorCode = ErrorCode {
    code: "E0003",
    level: DiagnosticLevel::Error,
    message: "Invalid escape sequence",
    explanation: "Recognised escapes are \\n \\t \\r \\\\ \\' \\\" \\0 and \\xHH with two hex digits.",
};

pub const E0004_MALFORMED_NUMBER: ErrorCode = ErrorCode {
    code: "E0004",
    level: DiagnosticLevel::Error,
    message: "Malformed numeric literal",
    explanation: "A `0x` prefix needs at least one hex digit, an exponent needs at least one decimal digit, and an integer must fit in 64 bits.",
};

// --- E01xx: Syntax Analysis (Parsing) Errors ---

pub const E0100_SYNTAX_ERROR: ErrorCode = ErrorCode {
    code: "E0100",
    level: DiagnosticLevel::Error,
    message: "Syntax error",
    explanation: "The tokens do not form a valid statement. The parser discards the statement \
                  up to the next newline, semicolon or statement keyword and continues.",
};

pub const E0101_UNEXPECTED_CLOSER: ErrorCode = ErrorCode {
    code: "E0101",
    level: DiagnosticLevel::Error,
    message: "Unexpected block terminator",
    explanation: "An `end`, `}`, `elif` or `else` appeared with no open block to close.",
};

// --- E02xx: Semantic Analysis Errors ---

pub const E0200_UNDEFINED_VARIABLE: ErrorCode = ErrorCode {
    code: "E0200",
    level: DiagnosticLevel::Error,
    message: "Undefined variable",
    explanation: "No declaration of this name is visible from the current scope.",
};

pub const E0201_ALREADY_DECLARED: ErrorCode = ErrorCode {
    code: "E0201",
    level: DiagnosticLevel::Error,
    message: "Symbol already declared",
    explanation: "A name may be declared only once per scope. Declaring it again in a nested scope shadows the outer one.",
};

pub const E0202_TYPE_MISMATCH: ErrorCode = ErrorCode {
    code: "E0202",
    level: DiagnosticLevel::Error,
    message: "Type mismatch",
    explanation: "The operand or value types are not compatible. Int and Float convert into each other; \
                  Auto and Unknown are compatible with everything.",
};

pub const E0203_INVALID_ASSIGN_TARGET: ErrorCode = ErrorCode {
    code: "E0203",
    level: DiagnosticLevel::Error,
    message: "Invalid assignment target",
    explanation: "Only identifiers, member accesses and index accesses can be assigned to.",
};

pub const E0204_UNDEFINED_FUNCTION: ErrorCode = ErrorCode {
    code: "E0204",
    level: DiagnosticLevel::Error,
    message: "Undefined function",
    explanation: "The callee does not name a declared function.",
};

pub const E0205_WRONG_ARGUMENT_COUNT: ErrorCode = ErrorCode {
    code: "E0205",
    level: DiagnosticLevel::Error,
    message: "Wrong number of arguments",
    explanation: "Calls must pass exactly as many arguments as the function declares parameters.",
};

pub const E0206_USED_BEFORE_INIT: ErrorCode = ErrorCode {
    code: "E0206",
    level: DiagnosticLevel::Error,
    message: "Variable used before initialization",
    explanation: "The variable is declared but no initializer or assignment has been seen before this use.",
};

pub const E0207_CONST_WITHOUT_INIT: ErrorCode = ErrorCode {
    code: "E0207",
    level: DiagnosticLevel::Error,
    message: "Const declaration requires initializer",
    explanation: "A `const` binding can never be assigned later, so it must be initialized where it is declared.",
};

pub const E0208_ASSIGNMENT_TO_CONST: ErrorCode = ErrorCode {
    code: "E0208",
    level: DiagnosticLevel::Error,
    message: "Cannot assign to const variable",
    explanation: "Variables declared with `const` are read-only after their declaration.",
};

pub const E0209_RETURN_TYPE_MISMATCH: ErrorCode = ErrorCode {
    code: "E0209",
    level: DiagnosticLevel::Error,
    message: "Return type mismatch",
    explanation: "The first typed `return` (or the declared annotation) fixes a function's return type; \
                  every later `return` must agree with it.",
};

pub const E0210_CONTROL_FLOW_OUTSIDE_LOOP: ErrorCode = ErrorCode {
    code: "E0210",
    level: DiagnosticLevel::Error,
    message: "Control flow statement outside of a loop",
    explanation: "`break` and `continue` are only meaningful inside `while`, `do` and `for` bodies.",
};

pub const E0211_UNKNOWN_TYPE: ErrorCode = ErrorCode {
    code: "E0211",
    level: DiagnosticLevel::Error,
    message: "Unknown type name",
    explanation: "Type annotations accept int, float, string, bool, void, auto, array, object, function and null.",
};

// --- E03xx: IR Lowering Errors ---

pub const E0300_INTERNAL_LOWERING_ERROR: ErrorCode = ErrorCode {
    code: "E0300",
    level: DiagnosticLevel::Error,
    message: "Internal lowering error",
    explanation: "The lowering pass met a name that the semantic pass should have rejected. This is a compiler bug.",
};

pub const E0301_UNSUPPORTED_CONSTRUCT: ErrorCode = ErrorCode {
    code: "E0301",
    level: DiagnosticLevel::Error,
    message: "Construct not supported by the IR",
    explanation: "The program is valid but uses a construct the stack IR cannot express yet.",
};

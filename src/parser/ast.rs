use std::fmt;

use crate::analyzer::DataType;
use crate::utils::Span;

// --- 1. Core wrappers ---

/// Every statement carries the span it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub kind: T,
    pub span: Span,
}

impl<T> Node<T> {
    pub fn new(kind: T, span: Span) -> Self {
        Self { kind, span }
    }

    /// Converts the inner kind while keeping the span.
    pub fn map<U, F>(self, f: F) -> Node<U>
    where
        F: FnOnce(T) -> U,
    {
        Node {
            kind: f(self.kind),
            span: self.span,
        }
    }
}

/// A variable, function, parameter or member name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// A type written in the source, resolved by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub name: String,
    pub span: Span,
}

impl TypeAnnotation {
    pub fn new(name: &str, span: Span) -> Self {
        Self {
            name: name.to_string(),
            span,
        }
    }
}

// --- 2. Program and statements ---

/// The root of a parsed source file. Always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

pub type Stmt = Node<StmtKind>;

/// An ordered statement list. Braced and `end`-terminated blocks produce the same node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    VarDecl(VarDecl),
    Function(FunctionDecl),
    Class(ClassDecl),
    If(IfStmt),
    For(ForStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    Try(TryStmt),
    Throw(Expr),
    Return(Option<Expr>),
    Break,
    Continue,
    Assign(AssignStmt),
    Expr(Expr),
    Block(Block),
    Embed(EmbedCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

/// `var`, `let` and `const` declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: DeclKind,
    pub name: Identifier,
    pub annotation: Option<TypeAnnotation>,
    pub initializer: Option<Expr>,
    /// The variable's type once analyzed.
    pub data_type: DataType,
}

impl VarDecl {
    pub fn is_const(&self) -> bool {
        self.kind == DeclKind::Const
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Identifier,
    pub annotation: Option<TypeAnnotation>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Identifier,
    pub params: Vec<Param>,
    pub return_annotation: Option<TypeAnnotation>,
    pub body: Block,
    /// Declared or inferred return type, written by the analyzer.
    pub return_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Identifier,
    pub body: Block,
}

/// `elif` chains are nested `IfStmt`s hanging off `else_branch`; a plain `else` is a `Block`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub variable: Identifier,
    pub iterable: ForIterable,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForIterable {
    /// `range(n)`, `range(a, b)` or `a..b`.
    Range(RangeExpr),
    Collection(Expr),
}

/// Half-open integer range. A missing start means zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeExpr {
    pub start: Option<Expr>,
    pub end: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStmt {
    pub body: Block,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub body: Block,
    pub catch: Option<CatchClause>,
    pub finally: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub binding: Option<Identifier>,
    pub body: Block,
}

/// `target = value`, or `target op= value` when `op` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Expr,
    pub op: Option<BinaryOp>,
    pub value: Expr,
}

/// Foreign code between `#embed <language>` and `#endembed`, never interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedCode {
    pub language: String,
    pub code: String,
}

// --- 3. Expressions ---

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// `Unknown` until the analyzer has visited the node.
    pub ty: DataType,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: DataType::Unknown,
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// `=` nested inside an expression, e.g. the inner `b = c` of `a = b = c`.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: Identifier,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Array(Vec<Expr>),
    Object(Vec<(Identifier, Expr)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Raw numeric text; its type is decided during analysis.
    Number(String),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

use std::fmt::{self, Display, Formatter};

use super::TokenKind;
use crate::utils::Span;

/// A token together with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// 1-based.
    pub line: u32,
    /// 1-based, counted in bytes.
    pub column: u32,
}

impl Token {
    /// The token's source form. Strings are re-quoted with their escapes restored.
    pub fn text(&self) -> String {
        self.kind.to_string()
    }
}

/// The generic operator token. Each variant knows its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    PlusPlus,
    MinusMinus,
    ThinArrow,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Power => "**",
            Operator::Assign => "=",
            Operator::EqEq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::LtEq => "<=",
            Operator::GtEq => ">=",
            Operator::AndAnd => "&&",
            Operator::OrOr => "||",
            Operator::Bang => "!",
            Operator::Amp => "&",
            Operator::Pipe => "|",
            Operator::Caret => "^",
            Operator::Tilde => "~",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::PlusAssign => "+=",
            Operator::MinusAssign => "-=",
            Operator::StarAssign => "*=",
            Operator::SlashAssign => "/=",
            Operator::PercentAssign => "%=",
            Operator::AmpAssign => "&=",
            Operator::PipeAssign => "|=",
            Operator::CaretAssign => "^=",
            Operator::PlusPlus => "++",
            Operator::MinusMinus => "--",
            Operator::ThinArrow => "->",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TokenKind {
    /// Tokens that can start a statement. Error recovery stops in front of them.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Var
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Function
                | TokenKind::Class
                | TokenKind::Return
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Try
                | TokenKind::Throw
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Hash
        )
    }

    /// Tokens that close (or continue) an enclosing block.
    pub fn closes_block(&self) -> bool {
        matches!(
            self,
            TokenKind::End
                | TokenKind::Elif
                | TokenKind::Else
                | TokenKind::Catch
                | TokenKind::Finally
                | TokenKind::RBrace
        )
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Semicolon)
    }

    /// A short description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Number(text) => format!("number '{text}'"),
            TokenKind::Str(_) => "string literal".to_string(),
            other => format!("'{other}'"),
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Ident(name) => return f.write_str(name),
            TokenKind::Number(text) => return f.write_str(text),
            TokenKind::Str(value) => return write!(f, "\"{}\"", value.escape_default()),
            TokenKind::Op(op) => op.as_str(),
            TokenKind::Var => "var",
            TokenKind::Const => "const",
            TokenKind::Let => "let",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::End => "end",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Finally => "finally",
            TokenKind::Throw => "throw",
            TokenKind::Class => "class",
            TokenKind::Embed => "embed",
            TokenKind::EndEmbed => "endembed",
            TokenKind::IntType => "int",
            TokenKind::FloatType => "float",
            TokenKind::StringType => "string",
            TokenKind::BoolType => "bool",
            TokenKind::AutoType => "auto",
            TokenKind::VoidType => "void",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Arrow => "=>",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Question => "?",
            TokenKind::Hash => "#",
            TokenKind::At => "@",
            TokenKind::Newline => "\n",
            TokenKind::BlockComment | TokenKind::Eof => "",
        };
        f.write_str(text)
    }
}

// src/lexer/mod.rs

mod token;

use logos::{Lexer, Logos, Skip};

use crate::diagnostics::{Diagnostic, codes};
use crate::utils::{LineIndex, Span};

pub use token::{Operator, Token};

/// Diagnostics raised from inside token callbacks, drained by [`tokenize`].
#[derive(Debug, Default)]
pub struct LexExtras {
    pub issues: Vec<Diagnostic>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub enum LexingError {
    #[default]
    UnexpectedCharacter,
}

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(extras = LexExtras)]
#[logos(error = LexingError)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    // Keywords
    #[token("var")]
    Var,
    #[token("const")]
    Const,
    #[token("let")]
    Let,
    #[token("function")]
    Function,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("end")]
    End,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("throw")]
    Throw,
    #[token("class")]
    Class,

    // Embedded-language markers, used after `#`
    #[token("embed")]
    Embed,
    #[token("endembed")]
    EndEmbed,

    // Type keywords
    #[token("int")]
    IntType,
    #[token("float")]
    FloatType,
    #[token("string")]
    StringType,
    #[token("bool")]
    BoolType,
    #[token("auto")]
    AutoType,
    #[token("void")]
    VoidType,

    // Literals
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    #[token("nil")]
    Null,
    #[regex("[0-9]+", lex_number)]
    #[regex(r"\.[0-9]+", lex_number)]
    Number(String),
    #[token("\"", lex_string)]
    #[token("'", lex_string)]
    #[token("`", lex_string)]
    Str(String),

    #[regex("[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("+", |_| Operator::Plus)]
    #[token("-", |_| Operator::Minus)]
    #[token("*", |_| Operator::Star)]
    #[token("/", |_| Operator::Slash)]
    #[token("%", |_| Operator::Percent)]
    #[token("**", |_| Operator::Power)]
    #[token("=", |_| Operator::Assign)]
    #[token("==", |_| Operator::EqEq)]
    #[token("!=", |_| Operator::NotEq)]
    #[token("<", |_| Operator::Lt)]
    #[token(">", |_| Operator::Gt)]
    #[token("<=", |_| Operator::LtEq)]
    #[token(">=", |_| Operator::GtEq)]
    #[token("&&", |_| Operator::AndAnd)]
    #[token("||", |_| Operator::OrOr)]
    #[token("!", |_| Operator::Bang)]
    #[token("&", |_| Operator::Amp)]
    #[token("|", |_| Operator::Pipe)]
    #[token("^", |_| Operator::Caret)]
    #[token("~", |_| Operator::Tilde)]
    #[token("<<", |_| Operator::Shl)]
    #[token(">>", |_| Operator::Shr)]
    #[token("+=", |_| Operator::PlusAssign)]
    #[token("-=", |_| Operator::MinusAssign)]
    #[token("*=", |_| Operator::StarAssign)]
    #[token("/=", |_| Operator::SlashAssign)]
    #[token("%=", |_| Operator::PercentAssign)]
    #[token("&=", |_| Operator::AmpAssign)]
    #[token("|=", |_| Operator::PipeAssign)]
    #[token("^=", |_| Operator::CaretAssign)]
    #[token("++", |_| Operator::PlusPlus)]
    #[token("--", |_| Operator::MinusMinus)]
    #[token("->", |_| Operator::ThinArrow)]
    Op(Operator),

    #[token("=>")]
    Arrow,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("?")]
    Question,
    #[token("#")]
    Hash,
    #[token("@")]
    At,

    #[token("\n")]
    Newline,

    /// Never produced; its callback swallows a (nested) block comment.
    #[token("/*", skip_block_comment)]
    BlockComment,

    /// Appended once by [`tokenize`].
    Eof,
}

/// Tokenizes `source`. Never fails: problems are returned as diagnostics next to a token
/// stream that always ends in exactly one [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let lines = LineIndex::new(source);
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();

    while let Some(result) = lexer.next() {
        diagnostics.append(&mut lexer.extras.issues);
        let span = Span::from(lexer.span());
        let (line, column) = lines.line_col(span.start);
        match result {
            Ok(kind) => tokens.push(Token {
                kind,
                span,
                line,
                column,
            }),
            Err(LexingError::UnexpectedCharacter) => {
                let c = lexer.slice().chars().next().unwrap_or('\0');
                diagnostics.push(Diagnostic::at(
                    &codes::E0000_UNEXPECTED_CHAR,
                    span,
                    format!("Unexpected character '{}' (0x{:02X})", c, c as u32),
                ));
            }
        }
    }
    diagnostics.append(&mut lexer.extras.issues);

    let end = Span::new(source.len(), source.len());
    let (line, column) = lines.line_col(end.start);
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: end,
        line,
        column,
    });

    tracing::debug!(
        tokens = tokens.len(),
        errors = diagnostics.len(),
        "lexing finished"
    );
    (tokens, diagnostics)
}

fn position(source: &str, offset: usize) -> (u32, u32) {
    LineIndex::new(&source[..offset]).line_col(offset)
}

fn skip_block_comment(lex: &mut Lexer<TokenKind>) -> Skip {
    let rest = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < rest.len() {
        if rest[i..].starts_with(b"/*") {
            depth += 1;
            i += 2;
        } else if rest[i..].starts_with(b"*/") {
            depth -= 1;
            i += 2;
            if depth == 0 {
                lex.bump(i);
                return Skip;
            }
        } else {
            i += 1;
        }
    }

    let start = lex.span().start;
    let (line, _) = position(lex.source(), start);
    lex.extras.issues.push(Diagnostic::at(
        &codes::E0002_UNTERMINATED_COMMENT,
        Span::new(start, start + 2),
        format!("Unterminated block comment starting at line {line}"),
    ));
    lex.bump(rest.len());
    Skip
}

fn lex_number(lex: &mut Lexer<TokenKind>) -> String {
    let start = lex.span().start;
    let slice_len = lex.slice().len();
    let leading_dot = lex.slice().starts_with('.');
    let rest = lex.remainder().as_bytes();
    let digits_from = |from: usize| rest[from.min(rest.len())..].iter().take_while(|b| b.is_ascii_digit()).count();

    if lex.slice() == "0" && matches!(rest.first(), Some(b'x' | b'X')) {
        let hex = rest[1..].iter().take_while(|b| b.is_ascii_hexdigit()).count();
        if hex == 0 {
            lex.extras.issues.push(Diagnostic::at(
                &codes::E0004_MALFORMED_NUMBER,
                Span::new(start, start + 2),
                "Expected hex digits after '0x'",
            ));
        }
        lex.bump(1 + hex);
        if hex > 0 {
            let digits = &lex.slice()[2..];
            check_int_range(lex, digits, 16);
        }
        return lex.slice().to_string();
    }

    let mut i = 0;
    // `1..5` is a range, so the dot is only a decimal point when another dot does not follow.
    if !leading_dot && rest.first() == Some(&b'.') && rest.get(1) != Some(&b'.') {
        i = 1 + digits_from(1);
    }
    if matches!(rest.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(rest.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exponent = digits_from(j);
        if exponent == 0 {
            let at = start + slice_len + i;
            lex.extras.issues.push(Diagnostic::at(
                &codes::E0004_MALFORMED_NUMBER,
                Span::new(at, at + 1),
                "Expected digit after exponent",
            ));
        }
        i = j + exponent;
    }
    lex.bump(i);
    if i == 0 && !leading_dot {
        let digits = lex.slice();
        check_int_range(lex, digits, 10);
    }
    lex.slice().to_string()
}

/// Integer literals must fit the 64-bit signed range the IR carries.
fn check_int_range(lex: &mut Lexer<TokenKind>, digits: &str, radix: u32) {
    if i64::from_str_radix(digits, radix).is_err() {
        let span = lex.span();
        let message = format!("Integer literal '{}' does not fit in 64 bits", lex.slice());
        lex.extras.issues.push(Diagnostic::at(
            &codes::E0004_MALFORMED_NUMBER,
            Span::new(span.start, span.end),
            message,
        ));
    }
}

fn lex_string(lex: &mut Lexer<TokenKind>) -> String {
    let quote = lex.slice().chars().next().unwrap_or('"');
    let start = lex.span().start;
    let body_start = lex.span().end;
    let rest = lex.remainder();

    let mut value = String::new();
    let mut issues = Vec::new();
    let mut closed_at = None;
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        if c == quote {
            closed_at = Some(i + c.len_utf8());
            break;
        }
        if c != '\\' {
            value.push(c);
            continue;
        }
        let Some((j, escaped)) = chars.next() else {
            break;
        };
        match escaped {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '\\' => value.push('\\'),
            '\'' => value.push('\''),
            '"' => value.push('"'),
            '0' => value.push('\0'),
            'x' => {
                let hex = rest.get(j + 1..j + 3).filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()));
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        value.push(byte as char);
                        chars.next();
                        chars.next();
                    }
                    None => {
                        issues.push(Diagnostic::at(
                            &codes::E0003_INVALID_ESCAPE,
                            Span::new(body_start + i, body_start + j + 1),
                            "Invalid hex escape",
                        ));
                        value.push('x');
                    }
                }
            }
            other => {
                issues.push(Diagnostic::at(
                    &codes::E0003_INVALID_ESCAPE,
                    Span::new(body_start + i, body_start + j + other.len_utf8()),
                    format!("Unknown escape '\\{other}'"),
                ));
                value.push(other);
            }
        }
    }

    match closed_at {
        Some(consumed) => lex.bump(consumed),
        None => {
            let (line, column) = position(lex.source(), start);
            issues.push(Diagnostic::at(
                &codes::E0001_UNTERMINATED_STRING,
                Span::new(start, start + 1),
                format!("Unterminated string starting at line {line}, col {column}"),
            ));
            lex.bump(rest.len());
        }
    }
    lex.extras.issues.extend(issues);
    value
}

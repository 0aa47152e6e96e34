//! src/parser/mod.rs
//!
//! Turns the token stream into a [`Program`]. Statements are parsed with recovery, so a
//! malformed statement costs one diagnostic and the rest of the file is still parsed.

pub mod ast;
mod parsers;
#[cfg(test)]
mod test;

use chumsky::error::{Rich, RichPattern, RichReason};
use chumsky::input::{Input, Stream};
use chumsky::Parser;

use crate::diagnostics::{Diagnostic, codes};
use crate::lexer::{Token, TokenKind};
use crate::parser::ast::Program;
use crate::utils::Span;
use parsers::program_parser;

/// Parses a token sequence (as produced by [`crate::lexer::tokenize`]).
///
/// The returned program always exists; statements that failed to parse are left out and
/// described by the returned diagnostics.
pub fn parse(tokens: &[Token]) -> (Program, Vec<Diagnostic>) {
    let eoi = tokens
        .last()
        .map(|t| Span::new(t.span.end, t.span.end))
        .unwrap_or_default();
    let pairs: Vec<(TokenKind, Span)> = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| (t.kind.clone(), t.span))
        .collect();
    let token_stream = Stream::from_iter(pairs).map(eoi, |(kind, span)| (kind, span));

    let (program, errors) = program_parser().parse(token_stream).into_output_errors();
    let program = program.unwrap_or_default();
    let diagnostics: Vec<Diagnostic> = errors.iter().map(to_diagnostic).collect();

    tracing::debug!(
        statements = program.statements.len(),
        errors = diagnostics.len(),
        "parsing finished"
    );
    (program, diagnostics)
}

fn to_diagnostic(error: &Rich<'_, TokenKind, Span>) -> Diagnostic {
    let span = *error.span();
    if let RichReason::Custom(message) = error.reason() {
        return Diagnostic::at(&codes::E0101_UNEXPECTED_CLOSER, span, message.to_string());
    }

    let found = error
        .found()
        .map_or_else(|| "end of input".to_string(), TokenKind::describe);

    let mut expected: Vec<String> = error.expected().map(describe_pattern).collect();
    expected.sort();
    expected.dedup();
    let expected = if expected.is_empty() {
        "something else".to_string()
    } else {
        expected.join(" or ")
    };

    Diagnostic::at(
        &codes::E0100_SYNTAX_ERROR,
        span,
        format!("expected {expected}, found {found}"),
    )
}

fn describe_pattern(pattern: &RichPattern<'_, TokenKind>) -> String {
    match pattern {
        RichPattern::Token(token) => token.describe(),
        RichPattern::Label(label) => label.to_string(),
        RichPattern::EndOfInput => "end of input".to_string(),
        other => other.to_string(),
    }
}

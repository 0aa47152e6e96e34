pub mod codes;

use std::fmt;

use ariadne::{Color, Config, Label as AriadneLabel, Report, ReportKind, Source};

use crate::utils::{LineIndex, Span};
use codes::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// One problem found in the source, tied to a code from [`codes`].
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    code: &'static str,
    level: DiagnosticLevel,
    message: String,
    labels: Vec<Label>,
    notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(error_code: &'static ErrorCode, primary_label: Label) -> Self {
        Self {
            code: error_code.code,
            level: error_code.level,
            message: error_code.message.to_string(),
            labels: vec![primary_label],
            notes: Vec::new(),
        }
    }

    /// Shorthand for a diagnostic whose primary label repeats the message.
    pub fn at(error_code: &'static ErrorCode, span: Span, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(error_code, Label::new(span, message.clone())).with_dynamic_message(message)
    }

    /// Replaces the code's default message with one carrying concrete names or types.
    pub fn with_dynamic_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_secondary_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn code(&self) -> &str {
        self.code
    }

    pub fn level(&self) -> DiagnosticLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    pub fn span(&self) -> Span {
        self.labels.first().map(|l| l.span).unwrap_or_default()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Every diagnostic reported while compiling one source text.
#[derive(Debug)]
pub struct DiagnosticBag {
    source: String,
    lines: LineIndex,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            lines: LineIndex::new(source),
            diagnostics: Vec::new(),
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn line_col(&self, diagnostic: &Diagnostic) -> (u32, u32) {
        self.lines.line_col(diagnostic.span().start)
    }

    /// One line per diagnostic, `[line L:C] CODE: message`.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|d| {
                let (line, col) = self.line_col(d);
                format!("[line {line}:{col}] {d}")
            })
            .collect()
    }

    /// Renders every diagnostic with ariadne, without colors.
    pub fn render(&self, file_name: &str) -> String {
        let mut out = Vec::new();
        for diag in &self.diagnostics {
            let report = build_report(file_name, diag, false);
            let cache = (file_name, Source::from(self.source.as_str()));
            if report.write(cache, &mut out).is_err() {
                break;
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Prints every diagnostic to stderr.
    pub fn print(&self, file_name: &str) {
        for diag in &self.diagnostics {
            let report = build_report(file_name, diag, true);
            let cache = (file_name, Source::from(self.source.as_str()));
            if let Err(err) = report.eprint(cache) {
                tracing::warn!("failed to print diagnostic {}: {err}", diag.code);
            }
        }
    }
}

fn build_report<'a>(
    file_name: &'a str,
    diag: &Diagnostic,
    color: bool,
) -> Report<'a, (&'a str, std::ops::Range<usize>)> {
    let kind = match diag.level {
        DiagnosticLevel::Error => ReportKind::Error,
        DiagnosticLevel::Warning => ReportKind::Warning,
    };
    let primary_color = match diag.level {
        DiagnosticLevel::Error => Color::Red,
        DiagnosticLevel::Warning => Color::Yellow,
    };

    let mut report = Report::build(kind, (file_name, diag.span().range()))
        .with_config(Config::default().with_color(color))
        .with_message(&diag.message)
        .with_code(diag.code);

    for (i, label_info) in diag.labels.iter().enumerate() {
        let label = AriadneLabel::new((file_name, label_info.span.range()))
            .with_message(&label_info.message)
            .with_color(if i == 0 { primary_color } else { Color::Blue });
        report.add_label(label);
    }

    for note in &diag.notes {
        report = report.with_note(note);
    }

    report.finish()
}

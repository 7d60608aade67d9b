//! Diagnostic rendering.
//!
//! Diagnostics and fatal errors are rendered against the original Sable
//! source with ariadne. Output is colorless so it can be snapshot-tested. The
//! same data is also available as one JSON object per diagnostic for tools.

use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};
use sable_common::{LineIndex, Span};
use sable_lower::{Diagnostic, Severity};

use crate::CompileError;

/// Render a lowering diagnostic.
pub fn render_diagnostic(diagnostic: &Diagnostic, source: &str) -> String {
    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let span = diagnostic.origin.map(|o| o.span);
    let range = clamp(span, source);
    let mut builder = Report::build(kind, range.clone())
        .with_code(diagnostic.code)
        .with_message(&diagnostic.message)
        .with_config(Config::default().with_color(false));
    builder.add_label(Label::new(range).with_message(label_for(diagnostic)));
    for note in &diagnostic.notes {
        builder = builder.with_note(note);
    }
    write(builder.finish(), source)
}

/// Render a fatal error from any stage.
pub fn render_error(error: &CompileError, source: &str) -> String {
    let (code, range, label) = match error {
        CompileError::Preprocess(err) => ("E0001", clamp(Some(err.span), source), "while preprocessing"),
        CompileError::Parse { line, .. } => ("E0002", line_range(*line, source), "in the code generated for this line"),
        CompileError::Lower(err) => ("E0003", clamp(err.origin().map(|o| o.span), source), "while lowering"),
        CompileError::Config(_) | CompileError::Io { .. } => {
            return format!("error: {error}\n");
        }
    };
    let report = Report::build(ReportKind::Error, range.clone())
        .with_code(code)
        .with_message(error.to_string())
        .with_config(Config::default().with_color(false))
        .with_label(Label::new(range).with_message(label))
        .finish();
    write(report, source)
}

/// One JSON object describing `diagnostic`.
pub fn to_json(diagnostic: &Diagnostic, file: &str) -> serde_json::Value {
    let severity = match diagnostic.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    serde_json::json!({
        "code": diagnostic.code.as_str(),
        "severity": severity,
        "message": diagnostic.message,
        "file": file,
        "line": diagnostic.origin.map(|o| o.line),
        "span": diagnostic.origin.map(|o| [o.span.start, o.span.end]),
        "notes": diagnostic.notes,
    })
}

fn label_for(diagnostic: &Diagnostic) -> &'static str {
    match diagnostic.code {
        sable_lower::DiagnosticCode::NeedsAnnotation => "type unknown here",
        sable_lower::DiagnosticCode::ExhaustivenessGap => "not every value is matched",
        sable_lower::DiagnosticCode::RedundantArm => "never selected",
        sable_lower::DiagnosticCode::PayloadArity => "wrong number of payloads",
    }
}

/// Byte range of `span` inside `source`, at least one byte wide when the
/// source is not empty.
fn clamp(span: Option<Span>, source: &str) -> Range<usize> {
    let len = source.len();
    let Some(span) = span.filter(|s| !s.is_detached()) else {
        return 0..len.min(1);
    };
    let start = (span.start as usize).min(len);
    let end = (span.end as usize).clamp(start, len);
    if start == end {
        start.saturating_sub(usize::from(start == len))..(start + 1).min(len)
    } else {
        start..end
    }
}

/// Byte range of the 1-based `line`, without its newline.
fn line_range(line: Option<u32>, source: &str) -> Range<usize> {
    let Some(line) = line else {
        return 0..source.len().min(1);
    };
    let index = LineIndex::new(source);
    if line == 0 || line as usize > index.line_count() {
        return 0..source.len().min(1);
    }
    let start = index.line_start(line) as usize;
    let end = source[start..].find('\n').map_or(source.len(), |n| start + n);
    clamp(Some(Span::new(start as u32, end as u32)), source)
}

fn write(report: Report<'_, Range<usize>>, source: &str) -> String {
    let mut buf = Vec::new();
    if let Err(err) = report.write(Source::from(source), &mut buf) {
        tracing::warn!(%err, "failed to render diagnostic");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

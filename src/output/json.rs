//! JSON output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, LintFix};
use crate::engine::{LintResult, RuleFailure};
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_default()
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    diagnostics: Vec<JsonDiagnostic<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rule_failures: Vec<JsonRuleFailure>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    rule_id: &'a str,
    severity: String,
    message: &'a str,
    file: String,
    line: usize,
    column: usize,
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_line: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fixes: Vec<JsonFix<'a>>,
}

#[derive(Serialize)]
struct JsonFix<'a> {
    kind: String,
    safety: String,
    description: String,
    insert: &'a str,
    line: usize,
    column: usize,
}

#[derive(Serialize)]
struct JsonRuleFailure {
    rule_id: String,
    file: String,
    line: usize,
    column: usize,
    message: String,
}

#[derive(Serialize)]
struct JsonSummary {
    files_processed: usize,
    files_with_errors: usize,
    files_with_warnings: usize,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
    suppressed_count: usize,
    duration_ms: u128,
}

impl<'a> From<&'a LintFix> for JsonFix<'a> {
    fn from(fix: &'a LintFix) -> Self {
        let position = fix.anchor.position();
        Self {
            kind: fix.kind.to_string(),
            safety: fix.safety.to_string(),
            description: fix.description(),
            insert: fix.edit.raw(),
            line: position.line,
            column: position.column,
        }
    }
}

impl<'a> From<&'a Diagnostic> for JsonDiagnostic<'a> {
    fn from(d: &'a Diagnostic) -> Self {
        Self {
            rule_id: &d.rule_id,
            severity: d.severity.to_string(),
            message: &d.message,
            file: d.location.file.display().to_string(),
            line: d.location.line,
            column: d.location.column,
            length: d.location.length,
            source_line: d.source_line.as_deref(),
            help: d.help.as_deref(),
            fixes: d.fixes.iter().map(JsonFix::from).collect(),
        }
    }
}

impl From<&RuleFailure> for JsonRuleFailure {
    fn from(f: &RuleFailure) -> Self {
        Self {
            rule_id: f.rule_id.clone(),
            file: f.location.file.display().to_string(),
            line: f.location.line,
            column: f.location.column,
            message: f.error.to_string(),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &LintResult) -> String {
        let output = JsonOutput {
            diagnostics: result.diagnostics.iter().map(JsonDiagnostic::from).collect(),
            rule_failures: result
                .rule_failures
                .iter()
                .map(JsonRuleFailure::from)
                .collect(),
            summary: JsonSummary {
                files_processed: result.files_processed,
                files_with_errors: result.files_with_errors,
                files_with_warnings: result.files_with_warnings,
                error_count: result.error_count,
                warning_count: result.warning_count,
                info_count: result.info_count,
                suppressed_count: result.suppressed_count,
                duration_ms: result.duration.as_millis(),
            },
        };

        self.render(&output)
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        self.render(&JsonDiagnostic::from(diagnostic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::segment::{PositionMarker, Segment};
    use std::path::Path;

    fn diagnostic() -> Diagnostic {
        let anchor = Segment::token("+", &["binary_operator"])
            .with_position(PositionMarker::new(10, 5, 0));
        let next = Segment::token("b", &["column_reference"])
            .with_position(PositionMarker::new(10, 6, 0));
        let edit = Segment::whitespace(" ", next.position()).unwrap();
        Diagnostic::new("L006", Severity::Warning, "Missing whitespace after +", &anchor)
            .with_file(Path::new("query.sql"))
            .with_fix(LintFix::create_before(&next, edit))
    }

    #[test]
    fn test_json_format_diagnostic() {
        let formatter = JsonFormatter::new();
        let output = formatter.format_diagnostic(&diagnostic());

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["rule_id"], "L006");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["line"], 10);
        assert_eq!(value["column"], 5);
        assert_eq!(value["fixes"][0]["kind"], "create");
        assert_eq!(value["fixes"][0]["insert"], " ");
        assert_eq!(value["fixes"][0]["column"], 6);
        assert!(value.get("help").is_none());
    }

    #[test]
    fn test_json_format_result() {
        let formatter = JsonFormatter::new();
        let result = LintResult {
            diagnostics: vec![],
            files_processed: 5,
            error_count: 2,
            warning_count: 3,
            ..Default::default()
        };

        let output = formatter.format(&result);
        assert!(output.contains("\"files_processed\":5"));
        assert!(output.contains("\"error_count\":2"));
        assert!(output.contains("\"warning_count\":3"));
        assert!(!output.contains("rule_failures"));
    }

    #[test]
    fn test_json_pretty() {
        let formatter = JsonFormatter::new().pretty();
        let output = formatter.format_diagnostic(&diagnostic());
        assert!(output.contains('\n'));
    }
}

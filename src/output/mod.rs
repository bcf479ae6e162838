//! Output formatters for lint results

mod compact;
mod json;
mod text;

pub use compact::CompactFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::OutputFormat;
use crate::diagnostic::Diagnostic;
use crate::engine::LintResult;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire lint result
    fn format(&self, result: &LintResult) -> String;

    /// Format a single diagnostic
    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String;
}

/// Formatter for a configured output format. `statistics` only affects text output.
pub fn formatter_for(
    format: OutputFormat,
    colored: bool,
    statistics: bool,
) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => {
            let mut formatter = TextFormatter::new();
            if !colored {
                formatter = formatter.without_color();
            }
            if !statistics {
                formatter = formatter.without_stats();
            }
            Box::new(formatter)
        }
        OutputFormat::Compact => Box::new(CompactFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use std::path::Path;

    #[test]
    fn test_formatter_for_each_format() {
        let diag = Diagnostic::for_file("parse-error", Severity::Error, "bad", Path::new("q.sql"));

        let compact = formatter_for(OutputFormat::Compact, false, true).format_diagnostic(&diag);
        assert_eq!(compact, "q.sql:0:0: error: parse-error: bad");

        let json = formatter_for(OutputFormat::Json, false, true).format_diagnostic(&diag);
        assert!(json.contains("\"rule_id\": \"parse-error\""));

        let text = formatter_for(OutputFormat::Text, false, true).format_diagnostic(&diag);
        assert!(text.starts_with("q.sql:0:0: error[parse-error]: bad"));
    }

    #[test]
    fn test_text_statistics_toggle() {
        let result = LintResult::default();

        let with_stats = formatter_for(OutputFormat::Text, false, true).format(&result);
        let without_stats = formatter_for(OutputFormat::Text, false, false).format(&result);
        assert!(with_stats.contains("0 files processed"));
        assert!(!without_stats.contains("processed"));
    }
}

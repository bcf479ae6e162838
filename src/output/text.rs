//! Human-readable text output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::LintResult;
use colored::*;
use std::path::PathBuf;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show source context
    pub show_source: bool,

    /// Show help text
    pub show_help: bool,

    /// Show fix suggestions
    pub show_fixes: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_source: true,
            show_help: true,
            show_fixes: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    /// Hide the summary footer
    pub fn without_stats(mut self) -> Self {
        self.show_stats = false;
        self
    }

    fn paint(&self, text: &str, style: fn(ColoredString) -> ColoredString) -> String {
        if self.colored {
            style(text.normal()).to_string()
        } else {
            text.to_string()
        }
    }

    fn severity_str(&self, severity: Severity) -> String {
        let s = severity.to_string();
        match severity {
            Severity::Error => self.paint(&s, |c| c.red().bold()),
            Severity::Warning => self.paint(&s, |c| c.yellow().bold()),
            Severity::Info => self.paint(&s, |c| c.blue()),
        }
    }

    fn format_location(&self, diag: &Diagnostic) -> String {
        format!(
            "{}:{}:{}",
            diag.location.file.display(),
            diag.location.line,
            diag.location.column
        )
    }

    fn count(&self, n: usize, singular: &str, plural: &str) -> String {
        format!("{} {}", n, if n == 1 { singular } else { plural })
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();

        // Group diagnostics by file, in the order files were first reported
        let mut by_file: Vec<(PathBuf, Vec<&Diagnostic>)> = Vec::new();
        for diag in &result.diagnostics {
            match by_file.iter_mut().find(|(f, _)| *f == diag.location.file) {
                Some((_, group)) => group.push(diag),
                None => by_file.push((diag.location.file.clone(), vec![diag])),
            }
        }

        for (file, diagnostics) in &by_file {
            output.push_str(&self.paint(&file.display().to_string(), |c| c.underline()));
            output.push('\n');

            for diag in diagnostics {
                output.push_str(&self.format_diagnostic(diag));
                output.push('\n');
            }
        }

        if !result.rule_failures.is_empty() {
            output.push_str(&self.paint("internal rule failures", |c| c.red().underline()));
            output.push('\n');
            for failure in &result.rule_failures {
                output.push_str(&format!("  {}\n", failure.message()));
            }
            output.push('\n');
        }

        if self.show_stats {
            output.push_str(&format!(
                "{} processed",
                self.count(result.files_processed, "file", "files")
            ));

            let mut counts = Vec::new();
            if result.error_count > 0 {
                let s = self.count(result.error_count, "error", "errors");
                counts.push(self.paint(&s, |c| c.red()));
            }
            if result.warning_count > 0 {
                let s = self.count(result.warning_count, "warning", "warnings");
                counts.push(self.paint(&s, |c| c.yellow()));
            }
            if result.info_count > 0 {
                let s = self.count(result.info_count, "info", "infos");
                counts.push(self.paint(&s, |c| c.blue()));
            }
            if result.suppressed_count > 0 {
                counts.push(format!("{} suppressed", result.suppressed_count));
            }

            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                result.duration.as_secs_f64()
            ));
        }

        output
    }

    fn format_diagnostic(&self, diag: &Diagnostic) -> String {
        let mut output = String::new();
        let gutter = self.paint("|", |c| c.blue());

        output.push_str(&format!(
            "{}: {}[{}]: {}\n",
            self.format_location(diag),
            self.severity_str(diag.severity),
            self.paint(&diag.rule_id, |c| c.cyan()),
            diag.message
        ));

        if self.show_source {
            if let Some(source) = &diag.source_line {
                let line_num = format!("{:>4}", diag.location.line);
                output.push_str(&format!("     {}\n", gutter));
                output.push_str(&format!(
                    "{} {} {}\n",
                    self.paint(&line_num, |c| c.blue()),
                    gutter,
                    source
                ));

                // Underline the anchor
                if diag.location.column > 0 {
                    let padding = " ".repeat(diag.location.column - 1);
                    let underline = "^".repeat(diag.location.length.max(1));
                    output.push_str(&format!(
                        "     {} {}{}\n",
                        gutter,
                        padding,
                        self.paint(&underline, |c| c.red())
                    ));
                }
            }
        }

        if self.show_help {
            if let Some(help) = &diag.help {
                output.push_str(&format!(
                    "     {} help: {}\n",
                    self.paint("=", |c| c.blue()),
                    help
                ));
            }
        }

        if self.show_fixes {
            for fix in &diag.fixes {
                output.push_str(&format!(
                    "     {} fix: {}\n",
                    self.paint("=", |c| c.green()),
                    self.paint(&fix.description(), |c| c.green())
                ));
            }
        }

        output
    }
}

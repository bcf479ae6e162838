//! Core linter engine

use crate::config::Config;
use crate::cst::{CstError, CstFile};
use crate::diagnostic::{Diagnostic, Location, Severity};
use crate::noqa::NoqaDirectives;
use crate::rule::{Rule, RuleError};
use crate::rules::builtin_rules;
use crate::segment::Segment;
use log::{debug, error};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-rule timing statistics
#[derive(Debug, Clone, Default)]
pub struct RuleTiming {
    /// Rule ID
    pub rule_id: String,
    /// Total time spent on this rule
    pub total_time: Duration,
    /// Number of times the rule was evaluated
    pub evaluation_count: usize,
    /// Number of diagnostics produced
    pub match_count: usize,
}

impl RuleTiming {
    /// Create a new timing entry
    pub fn new(rule_id: &str) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            ..Default::default()
        }
    }

    /// Average time per evaluation
    pub fn avg_time(&self) -> Duration {
        if self.evaluation_count > 0 {
            self.total_time / self.evaluation_count as u32
        } else {
            Duration::ZERO
        }
    }

    fn absorb(&mut self, other: &RuleTiming) {
        self.total_time += other.total_time;
        self.evaluation_count += other.evaluation_count;
        self.match_count += other.match_count;
    }
}

/// A rule that could not evaluate a node. Not a lint violation.
#[derive(Debug, Clone)]
pub struct RuleFailure {
    pub rule_id: String,
    /// Where the offending node starts
    pub location: Location,
    /// Kind of the offending node
    pub node_kind: String,
    pub error: RuleError,
}

impl RuleFailure {
    pub fn message(&self) -> String {
        format!(
            "{} failed on {} at {}:{}:{}: {}",
            self.rule_id,
            self.node_kind,
            self.location.file.display(),
            self.location.line,
            self.location.column,
            self.error
        )
    }
}

/// Result of linting operation
#[derive(Debug, Default)]
pub struct LintResult {
    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,

    /// Internal rule failures
    pub rule_failures: Vec<RuleFailure>,

    /// Files processed
    pub files_processed: usize,

    /// Files with errors
    pub files_with_errors: usize,

    /// Files with warnings
    pub files_with_warnings: usize,

    /// Total errors
    pub error_count: usize,

    /// Total warnings
    pub warning_count: usize,

    /// Total info messages
    pub info_count: usize,

    /// Diagnostics dropped by `-- noqa`
    pub suppressed_count: usize,

    /// Processing duration
    pub duration: Duration,

    /// Per-rule timing statistics (rule_id -> timing)
    pub rule_timings: HashMap<String, RuleTiming>,
}

impl LintResult {
    fn single_file() -> Self {
        Self {
            files_processed: 1,
            ..Self::default()
        }
    }

    /// Result for a file that could not be linted at all
    fn file_error(rule_id: &str, message: String, path: &Path) -> Self {
        let mut result = Self::single_file();
        result.push(Diagnostic::for_file(
            rule_id,
            Severity::Error,
            &message,
            path,
        ));
        result.files_with_errors = 1;
        result
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Info => self.info_count += 1,
        }
        self.diagnostics.push(diagnostic);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    /// Check if result is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.warning_count == 0
    }

    /// Get exit code (0 = success, 1 = warnings, 2 = errors)
    pub fn exit_code(&self) -> i32 {
        if self.error_count > 0 {
            2
        } else if self.warning_count > 0 {
            1
        } else {
            0
        }
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: LintResult) {
        self.diagnostics.extend(other.diagnostics);
        self.rule_failures.extend(other.rule_failures);
        self.files_processed += other.files_processed;
        self.files_with_errors += other.files_with_errors;
        self.files_with_warnings += other.files_with_warnings;
        self.error_count += other.error_count;
        self.warning_count += other.warning_count;
        self.info_count += other.info_count;
        self.suppressed_count += other.suppressed_count;

        for (rule_id, timing) in other.rule_timings {
            self.rule_timings
                .entry(rule_id)
                .or_insert_with(|| RuleTiming::new(&timing.rule_id))
                .absorb(&timing);
        }
    }

    /// Get rule timings sorted by total time (descending)
    pub fn sorted_timings(&self) -> Vec<&RuleTiming> {
        let mut timings: Vec<_> = self.rule_timings.values().collect();
        timings.sort_by(|a, b| b.total_time.cmp(&a.total_time));
        timings
    }

    /// Format timing statistics as a string
    pub fn format_timings(&self) -> String {
        let mut output = String::new();
        let timings = self.sorted_timings();

        if timings.is_empty() {
            return "No timing data available".to_string();
        }

        output.push_str("Rule Timing Statistics:\n");
        output.push_str(&format!(
            "{:<24} {:>12} {:>12} {:>10} {:>12}\n",
            "Rule ID", "Total", "Avg", "Evals", "Matches"
        ));
        output.push_str(&"-".repeat(74));
        output.push('\n');

        for timing in timings {
            let total_ms = timing.total_time.as_secs_f64() * 1000.0;
            let avg_us = timing.avg_time().as_secs_f64() * 1_000_000.0;

            output.push_str(&format!(
                "{:<24} {:>10.2}ms {:>10.2}µs {:>10} {:>12}\n",
                timing.rule_id, total_ms, avg_us, timing.evaluation_count, timing.match_count
            ));
        }

        output
    }
}

/// Outcome of one rule on one node
type NodeOutcome = (usize, Duration, Result<Vec<Diagnostic>, RuleError>);

/// The main linter engine
pub struct Engine {
    /// Configuration
    config: Config,

    /// Registered rules, in evaluation order
    rules: Vec<Arc<dyn Rule>>,
}

impl Engine {
    /// Create a new engine with the built-in rules
    pub fn new(config: Config) -> Self {
        Self::with_rules(config, builtin_rules())
    }

    /// Create an engine with an explicit rule set
    pub fn with_rules(config: Config, rules: Vec<Arc<dyn Rule>>) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// Lint multiple files
    pub fn lint(&self, files: &[PathBuf]) -> LintResult {
        let start = Instant::now();

        let results: Vec<LintResult> = if self.config.engine.is_parallel() {
            let jobs = if self.config.engine.jobs > 0 {
                self.config.engine.jobs
            } else {
                num_cpus::get()
            };
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| files.par_iter().map(|f| self.lint_file(f)).collect()),
                Err(e) => {
                    debug!("Falling back to the global thread pool: {}", e);
                    files.par_iter().map(|f| self.lint_file(f)).collect()
                }
            }
        } else {
            files.iter().map(|f| self.lint_file(f)).collect()
        };

        let mut combined = LintResult::default();
        for result in results {
            combined.merge(result);
        }

        combined.duration = start.elapsed();
        combined
    }

    /// Lint a single CST file
    pub fn lint_file(&self, path: &Path) -> LintResult {
        match CstFile::load(path) {
            Ok(cst) => self.lint_tree(&cst.tree, cst.display_path(path)),
            Err(CstError::Io(e)) => LintResult::file_error(
                "file-read-error",
                format!("Failed to read file: {}", e),
                path,
            ),
            Err(e) => LintResult::file_error("parse-error", format!("Parse error: {}", e), path),
        }
    }

    /// Lint an in-memory tree, reporting against `file`
    pub fn lint_tree(&self, tree: &Segment, file: &Path) -> LintResult {
        let mut result = LintResult::single_file();

        let rules: Vec<&Arc<dyn Rule>> = self
            .rules
            .iter()
            .filter(|rule| self.config.is_rule_enabled(rule.metadata()))
            .filter(|rule| {
                !self
                    .config
                    .should_ignore_rule_for_file(rule.metadata(), file)
            })
            .collect();
        if rules.is_empty() {
            return result;
        }

        let nodes: Vec<&Segment> = tree.iter_segments().collect();
        let source = tree.raw();
        let source_lines: Vec<&str> = source.lines().collect();
        let noqa = if self.config.noqa.is_enabled() {
            NoqaDirectives::parse(source)
        } else {
            NoqaDirectives::default()
        };

        for rule in rules {
            let metadata = rule.metadata();
            let outcomes = self.evaluate_nodes(rule.as_ref(), &nodes);
            let timing = result
                .rule_timings
                .entry(metadata.id.clone())
                .or_insert_with(|| RuleTiming::new(&metadata.id));
            let severity = self
                .config
                .get_severity_override(metadata)
                .unwrap_or(metadata.severity);

            let mut diagnostics = Vec::new();
            for (index, elapsed, outcome) in outcomes {
                timing.total_time += elapsed;
                timing.evaluation_count += 1;

                match outcome {
                    Ok(found) => {
                        timing.match_count += found.len();
                        diagnostics.extend(found);
                    }
                    Err(err) => {
                        let node = nodes[index];
                        let failure = RuleFailure {
                            rule_id: metadata.id.clone(),
                            location: Location {
                                file: file.to_path_buf(),
                                ..Location::of_segment(node)
                            },
                            node_kind: node.kind().to_string(),
                            error: err,
                        };
                        error!("{}", failure.message());
                        result.rule_failures.push(failure);
                    }
                }
            }

            for mut diag in diagnostics {
                let line = diag.location.line;
                if noqa.is_suppressed(metadata, line) {
                    debug!("{} suppressed by noqa on line {}", metadata.id, line);
                    result.suppressed_count += 1;
                    continue;
                }
                diag.severity = severity;
                diag = diag.with_file(file);
                if let Some(text) = line.checked_sub(1).and_then(|i| source_lines.get(i)) {
                    diag = diag.with_source_line(text);
                }
                if diag.help.is_none() {
                    diag = diag.with_help(&metadata.description);
                }
                result.push(diag);
            }
        }

        if result.error_count > 0 {
            result.files_with_errors = 1;
        }
        if result.warning_count > 0 {
            result.files_with_warnings = 1;
        }
        result
    }

    /// Evaluate `rule` on every node, keeping depth-first order
    fn evaluate_nodes(&self, rule: &dyn Rule, nodes: &[&Segment]) -> Vec<NodeOutcome> {
        let eval = |(index, node): (usize, &&Segment)| -> NodeOutcome {
            let start = Instant::now();
            let outcome = rule.eval(node);
            (index, start.elapsed(), outcome)
        };

        if self.config.engine.is_parallel() {
            nodes.par_iter().enumerate().map(eval).collect()
        } else {
            nodes.iter().enumerate().map(eval).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleMetadata;
    use crate::segment::PositionMarker;
    use pretty_assertions::assert_eq;

    fn ident(raw: &str) -> Segment {
        Segment::token(raw, &["column_reference"])
    }

    fn op(raw: &str) -> Segment {
        Segment::token(raw, &["binary_operator"])
    }

    fn ws() -> Segment {
        Segment::whitespace(" ", PositionMarker::default()).unwrap()
    }

    /// `select a+b` followed by `select c+d -- noqa` on the next line
    fn two_statements() -> Segment {
        let mut tree = Segment::node(
            "file",
            vec![
                Segment::node(
                    "select_statement",
                    vec![
                        Segment::keyword("select"),
                        ws(),
                        Segment::node("expression", vec![ident("a"), op("+"), ident("b")]),
                    ],
                ),
                Segment::newline(),
                Segment::node(
                    "select_statement",
                    vec![
                        Segment::keyword("select"),
                        ws(),
                        Segment::node("expression", vec![ident("c"), op("+"), ident("d")]),
                    ],
                ),
                ws(),
                Segment::comment("-- noqa"),
            ],
        );
        tree.reposition();
        tree
    }

    fn sequential() -> Config {
        let mut config = Config::new();
        config.engine.parallel = Some(false);
        config
    }

    #[test]
    fn test_lint_result_exit_code() {
        let mut result = LintResult::default();
        assert_eq!(result.exit_code(), 0);

        result.warning_count = 1;
        assert_eq!(result.exit_code(), 1);

        result.error_count = 1;
        assert_eq!(result.exit_code(), 2);
    }

    #[test]
    fn test_lint_result_is_clean() {
        let mut result = LintResult::default();
        assert!(result.is_clean());

        result.info_count = 3;
        assert!(result.is_clean());

        result.warning_count = 1;
        assert!(!result.is_clean());
    }

    #[test]
    fn test_lint_result_merge() {
        let mut result1 = LintResult {
            files_processed: 1,
            error_count: 2,
            ..LintResult::default()
        };
        result1.rule_timings.insert(
            "L006".to_string(),
            RuleTiming {
                rule_id: "L006".to_string(),
                evaluation_count: 3,
                ..RuleTiming::default()
            },
        );

        let mut result2 = LintResult {
            files_processed: 1,
            warning_count: 3,
            ..LintResult::default()
        };
        result2.rule_timings.insert(
            "L006".to_string(),
            RuleTiming {
                rule_id: "L006".to_string(),
                evaluation_count: 4,
                match_count: 1,
                ..RuleTiming::default()
            },
        );

        result1.merge(result2);
        assert_eq!(result1.files_processed, 2);
        assert_eq!(result1.error_count, 2);
        assert_eq!(result1.warning_count, 3);
        assert_eq!(result1.rule_timings["L006"].evaluation_count, 7);
        assert_eq!(result1.rule_timings["L006"].match_count, 1);
    }

    #[test]
    fn test_lint_tree_reports_in_tree_order() {
        let tree = two_statements();
        let mut config = sequential();
        config.noqa.enabled = Some(false);
        let result = Engine::new(config).lint_tree(&tree, Path::new("q.sql"));

        let lines: Vec<(usize, &str)> = result
            .diagnostics
            .iter()
            .map(|d| (d.location.line, d.message.as_str()))
            .collect();
        assert_eq!(
            lines,
            vec![
                (1, "Missing whitespace before +"),
                (1, "Missing whitespace after +"),
                (2, "Missing whitespace before +"),
                (2, "Missing whitespace after +"),
            ]
        );
        assert_eq!(result.warning_count, 4);
        assert_eq!(result.files_with_warnings, 1);
        assert_eq!(result.diagnostics[0].location.file, PathBuf::from("q.sql"));
        assert_eq!(
            result.diagnostics[0].source_line.as_deref(),
            Some("select a+b")
        );
        assert!(result.diagnostics[0].help.is_some());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let tree = two_statements();
        let seq = Engine::new(sequential()).lint_tree(&tree, Path::new("q.sql"));
        let par = Engine::new(Config::new()).lint_tree(&tree, Path::new("q.sql"));

        let render = |r: &LintResult| -> Vec<String> {
            r.diagnostics
                .iter()
                .map(|d| format!("{}:{} {}", d.location.line, d.location.column, d.message))
                .collect()
        };
        assert_eq!(render(&seq), render(&par));
    }

    #[test]
    fn test_noqa_suppresses_line() {
        let tree = two_statements();
        let result = Engine::new(sequential()).lint_tree(&tree, Path::new("q.sql"));
        assert_eq!(result.diagnostics.len(), 2);
        assert!(result.diagnostics.iter().all(|d| d.location.line == 1));
        assert_eq!(result.suppressed_count, 2);
    }

    #[test]
    fn test_disabled_rule_and_severity_override() {
        let tree = two_statements();

        let mut config = sequential();
        config.rules.disabled.push("operator-spacing".to_string());
        let result = Engine::new(config).lint_tree(&tree, Path::new("q.sql"));
        assert!(result.diagnostics.is_empty());
        assert!(result.rule_timings.is_empty());

        let mut config = sequential();
        config.rules.severity.insert("L006".to_string(), Severity::Error);
        let result = Engine::new(config).lint_tree(&tree, Path::new("q.sql"));
        assert_eq!(result.error_count, 2);
        assert_eq!(result.exit_code(), 2);
    }

    #[test]
    fn test_per_file_ignore() {
        let mut config = sequential();
        config
            .rules
            .per_file
            .insert("legacy/*.sql".to_string(), vec!["L006".to_string()]);
        let engine = Engine::new(config);
        let tree = two_statements();

        assert!(engine
            .lint_tree(&tree, Path::new("legacy/old.sql"))
            .diagnostics
            .is_empty());
        assert!(!engine
            .lint_tree(&tree, Path::new("new.sql"))
            .diagnostics
            .is_empty());
    }

    #[test]
    fn test_malformed_node_becomes_rule_failure() {
        let mut expression = Segment::node("expression", vec![ident("a"), op("+"), ident("b")]);
        expression.raw = "a + b".to_string();
        let tree = Segment::node("file", vec![expression]);

        let result = Engine::new(sequential()).lint_tree(&tree, Path::new("q.sql"));
        assert!(result.diagnostics.is_empty());
        assert!(result.is_clean());
        assert_eq!(result.rule_failures.len(), 1);
        let failure = &result.rule_failures[0];
        assert_eq!(failure.rule_id, "L006");
        assert_eq!(failure.node_kind, "expression");
        assert!(matches!(failure.error, RuleError::Malformed(_)));
        assert!(failure.message().contains("q.sql"));
    }

    struct AlwaysInfo(RuleMetadata);

    impl Rule for AlwaysInfo {
        fn metadata(&self) -> &RuleMetadata {
            &self.0
        }

        fn eval(&self, segment: &Segment) -> Result<Vec<Diagnostic>, RuleError> {
            if segment.kind() != "file" {
                return Ok(Vec::new());
            }
            Ok(vec![Diagnostic::new(
                &self.0.id,
                self.0.severity,
                "seen",
                segment,
            )])
        }
    }

    #[test]
    fn test_registered_rule_runs() {
        let rule: Arc<dyn Rule> = Arc::new(AlwaysInfo(
            RuleMetadata::new("X001", "always-info", "Always reports").with_severity(Severity::Info),
        ));
        let engine = Engine::with_rules(sequential(), vec![rule]);
        let result = engine.lint_tree(&two_statements(), Path::new("q.sql"));
        assert_eq!(result.info_count, 1);
        assert!(result.is_clean());
        assert_eq!(result.diagnostics[0].help.as_deref(), Some("Always reports"));
    }

    #[test]
    fn test_unreadable_and_unparsable_files() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(sequential());

        let missing = engine.lint_file(&dir.path().join("missing.cst.json"));
        assert_eq!(missing.diagnostics[0].rule_id, "file-read-error");
        assert_eq!(missing.error_count, 1);
        assert_eq!(missing.files_with_errors, 1);

        let broken = dir.path().join("broken.cst.json");
        std::fs::write(&broken, "{not json").unwrap();
        let result = engine.lint_file(&broken);
        assert_eq!(result.diagnostics[0].rule_id, "parse-error");
        assert_eq!(result.exit_code(), 2);
    }

    #[test]
    fn test_format_timings() {
        let result = LintResult::default();
        assert_eq!(result.format_timings(), "No timing data available");

        let result = Engine::new(sequential()).lint_tree(&two_statements(), Path::new("q.sql"));
        let table = result.format_timings();
        assert!(table.starts_with("Rule Timing Statistics:"));
        assert!(table.contains("L006"));
    }
}

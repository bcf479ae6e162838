//! Rule definition and evaluation contract

use crate::diagnostic::{Diagnostic, Severity};
use crate::segment::{Segment, SegmentError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Internal failure of a rule on one node.
///
/// These are precondition violations in the tree handed to the rule, reported
/// to the engine separately from lint violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("boundary leaves requested on '{kind}' which has {count} leaf segment(s)")]
    TooFewLeaves { kind: String, count: usize },

    #[error(transparent)]
    Malformed(#[from] SegmentError),
}

/// Rule category for grouping related rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Code that is definitely wrong
    Correctness,
    /// Layout and spacing
    #[default]
    Layout,
    /// Idiomatic and consistent style rules
    Style,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCategory::Correctness => write!(f, "correctness"),
            RuleCategory::Layout => write!(f, "layout"),
            RuleCategory::Style => write!(f, "style"),
        }
    }
}

/// Rule stability level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleStability {
    #[default]
    Stable,
    Preview,
    Deprecated,
}

impl fmt::Display for RuleStability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleStability::Stable => write!(f, "stable"),
            RuleStability::Preview => write!(f, "preview"),
            RuleStability::Deprecated => write!(f, "deprecated"),
        }
    }
}

/// Registration and documentation data for a rule
#[derive(Debug, Clone)]
pub struct RuleMetadata {
    /// Short identifier (e.g., "L006")
    pub id: String,

    /// Readable name (e.g., "operator-spacing")
    pub name: String,

    /// One-line description
    pub description: String,

    /// Default severity level
    pub severity: Severity,

    pub category: RuleCategory,

    pub stability: RuleStability,

    /// Whether diagnostics of this rule carry automatic fixes
    pub fix_compatible: bool,

    /// Rationale explaining why this rule exists
    pub rationale: Option<String>,

    /// Example of code that violates this rule
    pub example_bad: Option<String>,

    /// Example of correct code
    pub example_good: Option<String>,

    /// Related rule IDs
    pub related: Vec<String>,
}

impl RuleMetadata {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            severity: Severity::Warning,
            category: RuleCategory::default(),
            stability: RuleStability::default(),
            fix_compatible: false,
            rationale: None,
            example_bad: None,
            example_good: None,
            related: Vec::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_category(mut self, category: RuleCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_stability(mut self, stability: RuleStability) -> Self {
        self.stability = stability;
        self
    }

    /// Mark the rule's diagnostics as automatically fixable
    pub fn fix_compatible(mut self) -> Self {
        self.fix_compatible = true;
        self
    }

    pub fn with_rationale(mut self, rationale: &str) -> Self {
        self.rationale = Some(rationale.to_string());
        self
    }

    pub fn with_example_bad(mut self, example: &str) -> Self {
        self.example_bad = Some(example.to_string());
        self
    }

    pub fn with_example_good(mut self, example: &str) -> Self {
        self.example_good = Some(example.to_string());
        self
    }

    pub fn with_related(mut self, rule_id: &str) -> Self {
        self.related.push(rule_id.to_string());
        self
    }

    /// Check if `reference` names this rule, by id or by name (case-insensitive)
    pub fn is_named(&self, reference: &str) -> bool {
        self.id.eq_ignore_ascii_case(reference) || self.name.eq_ignore_ascii_case(reference)
    }
}

/// A lint rule evaluated once per tree node.
///
/// Implementations look only at the node they are given and its direct
/// children; the engine owns traversal, so the same rule may run on many nodes
/// of one tree concurrently.
pub trait Rule: Send + Sync {
    fn metadata(&self) -> &RuleMetadata;

    /// Evaluate the rule on one node
    fn eval(&self, segment: &Segment) -> Result<Vec<Diagnostic>, RuleError>;
}

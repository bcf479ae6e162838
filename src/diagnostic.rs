//! Diagnostic types for linting results

use crate::segment::{PositionMarker, Segment};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - definite problem
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// Fix safety classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSafety {
    /// Preserves meaning, can be applied automatically
    #[default]
    Safe,
    /// May change behavior, requires explicit opt-in
    Unsafe,
}

impl fmt::Display for FixSafety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixSafety::Safe => write!(f, "safe"),
            FixSafety::Unsafe => write!(f, "unsafe"),
        }
    }
}

/// Source code location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path
    pub file: PathBuf,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Length of the highlighted region
    pub length: usize,
}

impl Location {
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            length: 0,
        }
    }

    /// Location of a segment, without a file
    pub fn of_segment(segment: &Segment) -> Self {
        let PositionMarker { line, column, .. } = segment.position();
        Self::new(PathBuf::new(), line, column).with_length(segment.raw().chars().count())
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }
}

/// Kind of tree edit a fix performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixKind {
    /// Insert the edit segment immediately before the anchor, in the anchor's parent
    Create,
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixKind::Create => write!(f, "create"),
        }
    }
}

/// A proposed tree edit attached to a diagnostic
#[derive(Debug, Clone)]
pub struct LintFix {
    pub kind: FixKind,
    /// Segment the edit is positioned against
    pub anchor: Segment,
    /// Newly synthesized segment
    pub edit: Segment,
    pub safety: FixSafety,
}

impl LintFix {
    /// Insert `edit` immediately before `anchor`
    pub fn create_before(anchor: &Segment, edit: Segment) -> Self {
        Self {
            kind: FixKind::Create,
            anchor: anchor.clone(),
            edit,
            safety: FixSafety::Safe,
        }
    }

    pub fn is_safe(&self) -> bool {
        self.safety == FixSafety::Safe
    }

    /// Short human-readable summary
    pub fn description(&self) -> String {
        format!(
            "insert {:?} before {:?}",
            self.edit.raw(),
            self.anchor.raw().chars().take(10).collect::<String>()
        )
    }
}

/// A lint diagnostic
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Rule ID that triggered this diagnostic
    pub rule_id: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Source location
    pub location: Location,
    /// Segment the diagnostic is about
    pub anchor: Segment,
    /// The source line (for display)
    pub source_line: Option<String>,
    /// Help text (usually rule description)
    pub help: Option<String>,
    /// Proposed fixes, each independently applicable
    pub fixes: Vec<LintFix>,
}

impl Diagnostic {
    /// Create a new diagnostic anchored at a segment
    pub fn new(rule_id: &str, severity: Severity, message: &str, anchor: &Segment) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            message: message.to_string(),
            location: Location::of_segment(anchor),
            anchor: anchor.clone(),
            source_line: None,
            help: None,
            fixes: Vec::new(),
        }
    }

    /// Diagnostic about a whole file, such as one that could not be read
    pub fn for_file(rule_id: &str, severity: Severity, message: &str, file: &Path) -> Self {
        let anchor = Segment::node("file", Vec::new());
        Self {
            location: Location::new(file.to_path_buf(), 0, 0),
            ..Self::new(rule_id, severity, message, &anchor)
        }
    }

    pub fn with_file(mut self, file: &Path) -> Self {
        self.location.file = file.to_path_buf();
        self
    }

    /// Add source line for display
    pub fn with_source_line(mut self, line: &str) -> Self {
        self.source_line = Some(line.to_string());
        self
    }

    /// Add help text
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn with_fix(mut self, fix: LintFix) -> Self {
        self.fixes.push(fix);
        self
    }

    /// Check if this diagnostic has a fix
    pub fn has_fix(&self) -> bool {
        !self.fixes.is_empty()
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Check if this is a warning
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

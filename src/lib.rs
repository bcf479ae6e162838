//! sqlint - layout linting over SQL concrete syntax trees
//!
//! SQL is parsed by an external parser that writes out a concrete syntax tree
//! (CST). sqlint loads those trees, walks every node and hands it to each
//! enabled rule. Rules report diagnostics with optional fixes; fixes are tree
//! edits that can be applied to produce corrected SQL.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> Engine -> CstFile -> Segment tree -> Rule::eval(node) -> Diagnostic
//!                                                               \-> Fixer
//! ```
//!
//! The built-in rule set currently holds `L006` (`operator-spacing`), which
//! flags binary and comparison operators that are not surrounded by
//! whitespace.
//!
//! ```
//! use sqlint::{Rule, Segment};
//! use sqlint::rules::OperatorSpacing;
//!
//! let mut tree = Segment::node(
//!     "expression",
//!     vec![
//!         Segment::token("a", &["column_reference"]),
//!         Segment::token("+", &["binary_operator"]),
//!         Segment::token("b", &["column_reference"]),
//!     ],
//! );
//! tree.reposition();
//!
//! let diagnostics = OperatorSpacing::new().eval(&tree).unwrap();
//! assert_eq!(diagnostics[0].message, "Missing whitespace before +");
//! assert_eq!(diagnostics[1].message, "Missing whitespace after +");
//! ```

pub mod config;
pub mod cst;
pub mod diagnostic;
pub mod engine;
pub mod fixer;
pub mod matcher;
pub mod noqa;
pub mod output;
pub mod rule;
pub mod rules;
pub mod segment;

// Re-export main types
pub use config::Config;
pub use cst::{CstError, CstFile};
pub use diagnostic::{Diagnostic, FixKind, FixSafety, LintFix, Location, Severity};
pub use engine::{Engine, LintResult, RuleFailure, RuleTiming};
pub use fixer::{apply_fixes, FixMode, FixResult, Fixer};
pub use matcher::MatchPredicate;
pub use noqa::NoqaDirectives;
pub use output::{CompactFormatter, JsonFormatter, OutputFormatter, TextFormatter};
pub use rule::{Rule, RuleCategory, RuleError, RuleMetadata, RuleStability};
pub use segment::{BracketRole, PositionMarker, Segment, SegmentError, SegmentId};

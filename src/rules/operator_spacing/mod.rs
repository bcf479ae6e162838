//! L006: operators should be surrounded by whitespace
//!
//! Only *missing* whitespace is reported here; excess whitespace belongs to a
//! separate spacing rule. The rule looks at the direct children of the node it
//! is given. An operator that opens or closes the node is left to the parent's
//! evaluation, which is why nodes with fewer than three children are skipped.

mod adjacency;

pub use adjacency::{missing_space, nearest_sibling, needs_space, Side};

use crate::diagnostic::{Diagnostic, LintFix};
use crate::matcher::{boundary_leaves, MatchPredicate};
use crate::rule::{Rule, RuleCategory, RuleError, RuleMetadata};
use crate::segment::Segment;
use log::debug;

/// Characters of the anchor quoted in messages
const MESSAGE_SNIPPET_CHARS: usize = 10;

/// Missing whitespace around binary and comparison operators
pub struct OperatorSpacing {
    metadata: RuleMetadata,
    targets: &'static MatchPredicate,
}

impl Default for OperatorSpacing {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorSpacing {
    pub fn new() -> Self {
        let metadata = RuleMetadata::new(
            "L006",
            "operator-spacing",
            "Operators should be surrounded by a single whitespace.",
        )
        .with_category(RuleCategory::Layout)
        .fix_compatible()
        .with_rationale(
            "Spacing around operators keeps expressions readable. Brackets may sit \
             directly against an operand.",
        )
        .with_example_bad("SELECT\n    a +b\nFROM foo")
        .with_example_good("SELECT\n    a + b\nFROM foo")
        .with_related("L039");

        Self {
            metadata,
            targets: MatchPredicate::operators(),
        }
    }

    /// Leaves of `child` that need a check before and after.
    ///
    /// An operator child is checked on both sides. A compound child is checked
    /// before when its first leaf is an operator and after when its last is.
    fn check_anchors<'a>(
        &self,
        child: &'a Segment,
    ) -> Result<(Option<&'a Segment>, Option<&'a Segment>), RuleError> {
        if self.targets.matches(child) {
            debug!(
                "Found target [main] @{}: {:?}",
                child.position(),
                child.raw()
            );
            return Ok((Some(child), Some(child)));
        }
        if child.is_leaf() || child.flatten_to_leaves().nth(1).is_none() {
            return Ok((None, None));
        }

        let (leading, trailing) = boundary_leaves(child)?;
        let before = self.targets.matches(leading).then_some(leading);
        let after = self.targets.matches(trailing).then_some(trailing);
        if let Some(anchor) = before {
            debug!(
                "Found target [leading] @{}: {:?}",
                anchor.position(),
                anchor.raw()
            );
        }
        if let Some(anchor) = after {
            debug!(
                "Found target [trailing] @{}: {:?}",
                anchor.position(),
                anchor.raw()
            );
        }
        Ok((before, after))
    }

    /// Build the diagnostic for a gap on `side` of `anchor`.
    ///
    /// `insert_before` is the sibling in the parent's child list that the new
    /// whitespace goes in front of.
    fn violation(
        &self,
        anchor: &Segment,
        side: Side,
        insert_before: &Segment,
    ) -> Result<Diagnostic, RuleError> {
        let snippet = match side {
            Side::Before => head(anchor.raw(), MESSAGE_SNIPPET_CHARS),
            Side::After => tail(anchor.raw(), MESSAGE_SNIPPET_CHARS),
        };
        let message = format!("Missing whitespace {} {}", side.as_str(), snippet);
        let edit = Segment::whitespace(" ", insert_before.position())?;

        Ok(Diagnostic::new(
            &self.metadata.id,
            self.metadata.severity,
            &message,
            anchor,
        )
        .with_help(&self.metadata.description)
        .with_fix(LintFix::create_before(insert_before, edit)))
    }
}

impl Rule for OperatorSpacing {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn eval(&self, segment: &Segment) -> Result<Vec<Diagnostic>, RuleError> {
        let children = segment.children();
        if children.len() <= 2 {
            return Ok(Vec::new());
        }
        segment.check_raw_invariant()?;

        let mut violations = Vec::new();

        for (idx, child) in children.iter().enumerate() {
            if child.is_whitespace() || !child.is_code() {
                continue;
            }

            let (before, after) = self.check_anchors(child)?;

            if let Some(anchor) = before {
                if let Some(prev) = missing_space(children, idx, Side::Before) {
                    debug!(
                        "Missing whitespace before {:?}. Found {:?} instead.",
                        anchor.raw(),
                        prev.raw()
                    );
                    violations.push(self.violation(anchor, Side::Before, child)?);
                }
            }

            if let Some(anchor) = after {
                if let Some(next) = missing_space(children, idx, Side::After) {
                    debug!(
                        "Missing whitespace after {:?}. Found {:?} instead.",
                        anchor.raw(),
                        next.raw()
                    );
                    violations.push(self.violation(anchor, Side::After, next)?);
                }
            }
        }

        Ok(violations)
    }
}

fn head(raw: &str, n: usize) -> String {
    raw.chars().take(n).collect()
}

fn tail(raw: &str, n: usize) -> String {
    let skip = raw.chars().count().saturating_sub(n);
    raw.chars().skip(skip).collect()
}

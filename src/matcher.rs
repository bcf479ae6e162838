//! Target matching
//!
//! Rules describe the segments they care about as a [`MatchPredicate`], a list
//! of type tags. A segment is a target when it carries any of them.

use crate::rule::RuleError;
use crate::segment::Segment;
use std::sync::OnceLock;

/// Ordered set of type tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPredicate {
    types: Vec<String>,
}

impl MatchPredicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, tag: &str) -> Self {
        if !self.types.iter().any(|t| t == tag) {
            self.types.push(tag.to_string());
        }
        self
    }

    /// Binary and comparison operator tokens
    pub fn operators() -> &'static MatchPredicate {
        static OPERATORS: OnceLock<MatchPredicate> = OnceLock::new();
        OPERATORS.get_or_init(|| {
            MatchPredicate::new()
                .with_type("binary_operator")
                .with_type("comparison_operator")
        })
    }

    pub fn matches(&self, segment: &Segment) -> bool {
        self.types.iter().any(|tag| segment.is_type(tag))
    }
}

/// Check if a segment is an operator that needs surrounding whitespace
pub fn is_operator_target(segment: &Segment) -> bool {
    MatchPredicate::operators().matches(segment)
}

/// First and last leaf of a compound segment.
///
/// Only defined for segments with at least two leaves.
pub fn boundary_leaves(segment: &Segment) -> Result<(&Segment, &Segment), RuleError> {
    let mut leaves = segment.flatten_to_leaves();
    let first = leaves.next();
    let last = leaves.last();
    match (first, last) {
        (Some(first), Some(last)) => Ok((first, last)),
        (first, _) => Err(RuleError::TooFewLeaves {
            kind: segment.kind().to_string(),
            count: usize::from(first.is_some()),
        }),
    }
}

//! Nearest substantive sibling lookup
//!
//! Indent markers carry no spacing information, so the scan looks through them.
//! Whitespace, brackets on the inner side, and template placeholders that
//! already expand to whitespace all count as an acceptable boundary.

use crate::segment::Segment;

/// Which side of a segment is being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Before => "before",
            Side::After => "after",
        }
    }
}

/// Nearest sibling of `siblings[idx]` on `side` that is not an indent marker
pub fn nearest_sibling(siblings: &[Segment], idx: usize, side: Side) -> Option<&Segment> {
    let substantive = |segment: &&Segment| !segment.is_type("indent");
    match side {
        Side::Before => siblings.get(..idx)?.iter().rev().find(substantive),
        Side::After => siblings.get(idx + 1..)?.iter().find(substantive),
    }
}

/// Check if `neighbour` leaves a whitespace gap on the given side of an operator
pub fn needs_space(neighbour: &Segment, side: Side) -> bool {
    if neighbour.is_whitespace() {
        return false;
    }
    let template_space = |source: &str| match side {
        Side::Before => source.ends_with(' ') || source.ends_with('\n'),
        Side::After => source.starts_with(' ') || source.starts_with('\n'),
    };
    if neighbour.is_meta() && neighbour.source_str().is_some_and(template_space) {
        return false;
    }
    match side {
        Side::Before => !neighbour.is_open_bracket(),
        Side::After => !neighbour.is_close_bracket(),
    }
}

/// The neighbour of `siblings[idx]` on `side` when whitespace is missing there
pub fn missing_space(siblings: &[Segment], idx: usize, side: Side) -> Option<&Segment> {
    nearest_sibling(siblings, idx, side).filter(|neighbour| needs_space(neighbour, side))
}

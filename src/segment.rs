//! Concrete syntax tree segments
//!
//! A [`Segment`] is one node of the tree handed over by the parser. Leaves carry
//! literal source text; compound segments carry children whose raw text
//! concatenates to their own. The tree is read-only while rules run, so a
//! `&Segment` can be shared across threads freely.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Error raised when a segment breaks the tree invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("whitespace segment must have non-empty raw text")]
    EmptyWhitespace,

    #[error("raw text of '{kind}' at {position} does not match its children: expected {expected:?}, found {found:?}")]
    RawMismatch {
        kind: String,
        position: PositionMarker,
        expected: String,
        found: String,
    },
}

static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a segment within a process.
///
/// Clones share the id of the segment they were cloned from, which is what lets
/// a fix anchor point back at a node of the original tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(u64);

impl SegmentId {
    /// Allocate a new, never used id
    pub fn fresh() -> Self {
        Self(NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Location of a segment in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionMarker {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, in characters)
    pub column: usize,
    /// Byte offset from the start of the file
    #[serde(default)]
    pub offset: usize,
}

impl PositionMarker {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Position reached after consuming `text` from this position
    pub fn advance(mut self, text: &str) -> Self {
        for ch in text.chars() {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self
    }
}

impl Default for PositionMarker {
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for PositionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Which side of a bracket pair a bracket token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketRole {
    Open,
    Close,
}

impl BracketRole {
    /// Derive the role from the parser's `start_*_bracket` / `end_*_bracket` type names
    pub fn from_type_name(name: &str) -> Option<Self> {
        if !name.ends_with("_bracket") {
            return None;
        }
        if name.starts_with("start_") {
            Some(BracketRole::Open)
        } else if name.starts_with("end_") {
            Some(BracketRole::Close)
        } else {
            None
        }
    }
}

/// A node of the concrete syntax tree
#[derive(Debug, Clone)]
pub struct Segment {
    pub(crate) id: SegmentId,
    pub(crate) kind: String,
    pub(crate) type_tags: BTreeSet<String>,
    pub(crate) raw: String,
    pub(crate) source_str: Option<String>,
    pub(crate) position: PositionMarker,
    pub(crate) is_whitespace: bool,
    pub(crate) is_code: bool,
    pub(crate) is_meta: bool,
    pub(crate) bracket: Option<BracketRole>,
    pub(crate) children: Vec<Segment>,
}

impl Segment {
    fn leaf(kind: &str, raw: &str) -> Self {
        let mut type_tags = BTreeSet::new();
        type_tags.insert(kind.to_string());
        Self {
            id: SegmentId::fresh(),
            kind: kind.to_string(),
            type_tags,
            raw: raw.to_string(),
            source_str: None,
            position: PositionMarker::default(),
            is_whitespace: false,
            is_code: false,
            is_meta: false,
            bracket: None,
            children: Vec::new(),
        }
    }

    /// Code-bearing leaf. The first tag is the primary kind.
    pub fn token(raw: &str, tags: &[&str]) -> Self {
        let mut segment = Self::leaf(tags.first().copied().unwrap_or("raw"), raw);
        segment.type_tags.extend(tags.iter().map(|t| t.to_string()));
        segment.is_code = true;
        segment
    }

    pub fn keyword(raw: &str) -> Self {
        Self::token(raw, &["keyword"])
    }

    /// Synthesize a whitespace leaf at `position`
    pub fn whitespace(raw: &str, position: PositionMarker) -> Result<Self, SegmentError> {
        if raw.is_empty() {
            return Err(SegmentError::EmptyWhitespace);
        }
        let mut segment = Self::leaf("whitespace", raw);
        segment.is_whitespace = true;
        segment.position = position;
        Ok(segment)
    }

    pub fn newline() -> Self {
        let mut segment = Self::leaf("newline", "\n");
        segment.is_whitespace = true;
        segment
    }

    pub fn comment(raw: &str) -> Self {
        Self::leaf("comment", raw)
    }

    pub fn bracket(raw: &str, role: BracketRole) -> Self {
        let kind = match role {
            BracketRole::Open => "start_bracket",
            BracketRole::Close => "end_bracket",
        };
        let mut segment = Self::token(raw, &[kind]);
        segment.bracket = Some(role);
        segment
    }

    /// Zero-width layout marker
    pub fn indent() -> Self {
        let mut segment = Self::leaf("indent", "");
        segment.is_meta = true;
        segment
    }

    pub fn dedent() -> Self {
        let mut segment = Self::indent().with_tag("dedent");
        segment.kind = "dedent".to_string();
        segment
    }

    /// Zero-width marker standing in for templated source such as `{%- if x %}`
    pub fn placeholder(source_str: &str) -> Self {
        let mut segment = Self::leaf("placeholder", "");
        segment.is_meta = true;
        segment.source_str = Some(source_str.to_string());
        segment
    }

    /// Compound segment; its raw text is the concatenation of the children
    pub fn node(kind: &str, children: Vec<Segment>) -> Self {
        let mut segment = Self::leaf(kind, "");
        segment.raw = children.iter().map(|c| c.raw.as_str()).collect();
        segment.is_code = children.iter().any(|c| c.is_code);
        segment.is_whitespace = !children.is_empty() && children.iter().all(|c| c.is_whitespace);
        segment.children = children;
        segment
    }

    /// Add a type tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.type_tags.insert(tag.to_string());
        self
    }

    pub fn with_position(mut self, position: PositionMarker) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Primary type name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn type_tags(&self) -> &BTreeSet<String> {
        &self.type_tags
    }

    pub fn is_type(&self, tag: &str) -> bool {
        self.type_tags.contains(tag)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Original template text for meta segments
    pub fn source_str(&self) -> Option<&str> {
        self.source_str.as_deref()
    }

    pub fn position(&self) -> PositionMarker {
        self.position
    }

    pub fn is_whitespace(&self) -> bool {
        self.is_whitespace
    }

    pub fn is_code(&self) -> bool {
        self.is_code
    }

    pub fn is_meta(&self) -> bool {
        self.is_meta
    }

    pub fn bracket_role(&self) -> Option<BracketRole> {
        self.bracket
    }

    pub fn is_open_bracket(&self) -> bool {
        self.bracket == Some(BracketRole::Open)
    }

    pub fn is_close_bracket(&self) -> bool {
        self.bracket == Some(BracketRole::Close)
    }

    pub fn children(&self) -> &[Segment] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Leaves of this subtree, left to right. A leaf yields itself.
    pub fn flatten_to_leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    /// Every segment of this subtree in depth-first pre-order, starting with `self`
    pub fn iter_segments(&self) -> Segments<'_> {
        Segments { stack: vec![self] }
    }

    /// Check this segment's raw text against its direct children
    pub fn check_raw_invariant(&self) -> Result<(), SegmentError> {
        if self.children.is_empty() {
            return Ok(());
        }
        let found: String = self.children.iter().map(|c| c.raw.as_str()).collect();
        if found == self.raw {
            Ok(())
        } else {
            Err(SegmentError::RawMismatch {
                kind: self.kind.clone(),
                position: self.position,
                expected: self.raw.clone(),
                found,
            })
        }
    }

    /// Check the raw invariant over the whole subtree
    pub fn validate(&self) -> Result<(), SegmentError> {
        self.iter_segments()
            .try_for_each(|segment| segment.check_raw_invariant())
    }

    /// Recompute positions of the whole subtree from its raw text, starting at 1:1
    pub fn reposition(&mut self) {
        self.assign_positions(PositionMarker::default());
    }

    fn assign_positions(&mut self, start: PositionMarker) -> PositionMarker {
        self.position = start;
        if self.children.is_empty() {
            return start.advance(&self.raw);
        }
        self.children
            .iter_mut()
            .fold(start, |cursor, child| child.assign_positions(cursor))
    }

    /// Rebuild raw text from children, bottom-up
    pub(crate) fn recompute_raw(&mut self) {
        if self.children.is_empty() {
            return;
        }
        for child in &mut self.children {
            child.recompute_raw();
        }
        self.raw = self.children.iter().map(|c| c.raw.as_str()).collect();
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind, self.raw)
    }
}

/// Iterator over the leaves of a subtree
pub struct Leaves<'a> {
    stack: Vec<&'a Segment>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Segment;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(segment) = self.stack.pop() {
            if segment.children.is_empty() {
                return Some(segment);
            }
            self.stack.extend(segment.children.iter().rev());
        }
        None
    }
}

/// Pre-order iterator over all segments of a subtree
pub struct Segments<'a> {
    stack: Vec<&'a Segment>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a Segment;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.stack.pop()?;
        self.stack.extend(segment.children.iter().rev());
        Some(segment)
    }
}

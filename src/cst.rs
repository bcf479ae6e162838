//! Serialized concrete syntax tree loader
//!
//! SQL is parsed elsewhere; this module reads the tree the parser wrote out as
//! JSON or YAML and turns it into [`Segment`]s. Flags the parser omits are
//! inferred from type names.
//!
//! ```json
//! {"file": "query.sql",
//!  "tree": {"type": "expression", "children": [
//!     {"type": "column_reference", "raw": "a"},
//!     {"type": "binary_operator", "raw": "+"},
//!     {"type": "numeric_literal", "raw": "1"}]}}
//! ```

use crate::segment::{BracketRole, PositionMarker, Segment, SegmentError, SegmentId};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error loading a CST file
#[derive(Debug, Error)]
pub enum CstError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown CST file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid segment: {0}")]
    Invalid(String),

    #[error(transparent)]
    Segment(#[from] SegmentError),
}

const WHITESPACE_TYPES: &[&str] = &["whitespace", "newline"];
const META_TYPES: &[&str] = &["indent", "dedent", "placeholder", "meta"];
const COMMENT_TYPES: &[&str] = &["comment", "inline_comment", "block_comment"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeField {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    #[serde(rename = "type")]
    types: TypeField,
    #[serde(default)]
    raw: Option<String>,
    #[serde(default)]
    is_whitespace: Option<bool>,
    #[serde(default)]
    is_code: Option<bool>,
    #[serde(default)]
    is_meta: Option<bool>,
    #[serde(default)]
    source_str: Option<String>,
    #[serde(default)]
    pos: Option<PositionMarker>,
    #[serde(default)]
    bracket: Option<BracketRole>,
    #[serde(default)]
    children: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Wrapped {
        #[serde(default)]
        file: Option<PathBuf>,
        tree: RawSegment,
    },
    Bare(RawSegment),
}

/// A loaded tree together with the SQL file it was parsed from
#[derive(Debug, Clone)]
pub struct CstFile {
    /// Path of the original SQL file, when the parser recorded one
    pub source_path: Option<PathBuf>,
    /// Root segment
    pub tree: Segment,
}

impl CstFile {
    /// Load a CST file, choosing the format from its extension
    pub fn load(path: &Path) -> Result<Self, CstError> {
        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "json" => Self::from_json_str(&content),
            "yaml" | "yml" => Self::from_yaml_str(&content),
            _ => Err(CstError::UnsupportedFormat(ext.to_string())),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, CstError> {
        Self::from_document(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, CstError> {
        Self::from_document(serde_yaml::from_str(content)?)
    }

    fn from_document(document: RawDocument) -> Result<Self, CstError> {
        let (source_path, raw) = match document {
            RawDocument::Wrapped { file, tree } => (file, tree),
            RawDocument::Bare(tree) => (None, tree),
        };
        let mut positioned = true;
        let mut tree = build_segment(raw, &mut positioned)?;
        if !positioned {
            tree.reposition();
        }
        Ok(Self { source_path, tree })
    }

    /// Path to report diagnostics against
    pub fn display_path<'a>(&'a self, cst_path: &'a Path) -> &'a Path {
        self.source_path.as_deref().unwrap_or(cst_path)
    }
}

/// Convert one serialized segment. Clears `positioned` when any position is missing.
fn build_segment(raw: RawSegment, positioned: &mut bool) -> Result<Segment, CstError> {
    let tags: Vec<String> = match raw.types {
        TypeField::One(tag) => vec![tag],
        TypeField::Many(tags) => tags,
    };
    let kind = tags
        .first()
        .cloned()
        .ok_or_else(|| CstError::Invalid("segment without a type".to_string()))?;
    let mut type_tags: BTreeSet<String> = tags.into_iter().collect();
    // A dedent is an indent marker too
    if type_tags.contains("dedent") {
        type_tags.insert("indent".to_string());
    }
    let has_any = |names: &[&str]| names.iter().any(|n| type_tags.contains(*n));

    let is_meta = raw.is_meta.unwrap_or_else(|| has_any(META_TYPES));
    let is_whitespace = raw
        .is_whitespace
        .unwrap_or_else(|| has_any(WHITESPACE_TYPES));
    let is_comment = has_any(COMMENT_TYPES);
    let bracket = raw
        .bracket
        .or_else(|| BracketRole::from_type_name(&kind));

    let position = match raw.pos {
        Some(pos) => pos,
        None => {
            *positioned = false;
            PositionMarker::default()
        }
    };

    let children = raw
        .children
        .into_iter()
        .map(|child| build_segment(child, positioned))
        .collect::<Result<Vec<_>, _>>()?;

    let text = match raw.raw {
        Some(text) => text,
        None if !children.is_empty() => children.iter().map(|c| c.raw()).collect(),
        None if is_meta => String::new(),
        None => {
            return Err(CstError::Invalid(format!(
                "leaf segment '{}' has no raw text",
                kind
            )))
        }
    };
    if is_whitespace && children.is_empty() && text.is_empty() {
        return Err(SegmentError::EmptyWhitespace.into());
    }

    let is_code = raw.is_code.unwrap_or_else(|| {
        if children.is_empty() {
            !is_whitespace && !is_meta && !is_comment
        } else {
            children.iter().any(|c| c.is_code())
        }
    });

    Ok(Segment {
        id: SegmentId::fresh(),
        kind,
        type_tags,
        raw: text,
        source_str: raw.source_str,
        position,
        is_whitespace,
        is_code,
        is_meta,
        bracket,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SIMPLE: &str = r#"{
        "file": "query.sql",
        "tree": {"type": "expression", "children": [
            {"type": "column_reference", "raw": "a"},
            {"type": ["binary_operator", "raw"], "raw": "+"},
            {"type": "whitespace", "raw": " "},
            {"type": "numeric_literal", "raw": "1"}
        ]}
    }"#;

    #[test]
    fn test_load_wrapped_json() {
        let cst = CstFile::from_json_str(SIMPLE).unwrap();
        assert_eq!(cst.source_path, Some(PathBuf::from("query.sql")));
        assert_eq!(cst.tree.raw(), "a+ 1");
        assert_eq!(cst.tree.children().len(), 4);

        let op = &cst.tree.children()[1];
        assert_eq!(op.kind(), "binary_operator");
        assert!(op.is_type("raw"));
        assert!(op.is_code());

        let ws = &cst.tree.children()[2];
        assert!(ws.is_whitespace());
        assert!(!ws.is_code());
    }

    #[test]
    fn test_positions_derived_when_missing() {
        let cst = CstFile::from_json_str(SIMPLE).unwrap();
        let columns: Vec<usize> = cst
            .tree
            .children()
            .iter()
            .map(|c| c.position().column)
            .collect();
        assert_eq!(columns, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_explicit_positions_kept() {
        let json = r#"{"type": "keyword", "raw": "select", "pos": {"line": 7, "column": 3, "offset": 90}}"#;
        let cst = CstFile::from_json_str(json).unwrap();
        assert_eq!(cst.source_path, None);
        assert_eq!(cst.tree.position(), PositionMarker::new(7, 3, 90));
    }

    #[test]
    fn test_flags_inferred_from_types() {
        let yaml = r#"
type: bracketed
children:
  - type: start_bracket
    raw: "("
  - type: indent
  - type: placeholder
    source_str: "{% if x %}\n"
  - type: inline_comment
    raw: "-- c"
  - type: newline
    raw: "\n"
  - type: end_square_bracket
    raw: "]"
"#;
        let cst = CstFile::from_yaml_str(yaml).unwrap();
        let children = cst.tree.children();
        assert!(children[0].is_open_bracket());
        assert!(children[1].is_meta());
        assert!(children[1].is_type("indent"));
        assert!(children[2].is_meta());
        assert_eq!(children[2].source_str(), Some("{% if x %}\n"));
        assert!(!children[3].is_code());
        assert!(!children[3].is_whitespace());
        assert!(children[4].is_whitespace());
        assert!(children[5].is_close_bracket());
        assert!(cst.tree.is_code());
    }

    #[test]
    fn test_dedent_is_an_indent() {
        let yaml = r#"
type: expression
children:
  - {type: column_reference, raw: a}
  - {type: dedent}
"#;
        let cst = CstFile::from_yaml_str(yaml).unwrap();
        let dedent = &cst.tree.children()[1];
        assert_eq!(dedent.kind(), "dedent");
        assert!(dedent.is_type("indent"));
        assert!(dedent.is_meta());
        assert!(!dedent.is_code());
    }

    #[test]
    fn test_bracket_role_from_primary_type_only() {
        let yaml = r#"
type: bracketed
children:
  - {type: [column_reference, start_bracket], raw: a}
  - {type: [end_bracket, symbol], raw: ")"}
"#;
        let cst = CstFile::from_yaml_str(yaml).unwrap();
        let children = cst.tree.children();
        assert_eq!(children[0].bracket_role(), None);
        assert_eq!(children[1].bracket_role(), Some(BracketRole::Close));
    }

    #[test]
    fn test_explicit_flags_override_inference() {
        let json = r#"{"type": "symbol", "raw": "+", "is_code": false}"#;
        let cst = CstFile::from_json_str(json).unwrap();
        assert!(!cst.tree.is_code());
    }

    #[test]
    fn test_leaf_without_raw_rejected() {
        let json = r#"{"type": "column_reference"}"#;
        assert!(matches!(
            CstFile::from_json_str(json),
            Err(CstError::Invalid(_))
        ));
    }

    #[test]
    fn test_empty_whitespace_rejected() {
        let json = r#"{"type": "whitespace", "raw": ""}"#;
        assert!(matches!(
            CstFile::from_json_str(json),
            Err(CstError::Segment(SegmentError::EmptyWhitespace))
        ));
    }

    #[test]
    fn test_mismatched_raw_is_kept_for_the_rules() {
        let json = r#"{"type": "expression", "raw": "a + b", "children": [
            {"type": "column_reference", "raw": "a"},
            {"type": "binary_operator", "raw": "+"},
            {"type": "column_reference", "raw": "b"}
        ]}"#;
        let cst = CstFile::from_json_str(json).unwrap();
        assert!(cst.tree.validate().is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.cst.json");
        std::fs::write(&path, SIMPLE).unwrap();
        let cst = CstFile::load(&path).unwrap();
        assert_eq!(cst.display_path(&path), Path::new("query.sql"));

        let other = dir.path().join("query.txt");
        std::fs::write(&other, SIMPLE).unwrap();
        assert!(matches!(
            CstFile::load(&other),
            Err(CstError::UnsupportedFormat(_))
        ));
    }
}

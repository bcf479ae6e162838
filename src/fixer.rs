//! Applies rule fixes to a tree
//!
//! Each fix inserts a new segment in front of an anchor, inside the anchor's
//! parent. The input tree is never modified: fixes are spliced into a clone,
//! ancestors get their raw text rebuilt and positions are recomputed.
//!
//! Fixes are classified as safe or unsafe:
//! - Safe fixes preserve code meaning and can be applied automatically
//! - Unsafe fixes may change runtime behavior and require explicit opt-in

use crate::diagnostic::{Diagnostic, FixKind, FixSafety, LintFix};
use crate::segment::{Segment, SegmentId};
use log::warn;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Result of applying fixes
#[derive(Debug, Default)]
pub struct FixResult {
    /// Number of fixes applied
    pub fixes_applied: usize,
    /// Number of fixes skipped (unsafe when not allowed)
    pub fixes_skipped: usize,
    /// Number of fixes identical to one already applied at the same anchor
    pub fixes_merged: usize,
    /// Number of fixes whose anchor could not be found
    pub fixes_failed: usize,
    /// Errors encountered
    pub errors: Vec<String>,
}

impl FixResult {
    pub fn is_complete(&self) -> bool {
        self.fixes_failed == 0
    }
}

/// Fix mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixMode {
    /// Apply only safe fixes (default)
    #[default]
    SafeOnly,
    /// Apply all fixes including unsafe
    All,
}

/// Applies the fixes attached to diagnostics
#[derive(Debug, Default)]
pub struct Fixer {
    mode: FixMode,
}

impl Fixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include unsafe fixes
    pub fn with_unsafe_fixes(mut self, include: bool) -> Self {
        self.mode = if include {
            FixMode::All
        } else {
            FixMode::SafeOnly
        };
        self
    }

    /// Check if a fix should be applied based on mode and safety
    fn should_apply_fix(&self, fix: &LintFix) -> bool {
        match self.mode {
            FixMode::All => true,
            FixMode::SafeOnly => fix.safety == FixSafety::Safe,
        }
    }

    /// Apply the fixes of `diagnostics` to a copy of `tree`
    pub fn apply(&self, tree: &Segment, diagnostics: &[Diagnostic]) -> (Segment, FixResult) {
        let all: Vec<&LintFix> = diagnostics.iter().flat_map(|d| d.fixes.iter()).collect();
        let applicable: Vec<&LintFix> = all
            .iter()
            .copied()
            .filter(|f| self.should_apply_fix(f))
            .collect();

        let (fixed, mut result) = splice_fixes(tree, &applicable);
        result.fixes_skipped = all.len() - applicable.len();
        (fixed, result)
    }

    /// Format fixes for display
    pub fn format_fixes(&self, diagnostics: &[Diagnostic]) -> String {
        let mut output = String::new();
        let mut count = 0;

        for diag in diagnostics {
            for fix in diag.fixes.iter().filter(|f| self.should_apply_fix(f)) {
                count += 1;
                let safety_marker = match fix.safety {
                    FixSafety::Safe => "[safe]",
                    FixSafety::Unsafe => "[unsafe]",
                };
                output.push_str(&format!(
                    "  {}:{}:{}: {} {} - {}\n",
                    diag.location.file.display(),
                    diag.location.line,
                    diag.location.column,
                    safety_marker,
                    diag.rule_id,
                    fix.description()
                ));
            }
        }

        if count == 0 {
            return "No fixes available.\n".to_string();
        }
        format!("Found {} fix(es):\n\n{}", count, output)
    }
}

/// Apply every fix in `fixes` to a copy of `tree`, regardless of safety
pub fn apply_fixes(tree: &Segment, fixes: &[LintFix]) -> (Segment, FixResult) {
    let fixes: Vec<&LintFix> = fixes.iter().collect();
    splice_fixes(tree, &fixes)
}

fn splice_fixes(tree: &Segment, fixes: &[&LintFix]) -> (Segment, FixResult) {
    let mut result = FixResult::default();
    let mut seen: HashSet<(SegmentId, &str)> = HashSet::new();
    let mut pending: HashMap<SegmentId, Vec<Segment>> = HashMap::new();
    let mut order: Vec<&LintFix> = Vec::new();

    for &fix in fixes {
        match fix.kind {
            FixKind::Create => {
                if !seen.insert((fix.anchor.id(), fix.edit.raw())) {
                    result.fixes_merged += 1;
                    continue;
                }
                pending
                    .entry(fix.anchor.id())
                    .or_default()
                    .push(fix.edit.clone());
                order.push(fix);
            }
        }
    }

    let mut fixed = tree.clone();
    result.fixes_applied = splice(&mut fixed, &mut pending);

    for fix in order {
        if pending.contains_key(&fix.anchor.id()) {
            warn!("Skipping fix, anchor not found: {}", fix.description());
            result.fixes_failed += 1;
            result.errors.push(format!(
                "anchor {} at {} not found",
                fix.anchor,
                fix.anchor.position()
            ));
        }
    }

    fixed.recompute_raw();
    fixed.reposition();
    (fixed, result)
}

/// Insert pending edits in front of their anchors, returning how many went in
fn splice(segment: &mut Segment, pending: &mut HashMap<SegmentId, Vec<Segment>>) -> usize {
    if segment.children.is_empty() || pending.is_empty() {
        return 0;
    }

    let mut applied = 0;
    let children = std::mem::take(&mut segment.children);
    let mut rebuilt = Vec::with_capacity(children.len() + 1);
    for mut child in children {
        if let Some(edits) = pending.remove(&child.id()) {
            applied += edits.len();
            rebuilt.extend(edits);
        }
        applied += splice(&mut child, pending);
        rebuilt.push(child);
    }
    segment.children = rebuilt;
    applied
}

/// Generate a unified diff between two strings
pub fn generate_unified_diff(file: &Path, original: &str, modified: &str) -> String {
    let mut diff = String::new();

    let original_lines: Vec<&str> = original.lines().collect();
    let modified_lines: Vec<&str> = modified.lines().collect();

    diff.push_str(&format!("--- a/{}\n", file.display()));
    diff.push_str(&format!("+++ b/{}\n", file.display()));

    // Line-by-line: fixes only insert whitespace, so lines never shift
    let max_len = original_lines.len().max(modified_lines.len());
    let mut in_hunk = false;
    let mut hunk_start = 0;
    let mut hunk_lines: Vec<String> = Vec::new();

    for i in 0..max_len {
        match (original_lines.get(i), modified_lines.get(i)) {
            (Some(o), Some(m)) if o == m => {
                if in_hunk {
                    hunk_lines.push(format!(" {}", o));
                }
            }
            (Some(o), Some(m)) => {
                if !in_hunk {
                    in_hunk = true;
                    hunk_start = i + 1;
                    if let Some(ctx) = i.checked_sub(1).and_then(|p| original_lines.get(p)) {
                        hunk_start = i;
                        hunk_lines.push(format!(" {}", ctx));
                    }
                }
                hunk_lines.push(format!("-{}", o));
                hunk_lines.push(format!("+{}", m));
            }
            (Some(o), None) => {
                if !in_hunk {
                    in_hunk = true;
                    hunk_start = i + 1;
                }
                hunk_lines.push(format!("-{}", o));
            }
            (None, Some(m)) => {
                if !in_hunk {
                    in_hunk = true;
                    hunk_start = i + 1;
                }
                hunk_lines.push(format!("+{}", m));
            }
            (None, None) => {}
        }
    }

    if !hunk_lines.is_empty() {
        diff.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk_start,
            original_lines.len(),
            hunk_start,
            modified_lines.len()
        ));
        for line in hunk_lines {
            diff.push_str(&line);
            diff.push('\n');
        }
    }

    diff
}

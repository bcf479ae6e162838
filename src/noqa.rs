//! Inline suppression comments
//!
//! Supported forms, anywhere on a source line:
//!
//! ```sql
//! SELECT a+b  -- noqa                 (every rule, this line)
//! SELECT a+b  -- noqa: L006,L039      (listed rules, this line)
//! -- noqa: disable=L006               (L006 from here on)
//! -- noqa: enable=L006                (L006 again from this line)
//! -- noqa: disable=all
//! ```

use crate::rule::RuleMetadata;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn noqa_regex() -> &'static Regex {
    static NOQA: OnceLock<Regex> = OnceLock::new();
    NOQA.get_or_init(|| {
        Regex::new(r"(?i)--\s*noqa(?:\s*:\s*(?P<rules>[^\r\n]*?))?\s*$")
            .expect("noqa pattern is valid")
    })
}

/// Which rules a directive applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoqaScope {
    All,
    Rules(Vec<String>),
}

impl NoqaScope {
    fn parse(list: &str) -> Self {
        let rules: Vec<String> = list
            .split(',')
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if rules.is_empty() || rules.iter().any(|r| r.eq_ignore_ascii_case("all")) {
            NoqaScope::All
        } else {
            NoqaScope::Rules(rules)
        }
    }

    fn covers(&self, rule: &RuleMetadata) -> bool {
        match self {
            NoqaScope::All => true,
            NoqaScope::Rules(rules) => rules.iter().any(|r| rule.is_named(r)),
        }
    }
}

/// A `disable=`/`enable=` range, `end` exclusive
#[derive(Debug, Clone, PartialEq, Eq)]
struct NoqaRange {
    scope: NoqaScope,
    start: usize,
    end: Option<usize>,
}

/// Suppression directives found in one source text
#[derive(Debug, Clone, Default)]
pub struct NoqaDirectives {
    lines: HashMap<usize, NoqaScope>,
    ranges: Vec<NoqaRange>,
}

impl NoqaDirectives {
    /// Parse directives from source text
    pub fn parse(source: &str) -> Self {
        let mut directives = Self::default();

        for (i, line) in source.lines().enumerate() {
            let line_num = i + 1;
            let Some(cap) = noqa_regex().captures(line) else {
                continue;
            };
            let directive = cap.name("rules").map(|m| m.as_str().trim()).unwrap_or("");

            if let Some(list) = directive.strip_prefix("disable=") {
                directives.ranges.push(NoqaRange {
                    scope: NoqaScope::parse(list),
                    start: line_num,
                    end: None,
                });
            } else if let Some(list) = directive.strip_prefix("enable=") {
                directives.close_ranges(&NoqaScope::parse(list), line_num);
            } else {
                directives.lines.insert(line_num, NoqaScope::parse(directive));
            }
        }

        directives
    }

    fn close_ranges(&mut self, scope: &NoqaScope, line: usize) {
        for range in self.ranges.iter_mut().filter(|r| r.end.is_none()) {
            let closes = match (scope, &range.scope) {
                (NoqaScope::All, _) => true,
                (NoqaScope::Rules(enabled), NoqaScope::Rules(disabled)) => disabled
                    .iter()
                    .all(|d| enabled.iter().any(|e| e.eq_ignore_ascii_case(d))),
                (NoqaScope::Rules(_), NoqaScope::All) => false,
            };
            if closes {
                range.end = Some(line);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.ranges.is_empty()
    }

    /// Check if `rule` is suppressed on `line` (1-based)
    pub fn is_suppressed(&self, rule: &RuleMetadata, line: usize) -> bool {
        if self.lines.get(&line).is_some_and(|scope| scope.covers(rule)) {
            return true;
        }
        self.ranges.iter().any(|range| {
            line >= range.start
                && range.end.is_none_or(|end| line < end)
                && range.scope.covers(rule)
        })
    }
}

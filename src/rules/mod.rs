//! Built-in rules

pub mod operator_spacing;

pub use operator_spacing::OperatorSpacing;

use crate::rule::Rule;
use std::sync::Arc;

/// Get all built-in rules
pub fn builtin_rules() -> Vec<Arc<dyn Rule>> {
    vec![Arc::new(OperatorSpacing::new())]
}

/// Look up a built-in rule by id or name
pub fn find_rule(reference: &str) -> Option<Arc<dyn Rule>> {
    builtin_rules()
        .into_iter()
        .find(|rule| rule.metadata().is_named(reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_have_unique_ids() {
        let rules = builtin_rules();
        assert!(!rules.is_empty());
        let mut ids: Vec<_> = rules.iter().map(|r| r.metadata().id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), rules.len());
    }

    #[test]
    fn test_find_rule() {
        assert!(find_rule("L006").is_some());
        assert!(find_rule("operator-spacing").is_some());
        assert!(find_rule("L999").is_none());
    }
}

//! Membership resolution strategies.
//!
//! The bulk expression query cannot be trusted to suppress include/exclude
//! influence when a collection is in conflict, so conflicted collections are
//! resolved by testing every prim of an unfiltered traversal one at a time.

use std::fmt;

use tracing::debug;

use super::{ConflictPolicy, MembershipEvaluator, MembershipQuery, RuleState};
use crate::core::SceneHierarchy;
use crate::util::ScenePath;

/// How membership of a collection is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// No expression: the evaluator's rule-based result, verbatim.
    RuleBased,
    /// Expression without rules: the evaluator's bulk query.
    BulkPredicate,
    /// Expression and rules: a per-prim test over `traverse_all`.
    PerNodeFallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::RuleBased => "rule-based",
            Strategy::BulkPredicate => "bulk-predicate",
            Strategy::PerNodeFallback => "per-node-fallback",
        })
    }
}

/// Pick the strategy for a rule state.
///
/// Under [`ConflictPolicy::RulesWin`] the expression never decides a
/// conflicted collection, so it resolves rule-based.
pub fn select_strategy(state: &RuleState, policy: ConflictPolicy) -> Strategy {
    if !state.has_expression() {
        return Strategy::RuleBased;
    }
    if !state.has_conflict() {
        return Strategy::BulkPredicate;
    }
    match policy {
        ConflictPolicy::ExpressionWins => Strategy::PerNodeFallback,
        ConflictPolicy::RulesWin => Strategy::RuleBased,
    }
}

/// Run `strategy` against `scene`. Paths come back in pre-order.
pub fn resolve_membership(
    strategy: Strategy,
    query: &MembershipQuery,
    scene: &dyn SceneHierarchy,
    evaluator: &dyn MembershipEvaluator,
) -> Vec<ScenePath> {
    let members = match strategy {
        Strategy::RuleBased => evaluator.compute_rule_membership(query, scene),
        Strategy::BulkPredicate => evaluator.compute_included_paths(query, scene),
        Strategy::PerNodeFallback => scene
            .traverse_all()
            .into_iter()
            .filter(|path| evaluator.is_path_included(query, path))
            .collect(),
    };
    debug!(%strategy, members = members.len(), "resolved collection membership");
    members
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(include_all: bool, includes: bool, expr: Option<&str>) -> RuleState {
        RuleState {
            include_all,
            includes: if includes {
                vec![ScenePath::parse("/A").unwrap()]
            } else {
                Vec::new()
            },
            membership_expression: expr.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_strategy() {
        let wins = ConflictPolicy::ExpressionWins;
        assert_eq!(select_strategy(&state(false, false, None), wins), Strategy::RuleBased);
        assert_eq!(select_strategy(&state(true, true, None), wins), Strategy::RuleBased);
        assert_eq!(select_strategy(&state(false, false, Some("")), wins), Strategy::RuleBased);
        assert_eq!(select_strategy(&state(false, false, Some("//")), wins), Strategy::BulkPredicate);
        assert_eq!(select_strategy(&state(false, true, Some("//")), wins), Strategy::PerNodeFallback);
        assert_eq!(select_strategy(&state(true, false, Some("//")), wins), Strategy::PerNodeFallback);
        assert_eq!(
            select_strategy(&state(false, true, Some("//")), ConflictPolicy::RulesWin),
            Strategy::RuleBased
        );
    }
}

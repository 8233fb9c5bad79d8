//! Membership queries and the evaluator seam.

use std::collections::BTreeMap;

use super::{ConflictPolicy, ExpansionRule, RuleState};
use crate::core::SceneHierarchy;
use crate::expr::PathExpression;
use crate::util::{Result, ScenePath};

/// Whether a path appears in the includes or the excludes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    Include,
    Exclude,
}

/// Resolved, immutable view of a collection's membership rules.
#[derive(Clone, Debug)]
pub struct MembershipQuery {
    rules: BTreeMap<ScenePath, RuleKind>,
    expansion_rule: ExpansionRule,
    expression: Option<PathExpression>,
    policy: ConflictPolicy,
}

impl MembershipQuery {
    /// Build a query from a rule snapshot.
    ///
    /// `includeAll` becomes an include of `/`; an exclude of a path also
    /// listed as an include wins. Relative expression patterns are anchored
    /// at `anchor`. Fails if the stored expression does not compile.
    pub fn new(state: &RuleState, anchor: &ScenePath, policy: ConflictPolicy) -> Result<Self> {
        let mut rules = BTreeMap::new();
        if state.include_all {
            rules.insert(ScenePath::root(), RuleKind::Include);
        }
        for path in &state.includes {
            rules.insert(path.clone(), RuleKind::Include);
        }
        for path in &state.excludes {
            rules.insert(path.clone(), RuleKind::Exclude);
        }

        let expression = match state.membership_expression.as_deref() {
            Some(text) if !text.is_empty() => {
                Some(PathExpression::parse(text)?.make_absolute(anchor))
            }
            _ => None,
        };

        Ok(Self {
            rules,
            expansion_rule: state.expansion_rule,
            expression,
            policy,
        })
    }

    pub fn expansion_rule(&self) -> ExpansionRule {
        self.expansion_rule
    }

    /// Absolute expression, if one is authored.
    pub fn expression(&self) -> Option<&PathExpression> {
        self.expression.as_ref()
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn rule(&self, path: &ScenePath) -> Option<RuleKind> {
        self.rules.get(path).copied()
    }

    /// True when the expression, not the rules, decides membership.
    pub fn uses_expression(&self) -> bool {
        match self.expression {
            None => false,
            Some(_) => self.policy == ConflictPolicy::ExpressionWins || self.rules.is_empty(),
        }
    }

    /// Nearest rule at or above `prim`.
    fn nearest_rule(&self, prim: &ScenePath) -> Option<RuleKind> {
        prim.ancestors().find_map(|p| self.rule(&p))
    }

    /// Membership under the include/exclude rules alone.
    pub fn is_included_by_rules(&self, path: &ScenePath) -> bool {
        if path.is_root() {
            return false;
        }
        if path.is_property_path() {
            let prim = path.prim_path();
            return match self.rule(path) {
                Some(RuleKind::Exclude) => false,
                Some(RuleKind::Include) => self.nearest_rule(&prim) != Some(RuleKind::Exclude),
                None => {
                    self.expansion_rule == ExpansionRule::ExpandPrimsAndProperties
                        && self.nearest_rule(&prim) == Some(RuleKind::Include)
                }
            };
        }
        match self.expansion_rule {
            ExpansionRule::ExplicitOnly => {
                self.rule(path) == Some(RuleKind::Include)
                    && !path
                        .ancestors()
                        .any(|p| self.rule(&p) == Some(RuleKind::Exclude))
            }
            _ => self.nearest_rule(path) == Some(RuleKind::Include),
        }
    }

    /// Membership under the expression alone, expanded per the expansion rule.
    pub fn is_included_by_expression(&self, path: &ScenePath) -> bool {
        let Some(expr) = &self.expression else {
            return false;
        };
        if path.is_root() {
            return false;
        }
        if path.is_property_path() {
            return expr.matches(path)
                || (self.expansion_rule == ExpansionRule::ExpandPrimsAndProperties
                    && self.prim_matches_expression(expr, &path.prim_path()));
        }
        self.prim_matches_expression(expr, path)
    }

    fn prim_matches_expression(&self, expr: &PathExpression, prim: &ScenePath) -> bool {
        match self.expansion_rule {
            ExpansionRule::ExplicitOnly => expr.matches(prim),
            _ => prim
                .ancestors()
                .take_while(|p| !p.is_root())
                .any(|p| expr.matches(&p)),
        }
    }

    /// Membership of a single path under the conflict policy.
    pub fn is_path_included(&self, path: &ScenePath) -> bool {
        if self.uses_expression() {
            self.is_included_by_expression(path)
        } else {
            self.is_included_by_rules(path)
        }
    }
}

/// Visit `prims` in order, yielding each prim and then each of its
/// properties that passes `test`.
pub(crate) fn collect_members<F>(
    scene: &dyn SceneHierarchy,
    prims: Vec<ScenePath>,
    test: F,
) -> Vec<ScenePath>
where
    F: Fn(&ScenePath) -> bool,
{
    let mut out = Vec::new();
    for prim in prims {
        if test(&prim) {
            out.push(prim.clone());
        }
        for name in scene.property_names(&prim) {
            if let Ok(prop) = prim.append_property(&name) {
                if test(&prop) {
                    out.push(prop);
                }
            }
        }
    }
    out
}

/// Evaluates membership queries against a scene.
///
/// Implementations must return paths in depth-first pre-order.
pub trait MembershipEvaluator: Send + Sync {
    /// Compile expression text. Syntax errors are `Error::InvalidExpression`.
    fn compile(&self, text: &str) -> Result<PathExpression> {
        PathExpression::parse(text)
    }

    /// Members under the include/exclude rules and expansion rule.
    fn compute_rule_membership(
        &self,
        query: &MembershipQuery,
        scene: &dyn SceneHierarchy,
    ) -> Vec<ScenePath>;

    /// Bulk membership query.
    fn compute_included_paths(
        &self,
        query: &MembershipQuery,
        scene: &dyn SceneHierarchy,
    ) -> Vec<ScenePath>;

    /// Single-path membership test.
    fn is_path_included(&self, query: &MembershipQuery, path: &ScenePath) -> bool;
}

/// Built-in evaluator. Traverses with the default predicate, so inactive
/// prims and their subtrees are never members.
#[derive(Clone, Copy, Debug, Default)]
pub struct StageEvaluator;

impl MembershipEvaluator for StageEvaluator {
    fn compute_rule_membership(
        &self,
        query: &MembershipQuery,
        scene: &dyn SceneHierarchy,
    ) -> Vec<ScenePath> {
        collect_members(scene, scene.traverse(), |p| query.is_included_by_rules(p))
    }

    fn compute_included_paths(
        &self,
        query: &MembershipQuery,
        scene: &dyn SceneHierarchy,
    ) -> Vec<ScenePath> {
        collect_members(scene, scene.traverse(), |p| query.is_path_included(p))
    }

    fn is_path_included(&self, query: &MembershipQuery, path: &ScenePath) -> bool {
        query.is_path_included(path)
    }
}

//! Collection schema accessors.
//!
//! A collection named `lights` on prim `/World` is stored as properties of
//! that prim:
//!
//! | Property                                 | Value            |
//! |------------------------------------------|------------------|
//! | `collection:lights:includeRoot`          | bool             |
//! | `collection:lights:includes`             | path list        |
//! | `collection:lights:excludes`             | path list        |
//! | `collection:lights:expansionRule`        | token            |
//! | `collection:lights:membershipExpression` | path expression  |

use std::collections::BTreeSet;

use tracing::warn;

use super::{ConflictPolicy, ExpansionRule, MembershipQuery, RuleState, COLLECTION_NAMESPACE};
use crate::core::{SceneHierarchy, Stage, Value};
use crate::expr::PathExpression;
use crate::util::{is_identifier, Result, ScenePath};

const INCLUDE_ROOT: &str = "includeRoot";
const INCLUDES: &str = "includes";
const EXCLUDES: &str = "excludes";
const EXPANSION_RULE: &str = "expansionRule";
const MEMBERSHIP_EXPRESSION: &str = "membershipExpression";

const FIELDS: [&str; 5] = [
    INCLUDE_ROOT,
    INCLUDES,
    EXCLUDES,
    EXPANSION_RULE,
    MEMBERSHIP_EXPRESSION,
];

/// Property paths backing one collection.
#[derive(Clone, Debug)]
struct CollectionAttrs {
    include_root: ScenePath,
    includes: ScenePath,
    excludes: ScenePath,
    expansion_rule: ScenePath,
    membership_expression: ScenePath,
}

/// Accessor for one named collection on one prim of a stage.
pub struct CollectionApi<'a> {
    stage: &'a Stage,
    prim: ScenePath,
    name: String,
    attrs: CollectionAttrs,
}

impl<'a> CollectionApi<'a> {
    /// Wrap collection `name` on `prim`.
    /// Returns None if the prim does not exist or the name is not an identifier.
    pub fn new(stage: &'a Stage, prim: &ScenePath, name: &str) -> Option<Self> {
        if !prim.is_prim_path() || !is_identifier(name) || !stage.is_valid_path(prim) {
            return None;
        }
        let attr = |field: &str| {
            prim.append_property(&format!("{}:{}:{}", COLLECTION_NAMESPACE, name, field))
                .ok()
        };
        let attrs = CollectionAttrs {
            include_root: attr(INCLUDE_ROOT)?,
            includes: attr(INCLUDES)?,
            excludes: attr(EXCLUDES)?,
            expansion_rule: attr(EXPANSION_RULE)?,
            membership_expression: attr(MEMBERSHIP_EXPRESSION)?,
        };
        Some(Self {
            stage,
            prim: prim.clone(),
            name: name.to_string(),
            attrs,
        })
    }

    /// Wrap a collection, authoring its expansion rule if the collection has
    /// no opinions yet so that it becomes discoverable.
    pub fn apply(stage: &'a Stage, prim: &ScenePath, name: &str) -> Option<Result<Self>> {
        let api = Self::new(stage, prim, name)?;
        if api.is_applied() {
            return Some(Ok(api));
        }
        Some(
            api.set_expansion_rule(ExpansionRule::default())
                .map(|_| api),
        )
    }

    /// Names of collections with at least one opinion on `prim`, sorted.
    pub fn collection_names(stage: &Stage, prim: &ScenePath) -> Vec<String> {
        let mut names = BTreeSet::new();
        for property in stage.property_names(prim) {
            let fields: Vec<&str> = property.split(':').collect();
            if let [ns, name, field] = fields.as_slice() {
                if *ns == COLLECTION_NAMESPACE && FIELDS.contains(field) {
                    names.insert(name.to_string());
                }
            }
        }
        names.into_iter().collect()
    }

    pub fn stage(&self) -> &'a Stage {
        self.stage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prim_path(&self) -> &ScenePath {
        &self.prim
    }

    /// Any of the collection's properties has an opinion.
    pub fn is_applied(&self) -> bool {
        [
            &self.attrs.include_root,
            &self.attrs.includes,
            &self.attrs.excludes,
            &self.attrs.expansion_rule,
            &self.attrs.membership_expression,
        ]
        .iter()
        .any(|p| self.stage.strongest_opinion(p).is_some())
    }

    /// `/prim.collection:name`, the path other collections use to refer to this one.
    pub fn named_collection_path(&self) -> ScenePath {
        self.prim
            .append_property(&format!("{}:{}", COLLECTION_NAMESPACE, self.name))
            .unwrap_or_else(|_| self.prim.clone())
    }

    pub fn include_root_path(&self) -> &ScenePath {
        &self.attrs.include_root
    }

    pub fn includes_path(&self) -> &ScenePath {
        &self.attrs.includes
    }

    pub fn excludes_path(&self) -> &ScenePath {
        &self.attrs.excludes
    }

    pub fn expansion_rule_path(&self) -> &ScenePath {
        &self.attrs.expansion_rule
    }

    pub fn membership_expression_path(&self) -> &ScenePath {
        &self.attrs.membership_expression
    }

    // ========================================================================
    // Include / exclude
    // ========================================================================

    pub fn include_root(&self) -> bool {
        self.stage
            .get(&self.attrs.include_root)
            .and_then(|v| v.as_bool().ok())
            .unwrap_or(false)
    }

    pub fn set_include_root(&self, state: bool) -> Result<()> {
        self.stage.set(&self.attrs.include_root, Value::Bool(state))
    }

    fn path_list(&self, prop: &ScenePath) -> Vec<ScenePath> {
        let Some(value) = self.stage.get(prop) else {
            return Vec::new();
        };
        match value.as_path_list() {
            Ok(paths) => paths.to_vec(),
            Err(err) => {
                warn!(property = %prop, error = %err, "ignoring collection list");
                Vec::new()
            }
        }
    }

    pub fn includes(&self) -> Vec<ScenePath> {
        self.path_list(&self.attrs.includes)
    }

    pub fn set_includes(&self, paths: Vec<ScenePath>) -> Result<()> {
        self.stage.set(&self.attrs.includes, Value::PathList(paths))
    }

    pub fn excludes(&self) -> Vec<ScenePath> {
        self.path_list(&self.attrs.excludes)
    }

    pub fn set_excludes(&self, paths: Vec<ScenePath>) -> Result<()> {
        self.stage.set(&self.attrs.excludes, Value::PathList(paths))
    }

    /// Author blocks on includes and excludes, hiding weaker opinions.
    pub fn block_collection(&self) -> Result<()> {
        self.stage.batch_changes(|| {
            self.stage.block(&self.attrs.includes)?;
            self.stage.block(&self.attrs.excludes)
        })
    }

    /// Clear includes and excludes at the edit target so weaker opinions
    /// show through. Returns true if anything was cleared.
    pub fn reset_collection(&self) -> Result<bool> {
        self.stage.batch_changes(|| {
            let includes = self.stage.clear(&self.attrs.includes)?;
            let excludes = self.stage.clear(&self.attrs.excludes)?;
            Ok(includes || excludes)
        })
    }

    // ========================================================================
    // Expansion rule and expression
    // ========================================================================

    pub fn expansion_rule(&self) -> ExpansionRule {
        let Some(value) = self.stage.get(&self.attrs.expansion_rule) else {
            return ExpansionRule::default();
        };
        match value.as_token().ok().and_then(ExpansionRule::from_token) {
            Some(rule) => rule,
            None => {
                warn!(collection = %self.name, value = %value, "unknown expansion rule, using default");
                ExpansionRule::default()
            }
        }
    }

    pub fn set_expansion_rule(&self, rule: ExpansionRule) -> Result<()> {
        self.stage.set(
            &self.attrs.expansion_rule,
            Value::Token(rule.as_token().to_string()),
        )
    }

    /// Expression text, if one is authored.
    pub fn membership_expression(&self) -> Option<String> {
        let value = self.stage.get(&self.attrs.membership_expression)?;
        match value.as_expression() {
            Ok(text) => Some(text.to_string()),
            Err(err) => {
                warn!(collection = %self.name, error = %err, "ignoring membership expression");
                None
            }
        }
    }

    pub fn set_membership_expression(&self, expression: &PathExpression) -> Result<()> {
        self.stage.set(
            &self.attrs.membership_expression,
            Value::Expression(expression.text().to_string()),
        )
    }

    /// Remove the expression opinion at the edit target.
    pub fn clear_membership_expression(&self) -> Result<bool> {
        self.stage.clear(&self.attrs.membership_expression)
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Snapshot of the resolved rule state.
    pub fn rule_state(&self) -> RuleState {
        RuleState {
            include_all: self.include_root(),
            includes: self.includes(),
            excludes: self.excludes(),
            expansion_rule: self.expansion_rule(),
            membership_expression: self.membership_expression(),
        }
    }

    /// Build a membership query; relative expression patterns are anchored
    /// at this collection's prim.
    pub fn compute_membership_query(&self, policy: ConflictPolicy) -> Result<MembershipQuery> {
        MembershipQuery::new(&self.rule_state(), &self.prim, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Opinion;

    fn p(s: &str) -> ScenePath {
        ScenePath::parse(s).unwrap()
    }

    #[test]
    fn test_new_requires_live_prim_and_identifier() {
        let stage = Stage::new();
        stage.define_prim(&p("/World")).unwrap();
        assert!(CollectionApi::new(&stage, &p("/World"), "lights").is_some());
        assert!(CollectionApi::new(&stage, &p("/Missing"), "lights").is_none());
        assert!(CollectionApi::new(&stage, &p("/World"), "bad name").is_none());
        assert!(CollectionApi::new(&stage, &ScenePath::root(), "lights").is_none());
    }

    #[test]
    fn test_property_layout() {
        let stage = Stage::new();
        stage.define_prim(&p("/World")).unwrap();
        let api = CollectionApi::new(&stage, &p("/World"), "lights").unwrap();
        assert_eq!(api.includes_path().as_str(), "/World.collection:lights:includes");
        assert_eq!(api.named_collection_path().as_str(), "/World.collection:lights");
    }

    #[test]
    fn test_defaults_when_unauthored() {
        let stage = Stage::new();
        stage.define_prim(&p("/World")).unwrap();
        let api = CollectionApi::new(&stage, &p("/World"), "lights").unwrap();
        assert_eq!(api.rule_state(), RuleState::default());
        assert!(!api.is_applied());
    }

    #[test]
    fn test_apply_and_discover() {
        let stage = Stage::new();
        stage.define_prim(&p("/World")).unwrap();
        CollectionApi::apply(&stage, &p("/World"), "lights").unwrap().unwrap();
        let shadows = CollectionApi::new(&stage, &p("/World"), "shadows").unwrap();
        shadows.set_includes(vec![p("/World")]).unwrap();
        stage.set(&p("/World.collectionish"), Value::Bool(true)).unwrap();
        assert_eq!(
            CollectionApi::collection_names(&stage, &p("/World")),
            vec!["lights", "shadows"]
        );
    }

    #[test]
    fn test_block_versus_reset() {
        let stage = Stage::new();
        stage.define_prim(&p("/World/A")).unwrap();
        let weak = stage.add_layer("weak");
        let api = CollectionApi::new(&stage, &p("/World"), "c").unwrap();

        stage.set_edit_target(weak).unwrap();
        api.set_includes(vec![p("/World/A")]).unwrap();
        stage.set_edit_target(0).unwrap();

        api.block_collection().unwrap();
        assert!(api.includes().is_empty());
        assert_eq!(stage.authored_opinion(0, api.includes_path()), Some(Opinion::Block));

        assert!(api.reset_collection().unwrap());
        assert_eq!(stage.authored_opinion(0, api.includes_path()), None);
        assert_eq!(api.includes(), vec![p("/World/A")]);
    }

    #[test]
    fn test_unknown_expansion_token_falls_back() {
        let stage = Stage::new();
        stage.define_prim(&p("/World")).unwrap();
        let api = CollectionApi::new(&stage, &p("/World"), "c").unwrap();
        stage
            .set(api.expansion_rule_path(), Value::Token("sideways".into()))
            .unwrap();
        assert_eq!(api.expansion_rule(), ExpansionRule::ExpandPrims);
        api.set_expansion_rule(ExpansionRule::ExplicitOnly).unwrap();
        assert_eq!(api.expansion_rule(), ExpansionRule::ExplicitOnly);
    }
}

//! Collection rule state and the conflict invariant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result, ScenePath};

/// How membership expands through the hierarchy from matched paths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpansionRule {
    /// Only the listed/matched paths themselves.
    #[serde(rename = "explicitOnly")]
    ExplicitOnly,
    /// Listed/matched prims and their descendant prims.
    #[default]
    #[serde(rename = "expandPrims")]
    ExpandPrims,
    /// Like `ExpandPrims`, plus the properties of every member prim.
    #[serde(rename = "expandPrimsAndProperties")]
    ExpandPrimsAndProperties,
}

impl ExpansionRule {
    pub const ALL: [ExpansionRule; 3] = [
        ExpansionRule::ExplicitOnly,
        ExpansionRule::ExpandPrims,
        ExpansionRule::ExpandPrimsAndProperties,
    ];

    /// Token stored in the scene.
    pub fn as_token(&self) -> &'static str {
        match self {
            ExpansionRule::ExplicitOnly => "explicitOnly",
            ExpansionRule::ExpandPrims => "expandPrims",
            ExpansionRule::ExpandPrimsAndProperties => "expandPrimsAndProperties",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_token() == token)
    }
}

impl fmt::Display for ExpansionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for ExpansionRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_token(s).ok_or_else(|| Error::other(format!("Unknown expansion rule: {}", s)))
    }
}

/// Which side decides membership when a collection has both
/// include/exclude rules and a membership expression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The expression decides; rules stay stored but are ignored.
    #[default]
    ExpressionWins,
    /// The rules decide; the expression is ignored.
    RulesWin,
}

impl ConflictPolicy {
    /// Warning shown to users when a collection is in conflict.
    pub fn conflict_message(&self) -> &'static str {
        match self {
            ConflictPolicy::ExpressionWins => {
                "Both Include/Exclude rules and Expressions are currently defined. Include/Exclude rules will be ignored."
            }
            ConflictPolicy::RulesWin => {
                "Both Include/Exclude rules and Expressions are currently defined. Expressions will be ignored."
            }
        }
    }
}

/// Snapshot of a collection's authored rules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleState {
    /// `includeRoot`: every prim is a member unless excluded.
    pub include_all: bool,
    pub includes: Vec<ScenePath>,
    pub excludes: Vec<ScenePath>,
    pub expansion_rule: ExpansionRule,
    pub membership_expression: Option<String>,
}

impl RuleState {
    /// A non-empty membership expression is authored.
    pub fn has_expression(&self) -> bool {
        self.membership_expression
            .as_deref()
            .map_or(false, |text| !text.is_empty())
    }

    /// Any include/exclude data is present.
    pub fn has_rules(&self) -> bool {
        self.include_all || !self.includes.is_empty() || !self.excludes.is_empty()
    }

    /// Expression and include/exclude data are both present.
    pub fn has_conflict(&self) -> bool {
        self.has_expression() && self.has_rules()
    }
}

//! Path expressions - textual predicates over scene paths.
//!
//! An expression combines [`PathPattern`]s with set operators:
//!
//! | Syntax        | Meaning                                   |
//! |---------------|-------------------------------------------|
//! | `/World/Cube` | exactly that prim                         |
//! | `/World/*`    | direct children of `/World`               |
//! | `/World//`    | `/World` and every descendant             |
//! | `//Light*`    | any prim named `Light*`, at any depth     |
//! | `Geo/*`       | relative, anchored at the collection prim |
//! | `/A.vis*`     | properties of `/A` named `vis*`           |
//! | `a b`, `a + b`| union                                     |
//! | `a - b`       | difference                                |
//! | `a & b`       | intersection                              |
//! | `~a`          | complement                                |
//!
//! ## Example
//!
//! ```ignore
//! use usd_collections::expr::PathExpression;
//!
//! let expr = PathExpression::parse("//Light* - /World/Disabled//")?;
//! assert!(expr.matches(&"/World/KeyLight".parse()?));
//! ```

mod glob;
mod parser;
mod pattern;

pub use glob::Glob;
pub use pattern::{PathPattern, Segment};

use std::fmt;
use std::str::FromStr;

use crate::util::{Error, Result, ScenePath};

/// Parse failure inside the expression layer, converted to
/// [`Error::InvalidExpression`] at the public boundary.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprNode {
    Pattern(PathPattern),
    Not(Box<ExprNode>),
    Union(Vec<ExprNode>),
    Intersect(Vec<ExprNode>),
    Difference(Box<ExprNode>, Box<ExprNode>),
}

impl ExprNode {
    fn matches(&self, path: &ScenePath) -> bool {
        match self {
            ExprNode::Pattern(p) => p.matches(path),
            ExprNode::Not(inner) => !inner.matches(path),
            ExprNode::Union(items) => items.iter().any(|n| n.matches(path)),
            ExprNode::Intersect(items) => items.iter().all(|n| n.matches(path)),
            ExprNode::Difference(a, b) => a.matches(path) && !b.matches(path),
        }
    }

    fn map_patterns(&self, f: &impl Fn(&PathPattern) -> PathPattern) -> ExprNode {
        match self {
            ExprNode::Pattern(p) => ExprNode::Pattern(f(p)),
            ExprNode::Not(inner) => ExprNode::Not(Box::new(inner.map_patterns(f))),
            ExprNode::Union(items) => {
                ExprNode::Union(items.iter().map(|n| n.map_patterns(f)).collect())
            }
            ExprNode::Intersect(items) => {
                ExprNode::Intersect(items.iter().map(|n| n.map_patterns(f)).collect())
            }
            ExprNode::Difference(a, b) => ExprNode::Difference(
                Box::new(a.map_patterns(f)),
                Box::new(b.map_patterns(f)),
            ),
        }
    }

    fn visit_patterns<'a>(&'a self, out: &mut Vec<&'a PathPattern>) {
        match self {
            ExprNode::Pattern(p) => out.push(p),
            ExprNode::Not(inner) => inner.visit_patterns(out),
            ExprNode::Union(items) | ExprNode::Intersect(items) => {
                items.iter().for_each(|n| n.visit_patterns(out))
            }
            ExprNode::Difference(a, b) => {
                a.visit_patterns(out);
                b.visit_patterns(out);
            }
        }
    }

    fn is_atomic(&self) -> bool {
        matches!(self, ExprNode::Pattern(_) | ExprNode::Not(_))
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_atomic() {
            write!(f, "{}", self)
        } else {
            write!(f, "({})", self)
        }
    }
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::Pattern(p) => write!(f, "{}", p),
            ExprNode::Not(inner) => {
                f.write_str("~")?;
                inner.fmt_operand(f)
            }
            ExprNode::Union(items) | ExprNode::Intersect(items) => {
                let sep = if matches!(self, ExprNode::Union(_)) { " " } else { " & " };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    item.fmt_operand(f)?;
                }
                Ok(())
            }
            ExprNode::Difference(a, b) => {
                a.fmt_operand(f)?;
                f.write_str(" - ")?;
                b.fmt_operand(f)
            }
        }
    }
}

/// A compiled path expression.
#[derive(Clone, Debug, PartialEq)]
pub struct PathExpression {
    text: String,
    root: ExprNode,
}

impl PathExpression {
    /// Compile expression text.
    ///
    /// Syntax errors are reported as [`Error::InvalidExpression`], which is
    /// distinct from a valid expression that happens to match nothing.
    pub fn parse(text: &str) -> Result<Self> {
        let root = parser::parse_expression(text).map_err(|e| Error::InvalidExpression {
            text: text.to_string(),
            offset: e.offset,
            message: e.message,
        })?;
        Ok(Self {
            text: text.to_string(),
            root,
        })
    }

    /// `//`: matches every prim.
    pub fn everything() -> Self {
        Self {
            text: "//".to_string(),
            root: ExprNode::Pattern(PathPattern::everything()),
        }
    }

    /// Source text as authored.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &ExprNode {
        &self.root
    }

    /// Every pattern leaf, left to right.
    pub fn patterns(&self) -> Vec<&PathPattern> {
        let mut out = Vec::new();
        self.root.visit_patterns(&mut out);
        out
    }

    /// True if no pattern is relative.
    pub fn is_absolute(&self) -> bool {
        self.patterns().iter().all(|p| p.is_absolute())
    }

    /// Anchor relative patterns at `anchor`.
    pub fn make_absolute(&self, anchor: &ScenePath) -> PathExpression {
        if self.is_absolute() {
            return self.clone();
        }
        let root = self.root.map_patterns(&|p| p.make_absolute(anchor));
        Self {
            text: root.to_string(),
            root,
        }
    }

    /// Test whether `path` is selected by the expression.
    pub fn matches(&self, path: &ScenePath) -> bool {
        self.root.matches(path)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for PathExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ScenePath {
        ScenePath::parse(s).unwrap()
    }

    fn e(s: &str) -> PathExpression {
        PathExpression::parse(s).unwrap()
    }

    #[test]
    fn test_exact_and_children() {
        assert!(e("/World/Cube").matches(&p("/World/Cube")));
        assert!(!e("/World/Cube").matches(&p("/World/Cube/Child")));
        assert!(e("/World/*").matches(&p("/World/Cube")));
        assert!(!e("/World/*").matches(&p("/World")));
        assert!(!e("/World/*").matches(&p("/World/Cube/Child")));
    }

    #[test]
    fn test_descendants() {
        let expr = e("/World//");
        assert!(expr.matches(&p("/World")));
        assert!(expr.matches(&p("/World/A/B/C")));
        assert!(!expr.matches(&p("/Other")));
        assert!(e("//").matches(&p("/Anything/At/All")));
        assert!(e("//Light*").matches(&p("/World/Rig/LightKey")));
        assert!(!e("//Light*").matches(&p("/World/Rig/KeyLight")));
        assert!(e("/World//Key").matches(&p("/World/Key")));
        assert!(e("/World//Key").matches(&p("/World/Rig/Deep/Key")));
        assert!(!e("/World//Key").matches(&p("/World/Rig/Keys")));
    }

    #[test]
    fn test_properties_only_match_property_paths() {
        let expr = e("/World/*.visibility");
        assert!(expr.matches(&p("/World/Cube.visibility")));
        assert!(!expr.matches(&p("/World/Cube")));
        assert!(!e("/World/Cube").matches(&p("/World/Cube.visibility")));
    }

    #[test]
    fn test_set_operators() {
        let expr = e("/World// - /World/Hidden//");
        assert!(expr.matches(&p("/World/Shown")));
        assert!(!expr.matches(&p("/World/Hidden/Child")));

        let expr = e("//Light* & /World/Rig//");
        assert!(expr.matches(&p("/World/Rig/LightA")));
        assert!(!expr.matches(&p("/Other/LightA")));

        let expr = e("~/World//");
        assert!(expr.matches(&p("/Other")));
        assert!(!expr.matches(&p("/World/A")));

        let expr = e("/A /B");
        assert!(expr.matches(&p("/A")) && expr.matches(&p("/B")));
    }

    #[test]
    fn test_make_absolute() {
        let expr = e("Geo/* - Geo/Proxy").make_absolute(&p("/World"));
        assert!(expr.is_absolute());
        assert_eq!(expr.text(), "/World/Geo/* - /World/Geo/Proxy");
        assert!(expr.matches(&p("/World/Geo/Body")));
        assert!(!expr.matches(&p("/World/Geo/Proxy")));
        assert!(!expr.matches(&p("/Geo/Body")));
    }

    #[test]
    fn test_relative_word_is_valid_syntax() {
        let expr = e("true").make_absolute(&p("/Collections"));
        assert!(expr.matches(&p("/Collections/true")));
        assert!(!expr.matches(&p("/A")));
    }

    #[test]
    fn test_invalid_expression_error() {
        let err = PathExpression::parse("/World &").unwrap_err();
        match err {
            Error::InvalidExpression { text, offset, .. } => {
                assert_eq!(text, "/World &");
                assert_eq!(offset, 8);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_display_normalizes_grouping() {
        let expr = e("(/A + /B) & ~(/C - /D)");
        assert_eq!(expr.root().to_string(), "(/A /B) & ~(/C - /D)");
        assert_eq!(expr.to_string(), "(/A + /B) & ~(/C - /D)");
    }
}

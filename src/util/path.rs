//! Scene paths.
//!
//! A [`ScenePath`] names either the pseudo-root (`/`), a prim (`/World/Cube`)
//! or a property on a prim (`/World/Cube.collection:lights:includes`).
//! Only absolute paths exist at this level; relative forms are resolved by
//! the expression layer before they reach a path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// Absolute path to a prim or property in a scene hierarchy.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScenePath {
    text: String,
}

/// Check that a name is usable as a prim name or property name field.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_property_name(name: &str) -> bool {
    !name.is_empty() && name.split(':').all(is_identifier)
}

impl ScenePath {
    /// The pseudo-root path `/`.
    pub fn root() -> Self {
        Self { text: "/".to_string() }
    }

    /// Parse and validate an absolute path string.
    pub fn parse(s: &str) -> Result<Self> {
        if s == "/" {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(Error::invalid_path(s, "path must be absolute"));
        };
        let (prim_part, prop_part) = match rest.split_once('.') {
            Some((prim, prop)) => (prim, Some(prop)),
            None => (rest, None),
        };
        if prim_part.is_empty() {
            return Err(Error::invalid_path(s, "missing prim name"));
        }
        for component in prim_part.split('/') {
            if !is_identifier(component) {
                return Err(Error::invalid_path(
                    s,
                    format!("invalid prim name '{}'", component),
                ));
            }
        }
        if let Some(prop) = prop_part {
            if !is_property_name(prop) {
                return Err(Error::invalid_path(
                    s,
                    format!("invalid property name '{}'", prop),
                ));
            }
        }
        Ok(Self { text: s.to_string() })
    }

    /// Path text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.text == "/"
    }

    #[inline]
    pub fn is_property_path(&self) -> bool {
        self.text.contains('.')
    }

    #[inline]
    pub fn is_prim_path(&self) -> bool {
        !self.is_root() && !self.is_property_path()
    }

    /// The prim portion of the path text (everything before the property).
    pub fn prim_part(&self) -> &str {
        match self.text.split_once('.') {
            Some((prim, _)) => prim,
            None => &self.text,
        }
    }

    /// Property name for property paths.
    pub fn property_name(&self) -> Option<&str> {
        self.text.split_once('.').map(|(_, prop)| prop)
    }

    /// Last element: the property name, the prim name, or empty for the root.
    pub fn name(&self) -> &str {
        if let Some(prop) = self.property_name() {
            return prop;
        }
        self.text.rsplit('/').next().unwrap_or("")
    }

    /// Prim path of a property, or a clone of a prim path.
    pub fn prim_path(&self) -> ScenePath {
        Self {
            text: self.prim_part().to_string(),
        }
    }

    /// Parent path. Properties have their prim as parent; the root has none.
    pub fn parent(&self) -> Option<ScenePath> {
        if self.is_root() {
            return None;
        }
        if self.is_property_path() {
            return Some(self.prim_path());
        }
        match self.text.rsplit_once('/') {
            Some(("", _)) => Some(Self::root()),
            Some((head, _)) => Some(Self {
                text: head.to_string(),
            }),
            None => None,
        }
    }

    /// Prim name components, root first.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.prim_part().split('/').filter(|s| !s.is_empty())
    }

    /// Number of prim components (0 for the root).
    pub fn depth(&self) -> usize {
        self.components().count()
    }

    /// Component-wise prefix test. Every path has the root and itself as prefix.
    pub fn has_prefix(&self, prefix: &ScenePath) -> bool {
        if prefix.is_root() || self == prefix {
            return true;
        }
        if prefix.is_property_path() {
            return false;
        }
        let prim = self.prim_part();
        prim == prefix.text
            || (prim.starts_with(prefix.text.as_str())
                && prim.as_bytes().get(prefix.text.len()) == Some(&b'/'))
    }

    /// Append a child prim name.
    pub fn append_child(&self, name: &str) -> Result<ScenePath> {
        if self.is_property_path() {
            return Err(Error::invalid_path(
                &self.text,
                "cannot append a child to a property path",
            ));
        }
        if !is_identifier(name) {
            return Err(Error::invalid_path(
                name,
                "invalid prim name",
            ));
        }
        let text = if self.is_root() {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.text, name)
        };
        Ok(Self { text })
    }

    /// Append a property name to a prim path.
    pub fn append_property(&self, name: &str) -> Result<ScenePath> {
        if !self.is_prim_path() {
            return Err(Error::invalid_path(
                &self.text,
                "properties can only be appended to prim paths",
            ));
        }
        if !is_property_name(name) {
            return Err(Error::invalid_path(name, "invalid property name"));
        }
        Ok(Self {
            text: format!("{}.{}", self.text, name),
        })
    }

    /// This path followed by each ancestor up to and including the root.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: Some(self.clone()),
        }
    }
}

/// Iterator returned by [`ScenePath::ancestors`].
pub struct Ancestors {
    next: Option<ScenePath>,
}

impl Iterator for Ancestors {
    type Item = ScenePath;

    fn next(&mut self) -> Option<ScenePath> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScenePath({})", self.text)
    }
}

impl FromStr for ScenePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ScenePath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<ScenePath> for String {
    fn from(path: ScenePath) -> String {
        path.text
    }
}

impl AsRef<str> for ScenePath {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

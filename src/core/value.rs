//! Property values stored in layers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result, ScenePath};

/// A property value.
///
/// Collections only need a handful of value kinds, so this is a closed enum
/// rather than a general-purpose variant type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Token(String),
    String(String),
    /// Ordered target list, e.g. collection includes.
    PathList(Vec<ScenePath>),
    /// Path expression source text (validated when authored).
    Expression(String),
}

impl Value {
    /// Name of the value kind, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Token(_) => "token",
            Value::String(_) => "string",
            Value::PathList(_) => "path[]",
            Value::Expression(_) => "pathExpression",
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::type_mismatch("bool", other.type_name())),
        }
    }

    pub fn as_token(&self) -> Result<&str> {
        match self {
            Value::Token(t) => Ok(t),
            other => Err(Error::type_mismatch("token", other.type_name())),
        }
    }

    pub fn as_path_list(&self) -> Result<&[ScenePath]> {
        match self {
            Value::PathList(paths) => Ok(paths),
            other => Err(Error::type_mismatch("path[]", other.type_name())),
        }
    }

    pub fn as_expression(&self) -> Result<&str> {
        match self {
            Value::Expression(text) => Ok(text),
            other => Err(Error::type_mismatch("pathExpression", other.type_name())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Token(t) => write!(f, "{}", t),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::PathList(paths) => {
                f.write_str("[")?;
                for (i, path) in paths.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "<{}>", path)?;
                }
                f.write_str("]")
            }
            Value::Expression(text) => write!(f, "expr({})", text),
        }
    }
}

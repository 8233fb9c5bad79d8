//! # USD Collections
//!
//! Collection membership resolution over a layered scene hierarchy.
//!
//! A collection is a named rule set stored on a prim: include/exclude path
//! lists, an `includeRoot` flag, an expansion rule and an optional path
//! expression. This crate stores such scenes, evaluates membership with a
//! documented conflict policy, and keeps editors in sync through change
//! notices.
//!
//! ## Modules
//!
//! - [`util`] - Paths and errors
//! - [`core`] - Stage, layers, opinions and change notices
//! - [`expr`] - Path expression parsing and matching
//! - [`collection`] - Collection schema, membership resolution, data binding
//! - [`host`] - Reporter, settings and the context passed to editors
//!
//! ## Example
//!
//! ```ignore
//! use usd_collections::prelude::*;
//!
//! let stage = Stage::new();
//! let world = stage.define_prim(&"/World".parse()?)?;
//! stage.define_prim(&"/World/Key".parse()?)?;
//!
//! let data = CollectionData::new(CollectionContext::default(), &world, "lights");
//! data.set_membership_expression("//Key");
//! assert_eq!(data.compute_membership().len(), 1);
//! ```

pub mod util;
pub mod core;
pub mod expr;
pub mod collection;
pub mod host;

// Re-export commonly used types
pub use util::{Error, Result, ScenePath};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result, ScenePath};
    pub use crate::core::{Prim, SceneHierarchy, Stage, Subscription, Value};
    pub use crate::expr::PathExpression;
    pub use crate::collection::{
        CollectionApi, CollectionData, ConflictPolicy, ExpansionRule, MembershipEvaluator,
        Strategy,
    };
    pub use crate::host::{CollectionContext, MessageType, Reporter, Settings};
}

//! Collections - named groups of scene paths stored on a prim.
//!
//! A collection selects members with include/exclude rules, a path
//! expression, or both. When both are present the collection is in
//! *conflict*; [`ConflictPolicy`] decides which side wins and users are
//! warned.
//!
//! ## Layers
//!
//! - [`CollectionApi`] - typed access to the stored properties
//! - [`MembershipQuery`] / [`MembershipEvaluator`] - membership rules
//! - [`Strategy`] / [`resolve_membership`] - how membership is computed
//! - [`CollectionData`] - notification-driven binding for editors
//!
//! ## Example
//!
//! ```ignore
//! use usd_collections::prelude::*;
//!
//! let stage = Stage::open("scene.json")?;
//! let prim = stage.get_prim(&"/World".parse()?).ok_or(Error::Other("no /World".into()))?;
//! let data = CollectionData::new(CollectionContext::default(), &prim, "lights");
//! data.include_data().add_strings(&["/World/Lights"]);
//! for path in data.compute_membership() {
//!     println!("{}", path);
//! }
//! ```

mod data;
mod filter;
mod query;
mod resolver;
mod rules;
mod schema;
mod string_list;

pub use data::{classify_changes, ChangeSet, CollectionData};
pub use filter::{matches_filter, FilteredStringList};
pub use query::{MembershipEvaluator, MembershipQuery, RuleKind, StageEvaluator};
pub use resolver::{resolve_membership, select_strategy, Strategy};
pub use rules::{ConflictPolicy, ExpansionRule, RuleState};
pub use schema::CollectionApi;
pub use string_list::CollectionStringListData;

use crate::core::Dispatcher;

/// Argument-less change signal.
pub type Signal = Dispatcher<()>;

/// Property namespace for collection data.
pub const COLLECTION_NAMESPACE: &str = "collection";

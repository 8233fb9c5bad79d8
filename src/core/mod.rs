//! Core layer - scene storage the collection layer is built on.
//!
//! This module provides:
//! - [`Value`] - Property values
//! - [`Layer`] / [`LayerStack`] / [`Opinion`] - Layered opinions with blocks
//! - [`Dispatcher`] / [`Subscription`] / [`ObjectsChanged`] - Change notices
//! - [`Stage`] / [`Prim`] - Prim hierarchy, authoring and traversal
//! - [`SceneHierarchy`] - Read-only hierarchy trait consumed by evaluators
//! - [`SceneDescription`] - JSON scene files

mod value;
mod layer;
mod notice;
mod traits;
mod stage;
mod scene;

pub use value::Value;
pub use layer::{Layer, LayerStack, Opinion};
pub use notice::{Dispatcher, Listen, ObjectsChanged, Subscription};
pub use traits::SceneHierarchy;
pub use stage::{Prim, PrimId, Stage};
pub use scene::{PrimDescription, SceneDescription};

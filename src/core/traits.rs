//! Abstract traits at the boundary between scene storage and the
//! collection layer.

use crate::util::ScenePath;

/// Read access to a hierarchical scene.
///
/// Traversals are depth-first pre-order, children in authoring order, and
/// never include the pseudo-root.
pub trait SceneHierarchy {
    /// Check if a prim exists at `path`.
    fn is_valid_path(&self, path: &ScenePath) -> bool;

    /// Default-predicate traversal: active prims only. An inactive prim
    /// prunes its whole subtree.
    fn traverse(&self) -> Vec<ScenePath>;

    /// Unfiltered traversal of every prim.
    fn traverse_all(&self) -> Vec<ScenePath>;

    /// Names of properties with an authored opinion on `prim`, sorted.
    fn property_names(&self, prim: &ScenePath) -> Vec<String>;
}

//! Layers of property opinions.
//!
//! A [`LayerStack`] orders layers strongest first. Resolving a property walks
//! the stack and stops at the first opinion found: a [`Opinion::Value`]
//! resolves to that value, a [`Opinion::Block`] resolves to nothing and hides
//! every weaker opinion. Clearing an opinion, in contrast, removes it from
//! one layer so weaker layers show through again.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Value;
use crate::util::{Error, Result, ScenePath};

/// A single authored opinion about a property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opinion {
    Value(Value),
    /// Explicitly authored "no value", overriding weaker layers.
    Block,
}

impl Opinion {
    #[inline]
    pub fn is_block(&self) -> bool {
        matches!(self, Opinion::Block)
    }

    /// The value, if this opinion is not a block.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Opinion::Value(v) => Some(v),
            Opinion::Block => None,
        }
    }
}

/// Named set of property opinions keyed by property path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    #[serde(default)]
    opinions: BTreeMap<ScenePath, Opinion>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            opinions: BTreeMap::new(),
        }
    }

    pub fn get(&self, path: &ScenePath) -> Option<&Opinion> {
        self.opinions.get(path)
    }

    /// Author an opinion, returning the one it replaced.
    pub fn set(&mut self, path: ScenePath, opinion: Opinion) -> Option<Opinion> {
        self.opinions.insert(path, opinion)
    }

    /// Remove the opinion for `path`. Returns true if one existed.
    pub fn clear(&mut self, path: &ScenePath) -> bool {
        self.opinions.remove(path).is_some()
    }

    /// Remove every opinion on `prim` and its descendants.
    pub fn remove_subtree(&mut self, prim: &ScenePath) -> usize {
        let before = self.opinions.len();
        self.opinions.retain(|path, _| !path.has_prefix(prim));
        before - self.opinions.len()
    }

    pub fn len(&self) -> usize {
        self.opinions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opinions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScenePath, &Opinion)> {
        self.opinions.iter()
    }
}

/// Ordered layers, strongest first, with an edit target.
#[derive(Clone, Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    edit_target: usize,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new(Layer::new("root"))
    }
}

impl LayerStack {
    /// Create a stack with a single layer that is also the edit target.
    pub fn new(root: Layer) -> Self {
        Self {
            layers: vec![root],
            edit_target: 0,
        }
    }

    /// Build a stack from layers ordered strongest first.
    pub fn from_layers(layers: Vec<Layer>) -> Self {
        if layers.is_empty() {
            return Self::default();
        }
        Self {
            layers,
            edit_target: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        let count = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or(Error::LayerOutOfBounds { index, count })
    }

    /// Append a layer weaker than every existing one. Returns its index.
    pub fn push_weaker(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    #[inline]
    pub fn edit_target(&self) -> usize {
        self.edit_target
    }

    pub fn set_edit_target(&mut self, index: usize) -> Result<()> {
        if index >= self.layers.len() {
            return Err(Error::LayerOutOfBounds {
                index,
                count: self.layers.len(),
            });
        }
        self.edit_target = index;
        Ok(())
    }

    /// Layer currently receiving edits.
    pub fn edit_layer_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.edit_target]
    }

    /// Strongest opinion for `path` and the index of the layer holding it.
    pub fn strongest_opinion(&self, path: &ScenePath) -> Option<(usize, &Opinion)> {
        self.layers
            .iter()
            .enumerate()
            .find_map(|(i, layer)| layer.get(path).map(|op| (i, op)))
    }

    /// Resolved value: the strongest opinion unless it is a block.
    pub fn resolve(&self, path: &ScenePath) -> Option<&Value> {
        self.strongest_opinion(path).and_then(|(_, op)| op.value())
    }

    /// True if any layer holds an opinion (value or block) for `path`.
    pub fn has_opinion(&self, path: &ScenePath) -> bool {
        self.strongest_opinion(path).is_some()
    }

    /// Names of properties on `prim` with an opinion in any layer, sorted.
    pub fn property_names(&self, prim: &ScenePath) -> Vec<String> {
        let mut names = BTreeSet::new();
        for layer in &self.layers {
            for path in layer.opinions.keys() {
                if path.is_property_path() && path.prim_part() == prim.as_str() {
                    if let Some(name) = path.property_name() {
                        names.insert(name.to_string());
                    }
                }
            }
        }
        names.into_iter().collect()
    }

    /// Remove opinions on `prim` and its descendants from every layer.
    pub fn remove_subtree(&mut self, prim: &ScenePath) -> usize {
        self.layers.iter_mut().map(|l| l.remove_subtree(prim)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ScenePath {
        ScenePath::parse(s).unwrap()
    }

    fn two_layer_stack() -> LayerStack {
        let mut weak = Layer::new("weak");
        weak.set(p("/A.flag"), Opinion::Value(Value::Bool(true)));
        let mut stack = LayerStack::new(Layer::new("strong"));
        stack.push_weaker(weak);
        stack
    }

    #[test]
    fn test_weaker_shows_through() {
        let stack = two_layer_stack();
        assert_eq!(stack.resolve(&p("/A.flag")), Some(&Value::Bool(true)));
        assert_eq!(stack.strongest_opinion(&p("/A.flag")).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_block_hides_weaker_and_clear_restores() {
        let mut stack = two_layer_stack();
        stack.edit_layer_mut().set(p("/A.flag"), Opinion::Block);
        assert_eq!(stack.resolve(&p("/A.flag")), None);
        assert!(stack.has_opinion(&p("/A.flag")));

        assert!(stack.edit_layer_mut().clear(&p("/A.flag")));
        assert_eq!(stack.resolve(&p("/A.flag")), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_edit_target_bounds() {
        let mut stack = two_layer_stack();
        assert!(stack.set_edit_target(1).is_ok());
        assert!(matches!(
            stack.set_edit_target(2),
            Err(Error::LayerOutOfBounds { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_property_names_and_subtree_removal() {
        let mut stack = two_layer_stack();
        stack.edit_layer_mut().set(p("/A.other"), Opinion::Block);
        stack.edit_layer_mut().set(p("/A/B.x"), Opinion::Value(Value::Bool(false)));
        assert_eq!(stack.property_names(&p("/A")), vec!["flag", "other"]);
        assert_eq!(stack.remove_subtree(&p("/A")), 3);
        assert!(stack.property_names(&p("/A")).is_empty());
    }
}

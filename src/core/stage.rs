//! Stage: the prim hierarchy plus its layered property opinions.
//!
//! Prims live in a generational arena so that [`Prim`] handles can detect
//! that the prim they referred to was removed, even if a new prim was later
//! defined at the same path. All state sits behind one `RwLock`; the lock is
//! always released before change notices are dispatched.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use super::{
    Dispatcher, Layer, LayerStack, Listen, ObjectsChanged, Opinion, SceneHierarchy, Subscription,
    Value,
};
use crate::util::{Error, Result, ScenePath};

const ROOT_INDEX: usize = 0;

/// Arena slot identity of a prim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrimId {
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct PrimEntry {
    path: ScenePath,
    parent: Option<usize>,
    children: Vec<usize>,
    active: bool,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<PrimEntry>,
}

#[derive(Debug)]
struct StageData {
    slots: Vec<Slot>,
    free: Vec<usize>,
    index: HashMap<ScenePath, usize>,
    layers: LayerStack,
}

impl StageData {
    fn new(layers: LayerStack) -> Self {
        let root = PrimEntry {
            path: ScenePath::root(),
            parent: None,
            children: Vec::new(),
            active: true,
        };
        let mut index = HashMap::new();
        index.insert(ScenePath::root(), ROOT_INDEX);
        Self {
            slots: vec![Slot {
                generation: 0,
                entry: Some(root),
            }],
            free: Vec::new(),
            index,
            layers,
        }
    }

    fn entry(&self, index: usize) -> Option<&PrimEntry> {
        self.slots.get(index).and_then(|s| s.entry.as_ref())
    }

    fn entry_mut(&mut self, index: usize) -> Option<&mut PrimEntry> {
        self.slots.get_mut(index).and_then(|s| s.entry.as_mut())
    }

    fn lookup(&self, path: &ScenePath) -> Option<&PrimEntry> {
        self.index.get(path).and_then(|&i| self.entry(i))
    }

    fn id_of(&self, index: usize) -> PrimId {
        PrimId {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn alloc(&mut self, entry: PrimEntry) -> usize {
        if let Some(index) = self.free.pop() {
            self.slots[index].entry = Some(entry);
            index
        } else {
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            self.slots.len() - 1
        }
    }

    fn release(&mut self, index: usize) -> Option<PrimEntry> {
        let slot = self.slots.get_mut(index)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Some(entry)
    }

    fn is_live(&self, id: PrimId) -> bool {
        self.slots
            .get(id.index)
            .map_or(false, |s| s.generation == id.generation && s.entry.is_some())
    }

    /// Pre-order walk below the root. `prune_inactive` skips inactive subtrees.
    fn walk(&self, prune_inactive: bool) -> Vec<ScenePath> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = match self.entry(ROOT_INDEX) {
            Some(root) => root.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(index) = stack.pop() {
            let Some(entry) = self.entry(index) else {
                continue;
            };
            if prune_inactive && !entry.active {
                continue;
            }
            out.push(entry.path.clone());
            stack.extend(entry.children.iter().rev().copied());
        }
        out
    }
}

/// Notices held back by [`Stage::batch_changes`].
#[derive(Default)]
struct ChangeBatch {
    depth: usize,
    notice: ObjectsChanged,
}

/// A scene: prim hierarchy, layer stack and change notice stream.
pub struct Stage {
    data: RwLock<StageData>,
    batch: Mutex<ChangeBatch>,
    objects_changed: Dispatcher<ObjectsChanged>,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("Stage")
            .field("prims", &data.index.len())
            .field("layers", &data.layers.len())
            .finish()
    }
}

impl Stage {
    /// Create an empty stage with a single layer.
    pub fn new() -> Arc<Stage> {
        Self::with_layers(LayerStack::default())
    }

    /// Create an empty stage over an existing layer stack.
    pub fn with_layers(layers: LayerStack) -> Arc<Stage> {
        Arc::new(Stage {
            data: RwLock::new(StageData::new(layers)),
            batch: Mutex::new(ChangeBatch::default()),
            objects_changed: Dispatcher::new(),
        })
    }

    fn notify(&self, notice: ObjectsChanged) {
        if notice.is_empty() {
            return;
        }
        {
            let mut batch = self.batch.lock();
            if batch.depth > 0 {
                batch.notice.merge(notice);
                return;
            }
        }
        self.dispatch(notice);
    }

    fn dispatch(&self, notice: ObjectsChanged) {
        if notice.is_empty() {
            return;
        }
        trace!(
            resynced = notice.resynced_paths().len(),
            info_only = notice.changed_info_only_paths().len(),
            "dispatching objects-changed notice"
        );
        self.objects_changed.emit(&notice);
    }

    /// Run `f` with change notices held back, then send everything it
    /// changed as a single notice. Nested batches flush once, at the
    /// outermost level.
    pub fn batch_changes<R>(&self, f: impl FnOnce() -> R) -> R {
        self.batch.lock().depth += 1;
        let out = f();
        let notice = {
            let mut batch = self.batch.lock();
            batch.depth -= 1;
            if batch.depth > 0 {
                return out;
            }
            std::mem::take(&mut batch.notice)
        };
        self.dispatch(notice);
        out
    }

    // ========================================================================
    // Prims
    // ========================================================================

    /// Handle to the pseudo-root.
    pub fn pseudo_root(self: &Arc<Self>) -> Prim {
        let id = self.data.read().id_of(ROOT_INDEX);
        Prim {
            stage: Arc::downgrade(self),
            path: ScenePath::root(),
            id,
        }
    }

    /// Look up a prim by path.
    pub fn get_prim(self: &Arc<Self>, path: &ScenePath) -> Option<Prim> {
        let data = self.data.read();
        let index = *data.index.get(path)?;
        Some(Prim {
            stage: Arc::downgrade(self),
            path: path.clone(),
            id: data.id_of(index),
        })
    }

    pub fn has_prim(&self, path: &ScenePath) -> bool {
        self.data.read().index.contains_key(path)
    }

    pub fn prim_count(&self) -> usize {
        self.data.read().index.len()
    }

    /// Define a prim, creating missing ancestors. Existing prims are returned
    /// as-is without a notice.
    pub fn define_prim(self: &Arc<Self>, path: &ScenePath) -> Result<Prim> {
        if !path.is_prim_path() {
            return Err(Error::invalid_path(path.as_str(), "not a prim path"));
        }

        let mut notice = ObjectsChanged::new();
        let id = {
            let mut data = self.data.write();
            let mut parent = ROOT_INDEX;
            let mut current = ScenePath::root();
            for name in path.components() {
                current = current.append_child(name)?;
                if let Some(&existing) = data.index.get(&current) {
                    parent = existing;
                    continue;
                }
                let index = data.alloc(PrimEntry {
                    path: current.clone(),
                    parent: Some(parent),
                    children: Vec::new(),
                    active: true,
                });
                if let Some(p) = data.entry_mut(parent) {
                    p.children.push(index);
                }
                data.index.insert(current.clone(), index);
                if notice.is_empty() {
                    notice.add_resynced(current.clone());
                }
                parent = index;
            }
            data.id_of(parent)
        };

        if !notice.is_empty() {
            debug!(path = %path, "defined prim");
        }
        self.notify(notice);
        Ok(Prim {
            stage: Arc::downgrade(self),
            path: path.clone(),
            id,
        })
    }

    /// Remove a prim, its descendants and every opinion on them.
    /// Returns false if there was nothing to remove.
    pub fn remove_prim(&self, path: &ScenePath) -> bool {
        if path.is_root() {
            return false;
        }
        {
            let mut data = self.data.write();
            let Some(&index) = data.index.get(path) else {
                return false;
            };
            if let Some(parent) = data.entry(index).and_then(|e| e.parent) {
                if let Some(p) = data.entry_mut(parent) {
                    p.children.retain(|&c| c != index);
                }
            }

            let mut pending = vec![index];
            while let Some(i) = pending.pop() {
                if let Some(entry) = data.release(i) {
                    data.index.remove(&entry.path);
                    pending.extend(entry.children);
                }
            }
            let dropped = data.layers.remove_subtree(path);
            debug!(path = %path, opinions = dropped, "removed prim");
        }

        let mut notice = ObjectsChanged::new();
        notice.add_resynced(path.clone());
        self.notify(notice);
        true
    }

    /// Activate or deactivate a prim. Returns whether anything changed.
    pub fn set_active(&self, path: &ScenePath, active: bool) -> Result<bool> {
        if path.is_root() {
            return Err(Error::invalid_path(path.as_str(), "the pseudo-root is always active"));
        }
        {
            let mut data = self.data.write();
            let index = *data
                .index
                .get(path)
                .ok_or_else(|| Error::PrimNotFound(path.to_string()))?;
            let Some(entry) = data.entry_mut(index) else {
                return Err(Error::PrimNotFound(path.to_string()));
            };
            if entry.active == active {
                return Ok(false);
            }
            entry.active = active;
        }
        let mut notice = ObjectsChanged::new();
        notice.add_resynced(path.clone());
        self.notify(notice);
        Ok(true)
    }

    pub fn is_active(&self, path: &ScenePath) -> bool {
        self.data.read().lookup(path).map_or(false, |e| e.active)
    }

    /// Child prim paths in authoring order.
    pub fn children(&self, path: &ScenePath) -> Vec<ScenePath> {
        let data = self.data.read();
        let Some(entry) = data.lookup(path) else {
            return Vec::new();
        };
        entry
            .children
            .iter()
            .filter_map(|&c| data.entry(c).map(|e| e.path.clone()))
            .collect()
    }

    fn is_live(&self, id: PrimId) -> bool {
        self.data.read().is_live(id)
    }

    // ========================================================================
    // Properties
    // ========================================================================

    fn check_property_path(data: &StageData, prop: &ScenePath) -> Result<()> {
        if !prop.is_property_path() {
            return Err(Error::invalid_path(prop.as_str(), "not a property path"));
        }
        if !data.index.contains_key(&prop.prim_path()) {
            return Err(Error::PrimNotFound(prop.prim_part().to_string()));
        }
        Ok(())
    }

    /// Author an opinion at the edit target. Returns the notice to send, if
    /// the edit layer actually changed.
    fn author(&self, prop: &ScenePath, opinion: Opinion) -> Result<()> {
        let mut notice = ObjectsChanged::new();
        {
            let mut data = self.data.write();
            Self::check_property_path(&data, prop)?;
            let existed = data.layers.has_opinion(prop);
            let layer = data.layers.edit_layer_mut();
            if layer.get(prop) == Some(&opinion) {
                return Ok(());
            }
            layer.set(prop.clone(), opinion);
            if existed {
                notice.add_changed_info(prop.clone());
            } else {
                notice.add_resynced(prop.clone());
            }
        }
        self.notify(notice);
        Ok(())
    }

    /// Resolved value of a property.
    pub fn get(&self, prop: &ScenePath) -> Option<Value> {
        self.data.read().layers.resolve(prop).cloned()
    }

    /// Set a property value at the edit target.
    pub fn set(&self, prop: &ScenePath, value: Value) -> Result<()> {
        self.author(prop, Opinion::Value(value))
    }

    /// Author a block at the edit target.
    pub fn block(&self, prop: &ScenePath) -> Result<()> {
        self.author(prop, Opinion::Block)
    }

    /// Remove the edit target's opinion. Returns true if one was removed.
    pub fn clear(&self, prop: &ScenePath) -> Result<bool> {
        let mut notice = ObjectsChanged::new();
        {
            let mut data = self.data.write();
            Self::check_property_path(&data, prop)?;
            if !data.layers.edit_layer_mut().clear(prop) {
                return Ok(false);
            }
            if data.layers.has_opinion(prop) {
                notice.add_changed_info(prop.clone());
            } else {
                notice.add_resynced(prop.clone());
            }
        }
        self.notify(notice);
        Ok(true)
    }

    /// Opinion authored for `prop` in a specific layer.
    pub fn authored_opinion(&self, layer: usize, prop: &ScenePath) -> Option<Opinion> {
        self.data.read().layers.layer(layer)?.get(prop).cloned()
    }

    /// Strongest opinion across layers, with its layer index.
    pub fn strongest_opinion(&self, prop: &ScenePath) -> Option<(usize, Opinion)> {
        self.data
            .read()
            .layers
            .strongest_opinion(prop)
            .map(|(i, op)| (i, op.clone()))
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Add a layer weaker than all existing ones. Returns its index.
    pub fn add_layer(&self, name: &str) -> usize {
        self.data.write().layers.push_weaker(Layer::new(name))
    }

    pub fn layer_count(&self) -> usize {
        self.data.read().layers.len()
    }

    pub fn layer_names(&self) -> Vec<String> {
        self.data
            .read()
            .layers
            .layers()
            .iter()
            .map(|l| l.name.clone())
            .collect()
    }

    pub fn edit_target(&self) -> usize {
        self.data.read().layers.edit_target()
    }

    pub fn set_edit_target(&self, index: usize) -> Result<()> {
        self.data.write().layers.set_edit_target(index)
    }

    /// Copy of every layer, strongest first.
    pub fn layers_snapshot(&self) -> Vec<Layer> {
        self.data.read().layers.layers().to_vec()
    }

    /// Every prim path (pseudo-root excluded) with its active flag, pre-order.
    pub fn prims_snapshot(&self) -> Vec<(ScenePath, bool)> {
        let data = self.data.read();
        data.walk(false)
            .into_iter()
            .map(|path| {
                let active = data.lookup(&path).map_or(true, |e| e.active);
                (path, active)
            })
            .collect()
    }

    // ========================================================================
    // Notices
    // ========================================================================

    /// Register for objects-changed notices. The registration is dropped
    /// with the returned handle.
    pub fn subscribe_objects_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ObjectsChanged) -> Listen + Send + Sync + 'static,
    {
        self.objects_changed.subscribe(callback)
    }

    pub fn objects_changed_subscriber_count(&self) -> usize {
        self.objects_changed.subscriber_count()
    }
}

impl SceneHierarchy for Stage {
    fn is_valid_path(&self, path: &ScenePath) -> bool {
        self.has_prim(path)
    }

    fn traverse(&self) -> Vec<ScenePath> {
        self.data.read().walk(true)
    }

    fn traverse_all(&self) -> Vec<ScenePath> {
        self.data.read().walk(false)
    }

    fn property_names(&self, prim: &ScenePath) -> Vec<String> {
        let data = self.data.read();
        if !data.index.contains_key(prim) {
            return Vec::new();
        }
        data.layers.property_names(prim)
    }
}

/// Non-owning handle to a prim on a stage.
///
/// A handle goes invalid when its stage is dropped or its prim is removed;
/// re-defining a prim at the same path does not revive old handles.
#[derive(Clone, Debug)]
pub struct Prim {
    stage: Weak<Stage>,
    path: ScenePath,
    id: PrimId,
}

impl Prim {
    #[inline]
    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn id(&self) -> PrimId {
        self.id
    }

    /// The owning stage, if it is still alive.
    pub fn stage(&self) -> Option<Arc<Stage>> {
        self.stage.upgrade()
    }

    /// Check that the stage is alive and the prim was not removed.
    pub fn is_valid(&self) -> bool {
        self.stage.upgrade().map_or(false, |s| s.is_live(self.id))
    }
}

impl PartialEq for Prim {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.stage, &other.stage)
    }
}

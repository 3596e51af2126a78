//! Handle-based scene arena: objects, their hierarchy, and curve objects.
//!
//! Every reference between objects is a [`NodeId`] or [`CurveId`] resolved
//! through the [`Scene`]; there are no owning pointers between nodes.

use std::collections::{BTreeMap, BTreeSet};

mod curve;
mod node;

pub use curve::{CurveEntry, CurveId};
pub use node::{CarParts, NodeId, SceneNode};

use crate::geom::{SplineCurve, Transform, Vec3};
use crate::train::{CarOverride, TrainConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("{0} does not exist in the scene")]
    UnknownNode(NodeId),
    #[error("{0} does not exist in the scene")]
    UnknownCurve(CurveId),
    #[error("scene is limited to {limit} nodes")]
    CapacityExceeded { limit: usize },
    #[error("cannot insert {child} under {parent}: it would create a cycle")]
    InvalidHierarchy { parent: NodeId, child: NodeId },
}

/// Scene container with id-indexed storage.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
    curves: BTreeMap<CurveId, CurveEntry>,
    dirty: BTreeSet<NodeId>,
    next_node: usize,
    next_curve: usize,
    node_limit: Option<usize>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A scene that refuses to hold more than `limit` nodes.
    #[must_use]
    pub fn with_node_limit(limit: usize) -> Self {
        Self {
            node_limit: Some(limit),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Allocate a new top-level node.
    pub fn add_node(&mut self, name: impl Into<String>) -> Result<NodeId, SceneError> {
        if let Some(limit) = self.node_limit {
            if self.nodes.len() >= limit {
                return Err(SceneError::CapacityExceeded { limit });
            }
        }

        let id = NodeId::new(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, SceneNode::new(id, name));
        self.roots.push(id);
        Ok(id)
    }

    /// Remove a node together with its subtree.
    pub fn release_node(&mut self, id: NodeId) -> Option<SceneNode> {
        let node = self.nodes.remove(&id)?;
        self.detach(id, node.parent);
        self.dirty.remove(&id);
        for child in &node.children {
            self.release_subtree(*child);
        }
        Some(node)
    }

    fn release_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            self.dirty.remove(&id);
            for child in node.children {
                self.release_subtree(child);
            }
        }
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if !self.nodes.contains_key(&parent) {
            return Err(SceneError::UnknownNode(parent));
        }
        let old_parent = self
            .nodes
            .get(&child)
            .map(|node| node.parent)
            .ok_or(SceneError::UnknownNode(child))?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::InvalidHierarchy { parent, child });
        }

        self.detach(child, old_parent);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId, parent: Option<NodeId>) {
        match parent {
            Some(parent) => {
                if let Some(node) = self.nodes.get_mut(&parent) {
                    node.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == candidate {
                return true;
            }
            match self.nodes.get(&id).and_then(|node| node.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// First node with the given name, in id order.
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| node.name == name)
            .map(|node| node.id)
    }

    /// Ordered children of `id`; empty for unknown nodes.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map_or(&[], |node| node.children())
    }

    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|node| node.name.as_str())
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::UnknownNode(id))?;
        node.name = name.into();
        Ok(())
    }

    #[must_use]
    pub fn world_transform(&self, id: NodeId) -> Option<Transform> {
        self.nodes.get(&id).map(SceneNode::world_transform)
    }

    pub fn set_world_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::UnknownNode(id))?;
        node.set_world_transform(transform);
        Ok(())
    }

    #[must_use]
    pub fn local_scale(&self, id: NodeId) -> Option<Vec3> {
        self.nodes.get(&id).map(SceneNode::scale)
    }

    pub fn set_local_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::UnknownNode(id))?;
        node.set_scale(scale);
        Ok(())
    }

    /// Resolve the Main, WheelA and WheelB parts of a car by child position.
    /// Returns `None` when the car has fewer than three children.
    #[must_use]
    pub fn car_parts(&self, car: NodeId) -> Option<CarParts> {
        match self.children(car) {
            [main, wheel_a, wheel_b, ..] => Some(CarParts {
                main: *main,
                wheel_a: *wheel_a,
                wheel_b: *wheel_b,
            }),
            _ => None,
        }
    }

    /// Nodes carrying train settings, in id order.
    pub fn trains(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.values().filter(|node| node.train.is_some()).map(|node| node.id)
    }

    #[must_use]
    pub fn train_config(&self, id: NodeId) -> Option<&TrainConfig> {
        self.nodes.get(&id).and_then(|node| node.train.as_ref())
    }

    pub fn train_config_mut(&mut self, id: NodeId) -> Option<&mut TrainConfig> {
        self.nodes.get_mut(&id).and_then(|node| node.train.as_mut())
    }

    pub fn set_train_config(&mut self, id: NodeId, config: TrainConfig) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::UnknownNode(id))?;
        node.train = Some(config);
        self.dirty.insert(id);
        Ok(())
    }

    #[must_use]
    pub fn car_override(&self, id: NodeId) -> Option<&CarOverride> {
        self.nodes.get(&id).and_then(|node| node.car.as_ref())
    }

    pub fn car_override_mut(&mut self, id: NodeId) -> Option<&mut CarOverride> {
        self.nodes.get_mut(&id).and_then(|node| node.car.as_mut())
    }

    pub fn attach_car_override(&mut self, id: NodeId, car: CarOverride) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::UnknownNode(id))?;
        node.car = Some(car);
        Ok(())
    }

    /// Flag `id` as needing re-evaluation.
    pub fn mark_dirty(&mut self, id: NodeId) {
        if self.nodes.contains_key(&id) {
            self.dirty.insert(id);
        }
    }

    #[must_use]
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.dirty.contains(&id)
    }

    pub fn clear_dirty(&mut self, id: NodeId) {
        self.dirty.remove(&id);
    }

    pub fn add_curve(&mut self, entry: CurveEntry) -> CurveId {
        let id = CurveId::new(self.next_curve);
        self.next_curve += 1;
        self.curves.insert(id, entry);
        id
    }

    pub fn add_spline(&mut self, name: impl Into<String>, curve: SplineCurve) -> CurveId {
        self.add_curve(CurveEntry::Spline {
            name: name.into(),
            curve,
        })
    }

    pub fn add_generator(&mut self, name: impl Into<String>, target: CurveId) -> CurveId {
        self.add_curve(CurveEntry::Generator {
            name: name.into(),
            target,
        })
    }

    #[must_use]
    pub fn curve(&self, id: CurveId) -> Option<&CurveEntry> {
        self.curves.get(&id)
    }

    pub fn curve_mut(&mut self, id: CurveId) -> Option<&mut CurveEntry> {
        self.curves.get_mut(&id)
    }

    pub fn curves(&self) -> impl Iterator<Item = (CurveId, &CurveEntry)> {
        self.curves.iter().map(|(id, entry)| (*id, entry))
    }

    #[must_use]
    pub fn find_curve(&self, name: &str) -> Option<CurveId> {
        self.curves
            .iter()
            .find(|(_, entry)| entry.name() == name)
            .map(|(id, _)| *id)
    }

    /// The effective spline behind a curve object.
    ///
    /// A generator resolves to its target, one level deep; a generator whose
    /// target is itself a generator does not resolve.
    #[must_use]
    pub fn resolve_curve(&self, id: CurveId) -> Option<&SplineCurve> {
        match self.curves.get(&id)? {
            CurveEntry::Spline { curve, .. } => Some(curve),
            CurveEntry::Generator { target, .. } => self.curves.get(target)?.as_spline(),
        }
    }
}

//! Nodes of the scene arena.

use std::fmt;

use crate::geom::{Transform, Vec3};
use crate::train::{CarOverride, TrainConfig};

/// Identifier for a node within the scene.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
pub struct NodeId(pub usize);

impl NodeId {
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

/// A scene object: a named rigid frame with a separate local scale.
///
/// The frame always has unit axes. Writing a world transform moves any scale
/// carried by its axes into [`SceneNode::scale`], so writing an orthonormal
/// matrix resets the node's scale to one.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) frame: Transform,
    pub(crate) scale: Vec3,
    /// Train settings when this node is a train root.
    pub train: Option<TrainConfig>,
    /// Per-car attribute override when this node is a car.
    pub car: Option<CarOverride>,
}

impl SceneNode {
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            frame: Transform::identity(),
            scale: Vec3::ONE,
            train: None,
            car: None,
        }
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// World transform including the node's scale.
    #[must_use]
    pub fn world_transform(&self) -> Transform {
        self.frame.with_axis_lengths(self.scale)
    }

    pub fn set_world_transform(&mut self, transform: Transform) {
        self.scale = transform.axis_lengths();
        self.frame = transform.with_axis_lengths(Vec3::ONE);
    }

    #[must_use]
    pub const fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }
}

/// Typed view of the three parts every car carries, in their fixed order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CarParts {
    pub main: NodeId,
    pub wheel_a: NodeId,
    pub wheel_b: NodeId,
}

impl CarParts {
    #[must_use]
    pub const fn as_array(self) -> [NodeId; 3] {
        [self.main, self.wheel_a, self.wheel_b]
    }
}

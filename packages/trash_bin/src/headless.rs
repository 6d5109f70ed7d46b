use std::fmt::{self, Debug, Display};
use std::sync::{Mutex, MutexGuard};

use foldhash::{HashMap, HashMapExt};

use crate::constants::ERR_POISONED_LOCK;
use crate::{InstanceId, Quat, Scene, Space, Vec3};

/// Identifies a node of a [`HeadlessScene`]. Objects and roots are both nodes.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(u64);

impl From<InstanceId> for NodeId {
    fn from(value: InstanceId) -> Self {
        Self(value.get())
    }
}

impl From<NodeId> for InstanceId {
    fn from(value: NodeId) -> Self {
        Self::new(value.0)
    }
}

impl Display for NodeId {
    #[cfg_attr(test, mutants::skip)] // Formatting only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// An in-memory scene graph without any rendering.
///
/// Every instantiated object and every root is a node with a name, an optional parent, an
/// active flag and a pose relative to its parent. World poses are composed through the parent
/// chain. Reparenting keeps the world pose of the reparented node.
///
/// Prefabs are plain strings that become the name of the instantiated node.
///
/// Useful wherever pooled objects need no visual representation, such as simulations, servers
/// and tests.
///
/// # Example
///
/// ```rust
/// use trash_bin::{HeadlessScene, Scene, Space, Vec3};
///
/// let scene = HeadlessScene::new();
/// let root = scene.create_root("world", None);
///
/// let cube = scene.instantiate(&"cube".to_string(), Some(&root));
/// scene.set_position(&cube, Vec3::new(1.0, 2.0, 3.0), Space::World);
///
/// assert_eq!(scene.parent(cube), Some(root));
/// assert_eq!(scene.world_position(cube), Some(Vec3::new(1.0, 2.0, 3.0)));
/// ```
pub struct HeadlessScene {
    graph: Mutex<Graph>,
}

#[derive(Debug, Default)]
struct Graph {
    next_id: u64,
    nodes: HashMap<NodeId, Node>,
    instantiated: usize,
    activation_changes: u64,
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    active: bool,
    position: Vec3,
    rotation: Quat,
}

impl Graph {
    fn add(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .expect("a scene cannot hold more than u64::MAX nodes");

        // A parent that does not exist is treated as no parent.
        let parent = parent.filter(|parent| self.nodes.contains_key(parent));

        self.nodes.insert(
            id,
            Node {
                name: name.to_string(),
                parent,
                active: true,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
            },
        );

        id
    }

    fn world_pose(&self, id: NodeId) -> Option<(Vec3, Quat)> {
        let mut chain = Vec::new();
        let mut current = Some(id);

        while let Some(node_id) = current {
            let node = self.nodes.get(&node_id)?;
            chain.push(node);
            current = node.parent;
        }

        let mut position = Vec3::ZERO;
        let mut rotation = Quat::IDENTITY;

        for node in chain.iter().rev() {
            position = position + rotation.mul_vec3(node.position);
            rotation = rotation * node.rotation;
        }

        Some((position, rotation))
    }

    fn parent_pose(&self, id: NodeId) -> (Vec3, Quat) {
        self.nodes
            .get(&id)
            .and_then(|node| node.parent)
            .and_then(|parent| self.world_pose(parent))
            .unwrap_or((Vec3::ZERO, Quat::IDENTITY))
    }

    /// Whether `ancestor` is `id` or appears anywhere in the parent chain of `id`.
    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);

        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }

            current = self.nodes.get(&node_id).and_then(|node| node.parent);
        }

        false
    }
}

impl HeadlessScene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Mutex::new(Graph::default()),
        }
    }

    /// The number of nodes in the scene, objects and roots alike.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    /// The number of objects created through [`Scene::instantiate()`].
    #[must_use]
    pub fn instantiated_count(&self) -> usize {
        self.lock().instantiated
    }

    /// The number of times the active flag of any node was changed.
    #[must_use]
    pub fn activation_changes(&self) -> u64 {
        self.lock().activation_changes
    }

    /// The name of a node.
    #[must_use]
    pub fn name(&self, node: NodeId) -> Option<String> {
        self.lock().nodes.get(&node).map(|node| node.name.clone())
    }

    /// The parent of a node. `None` if the node has no parent or does not exist.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.lock().nodes.get(&node).and_then(|node| node.parent)
    }

    /// The direct children of a node, in ascending id order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let graph = self.lock();

        let mut children = graph
            .nodes
            .iter()
            .filter(|(_, candidate)| candidate.parent == Some(node))
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();

        children.sort_unstable();
        children
    }

    /// Whether a node is shown. `None` if the node does not exist.
    #[must_use]
    pub fn is_active(&self, node: NodeId) -> Option<bool> {
        self.lock().nodes.get(&node).map(|node| node.active)
    }

    /// The position of a node relative to its parent.
    #[must_use]
    pub fn local_position(&self, node: NodeId) -> Option<Vec3> {
        self.lock().nodes.get(&node).map(|node| node.position)
    }

    /// The rotation of a node relative to its parent.
    #[must_use]
    pub fn local_rotation(&self, node: NodeId) -> Option<Quat> {
        self.lock().nodes.get(&node).map(|node| node.rotation)
    }

    /// The position of a node relative to the scene origin.
    #[must_use]
    pub fn world_position(&self, node: NodeId) -> Option<Vec3> {
        self.lock().world_pose(node).map(|(position, _)| position)
    }

    /// The rotation of a node relative to the scene.
    #[must_use]
    pub fn world_rotation(&self, node: NodeId) -> Option<Quat> {
        self.lock().world_pose(node).map(|(_, rotation)| rotation)
    }

    fn lock(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().expect(ERR_POISONED_LOCK)
    }
}

impl Default for HeadlessScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for HeadlessScene {
    #[cfg_attr(test, mutants::skip)] // Formatting only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.lock();

        f.debug_struct("HeadlessScene")
            .field("nodes", &graph.nodes.len())
            .field("instantiated", &graph.instantiated)
            .finish()
    }
}

impl Scene for HeadlessScene {
    type Prefab = String;
    type Object = NodeId;
    type Transform = NodeId;

    fn instantiate(&self, prefab: &String, parent: Option<&NodeId>) -> NodeId {
        let mut graph = self.lock();

        graph.instantiated = graph.instantiated.saturating_add(1);
        graph.add(prefab, parent.copied())
    }

    fn instance_id(&self, object: &NodeId) -> InstanceId {
        InstanceId::from(*object)
    }

    fn create_root(&self, name: &str, parent: Option<&NodeId>) -> NodeId {
        self.lock().add(name, parent.copied())
    }

    fn set_active(&self, object: &NodeId, active: bool) {
        let mut guard = self.lock();
        let graph = &mut *guard;

        if let Some(node) = graph.nodes.get_mut(object) {
            node.active = active;
            graph.activation_changes = graph.activation_changes.saturating_add(1);
        }
    }

    fn set_parent(&self, object: &NodeId, parent: Option<&NodeId>) {
        let mut graph = self.lock();

        let Some((world_position, world_rotation)) = graph.world_pose(*object) else {
            return;
        };

        let parent = parent.copied().filter(|parent| {
            graph.nodes.contains_key(parent) && !graph.is_ancestor_or_self(*object, *parent)
        });

        let (parent_position, parent_rotation) = parent
            .and_then(|parent| graph.world_pose(parent))
            .unwrap_or((Vec3::ZERO, Quat::IDENTITY));

        let inverse = parent_rotation.inverse();

        if let Some(node) = graph.nodes.get_mut(object) {
            node.parent = parent;
            node.position = inverse.mul_vec3(world_position - parent_position);
            node.rotation = inverse * world_rotation;
        }
    }

    fn set_position(&self, object: &NodeId, position: Vec3, space: Space) {
        let mut graph = self.lock();

        let local = match space {
            Space::Local => position,
            Space::World => {
                let (parent_position, parent_rotation) = graph.parent_pose(*object);
                parent_rotation
                    .inverse()
                    .mul_vec3(position - parent_position)
            }
        };

        if let Some(node) = graph.nodes.get_mut(object) {
            node.position = local;
        }
    }

    fn set_rotation(&self, object: &NodeId, rotation: Quat, space: Space) {
        let mut graph = self.lock();

        let local = match space {
            Space::Local => rotation,
            Space::World => {
                let (_, parent_rotation) = graph.parent_pose(*object);
                parent_rotation.inverse() * rotation
            }
        };

        if let Some(node) = graph.nodes.get_mut(object) {
            node.rotation = local;
        }
    }
}

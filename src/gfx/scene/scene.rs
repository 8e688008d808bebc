use std::collections::HashMap;
use std::path::Path;

use cgmath::{Quaternion, Vector3};

use super::id_allocator::{IdAllocator, NodeId};
use super::node::{Node, NodeKind};
use super::SceneError;

/// Owns every node of one tree.
///
/// Nodes reachable from [`Scene::root`] are the scene proper. Removing a child
/// leaves it in the arena as an orphan root so it can be re-attached.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    ids: IdAllocator,
}

impl Scene {
    /// Creates a scene with an empty root node.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self::with_root(Node::empty(root_name))
    }

    /// Creates a scene whose root is `root`. The root keeps its requested id.
    pub fn with_root(mut root: Node) -> Self {
        let mut ids = IdAllocator::new();
        root.id = ids.claim(root.id);
        root.parent = None;
        root.children.clear();
        let root_id = root.id;

        let mut scene = Self {
            nodes: HashMap::from([(root_id, root)]),
            root: root_id,
            ids,
        };
        scene.propagate_world(root_id);
        scene.refresh_camera_projection(root_id);
        scene
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[&self.root]
    }

    /// Any node in the arena, attached or not.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable access for name and payload edits. Use the scene's TRS setters
    /// to move a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes in the arena, orphans included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn id_allocator(&self) -> &IdAllocator {
        &self.ids
    }

    /// Adds `node` to the arena, optionally attached under `parent`.
    ///
    /// The node's id is claimed from the allocator; a taken id is replaced by a
    /// fresh one, so always use the returned id. Any child links the node
    /// carried are dropped.
    pub fn insert(&mut self, mut node: Node, parent: Option<NodeId>) -> Result<NodeId, SceneError> {
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(SceneError::NodeNotFound(parent));
            }
        }

        let requested = node.id;
        node.id = self.ids.claim(requested);
        if node.id != requested {
            log::debug!("Node id {} already in use, assigned {}", requested, node.id);
        }
        node.parent = None;
        node.children.clear();
        let id = node.id;
        self.nodes.insert(id, node);

        match parent {
            Some(parent) => self.set_parent(id, Some(parent))?,
            None => self.propagate_world(id),
        }
        self.refresh_camera_projection(id);
        Ok(id)
    }

    /// Shorthand for inserting an empty node under `parent`.
    pub fn create_node(&mut self, name: impl Into<String>, parent: NodeId) -> Result<NodeId, SceneError> {
        self.insert(Node::empty(name), Some(parent))
    }

    /// Moves `id` under `parent`, or detaches it when `parent` is `None`.
    ///
    /// The node's local transform is kept, so its world matrix changes with
    /// the new parent. Reparenting onto itself or a descendant fails.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        if !self.contains(id) {
            return Err(SceneError::NodeNotFound(id));
        }
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(SceneError::NodeNotFound(parent));
            }
            if id == self.root {
                return Err(SceneError::RootOperation("reparented"));
            }
            if self.is_ancestor_or_self(id, parent) {
                return Err(SceneError::Cycle { node: id, parent });
            }
        }

        self.detach(id);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.push(id);
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.parent = Some(parent);
            }
        }
        self.propagate_world(id);
        Ok(())
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.set_parent(child, Some(parent))
    }

    /// Detaches `child` from `parent`. The child stays in the arena as an
    /// orphan whose world matrix equals its local matrix. Returns `false` when
    /// `child` was not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, SceneError> {
        let node = self.nodes.get(&child).ok_or(SceneError::NodeNotFound(child))?;
        if node.parent != Some(parent) {
            return Ok(false);
        }
        self.set_parent(child, None)?;
        Ok(true)
    }

    /// Removes `id` and all its descendants from the arena and releases their
    /// ids. Returns the number of removed nodes.
    pub fn delete_subtree(&mut self, id: NodeId) -> Result<usize, SceneError> {
        if id == self.root {
            return Err(SceneError::RootOperation("deleted"));
        }
        if !self.contains(id) {
            return Err(SceneError::NodeNotFound(id));
        }

        self.detach(id);
        let doomed = self.subtree_ids(id);
        for node_id in &doomed {
            self.nodes.remove(node_id);
            self.ids.release(*node_id);
        }
        Ok(doomed.len())
    }

    pub fn set_translation(&mut self, id: NodeId, translation: Vector3<f32>) -> Result<(), SceneError> {
        self.modify(id, |node| node.set_translation(translation))
    }

    /// Euler rotation in degrees.
    pub fn set_rotation(&mut self, id: NodeId, rotation: Vector3<f32>) -> Result<(), SceneError> {
        self.modify(id, |node| node.set_rotation(rotation))
    }

    pub fn set_quaternion(&mut self, id: NodeId, quaternion: Quaternion<f32>) -> Result<(), SceneError> {
        self.modify(id, |node| node.set_quaternion(quaternion))
    }

    pub fn set_scale(&mut self, id: NodeId, scale: Vector3<f32>) -> Result<(), SceneError> {
        self.modify(id, |node| node.set_scale(scale))
    }

    /// Sets translation, rotation (degrees) and scale with a single world
    /// update.
    pub fn set_transform(
        &mut self,
        id: NodeId,
        translation: Vector3<f32>,
        rotation: Vector3<f32>,
        scale: Vector3<f32>,
    ) -> Result<(), SceneError> {
        self.modify(id, |node| {
            node.set_translation(translation);
            node.set_rotation(rotation);
            node.set_scale(scale);
        })
    }

    fn modify(&mut self, id: NodeId, f: impl FnOnce(&mut Node)) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))?;
        f(node);
        self.propagate_world(id);
        Ok(())
    }

    /// Recomputes world matrices of `id` and its subtree, parents first.
    fn propagate_world(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let parent_world = self
                .nodes
                .get(&current)
                .and_then(|n| n.parent)
                .and_then(|p| self.nodes.get(&p))
                .map(|p| p.world_matrix);

            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };
            node.world_matrix = match parent_world {
                Some(parent_world) => parent_world * node.local_matrix(),
                None => *node.local_matrix(),
            };

            let world = node.world_matrix;
            let rotation = node.rotation();
            if let NodeKind::Camera(camera) = &mut node.kind {
                camera.update_view(&world, rotation);
            }
            stack.extend(node.children.iter().rev().copied());
        }
    }

    fn refresh_camera_projection(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            let rotation = node.rotation();
            if let NodeKind::Camera(camera) = &mut node.kind {
                camera.update_projection(rotation);
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        let old_parent = self.nodes.get_mut(&id).and_then(|n| n.parent.take());
        if let Some(old_parent) = old_parent {
            if let Some(p) = self.nodes.get_mut(&old_parent) {
                p.children.retain(|c| *c != id);
            }
        }
    }

    /// True when `ancestor` is `node` or lies on the path from `node` up to
    /// its root.
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Pre-order ids of the subtree rooted at `id`.
    pub fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Pre-order ids of every node attached to the root.
    pub fn node_ids_depth_first(&self) -> Vec<NodeId> {
        self.subtree_ids(self.root)
    }

    /// Visits every attached node in pre-order.
    pub fn traverse(&self, f: impl FnMut(&Node)) {
        self.traverse_from(self.root, f);
    }

    pub fn traverse_from(&self, id: NodeId, mut f: impl FnMut(&Node)) {
        for node_id in self.subtree_ids(id) {
            if let Some(node) = self.nodes.get(&node_id) {
                f(node);
            }
        }
    }

    /// Finds an attached node by id. Orphans in the arena are not found.
    pub fn find_node_by_id(&self, id: NodeId) -> Option<NodeId> {
        let found = self.node_ids_depth_first().into_iter().find(|n| *n == id);
        if found.is_none() {
            log::debug!("No node with id {} in scene", id);
        }
        found
    }

    /// First attached node named `name` in pre-order.
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        let found = self
            .node_ids_depth_first()
            .into_iter()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.name == name));
        if found.is_none() {
            log::debug!("No node named `{}` in scene", name);
        }
        found
    }

    pub fn find_child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let parent = self.nodes.get(&parent)?;
        parent
            .children
            .iter()
            .copied()
            .find(|c| self.nodes.get(c).is_some_and(|n| n.name == name))
    }

    /// Resolves a `.`-separated path of child names below the root, e.g.
    /// `"Body.LeftArm"`. Misses are logged and yield `None`.
    pub fn get_node_from_path(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        for segment in path.split('.') {
            match self.find_child_by_name(current, segment) {
                Some(child) => current = child,
                None => {
                    log::warn!("Path `{}` has no node named `{}`", path, segment);
                    return None;
                }
            }
        }
        Some(current)
    }

    /// The camera the renderer draws with: the last camera in pre-order.
    pub fn get_camera(&self) -> Option<NodeId> {
        self.node_ids_depth_first()
            .into_iter()
            .filter(|id| self.nodes.get(id).is_some_and(|n| n.camera().is_some()))
            .last()
    }

    /// The light the renderer shades with: the last light in pre-order.
    pub fn get_light(&self) -> Option<NodeId> {
        self.node_ids_depth_first()
            .into_iter()
            .filter(|id| self.nodes.get(id).is_some_and(|n| n.light().is_some()))
            .last()
    }

    /// Copies the subtree at `id` into a standalone scene rooted at the copy.
    /// Ids are preserved; payloads are deep-copied except texture handles,
    /// which are shared.
    pub fn clone_subtree(&self, id: NodeId) -> Option<Scene> {
        let mut root = self.nodes.get(&id)?.clone();
        root.parent = None;

        let mut ids = IdAllocator::new();
        let mut nodes = HashMap::new();
        for node_id in self.subtree_ids(id) {
            let node = if node_id == id {
                root.clone()
            } else {
                self.nodes.get(&node_id)?.clone()
            };
            ids.claim(node_id);
            nodes.insert(node_id, node);
        }

        let mut scene = Scene { nodes, root: id, ids };
        scene.propagate_world(id);
        Some(scene)
    }

    /// Moves every node of `subtree` into this scene under `parent`. Ids
    /// that collide are re-issued and links are rewritten to match. Returns
    /// the new id of the grafted root.
    pub fn graft(&mut self, mut subtree: Scene, parent: NodeId) -> Result<NodeId, SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }

        let order = subtree.node_ids_depth_first();
        let mut remap = HashMap::with_capacity(order.len());
        for old in &order {
            remap.insert(*old, self.ids.claim(*old));
        }

        for old in &order {
            let Some(mut node) = subtree.nodes.remove(old) else {
                continue;
            };
            node.id = remap[old];
            node.parent = node.parent.and_then(|p| remap.get(&p).copied());
            node.children = node
                .children
                .iter()
                .filter_map(|c| remap.get(c).copied())
                .collect();
            self.nodes.insert(node.id, node);
        }

        let new_root = remap[&subtree.root];
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(new_root);
        }
        if let Some(node) = self.nodes.get_mut(&new_root) {
            node.parent = Some(parent);
        }
        self.propagate_world(new_root);
        for id in self.subtree_ids(new_root) {
            self.refresh_camera_projection(id);
        }
        Ok(new_root)
    }

    /// Deep-copies the subtree at `id` under `parent`, returning the copy's id.
    pub fn duplicate(&mut self, id: NodeId, parent: NodeId) -> Result<NodeId, SceneError> {
        let copy = self.clone_subtree(id).ok_or(SceneError::NodeNotFound(id))?;
        self.graft(copy, parent)
    }

    /// Copies `source`'s name and TRS onto `target`. Hierarchy, id and
    /// payload of `target` are untouched.
    pub fn replace_from(&mut self, target: NodeId, source: &Node) -> Result<(), SceneError> {
        let translation = source.translation();
        let rotation = source.rotation();
        let scale = source.scale();
        let name = source.name.clone();
        self.modify(target, |node| {
            node.name = name;
            node.set_translation(translation);
            node.set_rotation(rotation);
            node.set_scale(scale);
        })
    }

    /// Rebuilds the allocator from the arena so every live node id is marked
    /// used. Returns the number of registered ids.
    pub fn resolve_ids(&mut self) -> usize {
        self.ids.clear();
        for id in self.nodes.keys() {
            self.ids.claim(*id);
        }
        self.ids.len()
    }

    /// Writes the scene as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json = self.to_json_string()?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Saved scene to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Scene, SceneError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let scene = Scene::from_json_str(&json)?;
        log::info!(
            "Loaded scene with {} nodes from {}",
            scene.len(),
            path.as_ref().display()
        );
        Ok(scene)
    }
}

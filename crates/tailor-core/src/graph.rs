//! Scene graph
//!
//! An arena of nodes keyed by [`NodeId`]. Each node is either a group or a
//! mesh; meshes own their geometry and materials through [`Owned`] handles, so
//! removing a subtree disposes everything beneath it. Structural, transform,
//! and material changes are journaled for the renderer bridge to replay.

use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::geometry::{Aabb, Geometry};
use crate::material::{Material, MaterialSlot};
use crate::resource::Owned;
use crate::texture::TextureImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// What a mesh node is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Part of the imported model
    Asset,
    /// Text overlay created by the label compositor
    LabelSurface,
}

#[derive(Debug)]
pub struct MeshNode {
    pub geometry: Owned<Geometry>,
    pub materials: MaterialSlot,
}

#[derive(Debug)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub role: NodeRole,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }
}

/// One journaled graph mutation
#[derive(Debug, Clone, PartialEq)]
pub enum GraphChange {
    /// `node` (and its subtree) now hangs under `parent`
    Attached { node: NodeId, parent: NodeId },
    /// `root` left its parent; `nodes` is every node of the detached subtree
    Detached { root: NodeId, nodes: Vec<NodeId> },
    TransformChanged(NodeId),
    MaterialChanged { node: NodeId, index: usize },
}

pub struct SceneGraph {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    changes: Vec<GraphChange>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Graph with a single empty scene container
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: HashMap::new(),
            root: NodeId(0),
            next_id: 0,
            changes: Vec::new(),
        };
        graph.root = graph.insert("scene", Transform::IDENTITY, NodeRole::Asset, NodeKind::Group);
        graph
    }

    /// The top-level scene container
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn insert(&mut self, name: &str, transform: Transform, role: NodeRole, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                name: name.to_string(),
                transform,
                role,
                kind,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    /// New detached group node
    pub fn add_group(&mut self, name: &str, transform: Transform) -> NodeId {
        self.insert(name, transform, NodeRole::Asset, NodeKind::Group)
    }

    /// New detached mesh node
    pub fn add_mesh(&mut self, name: &str, transform: Transform, role: NodeRole, mesh: MeshNode) -> NodeId {
        self.insert(name, transform, role, NodeKind::Mesh(mesh))
    }

    /// Hang `child` under `parent`, moving it from any previous parent
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> bool {
        if child == parent
            || !self.contains(child)
            || !self.contains(parent)
            || self.is_ancestor(child, parent)
        {
            return false;
        }
        self.unlink(child);

        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        self.changes.push(GraphChange::Attached { node: child, parent });
        true
    }

    /// Take `node` out of its parent without destroying it
    pub fn detach(&mut self, node: NodeId) -> bool {
        if !self.unlink(node) {
            return false;
        }
        let nodes = self.descendants(node);
        self.changes.push(GraphChange::Detached { root: node, nodes });
        true
    }

    fn unlink(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes.get_mut(&node).and_then(|n| n.parent.take()) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
        }
        true
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.get(node).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Detach and destroy a subtree, disposing every geometry, material, and
    /// texture it owns. Returns the number of nodes removed.
    pub fn remove_subtree(&mut self, node: NodeId) -> usize {
        if !self.contains(node) || node == self.root {
            return 0;
        }
        self.detach(node);

        let doomed = self.descendants(node);
        for id in &doomed {
            // Dropping the node drops its Owned handles
            self.nodes.remove(id);
        }
        debug!("Removed subtree {} ({} nodes)", node, doomed.len());
        doomed.len()
    }

    /// Destroy everything under the scene container
    pub fn clear(&mut self) -> usize {
        let children = self.get(self.root).map(|r| r.children.clone()).unwrap_or_default();
        children.into_iter().map(|c| self.remove_subtree(c)).sum()
    }

    /// Pre-order walk starting at (and including) `start`
    pub fn walk(&self, start: NodeId, visit: &mut impl FnMut(NodeId, &Node)) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            visit(id, node);
            stack.extend(node.children.iter().rev());
        }
    }

    /// `start` and all nodes beneath it, in pre-order
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(start, &mut |id, _| out.push(id));
        out
    }

    /// Mesh nodes beneath `start` (inclusive) with the given role
    pub fn meshes(&self, start: NodeId, role: NodeRole) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(start, &mut |id, node| {
            if node.role == role && matches!(node.kind, NodeKind::Mesh(_)) {
                out.push(id);
            }
        });
        out
    }

    /// First node named exactly `name` in pre-order beneath `start`
    pub fn find_by_name(&self, start: NodeId, name: &str) -> Option<NodeId> {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let node = self.nodes.get(&id)?;
            if node.name == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Number of material instances held by meshes beneath `start`
    pub fn material_count(&self, start: NodeId) -> usize {
        let mut count = 0;
        self.walk(start, &mut |_, node| {
            if let NodeKind::Mesh(mesh) = &node.kind {
                count += mesh.materials.len();
            }
        });
        count
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        if node.transform != transform {
            node.transform = transform;
            self.changes.push(GraphChange::TransformChanged(id));
        }
        true
    }

    /// Model-to-world matrix of a node
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(&c)) {
            matrix = node.transform.to_matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// Bounds of the meshes under `start`, expressed in the frame of
    /// `start`'s parent (so `start`'s own transform is applied)
    pub fn local_bounds(&self, start: NodeId) -> Option<Aabb> {
        let Some(node) = self.get(start) else {
            return None;
        };
        let parent_inverse = match node.parent {
            Some(parent) => self.world_matrix(parent).inverse(),
            None => Mat4::IDENTITY,
        };

        let mut bounds: Option<Aabb> = None;
        self.walk(start, &mut |id, node| {
            let NodeKind::Mesh(mesh) = &node.kind else {
                return;
            };
            let Some(local) = mesh.geometry.bounds() else {
                return;
            };
            let b = local.transformed(&(parent_inverse * self.world_matrix(id)));
            bounds = Some(match bounds {
                Some(acc) => acc.union(b),
                None => b,
            });
        });
        bounds
    }

    /// Bounds of the meshes under `start` in world space
    pub fn world_bounds(&self, start: NodeId) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        self.walk(start, &mut |id, node| {
            if let Some(local) = node.mesh().and_then(|m| m.geometry.bounds()) {
                let b = local.transformed(&self.world_matrix(id));
                bounds = Some(bounds.map_or(b, |acc| acc.union(b)));
            }
        });
        bounds
    }

    pub fn material(&self, id: NodeId, index: usize) -> Option<&Owned<Material>> {
        self.get(id)?.mesh()?.materials.get(index)
    }

    /// Swap in a new material and hand back the one it replaced. The caller
    /// drops the returned handle, which disposes it after the swap.
    pub fn replace_material(
        &mut self,
        id: NodeId,
        index: usize,
        material: Owned<Material>,
    ) -> Result<Owned<Material>, Owned<Material>> {
        let slot = match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Mesh(mesh)) => mesh.materials.get_mut(index),
            _ => None,
        };
        let Some(slot) = slot else {
            return Err(material);
        };
        let previous = std::mem::replace(slot, material);
        self.changes.push(GraphChange::MaterialChanged { node: id, index });
        Ok(previous)
    }

    /// Rebind the texture map of a material in place, returning the old map
    pub fn replace_material_map(
        &mut self,
        id: NodeId,
        index: usize,
        map: Owned<TextureImage>,
    ) -> Result<Option<Owned<TextureImage>>, Owned<TextureImage>> {
        let slot = match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Mesh(mesh)) => mesh.materials.get_mut(index),
            _ => None,
        };
        let Some(slot) = slot else {
            return Err(map);
        };
        let previous = slot.map.replace(map);
        self.changes.push(GraphChange::MaterialChanged { node: id, index });
        Ok(previous)
    }

    /// Journaled changes since the last drain, in order
    pub fn drain_changes(&mut self) -> Vec<GraphChange> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::resource::ResourceLedger;

    fn cube(graph: &mut SceneGraph, ledger: &ResourceLedger, name: &str, at: Vec3) -> NodeId {
        graph.add_mesh(
            name,
            Transform::from_translation(at),
            NodeRole::Asset,
            MeshNode {
                geometry: ledger.acquire(Geometry::cuboid(Vec3::ONE)),
                materials: MaterialSlot::Single(ledger.acquire(Material::standard(Rgb::WHITE))),
            },
        )
    }

    #[test]
    fn test_find_by_name_is_preorder() {
        let ledger = ResourceLedger::new();
        let mut graph = SceneGraph::new();
        let model = graph.add_group("model", Transform::IDENTITY);
        let a = graph.add_group("a", Transform::IDENTITY);
        let deep = cube(&mut graph, &ledger, "target", Vec3::ZERO);
        let shallow = cube(&mut graph, &ledger, "target", Vec3::X);
        graph.attach(a, model);
        graph.attach(deep, a);
        graph.attach(shallow, model);

        assert_eq!(graph.find_by_name(model, "target"), Some(deep));
        assert_eq!(graph.find_by_name(model, "missing"), None);
        assert_eq!(graph.descendants(model), vec![model, a, deep, shallow]);
    }

    #[test]
    fn test_remove_subtree_disposes_resources() {
        let ledger = ResourceLedger::new();
        let mut graph = SceneGraph::new();
        let model = graph.add_group("model", Transform::IDENTITY);
        for i in 0..3 {
            let mesh = cube(&mut graph, &ledger, &format!("m{i}"), Vec3::ZERO);
            graph.attach(mesh, model);
        }
        graph.attach(model, graph.root());
        assert_eq!(graph.material_count(model), 3);
        assert_eq!(ledger.stats().live_geometries, 3);

        assert_eq!(graph.remove_subtree(model), 4);
        let stats = ledger.stats();
        assert_eq!(stats.live_geometries, 0);
        assert_eq!(stats.live_materials, 0);
        assert!(graph.get(graph.root()).unwrap().children().is_empty());

        let released = stats.total_released;
        assert_eq!(graph.remove_subtree(model), 0);
        assert_eq!(ledger.stats().total_released, released);
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut graph = SceneGraph::new();
        let a = graph.add_group("a", Transform::IDENTITY);
        let b = graph.add_group("b", Transform::IDENTITY);
        assert!(graph.attach(b, a));
        assert!(!graph.attach(a, b));
        assert!(!graph.attach(a, a));
    }

    #[test]
    fn test_bounds_follow_transforms() {
        let ledger = ResourceLedger::new();
        let mut graph = SceneGraph::new();
        let model = graph.add_group(
            "model",
            Transform {
                scale: Vec3::splat(2.0),
                ..Transform::IDENTITY
            },
        );
        let mesh = cube(&mut graph, &ledger, "m", Vec3::new(10.0, 0.0, 0.0));
        graph.attach(mesh, model);

        let local = graph.local_bounds(model).unwrap();
        assert_eq!(local.center(), Vec3::new(20.0, 0.0, 0.0));
        assert_eq!(local.max_dimension(), 2.0);

        graph.attach(model, graph.root());
        graph.set_transform(graph.root(), Transform::from_translation(Vec3::Y));
        let world = graph.world_bounds(model).unwrap();
        assert_eq!(world.center(), Vec3::new(20.0, 1.0, 0.0));
        assert_eq!(graph.local_bounds(model).unwrap().center(), Vec3::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn test_replace_material_returns_previous() {
        let ledger = ResourceLedger::new();
        let mut graph = SceneGraph::new();
        let mesh = cube(&mut graph, &ledger, "m", Vec3::ZERO);
        let before = graph.material(mesh, 0).unwrap().id();

        let old = graph
            .replace_material(mesh, 0, ledger.acquire(Material::standard(Rgb::BLACK)))
            .unwrap();
        assert_eq!(old.id(), before);
        assert_eq!(ledger.stats().live_materials, 2);
        drop(old);
        assert_eq!(ledger.stats().live_materials, 1);

        let rejected = graph.replace_material(mesh, 3, ledger.acquire(Material::standard(Rgb::WHITE)));
        assert!(rejected.is_err());
    }

    #[test]
    fn test_change_journal() {
        let mut graph = SceneGraph::new();
        let a = graph.add_group("a", Transform::IDENTITY);
        let b = graph.add_group("b", Transform::IDENTITY);
        graph.attach(b, a);
        graph.attach(a, graph.root());
        graph.set_transform(a, Transform::from_translation(Vec3::X));
        graph.set_transform(a, Transform::from_translation(Vec3::X));
        graph.remove_subtree(a);

        let root = graph.root();
        assert_eq!(
            graph.drain_changes(),
            vec![
                GraphChange::Attached { node: b, parent: a },
                GraphChange::Attached { node: a, parent: root },
                GraphChange::TransformChanged(a),
                GraphChange::Detached { root: a, nodes: vec![a, b] },
            ]
        );
        assert!(graph.drain_changes().is_empty());
    }
}

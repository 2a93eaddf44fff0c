//! Mirror of the core scene graph as Bevy entities
//!
//! The core journals every structural, transform and material change; this
//! module replays that journal once per frame. Asset handles are keyed by the
//! core resource id and dropped when the ledger reports the resource released,
//! so Bevy frees GPU memory in step with the core's ownership.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use tailor_core::graph::{GraphChange, MeshNode, NodeId, SceneGraph};
use tailor_core::material::{Material, MaterialSlot};
use tailor_core::resource::{Owned, Released, ResourceId, ResourceKind};
use tailor_core::texture::TextureImage;

use crate::convert;
use crate::session::CustomizerSession;

/// Links an entity to the core node it mirrors
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirroredNode(pub NodeId);

/// Draws one material slot entry of a multi-material mesh
#[derive(Component, Debug, Clone, Copy)]
pub struct MaterialPart {
    pub node: NodeId,
    pub index: usize,
}

#[derive(SystemParam)]
pub struct MirrorAssets<'w> {
    pub meshes: ResMut<'w, Assets<Mesh>>,
    pub materials: ResMut<'w, Assets<StandardMaterial>>,
    pub images: ResMut<'w, Assets<Image>>,
}

#[derive(Resource)]
pub struct SceneMirror {
    entities: HashMap<NodeId, Entity>,
    parts: HashMap<(NodeId, usize), Entity>,
    meshes: HashMap<ResourceId, Vec<Handle<Mesh>>>,
    materials: HashMap<ResourceId, Handle<StandardMaterial>>,
    images: HashMap<ResourceId, Handle<Image>>,
}

impl SceneMirror {
    /// Mirror rooted at an existing entity standing in for the scene container
    pub fn new(root: NodeId, root_entity: Entity) -> Self {
        Self {
            entities: HashMap::from([(root, root_entity)]),
            parts: HashMap::new(),
            meshes: HashMap::new(),
            materials: HashMap::new(),
            images: HashMap::new(),
        }
    }

    pub fn entity(&self, node: NodeId) -> Option<Entity> {
        self.entities.get(&node).copied()
    }

    /// Mirrored nodes, including the scene container
    pub fn node_count(&self) -> usize {
        self.entities.len()
    }

    /// Live asset handles as (meshes, materials, images)
    pub fn handle_counts(&self) -> (usize, usize, usize) {
        (
            self.meshes.values().map(Vec::len).sum(),
            self.materials.len(),
            self.images.len(),
        )
    }

    /// Replay journaled changes, then forget handles of released resources
    pub fn sync(
        &mut self,
        changes: Vec<GraphChange>,
        released: &[Released],
        graph: &SceneGraph,
        commands: &mut Commands,
        assets: &mut MirrorAssets,
    ) {
        for change in changes {
            self.apply(change, graph, commands, assets);
        }
        self.forget(released);
    }

    fn apply(&mut self, change: GraphChange, graph: &SceneGraph, commands: &mut Commands, assets: &mut MirrorAssets) {
        match change {
            GraphChange::Attached { node, parent } => {
                let Some(parent_entity) = self.entity(parent) else {
                    // Built off-scene; spawned when its ancestor attaches
                    return;
                };
                match self.entity(node) {
                    Some(entity) => {
                        commands.entity(entity).try_insert(ChildOf(parent_entity));
                    }
                    None => self.spawn_subtree(node, parent_entity, graph, commands, assets),
                }
            }
            GraphChange::Detached { root, nodes } => {
                if let Some(entity) = self.entities.remove(&root) {
                    commands.entity(entity).try_despawn();
                }
                let gone: HashSet<NodeId> = nodes.into_iter().collect();
                self.entities.retain(|id, _| !gone.contains(id));
                self.parts.retain(|(id, _), _| !gone.contains(id));
            }
            GraphChange::TransformChanged(node) => {
                if let (Some(entity), Some(n)) = (self.entity(node), graph.get(node)) {
                    commands.entity(entity).try_insert(convert::transform(&n.transform));
                }
            }
            GraphChange::MaterialChanged { node, index } => {
                let (Some(part), Some(material)) = (self.parts.get(&(node, index)).copied(), graph.material(node, index))
                else {
                    return;
                };
                let handle = self.material_handle(material, assets);
                commands.entity(part).try_insert(MeshMaterial3d(handle));
            }
        }
    }

    fn spawn_subtree(
        &mut self,
        node: NodeId,
        parent: Entity,
        graph: &SceneGraph,
        commands: &mut Commands,
        assets: &mut MirrorAssets,
    ) {
        let Some(n) = graph.get(node) else {
            return;
        };
        let entity = commands
            .spawn((
                Name::new(n.name.clone()),
                convert::transform(&n.transform),
                Visibility::default(),
                MirroredNode(node),
                ChildOf(parent),
            ))
            .id();
        self.entities.insert(node, entity);

        if let Some(mesh) = n.mesh() {
            self.attach_mesh(node, entity, mesh, commands, assets);
        }
        for &child in n.children() {
            self.spawn_subtree(child, entity, graph, commands, assets);
        }
    }

    fn attach_mesh(
        &mut self,
        node: NodeId,
        entity: Entity,
        mesh: &MeshNode,
        commands: &mut Commands,
        assets: &mut MirrorAssets,
    ) {
        let handles = self.mesh_handles(&mesh.geometry, mesh.materials.len(), assets);

        match &mesh.materials {
            MaterialSlot::Single(material) => {
                let material = self.material_handle(material, assets);
                if let Some(handle) = handles.first() {
                    commands
                        .entity(entity)
                        .insert((Mesh3d(handle.clone()), MeshMaterial3d(material)));
                }
                self.parts.insert((node, 0), entity);
            }
            MaterialSlot::Multi(materials) => {
                for (index, material) in materials.iter().enumerate() {
                    let Some(handle) = handles.get(index) else {
                        continue;
                    };
                    let material = self.material_handle(material, assets);
                    let part = commands
                        .spawn((
                            Mesh3d(handle.clone()),
                            MeshMaterial3d(material),
                            Transform::default(),
                            Visibility::default(),
                            MaterialPart { node, index },
                            ChildOf(entity),
                        ))
                        .id();
                    self.parts.insert((node, index), part);
                }
            }
        }
    }

    fn mesh_handles(
        &mut self,
        geometry: &Owned<tailor_core::geometry::Geometry>,
        slots: usize,
        assets: &mut MirrorAssets,
    ) -> Vec<Handle<Mesh>> {
        self.meshes
            .entry(geometry.id())
            .or_insert_with(|| {
                convert::meshes(geometry, slots)
                    .into_iter()
                    .map(|mesh| assets.meshes.add(mesh))
                    .collect()
            })
            .clone()
    }

    /// Create or refresh the Bevy material for a core material
    fn material_handle(&mut self, material: &Owned<Material>, assets: &mut MirrorAssets) -> Handle<StandardMaterial> {
        let texture = material.map.as_ref().map(|map| self.image_handle(map, assets));
        let standard = convert::standard_material(material, texture);

        match self.materials.get(&material.id()) {
            Some(handle) => {
                if let Some(mut existing) = assets.materials.get_mut(handle) {
                    *existing = standard;
                }
                handle.clone()
            }
            None => {
                let handle = assets.materials.add(standard);
                self.materials.insert(material.id(), handle.clone());
                handle
            }
        }
    }

    fn image_handle(&mut self, texture: &Owned<TextureImage>, assets: &mut MirrorAssets) -> Handle<Image> {
        self.images
            .entry(texture.id())
            .or_insert_with(|| assets.images.add(convert::image(texture)))
            .clone()
    }

    fn forget(&mut self, released: &[Released]) {
        for r in released {
            match r.kind {
                ResourceKind::Geometry => {
                    self.meshes.remove(&r.id);
                }
                ResourceKind::Material => {
                    self.materials.remove(&r.id);
                }
                ResourceKind::Texture => {
                    self.images.remove(&r.id);
                }
            }
        }
    }
}

/// Replay this frame's graph changes into the world
pub fn mirror_scene(
    mut commands: Commands,
    mut session: ResMut<CustomizerSession>,
    mut mirror: ResMut<SceneMirror>,
    mut assets: MirrorAssets,
) {
    let Some(host) = session.host_mut() else {
        return;
    };
    let changes = host.graph_mut().drain_changes();
    let released = host.ledger().drain_released();
    if changes.is_empty() && released.is_empty() {
        return;
    }
    mirror.sync(changes, &released, host.graph(), &mut commands, &mut assets);
}

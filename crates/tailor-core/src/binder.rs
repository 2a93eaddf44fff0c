//! Zone appearance binder
//!
//! Reconciles per-zone colors into the materials of the model's meshes. Every
//! recolor builds a fresh material from the mesh's current one, swaps it into
//! the slot, and only then drops the superseded handle, so a mesh never holds
//! zero or two live materials.

use tracing::{debug, warn};

use crate::color::Rgb;
use crate::config::{ZoneColors, ZoneId};
use crate::graph::{NodeId, NodeRole, SceneGraph};
use crate::resource::ResourceLedger;

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindReport {
    pub resolved: Vec<ZoneId>,
    pub missing: Vec<ZoneId>,
    pub materials_replaced: usize,
    /// No zone resolved and the front color was applied everywhere
    pub fallback: bool,
}

#[derive(Default)]
pub struct ZoneBinder {
    applied: Option<(NodeId, ZoneColors)>,
}

impl ZoneBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget what was applied so the next reconcile runs unconditionally
    pub fn invalidate(&mut self) {
        self.applied = None;
    }

    /// Bring the model's materials in line with `colors`. Returns `None` when
    /// neither the model nor the colors changed since the last pass.
    pub fn reconcile(
        &mut self,
        colors: &ZoneColors,
        model: Option<NodeId>,
        graph: &mut SceneGraph,
        ledger: &ResourceLedger,
    ) -> Option<BindReport> {
        let Some(model) = model.filter(|m| graph.contains(*m)) else {
            self.applied = None;
            return None;
        };
        if self.applied == Some((model, *colors)) {
            return None;
        }

        let mut report = BindReport::default();
        for zone in ZoneId::ALL {
            match graph.find_by_name(model, zone.node_name()) {
                Some(zone_root) => {
                    report.resolved.push(zone);
                    for mesh in graph.meshes(zone_root, NodeRole::Asset) {
                        report.materials_replaced += recolor(graph, ledger, mesh, colors.get(zone));
                    }
                }
                None => report.missing.push(zone),
            }
        }

        if report.resolved.is_empty() {
            warn!("No zone roots found in model; applying front color to all meshes");
            report.fallback = true;
            for mesh in graph.meshes(model, NodeRole::Asset) {
                report.materials_replaced += recolor(graph, ledger, mesh, colors.front);
            }
        } else if !report.missing.is_empty() {
            debug!("Zones not present in model: {:?}", report.missing);
        }

        debug!(
            "Zone colors applied: {} materials replaced (sleeves {}, front {}, back {})",
            report.materials_replaced, colors.sleeves, colors.front, colors.back
        );
        self.applied = Some((model, *colors));
        Some(report)
    }
}

/// Copy-on-write recolor of every material slot on one mesh
fn recolor(graph: &mut SceneGraph, ledger: &ResourceLedger, mesh: NodeId, color: Rgb) -> usize {
    let mut replaced = 0;
    let mut index = 0;
    while let Some(current) = graph.material(mesh, index) {
        let next = ledger.acquire(current.recolored(color));
        if let Ok(previous) = graph.replace_material(mesh, index, next) {
            // Disposed only after the slot already points at the new material
            drop(previous);
            replaced += 1;
        }
        index += 1;
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::geometry::Geometry;
    use crate::graph::{GraphChange, MeshNode, Transform};
    use crate::material::{Material, MaterialSlot};
    use crate::model::ModelManager;
    use crate::texture::TextureImage;
    use glam::Vec3;

    struct Fixture {
        graph: SceneGraph,
        ledger: ResourceLedger,
        model: NodeId,
    }

    fn load(scene: crate::import::ImportedScene) -> Fixture {
        let mut graph = SceneGraph::new();
        let ledger = ResourceLedger::new();
        let mut manager = ModelManager::new(4.0);
        let ticket = manager.begin_load("fixture.glb", &mut graph);
        let parent = graph.root();
        manager.complete(&ticket, Ok(scene), &mut graph, &ledger, parent);
        let model = manager.root().unwrap();
        // The manager is dropped without teardown; the graph keeps the model
        Fixture { graph, ledger, model }
    }

    fn color_of(graph: &SceneGraph, root: NodeId, name: &str) -> Rgb {
        let zone = graph.find_by_name(root, name).unwrap();
        let mesh = graph.meshes(zone, NodeRole::Asset)[0];
        graph.material(mesh, 0).unwrap().base_color
    }

    #[test]
    fn test_each_zone_gets_its_color() {
        let mut f = load(fixtures::shirt_scene());
        let mut binder = ZoneBinder::new();
        let colors = ZoneColors::default();

        let report = binder.reconcile(&colors, Some(f.model), &mut f.graph, &f.ledger).unwrap();
        assert_eq!(report.resolved.len(), 3);
        assert!(!report.fallback);
        assert_eq!(report.materials_replaced, 3);

        assert_eq!(color_of(&f.graph, f.model, "sleeves").to_hex(), "#FF0000");
        assert_eq!(color_of(&f.graph, f.model, "front_torso").to_hex(), "#00FF00");
        assert_eq!(color_of(&f.graph, f.model, "back_torso").to_hex(), "#FFFF00");
    }

    #[test]
    fn test_repeated_changes_do_not_leak() {
        let mut f = load(fixtures::shirt_scene());
        let mut binder = ZoneBinder::new();
        let meshes = f.graph.material_count(f.model) as u64;

        let mut colors = ZoneColors::default();
        for i in 0..20u32 {
            colors.set(ZoneId::ALL[i as usize % 3], Rgb::from_u32(i * 0x0A0B0C));
            binder.reconcile(&colors, Some(f.model), &mut f.graph, &f.ledger);
            assert_eq!(f.ledger.stats().live_materials, meshes);
        }
        assert_eq!(f.graph.material_count(f.model) as u64, meshes);
    }

    #[test]
    fn test_swap_never_leaves_slot_empty_or_doubled() {
        let mut f = load(fixtures::shirt_scene());
        f.graph.drain_changes();
        f.ledger.drain_released();
        let mut binder = ZoneBinder::new();

        binder.reconcile(&ZoneColors::default(), Some(f.model), &mut f.graph, &f.ledger);

        let changes = f.graph.drain_changes();
        let released = f.ledger.drain_released();
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| matches!(c, GraphChange::MaterialChanged { index: 0, .. })));
        assert_eq!(released.len(), 3);

        for mesh in f.graph.meshes(f.model, NodeRole::Asset) {
            let live = f.graph.material(mesh, 0).unwrap().id();
            assert!(released.iter().all(|r| r.id != live));
        }
    }

    #[test]
    fn test_unchanged_colors_skip_work() {
        let mut f = load(fixtures::shirt_scene());
        let mut binder = ZoneBinder::new();
        let colors = ZoneColors::default();
        assert!(binder.reconcile(&colors, Some(f.model), &mut f.graph, &f.ledger).is_some());
        let acquired = f.ledger.stats().total_acquired;

        assert!(binder.reconcile(&colors, Some(f.model), &mut f.graph, &f.ledger).is_none());
        assert_eq!(f.ledger.stats().total_acquired, acquired);

        binder.invalidate();
        assert!(binder.reconcile(&colors, Some(f.model), &mut f.graph, &f.ledger).is_some());
    }

    #[test]
    fn test_fallback_applies_front_color() {
        let mut f = load(fixtures::unnamed_scene());
        let mut binder = ZoneBinder::new();
        let mut colors = ZoneColors::default();
        colors.front = Rgb::from_u32(0x28A745);

        let report = binder.reconcile(&colors, Some(f.model), &mut f.graph, &f.ledger).unwrap();
        assert!(report.fallback);
        assert_eq!(report.missing.len(), 3);
        for mesh in f.graph.meshes(f.model, NodeRole::Asset) {
            assert_eq!(f.graph.material(mesh, 0).unwrap().base_color, colors.front);
        }
    }

    #[test]
    fn test_partial_zones_are_tolerated() {
        let mut f = load(crate::import::parse_glb(&fixtures::build_glb(&[
            fixtures::FixtureNode::zone("sleeves", [0.0; 3], [1.0; 3]),
        ]))
        .unwrap());
        let mut binder = ZoneBinder::new();

        let report = binder
            .reconcile(&ZoneColors::default(), Some(f.model), &mut f.graph, &f.ledger)
            .unwrap();
        assert_eq!(report.resolved, vec![ZoneId::Sleeves]);
        assert_eq!(report.missing, vec![ZoneId::Front, ZoneId::Back]);
        assert!(!report.fallback);
    }

    #[test]
    fn test_texture_maps_are_stripped_and_multi_slots_recolored() {
        let mut graph = SceneGraph::new();
        let ledger = ResourceLedger::new();
        let model = graph.add_group("model", Transform::IDENTITY);
        let zone = graph.add_group("front_torso", Transform::IDENTITY);

        let mut printed = Material::standard(Rgb::WHITE);
        printed.map = Some(ledger.acquire(TextureImage::transparent(8, 8)));
        let mesh = graph.add_mesh(
            "panel",
            Transform::IDENTITY,
            NodeRole::Asset,
            MeshNode {
                geometry: ledger.acquire(Geometry::cuboid(Vec3::ONE)),
                materials: MaterialSlot::Multi(vec![
                    ledger.acquire(printed),
                    ledger.acquire(Material::standard(Rgb::BLACK)),
                ]),
            },
        );
        graph.attach(zone, model);
        graph.attach(mesh, zone);

        let mut binder = ZoneBinder::new();
        let report = binder
            .reconcile(&ZoneColors::default(), Some(model), &mut graph, &ledger)
            .unwrap();
        assert_eq!(report.materials_replaced, 2);

        for index in 0..2 {
            let material = graph.material(mesh, index).unwrap();
            assert_eq!(material.base_color.to_hex(), "#00FF00");
            assert!(material.map.is_none());
        }
        let stats = ledger.stats();
        assert_eq!(stats.live_materials, 2);
        assert_eq!(stats.live_textures, 0);
    }

    #[test]
    fn test_label_surfaces_are_not_recolored() {
        let mut f = load(fixtures::unnamed_scene());
        let label = f.graph.add_mesh(
            "label",
            Transform::IDENTITY,
            NodeRole::LabelSurface,
            MeshNode {
                geometry: f.ledger.acquire(Geometry::plane(1.0, 0.25)),
                materials: MaterialSlot::Single(f.ledger.acquire(Material::standard(Rgb::WHITE))),
            },
        );
        f.graph.attach(label, f.model);

        let mut binder = ZoneBinder::new();
        binder.reconcile(&ZoneColors::default(), Some(f.model), &mut f.graph, &f.ledger);
        assert_eq!(f.graph.material(label, 0).unwrap().base_color, Rgb::WHITE);
    }
}

//! Label texture compositor
//!
//! Keeps exactly one textured overlay surface per label, parented to the
//! model. Surfaces are created for new labels, re-rasterized in place when a
//! label's text or style changes, moved when its placement changes, and
//! destroyed (with geometry, material, and texture) when the label goes away.

use glam::{Quat, Vec3};
use std::collections::{BTreeMap, HashSet};
use std::f32::consts::PI;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{Label, LabelId, Placement};
use crate::geometry::Geometry;
use crate::graph::{MeshNode, NodeId, NodeRole, SceneGraph, Transform};
use crate::material::{Material, MaterialSlot};
use crate::raster::{rasterize_label, GlyphSource};
use crate::resource::ResourceLedger;
use crate::settings::LabelConfig;
use crate::texture::TextureImage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositorReport {
    pub created: usize,
    pub rerastered: usize,
    pub moved: usize,
    pub removed: usize,
}

impl CompositorReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

struct Surface {
    node: NodeId,
    applied: Label,
}

pub struct LabelCompositor {
    config: LabelConfig,
    glyphs: Option<Arc<dyn GlyphSource>>,
    surfaces: BTreeMap<LabelId, Surface>,
    parent: Option<NodeId>,
    glyphs_changed: bool,
}

impl LabelCompositor {
    pub fn new(config: LabelConfig) -> Self {
        Self {
            config,
            glyphs: None,
            surfaces: BTreeMap::new(),
            parent: None,
            glyphs_changed: false,
        }
    }

    /// Install the font; every tracked label is re-rasterized on the next pass
    pub fn set_glyph_source(&mut self, glyphs: Arc<dyn GlyphSource>) {
        self.glyphs = Some(glyphs);
        self.glyphs_changed = true;
    }

    pub fn has_glyphs(&self) -> bool {
        self.glyphs.is_some()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn surface(&self, id: &LabelId) -> Option<NodeId> {
        self.surfaces.get(id).map(|s| s.node)
    }

    pub fn label_ids(&self) -> impl Iterator<Item = &LabelId> {
        self.surfaces.keys()
    }

    /// Bring the overlay surfaces in line with `labels`
    pub fn reconcile(
        &mut self,
        labels: &[Label],
        model: Option<NodeId>,
        graph: &mut SceneGraph,
        ledger: &ResourceLedger,
    ) -> CompositorReport {
        let mut report = CompositorReport::default();

        let Some(model) = model.filter(|m| graph.contains(*m)) else {
            report.removed = self.clear(graph);
            return report;
        };
        if self.parent != Some(model) {
            report.removed += self.clear(graph);
            self.parent = Some(model);
        }

        let present: HashSet<&LabelId> = labels.iter().map(|l| &l.id).collect();
        let gone: Vec<LabelId> = self
            .surfaces
            .keys()
            .filter(|id| !present.contains(id))
            .cloned()
            .collect();
        for id in gone {
            if let Some(surface) = self.surfaces.remove(&id) {
                graph.remove_subtree(surface.node);
                report.removed += 1;
            }
        }

        let mut seen = HashSet::new();
        for label in labels {
            if !seen.insert(&label.id) {
                warn!("Duplicate label id {}; ignoring repeat", label.id);
                continue;
            }
            match self.surfaces.get(&label.id) {
                None => {
                    let node = self.create_surface(label, model, graph, ledger);
                    self.surfaces.insert(
                        label.id.clone(),
                        Surface {
                            node,
                            applied: label.clone(),
                        },
                    );
                    report.created += 1;
                }
                Some(surface) => {
                    let node = surface.node;
                    let prev = &surface.applied;
                    let restyle = self.glyphs_changed
                        || prev.text != label.text
                        || prev.font_size != label.font_size
                        || prev.color != label.color;
                    let moved = prev.placement != label.placement || prev.anchor != label.anchor;

                    if restyle {
                        self.rebind_texture(node, label, graph, ledger);
                        report.rerastered += 1;
                    }
                    if moved {
                        graph.set_transform(node, self.surface_transform(label));
                        report.moved += 1;
                    }
                    if let Some(surface) = self.surfaces.get_mut(&label.id) {
                        surface.applied = label.clone();
                    }
                }
            }
        }
        self.glyphs_changed = false;

        if !report.is_empty() {
            debug!("Label surfaces reconciled: {:?}", report);
        }
        report
    }

    /// Destroy every surface. Returns how many were removed.
    pub fn clear(&mut self, graph: &mut SceneGraph) -> usize {
        let count = self.surfaces.len();
        for (_, surface) in std::mem::take(&mut self.surfaces) {
            graph.remove_subtree(surface.node);
        }
        self.parent = None;
        count
    }

    fn create_surface(
        &self,
        label: &Label,
        model: NodeId,
        graph: &mut SceneGraph,
        ledger: &ResourceLedger,
    ) -> NodeId {
        let [w, h] = self.config.plane_size;
        let texture = ledger.acquire(self.rasterize(label));
        let mesh = MeshNode {
            geometry: ledger.acquire(Geometry::plane(w, h)),
            materials: MaterialSlot::Single(
                ledger.acquire(Material::cutout(texture, self.config.alpha_cutoff)),
            ),
        };
        let node = graph.add_mesh(
            &format!("label:{}", label.id),
            self.surface_transform(label),
            NodeRole::LabelSurface,
            mesh,
        );
        graph.attach(node, model);
        node
    }

    fn rebind_texture(&self, node: NodeId, label: &Label, graph: &mut SceneGraph, ledger: &ResourceLedger) {
        let texture = ledger.acquire(self.rasterize(label));
        match graph.replace_material_map(node, 0, texture) {
            // The old texture is released here, after the rebind
            Ok(previous) => drop(previous),
            Err(_) => warn!("Label surface {} has no material to rebind", node),
        }
    }

    fn rasterize(&self, label: &Label) -> TextureImage {
        rasterize_label(
            &label.text,
            label.font_size,
            label.color,
            self.glyphs.as_ref(),
            self.config.texture_size,
        )
    }

    /// Model-local pose: offset along the facing axis, turned around for the
    /// back so the text reads correctly from behind
    fn surface_transform(&self, label: &Label) -> Transform {
        let span = self.config.anchor_span;
        let [ax, ay] = label.anchor;
        let (facing, rotation) = match label.placement {
            Placement::Front => (1.0, Quat::IDENTITY),
            Placement::Back => (-1.0, Quat::from_rotation_y(PI)),
        };
        Transform {
            translation: Vec3::new(
                (ax - 0.5) * span * facing,
                (ay - 0.5) * span,
                self.config.surface_offset * facing,
            ),
            rotation,
            scale: Vec3::ONE,
        }
    }
}

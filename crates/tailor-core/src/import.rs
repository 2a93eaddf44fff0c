//! Binary glTF import
//!
//! Parses a GLB container into an [`ImportedScene`]: plain node data with
//! names, local transforms, triangle geometry, and material descriptions.
//! Nothing here touches the resource ledger until [`ImportedScene::instantiate`]
//! builds the scene into a graph.

use glam::{Quat, Vec3};
use std::fmt;
use tracing::{debug, warn};

use crate::color::Rgb;
use crate::config::ZoneId;
use crate::error::AssetLoadError;
use crate::geometry::Geometry;
use crate::graph::{MeshNode, NodeId, NodeRole, SceneGraph, Transform};
use crate::material::{AlphaMode, Material, MaterialKind, MaterialSlot};
use crate::resource::ResourceLedger;
use crate::texture::TextureImage;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMaterial {
    pub name: Option<String>,
    pub kind: MaterialKind,
    pub base_color: Rgb,
    pub opacity: f32,
    /// Index into [`ImportedScene::textures`]
    pub base_color_texture: Option<usize>,
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
}

impl Default for ImportedMaterial {
    fn default() -> Self {
        Self {
            name: None,
            kind: MaterialKind::Standard {
                metallic: 1.0,
                roughness: 1.0,
            },
            base_color: Rgb::WHITE,
            opacity: 1.0,
            base_color_texture: None,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedPrimitive {
    pub geometry: Geometry,
    pub material: ImportedMaterial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedNode {
    pub name: String,
    pub transform: Transform,
    pub primitives: Vec<ImportedPrimitive>,
    pub children: Vec<ImportedNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedScene {
    pub roots: Vec<ImportedNode>,
    pub textures: Vec<Option<TextureImage>>,
}

/// Node, mesh, and zone counts of an imported scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneSummary {
    pub nodes: usize,
    pub meshes: usize,
    pub primitives: usize,
    pub textures: usize,
    pub zones: Vec<ZoneId>,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zones: Vec<&str> = self.zones.iter().map(|z| z.node_name()).collect();
        write!(
            f,
            "{} nodes, {} meshes, {} primitives, {} textures, zones [{}]",
            self.nodes,
            self.meshes,
            self.primitives,
            self.textures,
            zones.join(", ")
        )
    }
}

/// Parse a GLB (or embedded glTF) byte buffer
pub fn parse_glb(bytes: &[u8]) -> Result<ImportedScene, AssetLoadError> {
    let (document, buffers, images) =
        gltf::import_slice(bytes).map_err(|e| AssetLoadError::Parse(e.to_string()))?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(AssetLoadError::EmptyScene)?;

    let roots: Vec<ImportedNode> = scene
        .nodes()
        .map(|node| import_node(&node, &buffers))
        .collect();
    if roots.is_empty() {
        return Err(AssetLoadError::EmptyScene);
    }

    let textures = images.into_iter().map(convert_image).collect();

    let imported = ImportedScene { roots, textures };
    debug!("Parsed GLB: {}", imported.describe());
    Ok(imported)
}

fn import_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> ImportedNode {
    let (translation, rotation, scale) = node.transform().decomposed();

    let primitives = match node.mesh() {
        Some(mesh) => mesh
            .primitives()
            .filter_map(|prim| import_primitive(&prim, buffers))
            .collect(),
        None => Vec::new(),
    };

    ImportedNode {
        name: node.name().unwrap_or_default().to_string(),
        transform: Transform {
            translation: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from_array(scale),
        },
        primitives,
        children: node.children().map(|c| import_node(&c, buffers)).collect(),
    }
}

fn import_primitive(
    prim: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Option<ImportedPrimitive> {
    if prim.mode() != gltf::mesh::Mode::Triangles {
        warn!("Skipping non-triangle primitive ({:?})", prim.mode());
        return None;
    }

    let reader = prim.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let mut geometry = Geometry {
        normals: reader.read_normals().map(|n| n.collect()).unwrap_or_default(),
        uvs: reader
            .read_tex_coords(0)
            .map(|tc| tc.into_f32().collect())
            .unwrap_or_default(),
        indices: reader.read_indices().map(|i| i.into_u32().collect()),
        positions,
        groups: Vec::new(),
    };
    geometry.ensure_normals();

    Some(ImportedPrimitive {
        geometry,
        material: import_material(&prim.material()),
    })
}

fn import_material(material: &gltf::Material) -> ImportedMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();

    let alpha_mode = match material.alpha_mode() {
        gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
        gltf::material::AlphaMode::Mask => AlphaMode::Mask(material.alpha_cutoff().unwrap_or(0.5)),
        gltf::material::AlphaMode::Blend => AlphaMode::Blend,
    };

    ImportedMaterial {
        name: material.name().map(str::to_string),
        kind: MaterialKind::Standard {
            metallic: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
        },
        base_color: linear_to_rgb([r, g, b]),
        opacity: a,
        base_color_texture: pbr.base_color_texture().map(|info| info.texture().source().index()),
        alpha_mode,
        double_sided: material.double_sided(),
    }
}

fn convert_image(image: gltf::image::Data) -> Option<TextureImage> {
    match image.format {
        gltf::image::Format::R8G8B8A8 => {
            TextureImage::from_rgba8(image.width, image.height, image.pixels)
        }
        gltf::image::Format::R8G8B8 => {
            TextureImage::from_rgb8(image.width, image.height, &image.pixels)
        }
        other => {
            warn!("Unsupported texture format {:?}, dropping texture", other);
            None
        }
    }
}

/// glTF color factors are linear; the material model stores sRGB
fn linear_to_rgb(linear: [f32; 3]) -> Rgb {
    let encode = |c: f32| {
        let c = c.clamp(0.0, 1.0);
        let s = if c <= 0.003_130_8 {
            c * 12.92
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (s * 255.0).round() as u8
    };
    Rgb::new(encode(linear[0]), encode(linear[1]), encode(linear[2]))
}

impl ImportedScene {
    pub fn describe(&self) -> SceneSummary {
        let mut summary = SceneSummary {
            textures: self.textures.iter().flatten().count(),
            ..Default::default()
        };

        let mut stack: Vec<&ImportedNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            summary.nodes += 1;
            if !node.primitives.is_empty() {
                summary.meshes += 1;
                summary.primitives += node.primitives.len();
            }
            if let Some(zone) = ZoneId::ALL.into_iter().find(|z| z.node_name() == node.name) {
                if !summary.zones.contains(&zone) {
                    summary.zones.push(zone);
                }
            }
            stack.extend(node.children.iter());
        }
        summary.zones.sort_by_key(|z| ZoneId::ALL.iter().position(|a| a == z));
        summary
    }

    /// Build the scene into `graph` under a new detached group named `root_name`
    pub fn instantiate(&self, graph: &mut SceneGraph, ledger: &ResourceLedger, root_name: &str) -> NodeId {
        let root = graph.add_group(root_name, Transform::IDENTITY);
        for node in &self.roots {
            let child = self.instantiate_node(node, graph, ledger);
            graph.attach(child, root);
        }
        root
    }

    fn instantiate_node(&self, node: &ImportedNode, graph: &mut SceneGraph, ledger: &ResourceLedger) -> NodeId {
        let id = match node.primitives.as_slice() {
            [] => graph.add_group(&node.name, node.transform),
            [single] => {
                let mesh = self.build_mesh(single, ledger);
                graph.add_mesh(&node.name, node.transform, NodeRole::Asset, mesh)
            }
            many => {
                // One child mesh per primitive, grouped under the node's name
                let group = graph.add_group(&node.name, node.transform);
                for (i, prim) in many.iter().enumerate() {
                    let mesh = self.build_mesh(prim, ledger);
                    let name = format!("{}_{}", node.name, i);
                    let child = graph.add_mesh(&name, Transform::IDENTITY, NodeRole::Asset, mesh);
                    graph.attach(child, group);
                }
                group
            }
        };

        for child in &node.children {
            let child_id = self.instantiate_node(child, graph, ledger);
            graph.attach(child_id, id);
        }
        id
    }

    fn build_mesh(&self, prim: &ImportedPrimitive, ledger: &ResourceLedger) -> MeshNode {
        let source = &prim.material;
        let map = source
            .base_color_texture
            .and_then(|i| self.textures.get(i))
            .and_then(|t| t.clone())
            .map(|image| ledger.acquire(image));

        let material = Material {
            name: source.name.clone(),
            kind: source.kind,
            base_color: source.base_color,
            opacity: source.opacity,
            map,
            alpha_mode: source.alpha_mode,
            double_sided: source.double_sided,
        };

        MeshNode {
            geometry: ledger.acquire(prim.geometry.clone()),
            materials: MaterialSlot::Single(ledger.acquire(material)),
        }
    }
}

//! Core scene values to Bevy assets and components

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use tailor_core::color::Rgb;
use tailor_core::geometry::Geometry;
use tailor_core::graph;
use tailor_core::material::{self, Material, MaterialKind};
use tailor_core::texture::TextureImage;

pub fn color(rgb: Rgb) -> Color {
    Color::srgb_u8(rgb.r, rgb.g, rgb.b)
}

pub fn transform(t: &graph::Transform) -> Transform {
    Transform {
        translation: Vec3::from_array(t.translation.to_array()),
        rotation: Quat::from_array(t.rotation.to_array()),
        scale: Vec3::from_array(t.scale.to_array()),
    }
}

/// One Bevy mesh per material slot entry. Slot `i` draws the groups bound to
/// material `i`; geometry without groups goes entirely to slot 0.
pub fn meshes(geometry: &Geometry, slots: usize) -> Vec<Mesh> {
    let slots = slots.max(1);
    let all: Vec<u32> = match &geometry.indices {
        Some(indices) => indices.clone(),
        None => (0..geometry.positions.len() as u32).collect(),
    };

    let mut parts = vec![Vec::new(); slots];
    if geometry.groups.is_empty() {
        parts[0] = all;
    } else {
        for group in &geometry.groups {
            let Some(part) = parts.get_mut(group.material_index) else {
                continue;
            };
            let start = group.start as usize;
            let end = (start + group.count as usize).min(all.len());
            if start < end {
                part.extend_from_slice(&all[start..end]);
            }
        }
    }

    parts.into_iter().map(|indices| mesh(geometry, indices)).collect()
}

fn mesh(geometry: &Geometry, indices: Vec<u32>) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, geometry.positions.clone())
        .with_inserted_indices(Indices::U32(indices));

    if geometry.normals.len() == geometry.positions.len() {
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, geometry.normals.clone());
    }
    if geometry.uvs.len() == geometry.positions.len() {
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, geometry.uvs.clone());
    }
    mesh
}

pub fn image(texture: &TextureImage) -> Image {
    Image::new(
        Extent3d {
            width: texture.width,
            height: texture.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        texture.pixels.clone(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

pub fn standard_material(material: &Material, texture: Option<Handle<Image>>) -> StandardMaterial {
    let [r, g, b] = material.base_color.to_srgb_f32();
    let (metallic, perceptual_roughness, unlit) = match material.kind {
        MaterialKind::Standard { metallic, roughness } => (metallic, roughness, false),
        MaterialKind::Unlit => (0.0, 1.0, true),
    };

    StandardMaterial {
        base_color: Color::srgba(r, g, b, material.opacity),
        base_color_texture: texture,
        metallic,
        perceptual_roughness,
        unlit,
        alpha_mode: alpha_mode(material.alpha_mode),
        double_sided: material.double_sided,
        cull_mode: if material.double_sided {
            None
        } else {
            Some(bevy::render::render_resource::Face::Back)
        },
        ..default()
    }
}

fn alpha_mode(mode: material::AlphaMode) -> AlphaMode {
    match mode {
        material::AlphaMode::Opaque => AlphaMode::Opaque,
        material::AlphaMode::Mask(cutoff) => AlphaMode::Mask(cutoff),
        material::AlphaMode::Blend => AlphaMode::Blend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailor_core::geometry::GeometryGroup;
    use tailor_core::resource::ResourceLedger;

    #[test]
    fn test_single_slot_mesh_keeps_everything() {
        let geometry = Geometry::cuboid(glam::Vec3::ONE);
        let parts = meshes(&geometry, 1);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].count_vertices(), 24);
        assert_eq!(parts[0].indices().map(|i| i.len()), Some(36));
        assert!(parts[0].attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert!(parts[0].attribute(Mesh::ATTRIBUTE_UV_0).is_some());
    }

    #[test]
    fn test_groups_split_by_material() {
        let mut geometry = Geometry::cuboid(glam::Vec3::ONE);
        geometry.groups = vec![
            GeometryGroup { start: 0, count: 12, material_index: 0 },
            GeometryGroup { start: 12, count: 24, material_index: 1 },
        ];
        let parts = meshes(&geometry, 2);
        assert_eq!(parts[0].indices().map(|i| i.len()), Some(12));
        assert_eq!(parts[1].indices().map(|i| i.len()), Some(24));
    }

    #[test]
    fn test_label_material() {
        let ledger = ResourceLedger::new();
        let map = ledger.acquire(TextureImage::transparent(512, 128));
        let material = Material::cutout(map, 0.5);

        let image = image(material.map.as_deref().unwrap());
        assert_eq!(image.width(), 512);
        assert_eq!(image.height(), 128);

        let standard = standard_material(&material, None);
        assert!(standard.unlit);
        assert!(standard.double_sided);
        assert!(standard.cull_mode.is_none());
        assert!(matches!(standard.alpha_mode, AlphaMode::Mask(c) if c == 0.5));
    }

    #[test]
    fn test_zone_material_color() {
        let material = Material::standard(Rgb::from_u32(0xFF0000));
        let standard = standard_material(&material, None);
        assert_eq!(standard.base_color, Color::srgba(1.0, 0.0, 0.0, 1.0));
        assert!(!standard.unlit);
        assert!(matches!(standard.alpha_mode, AlphaMode::Opaque));
    }
}

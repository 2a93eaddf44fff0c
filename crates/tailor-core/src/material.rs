//! Surface materials and the per-mesh material slot

use crate::color::Rgb;
use crate::resource::{GpuResource, Owned, ResourceId, ResourceKind};
use crate::texture::TextureImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialKind {
    /// Physically based, lit by the scene lights
    Standard { metallic: f32, roughness: f32 },
    /// Emits its color unaffected by lighting
    Unlit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlphaMode {
    Opaque,
    /// Fragments with alpha below the cutoff are discarded
    Mask(f32),
    Blend,
}

#[derive(Debug)]
pub struct Material {
    pub name: Option<String>,
    pub kind: MaterialKind,
    pub base_color: Rgb,
    pub opacity: f32,
    pub map: Option<Owned<TextureImage>>,
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
}

impl GpuResource for Material {
    const KIND: ResourceKind = ResourceKind::Material;
}

impl Material {
    pub fn standard(base_color: Rgb) -> Self {
        Self {
            name: None,
            kind: MaterialKind::Standard {
                metallic: 0.0,
                roughness: 0.5,
            },
            base_color,
            opacity: 1.0,
            map: None,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
        }
    }

    /// Unlit, double-sided, alpha-cutout material showing a texture
    pub fn cutout(map: Owned<TextureImage>, alpha_cutoff: f32) -> Self {
        Self {
            name: None,
            kind: MaterialKind::Unlit,
            base_color: Rgb::WHITE,
            opacity: 1.0,
            map: Some(map),
            alpha_mode: AlphaMode::Mask(alpha_cutoff),
            double_sided: true,
        }
    }

    /// Copy of this material with a new color and no texture map
    pub fn recolored(&self, color: Rgb) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            base_color: color,
            opacity: self.opacity,
            map: None,
            alpha_mode: self.alpha_mode,
            double_sided: self.double_sided,
        }
    }

    pub fn map_id(&self) -> Option<ResourceId> {
        self.map.as_ref().map(|m| m.id())
    }
}

/// The material(s) owned by one mesh node
#[derive(Debug)]
pub enum MaterialSlot {
    Single(Owned<Material>),
    /// One material per geometry group
    Multi(Vec<Owned<Material>>),
}

impl MaterialSlot {
    pub fn len(&self) -> usize {
        match self {
            MaterialSlot::Single(_) => 1,
            MaterialSlot::Multi(materials) => materials.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Owned<Material>> {
        match self {
            MaterialSlot::Single(material) => (index == 0).then_some(material),
            MaterialSlot::Multi(materials) => materials.get(index),
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Owned<Material>> {
        match self {
            MaterialSlot::Single(material) => (index == 0).then_some(material),
            MaterialSlot::Multi(materials) => materials.get_mut(index),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Owned<Material>> {
        let (single, multi) = match self {
            MaterialSlot::Single(material) => (Some(material), &[][..]),
            MaterialSlot::Multi(materials) => (None, materials.as_slice()),
        };
        single.into_iter().chain(multi.iter())
    }

    pub fn ids(&self) -> Vec<ResourceId> {
        self.iter().map(|m| m.id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceLedger;

    #[test]
    fn test_recolor_keeps_properties_and_strips_map() {
        let ledger = ResourceLedger::new();
        let texture = ledger.acquire(TextureImage::transparent(2, 2));
        let mut original = Material::cutout(texture, 0.3);
        original.name = Some("fabric".into());

        let copy = original.recolored(Rgb::from_u32(0x0066CC));
        assert_eq!(copy.base_color.to_hex(), "#0066CC");
        assert!(copy.map.is_none());
        assert_eq!(copy.kind, MaterialKind::Unlit);
        assert_eq!(copy.alpha_mode, AlphaMode::Mask(0.3));
        assert!(copy.double_sided);
        assert_eq!(copy.name.as_deref(), Some("fabric"));

        assert!(original.map.is_some());
        assert_eq!(ledger.stats().live_textures, 1);
        drop(original);
        assert_eq!(ledger.stats().live_textures, 0);
    }

    #[test]
    fn test_slot_access() {
        let ledger = ResourceLedger::new();
        let single = MaterialSlot::Single(ledger.acquire(Material::standard(Rgb::WHITE)));
        assert_eq!(single.len(), 1);
        assert!(single.get(0).is_some());
        assert!(single.get(1).is_none());

        let multi = MaterialSlot::Multi(vec![
            ledger.acquire(Material::standard(Rgb::WHITE)),
            ledger.acquire(Material::standard(Rgb::BLACK)),
        ]);
        assert_eq!(multi.len(), 2);
        assert_eq!(multi.ids().len(), 2);
        assert_eq!(multi.iter().count(), 2);
        assert_eq!(ledger.stats().live_materials, 3);
    }
}

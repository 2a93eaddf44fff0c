//! Triangle mesh data and bounding boxes

use glam::{Mat4, Vec3};

use crate::resource::{GpuResource, ResourceKind};

/// A contiguous index range drawn with one entry of a multi-material slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: usize,
}

/// Indexed triangle list with per-vertex attributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Option<Vec<u32>>,
    pub groups: Vec<GeometryGroup>,
}

impl GpuResource for Geometry {
    const KIND: ResourceKind = ResourceKind::Geometry;
}

impl Geometry {
    /// Flat rectangle in the XY plane facing +Z, centered at the origin
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self {
            positions: vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            uvs: vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
            indices: Some(vec![0, 1, 2, 0, 2, 3]),
            groups: Vec::new(),
        }
    }

    /// Axis-aligned box centered at the origin
    pub fn cuboid(size: Vec3) -> Self {
        let h = size / 2.0;
        // (normal, u axis, v axis) per face
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut geometry = Self::default();
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let base = geometry.positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (normal + u * su + v * sv) * h;
                geometry.positions.push(p.to_array());
                geometry.normals.push(normal.to_array());
                geometry.uvs.push([(su + 1.0) / 2.0, (1.0 - sv) / 2.0]);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        geometry.indices = Some(indices);
        geometry
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Bounds in the geometry's own space, `None` when empty
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().map(|p| Vec3::from_array(*p)))
    }

    /// Fill in area-weighted vertex normals when the source had none
    pub fn ensure_normals(&mut self) {
        if self.normals.len() == self.positions.len() {
            return;
        }

        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        let triangles: Vec<[usize; 3]> = match &self.indices {
            Some(indices) => indices
                .chunks_exact(3)
                .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
                .collect(),
            None => (0..self.positions.len() / 3)
                .map(|i| [i * 3, i * 3 + 1, i * 3 + 2])
                .collect(),
        };

        for [a, b, c] in triangles {
            let (Some(pa), Some(pb), Some(pc)) =
                (self.positions.get(a), self.positions.get(b), self.positions.get(c))
            else {
                continue;
            };
            let (pa, pb, pc) = (Vec3::from_array(*pa), Vec3::from_array(*pb), Vec3::from_array(*pc));
            let face = (pb - pa).cross(pc - pa);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }

        self.normals = normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
            .collect();
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    pub fn union(self, other: Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let corners = self.corners().map(|c| matrix.transform_point3(c));
        let mut out = Aabb { min: corners[0], max: corners[0] };
        for c in &corners[1..] {
            out.min = out.min.min(*c);
            out.max = out.max.max(*c);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_plane_bounds() {
        let plane = Geometry::plane(1.0, 0.25);
        let bounds = plane.bounds().unwrap();
        assert_eq!(bounds.size(), Vec3::new(1.0, 0.25, 0.0));
        assert_eq!(bounds.center(), Vec3::ZERO);
        assert_eq!(plane.triangle_count(), 2);
    }

    #[test]
    fn test_cuboid_bounds() {
        let cuboid = Geometry::cuboid(Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(cuboid.vertex_count(), 24);
        assert_eq!(cuboid.triangle_count(), 12);
        let bounds = cuboid.bounds().unwrap();
        assert!((bounds.max - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
        assert_eq!(bounds.max_dimension(), 6.0);
    }

    #[test]
    fn test_empty_geometry_has_no_bounds() {
        assert!(Geometry::default().bounds().is_none());
    }

    #[test]
    fn test_transformed_bounds() {
        let bounds = Aabb { min: Vec3::splat(-1.0), max: Vec3::splat(1.0) };
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 1.0, 1.0),
            Quat::IDENTITY,
            Vec3::new(10.0, 0.0, 0.0),
        );
        let out = bounds.transformed(&matrix);
        assert_eq!(out.min, Vec3::new(8.0, -1.0, -1.0));
        assert_eq!(out.max, Vec3::new(12.0, 1.0, 1.0));
    }

    #[test]
    fn test_ensure_normals_for_triangle() {
        let mut tri = Geometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: Some(vec![0, 1, 2]),
            ..Default::default()
        };
        tri.ensure_normals();
        assert_eq!(tri.normals, vec![[0.0, 0.0, 1.0]; 3]);
    }
}

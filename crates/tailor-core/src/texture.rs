//! CPU-side RGBA8 images uploaded as textures

use crate::resource::{GpuResource, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, top row first
    pub pixels: Vec<u8>,
}

impl GpuResource for TextureImage {
    const KIND: ResourceKind = ResourceKind::Texture;
}

impl TextureImage {
    /// Fully transparent image
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Expand tightly packed RGB8 into RGBA8
    pub fn from_rgb8(width: u32, height: u32, rgb: &[u8]) -> Option<Self> {
        if rgb.len() != width as usize * height as usize * 3 {
            return None;
        }
        let pixels = rgb
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 0xFF])
            .collect();
        Some(Self { width, height, pixels })
    }

    pub fn from_rgba8(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self { width, height, pixels: rgba })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels.get_mut(i..i + 4)
    }

    /// Number of pixels with non-zero alpha
    pub fn coverage(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|p| p[3] > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_image() {
        let image = TextureImage::transparent(4, 2);
        assert_eq!(image.pixels.len(), 32);
        assert_eq!(image.coverage(), 0);
        assert_eq!(image.pixel(3, 1), Some([0, 0, 0, 0]));
        assert_eq!(image.pixel(4, 0), None);
    }

    #[test]
    fn test_rgb_expansion() {
        let image = TextureImage::from_rgb8(2, 1, &[255, 0, 0, 0, 0, 255]).unwrap();
        assert_eq!(image.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(image.pixel(1, 0), Some([0, 0, 255, 255]));
        assert!(TextureImage::from_rgb8(2, 2, &[0; 3]).is_none());
    }
}

//! Label text rasterization
//!
//! Text is laid out on a single line, centered both ways on a fixed-size
//! transparent canvas, and written as RGBA8 with glyph coverage in alpha.

use std::sync::Arc;
use thiserror::Error;

use crate::color::Rgb;
use crate::texture::TextureImage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("Invalid font data: {0}")]
    InvalidFont(String),
}

/// Coverage bitmap of one glyph, rows top to bottom
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    /// Left edge relative to the pen position
    pub xmin: i32,
    /// Bottom edge relative to the baseline, positive up
    pub ymin: i32,
    pub advance: f32,
    pub coverage: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    /// Negative below the baseline
    pub descent: f32,
}

/// Anything that can turn characters into coverage bitmaps
pub trait GlyphSource: Send + Sync {
    fn glyph(&self, ch: char, px: f32) -> GlyphBitmap;
    fn line_metrics(&self, px: f32) -> LineMetrics;
}

/// Glyphs from a TTF/OTF font
pub struct FontGlyphs {
    font: fontdue::Font,
}

impl FontGlyphs {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RasterError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| RasterError::InvalidFont(e.to_string()))?;
        Ok(Self { font })
    }
}

impl GlyphSource for FontGlyphs {
    fn glyph(&self, ch: char, px: f32) -> GlyphBitmap {
        let (metrics, coverage) = self.font.rasterize(ch, px);
        GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            advance: metrics.advance_width,
            coverage,
        }
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        match self.font.horizontal_line_metrics(px) {
            Some(m) => LineMetrics {
                ascent: m.ascent,
                descent: m.descent,
            },
            None => LineMetrics {
                ascent: px * 0.8,
                descent: -px * 0.2,
            },
        }
    }
}

/// Solid rectangles in place of real glyphs; whitespace stays empty
pub struct BlockGlyphs;

impl GlyphSource for BlockGlyphs {
    fn glyph(&self, ch: char, px: f32) -> GlyphBitmap {
        let advance = px * 0.7;
        if ch.is_whitespace() {
            return GlyphBitmap {
                advance,
                ..Default::default()
            };
        }
        let width = (px * 0.6).round() as usize;
        let height = (px * 0.7).round() as usize;
        GlyphBitmap {
            width,
            height,
            xmin: 0,
            ymin: 0,
            advance,
            coverage: vec![0xFF; width * height],
        }
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: px * 0.7,
            descent: 0.0,
        }
    }
}

/// Draw `text` centered on a `width` x `height` canvas. Without a glyph
/// source, or with a size that is not a positive number, the canvas stays
/// fully transparent. Sizes above the canvas height draw at the height.
pub fn rasterize_label(
    text: &str,
    font_size: f32,
    color: Rgb,
    glyphs: Option<&Arc<dyn GlyphSource>>,
    [width, height]: [u32; 2],
) -> TextureImage {
    let mut image = TextureImage::transparent(width, height);
    let Some(source) = glyphs else {
        return image;
    };
    if !(font_size.is_finite() && font_size > 0.0) {
        return image;
    }
    let font_size = font_size.min(height as f32);

    let bitmaps: Vec<GlyphBitmap> = text.chars().map(|c| source.glyph(c, font_size)).collect();
    let line = source.line_metrics(font_size);
    let text_width: f32 = bitmaps.iter().map(|g| g.advance).sum();

    let mut pen_x = (width as f32 - text_width) / 2.0;
    let baseline = (height as f32 + line.ascent + line.descent) / 2.0;

    for glyph in &bitmaps {
        let left = (pen_x + glyph.xmin as f32).round() as i64;
        let top = (baseline - glyph.ymin as f32 - glyph.height as f32).round() as i64;

        for row in 0..glyph.height {
            for col in 0..glyph.width {
                let coverage = glyph.coverage.get(row * glyph.width + col).copied().unwrap_or(0);
                if coverage == 0 {
                    continue;
                }
                let (x, y) = (left + col as i64, top + row as i64);
                if x < 0 || y < 0 {
                    continue;
                }
                if let Some(px) = image.pixel_mut(x as u32, y as u32) {
                    px[0] = color.r;
                    px[1] = color.g;
                    px[2] = color.b;
                    px[3] = px[3].max(coverage);
                }
            }
        }
        pen_x += glyph.advance;
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks() -> Arc<dyn GlyphSource> {
        Arc::new(BlockGlyphs)
    }

    /// Inclusive x/y extents of all covered pixels
    fn ink_extent(image: &TextureImage) -> Option<(u32, u32, u32, u32)> {
        let mut extent: Option<(u32, u32, u32, u32)> = None;
        for y in 0..image.height {
            for x in 0..image.width {
                if image.pixel(x, y).is_some_and(|p| p[3] > 0) {
                    extent = Some(match extent {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }
        }
        extent
    }

    #[test]
    fn test_without_glyphs_is_blank() {
        let image = rasterize_label("TEST", 48.0, Rgb::BLACK, None, [512, 128]);
        assert_eq!((image.width, image.height), (512, 128));
        assert_eq!(image.coverage(), 0);
    }

    #[test]
    fn test_text_is_centered() {
        let glyphs = blocks();
        let image = rasterize_label("TEST", 48.0, Rgb::from_u32(0xDC3545), Some(&glyphs), [512, 128]);

        let (x0, y0, x1, y1) = ink_extent(&image).unwrap();
        let ink_center_x = (x0 + x1) as f32 / 2.0;
        let ink_center_y = (y0 + y1) as f32 / 2.0;
        // The last block ends short of its advance, shifting ink left
        assert!((ink_center_x - 256.0).abs() < 8.0, "x center {ink_center_x}");
        assert!((ink_center_y - 64.0).abs() < 2.0, "y center {ink_center_y}");

        assert_eq!(image.pixel(x0, y0), Some([0xDC, 0x35, 0x45, 0xFF]));
        assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_font_size_scales_ink() {
        let glyphs = blocks();
        let small = rasterize_label("AB", 24.0, Rgb::BLACK, Some(&glyphs), [512, 128]);
        let large = rasterize_label("AB", 48.0, Rgb::BLACK, Some(&glyphs), [512, 128]);
        assert!(large.coverage() > small.coverage() * 3);
    }

    #[test]
    fn test_overflow_is_clipped() {
        let glyphs = blocks();
        let image = rasterize_label("WWWWWWWWWWWWWWWWWWWW", 96.0, Rgb::BLACK, Some(&glyphs), [512, 128]);
        let (x0, _, x1, _) = ink_extent(&image).unwrap();
        assert_eq!(x0, 0);
        assert_eq!(x1, 511);
    }

    #[test]
    fn test_font_size_is_capped_at_canvas_height() {
        let glyphs = blocks();
        let huge = rasterize_label("AB", 60_000.0, Rgb::BLACK, Some(&glyphs), [512, 128]);
        let capped = rasterize_label("AB", 128.0, Rgb::BLACK, Some(&glyphs), [512, 128]);
        assert!(huge.coverage() > 0);
        assert_eq!(huge.pixels, capped.pixels);

        for size in [f32::NAN, f32::INFINITY, 0.0, -12.0] {
            let image = rasterize_label("AB", size, Rgb::BLACK, Some(&glyphs), [512, 128]);
            assert_eq!(image.coverage(), 0);
        }
    }

    #[test]
    fn test_bad_font_bytes() {
        assert!(matches!(
            FontGlyphs::from_bytes(b"definitely not a font"),
            Err(RasterError::InvalidFont(_))
        ));
    }
}

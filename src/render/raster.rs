use std::path::Path;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use super::recording::ESTIMATED_ADVANCE;
use super::surface::{RectF, Surface};

/// DejaVu Sans, bundled so label text renders without any configuration.
const DEFAULT_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// The bundled label font.
pub fn default_font() -> Result<FontArc> {
    FontArc::try_from_slice(DEFAULT_FONT).map_err(|e| anyhow!("invalid bundled font: {}", e))
}

/// Load a TrueType/OpenType font for label text.
pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow!("failed to read font {}: {}", path.display(), e))?;
    FontArc::try_from_vec(bytes).map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))
}

/// Raster surface over an RGBA image.
///
/// Fills are composited source-over onto the existing pixels; an opaque frame
/// stays opaque. Without a font, label text is measured with a fixed
/// per-character advance and no glyphs are rasterised.
pub struct RasterSurface {
    image: RgbaImage,
    font: Option<FontArc>,
}

impl RasterSurface {
    pub fn new(image: RgbaImage) -> Self {
        Self { image, font: None }
    }

    pub fn with_font(mut self, font: Option<FontArc>) -> Self {
        self.font = font;
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn pixel_span(&self, rect: RectF) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = self.image.dimensions();
        let (x, width) = clip_span(rect.x, rect.width, w)?;
        let (y, height) = clip_span(rect.y, rect.height, h)?;
        Some((x, y, x + width, y + height))
    }
}

/// Round a span to pixel edges and clip it to `[0, limit)`.
fn clip_span(start: f32, len: f32, limit: u32) -> Option<(u32, u32)> {
    let lo = start.round().max(0.0);
    let hi = (start + len).round().min(limit as f32);
    if !(hi > lo) {
        return None;
    }
    Some((lo as u32, (hi - lo) as u32))
}

/// Source-over compositing in 8-bit integer math.
fn composite(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src.0[3] as u32;
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = dst.0[3] as u32;
    // dst contribution, already weighted by its own alpha
    let dw = (da * (255 - sa) + 127) / 255;
    let out_a = sa + dw;
    if out_a == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| {
        let c = src.0[i] as u32 * sa + dst.0[i] as u32 * dw;
        ((c + out_a / 2) / out_a) as u8
    };
    Rgba([channel(0), channel(1), channel(2), out_a as u8])
}

impl Surface for RasterSurface {
    fn is_ready(&self) -> bool {
        let (w, h) = self.image.dimensions();
        w > 0 && h > 0
    }

    fn fill_rect(&mut self, rect: RectF, color: Rgba<u8>) {
        let Some((x0, y0, x1, y1)) = self.pixel_span(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let px = self.image.get_pixel_mut(x, y);
                *px = composite(*px, color);
            }
        }
    }

    fn stroke_rect(&mut self, rect: RectF, color: Rgba<u8>, width: f32) {
        if !(width > 0.0) {
            return;
        }
        let half = width / 2.0;
        let outer = RectF::new(
            rect.x - half,
            rect.y - half,
            rect.width + width,
            rect.height + width,
        );
        // Four non-overlapping bands so translucent strokes do not double up at corners.
        let bands = [
            RectF::new(outer.x, outer.y, outer.width, width),
            RectF::new(outer.x, outer.bottom() - width, outer.width, width),
            RectF::new(outer.x, outer.y + width, width, outer.height - 2.0 * width),
            RectF::new(
                outer.right() - width,
                outer.y + width,
                width,
                outer.height - 2.0 * width,
            ),
        ];
        for band in bands {
            self.fill_rect(band, color);
        }
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        match &self.font {
            Some(font) => text_size(PxScale::from(font_size), font, text).0 as f32,
            None => text.chars().count() as f32 * font_size * ESTIMATED_ADVANCE,
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>, font_size: f32) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = PxScale::from(font_size);
        let top = y - font.as_scaled(scale).ascent();
        draw_text_mut(
            &mut self.image,
            color,
            x.round() as i32,
            top.round() as i32,
            scale,
            font,
            text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black(w: u32, h: u32) -> RasterSurface {
        RasterSurface::new(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255])))
    }

    fn close(a: Rgba<u8>, b: Rgba<u8>) -> bool {
        a.0.iter().zip(b.0.iter()).all(|(x, y)| x.abs_diff(*y) <= 1)
    }

    #[test]
    fn opaque_fill_replaces_pixels() {
        let mut surface = black(10, 10);
        surface.fill_rect(RectF::new(2.0, 2.0, 3.0, 3.0), Rgba([255, 0, 0, 255]));
        assert!(close(*surface.image().get_pixel(2, 2), Rgba([255, 0, 0, 255])));
        assert!(close(*surface.image().get_pixel(4, 4), Rgba([255, 0, 0, 255])));
        assert_eq!(*surface.image().get_pixel(5, 5), Rgba([0, 0, 0, 255]));
        assert_eq!(*surface.image().get_pixel(1, 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn translucent_fill_blends() {
        let mut surface = black(4, 4);
        surface.fill_rect(RectF::new(0.0, 0.0, 4.0, 4.0), Rgba([200, 0, 0, 128]));
        let px = surface.image().get_pixel(1, 1);
        assert!(px.0[0] > 80 && px.0[0] < 120, "got {:?}", px);
        assert_eq!(px.0[3], 255);
    }

    #[test]
    fn stroke_is_centred_on_edges() {
        let mut surface = black(20, 20);
        surface.stroke_rect(RectF::new(5.0, 5.0, 10.0, 10.0), Rgba([0, 255, 0, 255]), 2.0);
        let green = Rgba([0, 255, 0, 255]);
        assert!(close(*surface.image().get_pixel(4, 10), green));
        assert!(close(*surface.image().get_pixel(5, 10), green));
        assert!(close(*surface.image().get_pixel(10, 4), green));
        assert!(close(*surface.image().get_pixel(15, 10), green));
        assert_eq!(*surface.image().get_pixel(6, 10), Rgba([0, 0, 0, 255]));
        assert_eq!(*surface.image().get_pixel(10, 10), Rgba([0, 0, 0, 255]));
        assert_eq!(*surface.image().get_pixel(3, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn off_surface_rects_are_clipped() {
        let mut surface = black(8, 8);
        surface.fill_rect(RectF::new(-4.0, -20.0, 6.0, 10.0), Rgba([255, 255, 255, 255]));
        surface.fill_rect(RectF::new(20.0, 20.0, 6.0, 6.0), Rgba([255, 255, 255, 255]));
        surface.fill_rect(RectF::new(-3.0, -3.0, 5.0, 5.0), Rgba([255, 255, 255, 255]));
        assert!(close(*surface.image().get_pixel(0, 0), Rgba([255, 255, 255, 255])));
        assert_eq!(*surface.image().get_pixel(2, 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn empty_image_is_not_ready() {
        assert!(!RasterSurface::new(RgbaImage::new(0, 0)).is_ready());
        assert!(black(1, 1).is_ready());
    }

    #[test]
    fn text_without_font_is_estimated_and_not_drawn() {
        let mut surface = black(40, 40);
        assert_eq!(surface.measure_text("abcd", 14.0), 28.0);
        surface.fill_text("abcd", 5.0, 20.0, Rgba([255, 255, 255, 255]), 14.0);
        assert!(surface.image().pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn stacked_translucent_fills_keep_frame_opaque() {
        let mut surface = RasterSurface::new(RgbaImage::from_pixel(6, 6, Rgba([100, 100, 100, 255])));
        surface.fill_rect(RectF::new(0.0, 0.0, 6.0, 6.0), Rgba([0xef, 0x44, 0x44, 77]));
        surface.fill_rect(RectF::new(0.0, 0.0, 3.0, 3.0), Rgba([0x22, 0xc5, 0x5e, 204]));
        assert!(surface.image().pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn composite_over_transparent_keeps_source_colour() {
        let out = composite(Rgba([0, 0, 0, 0]), Rgba([200, 40, 10, 128]));
        assert_eq!(out, Rgba([200, 40, 10, 128]));
    }

    #[test]
    fn bundled_font_rasterises_text() {
        let mut surface = black(80, 30).with_font(Some(default_font().unwrap()));
        assert!(surface.has_font());
        let width = surface.measure_text("fault 92%", 14.0);
        assert!(width > 30.0 && width < 80.0, "width {}", width);
        surface.fill_text("fault 92%", 2.0, 20.0, Rgba([255, 255, 255, 255]), 14.0);
        let lit = surface.image().pixels().filter(|p| p.0[0] > 128).count();
        assert!(lit > 20, "only {} text pixels", lit);
        assert!(surface.image().pixels().all(|p| p.0[3] == 255));
    }
}

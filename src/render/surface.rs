use image::Rgba;
use serde::Serialize;

/// Rectangle in surface coordinates (same space as the source image pixels).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// 2D drawing surface the overlay is painted onto.
///
/// The surface already holds the source image; implementations composite
/// colours with alpha over what is there.
pub trait Surface {
    /// False while the surface has nothing to draw on (e.g. a frame that has
    /// not finished loading).
    fn is_ready(&self) -> bool;

    fn fill_rect(&mut self, rect: RectF, color: Rgba<u8>);

    /// Outline centred on the rectangle's edges, `width` pixels thick.
    fn stroke_rect(&mut self, rect: RectF, color: Rgba<u8>, width: f32);

    /// Advance width of `text` at `font_size` pixels.
    fn measure_text(&self, text: &str, font_size: f32) -> f32;

    /// Draw `text` with its left end at `x` and its baseline at `y`.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>, font_size: f32);
}

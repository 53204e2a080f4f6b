use image::Rgba;
use serde::{Serialize, Serializer};

use super::style::format_color;
use super::surface::{RectF, Surface};

/// Width of one character relative to the font size when no font metrics exist.
pub const ESTIMATED_ADVANCE: f32 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    FillRect {
        rect: RectF,
        #[serde(serialize_with = "hex_color")]
        color: Rgba<u8>,
    },
    StrokeRect {
        rect: RectF,
        #[serde(serialize_with = "hex_color")]
        color: Rgba<u8>,
        width: f32,
    },
    FillText {
        text: String,
        x: f32,
        y: f32,
        #[serde(serialize_with = "hex_color")]
        color: Rgba<u8>,
        font_size: f32,
    },
}

fn hex_color<S: Serializer>(color: &Rgba<u8>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_color(*color))
}

/// Surface that records drawing calls instead of rasterising them.
///
/// Text is measured at a fixed advance per character so layouts are
/// reproducible without a font.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }

    pub fn stroked_rects(&self) -> impl Iterator<Item = (RectF, Rgba<u8>)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::StrokeRect { rect, color, .. } => Some((*rect, *color)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::FillText { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    fn fill_rect(&mut self, rect: RectF, color: Rgba<u8>) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: RectF, color: Rgba<u8>, width: f32) {
        self.ops.push(DrawOp::StrokeRect { rect, color, width });
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * ESTIMATED_ADVANCE
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>, font_size: f32) {
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            x,
            y,
            color,
            font_size,
        });
    }
}

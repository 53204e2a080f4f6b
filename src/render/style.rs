use anyhow::{anyhow, Result};
use image::Rgba;

/// Colours for one style tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierStyle {
    pub stroke: Rgba<u8>,
    /// Semi-transparent box fill.
    pub fill: Rgba<u8>,
    /// Label background, mostly opaque.
    pub label: Rgba<u8>,
}

/// Named drawing constants for the overlay.
///
/// Passed explicitly to the renderer; nothing is read from ambient theme state.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    pub fault: TierStyle,
    pub normal: TierStyle,
    pub text_color: Rgba<u8>,
    pub stroke_width: f32,
    pub font_size: f32,
    /// Height of the label background above the box.
    pub label_height: f32,
    /// Extra width added to the measured label text.
    pub label_padding: f32,
    /// Horizontal offset of the text inside the label background.
    pub text_inset: f32,
    /// Distance of the text baseline above the box's top edge.
    pub text_baseline_offset: f32,
}

impl OverlayStyle {
    pub fn tier(&self, is_fault: bool) -> &TierStyle {
        if is_fault {
            &self.fault
        } else {
            &self.normal
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            // red-500
            fault: TierStyle {
                stroke: Rgba([0xef, 0x44, 0x44, 0xff]),
                fill: Rgba([0xef, 0x44, 0x44, FILL_ALPHA_FAULT]),
                label: Rgba([0xef, 0x44, 0x44, LABEL_ALPHA]),
            },
            // green-500
            normal: TierStyle {
                stroke: Rgba([0x22, 0xc5, 0x5e, 0xff]),
                fill: Rgba([0x22, 0xc5, 0x5e, FILL_ALPHA_NORMAL]),
                label: Rgba([0x22, 0xc5, 0x5e, LABEL_ALPHA]),
            },
            text_color: Rgba([0xff, 0xff, 0xff, 0xff]),
            stroke_width: 2.0,
            font_size: 14.0,
            label_height: 20.0,
            label_padding: 10.0,
            text_inset: 5.0,
            text_baseline_offset: 5.0,
        }
    }
}

// 0.3, 0.2 and 0.8 opacity
const FILL_ALPHA_FAULT: u8 = 77;
const FILL_ALPHA_NORMAL: u8 = 51;
const LABEL_ALPHA: u8 = 204;

/// Parse `#rrggbb` or `#rrggbbaa`.
pub fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let hex = value
        .trim()
        .strip_prefix('#')
        .ok_or_else(|| anyhow!("color '{}' must start with '#'", value))?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(anyhow!("color '{}' must be #rrggbb or #rrggbbaa", value));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| anyhow!("color '{}' has a non-hex channel", value))
    };
    let a = if hex.len() == 8 { channel(6)? } else { 0xff };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, a]))
}

pub fn format_color(color: Rgba<u8>) -> String {
    let [r, g, b, a] = color.0;
    if a == 0xff {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_color("#ef4444").unwrap(), Rgba([239, 68, 68, 255]));
        assert_eq!(parse_color("#22c55e33").unwrap(), Rgba([34, 197, 94, 51]));
        assert!(parse_color("ef4444").is_err());
        assert!(parse_color("#ef44").is_err());
        assert!(parse_color("#gg4444").is_err());
    }

    #[test]
    fn default_alphas_match_opacities() {
        let style = OverlayStyle::default();
        assert_eq!(style.fault.fill.0[3], 77);
        assert_eq!(style.normal.fill.0[3], 51);
        assert_eq!(style.fault.label.0[3], 204);
        assert_eq!(format_color(style.fault.stroke), "#ef4444");
        assert_eq!(format_color(style.normal.fill), "#22c55e33");
    }
}

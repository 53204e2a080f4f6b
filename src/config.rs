use anyhow::{anyhow, Result};
use image::Rgba;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::detect::services::UPLOAD_SERVICE_NAME;
use crate::detect::{FaultClasses, DEFAULT_FAULT_CLASS, DEFAULT_MIN_CONFIDENCE};
use crate::frame::{FrameEncoding, Overlay};
use crate::render::{default_font, load_font, parse_color, OverlayStyle, TierStyle};

const DEFAULT_SERVICE_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SOURCE: &str = "stub://camera";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_INTERVAL_MS: u64 = 1000;
const DEFAULT_OUT_DIR: &str = "overlays";
const DEFAULT_API_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Deserialize, Default)]
struct InspectorConfigFile {
    service: Option<ServiceConfigFile>,
    fault_classes: Option<Vec<String>>,
    min_confidence: Option<f32>,
    live: Option<LiveConfigFile>,
    style: Option<StyleConfigFile>,
    api: Option<ApiConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ServiceConfigFile {
    default: Option<String>,
    url: Option<String>,
    timeout_ms: Option<u64>,
    mock_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LiveConfigFile {
    source: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    interval_ms: Option<u64>,
    encoding: Option<String>,
    out_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct StyleConfigFile {
    fault_color: Option<String>,
    normal_color: Option<String>,
    text_color: Option<String>,
    stroke_width: Option<f32>,
    font_size: Option<f32>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
    max_body_bytes: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct InspectorConfig {
    pub service: ServiceSettings,
    pub fault_classes: Vec<String>,
    /// Detections scored below this are dropped before drawing.
    pub min_confidence: f32,
    pub live: LiveSettings,
    pub style: StyleSettings,
    pub api: ApiSettings,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Name of the service used when a caller does not pick one.
    pub default: String,
    /// Remote detection endpoint; registers the `http` service when set.
    pub url: Option<String>,
    pub timeout: Duration,
    /// Overrides the simulated latency of the mock services.
    pub mock_delay: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub interval: Duration,
    pub encoding: FrameEncoding,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StyleSettings {
    pub fault_color: String,
    pub normal_color: String,
    pub text_color: String,
    pub stroke_width: f32,
    pub font_size: f32,
    pub font_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub addr: String,
    pub max_body_bytes: usize,
}

impl InspectorConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("INSULATOR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: InspectorConfigFile) -> Result<Self> {
        let service_file = file.service.unwrap_or_default();
        let service = ServiceSettings {
            default: service_file
                .default
                .unwrap_or_else(|| UPLOAD_SERVICE_NAME.to_string()),
            url: service_file.url,
            timeout: Duration::from_millis(
                service_file
                    .timeout_ms
                    .unwrap_or(DEFAULT_SERVICE_TIMEOUT_MS),
            ),
            mock_delay: service_file.mock_delay_ms.map(Duration::from_millis),
        };

        let fault_classes = file
            .fault_classes
            .unwrap_or_else(|| vec![DEFAULT_FAULT_CLASS.to_string()]);

        let min_confidence = file.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE);

        let live_file = file.live.unwrap_or_default();
        let encoding = match live_file.encoding.as_deref() {
            Some(name) => name.parse()?,
            None => FrameEncoding::default(),
        };
        let live = LiveSettings {
            source: live_file
                .source
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            width: live_file.width.unwrap_or(DEFAULT_WIDTH),
            height: live_file.height.unwrap_or(DEFAULT_HEIGHT),
            interval: Duration::from_millis(live_file.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS)),
            encoding,
            out_dir: live_file
                .out_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
        };

        let defaults = OverlayStyle::default();
        let style_file = file.style.unwrap_or_default();
        let style = StyleSettings {
            fault_color: style_file
                .fault_color
                .unwrap_or_else(|| rgb_hex(defaults.fault.stroke)),
            normal_color: style_file
                .normal_color
                .unwrap_or_else(|| rgb_hex(defaults.normal.stroke)),
            text_color: style_file
                .text_color
                .unwrap_or_else(|| rgb_hex(defaults.text_color)),
            stroke_width: style_file.stroke_width.unwrap_or(defaults.stroke_width),
            font_size: style_file.font_size.unwrap_or(defaults.font_size),
            font_path: style_file.font_path,
        };

        let api_file = file.api.unwrap_or_default();
        let api = ApiSettings {
            addr: api_file
                .addr
                .unwrap_or_else(|| DEFAULT_API_ADDR.to_string()),
            max_body_bytes: api_file.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
        };

        Ok(Self {
            service,
            fault_classes,
            min_confidence,
            live,
            style,
            api,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(name) = std::env::var("INSULATOR_SERVICE") {
            if !name.trim().is_empty() {
                self.service.default = name.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("INSULATOR_SERVICE_URL") {
            if !url.trim().is_empty() {
                self.service.url = Some(url.trim().to_string());
            }
        }
        if let Ok(classes) = std::env::var("INSULATOR_FAULT_CLASSES") {
            let parsed = split_csv(&classes);
            if !parsed.is_empty() {
                self.fault_classes = parsed;
            }
        }
        if let Ok(min) = std::env::var("INSULATOR_MIN_CONFIDENCE") {
            self.min_confidence = min.trim().parse().map_err(|_| {
                anyhow!("INSULATOR_MIN_CONFIDENCE must be a number between 0 and 1")
            })?;
        }
        if let Ok(source) = std::env::var("INSULATOR_SOURCE") {
            if !source.trim().is_empty() {
                self.live.source = source.trim().to_string();
            }
        }
        if let Ok(interval) = std::env::var("INSULATOR_INTERVAL_MS") {
            let millis: u64 = interval.trim().parse().map_err(|_| {
                anyhow!("INSULATOR_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.live.interval = Duration::from_millis(millis);
        }
        if let Ok(addr) = std::env::var("INSULATOR_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api.addr = addr.trim().to_string();
            }
        }
        if let Ok(font) = std::env::var("INSULATOR_FONT") {
            if !font.trim().is_empty() {
                self.style.font_path = Some(PathBuf::from(font.trim()));
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.fault_classes = self
            .fault_classes
            .iter()
            .map(|class| class.trim().to_string())
            .filter(|class| !class.is_empty())
            .collect();
        if self.fault_classes.is_empty() {
            return Err(anyhow!("at least one fault class is required"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(anyhow!(
                "min_confidence must be within [0, 1] (got {})",
                self.min_confidence
            ));
        }
        if self.service.default.trim().is_empty() {
            return Err(anyhow!("default detection service name is empty"));
        }
        if self.service.timeout.is_zero() {
            return Err(anyhow!("service timeout must be greater than zero"));
        }
        if self.live.width == 0 || self.live.height == 0 {
            return Err(anyhow!("live frame size must be non-zero"));
        }
        if self.live.interval.is_zero() {
            return Err(anyhow!("capture interval must be greater than zero"));
        }
        self.overlay_style()?;
        if !(self.style.stroke_width.is_finite() && self.style.stroke_width > 0.0) {
            return Err(anyhow!("stroke width must be positive"));
        }
        if !(self.style.font_size.is_finite() && self.style.font_size > 0.0) {
            return Err(anyhow!("font size must be positive"));
        }
        if self.api.max_body_bytes == 0 {
            return Err(anyhow!("api max_body_bytes must be greater than zero"));
        }
        Ok(())
    }

    pub fn fault_classes(&self) -> FaultClasses {
        FaultClasses::new(self.fault_classes.iter().cloned())
    }

    /// Overlay style with the configured colours applied. Alphas of the fill and
    /// label backgrounds stay at their defaults.
    pub fn overlay_style(&self) -> Result<OverlayStyle> {
        let defaults = OverlayStyle::default();
        Ok(OverlayStyle {
            fault: recolor(defaults.fault, parse_color(&self.style.fault_color)?),
            normal: recolor(defaults.normal, parse_color(&self.style.normal_color)?),
            text_color: parse_color(&self.style.text_color)?,
            stroke_width: self.style.stroke_width,
            font_size: self.style.font_size,
            ..defaults
        })
    }

    /// Style, classifier, threshold and font for the renderer. The bundled
    /// font is used unless a font file is configured.
    pub fn overlay(&self) -> Result<Overlay> {
        let font = match &self.style.font_path {
            Some(path) => load_font(path)?,
            None => default_font()?,
        };
        Ok(Overlay::new(
            self.overlay_style()?,
            Arc::new(self.fault_classes()),
            Some(font),
        )
        .with_min_confidence(self.min_confidence))
    }
}

fn recolor(tier: TierStyle, base: Rgba<u8>) -> TierStyle {
    let with_alpha = |alpha: u8| Rgba([base.0[0], base.0[1], base.0[2], alpha]);
    TierStyle {
        stroke: base,
        fill: with_alpha(tier.fill.0[3]),
        label: with_alpha(tier.label.0[3]),
    }
}

fn rgb_hex(color: Rgba<u8>) -> String {
    let [r, g, b, _] = color.0;
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

fn read_config_file(path: &Path) -> Result<InspectorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::FaultClassifier;

    #[test]
    fn defaults_are_valid() {
        let mut cfg = InspectorConfig::from_file(InspectorConfigFile::default()).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.service.default, UPLOAD_SERVICE_NAME);
        assert_eq!(cfg.live.source, DEFAULT_SOURCE);
        assert_eq!(cfg.live.interval, Duration::from_millis(1000));
        assert_eq!(cfg.overlay_style().unwrap(), OverlayStyle::default());
        assert!(cfg.fault_classes().is_fault("insulator_fault"));
        assert_eq!(cfg.min_confidence, 0.5);
        let overlay = cfg.overlay().unwrap();
        assert!(overlay.font.is_some());
        assert_eq!(overlay.min_confidence, 0.5);
    }

    #[test]
    fn recolor_keeps_tier_alphas() {
        let tier = recolor(OverlayStyle::default().fault, Rgba([1, 2, 3, 255]));
        assert_eq!(tier.stroke, Rgba([1, 2, 3, 255]));
        assert_eq!(tier.fill, Rgba([1, 2, 3, 77]));
        assert_eq!(tier.label, Rgba([1, 2, 3, 204]));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = InspectorConfig::from_file(InspectorConfigFile::default()).unwrap();
        cfg.style.fault_color = "red".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = InspectorConfig::from_file(InspectorConfigFile::default()).unwrap();
        cfg.fault_classes = vec![" ".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = InspectorConfig::from_file(InspectorConfigFile::default()).unwrap();
        cfg.live.interval = Duration::ZERO;
        assert!(cfg.validate().is_err());

        let mut cfg = InspectorConfig::from_file(InspectorConfigFile::default()).unwrap();
        cfg.min_confidence = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn split_csv_drops_blanks() {
        assert_eq!(split_csv(" a, ,b ,"), vec!["a", "b"]);
    }
}

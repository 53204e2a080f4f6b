use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use image::Rgba;
use tempfile::Builder;

use insulator_inspect::config::InspectorConfig;
use insulator_inspect::FrameEncoding;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "INSULATOR_CONFIG",
        "INSULATOR_SERVICE",
        "INSULATOR_SERVICE_URL",
        "INSULATOR_FAULT_CLASSES",
        "INSULATOR_MIN_CONFIDENCE",
        "INSULATOR_SOURCE",
        "INSULATOR_INTERVAL_MS",
        "INSULATOR_API_ADDR",
        "INSULATOR_FONT",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    let json = r##"{
        "service": { "default": "mock-webcam", "timeout_ms": 2500, "mock_delay_ms": 0 },
        "fault_classes": ["insulator_fault", "cracked_disc"],
        "min_confidence": 0.25,
        "live": { "source": "stub://tower_7", "width": 320, "height": 240, "interval_ms": 500, "encoding": "png" },
        "style": { "fault_color": "#ff0000", "stroke_width": 3 },
        "api": { "addr": "0.0.0.0:9100" }
    }"##;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("INSULATOR_CONFIG", file.path());
    std::env::set_var("INSULATOR_INTERVAL_MS", "250");
    std::env::set_var("INSULATOR_MIN_CONFIDENCE", "0.7");
    std::env::set_var("INSULATOR_API_ADDR", "127.0.0.1:9200");

    let cfg = InspectorConfig::load().expect("load config");

    assert_eq!(cfg.service.default, "mock-webcam");
    assert_eq!(cfg.service.timeout, Duration::from_millis(2500));
    assert_eq!(cfg.service.mock_delay, Some(Duration::ZERO));
    assert_eq!(cfg.fault_classes, vec!["insulator_fault", "cracked_disc"]);
    assert_eq!(cfg.live.source, "stub://tower_7");
    assert_eq!((cfg.live.width, cfg.live.height), (320, 240));
    assert_eq!(cfg.live.interval, Duration::from_millis(250));
    assert_eq!(cfg.live.encoding, FrameEncoding::Png);
    assert_eq!(cfg.api.addr, "127.0.0.1:9200");
    assert_eq!(cfg.min_confidence, 0.7);
    assert_eq!(cfg.overlay().unwrap().min_confidence, 0.7);

    let style = cfg.overlay_style().unwrap();
    assert_eq!(style.fault.stroke, Rgba([255, 0, 0, 255]));
    assert_eq!(style.fault.fill, Rgba([255, 0, 0, 77]));
    assert_eq!(style.stroke_width, 3.0);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r##"
fault_classes = ["flashover"]

[service]
default = "mock-upload"

[live]
source = "site/tower.png"
out_dir = "/tmp/overlays"

[style]
normal_color = "#0000ff"
"##;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("INSULATOR_CONFIG", file.path());
    std::env::set_var("INSULATOR_FAULT_CLASSES", "flashover, broken_shed");

    let cfg = InspectorConfig::load().expect("load config");
    assert_eq!(cfg.fault_classes, vec!["flashover", "broken_shed"]);
    assert_eq!(cfg.live.source, "site/tower.png");
    assert_eq!(cfg.live.out_dir, std::path::PathBuf::from("/tmp/overlays"));
    assert_eq!(
        cfg.overlay_style().unwrap().normal.stroke,
        Rgba([0, 0, 255, 255])
    );
    assert!(cfg.fault_classes().contains("broken_shed"));
    assert!(!cfg.fault_classes().contains("insulator_fault"));
    assert_eq!(cfg.min_confidence, 0.5);

    clear_env();
}

#[test]
fn defaults_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = InspectorConfig::load().expect("defaults");
    assert_eq!(cfg.service.default, "mock-upload");
    assert_eq!(cfg.service.url, None);
    assert_eq!(cfg.live.source, "stub://camera");
    assert_eq!(cfg.live.interval, Duration::from_secs(1));
    assert_eq!(cfg.api.addr, "127.0.0.1:8787");
    assert_eq!(cfg.min_confidence, 0.5);
    let overlay = cfg.overlay().unwrap();
    assert!(overlay.font.is_some());
    assert_eq!(overlay.min_confidence, 0.5);
}

#[test]
fn invalid_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("INSULATOR_INTERVAL_MS", "soon");
    assert!(InspectorConfig::load().is_err());

    std::env::set_var("INSULATOR_INTERVAL_MS", "0");
    assert!(InspectorConfig::load().is_err());
    clear_env();

    std::env::set_var("INSULATOR_MIN_CONFIDENCE", "1.2");
    assert!(InspectorConfig::load().is_err());
    std::env::set_var("INSULATOR_MIN_CONFIDENCE", "high");
    assert!(InspectorConfig::load().is_err());
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(br##"{ "style": { "text_color": "white" } }"##)
        .unwrap();
    std::env::set_var("INSULATOR_CONFIG", file.path());
    assert!(InspectorConfig::load().is_err());

    std::env::set_var("INSULATOR_CONFIG", "/nonexistent/insulator.json");
    assert!(InspectorConfig::load().is_err());

    clear_env();
}

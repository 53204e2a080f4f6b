//! annotate - one-shot detection over a single image.
//!
//! Loads an image, runs it through the configured detection service, draws the
//! overlay and prints the results panel. `--dry-run` prints the draw calls as
//! JSON instead of writing an image.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use insulator_inspect::{
    detect::wire,
    ingest::file::load_image,
    render::{annotate, RecordingSurface},
    ui::{self, Ui, UiMode},
    Frame, InspectorConfig, ServiceRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "annotate", about = "Detect insulator faults in an image and draw the overlay")]
struct Args {
    /// Image to inspect (PNG or JPEG)
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Output path for the annotated image (default: <image>_annotated.png)
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Detection service to use (mock-upload, mock-webcam, http)
    #[arg(long, env = "INSULATOR_SERVICE")]
    service: Option<String>,

    /// Print the draw calls as JSON instead of writing an image
    #[arg(long)]
    dry_run: bool,

    /// Print the detection response in wire format
    #[arg(long)]
    json: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::detect(args.ui);

    let mut config = InspectorConfig::load()?;
    if let Some(service) = &args.service {
        config.service.default = service.clone();
    }
    let registry = ServiceRegistry::from_settings(&config.service)?;
    let overlay = config.overlay()?;

    let frame = {
        let _stage = ui.stage("Load image");
        Frame::new(1, load_image(&args.image)?)
    };
    let batch = {
        let _stage = ui.stage("Run detection");
        let request = frame.detection_request(config.live.encoding)?;
        registry
            .detect(None, &request)?
            .above_confidence(overlay.min_confidence)
    };

    if args.json {
        println!("{}", String::from_utf8_lossy(&wire::encode_batch(&batch)?));
    }

    if args.dry_run {
        let mut surface = RecordingSurface::new(frame.width(), frame.height());
        let report = annotate(
            &mut surface,
            &batch.detections,
            &overlay.style,
            overlay.classifier.as_ref(),
        )?;
        for skipped in &report.skipped {
            log::warn!("{}", skipped);
        }
        println!("{}", serde_json::to_string_pretty(surface.ops())?);
    } else {
        let out = args
            .out
            .clone()
            .unwrap_or_else(|| default_output_path(&args.image));
        let annotated = {
            let _stage = ui.stage("Draw overlay");
            frame.annotate(batch.clone(), &overlay)?
        };
        annotated
            .image
            .save(&out)
            .map_err(|e| anyhow::anyhow!("writing {}: {}", out.display(), e))?;
        log::info!(
            "annotated image written to {} ({} drawn, {} skipped)",
            out.display(),
            annotated.report.drawn,
            annotated.report.skipped.len()
        );
    }

    println!();
    print!("{}", ui::results_panel(&batch, overlay.classifier.as_ref()));
    Ok(())
}

fn default_output_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    image.with_file_name(format!("{}_annotated.png", stem))
}

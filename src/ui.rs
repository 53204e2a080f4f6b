//! Terminal output for the command-line tools: stage spinners and the
//! detection results panel.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fmt::Write as _;
use std::time::{Duration, Instant};

use crate::detect::{Detection, DetectionBatch, FaultClassifier};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl std::str::FromStr for UiMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "auto" => Ok(UiMode::Auto),
            "plain" => Ok(UiMode::Plain),
            "pretty" => Ok(UiMode::Pretty),
            other => Err(anyhow::anyhow!("unknown ui mode '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    /// Pretty output on a terminal unless `NO_COLOR` is set or plain was asked for.
    pub fn detect(mode: UiMode) -> Self {
        use std::io::IsTerminal;
        let is_tty = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::new(mode, is_tty)
    }

    fn pretty(&self) -> bool {
        self.is_tty && self.mode != UiMode::Plain
    }

    /// Start a named stage; it reports its duration when the guard drops.
    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// One line of the results panel: `insulator fault  92.0%  Position: [120, 80, 200, 160]`.
pub fn detection_line(detection: &Detection) -> String {
    let b = &detection.bbox;
    format!(
        "{}  {:.1}%  Position: [{}, {}, {}, {}]",
        detection.display_class(),
        detection.confidence * 100.0,
        b.x,
        b.y,
        b.width,
        b.height
    )
}

/// Fault badge followed by one line per detection.
pub fn results_panel(batch: &DetectionBatch, classifier: &dyn FaultClassifier) -> String {
    let mut out = String::new();
    let badge = if batch.has_fault(classifier) {
        "Fault Detected"
    } else {
        "No Fault"
    };
    let _ = writeln!(out, "Detection Results  [{}]", badge);
    if batch.is_empty() {
        let _ = writeln!(out, "  (no detections)");
    }
    for detection in batch.iter() {
        let marker = if classifier.is_fault(&detection.class) {
            "!"
        } else {
            "-"
        };
        let _ = writeln!(out, "  {} {}", marker, detection_line(detection));
    }
    out
}

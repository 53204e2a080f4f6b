//! Detection overlay rendering.
//!
//! `annotate` paints a box, a translucent fill and a label for every detection
//! onto a `Surface` that already holds the source image. Styling comes in as
//! an explicit `OverlayStyle`; the fault/normal split comes from an injected
//! `FaultClassifier`.

mod annotate;
mod raster;
mod recording;
mod style;
mod surface;

pub use annotate::{annotate, label_text, AnnotateError, AnnotationReport};
pub use raster::{default_font, load_font, RasterSurface};
pub use recording::{DrawOp, RecordingSurface};
pub use style::{format_color, parse_color, OverlayStyle, TierStyle};
pub use surface::{RectF, Surface};

//! Insulator fault inspection
//!
//! Draws object-detection results over inspection imagery and drives the
//! periodic capture → detect → overlay loop.
//!
//! # Module Structure
//!
//! - `render`: overlay drawing against an abstract `Surface` (raster and recording backends)
//! - `detect`: detection data model, fault classification, detection services and their wire format
//! - `frame`: captured frames, sequence numbers, annotated frames
//! - `ingest`: frame sources (local images, synthetic `stub://` scenes)
//! - `live`: fixed-interval capture loop with a single in-flight request
//! - `api`: HTTP endpoints serving the detection services
//! - `config`: file + environment configuration
//! - `ui`: terminal stages and the results panel

pub mod api;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod live;
pub mod render;
pub mod ui;

pub use config::InspectorConfig;
pub use detect::{
    BoundingBox, Detection, DetectionBatch, DetectionRequest, DetectionService, FaultClasses,
    FaultClassifier, ServiceRegistry,
};
pub use frame::{AnnotatedFrame, Frame, FrameEncoding, FrameSequence, Overlay};
pub use ingest::{open_source, FrameSource, ImageFileSource, SyntheticSource};
pub use live::{LiveConfig, LiveDetection, LiveHandle, LiveStats, OverlaySink};
pub use render::{annotate, AnnotateError, AnnotationReport, OverlayStyle, Surface};

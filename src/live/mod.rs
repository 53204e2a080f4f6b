//! Live capture loop.
//!
//! A fixed-interval ticker captures frames and hands them to the detection
//! service with at most one request in flight. Successful results are drawn
//! on the frame they were requested for and presented, unless a newer overlay
//! is already on display.

mod guard;
mod runner;
mod sink;
mod slot;

pub use guard::{InFlightGuard, InFlightPermit};
pub use runner::{LiveConfig, LiveDetection, LiveHandle, LiveStats};
pub use sink::{DirectorySink, OverlaySink};
pub use slot::OverlaySlot;

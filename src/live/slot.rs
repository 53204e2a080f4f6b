use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::frame::AnnotatedFrame;

/// Holds the most recently presented overlay.
///
/// A frame is accepted only when its sequence number is newer than the one on
/// display, so a late result for an older frame never replaces a newer overlay.
#[derive(Debug, Default)]
pub struct OverlaySlot {
    current: Mutex<Option<AnnotatedFrame>>,
}

impl OverlaySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a frame for display. Returns the frame back when it is stale.
    pub fn offer(&self, frame: AnnotatedFrame) -> Result<Option<AnnotatedFrame>> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| anyhow!("overlay slot lock poisoned"))?;
        if let Some(shown) = current.as_ref() {
            if frame.seq <= shown.seq {
                return Ok(Some(frame));
            }
        }
        *current = Some(frame);
        Ok(None)
    }

    /// Sequence number on display (0 when nothing has been shown).
    pub fn current_seq(&self) -> u64 {
        self.current
            .lock()
            .map(|c| c.as_ref().map(|f| f.seq).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn latest(&self) -> Option<AnnotatedFrame> {
        self.current.lock().ok().and_then(|c| c.clone())
    }
}

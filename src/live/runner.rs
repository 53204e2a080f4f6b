use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::detect::SharedService;
use crate::frame::{Frame, FrameEncoding, FrameSequence, Overlay};
use crate::ingest::FrameSource;

use super::guard::{InFlightGuard, InFlightPermit};
use super::sink::OverlaySink;
use super::slot::OverlaySlot;

#[derive(Clone, Copy, Debug)]
pub struct LiveConfig {
    /// Time between capture ticks.
    pub interval: Duration,
    /// Encoding of the payload sent to the detection service.
    pub encoding: FrameEncoding,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            encoding: FrameEncoding::Jpeg,
        }
    }
}

/// Counters for one run of the capture loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiveStats {
    pub frames_captured: u64,
    /// Ticks skipped because a detection request was still outstanding.
    pub ticks_dropped: u64,
    pub capture_failures: u64,
    pub detection_failures: u64,
    pub annotate_failures: u64,
    pub frames_presented: u64,
    /// Results older than the overlay already on display.
    pub stale_discarded: u64,
    /// Results that arrived after the run was stopped.
    pub cancelled_discarded: u64,
    pub sink_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames_captured: AtomicU64,
    ticks_dropped: AtomicU64,
    capture_failures: AtomicU64,
    detection_failures: AtomicU64,
    annotate_failures: AtomicU64,
    frames_presented: AtomicU64,
    stale_discarded: AtomicU64,
    cancelled_discarded: AtomicU64,
    sink_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LiveStats {
        LiveStats {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            ticks_dropped: self.ticks_dropped.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            detection_failures: self.detection_failures.load(Ordering::Relaxed),
            annotate_failures: self.annotate_failures.load(Ordering::Relaxed),
            frames_presented: self.frames_presented.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            cancelled_discarded: self.cancelled_discarded.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}

/// Periodic capture → detect → annotate → present loop.
///
/// One tick per `interval`. A tick captures a frame only when no detection
/// request is outstanding; otherwise it is dropped. Results are rendered only
/// on success and only when newer than the overlay on display. The loop can be
/// spawned again after a stop; sequence numbers keep increasing.
pub struct LiveDetection {
    config: LiveConfig,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    service: SharedService,
    sink: Arc<Mutex<dyn OverlaySink>>,
    overlay: Overlay,
    sequence: Arc<FrameSequence>,
    slot: Arc<OverlaySlot>,
}

impl LiveDetection {
    pub fn new<S: OverlaySink + 'static>(
        config: LiveConfig,
        source: Box<dyn FrameSource>,
        service: SharedService,
        overlay: Overlay,
        sink: S,
    ) -> Self {
        Self {
            config,
            source: Arc::new(Mutex::new(source)),
            service,
            sink: Arc::new(Mutex::new(sink)),
            overlay,
            sequence: Arc::new(FrameSequence::new()),
            slot: Arc::new(OverlaySlot::new()),
        }
    }

    /// The overlay currently on display.
    pub fn slot(&self) -> Arc<OverlaySlot> {
        Arc::clone(&self.slot)
    }

    /// Connect the source and start ticking.
    pub fn spawn(&self) -> Result<LiveHandle> {
        if self.config.interval.is_zero() {
            return Err(anyhow!("capture interval must be greater than zero"));
        }
        {
            let mut source = self
                .source
                .lock()
                .map_err(|_| anyhow!("frame source lock poisoned"))?;
            source.connect()?;
            log::info!(
                "live detection started: source={} interval={}ms",
                source.name(),
                self.config.interval.as_millis()
            );
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (job_tx, job_rx) = mpsc::sync_channel::<Job>(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let ticker = Ticker {
            interval: self.config.interval,
            source: Arc::clone(&self.source),
            sequence: Arc::clone(&self.sequence),
            guard: InFlightGuard::new(),
            counters: Arc::clone(&counters),
        };
        let worker = Worker {
            encoding: self.config.encoding,
            service: Arc::clone(&self.service),
            sink: Arc::clone(&self.sink),
            overlay: self.overlay.clone(),
            slot: Arc::clone(&self.slot),
            cancelled: Arc::clone(&cancelled),
            counters: Arc::clone(&counters),
        };

        let worker_join = std::thread::Builder::new()
            .name("live-detect".to_string())
            .spawn(move || worker.run(job_rx))?;
        let ticker_join = std::thread::Builder::new()
            .name("live-ticker".to_string())
            .spawn(move || ticker.run(stop_rx, job_tx))?;

        Ok(LiveHandle {
            stop_tx: Some(stop_tx),
            cancelled,
            counters,
            ticker: Some(ticker_join),
            worker: Some(worker_join),
        })
    }
}

struct Job {
    frame: Frame,
    permit: InFlightPermit,
}

struct Ticker {
    interval: Duration,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    sequence: Arc<FrameSequence>,
    guard: Arc<InFlightGuard>,
    counters: Arc<Counters>,
}

impl Ticker {
    fn run(self, stop_rx: Receiver<()>, job_tx: SyncSender<Job>) {
        loop {
            match stop_rx.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            let Some(job) = self.tick() else {
                continue;
            };
            if job_tx.send(job).is_err() {
                log::warn!("live detection worker exited; stopping ticker");
                break;
            }
        }
    }

    fn tick(&self) -> Option<Job> {
        let Some(permit) = self.guard.try_acquire() else {
            Counters::bump(&self.counters.ticks_dropped);
            log::debug!("tick dropped: detection request still in flight");
            return None;
        };
        let captured = match self.source.lock() {
            Ok(mut source) => source.capture(),
            Err(_) => Err(anyhow!("frame source lock poisoned")),
        };
        let image = match captured {
            Ok(image) => image,
            Err(e) => {
                Counters::bump(&self.counters.capture_failures);
                log::warn!("frame capture failed: {}", e);
                return None;
            }
        };
        Counters::bump(&self.counters.frames_captured);
        let frame = Frame::new(self.sequence.next(), image);
        Some(Job { frame, permit })
    }
}

struct Worker {
    encoding: FrameEncoding,
    service: SharedService,
    sink: Arc<Mutex<dyn OverlaySink>>,
    overlay: Overlay,
    slot: Arc<OverlaySlot>,
    cancelled: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl Worker {
    fn run(self, job_rx: Receiver<Job>) {
        for Job { frame, permit } in job_rx {
            self.process(frame);
            drop(permit);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn process(&self, frame: Frame) {
        let seq = frame.seq;
        if self.is_cancelled() {
            Counters::bump(&self.counters.cancelled_discarded);
            log::debug!("skipping detection for frame #{}: capture stopped", seq);
            return;
        }
        let batch = match frame
            .detection_request(self.encoding)
            .and_then(|request| {
                let mut service = self
                    .service
                    .lock()
                    .map_err(|_| anyhow!("detection service lock poisoned"))?;
                service.detect(&request)
            }) {
            Ok(batch) => batch,
            Err(e) => {
                Counters::bump(&self.counters.detection_failures);
                log::warn!("detection failed for frame #{}: {}", seq, e);
                return;
            }
        };

        if self.is_cancelled() {
            Counters::bump(&self.counters.cancelled_discarded);
            log::debug!("discarding result for frame #{}: capture stopped", seq);
            return;
        }

        let annotated = match frame.annotate(batch, &self.overlay) {
            Ok(annotated) => annotated,
            Err(e) => {
                Counters::bump(&self.counters.annotate_failures);
                log::warn!("annotation failed for frame #{}: {}", seq, e);
                return;
            }
        };

        match self.slot.offer(annotated.clone()) {
            Ok(None) => {}
            Ok(Some(stale)) => {
                Counters::bump(&self.counters.stale_discarded);
                log::debug!(
                    "discarding stale result for frame #{} (showing #{})",
                    stale.seq,
                    self.slot.current_seq()
                );
                return;
            }
            Err(e) => {
                Counters::bump(&self.counters.sink_failures);
                log::error!("overlay slot unavailable: {}", e);
                return;
            }
        }

        let presented = match self.sink.lock() {
            Ok(mut sink) => sink.present(&annotated),
            Err(_) => Err(anyhow!("overlay sink lock poisoned")),
        };
        match presented {
            Ok(()) => Counters::bump(&self.counters.frames_presented),
            Err(e) => {
                Counters::bump(&self.counters.sink_failures);
                log::warn!("presenting frame #{} failed: {}", seq, e);
            }
        }
    }
}

/// Running capture loop. `stop` cancels the pending tick and joins the threads.
#[derive(Debug)]
pub struct LiveHandle {
    stop_tx: Option<Sender<()>>,
    cancelled: Arc<AtomicBool>,
    counters: Arc<Counters>,
    ticker: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
}

impl LiveHandle {
    pub fn stats(&self) -> LiveStats {
        self.counters.snapshot()
    }

    /// Stop ticking. A detection still in flight is allowed to finish but its
    /// result is discarded; nothing is presented once this returns.
    pub fn stop(mut self) -> Result<LiveStats> {
        self.signal_stop();
        if let Some(join) = self.ticker.take() {
            join.join()
                .map_err(|_| anyhow!("live ticker thread panicked"))?;
        }
        if let Some(join) = self.worker.take() {
            join.join()
                .map_err(|_| anyhow!("live detection thread panicked"))?;
        }
        let stats = self.counters.snapshot();
        log::info!(
            "live detection stopped: captured={} presented={} dropped_ticks={} failures={}",
            stats.frames_captured,
            stats.frames_presented,
            stats.ticks_dropped,
            stats.detection_failures
        );
        Ok(stats)
    }

    fn signal_stop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

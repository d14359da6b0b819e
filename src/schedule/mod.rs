//! Frame scheduling and orchestration.
//!
//! The scheduler is ticked by the rendering surface at its own cadence and
//! never by a source. Each tick pulls at most one frame of work: fetch the
//! latest published frame, skip no-op ticks, run the transform stage under
//! a single-flight guard, and forward the result to the sink. There is no
//! frame queue; under overload the pipeline sheds frames and degrades to a
//! lower effective rate instead of growing memory or latency.

mod stats;
mod status;

pub use stats::FrameStats;
pub use status::{FrameSink, RenderStatus, SignalState};

use crate::source::{ConfigError, FrameSource, RenderConfig, StartError};
use crate::transform::{Effect, RenderBackend, TransformStage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Instant;

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was transformed and handed to the sink.
    Rendered,
    /// A previous tick is still mid-processing; this tick was dropped.
    Busy,
    /// The scheduler is paused; only status was published.
    Paused,
    /// The source has not published any frame.
    NoFrame,
    /// The latest frame was already processed.
    Duplicate,
    /// The transform stage rejected the frame; the tick ended early.
    TransformFailed,
}

struct Inner {
    source: Box<dyn FrameSource>,
    sink: Box<dyn FrameSink>,
    stage: TransformStage,
    effect: Effect,
    mirror: bool,
    paused: bool,
    supersample: bool,
    mode: String,
    target_fps: u32,
    last_timestamp: Option<Instant>,
    debug_text: Option<String>,
    stats: FrameStats,
}

/// Orchestration loop between one source, the transform stage and one sink.
///
/// `tick` takes `&self`, so a scheduler can be shared with whatever drives
/// the render cadence. The state mutex doubles as the single-flight guard:
/// a tick that cannot take it immediately is dropped, and the guard
/// releases on every exit path including panics.
pub struct FrameScheduler {
    inner: Mutex<Inner>,
    busy_ticks: AtomicU64,
}

impl FrameScheduler {
    /// Builds a scheduler from a source, a sink and render settings.
    pub fn new(
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        config: &RenderConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let backend = RenderBackend::negotiate(config.prefer_accelerated);
        let stage = TransformStage::with_backend(config.out_width, config.out_height, backend)
            .map_err(|_| ConfigError::InvalidDimensions)?;

        Ok(Self {
            inner: Mutex::new(Inner {
                source,
                sink,
                stage,
                effect: config.effect,
                mirror: config.mirror,
                paused: false,
                supersample: config.supersample,
                mode: config.mode.clone(),
                target_fps: config.target_fps,
                last_timestamp: None,
                debug_text: None,
                stats: FrameStats::new(),
            }),
            busy_ticks: AtomicU64::new(0),
        })
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one tick of the pipeline.
    pub fn tick(&self) -> TickOutcome {
        let mut inner = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                // Single-flight: a transform is already in progress.
                self.busy_ticks.fetch_add(1, Ordering::Relaxed);
                return TickOutcome::Busy;
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        inner.tick()
    }

    /// Starts the underlying source.
    pub fn start_source(&self) -> Result<(), StartError> {
        self.lock_inner().source.start()
    }

    /// Stops the underlying source.
    pub fn stop_source(&self) {
        self.lock_inner().source.stop();
    }

    /// Returns true while the underlying source is running.
    pub fn source_running(&self) -> bool {
        self.lock_inner().source.is_running()
    }

    /// Sets the active effect.
    pub fn set_effect(&self, effect: Effect) {
        self.lock_inner().effect = effect;
    }

    /// Returns the active effect.
    pub fn effect(&self) -> Effect {
        self.lock_inner().effect
    }

    /// Sets the mirror flag.
    pub fn set_mirror(&self, mirror: bool) {
        self.lock_inner().mirror = mirror;
    }

    /// Flips the mirror flag, returning the new value.
    pub fn toggle_mirror(&self) -> bool {
        let mut inner = self.lock_inner();
        inner.mirror = !inner.mirror;
        inner.mirror
    }

    /// Pauses or resumes ticking.
    pub fn set_paused(&self, paused: bool) {
        self.lock_inner().paused = paused;
    }

    /// Flips the paused flag, returning the new value.
    pub fn toggle_paused(&self) -> bool {
        let mut inner = self.lock_inner();
        inner.paused = !inner.paused;
        inner.paused
    }

    /// Returns true while paused.
    pub fn is_paused(&self) -> bool {
        self.lock_inner().paused
    }

    /// Sets free-form debug text carried in status updates.
    pub fn set_debug_text(&self, text: Option<String>) {
        self.lock_inner().debug_text = text;
    }

    /// Returns true when the accelerated render path is active.
    pub fn accelerated(&self) -> bool {
        self.lock_inner().stage.backend().is_accelerated()
    }

    /// Returns the configured render tick rate.
    pub fn target_fps(&self) -> u32 {
        self.lock_inner().target_fps
    }

    /// Returns a snapshot of pipeline statistics.
    pub fn stats(&self) -> FrameStats {
        self.lock_inner().stats.clone()
    }

    /// Ticks dropped by the single-flight guard.
    pub fn busy_ticks(&self) -> u64 {
        self.busy_ticks.load(Ordering::Relaxed)
    }
}

impl Inner {
    fn tick(&mut self) -> TickOutcome {
        self.stats.record_tick();

        if self.paused {
            let signal = self.signal_state();
            self.push_status(signal);
            return TickOutcome::Paused;
        }

        let Some(frame) = self.source.latest_frame() else {
            self.stats.record_no_frame();
            self.push_status(SignalState::NoSignal);
            return TickOutcome::NoFrame;
        };

        if self.last_timestamp == Some(frame.timestamp()) {
            // A stale read of the same published frame is a no-op, not an
            // error; status still refreshes.
            self.stats.record_duplicate();
            let signal = self.signal_state();
            self.push_status(signal);
            return TickOutcome::Duplicate;
        }

        let started = Instant::now();
        match self.stage.process(&frame, self.effect, self.mirror) {
            Ok(processed) => {
                self.sink.consume(processed);
                self.stats.record_frame(started.elapsed());
                self.last_timestamp = Some(frame.timestamp());
                let signal = self.signal_state();
                self.push_status(signal);
                TickOutcome::Rendered
            }
            Err(e) => {
                self.stats.record_transform_error();
                tracing::warn!("Dropping frame rejected by transform stage: {}", e);
                TickOutcome::TransformFailed
            }
        }
    }

    fn signal_state(&self) -> SignalState {
        let have_frame = self.last_timestamp.is_some() || self.source.latest_frame().is_some();
        match (have_frame, self.source.is_running()) {
            (false, _) => SignalState::NoSignal,
            (true, true) => SignalState::Live,
            (true, false) => SignalState::Stale,
        }
    }

    fn push_status(&mut self, signal: SignalState) {
        let (width, height) = self.stage.output_size();
        let status = RenderStatus {
            fps: self.stats.realized_fps(),
            target_fps: self.target_fps,
            width,
            height,
            source: self.source.label().to_string(),
            effect: self.effect,
            mode: self.mode.clone(),
            accelerated: self.stage.backend().is_accelerated(),
            frame_time_ms: self.stats.frame_time_ms(),
            paused: self.paused,
            mirror: self.mirror,
            supersample: self.supersample,
            signal,
            debug_text: self.debug_text.clone(),
        };
        self.sink.update_status(&status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Frame;
    use crate::transform::ProcessedFrame;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{Receiver, SyncSender};
    use std::sync::Arc;

    /// Source yielding a fresh timestamp each call, or a pinned frame.
    struct TestSource {
        frame: Option<Frame>,
        fresh_each_call: bool,
        running: bool,
        width: u32,
        height: u32,
    }

    impl TestSource {
        fn fresh(width: u32, height: u32) -> Self {
            Self {
                frame: None,
                fresh_each_call: true,
                running: true,
                width,
                height,
            }
        }

        fn pinned(frame: Frame) -> Self {
            Self {
                frame: Some(frame),
                fresh_each_call: false,
                running: true,
                width: 0,
                height: 0,
            }
        }
    }

    impl FrameSource for TestSource {
        fn start(&mut self) -> Result<(), StartError> {
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.running = false;
        }

        fn latest_frame(&self) -> Option<Frame> {
            if self.fresh_each_call {
                let len = (self.width * self.height * 4) as usize;
                Some(Frame::from_bytes(vec![128u8; len], self.width, self.height, 0))
            } else {
                self.frame.clone()
            }
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn label(&self) -> &str {
            "test"
        }
    }

    #[derive(Default)]
    struct SinkState {
        consumed: usize,
        statuses: Vec<RenderStatus>,
    }

    struct RecordingSink {
        state: Arc<Mutex<SinkState>>,
        // When set, consume blocks: announce entry, then wait for release.
        gate: Option<(SyncSender<()>, Receiver<()>)>,
        concurrent: Arc<AtomicUsize>,
        max_concurrent: Arc<AtomicUsize>,
    }

    impl RecordingSink {
        fn new(state: Arc<Mutex<SinkState>>) -> Self {
            Self {
                state,
                gate: None,
                concurrent: Arc::new(AtomicUsize::new(0)),
                max_concurrent: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FrameSink for RecordingSink {
        fn consume(&mut self, _frame: &ProcessedFrame) {
            let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(now, Ordering::SeqCst);
            if let Some((entered, release)) = &self.gate {
                entered.send(()).unwrap();
                release.recv().unwrap();
            }
            self.state.lock().unwrap().consumed += 1;
            self.concurrent.fetch_sub(1, Ordering::SeqCst);
        }

        fn update_status(&mut self, status: &RenderStatus) {
            self.state.lock().unwrap().statuses.push(status.clone());
        }
    }

    fn scheduler_with(
        source: Box<dyn FrameSource>,
        sink: RecordingSink,
    ) -> FrameScheduler {
        let config = RenderConfig {
            out_width: 4,
            out_height: 4,
            ..Default::default()
        };
        FrameScheduler::new(source, Box::new(sink), &config).unwrap()
    }

    #[test]
    fn test_tick_renders_fresh_frame() {
        let state = Arc::new(Mutex::new(SinkState::default()));
        let sink = RecordingSink::new(Arc::clone(&state));
        let scheduler = scheduler_with(Box::new(TestSource::fresh(8, 8)), sink);

        assert_eq!(scheduler.tick(), TickOutcome::Rendered);

        let state = state.lock().unwrap();
        assert_eq!(state.consumed, 1);
        let status = state.statuses.last().unwrap();
        assert_eq!(status.signal, SignalState::Live);
        assert!(!status.paused);
    }

    #[test]
    fn test_no_frame_publishes_no_signal() {
        let mut source = TestSource::fresh(8, 8);
        source.fresh_each_call = false;
        let state = Arc::new(Mutex::new(SinkState::default()));
        let sink = RecordingSink::new(Arc::clone(&state));
        let scheduler = scheduler_with(Box::new(source), sink);

        assert_eq!(scheduler.tick(), TickOutcome::NoFrame);

        let state = state.lock().unwrap();
        assert_eq!(state.consumed, 0);
        assert_eq!(state.statuses.last().unwrap().signal, SignalState::NoSignal);
    }

    #[test]
    fn test_duplicate_frame_is_skipped_but_status_refreshes() {
        let frame = Frame::from_bytes(vec![100u8; 8 * 8 * 4], 8, 8, 1);
        let state = Arc::new(Mutex::new(SinkState::default()));
        let sink = RecordingSink::new(Arc::clone(&state));
        let scheduler = scheduler_with(Box::new(TestSource::pinned(frame)), sink);

        assert_eq!(scheduler.tick(), TickOutcome::Rendered);
        assert_eq!(scheduler.tick(), TickOutcome::Duplicate);
        assert_eq!(scheduler.tick(), TickOutcome::Duplicate);

        let state = state.lock().unwrap();
        assert_eq!(state.consumed, 1);
        assert_eq!(state.statuses.len(), 3);
    }

    #[test]
    fn test_paused_tick_publishes_status_only() {
        let state = Arc::new(Mutex::new(SinkState::default()));
        let sink = RecordingSink::new(Arc::clone(&state));
        let scheduler = scheduler_with(Box::new(TestSource::fresh(8, 8)), sink);

        scheduler.set_paused(true);
        assert_eq!(scheduler.tick(), TickOutcome::Paused);

        let state = state.lock().unwrap();
        assert_eq!(state.consumed, 0);
        assert!(state.statuses.last().unwrap().paused);
    }

    #[test]
    fn test_transform_failure_does_not_stall_later_ticks() {
        // First frame violates the length contract, the next one is fine.
        struct FlakySource {
            calls: AtomicUsize,
        }
        impl FrameSource for FlakySource {
            fn start(&mut self) -> Result<(), StartError> {
                Ok(())
            }
            fn stop(&mut self) {}
            fn latest_frame(&self) -> Option<Frame> {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                Some(if n == 0 {
                    Frame::from_bytes(vec![0u8; 3], 8, 8, 1)
                } else {
                    Frame::from_bytes(vec![50u8; 8 * 8 * 4], 8, 8, 2)
                })
            }
            fn is_running(&self) -> bool {
                true
            }
            fn label(&self) -> &str {
                "flaky"
            }
        }

        let state = Arc::new(Mutex::new(SinkState::default()));
        let sink = RecordingSink::new(Arc::clone(&state));
        let source = Box::new(FlakySource {
            calls: AtomicUsize::new(0),
        });
        let scheduler = scheduler_with(source, sink);

        assert_eq!(scheduler.tick(), TickOutcome::TransformFailed);
        assert_eq!(scheduler.tick(), TickOutcome::Rendered);
        assert_eq!(scheduler.stats().transform_errors(), 1);
        assert_eq!(state.lock().unwrap().consumed, 1);
    }

    #[test]
    fn test_single_flight_guard_drops_overlapping_tick() {
        let state = Arc::new(Mutex::new(SinkState::default()));
        let mut sink = RecordingSink::new(Arc::clone(&state));

        let (entered_tx, entered_rx) = std::sync::mpsc::sync_channel(1);
        let (release_tx, release_rx) = std::sync::mpsc::sync_channel(1);
        sink.gate = Some((entered_tx, release_rx));
        let max_concurrent = Arc::clone(&sink.max_concurrent);

        let scheduler = Arc::new(scheduler_with(Box::new(TestSource::fresh(8, 8)), sink));

        let blocked = {
            let scheduler = Arc::clone(&scheduler);
            std::thread::spawn(move || scheduler.tick())
        };

        // Wait until the first tick is inside the sink, then tick again.
        entered_rx.recv().unwrap();
        assert_eq!(scheduler.tick(), TickOutcome::Busy);
        assert_eq!(scheduler.busy_ticks(), 1);

        release_tx.send(()).unwrap();
        assert_eq!(blocked.join().unwrap(), TickOutcome::Rendered);

        // The transform/consume path never ran concurrently.
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
        assert_eq!(state.lock().unwrap().consumed, 1);
    }

    #[test]
    fn test_toggles_are_reflected_in_status() {
        let state = Arc::new(Mutex::new(SinkState::default()));
        let sink = RecordingSink::new(Arc::clone(&state));
        let scheduler = scheduler_with(Box::new(TestSource::fresh(8, 8)), sink);

        assert!(scheduler.toggle_mirror());
        scheduler.set_effect(Effect::Invert);
        scheduler.tick();

        let state = state.lock().unwrap();
        let status = state.statuses.last().unwrap();
        assert!(status.mirror);
        assert_eq!(status.effect, Effect::Invert);
        assert!(!status.accelerated);
    }
}

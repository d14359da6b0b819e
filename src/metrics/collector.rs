//! Metrics collection and registry.

use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

use crate::schedule::FrameScheduler;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of pipeline state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct PipelineSnapshot {
    /// Whether the active source is running.
    pub source_running: bool,
    /// Whether the accelerated render path is active.
    pub accelerated: bool,
    /// Whether the scheduler is paused.
    pub paused: bool,
    /// Realized frames per second over the last completed second.
    pub realized_fps: u32,
    /// Configured render tick rate.
    pub target_fps: u32,
    /// Total frames rendered.
    pub frames_rendered: u64,
    /// Total ticks that acquired the single-flight guard.
    pub ticks: u64,
    /// Ticks dropped by the single-flight guard.
    pub busy_ticks: u64,
    /// Ticks that saw an already-processed frame.
    pub duplicate_ticks: u64,
    /// Ticks that found no frame.
    pub no_frame_ticks: u64,
    /// Frames rejected by the transform stage.
    pub transform_errors: u64,
    /// Most recent frame processing time in milliseconds.
    pub frame_time_ms: Option<f64>,
}

impl PipelineSnapshot {
    /// Captures the current state of a scheduler.
    pub fn from_scheduler(scheduler: &FrameScheduler) -> Self {
        let stats = scheduler.stats();
        Self {
            source_running: scheduler.source_running(),
            accelerated: scheduler.accelerated(),
            paused: scheduler.is_paused(),
            realized_fps: stats.realized_fps(),
            target_fps: scheduler.target_fps(),
            frames_rendered: stats.total_frames(),
            ticks: stats.total_ticks(),
            busy_ticks: scheduler.busy_ticks(),
            duplicate_ticks: stats.duplicate_ticks(),
            no_frame_ticks: stats.no_frame_ticks(),
            transform_errors: stats.transform_errors(),
            frame_time_ms: stats.frame_time_ms(),
        }
    }
}

/// Prometheus metrics registry for the frame pipeline.
pub struct MetricsRegistry {
    registry: Registry,

    // Pipeline state
    source_running: IntGauge,
    accelerated: IntGauge,
    paused: IntGauge,

    // Rates and timing
    realized_fps: IntGauge,
    target_fps: IntGauge,
    frame_time_ms: Gauge,

    // Tick accounting
    frames_rendered_total: IntCounter,
    ticks_total: IntCounter,
    busy_ticks_total: IntCounter,
    duplicate_ticks_total: IntCounter,
    no_frame_ticks_total: IntCounter,
    transform_errors_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all pipeline metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let source_running = IntGauge::new(
            "lumaterm_source_running",
            "Whether the active frame source is running (1=yes, 0=no)",
        )?;
        let accelerated = IntGauge::new(
            "lumaterm_accelerated",
            "Whether the accelerated render path is active (1=yes, 0=no)",
        )?;
        let paused = IntGauge::new(
            "lumaterm_paused",
            "Whether the scheduler is paused (1=yes, 0=no)",
        )?;

        let realized_fps = IntGauge::new(
            "lumaterm_realized_fps",
            "Frames rendered during the last completed second",
        )?;
        let target_fps = IntGauge::new("lumaterm_target_fps", "Configured render tick rate")?;
        let frame_time_ms = Gauge::new(
            "lumaterm_frame_time_ms",
            "Most recent frame processing time in milliseconds",
        )?;

        let frames_rendered_total = IntCounter::new(
            "lumaterm_frames_rendered_total",
            "Total frames transformed and handed to the sink",
        )?;
        let ticks_total = IntCounter::new(
            "lumaterm_ticks_total",
            "Total scheduler ticks that acquired the single-flight guard",
        )?;
        let busy_ticks_total = IntCounter::new(
            "lumaterm_busy_ticks_total",
            "Ticks dropped because a transform was already in progress",
        )?;
        let duplicate_ticks_total = IntCounter::new(
            "lumaterm_duplicate_ticks_total",
            "Ticks that re-read an already-processed frame",
        )?;
        let no_frame_ticks_total = IntCounter::new(
            "lumaterm_no_frame_ticks_total",
            "Ticks that found no published frame",
        )?;
        let transform_errors_total = IntCounter::new(
            "lumaterm_transform_errors_total",
            "Frames rejected by the transform stage",
        )?;

        registry.register(Box::new(source_running.clone()))?;
        registry.register(Box::new(accelerated.clone()))?;
        registry.register(Box::new(paused.clone()))?;
        registry.register(Box::new(realized_fps.clone()))?;
        registry.register(Box::new(target_fps.clone()))?;
        registry.register(Box::new(frame_time_ms.clone()))?;
        registry.register(Box::new(frames_rendered_total.clone()))?;
        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(busy_ticks_total.clone()))?;
        registry.register(Box::new(duplicate_ticks_total.clone()))?;
        registry.register(Box::new(no_frame_ticks_total.clone()))?;
        registry.register(Box::new(transform_errors_total.clone()))?;

        Ok(Self {
            registry,
            source_running,
            accelerated,
            paused,
            realized_fps,
            target_fps,
            frame_time_ms,
            frames_rendered_total,
            ticks_total,
            busy_ticks_total,
            duplicate_ticks_total,
            no_frame_ticks_total,
            transform_errors_total,
        })
    }

    /// Updates all metrics from a snapshot of pipeline state.
    pub fn update(&self, snapshot: &PipelineSnapshot) {
        self.source_running
            .set(if snapshot.source_running { 1 } else { 0 });
        self.accelerated.set(if snapshot.accelerated { 1 } else { 0 });
        self.paused.set(if snapshot.paused { 1 } else { 0 });

        self.realized_fps.set(i64::from(snapshot.realized_fps));
        self.target_fps.set(i64::from(snapshot.target_fps));
        if let Some(ms) = snapshot.frame_time_ms {
            self.frame_time_ms.set(ms);
        }

        // Counters advance by the difference against the snapshot.
        Self::advance(&self.frames_rendered_total, snapshot.frames_rendered);
        Self::advance(&self.ticks_total, snapshot.ticks);
        Self::advance(&self.busy_ticks_total, snapshot.busy_ticks);
        Self::advance(&self.duplicate_ticks_total, snapshot.duplicate_ticks);
        Self::advance(&self.no_frame_ticks_total, snapshot.no_frame_ticks);
        Self::advance(&self.transform_errors_total, snapshot.transform_errors);
    }

    fn advance(counter: &IntCounter, target: u64) {
        let current = counter.get();
        if target > current {
            counter.inc_by(target - current);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = PipelineSnapshot {
            source_running: true,
            accelerated: false,
            paused: false,
            realized_fps: 29,
            target_fps: 30,
            frames_rendered: 120,
            ticks: 130,
            busy_ticks: 2,
            duplicate_ticks: 5,
            no_frame_ticks: 3,
            transform_errors: 0,
            frame_time_ms: Some(4.5),
        };

        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("lumaterm_source_running 1"));
        assert!(output.contains("lumaterm_realized_fps 29"));
        assert!(output.contains("lumaterm_frames_rendered_total 120"));
    }

    #[test]
    fn test_counters_are_monotonic() {
        let registry = MetricsRegistry::new().unwrap();

        let mut snapshot = PipelineSnapshot {
            frames_rendered: 10,
            ..Default::default()
        };
        registry.update(&snapshot);

        // A stale snapshot cannot move a counter backwards.
        snapshot.frames_rendered = 5;
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("lumaterm_frames_rendered_total 10"));
    }
}

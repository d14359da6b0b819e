//! Frame-rate and tick accounting.

use std::time::{Duration, Instant};

/// Rolling pipeline statistics maintained by the scheduler.
///
/// The realized frame rate is a per-wall-clock-second count: frames are
/// tallied into the current window and the tally becomes the reported rate
/// when the window rolls over.
#[derive(Debug, Clone)]
pub struct FrameStats {
    window: Duration,
    window_started: Instant,
    frames_this_window: u32,
    realized_fps: u32,
    last_frame_duration: Option<Duration>,
    total_frames: u64,
    total_ticks: u64,
    duplicate_ticks: u64,
    no_frame_ticks: u64,
    transform_errors: u64,
}

impl FrameStats {
    /// Creates statistics with the standard one-second window.
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    pub(crate) fn with_window(window: Duration) -> Self {
        Self {
            window,
            window_started: Instant::now(),
            frames_this_window: 0,
            realized_fps: 0,
            last_frame_duration: None,
            total_frames: 0,
            total_ticks: 0,
            duplicate_ticks: 0,
            no_frame_ticks: 0,
            transform_errors: 0,
        }
    }

    pub(crate) fn record_tick(&mut self) {
        self.total_ticks += 1;
    }

    pub(crate) fn record_duplicate(&mut self) {
        self.duplicate_ticks += 1;
    }

    pub(crate) fn record_no_frame(&mut self) {
        self.no_frame_ticks += 1;
    }

    pub(crate) fn record_transform_error(&mut self) {
        self.transform_errors += 1;
    }

    pub(crate) fn record_frame(&mut self, duration: Duration) {
        self.total_frames += 1;
        self.last_frame_duration = Some(duration);
        if self.window_started.elapsed() >= self.window {
            self.realized_fps = self.frames_this_window;
            self.frames_this_window = 0;
            self.window_started = Instant::now();
        }
        self.frames_this_window += 1;
    }

    /// Frames rendered in the last completed window.
    #[inline]
    pub fn realized_fps(&self) -> u32 {
        self.realized_fps
    }

    /// Duration of the most recent transform-and-consume pass.
    #[inline]
    pub fn last_frame_duration(&self) -> Option<Duration> {
        self.last_frame_duration
    }

    /// Most recent frame time in milliseconds.
    pub fn frame_time_ms(&self) -> Option<f64> {
        self.last_frame_duration.map(|d| d.as_secs_f64() * 1000.0)
    }

    /// Total frames rendered.
    #[inline]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Total scheduler ticks that acquired the guard.
    #[inline]
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Ticks that saw an already-processed frame.
    #[inline]
    pub fn duplicate_ticks(&self) -> u64 {
        self.duplicate_ticks
    }

    /// Ticks that found no frame at all.
    #[inline]
    pub fn no_frame_ticks(&self) -> u64 {
        self.no_frame_ticks
    }

    /// Frames dropped by transform-stage contract violations.
    #[inline]
    pub fn transform_errors(&self) -> u64 {
        self.transform_errors
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accumulate() {
        let mut stats = FrameStats::new();

        stats.record_tick();
        stats.record_tick();
        stats.record_duplicate();
        stats.record_frame(Duration::from_millis(3));

        assert_eq!(stats.total_ticks(), 2);
        assert_eq!(stats.duplicate_ticks(), 1);
        assert_eq!(stats.total_frames(), 1);
        assert!((stats.frame_time_ms().unwrap() - 3.0).abs() < 0.5);
    }

    #[test]
    fn test_realized_fps_reports_previous_window() {
        let mut stats = FrameStats::with_window(Duration::from_millis(10));

        for _ in 0..5 {
            stats.record_frame(Duration::from_millis(1));
        }
        // Still inside the first window.
        assert_eq!(stats.realized_fps(), 0);

        std::thread::sleep(Duration::from_millis(15));
        stats.record_frame(Duration::from_millis(1));
        assert_eq!(stats.realized_fps(), 5);
    }

    #[test]
    fn test_no_frames_yet() {
        let stats = FrameStats::new();
        assert_eq!(stats.realized_fps(), 0);
        assert!(stats.last_frame_duration().is_none());
        assert!(stats.frame_time_ms().is_none());
    }
}

//! Status reporting toward the rendering surface.

use crate::transform::{Effect, ProcessedFrame};

/// Signal condition of the active source, for display.
///
/// Distinguishes a source that died before producing anything from one
/// that keeps serving its last good frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    /// Source is running and frames are available.
    Live,
    /// Source has stopped; the last good frame is still shown.
    Stale,
    /// No frame has ever been produced.
    NoSignal,
}

impl SignalState {
    /// Returns the signal state for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalState::Live => "live",
            SignalState::Stale => "stale",
            SignalState::NoSignal => "no signal",
        }
    }
}

/// Advisory, display-only pipeline status pushed to the sink.
///
/// Nothing in here feeds back into pipeline behavior.
#[derive(Debug, Clone)]
pub struct RenderStatus {
    /// Realized frames per second over the last completed second.
    pub fps: u32,
    /// Render tick rate the scheduler is driven at.
    pub target_fps: u32,
    /// Output surface width in cells.
    pub width: u32,
    /// Output surface height in cells.
    pub height: u32,
    /// Label of the active source.
    pub source: String,
    /// Active effect.
    pub effect: Effect,
    /// Character ramp or render mode name.
    pub mode: String,
    /// True when the accelerated render path is active.
    pub accelerated: bool,
    /// Most recent frame processing time in milliseconds.
    pub frame_time_ms: Option<f64>,
    /// True while the scheduler is paused.
    pub paused: bool,
    /// Horizontal mirror flag.
    pub mirror: bool,
    /// Supersampling flag, advisory for the surface.
    pub supersample: bool,
    /// Signal condition of the source.
    pub signal: SignalState,
    /// Free-form debug text, if any.
    pub debug_text: Option<String>,
}

/// Trait implemented by the rendering surface.
///
/// The sink receives a luminance field plus post-transform color bytes each
/// rendered tick, and status updates on every tick regardless of outcome.
/// Both references are only valid for the duration of the call.
pub trait FrameSink: Send {
    /// Consumes one processed frame.
    fn consume(&mut self, frame: &ProcessedFrame);

    /// Receives a status update.
    fn update_status(&mut self, status: &RenderStatus);
}

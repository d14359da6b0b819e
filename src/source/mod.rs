//! Frame sources and the published-frame handoff.
//!
//! A source runs its own ingestion activity (a timer-driven generator or an
//! asynchronous subprocess reader) and publishes the latest complete frame
//! into a [`FrameCell`]. The scheduler polls that cell at its own cadence
//! and never blocks waiting for a new frame.

mod cell;
mod config;
mod frame;
mod pattern;
mod stream;

pub use cell::FrameCell;
pub use config::{ConfigError, FileConfig, MetricsConfig, RenderConfig, SourceConfig};
pub use frame::Frame;
pub use pattern::{Pattern, PatternSource};
pub use stream::{FrameAssembler, StreamSource};

use thiserror::Error;

/// Errors that can occur while starting a source.
///
/// Once a source is running it no longer fails to callers: a broken stream
/// transitions [`FrameSource::is_running`] to false while the last good
/// frame stays available.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid source configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn capture process `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("capture process has no stdout pipe")]
    MissingStdout,
    #[error("source is already started")]
    AlreadyStarted,
    #[error("no capture command configured for stream source")]
    MissingCommand,
}

/// Trait implemented by every frame source.
///
/// Sources publish frames on their own schedule; consumers poll
/// [`latest_frame`](Self::latest_frame) and may see the same frame twice or
/// skip frames entirely, both by design.
///
/// `start` must be called from within a Tokio runtime, since sources drive
/// their ingestion on spawned tasks.
pub trait FrameSource: Send {
    /// Begins producing frames. Fails fast if the underlying resource
    /// cannot be acquired.
    fn start(&mut self) -> Result<(), StartError>;

    /// Stops producing frames and releases the underlying resource.
    /// Idempotent; effective even while a read is in flight.
    fn stop(&mut self);

    /// Returns the most recently published frame, or `None` if no frame
    /// has been produced yet.
    fn latest_frame(&self) -> Option<Frame>;

    /// Returns true while the ingestion activity is alive.
    fn is_running(&self) -> bool;

    /// Short human-readable label for status display.
    fn label(&self) -> &str;
}

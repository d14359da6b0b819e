//! Lumaterm Frame Pipeline Library
//!
//! A real-time video-to-text rendering core: ingests raw pixel frames from
//! a live or synthetic source, applies an optional mirror and one image
//! effect in a single pass, reduces each frame to a luminance field sized
//! to the output surface, and hands the result to a renderer at a bounded
//! frame rate.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! source (pattern | stream) → transform (mirror, effect, luminance) → sink
//!        ↑ own timer/reader          ↑ scheduler tick, single-flight
//! ```
//!
//! Sources run their own ingestion activity and publish only the latest
//! complete frame; the scheduler is ticked by the rendering surface and
//! pulls whatever is newest, re-rendering the previous frame if nothing
//! arrived. No frame queue exists anywhere.
//!
//! # Design Principles
//!
//! - **Latest-frame only**: under overload the pipeline sheds frames and
//!   degrades to a lower effective rate, never growing memory or latency
//! - **Publish-after-complete-write**: a reader can never observe a
//!   half-written pixel buffer
//! - **Stale data over no data**: a dead source keeps serving its last
//!   good frame and reports not-running
//! - **Zero steady-state allocation**: the transform stage reuses its
//!   scratch buffers across calls
//!
//! # Example
//!
//! ```no_run
//! use lumaterm::{
//!     schedule::{FrameScheduler, FrameSink, RenderStatus},
//!     source::{PatternSource, RenderConfig, SourceConfig},
//!     transform::ProcessedFrame,
//! };
//!
//! struct StdoutSink;
//!
//! impl FrameSink for StdoutSink {
//!     fn consume(&mut self, frame: &ProcessedFrame) {
//!         println!("frame {}x{}", frame.width(), frame.height());
//!     }
//!     fn update_status(&mut self, _status: &RenderStatus) {}
//! }
//!
//! # #[tokio::main] async fn main() {
//! let source = PatternSource::new(SourceConfig::default());
//! let scheduler = FrameScheduler::new(
//!     Box::new(source),
//!     Box::new(StdoutSink),
//!     &RenderConfig::default(),
//! )
//! .unwrap();
//!
//! scheduler.start_source().unwrap();
//! for _ in 0..10 {
//!     scheduler.tick();
//!     tokio::time::sleep(std::time::Duration::from_millis(33)).await;
//! }
//! scheduler.stop_source();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

#[cfg(feature = "metrics")]
pub mod metrics;
pub mod schedule;
pub mod source;
pub mod transform;

// Re-export commonly used types at crate root
pub use schedule::{FrameScheduler, FrameSink, FrameStats, RenderStatus, SignalState, TickOutcome};
pub use source::{
    FileConfig, Frame, FrameCell, FrameSource, Pattern, PatternSource, RenderConfig, SourceConfig,
    StartError, StreamSource,
};
pub use transform::{Effect, ProcessedFrame, RenderBackend, TransformError, TransformStage};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

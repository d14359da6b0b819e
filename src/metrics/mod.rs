//! Prometheus metrics exporter for the frame pipeline.
//!
//! Provides observability into scheduling behavior by exposing pipeline
//! counters and gauges in Prometheus format via an HTTP endpoint. The
//! exporter is advisory only; nothing here feeds back into the pipeline.
//!
//! # Metrics Exposed
//!
//! ## Pipeline state
//! - `lumaterm_source_running` - Active source liveness (1=yes, 0=no)
//! - `lumaterm_accelerated` - Accelerated render path active (1=yes, 0=no)
//! - `lumaterm_paused` - Scheduler paused (1=yes, 0=no)
//!
//! ## Rates and timing
//! - `lumaterm_realized_fps` - Frames rendered in the last completed second
//! - `lumaterm_target_fps` - Configured render tick rate
//! - `lumaterm_frame_time_ms` - Most recent frame processing time
//!
//! ## Tick accounting
//! - `lumaterm_frames_rendered_total` - Frames handed to the sink
//! - `lumaterm_ticks_total` - Ticks that acquired the single-flight guard
//! - `lumaterm_busy_ticks_total` - Ticks dropped by the guard
//! - `lumaterm_duplicate_ticks_total` - Ticks that re-read a stale frame
//! - `lumaterm_no_frame_ticks_total` - Ticks with no published frame
//! - `lumaterm_transform_errors_total` - Frames rejected by the stage
//!
//! # Example
//!
//! ```no_run
//! use lumaterm::metrics::{MetricsRegistry, PipelineSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("failed to create registry");
//!
//! let snapshot = PipelineSnapshot {
//!     source_running: true,
//!     realized_fps: 29,
//!     target_fps: 30,
//!     frames_rendered: 120,
//!     ticks: 130,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
mod server;

pub use collector::{MetricsError, MetricsRegistry, PipelineSnapshot};
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};

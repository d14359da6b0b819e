//! Frame transform stage.
//!
//! Takes one decoded frame per call, optionally mirrors it, applies at
//! most one image effect, then reduces it to a luminance field at the
//! output resolution. The stage owns every scratch buffer it needs and
//! reuses them across calls, so steady-state processing performs no heap
//! allocation. It is deliberately not reentrant; the scheduler's
//! single-flight guard is what keeps calls serialized.

mod effect;
mod luma;

pub use effect::{Effect, CONTRAST_AMOUNT, POSTERIZE_LEVELS, THRESHOLD_CUTOFF};
pub use luma::{luminance_255, luminance_unit};

use crate::source::Frame;
use thiserror::Error;

/// Errors reported at the transform stage boundary.
///
/// These are caller contract violations, not runtime conditions; a valid
/// frame can always be processed.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("pixel buffer is {actual} bytes, expected {width}x{height}x4 = {expected}")]
    PixelLengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("output dimensions must be non-zero")]
    ZeroOutputDimensions,
}

/// The render path executing the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBackend {
    /// Scalar CPU path, always available.
    Cpu,
    /// Hardware-accelerated path.
    Accelerated,
}

impl RenderBackend {
    /// Resolves the render path for this process.
    ///
    /// The accelerated path has no implementation in this build, so
    /// negotiation deterministically lands on the CPU path; asking for
    /// acceleration logs the degradation instead of hiding it, and the
    /// resulting flag is reported in every status update.
    pub fn negotiate(prefer_accelerated: bool) -> Self {
        if prefer_accelerated {
            tracing::warn!("Accelerated render path unavailable, falling back to CPU");
        }
        RenderBackend::Cpu
    }

    /// Returns true for the accelerated path.
    #[inline]
    pub fn is_accelerated(self) -> bool {
        matches!(self, RenderBackend::Accelerated)
    }
}

/// One fully transformed frame at output resolution.
///
/// Rebuilt into reused allocations on every call; treat it as read-only
/// for the duration of the sink call that receives it.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    width: u32,
    height: u32,
    luminance: Vec<f32>,
    color: Vec<u8>,
}

impl ProcessedFrame {
    fn sized(width: u32, height: u32) -> Self {
        let cells = (width as usize) * (height as usize);
        Self {
            width,
            height,
            luminance: vec![0.0; cells],
            color: vec![0; cells * 4],
        }
    }

    /// Output width in cells.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Output height in cells.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Per-cell luminance in `[0, 1]`, row-major.
    #[inline]
    pub fn luminance(&self) -> &[f32] {
        &self.luminance
    }

    /// Post-transform RGBA bytes at output resolution, for color-capable
    /// sinks that skip the grayscale path.
    #[inline]
    pub fn color(&self) -> &[u8] {
        &self.color
    }
}

/// Reusable transform stage.
///
/// Pure in its outputs with respect to `(frame, effect, mirror)`, but holds
/// scratch buffers sized to the last frame seen. A frame with different
/// dimensions transparently resizes them, so one instance survives a
/// capture-resolution change.
pub struct TransformStage {
    backend: RenderBackend,
    src_width: u32,
    src_height: u32,
    /// Post-mirror, post-effect RGBA plane at source resolution.
    work: Vec<u8>,
    /// Single-channel plane for the edge kernel.
    luma_plane: Vec<u8>,
    output: ProcessedFrame,
}

impl TransformStage {
    /// Creates a stage producing fields at the given output resolution.
    pub fn new(out_width: u32, out_height: u32) -> Result<Self, TransformError> {
        Self::with_backend(out_width, out_height, RenderBackend::Cpu)
    }

    /// Creates a stage on an explicitly negotiated render backend.
    pub fn with_backend(
        out_width: u32,
        out_height: u32,
        backend: RenderBackend,
    ) -> Result<Self, TransformError> {
        if out_width == 0 || out_height == 0 {
            return Err(TransformError::ZeroOutputDimensions);
        }
        Ok(Self {
            backend,
            src_width: 0,
            src_height: 0,
            work: Vec::new(),
            luma_plane: Vec::new(),
            output: ProcessedFrame::sized(out_width, out_height),
        })
    }

    /// Returns the active render backend.
    #[inline]
    pub fn backend(&self) -> RenderBackend {
        self.backend
    }

    /// Returns the output resolution.
    #[inline]
    pub fn output_size(&self) -> (u32, u32) {
        (self.output.width, self.output.height)
    }

    /// Resizes the output surface, reinitializing the output buffers.
    pub fn set_output_size(&mut self, out_width: u32, out_height: u32) -> Result<(), TransformError> {
        if out_width == 0 || out_height == 0 {
            return Err(TransformError::ZeroOutputDimensions);
        }
        if (out_width, out_height) != (self.output.width, self.output.height) {
            self.output = ProcessedFrame::sized(out_width, out_height);
        }
        Ok(())
    }

    /// Runs mirror, effect and luminance extraction over one frame.
    ///
    /// The returned reference stays valid until the next call; the sink
    /// must not retain it.
    pub fn process(
        &mut self,
        frame: &Frame,
        effect: Effect,
        mirror: bool,
    ) -> Result<&ProcessedFrame, TransformError> {
        let expected = frame.expected_len();
        if frame.pixels().len() != expected {
            return Err(TransformError::PixelLengthMismatch {
                width: frame.width(),
                height: frame.height(),
                expected,
                actual: frame.pixels().len(),
            });
        }

        if (frame.width(), frame.height()) != (self.src_width, self.src_height) {
            if self.src_width != 0 {
                tracing::debug!(
                    old_width = self.src_width,
                    old_height = self.src_height,
                    new_width = frame.width(),
                    new_height = frame.height(),
                    "Transform scratch resized"
                );
            }
            self.src_width = frame.width();
            self.src_height = frame.height();
            self.work.resize(expected, 0);
        }

        if mirror {
            effect::copy_mirrored(frame.pixels(), &mut self.work, frame.width());
        } else {
            self.work.copy_from_slice(frame.pixels());
        }

        effect.apply(
            &mut self.work,
            frame.width(),
            frame.height(),
            &mut self.luma_plane,
        );

        luma::downsample_into(
            &self.work,
            frame.width(),
            frame.height(),
            self.output.width,
            self.output.height,
            &mut self.output.luminance,
            &mut self.output.color,
        );

        Ok(&self.output)
    }
}

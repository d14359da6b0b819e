//! Synthetic frame generation.
//!
//! The pattern source needs no external capture resource. It synthesizes
//! frames algorithmically from a monotonic tick counter, which makes it the
//! always-available fallback when a capture process cannot be started.

use super::{FrameCell, FrameSource, SourceConfig, StartError};
use crate::source::Frame;
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Seed base mixed with the tick counter for the noise pattern.
const NOISE_SEED_BASE: u64 = 0x6c75_6d61_7465_726d;

/// Available synthetic patterns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// Overlapping sinusoids drifting over time.
    #[default]
    Plasma,
    /// Tiled squares with a moving phase.
    Checker,
    /// Uniform random bytes from a tick-seeded ChaCha8 stream.
    Noise,
}

impl Pattern {
    /// Returns the pattern name for status display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::Plasma => "plasma",
            Pattern::Checker => "checker",
            Pattern::Noise => "noise",
        }
    }

    /// Renders one frame of this pattern into `pixels`.
    ///
    /// `pixels` must be exactly `width * height * 4` bytes. Every pattern
    /// writes alpha 255 for every pixel, and consecutive ticks differ in at
    /// least one pixel.
    pub fn render(&self, pixels: &mut [u8], width: u32, height: u32, tick: u64) {
        debug_assert_eq!(pixels.len(), (width as usize) * (height as usize) * 4);
        match self {
            Pattern::Plasma => render_plasma(pixels, width, height, tick),
            Pattern::Checker => render_checker(pixels, width, height, tick),
            Pattern::Noise => render_noise(pixels, tick),
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn render_plasma(pixels: &mut [u8], width: u32, height: u32, tick: u64) {
    let t = (tick as f32) * 0.08;
    let mut idx = 0;
    for y in 0..height {
        let fy = y as f32;
        for x in 0..width {
            let fx = x as f32;
            let p = (fx * 0.12 + t).sin() + (fy * 0.09 - 0.7 * t).sin()
                + ((fx + fy) * 0.06 + 0.5 * t).sin();
            let n = (p + 3.0) / 6.0;
            pixels[idx] = (n * 255.0) as u8;
            pixels[idx + 1] = ((1.0 - n) * 255.0) as u8;
            pixels[idx + 2] = ((0.5 + 0.5 * (p * std::f32::consts::PI).sin()) * 255.0) as u8;
            pixels[idx + 3] = 255;
            idx += 4;
        }
    }
}

fn render_checker(pixels: &mut [u8], width: u32, height: u32, tick: u64) {
    const TILE: u32 = 8;
    let mut idx = 0;
    for y in 0..height {
        for x in 0..width {
            let on = (x / TILE + y / TILE + tick as u32) % 2 == 0;
            let (r, g, b) = if on {
                (230, 230, 230)
            } else {
                (
                    ((x * 255) / width.max(1)) as u8,
                    ((y * 255) / height.max(1)) as u8,
                    64,
                )
            };
            pixels[idx] = r;
            pixels[idx + 1] = g;
            pixels[idx + 2] = b;
            pixels[idx + 3] = 255;
            idx += 4;
        }
    }
}

fn render_noise(pixels: &mut [u8], tick: u64) {
    let seed = NOISE_SEED_BASE ^ tick.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.fill_bytes(pixels);
    for px in pixels.chunks_exact_mut(4) {
        px[3] = 255;
    }
}

/// Frame source producing synthetic frames on an internal timer.
pub struct PatternSource {
    config: SourceConfig,
    label: String,
    cell: Arc<FrameCell>,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl PatternSource {
    /// Creates a pattern source from a source configuration.
    pub fn new(config: SourceConfig) -> Self {
        let label = format!("pattern:{}", config.pattern);
        Self {
            config,
            label,
            cell: Arc::new(FrameCell::new()),
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    async fn generate(
        config: SourceConfig,
        cell: Arc<FrameCell>,
        running: Arc<AtomicBool>,
    ) {
        let frame_bytes = config.frame_bytes();
        // Double buffer pair, allocated once for the source's lifetime.
        let mut buffers = [
            Arc::new(vec![0u8; frame_bytes]),
            Arc::new(vec![0u8; frame_bytes]),
        ];
        let mut active = 0;
        let mut sequence: u64 = 0;

        let mut ticker =
            tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(config.fps)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while running.load(Ordering::Relaxed) {
            ticker.tick().await;
            sequence += 1;

            // Recycles the non-published buffer; falls back to a fresh
            // allocation if a reader still holds it.
            let pixels = Arc::make_mut(&mut buffers[active]);
            config
                .pattern
                .render(pixels, config.width, config.height, sequence);

            cell.publish(Frame::new(
                Arc::clone(&buffers[active]),
                config.width,
                config.height,
                sequence,
            ));
            active ^= 1;
        }
    }
}

impl FrameSource for PatternSource {
    fn start(&mut self) -> Result<(), StartError> {
        if self.task.is_some() {
            return Err(StartError::AlreadyStarted);
        }
        self.config.validate()?;

        self.running.store(true, Ordering::Relaxed);
        let task = tokio::spawn(Self::generate(
            self.config.clone(),
            Arc::clone(&self.cell),
            Arc::clone(&self.running),
        ));
        self.task = Some(task);

        tracing::info!(
            pattern = %self.config.pattern,
            width = self.config.width,
            height = self.config.height,
            fps = self.config.fps,
            "Pattern source started"
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!(pattern = %self.config.pattern, "Pattern source stopped");
        }
    }

    fn latest_frame(&self) -> Option<Frame> {
        self.cell.latest()
    }

    fn is_running(&self) -> bool {
        self.task.is_some() && self.running.load(Ordering::Relaxed)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for PatternSource {
    fn drop(&mut self) {
        self.stop();
    }
}

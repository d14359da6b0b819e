//! Lumaterm CLI
//!
//! Demo driver for the frame pipeline: picks a source, runs the scheduler
//! at the configured tick rate, logs a status line once per second and
//! renders ASCII dumps of the luminance field to stdout in place of a real
//! terminal rendering surface.

use clap::Parser;
use lumaterm::{
    Effect, FileConfig, FrameScheduler, FrameSink, FrameSource, Pattern, PatternSource,
    ProcessedFrame, RenderStatus, SourceConfig, StreamSource, TickOutcome,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Character ramp from dark to bright.
const RAMP: &[u8] = b" .:-=+*#%@";

#[derive(Debug, Parser)]
#[command(name = "lumaterm", version, about = "Real-time video-to-text frame pipeline")]
struct Args {
    /// Path to a TOML config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Synthetic pattern to generate.
    #[arg(long, value_enum)]
    pattern: Option<Pattern>,

    /// Capture command emitting raw RGBA bytes on stdout.
    #[arg(long)]
    capture: Option<String>,

    /// Argument for the capture command (repeatable).
    #[arg(long = "capture-arg")]
    capture_args: Vec<String>,

    /// Source frame width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Source frame height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Source frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Output surface width in cells.
    #[arg(long)]
    cols: Option<u32>,

    /// Output surface height in cells.
    #[arg(long)]
    rows: Option<u32>,

    /// Image effect to apply.
    #[arg(long, value_enum)]
    effect: Option<Effect>,

    /// Mirror frames horizontally.
    #[arg(long)]
    mirror: bool,

    /// Request the accelerated render path.
    #[arg(long)]
    accelerated: bool,

    /// Frames to render before exiting (0 = run until Ctrl-C).
    #[arg(long, default_value_t = 90)]
    frames: u64,

    /// Print an ASCII dump every N rendered frames (0 = only at exit).
    #[arg(long, default_value_t = 0)]
    dump_every: u64,

    /// Metrics exporter port (0 = disabled).
    #[cfg(feature = "metrics")]
    #[arg(long, default_value_t = 0)]
    metrics_port: u16,
}

/// Last rendered luminance field, kept for dumping.
struct DumpFrame {
    luminance: Vec<f32>,
    width: u32,
    height: u32,
}

/// Stand-in rendering surface: records the latest luminance field and
/// logs the advisory status line once per second.
struct ConsoleSink {
    dump_every: u64,
    rendered: u64,
    last: Arc<Mutex<Option<DumpFrame>>>,
    last_status_log: Instant,
}

impl ConsoleSink {
    fn new(dump_every: u64, last: Arc<Mutex<Option<DumpFrame>>>) -> Self {
        Self {
            dump_every,
            rendered: 0,
            last,
            last_status_log: Instant::now() - Duration::from_secs(1),
        }
    }
}

impl FrameSink for ConsoleSink {
    fn consume(&mut self, frame: &ProcessedFrame) {
        self.rendered += 1;
        let dump = DumpFrame {
            luminance: frame.luminance().to_vec(),
            width: frame.width(),
            height: frame.height(),
        };
        if self.dump_every != 0 && self.rendered % self.dump_every == 0 {
            println!("{}", ascii_art(&dump));
        }
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(dump);
    }

    fn update_status(&mut self, status: &RenderStatus) {
        if self.last_status_log.elapsed() < Duration::from_secs(1) {
            return;
        }
        self.last_status_log = Instant::now();
        info!(
            fps = status.fps,
            target = status.target_fps,
            source = %status.source,
            effect = %status.effect,
            signal = status.signal.as_str(),
            mirror = status.mirror,
            paused = status.paused,
            accelerated = status.accelerated,
            "Pipeline status"
        );
    }
}

/// Renders a luminance field as one block of ramp characters.
fn ascii_art(frame: &DumpFrame) -> String {
    let mut out = String::with_capacity((frame.width as usize + 1) * frame.height as usize);
    for row in frame.luminance.chunks_exact(frame.width as usize) {
        for &l in row {
            let idx = (l.clamp(0.0, 1.0) * (RAMP.len() - 1) as f32).round() as usize;
            out.push(RAMP[idx] as char);
        }
        out.push('\n');
    }
    out
}

fn load_config(args: &Args) -> FileConfig {
    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    if let Some(pattern) = args.pattern {
        config.source.pattern = pattern;
    }
    if args.capture.is_some() {
        config.source.command = args.capture.clone();
    }
    if !args.capture_args.is_empty() {
        config.source.args = args.capture_args.clone();
    }
    if let Some(width) = args.width {
        config.source.width = width;
    }
    if let Some(height) = args.height {
        config.source.height = height;
    }
    if let Some(fps) = args.fps {
        config.source.fps = fps;
    }
    if let Some(cols) = args.cols {
        config.render.out_width = cols;
    }
    if let Some(rows) = args.rows {
        config.render.out_height = rows;
    }
    if let Some(effect) = args.effect {
        config.render.effect = effect;
    }
    if args.mirror {
        config.render.mirror = true;
    }
    if args.accelerated {
        config.render.prefer_accelerated = true;
    }
    config
}

/// Starts the configured source, falling back to the always-available
/// pattern generator when a capture process cannot be started.
fn start_source(config: &SourceConfig) -> Box<dyn FrameSource> {
    if config.command.is_some() {
        let mut stream = StreamSource::new(config.clone());
        match stream.start() {
            Ok(()) => return Box::new(stream),
            Err(e) => {
                warn!("Capture source failed to start ({}), falling back to pattern", e);
            }
        }
    }

    let mut fallback_config = config.clone();
    fallback_config.command = None;
    let mut pattern = PatternSource::new(fallback_config);
    if let Err(e) = pattern.start() {
        eprintln!("Failed to start pattern source: {}", e);
        std::process::exit(1);
    }
    Box::new(pattern)
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args);

    info!("Lumaterm v{}", lumaterm::VERSION);

    let source = start_source(&config.source);

    let last = Arc::new(Mutex::new(None));
    let sink = ConsoleSink::new(args.dump_every, Arc::clone(&last));

    let scheduler = match FrameScheduler::new(source, Box::new(sink), &config.render) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("Invalid render configuration: {}", e);
            std::process::exit(1);
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    #[cfg(feature = "metrics")]
    let metrics_state = start_metrics(&args, &config);

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(
        1.0 / f64::from(config.render.target_fps),
    ));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut rendered: u64 = 0;
    while !stop.load(Ordering::Relaxed) {
        ticker.tick().await;
        if scheduler.tick() == TickOutcome::Rendered {
            rendered += 1;
        }

        #[cfg(feature = "metrics")]
        if let Some(state) = &metrics_state {
            let snapshot = lumaterm::metrics::PipelineSnapshot::from_scheduler(&scheduler);
            state.read().await.update(&snapshot);
        }

        if args.frames != 0 && rendered >= args.frames {
            break;
        }
    }

    scheduler.stop_source();

    let stats = scheduler.stats();
    info!(
        "Rendered {} frames over {} ticks ({} duplicates, {} without frame, {} busy drops)",
        stats.total_frames(),
        stats.total_ticks(),
        stats.duplicate_ticks(),
        stats.no_frame_ticks(),
        scheduler.busy_ticks()
    );

    let final_frame = last.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(dump) = final_frame {
        println!("{}", ascii_art(&dump));
    } else {
        warn!("No frame was rendered; nothing to dump");
    }
}

#[cfg(feature = "metrics")]
fn start_metrics(
    args: &Args,
    config: &FileConfig,
) -> Option<Arc<tokio::sync::RwLock<lumaterm::metrics::MetricsState>>> {
    use lumaterm::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

    let port = if args.metrics_port != 0 {
        args.metrics_port
    } else {
        config.metrics.port
    };
    if port == 0 {
        return None;
    }
    match MetricsRegistry::new() {
        Ok(registry) => {
            let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
            let state = server.state();
            tokio::spawn(async move {
                if let Err(e) = server.run().await {
                    warn!("Metrics server failed: {}", e);
                }
            });
            Some(state)
        }
        Err(e) => {
            warn!("Failed to create metrics registry: {}", e);
            None
        }
    }
}

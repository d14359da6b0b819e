//! Byte-stream demuxing from a capture subprocess.
//!
//! The capture contract is raw RGBA bytes at a fixed negotiated resolution
//! with no header or delimiters. Frame boundaries exist only as multiples
//! of `width * height * 4`, and the stream arrives in arbitrarily sized
//! chunks, so the demuxer accumulates bytes and slices frames out itself.

use super::{FrameCell, FrameSource, SourceConfig, StartError};
use crate::source::Frame;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::task::JoinHandle;

/// Read size for each chunk pulled off the capture pipe.
const READ_CHUNK: usize = 64 * 1024;

/// Maximum retained stderr diagnostic lines.
const DIAGNOSTICS_CAP: usize = 64;

/// Slices fixed-size frames out of an unbounded byte stream.
///
/// Completed frames land in the buffer of an alternating pair that is not
/// currently published, then the publish swaps roles. The accumulation
/// buffer therefore never holds more than one partial frame once
/// [`push_chunk`](Self::push_chunk) returns.
pub struct FrameAssembler {
    width: u32,
    height: u32,
    frame_bytes: usize,
    acc: Vec<u8>,
    buffers: [Arc<Vec<u8>>; 2],
    active: usize,
    sequence: u64,
    cell: Arc<FrameCell>,
}

impl FrameAssembler {
    /// Creates an assembler publishing into `cell` at the given resolution.
    pub fn new(width: u32, height: u32, cell: Arc<FrameCell>) -> Self {
        let frame_bytes = (width as usize) * (height as usize) * 4;
        Self {
            width,
            height,
            frame_bytes,
            acc: Vec::with_capacity(frame_bytes + READ_CHUNK),
            buffers: [
                Arc::new(vec![0u8; frame_bytes]),
                Arc::new(vec![0u8; frame_bytes]),
            ],
            active: 0,
            sequence: 0,
            cell,
        }
    }

    /// Feeds one chunk of stream bytes, publishing every complete frame it
    /// finishes. Returns the number of frames published.
    ///
    /// Chunk boundaries may fall anywhere, including mid-pixel.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> usize {
        debug_assert!(self.frame_bytes > 0, "assembler built for zero dimensions");
        if self.frame_bytes == 0 {
            return 0;
        }
        let needed = self.acc.len() + chunk.len();
        if needed > self.acc.capacity() {
            self.acc.reserve(needed - self.acc.len());
        }
        self.acc.extend_from_slice(chunk);

        let mut published = 0;
        while self.acc.len() >= self.frame_bytes {
            // Write into the buffer that is not currently published. If a
            // lagging reader still holds it, make_mut lands the write in a
            // fresh allocation instead.
            let pixels = Arc::make_mut(&mut self.buffers[self.active]);
            pixels.copy_from_slice(&self.acc[..self.frame_bytes]);

            self.sequence += 1;
            self.cell.publish(Frame::new(
                Arc::clone(&self.buffers[self.active]),
                self.width,
                self.height,
                self.sequence,
            ));
            self.active ^= 1;

            // Leftover bytes shift to the front of the accumulator.
            self.acc.drain(..self.frame_bytes);
            published += 1;
        }
        published
    }

    /// Returns the bytes of the current partial frame.
    pub fn pending_bytes(&self) -> usize {
        self.acc.len()
    }

    /// Returns the total frames published so far.
    pub fn frames_published(&self) -> u64 {
        self.sequence
    }
}

/// Frame source backed by a capture subprocess emitting raw RGBA bytes.
pub struct StreamSource {
    config: SourceConfig,
    label: String,
    cell: Arc<FrameCell>,
    running: Arc<AtomicBool>,
    child: Option<Child>,
    drain: Option<JoinHandle<()>>,
    stderr_drain: Option<JoinHandle<()>>,
    diagnostics: Arc<Mutex<VecDeque<String>>>,
}

impl StreamSource {
    /// Creates a stream source from a source configuration.
    ///
    /// The configuration must carry a capture command; that is checked at
    /// [`start`](FrameSource::start) so construction itself cannot fail.
    pub fn new(config: SourceConfig) -> Self {
        let label = match &config.command {
            Some(command) => format!("stream:{command}"),
            None => "stream".to_string(),
        };
        Self {
            config,
            label,
            cell: Arc::new(FrameCell::new()),
            running: Arc::new(AtomicBool::new(false)),
            child: None,
            drain: None,
            stderr_drain: None,
            diagnostics: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Returns a snapshot of recent subprocess stderr lines.
    ///
    /// Diagnostic output never interrupts decoding; it is retained here for
    /// inspection and logged at debug level as it arrives.
    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    async fn drain_stdout(
        mut stdout: ChildStdout,
        mut assembler: FrameAssembler,
        running: Arc<AtomicBool>,
    ) {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            if !running.load(Ordering::Relaxed) {
                break;
            }
            match stdout.read(&mut chunk).await {
                Ok(0) => {
                    tracing::info!(
                        frames = assembler.frames_published(),
                        "Capture stream ended"
                    );
                    break;
                }
                Ok(n) => {
                    let published = assembler.push_chunk(&chunk[..n]);
                    if published > 0 {
                        tracing::trace!(published, pending = assembler.pending_bytes(), "Demuxed");
                    }
                }
                Err(e) => {
                    tracing::warn!("Capture stream read failed: {}", e);
                    break;
                }
            }
        }
        // Last good frame stays published; only the running flag drops.
        running.store(false, Ordering::Relaxed);
    }

    async fn drain_stderr(stderr: ChildStderr, diagnostics: Arc<Mutex<VecDeque<String>>>) {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!("capture: {}", line);
            let mut ring = diagnostics.lock().unwrap_or_else(PoisonError::into_inner);
            if ring.len() == DIAGNOSTICS_CAP {
                ring.pop_front();
            }
            ring.push_back(line);
        }
    }
}

impl FrameSource for StreamSource {
    fn start(&mut self) -> Result<(), StartError> {
        if self.child.is_some() {
            return Err(StartError::AlreadyStarted);
        }
        self.config.validate()?;
        let command = self
            .config
            .command
            .clone()
            .ok_or(StartError::MissingCommand)?;

        let mut child = tokio::process::Command::new(&command)
            .args(&self.config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| StartError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(StartError::MissingStdout)?;

        self.running.store(true, Ordering::Relaxed);
        let assembler = FrameAssembler::new(
            self.config.width,
            self.config.height,
            Arc::clone(&self.cell),
        );
        self.drain = Some(tokio::spawn(Self::drain_stdout(
            stdout,
            assembler,
            Arc::clone(&self.running),
        )));

        if let Some(stderr) = child.stderr.take() {
            self.stderr_drain = Some(tokio::spawn(Self::drain_stderr(
                stderr,
                Arc::clone(&self.diagnostics),
            )));
        }

        self.child = Some(child);
        tracing::info!(
            command = %command,
            width = self.config.width,
            height = self.config.height,
            "Stream source started"
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(mut child) = self.child.take() {
            // Killing the process handle is what unblocks an in-flight
            // read; the drain loop then sees EOF and exits on its own.
            if let Err(e) = child.start_kill() {
                tracing::debug!("Capture process kill: {}", e);
            }
            tracing::info!(label = %self.label, "Stream source stopped");
        }
        if let Some(task) = self.drain.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_drain.take() {
            task.abort();
        }
    }

    fn latest_frame(&self) -> Option<Frame> {
        self.cell.latest()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for StreamSource {
    fn drop(&mut self) {
        self.stop();
    }
}

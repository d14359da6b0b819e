//! Pipeline configuration.
//!
//! Width, height and frame rate are fixed for the lifetime of one source
//! instance. Changing resolution means constructing a new source and
//! letting the transform stage resize its scratch buffers.

use crate::source::Pattern;
use crate::transform::Effect;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a frame source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second produced by the source.
    pub fps: u32,
    /// Synthetic pattern used by the pattern generator.
    pub pattern: Pattern,
    /// Capture command producing raw RGBA bytes on stdout (stream source).
    pub command: Option<String>,
    /// Arguments passed to the capture command.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            fps: 30,
            pattern: Pattern::Plasma,
            command: None,
            args: Vec::new(),
        }
    }
}

impl SourceConfig {
    /// Creates a configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Returns the byte size of one frame at this resolution.
    #[inline]
    pub fn frame_bytes(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 240 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if let Some(command) = &self.command {
            if command.is_empty() {
                return Err(ConfigError::EmptyCommand);
            }
        }
        Ok(())
    }
}

/// Configuration for the render side of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output surface width in cells.
    pub out_width: u32,
    /// Output surface height in cells.
    pub out_height: u32,
    /// Render tick rate the scheduler is driven at.
    pub target_fps: u32,
    /// Image effect applied before luminance extraction.
    pub effect: Effect,
    /// Horizontal mirror flag.
    pub mirror: bool,
    /// Supersampling flag, advisory for the rendering surface.
    pub supersample: bool,
    /// Name of the character ramp or render mode, advisory.
    pub mode: String,
    /// Request the accelerated render path if one is available.
    pub prefer_accelerated: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            out_width: 96,
            out_height: 54,
            target_fps: 30,
            effect: Effect::None,
            mirror: false,
            supersample: false,
            mode: "ascii".to_string(),
            prefer_accelerated: false,
        }
    }
}

impl RenderConfig {
    /// Validates the render parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.out_width == 0 || self.out_height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.target_fps == 0 || self.target_fps > 240 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Exporter port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 0 }
    }
}

/// Configuration validation and loading errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-240 fps)")]
    InvalidFrameRate,
    #[error("capture command must not be empty")]
    EmptyCommand,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.source.validate()?;
        config.render.validate()?;
        Ok(config)
    }
}

//! Render configuration.
//!
//! Settings are plain data with serde support so a host (or the CLI) can
//! load them from JSON. Missing fields fall back to `Default`.

use std::path::Path;

use funray_math::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating render settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid render settings: {0}")]
    Invalid(String),
}

/// How the scheduler partitions and repeats work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// One worker sweeps the whole frame once.
    SingleThread,
    /// One job per tile, full sample count, run once.
    MultiThread,
    /// One worker adds a sample per pixel per pass until cancelled.
    SingleProgressive,
    /// One job per tile per pass, one sample each, until cancelled.
    #[default]
    MultiProgressive,
}

impl RenderMode {
    /// Progressive modes never complete on their own.
    pub fn is_progressive(self) -> bool {
        matches!(self, RenderMode::SingleProgressive | RenderMode::MultiProgressive)
    }

    pub fn is_tiled(self) -> bool {
        matches!(self, RenderMode::MultiThread | RenderMode::MultiProgressive)
    }
}

/// What a ray that escapes the scene sees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Background {
    /// White-to-sky-blue gradient by the ray's vertical direction.
    #[default]
    Dome,
    /// A constant color; scenes lit only by emissive geometry use black.
    Solid(Color),
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Samples per pixel for the full-frame modes
    pub samples_per_pixel: u32,
    /// Maximum ray bounce depth
    pub max_depth: u32,
    pub mode: RenderMode,
    pub background: Background,
    /// Edge length of a square tile in pixels
    pub tile_size: u32,
    /// Worker threads; `None` uses one per logical core
    pub threads: Option<usize>,
    /// Base seed for the per-job random streams; `None` picks one at random
    pub seed: Option<u64>,
    /// Pause between progressive passes in the tiled progressive mode
    pub progressive_sleep_ms: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 288,
            samples_per_pixel: 10,
            max_depth: 50,
            mode: RenderMode::default(),
            background: Background::default(),
            tile_size: 64,
            threads: None,
            seed: None,
            progressive_sleep_ms: 60,
        }
    }
}

impl RenderSettings {
    /// Parse settings from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: RenderSettings = serde_json::from_str(json)?;
        Ok(settings)
    }

    /// Load settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Loaded render settings from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Reject settings the renderer cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::Invalid("samples_per_pixel must be at least 1".into()));
        }
        if self.tile_size == 0 {
            return Err(ConfigError::Invalid("tile_size must be at least 1".into()));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        Ok(())
    }
}

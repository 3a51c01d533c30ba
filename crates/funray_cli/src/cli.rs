use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use funray_core::RenderMode;
use log::LevelFilter;

/// Log levels accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Render modes accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    Single,
    Multi,
    SingleProgressive,
    MultiProgressive,
}

impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Single => RenderMode::SingleThread,
            Mode::Multi => RenderMode::MultiThread,
            Mode::SingleProgressive => RenderMode::SingleProgressive,
            Mode::MultiProgressive => RenderMode::MultiProgressive,
        }
    }
}

/// Built-in demo scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SceneChoice {
    /// Random field of small spheres around three large ones, under the sky
    Spheres,
    /// Closed room lit by a ceiling panel, with rotated boxes and a cylinder
    Room,
}

#[derive(Parser, Debug)]
#[command(name = "funray")]
#[command(about = "A CPU path tracer")]
pub struct Args {
    /// JSON render settings; command line flags override its fields
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Scene to render
    #[arg(long, value_enum, default_value = "spheres")]
    pub scene: SceneChoice,

    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Samples per pixel for full-frame modes
    #[arg(long, short = 's')]
    pub samples: Option<u32>,

    /// Maximum bounce depth
    #[arg(long)]
    pub depth: Option<u32>,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Seed for both scene generation and sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Progressive modes stop after this many samples per pixel
    #[arg(long, default_value = "64", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_samples: u32,

    /// Image used as the ground texture of the spheres scene
    #[arg(long)]
    pub ground_texture: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "funray.png")]
    pub output: PathBuf,

    /// Logging level; RUST_LOG takes precedence when set
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

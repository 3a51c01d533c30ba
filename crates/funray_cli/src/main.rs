mod cli;
mod scenes;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use funray_core::{RenderSettings, SharedSceneSource, TextureCache};
use funray_renderer::{color_to_rgba, RenderHandle, RenderOutcome, Renderer, TiledImage};
use log::LevelFilter;

use cli::Args;

/// Seed for scene generation when none is given.
const DEFAULT_SCENE_SEED: u64 = 42;

/// How often the monitor polls the render for dirty tiles.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Settings from the config file (or defaults) with flag overrides applied.
fn load_settings(args: &Args) -> Result<RenderSettings> {
    let mut settings = match &args.config {
        Some(path) => RenderSettings::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RenderSettings::default(),
    };

    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if let Some(samples) = args.samples {
        settings.samples_per_pixel = samples;
    }
    if let Some(depth) = args.depth {
        settings.max_depth = depth;
    }
    if let Some(mode) = args.mode {
        settings.mode = mode.into();
    }
    if args.threads.is_some() {
        settings.threads = args.threads;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }

    settings.validate().context("Invalid render settings")?;
    Ok(settings)
}

/// RGBA copy of the render, refreshed one dirty tile at a time.
struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Framebuffer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Copy every tile written since the last update. Returns the tile count.
    fn update(&mut self, image: &TiledImage) -> usize {
        let row_bytes = self.width as usize * 4;
        image.for_each_dirty(|tile| {
            let bucket = tile.bucket();
            for (i, color) in tile.pixels().into_iter().enumerate() {
                let x = (bucket.x + i as u32 % bucket.width) as usize;
                let y = (bucket.y + i as u32 / bucket.width) as usize;
                let offset = y * row_bytes + x * 4;
                self.pixels[offset..offset + 4].copy_from_slice(&color_to_rgba(color));
            }
        })
    }

    fn save(&self, path: &Path) -> Result<()> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .context("Framebuffer size does not match the image")?;
        img.save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Follow a background render until it finishes, repainting as it goes.
///
/// Progressive renders are cancelled once they reach `max_samples`.
fn monitor(handle: &RenderHandle, framebuffer: &mut Framebuffer, progressive: bool, max_samples: u32) {
    let image = handle.image();
    let mut last_report = Instant::now();

    while !handle.is_finished() {
        std::thread::sleep(POLL_INTERVAL);
        let repainted = framebuffer.update(&image);
        log::trace!("Repainted {} tiles", repainted);

        let progress = handle.progress();
        if progressive && progress.sample_count() >= max_samples {
            log::info!("Reached {} samples per pixel, stopping", progress.sample_count());
            handle.cancel();
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            if progressive {
                log::info!("{} samples per pixel", progress.sample_count());
            } else {
                log::info!("{:.0}% done", progress.fraction() * 100.0);
            }
            last_report = Instant::now();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.log_level.into());

    let mut settings = load_settings(&args)?;

    let demo = scenes::build(
        args.scene,
        args.seed.unwrap_or(DEFAULT_SCENE_SEED),
        args.ground_texture.as_deref(),
    );
    // A config file decides the background; otherwise the scene does
    if args.config.is_none() {
        settings.background = demo.background;
    }

    log::info!(
        "Scene {:?}: {} objects, {} materials",
        args.scene,
        demo.snapshot.object_count(),
        demo.snapshot.material_count()
    );

    let source = Arc::new(SharedSceneSource::new(demo.snapshot, demo.camera));
    let progressive = settings.mode.is_progressive();
    let mut framebuffer = Framebuffer::new(settings.width, settings.height);

    let renderer = Renderer::with_textures(settings, source, TextureCache::new())
        .context("Failed to set up renderer")?;

    let start = Instant::now();
    let handle = renderer.spawn();
    monitor(&handle, &mut framebuffer, progressive, args.max_samples);

    let image = handle.image();
    let outcome = handle.join().context("Render failed")?;
    framebuffer.update(&image);

    if outcome == RenderOutcome::Cancelled && !progressive {
        log::warn!("Render was cancelled before completion");
    }

    framebuffer.save(&args.output)?;
    log::info!("Saved {} in {:.2?}", args.output.display(), start.elapsed());

    Ok(())
}

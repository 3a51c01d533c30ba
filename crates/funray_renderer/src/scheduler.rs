//! Render scheduling: modes, cancellation, progress and restart-on-change.
//!
//! A [`Renderer`] owns the worker pool and the output image. Full-frame
//! modes render once and complete; progressive modes add one sample per
//! pixel per pass until cancelled, restarting from zero whenever the
//! [`SceneSource`] publishes a new scene or camera.

use crate::accumulation::{AccumulationBuffer, TileAccumulator};
use crate::bucket::{generate_buckets, spiral_order, Bucket};
use crate::camera::Camera;
use crate::error::RenderResult;
use crate::renderer::{resolve_pixel, Tracer};
use crate::tiled_image::TiledImage;
use crate::world::World;
use funray_core::{RenderMode, RenderSettings, SceneSource, TextureCache};
use funray_math::Color;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Shared cancellation flag, checked by every job between samples.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Lifecycle of a render: `Idle → Running → Completed | Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl RenderState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RenderState::Running,
            2 => RenderState::Completed,
            3 => RenderState::Cancelled,
            _ => RenderState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            RenderState::Idle => 0,
            RenderState::Running => 1,
            RenderState::Completed => 2,
            RenderState::Cancelled => 3,
        }
    }
}

/// How a successful [`Renderer::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    Cancelled,
}

/// Live progress counters, readable from any thread.
#[derive(Debug, Default)]
pub struct Progress {
    state: AtomicU8,
    pixels_done: AtomicU64,
    pixels_total: AtomicU64,
    sample_count: AtomicU32,
    restarts: AtomicU64,
}

impl Progress {
    pub fn state(&self) -> RenderState {
        RenderState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Finished fraction of a full-frame render, in [0, 1].
    ///
    /// Progressive renders never finish and report 0.
    pub fn fraction(&self) -> f32 {
        let total = self.pixels_total.load(Ordering::Acquire);
        if total == 0 {
            return 0.0;
        }
        self.pixels_done.load(Ordering::Acquire) as f32 / total as f32
    }

    /// Samples per pixel in the current progressive accumulation.
    pub fn sample_count(&self) -> u32 {
        self.sample_count.load(Ordering::Acquire)
    }

    /// Times a progressive render restarted because its inputs changed.
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Acquire)
    }

    fn set_state(&self, state: RenderState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn begin_frame(&self, total_pixels: u64) {
        self.pixels_done.store(0, Ordering::Release);
        self.pixels_total.store(total_pixels, Ordering::Release);
    }

    fn add_pixels(&self, count: u64) {
        self.pixels_done.fetch_add(count, Ordering::AcqRel);
    }

    fn set_sample_count(&self, samples: u32) {
        self.sample_count.store(samples, Ordering::Release);
    }

    fn note_restart(&self) {
        self.restarts.fetch_add(1, Ordering::AcqRel);
    }
}

/// World and camera built from one scene/camera version pair.
struct Frame {
    world: World,
    camera: Camera,
    scene_version: u64,
    camera_version: u64,
}

/// Whether a pass ran to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassStatus {
    Done,
    /// Cancelled, or the inputs changed underneath it
    Interrupted,
}

/// Accumulation state carried between progressive passes.
struct ProgressiveRun {
    accum: AccumulationBuffer,
    samples: u32,
    pass: u64,
    /// Last pass stopped partway, so pixels hold uneven sample counts
    partial: bool,
}

/// Independent random stream for one job.
fn job_rng(seed: u64, tile: usize, pass: u64) -> StdRng {
    let mixed = seed
        ^ (tile as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ pass.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    StdRng::seed_from_u64(mixed)
}

/// CPU path tracing renderer.
pub struct Renderer {
    settings: RenderSettings,
    source: Arc<dyn SceneSource>,
    textures: TextureCache,
    frame: Frame,
    image: Arc<TiledImage>,
    pool: rayon::ThreadPool,
    cancel: CancelToken,
    progress: Arc<Progress>,
    seed: u64,
}

impl Renderer {
    pub fn new(settings: RenderSettings, source: Arc<dyn SceneSource>) -> RenderResult<Self> {
        Self::with_textures(settings, source, TextureCache::new())
    }

    /// Create a renderer that resolves textures through `textures`.
    ///
    /// Settings, the current scene and the current camera are all checked
    /// here, so a renderer that constructs successfully can always run.
    pub fn with_textures(
        settings: RenderSettings,
        source: Arc<dyn SceneSource>,
        mut textures: TextureCache,
    ) -> RenderResult<Self> {
        settings.validate()?;

        let scene = source.scene();
        let camera = source.camera();
        let frame = Frame {
            world: World::from_snapshot(&scene.value, &mut textures)?,
            camera: Camera::new(&camera.value, settings.aspect_ratio())?,
            scene_version: scene.version,
            camera_version: camera.version,
        };

        let image = TiledImage::with_tile_size(
            settings.width,
            settings.height,
            settings.tile_size,
            Color::ZERO,
        )?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.threads.unwrap_or(0))
            .thread_name(|i| format!("funray-worker-{i}"))
            .build()?;

        let seed = settings.seed.unwrap_or_else(rand::random);

        Ok(Self {
            settings,
            source,
            textures,
            frame,
            image: Arc::new(image),
            pool,
            cancel: CancelToken::new(),
            progress: Arc::new(Progress::default()),
            seed,
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// The output image, shared with any display consumer.
    pub fn image(&self) -> Arc<TiledImage> {
        self.image.clone()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn progress(&self) -> Arc<Progress> {
        self.progress.clone()
    }

    pub fn state(&self) -> RenderState {
        self.progress.state()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Render on the calling thread until completion or cancellation.
    ///
    /// Scene and camera updates published since the last run are picked
    /// up first.
    pub fn run(&mut self) -> RenderResult<RenderOutcome> {
        self.refresh_frame();
        self.progress.set_state(RenderState::Running);
        let start = Instant::now();

        log::info!(
            "Rendering {}x{} ({:?}, {} spp, depth {}, {} threads, seed {})",
            self.settings.width,
            self.settings.height,
            self.settings.mode,
            self.settings.samples_per_pixel,
            self.settings.max_depth,
            self.pool.current_num_threads(),
            self.seed
        );

        let result = match self.settings.mode {
            RenderMode::SingleThread => Ok(self.render_single()),
            RenderMode::MultiThread => Ok(self.render_tiled()),
            RenderMode::SingleProgressive => self.render_progressive(false),
            RenderMode::MultiProgressive => self.render_progressive(true),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.progress.set_state(RenderState::Idle);
                return Err(err);
            }
        };

        match outcome {
            RenderOutcome::Completed => {
                self.progress.set_state(RenderState::Completed);
                log::info!("Render completed in {:.2?}", start.elapsed());
            }
            RenderOutcome::Cancelled => {
                self.progress.set_state(RenderState::Cancelled);
                log::info!(
                    "Render cancelled after {:.2?} ({} samples per pixel)",
                    start.elapsed(),
                    self.progress.sample_count()
                );
            }
        }

        Ok(outcome)
    }

    /// Run on a background thread.
    pub fn spawn(mut self) -> RenderHandle {
        let cancel = self.cancel.clone();
        let progress = self.progress.clone();
        let image = self.image.clone();
        let thread = std::thread::spawn(move || self.run());

        RenderHandle {
            thread,
            cancel,
            progress,
            image,
        }
    }

    fn tracer(&self) -> Tracer<'_> {
        Tracer::new(&self.frame.world, &self.frame.camera, &self.settings)
    }

    fn total_pixels(&self) -> u64 {
        self.settings.width as u64 * self.settings.height as u64
    }

    /// One worker, raster order, full sample count.
    fn render_single(&self) -> RenderOutcome {
        self.progress.begin_frame(self.total_pixels());
        let whole = Bucket::new(0, 0, self.settings.width, self.settings.height, 0);
        let mut rng = job_rng(self.seed, 0, 0);

        let finished = render_bucket(
            &self.tracer(),
            &whole,
            self.settings.samples_per_pixel,
            &mut rng,
            &self.image,
            &self.progress,
            &|| self.cancel.is_cancelled(),
        );

        if finished {
            RenderOutcome::Completed
        } else {
            RenderOutcome::Cancelled
        }
    }

    /// One job per tile on the pool, center tiles first.
    fn render_tiled(&self) -> RenderOutcome {
        self.progress.begin_frame(self.total_pixels());
        let (width, height) = (self.settings.width, self.settings.height);
        let buckets = spiral_order(generate_buckets(width, height, self.settings.tile_size), width, height);

        let tracer = self.tracer();
        let spp = self.settings.samples_per_pixel;
        let finished = self.pool.install(|| {
            buckets.par_iter().all(|bucket| {
                let mut rng = job_rng(self.seed, bucket.index, 0);
                let done = render_bucket(
                    &tracer,
                    bucket,
                    spp,
                    &mut rng,
                    &self.image,
                    &self.progress,
                    &|| self.cancel.is_cancelled(),
                );
                log::trace!("Tile {} finished: {}", bucket.index, done);
                done
            })
        });

        if finished {
            RenderOutcome::Completed
        } else {
            RenderOutcome::Cancelled
        }
    }

    fn render_progressive(&mut self, tiled: bool) -> RenderResult<RenderOutcome> {
        let mut run = self.start_progressive()?;
        let sleep = Duration::from_millis(self.settings.progressive_sleep_ms);

        loop {
            if self.cancel.is_cancelled() {
                return Ok(RenderOutcome::Cancelled);
            }

            let status = self.progressive_step(&mut run, tiled);
            if status == PassStatus::Done {
                log::trace!("Progressive pass {} done ({} spp)", run.pass, run.samples);
            }

            if tiled && !sleep.is_zero() && !self.cancel.is_cancelled() {
                std::thread::sleep(sleep);
            }
        }
    }

    fn start_progressive(&self) -> RenderResult<ProgressiveRun> {
        let (width, height) = (self.settings.width, self.settings.height);
        let buckets = generate_buckets(width, height, self.settings.tile_size);
        self.progress.begin_frame(0);
        self.progress.set_sample_count(0);

        Ok(ProgressiveRun {
            accum: AccumulationBuffer::new(&buckets, width, self.settings.tile_size)?,
            samples: 0,
            pass: 0,
            partial: false,
        })
    }

    /// Poll for changes, then add one sample to every pixel.
    fn progressive_step(&mut self, run: &mut ProgressiveRun, tiled: bool) -> PassStatus {
        let changed = self.refresh_frame();
        if changed || run.partial {
            run.accum.clear();
            run.samples = 0;
            self.progress.set_sample_count(0);
            self.progress.note_restart();
        }

        run.samples += 1;
        run.pass += 1;

        let status = if tiled {
            self.progressive_pass_tiled(&mut run.accum, run.samples, run.pass)
        } else {
            self.progressive_pass_single(&mut run.accum, run.samples, run.pass)
        };

        if status == PassStatus::Done {
            self.progress.set_sample_count(run.samples);
        }
        run.partial = status == PassStatus::Interrupted;
        status
    }

    fn progressive_pass_single(
        &self,
        accum: &mut AccumulationBuffer,
        samples: u32,
        pass: u64,
    ) -> PassStatus {
        let tracer = self.tracer();
        let mut rng = job_rng(self.seed, 0, pass);

        for y in 0..self.settings.height {
            if self.interrupted() {
                return PassStatus::Interrupted;
            }
            for x in 0..self.settings.width {
                if self.cancel.is_cancelled() {
                    return PassStatus::Interrupted;
                }
                let sample = tracer.sample(x, y, &mut rng);
                if let Some(tile) = accum.tile_for_mut(x, y) {
                    let sum = tile.add(x, y, sample);
                    self.image.set_pixel(x, y, resolve_pixel(sum, samples));
                }
            }
        }

        PassStatus::Done
    }

    fn progressive_pass_tiled(
        &self,
        accum: &mut AccumulationBuffer,
        samples: u32,
        pass: u64,
    ) -> PassStatus {
        let tracer = self.tracer();
        let finished = self.pool.install(|| {
            accum.tiles_mut().par_iter_mut().all(|tile| {
                let mut rng = job_rng(self.seed, tile.bucket().index, pass);
                accumulate_tile(&tracer, tile, samples, &mut rng, &self.image, &|| self.interrupted())
            })
        });

        if finished {
            PassStatus::Done
        } else {
            PassStatus::Interrupted
        }
    }

    /// True if the source has moved past the versions this frame was built from.
    fn is_stale(&self) -> bool {
        self.source.scene_version() != self.frame.scene_version
            || self.source.camera_version() != self.frame.camera_version
    }

    fn interrupted(&self) -> bool {
        self.cancel.is_cancelled() || self.is_stale()
    }

    /// Rebuild whatever changed in the source. Returns true if the frame
    /// now differs from what was being accumulated.
    ///
    /// An update that fails to build is skipped with a warning and the
    /// previous world or camera stays in use.
    fn refresh_frame(&mut self) -> bool {
        let mut changed = false;

        if self.source.scene_version() != self.frame.scene_version {
            let scene = self.source.scene();
            match World::from_snapshot(&scene.value, &mut self.textures) {
                Ok(world) => {
                    self.frame.world = world;
                    changed = true;
                }
                Err(err) => log::warn!("Skipping scene version {}: {}", scene.version, err),
            }
            self.frame.scene_version = scene.version;
        }

        if self.source.camera_version() != self.frame.camera_version {
            let camera = self.source.camera();
            match Camera::new(&camera.value, self.settings.aspect_ratio()) {
                Ok(built) => {
                    self.frame.camera = built;
                    changed = true;
                }
                Err(err) => log::warn!("Skipping camera version {}: {}", camera.version, err),
            }
            self.frame.camera_version = camera.version;
        }

        if changed {
            log::debug!(
                "Restarting progressive render (scene v{}, camera v{})",
                self.frame.scene_version,
                self.frame.camera_version
            );
        }
        changed
    }
}

/// Render every pixel of `bucket` at `samples` spp into `image`.
///
/// Returns false as soon as `should_stop` reports true.
fn render_bucket(
    tracer: &Tracer<'_>,
    bucket: &Bucket,
    samples: u32,
    rng: &mut dyn RngCore,
    image: &TiledImage,
    progress: &Progress,
    should_stop: &dyn Fn() -> bool,
) -> bool {
    for y in bucket.y..bucket.y + bucket.height {
        for x in bucket.x..bucket.x + bucket.width {
            let (sum, taken) = tracer.sample_sum(x, y, samples, rng, should_stop);
            if taken < samples {
                return false;
            }
            image.set_pixel(x, y, resolve_pixel(sum, samples));
        }
        progress.add_pixels(bucket.width as u64);
        if should_stop() {
            return false;
        }
    }
    true
}

/// Add one sample to every pixel of a tile and redisplay it.
fn accumulate_tile(
    tracer: &Tracer<'_>,
    tile: &mut TileAccumulator,
    samples: u32,
    rng: &mut dyn RngCore,
    image: &TiledImage,
    should_stop: &dyn Fn() -> bool,
) -> bool {
    let bucket = tile.bucket();
    for y in bucket.y..bucket.y + bucket.height {
        for x in bucket.x..bucket.x + bucket.width {
            if should_stop() {
                return false;
            }
            let sum = tile.add(x, y, tracer.sample(x, y, rng));
            image.set_pixel(x, y, resolve_pixel(sum, samples));
        }
    }
    true
}

/// Handle to a render running on a background thread.
pub struct RenderHandle {
    thread: JoinHandle<RenderResult<RenderOutcome>>,
    cancel: CancelToken,
    progress: Arc<Progress>,
    image: Arc<TiledImage>,
}

impl RenderHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RenderState {
        self.progress.state()
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn image(&self) -> Arc<TiledImage> {
        self.image.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the render thread. A panic on that thread is re-raised here.
    pub fn join(self) -> RenderResult<RenderOutcome> {
        match self.thread.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

impl std::fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHandle")
            .field("state", &self.state())
            .field("sample_count", &self.progress.sample_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use funray_core::{
        Background, CameraSettings, MaterialDesc, SceneSnapshot, ShapeDesc, SharedSceneSource,
        Versioned,
    };
    use funray_math::{Axis, Vec3};
    use std::cell::Cell;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn sphere_scene() -> SceneSnapshot {
        let mut scene = SceneSnapshot::new();
        let grey = scene.add_material(MaterialDesc::lambertian(Color::splat(0.5)));
        scene.add_shape(ShapeDesc::Sphere { center: Vec3::new(0.0, 0.0, -1.0), radius: 0.5 }, grey);
        scene
    }

    /// A huge emissive wall at z = -5 filling the view of a camera at the
    /// origin looking down -Z.
    fn wall_scene(emit: Color) -> SceneSnapshot {
        let mut scene = SceneSnapshot::new();
        let light = scene.add_material(MaterialDesc::diffuse_light(emit));
        scene.add_shape(
            ShapeDesc::Rect { normal: Axis::Z, a: (-100.0, 100.0), b: (-100.0, 100.0), k: -5.0 },
            light,
        );
        scene
    }

    fn front_camera() -> CameraSettings {
        CameraSettings::new(Vec3::ZERO, -Vec3::Z, Vec3::Y).with_lens(90.0, 0.0, 1.0)
    }

    fn settings(mode: RenderMode, width: u32, height: u32) -> RenderSettings {
        RenderSettings {
            width,
            height,
            samples_per_pixel: 2,
            max_depth: 4,
            mode,
            tile_size: 8,
            threads: Some(2),
            seed: Some(7),
            progressive_sleep_ms: 1,
            ..Default::default()
        }
    }

    fn all_pixels(image: &TiledImage) -> Vec<Color> {
        (0..image.height())
            .flat_map(|y| (0..image.width()).map(move |x| (x, y)))
            .map(|(x, y)| image.get_pixel(x, y))
            .collect()
    }

    fn approx(a: Color, b: Color) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_depth_zero_renders_black() {
        init_logging();
        for mode in [RenderMode::SingleThread, RenderMode::MultiThread] {
            let source = Arc::new(SharedSceneSource::new(sphere_scene(), front_camera()));
            let settings = RenderSettings {
                max_depth: 0,
                background: Background::Solid(Color::ZERO),
                ..settings(mode, 16, 8)
            };

            let mut renderer = Renderer::new(settings, source).unwrap();
            assert_eq!(renderer.state(), RenderState::Idle);
            assert_eq!(renderer.run().unwrap(), RenderOutcome::Completed);
            assert_eq!(renderer.state(), RenderState::Completed);
            assert_eq!(renderer.progress().fraction(), 1.0);
            assert!(all_pixels(&renderer.image()).iter().all(|&c| c == Color::ZERO));
        }
    }

    #[test]
    fn test_dome_lights_pixels_outside_silhouette() {
        for mode in [RenderMode::SingleThread, RenderMode::MultiThread] {
            let source = Arc::new(SharedSceneSource::new(sphere_scene(), front_camera()));
            let mut renderer = Renderer::new(settings(mode, 32, 16), source).unwrap();

            assert_eq!(renderer.run().unwrap(), RenderOutcome::Completed);
            let image = renderer.image();
            let corner = image.get_pixel(0, 0);
            assert!(corner.x > 0.0 && corner.y > 0.0 && corner.z > 0.0);
            // Sphere in the middle: diffuse grey under the sky is dimmer than the sky itself
            let center = image.get_pixel(16, 8);
            assert!(center.z < corner.z);
        }
    }

    #[test]
    fn test_full_frame_is_deterministic_with_seed() {
        let render = |mode| {
            let source = Arc::new(SharedSceneSource::new(sphere_scene(), front_camera()));
            let mut renderer = Renderer::new(settings(mode, 16, 16), source).unwrap();
            renderer.run().unwrap();
            all_pixels(&renderer.image())
        };
        assert_eq!(render(RenderMode::MultiThread), render(RenderMode::MultiThread));
    }

    #[test]
    fn test_progressive_camera_change_resets() {
        init_logging();
        for tiled in [false, true] {
            let background = Color::new(0.0, 0.0, 0.25);
            let source = Arc::new(SharedSceneSource::new(
                wall_scene(Color::new(1.0, 0.0, 0.0)),
                front_camera(),
            ));
            let settings = RenderSettings {
                background: Background::Solid(background),
                tile_size: 4,
                ..settings(RenderMode::MultiProgressive, 8, 8)
            };
            let mut renderer = Renderer::new(settings, source.clone()).unwrap();
            let mut run = renderer.start_progressive().unwrap();

            assert_eq!(renderer.progressive_step(&mut run, tiled), PassStatus::Done);
            assert_eq!(renderer.progressive_step(&mut run, tiled), PassStatus::Done);
            assert_eq!(renderer.progress().sample_count(), 2);
            let image = renderer.image();
            assert!(all_pixels(&image).iter().all(|&c| approx(c, Color::new(1.0, 0.0, 0.0))));

            // Turn around: the wall is now behind the camera
            source.update_camera(|camera| camera.look_at = Vec3::Z);
            assert_eq!(renderer.progressive_step(&mut run, tiled), PassStatus::Done);

            assert_eq!(run.samples, 1);
            assert_eq!(renderer.progress().sample_count(), 1);
            assert_eq!(renderer.progress().restarts(), 1);
            // Only post-change radiance: sqrt of the background, no red left
            let expected = Color::new(0.0, 0.0, 0.5);
            assert!(all_pixels(&image).iter().all(|&c| approx(c, expected)));
        }
    }

    #[test]
    fn test_progressive_scene_change_rebuilds_world() {
        let source = Arc::new(SharedSceneSource::new(wall_scene(Color::ONE), front_camera()));
        let settings = RenderSettings {
            background: Background::Solid(Color::ZERO),
            ..settings(RenderMode::MultiProgressive, 8, 8)
        };
        let mut renderer = Renderer::new(settings, source.clone()).unwrap();
        let mut run = renderer.start_progressive().unwrap();

        renderer.progressive_step(&mut run, true);
        source.set_scene(wall_scene(Color::new(0.0, 0.25, 0.0)));
        renderer.progressive_step(&mut run, true);

        assert_eq!(run.samples, 1);
        assert!(approx(renderer.image().get_pixel(3, 3), Color::new(0.0, 0.5, 0.0)));
    }

    #[test]
    fn test_bad_scene_update_keeps_previous_world() {
        let source = Arc::new(SharedSceneSource::new(wall_scene(Color::ONE), front_camera()));
        let settings = RenderSettings {
            background: Background::Solid(Color::ZERO),
            ..settings(RenderMode::SingleProgressive, 8, 8)
        };
        let mut renderer = Renderer::new(settings, source.clone()).unwrap();
        let mut run = renderer.start_progressive().unwrap();
        renderer.progressive_step(&mut run, false);

        let mut broken = SceneSnapshot::new();
        broken.add_shape(ShapeDesc::Sphere { center: Vec3::ZERO, radius: 1.0 }, 4);
        source.set_scene(broken);

        assert_eq!(renderer.progressive_step(&mut run, false), PassStatus::Done);
        assert_eq!(run.samples, 2);
        assert_eq!(renderer.progress().restarts(), 0);
        assert!(approx(renderer.image().get_pixel(0, 0), Color::ONE));
    }

    /// Reports scene version 0 for the first `flip_after` polls, then
    /// version 1 with a snapshot that fails to build.
    struct FlippingSource {
        scene: Arc<SceneSnapshot>,
        broken: Arc<SceneSnapshot>,
        camera: CameraSettings,
        polls: AtomicU64,
        flip_after: u64,
    }

    impl FlippingSource {
        fn flipped(&self) -> bool {
            self.polls.load(Ordering::SeqCst) > self.flip_after
        }
    }

    impl SceneSource for FlippingSource {
        fn scene_version(&self) -> u64 {
            self.polls.fetch_add(1, Ordering::SeqCst);
            u64::from(self.flipped())
        }

        fn camera_version(&self) -> u64 {
            0
        }

        fn scene(&self) -> Versioned<Arc<SceneSnapshot>> {
            if self.flipped() {
                Versioned { version: 1, value: self.broken.clone() }
            } else {
                Versioned { version: 0, value: self.scene.clone() }
            }
        }

        fn camera(&self) -> Versioned<CameraSettings> {
            Versioned { version: 0, value: self.camera }
        }
    }

    #[test]
    fn test_interrupted_pass_restarts_accumulation() {
        let mut broken = SceneSnapshot::new();
        broken.add_shape(ShapeDesc::Sphere { center: Vec3::ZERO, radius: 1.0 }, 2);

        // One poll per refresh plus one per row: the second pass sees the
        // new version when it reaches row 3.
        let source = Arc::new(FlippingSource {
            scene: Arc::new(wall_scene(Color::ONE)),
            broken: Arc::new(broken),
            camera: front_camera(),
            polls: AtomicU64::new(0),
            flip_after: 13,
        });
        let settings = RenderSettings {
            background: Background::Solid(Color::ZERO),
            ..settings(RenderMode::SingleProgressive, 8, 8)
        };
        let mut renderer = Renderer::new(settings, source).unwrap();
        let mut run = renderer.start_progressive().unwrap();

        assert_eq!(renderer.progressive_step(&mut run, false), PassStatus::Done);
        assert_eq!(renderer.progressive_step(&mut run, false), PassStatus::Interrupted);
        assert_eq!(renderer.progressive_step(&mut run, false), PassStatus::Done);

        assert_eq!(run.samples, 1);
        assert_eq!(renderer.progress().sample_count(), 1);
        assert!(all_pixels(&renderer.image()).iter().all(|&c| approx(c, Color::ONE)));
    }

    #[test]
    fn test_accumulate_tile_stops_between_samples() {
        let mut textures = TextureCache::new();
        let world = World::from_snapshot(&wall_scene(Color::ONE), &mut textures).unwrap();
        let camera = Camera::new(&front_camera(), 1.0).unwrap();
        let settings = settings(RenderMode::MultiProgressive, 4, 4);
        let tracer = Tracer::new(&world, &camera, &settings);
        let image = TiledImage::with_tile_size(4, 4, 4, Color::ZERO).unwrap();
        let mut accum = AccumulationBuffer::new(&generate_buckets(4, 4, 4), 4, 4).unwrap();
        let mut rng = job_rng(1, 0, 1);

        let calls = Cell::new(0);
        let stop_after_five = || {
            calls.set(calls.get() + 1);
            calls.get() > 5
        };
        let tile = &mut accum.tiles_mut()[0];
        assert!(!accumulate_tile(&tracer, tile, 1, &mut rng, &image, &stop_after_five));

        let sampled = tile
            .bucket()
            .pixels()
            .filter(|&(x, y)| tile.sum(x, y) != Color::ZERO)
            .count();
        assert_eq!(sampled, 5);
    }

    #[test]
    fn test_run_picks_up_updates_after_construction() {
        let source = Arc::new(SharedSceneSource::new(wall_scene(Color::ONE), front_camera()));
        let settings = RenderSettings {
            background: Background::Solid(Color::ZERO),
            ..settings(RenderMode::SingleThread, 8, 8)
        };
        let mut renderer = Renderer::new(settings, source.clone()).unwrap();

        source.set_scene(wall_scene(Color::new(0.0, 0.25, 0.0)));
        assert_eq!(renderer.run().unwrap(), RenderOutcome::Completed);
        assert!(approx(renderer.image().get_pixel(3, 3), Color::new(0.0, 0.5, 0.0)));
    }

    #[test]
    fn test_spawned_progressive_render_cancels() {
        init_logging();
        for mode in [RenderMode::SingleProgressive, RenderMode::MultiProgressive] {
            let source = Arc::new(SharedSceneSource::new(sphere_scene(), front_camera()));
            let renderer = Renderer::new(settings(mode, 16, 16), source).unwrap();
            let handle = renderer.spawn();

            let deadline = Instant::now() + Duration::from_secs(30);
            while handle.progress().sample_count() < 1 && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(5));
            }
            assert!(handle.progress().sample_count() >= 1);
            assert!(!handle.is_finished());

            handle.cancel();
            assert_eq!(handle.join().unwrap(), RenderOutcome::Cancelled);
        }
    }

    #[test]
    fn test_cancel_before_run() {
        let source = Arc::new(SharedSceneSource::new(sphere_scene(), front_camera()));
        let mut renderer = Renderer::new(settings(RenderMode::SingleThread, 16, 16), source).unwrap();
        renderer.cancel_token().cancel();

        assert_eq!(renderer.run().unwrap(), RenderOutcome::Cancelled);
        assert_eq!(renderer.state(), RenderState::Cancelled);
        assert!(renderer.progress().fraction() < 1.0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let source = Arc::new(SharedSceneSource::new(sphere_scene(), front_camera()));
        let result = Renderer::new(settings(RenderMode::SingleThread, 0, 16), source);
        assert!(matches!(result, Err(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn test_degenerate_camera_rejected() {
        let camera = CameraSettings::new(Vec3::ONE, Vec3::ONE, Vec3::Y);
        let source = Arc::new(SharedSceneSource::new(sphere_scene(), camera));
        let result = Renderer::new(settings(RenderMode::SingleThread, 8, 8), source);
        assert!(matches!(result, Err(RenderError::DegenerateCamera(_))));
    }

    #[test]
    fn test_job_rng_streams_differ() {
        let mut a = job_rng(1, 0, 1);
        let mut b = job_rng(1, 1, 1);
        let mut c = job_rng(1, 0, 2);
        let (x, y, z) = (a.next_u64(), b.next_u64(), c.next_u64());
        assert_ne!(x, y);
        assert_ne!(x, z);
        assert_eq!(job_rng(1, 0, 1).next_u64(), x);
    }
}

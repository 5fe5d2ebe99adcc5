//! The per-tick driver.
//!
//! [`Simulation`] owns one [`SimulationContext`] holding every piece of mutable state. A
//! tick runs, in order: queued commands and picking, camera update, chunk streaming,
//! physics sub-steps, proxy sync, selection info refresh and frame statistics. The
//! returned [`FrameReport`] is all a renderer needs for that frame.

use std::time::Duration;

use nalgebra::{Vector2, Vector3};

use crate::body::{BodyId, BodyRegistry, VisualProxy, default_spawn_records};
use crate::camera::{CameraController, CameraMode, CameraPose};
use crate::chunk::{ChunkCoord, ChunkDelta, ChunkStore};
use crate::config::SimConfig;
use crate::constants::{COARSE_NORMALIZATION_SAMPLES, FPS_SMOOTHING};
use crate::input::{Command, InputSnapshot};
use crate::physics::PhysicsWorld;
use crate::selection::{SelectionController, SelectionInfo, Viewport, ray_from_screen};
use crate::terrain::{NormalizationPolicy, TerrainSampler};

/// Smoothed frame rate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub fps: f32,
    pub frames: u64,
}

impl FrameStats {
    pub fn record(&mut self, dt: f32) {
        self.frames += 1;
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let instant = 1.0 / dt;
        self.fps = if self.fps == 0.0 {
            instant
        } else {
            self.fps + (instant - self.fps) * FPS_SMOOTHING
        };
    }
}

/// Values shown by the presentation layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HudSnapshot {
    pub fps: f32,
    pub camera_mode: CameraMode,
    /// Chunk under the camera.
    pub chunk: ChunkCoord,
    pub resident_chunks: usize,
    pub body_count: usize,
    pub selection: Option<SelectionInfo>,
}

/// Output of one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// `None` once the simulation is torn down.
    pub camera: Option<CameraPose>,
    pub chunks: ChunkDelta,
    pub bodies: Vec<VisualProxy>,
    pub hud: HudSnapshot,
    pub substeps: u32,
}

/// What [`Simulation::teardown`] released, and what the solver still held afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub chunks_released: usize,
    pub bodies_released: usize,
    pub colliders_left: usize,
    pub bodies_left: usize,
}

/// All mutable simulation state.
pub struct SimulationContext {
    pub config: SimConfig,
    pub sampler: TerrainSampler,
    pub physics: PhysicsWorld,
    pub chunks: ChunkStore,
    pub bodies: BodyRegistry,
    pub camera: CameraController,
    pub selection: SelectionController,
    pub stats: FrameStats,
    pub viewport: Option<Viewport>,
    /// Simulated wall-clock time since creation.
    pub elapsed: Duration,
    /// Chunk changes not yet reported by a tick.
    pending_chunks: ChunkDelta,
}

fn calibrate(config: &SimConfig) -> TerrainSampler {
    let chunk = &config.chunk;
    let policy = if chunk.streaming {
        NormalizationPolicy::CoarseGrid {
            extent: chunk.size * (2 * chunk.radius.max(0) + 1) as f32,
            samples: COARSE_NORMALIZATION_SAMPLES,
        }
    } else {
        NormalizationPolicy::FullResolution {
            size: chunk.static_size,
            resolution: chunk.static_resolution,
        }
    };
    TerrainSampler::calibrated(config.terrain, config.color, policy)
}

fn new_store(config: &SimConfig) -> ChunkStore {
    let chunk = &config.chunk;
    if chunk.streaming {
        ChunkStore::new(chunk.size, chunk.resolution, chunk.radius)
    } else {
        ChunkStore::new(chunk.static_size, chunk.static_resolution, 0)
    }
}

impl SimulationContext {
    fn new(config: SimConfig) -> Self {
        let sampler = calibrate(&config);
        let mut physics = PhysicsWorld::new(&config.physics);
        let mut chunks = new_store(&config);
        let camera = CameraController::new(&config.camera);

        let center = Self::viewer_chunk(&config, &chunks, &camera.pose());
        let pending_chunks = chunks.ensure_chunks_around(center, &sampler, &mut physics);

        let mut ctx = Self {
            config,
            sampler,
            physics,
            chunks,
            bodies: BodyRegistry::new(),
            camera,
            selection: SelectionController::new(),
            stats: FrameStats::default(),
            viewport: None,
            elapsed: Duration::ZERO,
            pending_chunks,
        };
        ctx.spawn_default_bodies();
        ctx
    }

    fn viewer_chunk(config: &SimConfig, chunks: &ChunkStore, pose: &CameraPose) -> ChunkCoord {
        if config.chunk.streaming {
            chunks.coordinate_of(pose.position.x, pose.position.z)
        } else {
            ChunkCoord::ORIGIN
        }
    }

    fn spawn_default_bodies(&mut self) {
        let layout = default_spawn_records(self.config.bodies.body_count, &self.sampler);
        for (shape, mass, position) in layout {
            if let Err(err) = self.bodies.spawn(&mut self.physics, shape, mass, position) {
                log::warn!("skipping body at ({:.1}, {:.1}): {err}", position.x, position.z);
            }
        }
        log::info!("spawned {} bodies", self.bodies.len());
    }

    fn body_position(&self, id: BodyId) -> Option<Vector3<f32>> {
        self.bodies.get(id).map(|e| e.proxy.translation)
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::ToggleOrbit => self.camera.toggle_orbit(),
            Command::Reset => self.bodies.reset_all(&mut self.physics),
            Command::CenterOnSelection => {
                let Some(id) = self.selection.selected() else {
                    return;
                };
                match self.body_position(id) {
                    Some(p) => self.camera.center_on(p),
                    None => log::warn!("center on unknown body {id}"),
                }
            }
            Command::FollowSelection => {
                if !self.config.bodies.follow_enabled {
                    log::debug!("follow requested while follow mode is disabled");
                    return;
                }
                let Some(id) = self.selection.selected() else {
                    return;
                };
                match self.body_position(id) {
                    Some(p) => self.camera.follow(id, p),
                    None => log::warn!("follow unknown body {id}"),
                }
            }
            Command::CycleNext => {
                let order = self.bodies.ids();
                self.selection.cycle_next(&order);
            }
            Command::CyclePrevious => {
                let order = self.bodies.ids();
                self.selection.cycle_previous(&order);
            }
            Command::Cancel => self.camera.cancel(&self.config.camera),
        }
    }

    fn pick(&mut self, screen: Vector2<f32>) {
        let Some(viewport) = self.viewport else {
            return;
        };
        let pose = self.camera.pose();
        if let Some(ray) = ray_from_screen(screen, &viewport, &pose, &self.config.camera) {
            self.selection.pick(&ray, self.bodies.proxies());
        }
    }

    fn tick(&mut self, dt: f32, input: &InputSnapshot) -> FrameReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += Duration::try_from_secs_f32(dt).unwrap_or(Duration::ZERO);

        for &command in &input.commands {
            self.run_command(command);
        }
        if let Some(screen) = input.pick {
            self.pick(screen);
        }

        let bodies = &self.bodies;
        let pose = self.camera.update(dt, &input.camera_input(), &self.config.camera, |id| {
            bodies.get(id).map(|e| e.proxy.translation)
        });

        let center = Self::viewer_chunk(&self.config, &self.chunks, &pose);
        let mut chunks = std::mem::take(&mut self.pending_chunks);
        chunks.merge(
            self.chunks
                .ensure_chunks_around(center, &self.sampler, &mut self.physics),
        );

        let store = &self.chunks;
        self.bodies.park_unsupported(&mut self.physics, |p| {
            store.contains(store.coordinate_of(p.x, p.z))
        });

        let substeps = self.physics.step(dt);
        self.bodies.sync_proxies(&self.physics);
        self.selection.refresh_info(self.elapsed, &self.bodies);
        self.stats.record(dt);

        FrameReport {
            camera: Some(pose),
            chunks,
            bodies: self.bodies.proxies().copied().collect(),
            hud: HudSnapshot {
                fps: self.stats.fps,
                camera_mode: self.camera.mode(),
                chunk: center,
                resident_chunks: self.chunks.len(),
                body_count: self.bodies.len(),
                selection: self.selection.info().copied(),
            },
            substeps,
        }
    }

    fn respawn_bodies(&mut self) {
        if let Some(id) = self.camera.followed_body() {
            self.camera.drop_follow(id);
        }
        self.selection.clear();
        self.bodies.clear(&mut self.physics);
        self.spawn_default_bodies();
    }

    fn apply_config(&mut self, new: SimConfig) {
        let old = self.config;
        if old == new {
            return;
        }
        self.config = new;

        if old.terrain_changed(&new) {
            self.sampler = calibrate(&new);
            if old.chunk != new.chunk {
                let destroyed = self.chunks.clear(&mut self.physics);
                self.pending_chunks.merge(ChunkDelta {
                    created: Vec::new(),
                    destroyed,
                });
                self.chunks = new_store(&new);
            } else {
                let delta = self.chunks.rebuild(&self.sampler, &mut self.physics);
                self.pending_chunks.merge(delta);
            }
            let center = Self::viewer_chunk(&new, &self.chunks, &self.camera.pose());
            let delta = self
                .chunks
                .ensure_chunks_around(center, &self.sampler, &mut self.physics);
            self.pending_chunks.merge(delta);
            self.physics.wake_all();
        }

        if old.physics != new.physics {
            let p = &new.physics;
            self.physics.set_gravity_multiplier(p.gravity_multiplier);
            self.physics.set_bounce_multiplier(p.bounce_multiplier);
            if (old.physics.fixed_dt, old.physics.max_frame_dt, old.physics.max_substeps)
                != (p.fixed_dt, p.max_frame_dt, p.max_substeps)
            {
                self.physics
                    .set_step_timing(p.fixed_dt, p.max_frame_dt, p.max_substeps);
            }
        }

        if old.bodies.body_count != new.bodies.body_count {
            self.respawn_bodies();
        }
        if !new.bodies.follow_enabled && self.camera.mode() == CameraMode::Follow {
            if let Some(id) = self.camera.followed_body() {
                self.camera.drop_follow(id);
            }
        }

        log::info!("configuration applied");
    }

    fn teardown(&mut self) -> TeardownReport {
        let chunks = self.chunks.clear(&mut self.physics);
        let bodies = self.bodies.clear(&mut self.physics);
        self.selection.clear();
        self.camera.cancel(&self.config.camera);

        let report = TeardownReport {
            chunks_released: chunks.len(),
            bodies_released: bodies.len(),
            colliders_left: self.physics.collider_count(),
            bodies_left: self.physics.body_count(),
        };
        if report.colliders_left > 0 || report.bodies_left > 0 {
            log::warn!("teardown left solver objects behind: {report:?}");
        }
        log::info!(
            "simulation torn down: {} chunks, {} bodies released",
            report.chunks_released,
            report.bodies_released
        );
        report
    }
}

/// Owner of the simulation state. After [`Simulation::teardown`] every call is a no-op.
pub struct Simulation {
    ctx: Option<SimulationContext>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        log::info!(
            "simulation starting ({} terrain, {} bodies)",
            if config.chunk.streaming { "streamed" } else { "static" },
            config.bodies.body_count
        );
        Self {
            ctx: Some(SimulationContext::new(config)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_some()
    }

    /// Viewport used for picking. Picks are ignored until one is set.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if let Some(ctx) = self.ctx.as_mut() {
            let viewport = Viewport::new(width, height);
            ctx.viewport = viewport.is_valid().then_some(viewport);
        }
    }

    /// Advance by `dt` seconds of wall-clock time.
    pub fn tick(&mut self, dt: f32, input: &InputSnapshot) -> FrameReport {
        match self.ctx.as_mut() {
            Some(ctx) => ctx.tick(dt, input),
            None => FrameReport::default(),
        }
    }

    pub fn apply_config(&mut self, config: SimConfig) {
        if let Some(ctx) = self.ctx.as_mut() {
            ctx.apply_config(config);
        }
    }

    /// Release every chunk and body and stop. `None` if already torn down.
    pub fn teardown(&mut self) -> Option<TeardownReport> {
        self.ctx.take().map(|mut ctx| ctx.teardown())
    }

    pub fn context(&self) -> Option<&SimulationContext> {
        self.ctx.as_ref()
    }

    pub fn config(&self) -> Option<&SimConfig> {
        self.ctx.as_ref().map(|c| &c.config)
    }

    pub fn chunks(&self) -> Option<&ChunkStore> {
        self.ctx.as_ref().map(|c| &c.chunks)
    }

    pub fn registry(&self) -> Option<&BodyRegistry> {
        self.ctx.as_ref().map(|c| &c.bodies)
    }

    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.ctx.as_ref().map(|c| &c.physics)
    }

    pub fn camera(&self) -> Option<&CameraController> {
        self.ctx.as_ref().map(|c| &c.camera)
    }

    pub fn selection(&self) -> Option<&SelectionController> {
        self.ctx.as_ref().map(|c| &c.selection)
    }
}

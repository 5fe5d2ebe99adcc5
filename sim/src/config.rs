//! Runtime-adjustable simulation settings.
//!
//! Every field here can change while the simulation runs; see
//! [`Simulation::apply_config`](crate::Simulation::apply_config) for how each group takes effect.

use crate::constants::{FIXED_DT_S, MAX_FRAME_DT_S, MAX_SUBSTEPS};
use crate::terrain::Rgb;

/// Shape parameters of the elevation function. All lengths in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainParams {
    /// Seed mixed into the lattice hash.
    pub seed: u32,
    /// Multiplier on the mountain term.
    pub mountain_scale: f32,
    /// Multiplier on the basin depth.
    pub lake_scale: f32,
    /// Constant added to every height before normalization.
    pub uplift: f32,

    pub hills_frequency: f32,
    pub hills_amplitude: f32,

    pub mountain_frequency: f32,
    pub mountain_amplitude: f32,
    /// fbm level under which the mountain term contributes nothing.
    pub mountain_base: f32,
    /// Exponent (> 1) sharpening the peaks.
    pub mountain_exponent: f32,

    pub lake_frequency: f32,
    pub lake_depth: f32,
    /// Inverted fbm level above which basins appear.
    pub lake_threshold: f32,

    pub detail_frequency: f32,
    pub detail_amplitude: f32,

    pub ripple_frequency: f32,
    pub ripple_amplitude: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 1337,
            mountain_scale: 1.0,
            lake_scale: 1.0,
            uplift: 0.0,
            hills_frequency: 1.0 / 1600.0,
            hills_amplitude: 160.0,
            mountain_frequency: 1.0 / 900.0,
            mountain_amplitude: 520.0,
            mountain_base: 0.55,
            mountain_exponent: 1.8,
            lake_frequency: 1.0 / 1200.0,
            lake_depth: 110.0,
            lake_threshold: 0.62,
            detail_frequency: 1.0 / 260.0,
            detail_amplitude: 36.0,
            ripple_frequency: 0.045,
            ripple_amplitude: 2.5,
        }
    }
}

/// Height to color mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorStyle {
    pub low: Rgb,
    /// Middle stop at t = 0.5. `None` gives a two-stop ramp.
    pub mid: Option<Rgb>,
    pub high: Rgb,
    /// Posterization band count. Values below 2 disable banding.
    pub bands: u32,
    /// Number of faux contour lines over the height range. 0 disables them.
    pub contour_count: u32,
    /// Width of a contour line as a fraction of one contour interval.
    pub contour_width: f32,
    /// Color multiplier applied on contour lines.
    pub contour_shade: f32,
}

impl Default for ColorStyle {
    fn default() -> Self {
        Self {
            low: [0.16, 0.32, 0.46],
            mid: Some([0.33, 0.52, 0.27]),
            high: [0.92, 0.90, 0.86],
            bands: 9,
            contour_count: 18,
            contour_width: 0.06,
            contour_shade: 0.7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkSettings {
    /// Stream chunks around the camera. When off, a single static terrain is built.
    pub streaming: bool,
    /// Edge length of one chunk (world units).
    pub size: f32,
    /// Grid cells per chunk edge.
    pub resolution: u32,
    /// Chebyshev radius of resident chunks around the viewer chunk.
    pub radius: i32,
    /// Edge length of the static terrain when streaming is off.
    pub static_size: f32,
    /// Grid cells per edge of the static terrain.
    pub static_resolution: u32,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            streaming: true,
            size: 800.0,
            resolution: 48,
            radius: 2,
            static_size: 3200.0,
            static_resolution: 160,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSettings {
    /// Pinned vertical coordinate for free-fly and follow.
    pub height: f32,
    pub orbit_radius: f32,
    pub orbit_height: f32,
    /// Orbit angular speed (radians per second).
    pub orbit_speed: f32,
    /// Free-fly translation speed (world units per second).
    pub fly_speed: f32,
    /// Radians of yaw/pitch per pixel of pointer drag.
    pub drag_sensitivity: f32,
    /// Vertical field of view (radians).
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            height: 520.0,
            orbit_radius: 1400.0,
            orbit_height: 520.0,
            orbit_speed: 0.12,
            fly_speed: 420.0,
            drag_sensitivity: 0.004,
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 1.0,
            far: 20_000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsSettings {
    pub gravity_multiplier: f32,
    pub bounce_multiplier: f32,
    pub fixed_dt: f32,
    pub max_frame_dt: f32,
    pub max_substeps: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity_multiplier: 1.0,
            bounce_multiplier: 1.0,
            fixed_dt: FIXED_DT_S,
            max_frame_dt: MAX_FRAME_DT_S,
            max_substeps: MAX_SUBSTEPS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnSettings {
    pub body_count: u32,
    /// Allow the `FollowSelection` command.
    pub follow_enabled: bool,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            body_count: 12,
            follow_enabled: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimConfig {
    pub terrain: TerrainParams,
    pub color: ColorStyle,
    pub chunk: ChunkSettings,
    pub camera: CameraSettings,
    pub physics: PhysicsSettings,
    pub bodies: SpawnSettings,
}

impl SimConfig {
    /// Whether switching from `self` to `other` requires regenerating terrain.
    pub fn terrain_changed(&self, other: &SimConfig) -> bool {
        self.terrain != other.terrain || self.color != other.color || self.chunk != other.chunk
    }
}

use std::time::Duration;

/// Fixed physics sub-step in seconds.
pub const FIXED_DT_S: f32 = 1.0 / 60.0;

/// Largest wall-clock delta accepted per frame before it is split into sub-steps.
///
/// A stalled frame (tab switch, debugger, slow chunk build) is clamped to this value so the
/// simulation never tries to catch up on the full stall.
pub const MAX_FRAME_DT_S: f32 = 0.1;

/// Upper bound on physics sub-steps per frame.
pub const MAX_SUBSTEPS: u32 = 5;

/// Gravity magnitude before the runtime multiplier is applied (world units per second squared).
///
/// World units are large (bodies are tens of units across), so this is not 9.81.
pub const BASE_GRAVITY: f32 = 98.1;

/// Minimum time between two refreshes of the displayed selection info.
pub const SELECTION_REFRESH_INTERVAL: Duration = Duration::from_millis(150);

/// Number of value-noise octaves accumulated by the fractal sum.
pub const FBM_OCTAVES: u32 = 6;

/// Pitch clamp for free-fly look (radians). Keeps the view away from the poles.
pub const MAX_PITCH_RAD: f32 = 1.2;

/// Follow offsets shorter than this are considered degenerate (world units).
pub const MIN_FOLLOW_OFFSET: f32 = 1.0;

/// Offset substituted when the captured follow offset is degenerate.
pub const DEFAULT_FOLLOW_OFFSET: [f32; 3] = [0.0, 180.0, 420.0];

/// Practical epsilon for direction derivation (squared length).
pub const DIR_EPS_SQ: f32 = 1.0e-8;

/// Height above the sampled ground at which bodies spawn (world units).
pub const SPAWN_CLEARANCE: f32 = 240.0;

/// Angular spacing of the spawn spiral (golden angle, radians).
pub const SPAWN_SPIRAL_ANGLE: f32 = 2.399_963;

/// Radial spacing of the spawn spiral (world units).
pub const SPAWN_SPIRAL_SPACING: f32 = 110.0;

/// Smoothing factor of the frames-per-second moving average.
pub const FPS_SMOOTHING: f32 = 0.1;

/// Samples per edge of the coarse grid used to find sea level when chunks stream.
pub const COARSE_NORMALIZATION_SAMPLES: u32 = 65;

/// Rapier length unit. World units are ten times Rapier's default scale.
pub const WORLD_LENGTH_UNIT: f32 = 10.0;

/// Distance below which contacts are generated before shapes touch (world units). Covers
/// more than one fixed step of travel for a body falling from the spawn clearance.
pub const CONTACT_PREDICTION_DISTANCE: f32 = 8.0;

/// Per-body soft-CCD look-ahead (world units) for fast bodies.
pub const SOFT_CCD_PREDICTION: f32 = 40.0;

/// Rate (1/s) at which free-fly height converges on the configured camera height.
pub const FLY_HEIGHT_EASE_RATE: f32 = 6.0;

/// Distance from the configured camera height below which free-fly snaps onto it.
pub const FLY_HEIGHT_SNAP: f32 = 0.05;

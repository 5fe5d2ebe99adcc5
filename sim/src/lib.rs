pub mod body;
pub mod camera;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod frame;
pub mod input;
pub mod physics;
pub mod selection;
pub mod tag;
pub mod terrain;

pub use body::{
    BodyEntry, BodyId, BodyRegistry, BodyShape, SpawnRecord, VisualProxy, default_spawn_records,
};
pub use camera::{CameraController, CameraInput, CameraMode, CameraPose, FollowTarget};
pub use chunk::{Chunk, ChunkCoord, ChunkDelta, ChunkStore, chunk_coordinate_of};
pub use config::{
    CameraSettings, ChunkSettings, ColorStyle, PhysicsSettings, SimConfig, SpawnSettings,
    TerrainParams,
};
pub use frame::{
    FrameReport, FrameStats, HudSnapshot, Simulation, SimulationContext, TeardownReport,
};
pub use input::{Command, InputQueue, InputSnapshot, MoveFlags, MoveKey, RawInput};
pub use physics::{BodyState, ContactMaterials, MaterialPair, PhysicsWorld, StepClock};
pub use selection::{SelectionController, SelectionInfo, Viewport, ray_from_screen};
pub use tag::{ColliderTag, SurfaceKind};
pub use terrain::{GridGeometry, GridSpec, NormalizationPolicy, Rgb, TerrainSampler};

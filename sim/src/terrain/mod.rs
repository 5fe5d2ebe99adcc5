//! Procedural terrain: value noise, the composed elevation profile and tile sampling.

pub mod geometry;
pub mod noise;
pub mod sampler;

pub use geometry::{
    GridGeometry, GridSpec, HeightSample, build_height_matrix, build_mesh, grid_coord,
};
pub use noise::{fbm, lattice_hash, value_noise};
pub use sampler::{HeightRange, NormalizationPolicy, Rgb, TerrainSampler, color_for, raw_height};

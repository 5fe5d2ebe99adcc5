//! Terrain chunks streamed around the viewer.
//!
//! A chunk is keyed by its integer coordinate and centered on `coord * size`. It owns a
//! visual mesh and the matching height-field collider; both come from the same
//! [`TerrainSampler`] over the same [`GridSpec`], so their heights agree at every vertex.
//! Chunks are never edited in place. When terrain parameters change, [`ChunkStore::rebuild`]
//! throws them all away and builds them again.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use rapier3d::prelude::ColliderHandle;

use crate::physics::PhysicsWorld;
use crate::tag::{SurfaceKind, chunk_tag_id, pack_tag};
use crate::terrain::{GridGeometry, GridSpec, TerrainSampler, build_height_matrix, build_mesh};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const ORIGIN: ChunkCoord = ChunkCoord { x: 0, z: 0 };

    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chebyshev distance between two chunk coordinates.
    pub fn distance(&self, other: &ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

/// Chunk containing world `(x, z)`. Rounds to nearest, so chunk `(0, 0)` is centered on
/// the origin.
pub fn chunk_coordinate_of(x: f32, z: f32, size: f32) -> ChunkCoord {
    if !(size.is_finite() && size > 0.0) || !x.is_finite() || !z.is_finite() {
        return ChunkCoord::ORIGIN;
    }
    ChunkCoord {
        x: (x / size).round() as i32,
        z: (z / size).round() as i32,
    }
}

pub struct Chunk {
    pub coord: ChunkCoord,
    pub spec: GridSpec,
    pub geometry: GridGeometry,
    pub heights: DMatrix<f32>,
    /// `None` when the solver rejected the height field; the chunk is then visual-only.
    pub collider: Option<ColliderHandle>,
}

/// Chunks created and destroyed by one store operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkDelta {
    pub created: Vec<ChunkCoord>,
    pub destroyed: Vec<ChunkCoord>,
}

impl ChunkDelta {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.destroyed.is_empty()
    }

    /// Fold a later delta into this one.
    ///
    /// A chunk destroyed and then created again shows up in both lists, which is what a
    /// renderer needs to replace its mesh.
    pub fn merge(&mut self, later: ChunkDelta) {
        self.destroyed.extend(later.destroyed);
        self.created.extend(later.created);
    }
}

pub struct ChunkStore {
    size: f32,
    resolution: u32,
    radius: i32,
    center: Option<ChunkCoord>,
    chunks: BTreeMap<ChunkCoord, Chunk>,
}

impl ChunkStore {
    pub fn new(size: f32, resolution: u32, radius: i32) -> Self {
        Self {
            size,
            resolution: resolution.max(1),
            radius: radius.max(0),
            center: None,
            chunks: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Center of the last [`Self::ensure_chunks_around`] call.
    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    pub fn coordinate_of(&self, x: f32, z: f32) -> ChunkCoord {
        chunk_coordinate_of(x, z, self.size)
    }

    /// Grid of the chunk at `coord`.
    pub fn spec_for(&self, coord: ChunkCoord) -> GridSpec {
        GridSpec {
            center_x: coord.x as f32 * self.size,
            center_z: coord.z as f32 * self.size,
            size: self.size,
            resolution: self.resolution,
        }
    }

    /// Make every chunk within `radius` of `center` resident and drop those farther than
    /// `radius + 1`. Chunks in between are kept if they already exist.
    ///
    /// Calling this twice with the same center does nothing the second time.
    pub fn ensure_chunks_around(
        &mut self,
        center: ChunkCoord,
        sampler: &TerrainSampler,
        physics: &mut PhysicsWorld,
    ) -> ChunkDelta {
        self.center = Some(center);
        let mut delta = ChunkDelta::default();

        let stale: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|coord| coord.distance(&center) > self.radius + 1)
            .copied()
            .collect();
        for coord in stale {
            if self.destroy(coord, physics) {
                delta.destroyed.push(coord);
            }
        }

        for dz in -self.radius..=self.radius {
            for dx in -self.radius..=self.radius {
                let coord = ChunkCoord::new(center.x + dx, center.z + dz);
                if !self.chunks.contains_key(&coord) {
                    self.create(coord, sampler, physics);
                    delta.created.push(coord);
                }
            }
        }

        if !delta.is_empty() {
            log::debug!(
                "chunks around ({}, {}): +{} -{} ({} resident)",
                center.x,
                center.z,
                delta.created.len(),
                delta.destroyed.len(),
                self.chunks.len()
            );
        }
        delta
    }

    /// Dispose every chunk and recreate the resident set around the last center.
    pub fn rebuild(&mut self, sampler: &TerrainSampler, physics: &mut PhysicsWorld) -> ChunkDelta {
        let destroyed = self.clear(physics);
        let mut delta = ChunkDelta {
            created: Vec::new(),
            destroyed,
        };
        if let Some(center) = self.center {
            delta.merge(self.ensure_chunks_around(center, sampler, physics));
        }
        log::info!("terrain rebuilt: {} chunks", self.chunks.len());
        delta
    }

    /// Dispose every chunk. The last center is remembered for [`Self::rebuild`].
    pub fn clear(&mut self, physics: &mut PhysicsWorld) -> Vec<ChunkCoord> {
        let coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        for &coord in &coords {
            self.destroy(coord, physics);
        }
        coords
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn create(&mut self, coord: ChunkCoord, sampler: &TerrainSampler, physics: &mut PhysicsWorld) {
        let spec = self.spec_for(coord);
        let geometry = build_mesh(sampler, &spec);
        let heights = build_height_matrix(sampler, &spec);

        let tag = pack_tag(chunk_tag_id(coord.x, coord.z), SurfaceKind::Ground);
        let collider =
            match physics.insert_height_field(spec.center_x, spec.center_z, spec.size, &heights, tag)
            {
                Ok(handle) => Some(handle),
                Err(err) => {
                    log::warn!("chunk ({}, {}) has no collider: {err}", coord.x, coord.z);
                    None
                }
            };

        self.chunks.insert(
            coord,
            Chunk {
                coord,
                spec,
                geometry,
                heights,
                collider,
            },
        );
    }

    fn destroy(&mut self, coord: ChunkCoord, physics: &mut PhysicsWorld) -> bool {
        let Some(chunk) = self.chunks.remove(&coord) else {
            return false;
        };
        if let Some(handle) = chunk.collider {
            physics.remove_collider(handle);
        }
        true
    }
}

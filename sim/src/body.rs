//! Spawned bodies: immutable spawn templates, their solver handles and render proxies.
//!
//! Every live body has exactly one [`BodyEntry`]: the [`SpawnRecord`] it was created from,
//! the Rapier handles and the [`VisualProxy`] the rendering layer reads. Proxies are only
//! ever written from solver state (see [`BodyRegistry::sync_proxies`]).

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

use crate::constants::{SPAWN_CLEARANCE, SPAWN_SPIRAL_ANGLE, SPAWN_SPIRAL_SPACING};
use crate::physics::{BodyState, PhysicsWorld};
use crate::terrain::{TerrainSampler, lattice_hash};

/// Stable identifier handed out at spawn time. Ids are never reused within a registry.
pub type BodyId = u32;

/// Collision shape of a body, with its size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyShape {
    Box { half_extents: Vector3<f32> },
    Sphere { radius: f32 },
}

impl BodyShape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            BodyShape::Box { .. } => "box",
            BodyShape::Sphere { .. } => "sphere",
        }
    }

    /// Radius of a sphere enclosing the shape.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            BodyShape::Box { half_extents } => half_extents.norm(),
            BodyShape::Sphere { radius } => radius,
        }
    }
}

/// Template used to create a body and to reset it later.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRecord {
    pub id: BodyId,
    pub shape: BodyShape,
    pub mass: f32,
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl SpawnRecord {
    pub fn new(id: BodyId, shape: BodyShape, mass: f32, position: Vector3<f32>) -> Self {
        Self {
            id,
            shape,
            mass,
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Spawn pose with zero velocities.
    pub fn initial_state(&self) -> BodyState {
        BodyState::at_rest(self.position, self.rotation)
    }
}

/// Renderable transform of a body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualProxy {
    pub id: BodyId,
    pub shape: BodyShape,
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl VisualProxy {
    pub fn isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }
}

#[derive(Clone, Debug)]
pub struct BodyEntry {
    pub record: SpawnRecord,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub proxy: VisualProxy,
    /// Last synchronized linear velocity.
    pub linvel: Vector3<f32>,
}

/// Live bodies in spawn order.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    entries: Vec<BodyEntry>,
    next_id: BodyId,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a body from `shape`/`mass`/`position` and register its spawn record.
    pub fn spawn(
        &mut self,
        physics: &mut PhysicsWorld,
        shape: BodyShape,
        mass: f32,
        position: Vector3<f32>,
    ) -> Result<BodyId, &'static str> {
        let record = SpawnRecord::new(self.next_id, shape, mass, position);
        let (body, collider) = physics.spawn_body(&record)?;
        self.next_id += 1;

        self.entries.push(BodyEntry {
            record,
            body,
            collider,
            proxy: VisualProxy {
                id: record.id,
                shape,
                translation: record.position,
                rotation: record.rotation,
            },
            linvel: Vector3::zeros(),
        });
        Ok(record.id)
    }

    /// Put every body back at its spawn pose with zero velocity, awake.
    pub fn reset_all(&mut self, physics: &mut PhysicsWorld) {
        for entry in &mut self.entries {
            let initial = entry.record.initial_state();
            physics.set_body_state(entry.body, &initial);
            entry.proxy.translation = initial.translation;
            entry.proxy.rotation = initial.rotation;
            entry.linvel = initial.linvel;
        }
        log::info!("reset {} bodies to their spawn state", self.entries.len());
    }

    /// Copy solver poses into the render proxies.
    pub fn sync_proxies(&mut self, physics: &PhysicsWorld) {
        for entry in &mut self.entries {
            if let Some(state) = physics.body_state(entry.body) {
                entry.proxy.translation = state.translation;
                entry.proxy.rotation = state.rotation;
                entry.linvel = state.linvel;
            }
        }
    }

    /// Hold bodies that have no terrain under them.
    ///
    /// A body whose position fails `supported` is disabled in the solver, so it stays where
    /// it is instead of falling through unloaded ground. It resumes once `supported` holds
    /// again. Returns how many bodies are held after the call.
    pub fn park_unsupported(
        &mut self,
        physics: &mut PhysicsWorld,
        supported: impl Fn(&Vector3<f32>) -> bool,
    ) -> usize {
        let mut parked = 0;
        for entry in &self.entries {
            let want = supported(&entry.proxy.translation);
            if !want {
                parked += 1;
            }
            if physics.is_body_enabled(entry.body) == Some(want) {
                continue;
            }
            physics.set_body_enabled(entry.body, want);
            if want {
                log::debug!("body {} has ground again", entry.record.id);
            } else {
                log::debug!("body {} parked: no terrain below", entry.record.id);
            }
        }
        parked
    }

    /// Remove every body from the solver and forget it. Returns the removed ids.
    pub fn clear(&mut self, physics: &mut PhysicsWorld) -> Vec<BodyId> {
        self.entries
            .drain(..)
            .map(|entry| {
                physics.remove_body(entry.body);
                entry.record.id
            })
            .collect()
    }

    pub fn get(&self, id: BodyId) -> Option<&BodyEntry> {
        self.entries.iter().find(|e| e.record.id == id)
    }

    /// Index of a body in spawn order.
    pub fn position_of(&self, id: BodyId) -> Option<usize> {
        self.entries.iter().position(|e| e.record.id == id)
    }

    pub fn ids(&self) -> Vec<BodyId> {
        self.entries.iter().map(|e| e.record.id).collect()
    }

    pub fn entries(&self) -> &[BodyEntry] {
        &self.entries
    }

    pub fn proxies(&self) -> impl Iterator<Item = &VisualProxy> {
        self.entries.iter().map(|e| &e.proxy)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shape, mass and position of the `count` bodies of the default scene.
///
/// Bodies sit on a golden-angle spiral around the origin, alternating boxes and spheres,
/// each [`SPAWN_CLEARANCE`] above the terrain under it. Sizes come from the lattice hash so
/// the layout is the same on every run.
pub fn default_spawn_records(
    count: u32,
    sampler: &TerrainSampler,
) -> Vec<(BodyShape, f32, Vector3<f32>)> {
    (0..count)
        .map(|k| {
            let angle = k as f32 * SPAWN_SPIRAL_ANGLE;
            let r = SPAWN_SPIRAL_SPACING * ((k + 1) as f32).sqrt();
            let x = r * angle.cos();
            let z = r * angle.sin();
            let y = sampler.height(x, z) + SPAWN_CLEARANCE;

            let jitter = lattice_hash(k as i32, 17, sampler.params().seed);
            let (shape, mass) = if k % 2 == 0 {
                let h = 18.0 + 22.0 * jitter;
                (
                    BodyShape::Box {
                        half_extents: Vector3::new(h, h * 0.8, h * 1.1),
                    },
                    1.0 + 4.0 * jitter,
                )
            } else {
                (
                    BodyShape::Sphere {
                        radius: 20.0 + 20.0 * jitter,
                    },
                    1.0 + 3.0 * jitter,
                )
            };

            (shape, mass, Vector3::new(x, y, z))
        })
        .collect()
}

//! Rigid-body world built on Rapier.
//!
//! [`PhysicsWorld`] owns every Rapier set and is the only place the solver is stepped.
//! Callers hand in wall-clock deltas; [`StepClock`] turns them into a bounded number of
//! fixed sub-steps.
//!
//! Contact materials are resolved per pair (ground/box, ground/sphere, everything else) in
//! a solver-contact hook, using the [`SurfaceKind`] packed into each collider's user data.
//! Restitution scales with a global bounce multiplier and gravity with a gravity multiplier;
//! both can change at any time and wake every body so the change shows immediately.

use nalgebra::{DMatrix, Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use rapier3d::parry::query::Ray;
use rapier3d::prelude::*;

use crate::body::{BodyShape, SpawnRecord};
use crate::config::PhysicsSettings;
use crate::constants::{
    BASE_GRAVITY, CONTACT_PREDICTION_DISTANCE, SOFT_CCD_PREDICTION, WORLD_LENGTH_UNIT,
};
use crate::tag::{ColliderTag, SurfaceKind, pack_tag, try_unpack_kind};

/// Turns wall-clock deltas into fixed sub-steps.
///
/// - The delta is clamped to `max_frame_dt` before it is accumulated.
/// - At most `max_substeps` are taken per call. If the cap is hit, the backlog beyond one
///   partial step is dropped instead of being carried into the next frame.
#[derive(Clone, Copy, Debug)]
pub struct StepClock {
    pub fixed_dt: f32,
    pub max_frame_dt: f32,
    pub max_substeps: u32,
    accumulator: f32,
}

impl StepClock {
    pub fn new(fixed_dt: f32, max_frame_dt: f32, max_substeps: u32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(1.0e-4),
            max_frame_dt: max_frame_dt.max(0.0),
            max_substeps,
            accumulator: 0.0,
        }
    }

    /// Account for `wall_dt` seconds and return how many fixed steps to run now.
    pub fn advance(&mut self, wall_dt: f32) -> u32 {
        let dt = if wall_dt.is_finite() {
            wall_dt.clamp(0.0, self.max_frame_dt)
        } else {
            0.0
        };
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= self.fixed_dt && substeps < self.max_substeps {
            self.accumulator -= self.fixed_dt;
            substeps += 1;
        }

        if substeps == self.max_substeps && self.accumulator >= self.fixed_dt {
            self.accumulator %= self.fixed_dt;
        }

        substeps
    }

    /// Time carried over to the next call.
    pub fn pending(&self) -> f32 {
        self.accumulator
    }
}

/// Friction and restitution for one kind of contact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialPair {
    pub friction: f32,
    pub restitution: f32,
}

pub const GROUND_BOX_MATERIAL: MaterialPair = MaterialPair {
    friction: 0.6,
    restitution: 0.25,
};

pub const GROUND_SPHERE_MATERIAL: MaterialPair = MaterialPair {
    friction: 0.4,
    restitution: 0.55,
};

pub const DEFAULT_MATERIAL: MaterialPair = MaterialPair {
    friction: 0.5,
    restitution: 0.3,
};

/// Pair-specific contact materials, applied from the solver-contact hook.
#[derive(Clone, Copy, Debug)]
pub struct ContactMaterials {
    pub ground_box: MaterialPair,
    pub ground_sphere: MaterialPair,
    pub default: MaterialPair,
    pub bounce_multiplier: f32,
}

impl Default for ContactMaterials {
    fn default() -> Self {
        Self {
            ground_box: GROUND_BOX_MATERIAL,
            ground_sphere: GROUND_SPHERE_MATERIAL,
            default: DEFAULT_MATERIAL,
            bounce_multiplier: 1.0,
        }
    }
}

impl ContactMaterials {
    /// Effective material for a contact between two surfaces, bounce multiplier applied.
    pub fn pair(&self, a: Option<SurfaceKind>, b: Option<SurfaceKind>) -> MaterialPair {
        use SurfaceKind::*;

        let base = match (a, b) {
            (Some(Ground), Some(Box)) | (Some(Box), Some(Ground)) => self.ground_box,
            (Some(Ground), Some(Sphere)) | (Some(Sphere), Some(Ground)) => self.ground_sphere,
            _ => self.default,
        };

        MaterialPair {
            friction: base.friction,
            restitution: (base.restitution * self.bounce_multiplier).clamp(0.0, 1.0),
        }
    }
}

impl PhysicsHooks for ContactMaterials {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        let kind_of = |handle: ColliderHandle| {
            context
                .colliders
                .get(handle)
                .and_then(|c| try_unpack_kind(c.user_data))
        };
        let pair = self.pair(kind_of(context.collider1), kind_of(context.collider2));

        for contact in context.solver_contacts.iter_mut() {
            contact.friction = pair.friction;
            contact.restitution = pair.restitution;
        }
    }
}

/// Pose and velocities of one rigid body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub linvel: Vector3<f32>,
    pub angvel: Vector3<f32>,
}

impl BodyState {
    /// At rest at the given pose.
    pub fn at_rest(translation: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self {
            translation,
            rotation,
            linvel: Vector3::zeros(),
            angvel: Vector3::zeros(),
        }
    }
}

pub struct PhysicsWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    materials: ContactMaterials,
    gravity_multiplier: f32,
    clock: StepClock,
}

impl PhysicsWorld {
    pub fn new(settings: &PhysicsSettings) -> Self {
        let clock = StepClock::new(
            settings.fixed_dt,
            settings.max_frame_dt,
            settings.max_substeps,
        );

        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters {
                dt: clock.fixed_dt,
                length_unit: WORLD_LENGTH_UNIT,
                normalized_prediction_distance: CONTACT_PREDICTION_DISTANCE / WORLD_LENGTH_UNIT,
                ..IntegrationParameters::default()
            },
            materials: ContactMaterials {
                bounce_multiplier: settings.bounce_multiplier,
                ..ContactMaterials::default()
            },
            gravity_multiplier: settings.gravity_multiplier,
            clock,
        }
    }

    /// Advance by a wall-clock delta. Returns the number of fixed sub-steps taken.
    pub fn step(&mut self, wall_dt: f32) -> u32 {
        let substeps = self.clock.advance(wall_dt);
        let gravity = self.gravity();
        for _ in 0..substeps {
            self.pipeline.step(
                &gravity,
                &self.integration_parameters,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                &self.materials,
                &(),
            );
        }
        substeps
    }

    pub fn clock(&self) -> &StepClock {
        &self.clock
    }

    /// Replace the sub-stepping parameters. Pending time is dropped.
    pub fn set_step_timing(&mut self, fixed_dt: f32, max_frame_dt: f32, max_substeps: u32) {
        self.clock = StepClock::new(fixed_dt, max_frame_dt, max_substeps);
        self.integration_parameters.dt = self.clock.fixed_dt;
    }

    pub fn gravity(&self) -> Vector3<f32> {
        Vector3::new(0.0, -BASE_GRAVITY * self.gravity_multiplier, 0.0)
    }

    pub fn gravity_multiplier(&self) -> f32 {
        self.gravity_multiplier
    }

    pub fn set_gravity_multiplier(&mut self, multiplier: f32) {
        if !multiplier.is_finite() || multiplier == self.gravity_multiplier {
            return;
        }
        self.gravity_multiplier = multiplier;
        self.wake_all();
    }

    pub fn bounce_multiplier(&self) -> f32 {
        self.materials.bounce_multiplier
    }

    pub fn set_bounce_multiplier(&mut self, multiplier: f32) {
        if !multiplier.is_finite() || multiplier == self.materials.bounce_multiplier {
            return;
        }
        self.materials.bounce_multiplier = multiplier.max(0.0);
        self.wake_all();
    }

    pub fn materials(&self) -> &ContactMaterials {
        &self.materials
    }

    pub fn wake_all(&mut self) {
        for (_, rb) in self.bodies.iter_mut() {
            if rb.is_dynamic() {
                rb.wake_up(true);
            }
        }
    }

    /// Insert a static height-field collider.
    ///
    /// `heights` has rows along Z and columns along X and covers a square of edge `size`
    /// centered on `(center_x, center_z)`.
    pub fn insert_height_field(
        &mut self,
        center_x: f32,
        center_z: f32,
        size: f32,
        heights: &DMatrix<f32>,
        tag: ColliderTag,
    ) -> Result<ColliderHandle, &'static str> {
        if heights.nrows() < 2 || heights.ncols() < 2 {
            return Err("height field needs at least 2x2 samples");
        }
        if !(size.is_finite() && size > 0.0) {
            return Err("height field size must be positive");
        }
        if heights.iter().any(|h| !h.is_finite()) {
            return Err("height field contains non-finite heights");
        }

        let scale = Vector3::new(size, 1.0, size);
        let collider = ColliderBuilder::heightfield(heights.clone(), scale)
            .translation(Vector3::new(center_x, 0.0, center_z))
            .friction(DEFAULT_MATERIAL.friction)
            .restitution(DEFAULT_MATERIAL.restitution)
            .user_data(tag)
            .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS)
            .build();

        Ok(self.colliders.insert(collider))
    }

    /// Remove a parentless collider (terrain). Unknown handles are ignored.
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> bool {
        self.colliders
            .remove(handle, &mut self.islands, &mut self.bodies, true)
            .is_some()
    }

    /// Create a dynamic body for a spawn record.
    pub fn spawn_body(
        &mut self,
        record: &SpawnRecord,
    ) -> Result<(RigidBodyHandle, ColliderHandle), &'static str> {
        if !(record.mass.is_finite() && record.mass > 0.0) {
            return Err("body mass must be positive");
        }

        let (builder, kind) = match record.shape {
            BodyShape::Box { half_extents } => {
                if half_extents.iter().any(|e| !(e.is_finite() && *e > 0.0)) {
                    return Err("box half extents must be positive");
                }
                (
                    ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z),
                    SurfaceKind::Box,
                )
            }
            BodyShape::Sphere { radius } => {
                if !(radius.is_finite() && radius > 0.0) {
                    return Err("sphere radius must be positive");
                }
                (ColliderBuilder::ball(radius), SurfaceKind::Sphere)
            }
        };

        let pose = Isometry3::from_parts(Translation3::from(record.position), record.rotation);
        let rb = RigidBodyBuilder::dynamic()
            .pose(pose)
            .ccd_enabled(true)
            .soft_ccd_prediction(SOFT_CCD_PREDICTION)
            .build();
        let rb_handle = self.bodies.insert(rb);

        let collider = builder
            .mass(record.mass)
            .friction(DEFAULT_MATERIAL.friction)
            .restitution(DEFAULT_MATERIAL.restitution)
            .user_data(pack_tag(record.id as u64, kind))
            .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS)
            .build();
        let co_handle = self
            .colliders
            .insert_with_parent(collider, rb_handle, &mut self.bodies);

        Ok((rb_handle, co_handle))
    }

    /// Remove a body and its attached colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn body_state(&self, handle: RigidBodyHandle) -> Option<BodyState> {
        let rb = self.bodies.get(handle)?;
        Some(BodyState {
            translation: *rb.translation(),
            rotation: *rb.rotation(),
            linvel: *rb.linvel(),
            angvel: *rb.angvel(),
        })
    }

    /// Overwrite pose and velocities, clear accumulated forces and wake the body.
    pub fn set_body_state(&mut self, handle: RigidBodyHandle, state: &BodyState) -> bool {
        let Some(rb) = self.bodies.get_mut(handle) else {
            return false;
        };
        rb.set_translation(state.translation, true);
        rb.set_rotation(state.rotation, true);
        rb.set_linvel(state.linvel, true);
        rb.set_angvel(state.angvel, true);
        rb.reset_forces(true);
        rb.reset_torques(true);
        // A body put to sleep by the solver would otherwise stay frozen at its new pose.
        rb.wake_up(true);
        true
    }

    pub fn is_sleeping(&self, handle: RigidBodyHandle) -> Option<bool> {
        self.bodies.get(handle).map(|rb| rb.is_sleeping())
    }

    /// Enable or disable simulation of a body. A disabled body keeps its pose and velocity
    /// and neither moves nor collides until it is enabled again.
    pub fn set_body_enabled(&mut self, handle: RigidBodyHandle, enabled: bool) -> bool {
        let Some(rb) = self.bodies.get_mut(handle) else {
            return false;
        };
        rb.set_enabled(enabled);
        if enabled {
            rb.wake_up(true);
        }
        true
    }

    pub fn is_body_enabled(&self, handle: RigidBodyHandle) -> Option<bool> {
        self.bodies.get(handle).map(|rb| rb.is_enabled())
    }

    #[cfg(test)]
    pub(crate) fn sleep_body(&mut self, handle: RigidBodyHandle) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.sleep();
        }
    }

    /// Height of the first static surface below `(x, from_y, z)`, if any.
    ///
    /// Queries see the collider set as of the last solver step.
    pub fn ground_height(&self, x: f32, z: f32, from_y: f32) -> Option<f32> {
        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            QueryFilter::only_fixed(),
        );
        let ray = Ray::new(Point3::new(x, from_y, z), Vector3::new(0.0, -1.0, 0.0));
        query
            .cast_ray(&ray, f32::MAX, true)
            .map(|(_, toi)| from_y - toi)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{FIXED_DT_S, MAX_FRAME_DT_S, MAX_SUBSTEPS, SPAWN_CLEARANCE};

    fn clock() -> StepClock {
        StepClock::new(FIXED_DT_S, MAX_FRAME_DT_S, MAX_SUBSTEPS)
    }

    #[test]
    fn one_frame_at_fixed_rate_is_one_substep() {
        let mut c = clock();
        for _ in 0..120 {
            assert!(c.advance(FIXED_DT_S) <= 2);
        }
        // Over two seconds at 60 Hz, the total matches the elapsed time.
        let mut c = clock();
        let total: u32 = (0..120).map(|_| c.advance(FIXED_DT_S)).sum();
        assert!((119..=120).contains(&total));
    }

    #[test]
    fn large_deltas_never_exceed_the_substep_cap() {
        let mut c = clock();
        for dt in [0.1, 0.5, 3.0, 1.0e6, f32::INFINITY, f32::NAN] {
            assert!(c.advance(dt) <= MAX_SUBSTEPS);
        }
    }

    #[test]
    fn stalls_do_not_build_a_backlog() {
        let mut c = clock();
        for _ in 0..50 {
            c.advance(10.0);
        }
        assert!(c.pending() < FIXED_DT_S);
        // Right after the stall, a normal frame runs normally.
        assert!(c.advance(FIXED_DT_S) <= 2);
    }

    #[test]
    fn negative_deltas_are_ignored() {
        let mut c = clock();
        assert_eq!(c.advance(-1.0), 0);
        assert_eq!(c.pending(), 0.0);
    }

    #[test]
    fn ground_pairs_resolve_to_their_own_materials() {
        let m = ContactMaterials::default();
        let g = Some(SurfaceKind::Ground);
        let b = Some(SurfaceKind::Box);
        let s = Some(SurfaceKind::Sphere);

        assert_eq!(m.pair(g, b), GROUND_BOX_MATERIAL);
        assert_eq!(m.pair(b, g), GROUND_BOX_MATERIAL);
        assert_eq!(m.pair(s, g), GROUND_SPHERE_MATERIAL);
        assert_eq!(m.pair(b, s), DEFAULT_MATERIAL);
        assert_eq!(m.pair(None, g), DEFAULT_MATERIAL);
    }

    #[test]
    fn bounce_multiplier_scales_and_clamps_restitution() {
        let mut m = ContactMaterials::default();
        m.bounce_multiplier = 0.5;
        let pair = m.pair(Some(SurfaceKind::Ground), Some(SurfaceKind::Sphere));
        assert!((pair.restitution - GROUND_SPHERE_MATERIAL.restitution * 0.5).abs() < 1.0e-6);
        assert_eq!(pair.friction, GROUND_SPHERE_MATERIAL.friction);

        m.bounce_multiplier = 10.0;
        let pair = m.pair(Some(SurfaceKind::Ground), Some(SurfaceKind::Sphere));
        assert_eq!(pair.restitution, 1.0);
    }

    #[test]
    fn gravity_multiplier_change_wakes_sleeping_bodies() {
        let mut world = PhysicsWorld::new(&PhysicsSettings::default());
        let record = SpawnRecord::new(
            0,
            BodyShape::Sphere { radius: 10.0 },
            2.0,
            Vector3::new(0.0, 100.0, 0.0),
        );
        let (handle, _) = world.spawn_body(&record).expect("valid record");
        world.sleep_body(handle);
        assert_eq!(world.is_sleeping(handle), Some(true));

        world.set_gravity_multiplier(2.0);
        assert_eq!(world.is_sleeping(handle), Some(false));
        assert!((world.gravity().y + 2.0 * BASE_GRAVITY).abs() < 1.0e-4);
    }

    #[test]
    fn fast_falling_sphere_stops_at_the_ground_surface() {
        // Twice the base gravity from the spawn clearance: more than one fixed step of travel
        // per step at impact.
        let settings = PhysicsSettings {
            gravity_multiplier: 2.0,
            ..PhysicsSettings::default()
        };
        let mut world = PhysicsWorld::new(&settings);
        let flat = DMatrix::from_element(5, 5, 0.0);
        world
            .insert_height_field(0.0, 0.0, 2000.0, &flat, pack_tag(0, SurfaceKind::Ground))
            .expect("flat ground is valid");

        let radius = 40.0;
        let record = SpawnRecord::new(
            0,
            BodyShape::Sphere { radius },
            1.0,
            Vector3::new(0.0, SPAWN_CLEARANCE + radius, 0.0),
        );
        let (handle, _) = world.spawn_body(&record).expect("valid record");

        let mut lowest = f32::INFINITY;
        for _ in 0..240 {
            world.step(FIXED_DT_S);
            let state = world.body_state(handle).expect("body exists");
            lowest = lowest.min(state.translation.y - radius);
        }
        assert!(lowest > -1.0, "sphere bottom reached {lowest}");
    }

    #[test]
    fn invalid_records_are_rejected() {
        let mut world = PhysicsWorld::new(&PhysicsSettings::default());
        let zero_mass = SpawnRecord::new(0, BodyShape::Sphere { radius: 1.0 }, 0.0, Vector3::zeros());
        assert!(world.spawn_body(&zero_mass).is_err());

        let flat_box = SpawnRecord::new(
            1,
            BodyShape::Box {
                half_extents: Vector3::new(1.0, 0.0, 1.0),
            },
            1.0,
            Vector3::zeros(),
        );
        assert!(world.spawn_body(&flat_box).is_err());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn degenerate_height_fields_are_rejected() {
        let mut world = PhysicsWorld::new(&PhysicsSettings::default());
        let single = DMatrix::from_element(1, 1, 0.0);
        assert!(world.insert_height_field(0.0, 0.0, 10.0, &single, 0).is_err());

        let mut nan = DMatrix::from_element(3, 3, 0.0);
        nan[(1, 1)] = f32::NAN;
        assert!(world.insert_height_field(0.0, 0.0, 10.0, &nan, 0).is_err());
        assert_eq!(world.collider_count(), 0);
    }

    #[test]
    fn set_body_state_restores_pose_and_velocity() {
        let mut world = PhysicsWorld::new(&PhysicsSettings::default());
        let record = SpawnRecord::new(
            3,
            BodyShape::Box {
                half_extents: Vector3::new(5.0, 5.0, 5.0),
            },
            1.0,
            Vector3::new(10.0, 50.0, -10.0),
        );
        let (handle, _) = world.spawn_body(&record).expect("valid record");
        for _ in 0..30 {
            world.step(FIXED_DT_S);
        }
        let moved = world.body_state(handle).expect("body exists");
        assert!(moved.translation.y < 50.0);

        let initial = record.initial_state();
        assert!(world.set_body_state(handle, &initial));
        assert_eq!(world.body_state(handle), Some(initial));
    }
}

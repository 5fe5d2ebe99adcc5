//! Chunk streaming against the live solver, and the full tick.

use nalgebra::{Isometry3, Perspective3, Point3, Vector2, Vector3};
use sim::constants::FIXED_DT_S;
use sim::{
    ChunkCoord, ChunkSettings, ChunkStore, ColorStyle, Command, InputQueue, InputSnapshot,
    MoveKey, NormalizationPolicy, PhysicsSettings, PhysicsWorld, RawInput, SimConfig, Simulation,
    SpawnSettings, TerrainParams, TerrainSampler,
};

fn sampler() -> TerrainSampler {
    TerrainSampler::calibrated(
        TerrainParams::default(),
        ColorStyle::default(),
        NormalizationPolicy::CoarseGrid {
            extent: 3000.0,
            samples: 17,
        },
    )
}

fn small_config() -> SimConfig {
    SimConfig {
        chunk: ChunkSettings {
            size: 500.0,
            resolution: 6,
            radius: 1,
            ..ChunkSettings::default()
        },
        bodies: SpawnSettings {
            body_count: 5,
            follow_enabled: true,
        },
        ..SimConfig::default()
    }
}

#[test]
fn collider_surface_matches_mesh_vertices() {
    let s = sampler();
    let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
    let mut chunks = ChunkStore::new(600.0, 8, 1);
    chunks.ensure_chunks_around(ChunkCoord::new(1, -2), &s, &mut physics);

    // Queries see colliders once the solver has stepped.
    physics.step(FIXED_DT_S);

    for chunk in chunks.iter() {
        let side = chunk.spec.side();
        // Interior vertices only: edge vertices are shared with the neighbour.
        for j in 1..side - 1 {
            for i in 1..side - 1 {
                let p = chunk.geometry.positions[j * side + i];
                let hit = physics
                    .ground_height(p[0], p[2], 5000.0)
                    .expect("ground under every vertex");
                assert!(
                    (hit - p[1]).abs() < 1.0e-2,
                    "chunk ({}, {}) vertex ({i}, {j}): mesh {} collider {hit}",
                    chunk.coord.x,
                    chunk.coord.z,
                    p[1]
                );
            }
        }
    }
}

#[test]
fn resident_set_follows_a_wandering_viewer() {
    let s = sampler();
    let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
    let radius = 2;
    let mut chunks = ChunkStore::new(300.0, 2, radius);

    let path = [
        (0, 0),
        (1, 0),
        (2, 0),
        (2, 1),
        (2, 1),
        (-3, 4),
        (-2, 4),
        (0, 0),
    ];
    for (x, z) in path {
        let center = ChunkCoord::new(x, z);
        chunks.ensure_chunks_around(center, &s, &mut physics);

        for dz in -radius..=radius {
            for dx in -radius..=radius {
                assert!(chunks.contains(ChunkCoord::new(x + dx, z + dz)));
            }
        }
        for coord in chunks.coords() {
            assert!(coord.distance(&center) <= radius + 1);
        }
        assert_eq!(physics.collider_count(), chunks.len());
    }
}

#[test]
fn tick_syncs_proxies_with_the_solver() {
    let mut sim = Simulation::new(small_config());
    let mut last = None;
    for _ in 0..10 {
        last = Some(sim.tick(FIXED_DT_S, &InputSnapshot::default()));
    }
    let report = last.expect("ticked");

    let registry = sim.registry().expect("running");
    let physics = sim.physics().expect("running");
    assert_eq!(report.bodies.len(), registry.len());
    for (proxy, entry) in report.bodies.iter().zip(registry.entries()) {
        let state = physics.body_state(entry.body).expect("alive");
        assert_eq!(proxy.id, entry.record.id);
        assert_eq!(proxy.translation, state.translation);
        assert_eq!(proxy.rotation, state.rotation);
    }
}

#[test]
fn stalled_frame_is_bounded() {
    let mut sim = Simulation::new(small_config());
    let report = sim.tick(5.0, &InputSnapshot::default());
    assert!(report.substeps <= small_config().physics.max_substeps);
}

#[test]
fn free_fly_streams_new_chunks() {
    let mut sim = Simulation::new(small_config());
    let mut queue = InputQueue::new();
    queue.command(Command::ToggleOrbit);
    sim.tick(FIXED_DT_S, &queue.snapshot());
    let start = sim.tick(FIXED_DT_S, &queue.snapshot()).hud.chunk;

    queue.push(RawInput::KeyDown(MoveKey::Forward));
    let mut created = 0;
    for _ in 0..120 {
        created += sim.tick(0.05, &queue.snapshot()).chunks.created.len();
    }
    let end = sim.tick(FIXED_DT_S, &queue.snapshot()).hud.chunk;

    assert_ne!(start, end);
    assert!(created > 0);
    let chunks = sim.chunks().expect("running");
    for coord in chunks.coords() {
        assert!(coord.distance(&end) <= 2);
    }
}

#[test]
fn bodies_hold_still_when_their_ground_unloads() {
    let mut sim = Simulation::new(small_config());
    let mut queue = InputQueue::new();
    queue.command(Command::ToggleOrbit);
    sim.tick(FIXED_DT_S, &queue.snapshot());

    // Fly far enough that the spawn area drops out of the resident set.
    queue.push(RawInput::KeyDown(MoveKey::Forward));
    for _ in 0..240 {
        sim.tick(0.05, &queue.snapshot());
    }
    queue.push(RawInput::KeyUp(MoveKey::Forward));
    let before = sim.tick(FIXED_DT_S, &queue.snapshot());
    let chunks = sim.chunks().expect("running");
    for proxy in &before.bodies {
        let under = chunks.coordinate_of(proxy.translation.x, proxy.translation.z);
        assert!(!chunks.contains(under));
    }

    let mut after = before.clone();
    for _ in 0..60 {
        after = sim.tick(FIXED_DT_S, &queue.snapshot());
    }
    for (a, b) in before.bodies.iter().zip(&after.bodies) {
        assert_eq!(a.translation, b.translation, "body {} moved without ground", a.id);
    }
}

#[test]
fn clicking_on_a_body_selects_it() {
    let mut config = small_config();
    config.camera.orbit_speed = 0.0;
    let (width, height) = (1000.0, 800.0);

    let mut sim = Simulation::new(config);
    sim.set_viewport(width, height);
    let report = sim.tick(FIXED_DT_S, &InputSnapshot::default());
    let pose = report.camera.expect("running");

    // Project the nearest body to the screen.
    let nearest = report
        .bodies
        .iter()
        .min_by(|a, b| {
            let da = (a.translation - pose.position).norm();
            let db = (b.translation - pose.position).norm();
            da.total_cmp(&db)
        })
        .expect("bodies spawned");
    let view = Isometry3::look_at_rh(
        &Point3::from(pose.position),
        &Point3::from(pose.target),
        &Vector3::y(),
    );
    let projection = Perspective3::new(
        width / height,
        config.camera.fov_y,
        config.camera.near,
        config.camera.far,
    );
    let ndc = projection.project_point(&(view * Point3::from(nearest.translation)));
    assert!(ndc.x.abs() < 1.0 && ndc.y.abs() < 1.0, "body off screen");
    let x = (ndc.x + 1.0) * 0.5 * width;
    let y = (1.0 - ndc.y) * 0.5 * height;

    let mut queue = InputQueue::new();
    queue.push(RawInput::PointerDown { x, y });
    queue.push(RawInput::PointerUp);
    // A zero delta keeps camera and bodies where they were drawn.
    let report = sim.tick(0.0, &queue.snapshot());

    let selected = sim.selection().and_then(|s| s.selected());
    assert!(selected.is_some());
    let info = report.hud.selection.expect("info refreshed on selection");
    assert_eq!(Some(info.id), selected);

    // Clicking empty sky keeps the selection.
    queue.push(RawInput::PointerDown { x: 1.0, y: 1.0 });
    queue.push(RawInput::PointerUp);
    sim.tick(0.0, &queue.snapshot());
    assert_eq!(sim.selection().and_then(|s| s.selected()), selected);
}

#[test]
fn teardown_releases_everything_and_stops_ticking() {
    let mut sim = Simulation::new(small_config());
    for _ in 0..5 {
        sim.tick(FIXED_DT_S, &InputSnapshot::default());
    }

    let report = sim.teardown().expect("was running");
    assert_eq!(report.chunks_released, 9);
    assert_eq!(report.bodies_released, 5);
    assert_eq!(report.colliders_left, 0);
    assert_eq!(report.bodies_left, 0);

    assert!(!sim.is_running());
    let input = InputSnapshot {
        pick: Some(Vector2::new(1.0, 1.0)),
        commands: vec![Command::Reset],
        ..InputSnapshot::default()
    };
    let after = sim.tick(FIXED_DT_S, &input);
    assert!(after.camera.is_none());
    assert!(after.bodies.is_empty());
    assert!(after.chunks.is_empty());
    assert!(sim.teardown().is_none());
}

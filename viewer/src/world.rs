//! Terrain chunk meshes and scene lighting.

use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    platform::collections::HashMap,
    prelude::*,
};
use sim::{ChunkCoord, GridGeometry};

use crate::{
    FrameSet,
    convert::to_linear_rgba,
    simulation::{LastFrame, SimState},
};

#[derive(Component)]
pub struct TerrainChunk(pub ChunkCoord);

/// Chunk entities by coordinate.
#[derive(Resource, Default)]
struct ChunkArena {
    entities: HashMap<ChunkCoord, Entity>,
    material: Handle<StandardMaterial>,
}

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<ChunkArena>();
    app.add_systems(Startup, setup);
    app.add_systems(Update, sync_chunks.in_set(FrameSet::Present));
}

fn setup(
    mut commands: Commands,
    mut arena: ResMut<ChunkArena>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    info!("World setup");

    // Vertex colors carry the terrain palette.
    arena.material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 1.0,
        metallic: 0.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::AMBIENT_DAYLIGHT,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(1.0, 2.0, 0.5).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn sync_chunks(
    mut commands: Commands,
    mut arena: ResMut<ChunkArena>,
    mut meshes: ResMut<Assets<Mesh>>,
    state: Res<SimState>,
    frame: Res<LastFrame>,
) {
    let Some(store) = state.sim.chunks() else {
        for (_, entity) in arena.entities.drain() {
            commands.entity(entity).despawn();
        }
        return;
    };

    let delta = &frame.0.chunks;
    for coord in &delta.destroyed {
        if let Some(entity) = arena.entities.remove(coord) {
            commands.entity(entity).despawn();
        }
    }

    for coord in &delta.created {
        let Some(chunk) = store.get(*coord) else {
            continue;
        };
        if let Some(stale) = arena.entities.remove(coord) {
            commands.entity(stale).despawn();
        }
        let entity = commands
            .spawn((
                TerrainChunk(*coord),
                Mesh3d(meshes.add(chunk_mesh(&chunk.geometry))),
                MeshMaterial3d(arena.material.clone()),
                Transform::IDENTITY,
            ))
            .id();
        arena.entities.insert(*coord, entity);
    }

    if !delta.is_empty() {
        debug!("{} terrain chunk entities", arena.entities.len());
    }
}

fn chunk_mesh(geometry: &GridGeometry) -> Mesh {
    let colors: Vec<[f32; 4]> = geometry.colors.iter().map(to_linear_rgba).collect();
    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, geometry.positions.clone())
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, geometry.normals.clone())
    .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs(geometry.side))
    .with_inserted_indices(Indices::U32(geometry.indices.clone()))
}

fn uvs(side: usize) -> Vec<[f32; 2]> {
    let last = side.saturating_sub(1).max(1) as f32;
    (0..side)
        .flat_map(|j| (0..side).map(move |i| [i as f32 / last, j as f32 / last]))
        .collect()
}

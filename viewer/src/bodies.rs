//! Dynamic body meshes, kept in step with the simulation's visual proxies.

use bevy::{color::palettes::css, platform::collections::HashMap, prelude::*};
use sim::{BodyId, BodyShape, VisualProxy};

use crate::{
    FrameSet,
    convert::{to_quat, to_vec3},
    simulation::{LastFrame, SimState},
};

#[derive(Component)]
pub struct SimBody(pub BodyId);

#[derive(Resource, Default)]
struct BodyArena {
    entities: HashMap<BodyId, Entity>,
    box_material: Handle<StandardMaterial>,
    sphere_material: Handle<StandardMaterial>,
}

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<BodyArena>();
    app.add_systems(Startup, load_materials);
    app.add_systems(
        Update,
        (sync_bodies, highlight_selection)
            .chain()
            .in_set(FrameSet::Present),
    );
}

fn load_materials(mut arena: ResMut<BodyArena>, mut materials: ResMut<Assets<StandardMaterial>>) {
    arena.box_material = materials.add(Color::srgb_u8(124, 144, 255));
    arena.sphere_material = materials.add(Color::srgb_u8(255, 160, 90));
}

fn sync_bodies(
    mut commands: Commands,
    mut arena: ResMut<BodyArena>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut transforms: Query<&mut Transform, With<SimBody>>,
    frame: Res<LastFrame>,
    state: Res<SimState>,
) {
    let proxies: &[VisualProxy] = if state.sim.is_running() {
        &frame.0.bodies
    } else {
        &[]
    };

    arena.entities.retain(|id, entity| {
        let alive = proxies.iter().any(|p| p.id == *id);
        if !alive {
            commands.entity(*entity).despawn();
        }
        alive
    });

    for proxy in proxies {
        let transform = Transform::from_translation(to_vec3(&proxy.translation))
            .with_rotation(to_quat(&proxy.rotation));

        if let Some(entity) = arena.entities.get(&proxy.id) {
            if let Ok(mut current) = transforms.get_mut(*entity) {
                *current = transform;
            }
            continue;
        }

        let (mesh, material) = match proxy.shape {
            BodyShape::Box { half_extents } => (
                meshes.add(Cuboid::from_size(to_vec3(&(half_extents * 2.0)))),
                arena.box_material.clone(),
            ),
            BodyShape::Sphere { radius } => (
                meshes.add(Sphere::new(radius).mesh().uv(32, 18)),
                arena.sphere_material.clone(),
            ),
        };
        let entity = commands
            .spawn((
                SimBody(proxy.id),
                Mesh3d(mesh),
                MeshMaterial3d(material),
                transform,
            ))
            .id();
        arena.entities.insert(proxy.id, entity);
    }
}

fn highlight_selection(mut gizmos: Gizmos, frame: Res<LastFrame>, state: Res<SimState>) {
    let Some(selected) = state.sim.selection().and_then(|s| s.selected()) else {
        return;
    };
    let Some(proxy) = frame.0.bodies.iter().find(|p| p.id == selected) else {
        return;
    };
    let radius = proxy.shape.bounding_radius() * 1.25;
    gizmos.sphere(
        Isometry3d::from_translation(to_vec3(&proxy.translation)),
        radius,
        css::YELLOW,
    );
}

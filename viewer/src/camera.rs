use bevy::{
    camera::Exposure,
    pbr::{AtmosphereMode, AtmosphereSettings},
    prelude::*,
};
use sim::CameraSettings;

use crate::{
    FrameSet,
    convert::to_vec3,
    simulation::{LastFrame, ViewerConfig},
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, add_camera);
    app.add_systems(
        Update,
        (
            update_projection.run_if(resource_changed::<ViewerConfig>),
            apply_pose,
        )
            .in_set(FrameSet::Present),
    );
}

const FOG_VISIBILITY: f32 = 9000.0;

fn add_camera(mut commands: Commands, config: Res<ViewerConfig>) {
    let settings = &config.0.camera;
    commands.spawn((
        Exposure { ev100: 16.0 },
        bevy::core_pipeline::tonemapping::Tonemapping::AcesFitted,
        Camera3d::default(),
        projection(settings),
        Transform::from_xyz(0.0, settings.orbit_height, settings.orbit_radius)
            .looking_at(Vec3::ZERO, Vec3::Y),
        AmbientLight {
            color: Color::srgb(0.8, 0.85, 1.0),
            brightness: 400.0,
            ..default()
        },
        DistanceFog {
            color: Color::srgba(0.35, 0.48, 0.66, 1.0),
            directional_light_color: Color::srgba(1.0, 0.95, 0.85, 0.5),
            directional_light_exponent: 30.0,
            falloff: FogFalloff::from_visibility_colors(
                FOG_VISIBILITY,
                Color::srgb(0.35, 0.5, 0.66),
                Color::srgb(0.8, 0.8, 0.7),
            ),
        },
        AtmosphereSettings {
            rendering_method: AtmosphereMode::Raymarched,
            ..default()
        },
    ));
}

fn projection(settings: &CameraSettings) -> Projection {
    Projection::Perspective(PerspectiveProjection {
        fov: settings.fov_y,
        near: settings.near,
        far: settings.far,
        ..default()
    })
}

fn update_projection(
    mut camera: Single<&mut Projection, With<Camera3d>>,
    config: Res<ViewerConfig>,
) {
    **camera = projection(&config.0.camera);
}

/// Mirrors the pose computed by the last tick.
fn apply_pose(mut camera: Single<&mut Transform, With<Camera3d>>, frame: Res<LastFrame>) {
    let Some(pose) = frame.0.camera else {
        return;
    };
    let position = to_vec3(&pose.position);
    let target = to_vec3(&pose.target);
    if position.distance_squared(target) <= f32::EPSILON {
        return;
    }
    **camera = Transform::from_translation(position).looking_at(target, Vec3::Y);
}

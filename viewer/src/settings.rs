//! Hotkeys that tweak the runtime configuration.

use bevy::prelude::*;
use leafwing_input_manager::prelude::*;
use sim::SimConfig;

use crate::{FrameSet, simulation::ViewerConfig};

#[derive(Reflect, Actionlike, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingsAction {
    GravityDown,
    GravityUp,
    BounceDown,
    BounceUp,
    MountainsDown,
    MountainsUp,
    LakesDown,
    LakesUp,
    CameraLower,
    CameraHigher,
    OrbitSlower,
    OrbitFaster,
    OrbitCloser,
    OrbitFarther,
    ToggleStreaming,
}

const MULTIPLIER_STEP: f32 = 0.1;
const SCALE_STEP: f32 = 0.1;
const HEIGHT_STEP: f32 = 40.0;
const ORBIT_SPEED_STEP: f32 = 0.02;
const ORBIT_RADIUS_STEP: f32 = 100.0;

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(InputManagerPlugin::<SettingsAction>::default());
    app.register_type::<SettingsAction>();

    let input_map = InputMap::new([
        (SettingsAction::GravityDown, KeyCode::Digit1),
        (SettingsAction::GravityUp, KeyCode::Digit2),
        (SettingsAction::BounceDown, KeyCode::Digit3),
        (SettingsAction::BounceUp, KeyCode::Digit4),
        (SettingsAction::MountainsDown, KeyCode::Digit5),
        (SettingsAction::MountainsUp, KeyCode::Digit6),
        (SettingsAction::LakesDown, KeyCode::Digit7),
        (SettingsAction::LakesUp, KeyCode::Digit8),
        (SettingsAction::CameraLower, KeyCode::PageDown),
        (SettingsAction::CameraHigher, KeyCode::PageUp),
        (SettingsAction::OrbitSlower, KeyCode::Minus),
        (SettingsAction::OrbitFaster, KeyCode::Equal),
        (SettingsAction::OrbitCloser, KeyCode::Comma),
        (SettingsAction::OrbitFarther, KeyCode::Period),
        (SettingsAction::ToggleStreaming, KeyCode::KeyT),
    ]);
    app.insert_resource(input_map);
    app.insert_resource(ActionState::<SettingsAction>::default());

    app.add_systems(Update, adjust_settings.in_set(FrameSet::Input));
}

fn adjust_settings(actions: Res<ActionState<SettingsAction>>, mut config: ResMut<ViewerConfig>) {
    let mut next = config.0;
    for action in actions.get_just_pressed() {
        apply(action, &mut next);
    }
    config.set_if_neq(ViewerConfig(next));
}

fn apply(action: SettingsAction, config: &mut SimConfig) {
    let physics = &mut config.physics;
    let terrain = &mut config.terrain;
    let camera = &mut config.camera;
    match action {
        SettingsAction::GravityDown | SettingsAction::GravityUp => {
            let sign = if action == SettingsAction::GravityUp { 1.0 } else { -1.0 };
            physics.gravity_multiplier = (physics.gravity_multiplier + sign * MULTIPLIER_STEP).max(0.0);
            info!("gravity multiplier: {:.1}", physics.gravity_multiplier);
        }
        SettingsAction::BounceDown | SettingsAction::BounceUp => {
            let sign = if action == SettingsAction::BounceUp { 1.0 } else { -1.0 };
            physics.bounce_multiplier = (physics.bounce_multiplier + sign * MULTIPLIER_STEP).max(0.0);
            info!("bounce multiplier: {:.1}", physics.bounce_multiplier);
        }
        SettingsAction::MountainsDown | SettingsAction::MountainsUp => {
            let sign = if action == SettingsAction::MountainsUp { 1.0 } else { -1.0 };
            terrain.mountain_scale = (terrain.mountain_scale + sign * SCALE_STEP).max(0.0);
            info!("mountain scale: {:.1}", terrain.mountain_scale);
        }
        SettingsAction::LakesDown | SettingsAction::LakesUp => {
            let sign = if action == SettingsAction::LakesUp { 1.0 } else { -1.0 };
            terrain.lake_scale = (terrain.lake_scale + sign * SCALE_STEP).max(0.0);
            info!("lake scale: {:.1}", terrain.lake_scale);
        }
        SettingsAction::CameraLower => {
            camera.height = (camera.height - HEIGHT_STEP).max(HEIGHT_STEP);
            info!("camera height: {}", camera.height);
        }
        SettingsAction::CameraHigher => {
            camera.height += HEIGHT_STEP;
            info!("camera height: {}", camera.height);
        }
        SettingsAction::OrbitSlower => {
            camera.orbit_speed -= ORBIT_SPEED_STEP;
            info!("orbit speed: {:.2}", camera.orbit_speed);
        }
        SettingsAction::OrbitFaster => {
            camera.orbit_speed += ORBIT_SPEED_STEP;
            info!("orbit speed: {:.2}", camera.orbit_speed);
        }
        SettingsAction::OrbitCloser => {
            camera.orbit_radius = (camera.orbit_radius - ORBIT_RADIUS_STEP).max(ORBIT_RADIUS_STEP);
            info!("orbit radius: {}", camera.orbit_radius);
        }
        SettingsAction::OrbitFarther => {
            camera.orbit_radius += ORBIT_RADIUS_STEP;
            info!("orbit radius: {}", camera.orbit_radius);
        }
        SettingsAction::ToggleStreaming => {
            config.chunk.streaming = !config.chunk.streaming;
            info!("chunk streaming: {}", config.chunk.streaming);
        }
    }
}

//! Owns the simulation and ticks it once per frame.

use bevy::{
    prelude::*,
    window::{PrimaryWindow, WindowResized},
};
use sim::{FrameReport, InputQueue, SimConfig, Simulation};

use crate::FrameSet;

#[derive(Resource)]
pub struct SimState {
    pub sim: Simulation,
    pub queue: InputQueue,
}

/// Report of the most recent tick, read by the presentation systems.
#[derive(Resource, Default)]
pub struct LastFrame(pub FrameReport);

/// Runtime settings. Changing this resource reconfigures the simulation.
#[derive(Resource, Clone, Debug, Default, PartialEq)]
pub struct ViewerConfig(pub SimConfig);

pub(super) fn plugin(app: &mut App) {
    let config = SimConfig::default();
    app.insert_resource(SimState {
        sim: Simulation::new(config),
        queue: InputQueue::new(),
    });
    app.insert_resource(ViewerConfig(config));
    app.init_resource::<LastFrame>();

    app.add_systems(Startup, init_viewport);
    app.add_systems(
        Update,
        (
            track_viewport,
            apply_config.run_if(resource_changed::<ViewerConfig>),
            tick,
        )
            .chain()
            .in_set(FrameSet::Tick),
    );
    app.add_systems(Last, teardown_on_exit);
}

fn init_viewport(mut state: ResMut<SimState>, window: Single<&Window, With<PrimaryWindow>>) {
    state.sim.set_viewport(window.width(), window.height());
}

fn track_viewport(mut state: ResMut<SimState>, mut messages: MessageReader<WindowResized>) {
    for message in messages.read() {
        state.sim.set_viewport(message.width, message.height);
    }
}

fn apply_config(mut state: ResMut<SimState>, config: Res<ViewerConfig>) {
    state.sim.apply_config(config.0);
}

fn tick(mut state: ResMut<SimState>, mut frame: ResMut<LastFrame>, time: Res<Time>) {
    let SimState { sim, queue } = &mut *state;
    if !sim.is_running() {
        return;
    }
    let snapshot = queue.snapshot();
    frame.0 = sim.tick(time.delta_secs(), &snapshot);
}

fn teardown_on_exit(mut state: ResMut<SimState>, mut exits: MessageReader<AppExit>) {
    if exits.read().next().is_none() {
        return;
    }
    if let Some(report) = state.sim.teardown() {
        info!(
            "released {} chunks and {} bodies on exit",
            report.chunks_released, report.bodies_released
        );
    }
}

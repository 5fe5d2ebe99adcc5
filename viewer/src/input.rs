//! Keyboard and mouse bindings, forwarded to the simulation's input queue.

use bevy::{
    input::mouse::AccumulatedMouseMotion,
    prelude::*,
    window::{PrimaryWindow, WindowFocused},
};
use leafwing_input_manager::prelude::*;
use sim::{Command, MoveKey, RawInput};

use crate::{FrameSet, simulation::SimState};

#[derive(Reflect, Actionlike, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputAction {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    /// Held to look around; pressed to pick.
    Drag,
    ToggleOrbit,
    Reset,
    CenterOnSelection,
    FollowSelection,
    CycleNext,
    CyclePrevious,
    Cancel,
}

const MOVES: [(InputAction, MoveKey); 4] = [
    (InputAction::Forward, MoveKey::Forward),
    (InputAction::Back, MoveKey::Back),
    (InputAction::StrafeLeft, MoveKey::Left),
    (InputAction::StrafeRight, MoveKey::Right),
];

const COMMANDS: [(InputAction, Command); 7] = [
    (InputAction::ToggleOrbit, Command::ToggleOrbit),
    (InputAction::Reset, Command::Reset),
    (InputAction::CenterOnSelection, Command::CenterOnSelection),
    (InputAction::FollowSelection, Command::FollowSelection),
    (InputAction::CycleNext, Command::CycleNext),
    (InputAction::CyclePrevious, Command::CyclePrevious),
    (InputAction::Cancel, Command::Cancel),
];

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(InputManagerPlugin::<InputAction>::default());

    app.register_type::<InputAction>();

    let mut input_map = InputMap::<InputAction>::default();
    input_map.insert(InputAction::Forward, KeyCode::KeyW);
    input_map.insert(InputAction::Back, KeyCode::KeyS);
    input_map.insert(InputAction::StrafeLeft, KeyCode::KeyA);
    input_map.insert(InputAction::StrafeRight, KeyCode::KeyD);
    input_map.insert(InputAction::Drag, MouseButton::Left);
    input_map.insert(InputAction::ToggleOrbit, KeyCode::Tab);
    input_map.insert(InputAction::Reset, KeyCode::KeyR);
    input_map.insert(InputAction::CenterOnSelection, KeyCode::KeyC);
    input_map.insert(InputAction::FollowSelection, KeyCode::KeyF);
    input_map.insert(InputAction::CycleNext, KeyCode::KeyE);
    input_map.insert(InputAction::CyclePrevious, KeyCode::KeyQ);
    input_map.insert(InputAction::Cancel, KeyCode::Escape);
    app.insert_resource(input_map);
    app.insert_resource(ActionState::<InputAction>::default());

    app.add_systems(
        Update,
        (queue_focus_loss, queue_input).chain().in_set(FrameSet::Input),
    );
}

fn queue_input(
    actions: Res<ActionState<InputAction>>,
    motion: Res<AccumulatedMouseMotion>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut state: ResMut<SimState>,
) {
    let queue = &mut state.queue;

    for (action, key) in MOVES {
        if actions.just_pressed(&action) {
            queue.push(RawInput::KeyDown(key));
        }
        if actions.just_released(&action) {
            queue.push(RawInput::KeyUp(key));
        }
    }

    if actions.just_pressed(&InputAction::Drag) {
        if let Some(cursor) = window.cursor_position() {
            queue.push(RawInput::PointerDown {
                x: cursor.x,
                y: cursor.y,
            });
        }
    }
    if motion.delta != Vec2::ZERO {
        queue.push(RawInput::PointerMove {
            dx: motion.delta.x,
            dy: motion.delta.y,
        });
    }
    if actions.just_released(&InputAction::Drag) {
        queue.push(RawInput::PointerUp);
    }

    for (action, command) in COMMANDS {
        if actions.just_pressed(&action) {
            queue.command(command);
        }
    }
}

fn queue_focus_loss(mut state: ResMut<SimState>, mut messages: MessageReader<WindowFocused>) {
    for message in messages.read() {
        if !message.focused {
            state.queue.push(RawInput::FocusLost);
        }
    }
}

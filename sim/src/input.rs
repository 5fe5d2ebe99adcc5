//! Raw input events and the per-tick snapshot built from them.
//!
//! The host pushes [`RawInput`] events into an [`InputQueue`] whenever they arrive. Once per
//! tick the frame loop takes an [`InputSnapshot`]: held movement keys and the drag flag
//! persist across ticks, while pointer deltas, the pick position and discrete commands are
//! drained.

use nalgebra::Vector2;

use crate::camera::CameraInput;

/// Discrete actions. Executed in arrival order at the start of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    ToggleOrbit,
    Reset,
    CenterOnSelection,
    FollowSelection,
    CycleNext,
    CyclePrevious,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveKey {
    Forward,
    Back,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveFlags {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveFlags {
    fn set(&mut self, key: MoveKey, held: bool) {
        match key {
            MoveKey::Forward => self.forward = held,
            MoveKey::Back => self.back = held,
            MoveKey::Left => self.left = held,
            MoveKey::Right => self.right = held,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawInput {
    KeyDown(MoveKey),
    KeyUp(MoveKey),
    /// Primary button pressed at a screen position (pixels, origin top-left).
    PointerDown { x: f32, y: f32 },
    /// Pointer moved by a delta in pixels.
    PointerMove { dx: f32, dy: f32 },
    PointerUp,
    Command(Command),
    /// The window lost focus: release everything that is held.
    FocusLost,
}

/// Everything the tick reads about input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    pub moves: MoveFlags,
    pub drag_active: bool,
    pub drag_delta: Vector2<f32>,
    /// Screen position of a pointer press since the last tick.
    pub pick: Option<Vector2<f32>>,
    pub commands: Vec<Command>,
}

impl InputSnapshot {
    pub fn camera_input(&self) -> CameraInput {
        CameraInput {
            forward: self.moves.forward,
            back: self.moves.back,
            left: self.moves.left,
            right: self.moves.right,
            drag_active: self.drag_active,
            drag_delta: self.drag_delta,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputQueue {
    events: Vec<RawInput>,
    moves: MoveFlags,
    dragging: bool,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: RawInput) {
        self.events.push(event);
    }

    pub fn command(&mut self, command: Command) {
        self.push(RawInput::Command(command));
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Drain the queued events into one snapshot.
    pub fn snapshot(&mut self) -> InputSnapshot {
        let mut drag_delta = Vector2::zeros();
        let mut pick = None;
        let mut commands = Vec::new();
        // A press and release inside one tick still counts as a drag for that tick.
        let mut dragged_this_tick = self.dragging;

        for event in self.events.drain(..) {
            match event {
                RawInput::KeyDown(key) => self.moves.set(key, true),
                RawInput::KeyUp(key) => self.moves.set(key, false),
                RawInput::PointerDown { x, y } => {
                    self.dragging = true;
                    dragged_this_tick = true;
                    if x.is_finite() && y.is_finite() {
                        pick = Some(Vector2::new(x, y));
                    }
                }
                RawInput::PointerMove { dx, dy } => {
                    if self.dragging && dx.is_finite() && dy.is_finite() {
                        drag_delta += Vector2::new(dx, dy);
                    }
                }
                RawInput::PointerUp => self.dragging = false,
                RawInput::Command(command) => commands.push(command),
                RawInput::FocusLost => {
                    self.moves = MoveFlags::default();
                    self.dragging = false;
                    dragged_this_tick = false;
                    drag_delta = Vector2::zeros();
                }
            }
        }

        InputSnapshot {
            moves: self.moves,
            drag_active: dragged_this_tick,
            drag_delta,
            pick,
            commands,
        }
    }
}

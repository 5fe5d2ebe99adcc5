//! Camera state machine: Orbit, FreeFly and Follow.
//!
//! The controller produces one [`CameraPose`] per tick. Mode changes happen through
//! explicit calls ([`CameraController::toggle_orbit`], [`CameraController::follow`],
//! [`CameraController::center_on`], [`CameraController::cancel`]) which the frame loop
//! makes before [`CameraController::update`].
//!
//! Yaw follows the `atan2(-x, -z)` convention: yaw 0 looks down -Z and positive yaw turns
//! towards -X.

use std::f32::consts::FRAC_PI_2;

use nalgebra::{Vector2, Vector3};

use crate::body::BodyId;
use crate::config::CameraSettings;
use crate::constants::{
    DEFAULT_FOLLOW_OFFSET, DIR_EPS_SQ, FLY_HEIGHT_EASE_RATE, FLY_HEIGHT_SNAP, MAX_PITCH_RAD,
    MIN_FOLLOW_OFFSET,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CameraMode {
    #[default]
    Orbit,
    FreeFly,
    Follow,
}

impl CameraMode {
    pub fn label(&self) -> &'static str {
        match self {
            CameraMode::Orbit => "orbit",
            CameraMode::FreeFly => "free",
            CameraMode::Follow => "follow",
        }
    }
}

/// A followed body and the offset captured when following started.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FollowTarget {
    pub body: BodyId,
    pub offset: Vector3<f32>,
}

/// Where the camera is and what it looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
}

impl CameraPose {
    /// Unit view direction, or -Z when position and target coincide.
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.position)
            .try_normalize(DIR_EPS_SQ.sqrt())
            .unwrap_or_else(|| -Vector3::z())
    }
}

/// Movement and look input for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub drag_active: bool,
    /// Pointer movement in pixels since the last tick.
    pub drag_delta: Vector2<f32>,
}

/// Unit direction for a yaw/pitch pair.
pub fn direction_from_yaw_pitch(yaw: f32, pitch: f32) -> Vector3<f32> {
    Vector3::new(
        -yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
}

/// Yaw/pitch of a direction, pitch clamped. `None` for a near-zero vector.
pub fn yaw_pitch_from_direction(dir: &Vector3<f32>) -> Option<(f32, f32)> {
    if dir.norm_squared() <= DIR_EPS_SQ {
        return None;
    }
    let d = dir.normalize();
    let yaw = (-d.x).atan2(-d.z);
    let pitch = d.y.clamp(-1.0, 1.0).asin().clamp(-MAX_PITCH_RAD, MAX_PITCH_RAD);
    Some((yaw, pitch))
}

#[derive(Clone, Debug)]
pub struct CameraController {
    mode: CameraMode,
    pose: CameraPose,
    yaw: f32,
    pitch: f32,
    /// Orbit angle around the target, radians.
    orbit_angle: f32,
    /// Orbit center when no body is followed.
    orbit_target: Vector3<f32>,
    follow: Option<FollowTarget>,
    /// Set on the tick FreeFly is entered so that tick keeps the captured pose. Later ticks
    /// ease the height towards the configured camera height instead of jumping to it.
    hold_pose: bool,
}

impl CameraController {
    pub fn new(settings: &CameraSettings) -> Self {
        let mut controller = Self {
            mode: CameraMode::Orbit,
            pose: CameraPose {
                position: Vector3::zeros(),
                target: Vector3::zeros(),
            },
            yaw: 0.0,
            pitch: 0.0,
            orbit_angle: FRAC_PI_2,
            orbit_target: Vector3::zeros(),
            follow: None,
            hold_pose: false,
        };
        controller.restore_default_pose(settings);
        controller
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn follow_target(&self) -> Option<FollowTarget> {
        self.follow
    }

    pub fn followed_body(&self) -> Option<BodyId> {
        self.follow.map(|f| f.body)
    }

    /// Switch between Orbit and FreeFly. From Follow, goes back to Orbit and keeps
    /// orbiting the followed body.
    pub fn toggle_orbit(&mut self) {
        match self.mode {
            CameraMode::Orbit => self.enter_free_fly(),
            CameraMode::FreeFly => {
                let center = self.orbit_target;
                self.enter_orbit(center);
            }
            CameraMode::Follow => {
                let center = self.pose.target;
                self.enter_orbit(center);
            }
        }
    }

    /// Start following `body`, currently at `body_position`.
    ///
    /// The offset is the current camera position relative to the body. Offsets shorter
    /// than [`MIN_FOLLOW_OFFSET`] are replaced by [`DEFAULT_FOLLOW_OFFSET`].
    pub fn follow(&mut self, body: BodyId, body_position: Vector3<f32>) {
        let mut offset = self.pose.position - body_position;
        if !offset.iter().all(|c| c.is_finite()) || offset.norm() < MIN_FOLLOW_OFFSET {
            log::warn!("degenerate follow offset for body {body}, using default");
            offset = Vector3::from(DEFAULT_FOLLOW_OFFSET);
        }
        self.follow = Some(FollowTarget { body, offset });
        self.mode = CameraMode::Follow;
        self.hold_pose = false;
        log::debug!("camera: follow body {body}");
    }

    /// Orbit around a fixed point. Stops following.
    pub fn center_on(&mut self, point: Vector3<f32>) {
        self.follow = None;
        self.enter_orbit(point);
        log::debug!("camera: orbit centered on ({:.1}, {:.1}, {:.1})", point.x, point.y, point.z);
    }

    /// Back to Orbit around the origin with the default pose. Stops following.
    pub fn cancel(&mut self, settings: &CameraSettings) {
        self.restore_default_pose(settings);
        log::debug!("camera: cancel to default orbit");
    }

    /// Forget a followed body that no longer exists.
    pub fn drop_follow(&mut self, body: BodyId) {
        if self.followed_body() != Some(body) {
            return;
        }
        self.follow = None;
        if self.mode == CameraMode::Follow {
            let center = self.pose.target;
            self.enter_orbit(center);
        }
    }

    /// Advance one tick. `body_position` looks up the current position of a body.
    pub fn update<F>(
        &mut self,
        dt: f32,
        input: &CameraInput,
        settings: &CameraSettings,
        body_position: F,
    ) -> CameraPose
    where
        F: Fn(BodyId) -> Option<Vector3<f32>>,
    {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        // A followed body that vanished ends following.
        let followed = match self.follow {
            Some(f) => match body_position(f.body) {
                Some(p) => Some((f, p)),
                None => {
                    log::warn!("followed body {} is gone", f.body);
                    self.drop_follow(f.body);
                    None
                }
            },
            None => None,
        };

        match self.mode {
            CameraMode::Orbit => {
                self.orbit_angle = (self.orbit_angle + settings.orbit_speed * dt)
                    % std::f32::consts::TAU;
                let target = followed.map_or(self.orbit_target, |(_, p)| p);
                let position = target
                    + Vector3::new(
                        self.orbit_angle.cos() * settings.orbit_radius,
                        settings.orbit_height,
                        self.orbit_angle.sin() * settings.orbit_radius,
                    );
                self.pose = CameraPose { position, target };
            }
            CameraMode::FreeFly => {
                if self.hold_pose {
                    self.hold_pose = false;
                } else {
                    self.fly(dt, input, settings);
                }
            }
            CameraMode::Follow => {
                if let Some((f, body)) = followed {
                    let mut position = body + f.offset;
                    position.y = settings.height;
                    self.pose = CameraPose {
                        position,
                        target: body,
                    };
                }
            }
        }

        self.pose
    }

    fn fly(&mut self, dt: f32, input: &CameraInput, settings: &CameraSettings) {
        if input.drag_active {
            self.yaw -= input.drag_delta.x * settings.drag_sensitivity;
            self.pitch = (self.pitch - input.drag_delta.y * settings.drag_sensitivity)
                .clamp(-MAX_PITCH_RAD, MAX_PITCH_RAD);
        }

        let forward = direction_from_yaw_pitch(self.yaw, self.pitch);
        let right = Vector3::new(self.yaw.cos(), 0.0, -self.yaw.sin());

        let mut wish = Vector3::zeros();
        if input.forward {
            wish += forward;
        }
        if input.back {
            wish -= forward;
        }
        if input.right {
            wish += right;
        }
        if input.left {
            wish -= right;
        }

        let mut position = self.pose.position;
        if let Some(dir) = wish.try_normalize(DIR_EPS_SQ.sqrt()) {
            position += dir * settings.fly_speed * dt;
        }
        position.y = ease_height(position.y, settings.height, dt);

        self.pose = CameraPose {
            position,
            target: position + forward,
        };
    }

    fn enter_free_fly(&mut self) {
        if let Some((yaw, pitch)) =
            yaw_pitch_from_direction(&(self.pose.target - self.pose.position))
        {
            self.yaw = yaw;
            self.pitch = pitch;
        }
        self.follow = None;
        self.mode = CameraMode::FreeFly;
        self.hold_pose = true;
        log::debug!("camera: free fly (yaw {:.2}, pitch {:.2})", self.yaw, self.pitch);
    }

    fn enter_orbit(&mut self, center: Vector3<f32>) {
        self.orbit_target = center;
        let rel = self.pose.position - center;
        if rel.x * rel.x + rel.z * rel.z > DIR_EPS_SQ {
            self.orbit_angle = rel.z.atan2(rel.x);
        }
        self.mode = CameraMode::Orbit;
        self.hold_pose = false;
        log::debug!("camera: orbit");
    }

    fn restore_default_pose(&mut self, settings: &CameraSettings) {
        self.mode = CameraMode::Orbit;
        self.follow = None;
        self.hold_pose = false;
        self.orbit_target = Vector3::zeros();
        self.orbit_angle = FRAC_PI_2;
        self.pose = CameraPose {
            position: Vector3::new(0.0, settings.orbit_height, settings.orbit_radius),
            target: Vector3::zeros(),
        };
        if let Some((yaw, pitch)) =
            yaw_pitch_from_direction(&(self.pose.target - self.pose.position))
        {
            self.yaw = yaw;
            self.pitch = pitch;
        }
    }
}

/// Move `current` towards `target` at an exponential rate, snapping once close.
fn ease_height(current: f32, target: f32, dt: f32) -> f32 {
    let blend = 1.0 - (-FLY_HEIGHT_EASE_RATE * dt).exp();
    let next = current + (target - current) * blend;
    if (target - next).abs() < FLY_HEIGHT_SNAP || !next.is_finite() {
        target
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_bodies(_: BodyId) -> Option<Vector3<f32>> {
        None
    }

    fn settings() -> CameraSettings {
        CameraSettings::default()
    }

    #[test]
    fn yaw_pitch_round_trip_through_direction() {
        for &(yaw, pitch) in &[(0.0, 0.0), (1.0, 0.3), (-2.5, -0.9), (3.0, 1.1)] {
            let dir = direction_from_yaw_pitch(yaw, pitch);
            let (y2, p2) = yaw_pitch_from_direction(&dir).expect("unit vector");
            assert!((y2 - yaw).abs() < 1.0e-4);
            assert!((p2 - pitch).abs() < 1.0e-4);
        }
        assert!(yaw_pitch_from_direction(&Vector3::zeros()).is_none());
    }

    #[test]
    fn orbit_circles_the_origin() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        for _ in 0..100 {
            let pose = cam.update(0.05, &CameraInput::default(), &s, no_bodies);
            let planar = Vector2::new(pose.position.x, pose.position.z).norm();
            assert!((planar - s.orbit_radius).abs() < 1.0e-2);
            assert!((pose.position.y - s.orbit_height).abs() < 1.0e-4);
            assert_eq!(pose.target, Vector3::zeros());
        }
    }

    #[test]
    fn orbit_tracks_a_followed_body_after_toggle() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        let body = Vector3::new(300.0, 40.0, -200.0);
        cam.follow(7, body);
        cam.toggle_orbit();
        assert_eq!(cam.mode(), CameraMode::Orbit);
        assert_eq!(cam.followed_body(), Some(7));

        let moved = Vector3::new(350.0, 20.0, -260.0);
        let pose = cam.update(0.016, &CameraInput::default(), &s, |_| Some(moved));
        assert_eq!(pose.target, moved);
    }

    #[test]
    fn entering_free_fly_does_not_move_the_camera() {
        let s = CameraSettings {
            height: 900.0,
            ..settings()
        };
        let mut cam = CameraController::new(&s);
        let before = cam.update(0.3, &CameraInput::default(), &s, no_bodies);

        cam.toggle_orbit();
        assert_eq!(cam.mode(), CameraMode::FreeFly);
        let input = CameraInput {
            forward: true,
            ..CameraInput::default()
        };
        let after = cam.update(0.016, &input, &s, no_bodies);
        assert_eq!(before.position, after.position);

        // Looking the same way as before, up to the pitch clamp.
        let d = before.forward().dot(&after.forward());
        assert!(d > 0.99);
    }

    #[test]
    fn free_fly_pins_height_and_moves_forward() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        cam.toggle_orbit();
        cam.update(0.016, &CameraInput::default(), &s, no_bodies);

        let start = cam.pose().position;
        let input = CameraInput {
            forward: true,
            ..CameraInput::default()
        };
        let pose = cam.update(0.5, &input, &s, no_bodies);
        assert_eq!(pose.position.y, s.height);
        // Default pose looks from +Z towards the origin.
        assert!(pose.position.z < start.z);
    }

    #[test]
    fn free_fly_eases_to_the_camera_height() {
        let s = CameraSettings {
            height: 900.0,
            ..settings()
        };
        let mut cam = CameraController::new(&s);
        cam.toggle_orbit();
        let entry = cam.update(0.016, &CameraInput::default(), &s, no_bodies);

        // No vertical jump on the first free-fly tick.
        let next = cam.update(0.016, &CameraInput::default(), &s, no_bodies);
        let gap = s.height - entry.position.y;
        assert!(next.position.y > entry.position.y);
        assert!(next.position.y - entry.position.y < gap * 0.2);

        let mut pose = next;
        for _ in 0..300 {
            pose = cam.update(0.016, &CameraInput::default(), &s, no_bodies);
        }
        assert_eq!(pose.position.y, s.height);
    }

    #[test]
    fn pitch_is_clamped_while_dragging() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        cam.toggle_orbit();
        let input = CameraInput {
            drag_active: true,
            drag_delta: Vector2::new(0.0, -100_000.0),
            ..CameraInput::default()
        };
        cam.update(0.016, &input, &s, no_bodies);
        cam.update(0.016, &input, &s, no_bodies);
        assert!((cam.pitch() - MAX_PITCH_RAD).abs() < 1.0e-6);

        let down = CameraInput {
            drag_delta: Vector2::new(0.0, 100_000.0),
            ..input
        };
        cam.update(0.016, &down, &s, no_bodies);
        assert!((cam.pitch() + MAX_PITCH_RAD).abs() < 1.0e-6);
    }

    #[test]
    fn drag_is_ignored_without_the_drag_flag() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        cam.toggle_orbit();
        cam.update(0.016, &CameraInput::default(), &s, no_bodies);
        let yaw = cam.yaw();
        let input = CameraInput {
            drag_delta: Vector2::new(500.0, 0.0),
            ..CameraInput::default()
        };
        cam.update(0.016, &input, &s, no_bodies);
        assert_eq!(cam.yaw(), yaw);
    }

    #[test]
    fn follow_keeps_the_captured_offset() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        let start = cam.pose().position;
        let body = Vector3::new(100.0, 50.0, 0.0);
        cam.follow(3, body);
        let offset = cam.follow_target().expect("following").offset;
        assert_eq!(offset, start - body);

        let moved = Vector3::new(-400.0, 10.0, 250.0);
        let pose = cam.update(0.016, &CameraInput::default(), &s, |_| Some(moved));
        assert_eq!(pose.target, moved);
        assert_eq!(pose.position.x, moved.x + offset.x);
        assert_eq!(pose.position.z, moved.z + offset.z);
        assert_eq!(pose.position.y, s.height);
    }

    #[test]
    fn degenerate_follow_offset_uses_the_default() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        let at_camera = cam.pose().position;
        cam.follow(1, at_camera);
        let target = cam.follow_target().expect("following");
        assert_eq!(target.offset, Vector3::from(DEFAULT_FOLLOW_OFFSET));
        assert!(target.offset.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn cancel_restores_the_default_orbit() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        let default_pose = cam.pose();

        cam.follow(2, Vector3::new(10.0, 0.0, 10.0));
        cam.update(1.0, &CameraInput::default(), &s, |_| Some(Vector3::new(10.0, 0.0, 10.0)));
        cam.cancel(&s);

        assert_eq!(cam.mode(), CameraMode::Orbit);
        assert!(cam.follow_target().is_none());
        assert_eq!(cam.pose(), default_pose);
    }

    #[test]
    fn manual_toggle_from_free_fly_never_enters_follow() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        cam.follow(4, Vector3::new(0.0, 0.0, -500.0));
        cam.toggle_orbit();
        cam.toggle_orbit();
        assert_eq!(cam.mode(), CameraMode::FreeFly);
        assert!(cam.follow_target().is_none());
        cam.toggle_orbit();
        assert_eq!(cam.mode(), CameraMode::Orbit);
    }

    #[test]
    fn losing_the_followed_body_falls_back_to_orbit() {
        let s = settings();
        let mut cam = CameraController::new(&s);
        cam.follow(9, Vector3::new(0.0, 0.0, -500.0));
        let pose = cam.update(0.016, &CameraInput::default(), &s, no_bodies);
        assert_eq!(cam.mode(), CameraMode::Orbit);
        assert!(cam.follow_target().is_none());
        assert!(pose.position.iter().all(|c| c.is_finite()));
    }
}

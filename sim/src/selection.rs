//! Pointer picking, selection cycling and the throttled selection readout.

use std::time::Duration;

use nalgebra::{Isometry3, Perspective3, Point3, Vector2, Vector3};
use rapier3d::parry::query::{Ray, RayCast};
use rapier3d::parry::shape::{Ball, Cuboid};

use crate::body::{BodyId, BodyRegistry, BodyShape, VisualProxy};
use crate::camera::CameraPose;
use crate::config::CameraSettings;
use crate::constants::{DIR_EPS_SQ, SELECTION_REFRESH_INTERVAL};

/// Viewport in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 1.0 && self.height >= 1.0
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// Screen pixel (origin top-left, y down) to normalized device coordinates.
pub fn screen_to_ndc(screen: Vector2<f32>, viewport: &Viewport) -> Vector2<f32> {
    Vector2::new(
        2.0 * screen.x / viewport.width - 1.0,
        1.0 - 2.0 * screen.y / viewport.height,
    )
}

/// World-space ray through a screen pixel. `None` for an unusable viewport or pose.
pub fn ray_from_screen(
    screen: Vector2<f32>,
    viewport: &Viewport,
    pose: &CameraPose,
    settings: &CameraSettings,
) -> Option<Ray> {
    if !viewport.is_valid() || !screen.iter().all(|c| c.is_finite()) {
        return None;
    }
    let forward = pose.target - pose.position;
    if forward.norm_squared() <= DIR_EPS_SQ {
        return None;
    }

    // Looking straight up or down: any horizontal axis works as "up".
    let up = if forward.normalize().y.abs() > 0.999 {
        Vector3::z()
    } else {
        Vector3::y()
    };
    let eye = Point3::from(pose.position);
    let view = Isometry3::look_at_rh(&eye, &Point3::from(pose.target), &up);
    let camera_to_world = view.inverse();

    let projection = Perspective3::new(viewport.aspect(), settings.fov_y, settings.near, settings.far);
    let ndc = screen_to_ndc(screen, viewport);
    let near = camera_to_world * projection.unproject_point(&Point3::new(ndc.x, ndc.y, -1.0));
    let far = camera_to_world * projection.unproject_point(&Point3::new(ndc.x, ndc.y, 1.0));

    let dir = (far - near).try_normalize(DIR_EPS_SQ.sqrt())?;
    Some(Ray::new(eye, dir))
}

/// Distance along `ray` to a body's proxy, if hit.
pub fn cast_proxy(ray: &Ray, proxy: &VisualProxy) -> Option<f32> {
    let iso = proxy.isometry();
    match proxy.shape {
        BodyShape::Box { half_extents } => {
            Cuboid::new(half_extents).cast_ray(&iso, ray, f32::MAX, true)
        }
        BodyShape::Sphere { radius } => Ball::new(radius).cast_ray(&iso, ray, f32::MAX, true),
    }
}

/// Nearest proxy hit by `ray`.
pub fn nearest_hit<'a>(
    ray: &Ray,
    proxies: impl IntoIterator<Item = &'a VisualProxy>,
) -> Option<(BodyId, f32)> {
    proxies
        .into_iter()
        .filter_map(|p| cast_proxy(ray, p).map(|toi| (p.id, toi)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Displayed facts about the selected body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionInfo {
    pub id: BodyId,
    pub kind: &'static str,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub speed: f32,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionController {
    selected: Option<BodyId>,
    info: Option<SelectionInfo>,
    last_refresh: Option<Duration>,
    /// Selection changed since the info was last computed.
    stale: bool,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<BodyId> {
        self.selected
    }

    pub fn info(&self) -> Option<&SelectionInfo> {
        self.info.as_ref()
    }

    pub fn select(&mut self, id: Option<BodyId>) {
        if self.selected != id {
            self.selected = id;
            self.stale = true;
            if id.is_none() {
                self.info = None;
            }
        }
    }

    /// Select the nearest body under `ray`. A miss keeps the current selection.
    pub fn pick<'a>(
        &mut self,
        ray: &Ray,
        proxies: impl IntoIterator<Item = &'a VisualProxy>,
    ) -> Option<BodyId> {
        let (id, _) = nearest_hit(ray, proxies)?;
        self.select(Some(id));
        Some(id)
    }

    /// Next body in spawn order, wrapping. No-op without a selection.
    pub fn cycle_next(&mut self, order: &[BodyId]) -> Option<BodyId> {
        self.cycle(order, 1)
    }

    /// Previous body in spawn order, wrapping. No-op without a selection.
    pub fn cycle_previous(&mut self, order: &[BodyId]) -> Option<BodyId> {
        self.cycle(order, order.len().saturating_sub(1))
    }

    fn cycle(&mut self, order: &[BodyId], step: usize) -> Option<BodyId> {
        let current = self.selected?;
        let Some(index) = order.iter().position(|&id| id == current) else {
            return Some(current);
        };
        let next = order[(index + step) % order.len()];
        self.select(Some(next));
        Some(next)
    }

    /// Recompute the displayed info when the selection changed or when
    /// [`SELECTION_REFRESH_INTERVAL`] has elapsed since the last refresh.
    ///
    /// A selected body that no longer exists is deselected. Returns whether the info was
    /// recomputed.
    pub fn refresh_info(&mut self, now: Duration, registry: &BodyRegistry) -> bool {
        let Some(id) = self.selected else {
            self.info = None;
            return false;
        };

        let due = match self.last_refresh {
            Some(last) => now.saturating_sub(last) >= SELECTION_REFRESH_INTERVAL,
            None => true,
        };
        if !(self.stale || due) {
            return false;
        }

        let Some(entry) = registry.get(id) else {
            self.select(None);
            return false;
        };

        self.info = Some(SelectionInfo {
            id,
            kind: entry.record.shape.kind_name(),
            position: entry.proxy.translation,
            velocity: entry.linvel,
            speed: entry.linvel.norm(),
        });
        self.last_refresh = Some(now);
        self.stale = false;
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

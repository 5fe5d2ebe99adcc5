use bevy::prelude::*;
use nalgebra::{UnitQuaternion, Vector3};
use sim::Rgb;

pub fn to_vec3(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn to_quat(q: &UnitQuaternion<f32>) -> Quat {
    let c = q.quaternion().coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

/// Ramp colors are authored in sRGB; vertex colors are linear.
pub fn to_linear_rgba(c: &Rgb) -> [f32; 4] {
    Color::srgb(c[0], c[1], c[2]).to_linear().to_f32_array()
}

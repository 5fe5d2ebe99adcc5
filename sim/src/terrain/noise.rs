//! Value noise and its fractal sum.
//!
//! Lattice corners get a pseudo-random value from an integer hash of their coordinates,
//! and the cell interior is blended with the quintic fade `t^3 (6t^2 - 15t + 10)`. Nothing
//! here holds state: the same inputs always produce the same output.

use crate::constants::FBM_OCTAVES;

/// Quintic fade curve. First and second derivatives vanish at 0 and 1.
#[inline]
pub fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hash of an integer lattice point into `[0, 1)`.
#[inline]
pub fn lattice_hash(ix: i32, iz: i32, seed: u32) -> f32 {
    let mut h = (ix as u32)
        .wrapping_mul(0x27d4_eb2d)
        .wrapping_add((iz as u32).wrapping_mul(0x1656_67b1))
        .wrapping_add(seed.wrapping_mul(0x9e37_79b9));
    h = (h ^ (h >> 15)).wrapping_mul(0x85eb_ca6b);
    h = (h ^ (h >> 13)).wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    // Keep 24 bits so the conversion to f32 is exact.
    (h >> 8) as f32 / (1u32 << 24) as f32
}

/// 2-D value noise in `[0, 1)`.
pub fn value_noise(x: f32, z: f32, seed: u32) -> f32 {
    let x0 = x.floor();
    let z0 = z.floor();
    let ix = x0 as i32;
    let iz = z0 as i32;

    let u = fade(x - x0);
    let v = fade(z - z0);

    let c00 = lattice_hash(ix, iz, seed);
    let c10 = lattice_hash(ix.wrapping_add(1), iz, seed);
    let c01 = lattice_hash(ix, iz.wrapping_add(1), seed);
    let c11 = lattice_hash(ix.wrapping_add(1), iz.wrapping_add(1), seed);

    lerp(lerp(c00, c10, u), lerp(c01, c11, u), v)
}

/// Fractal sum of [`FBM_OCTAVES`] octaves of value noise, normalized to `[0, 1)`.
///
/// Frequency doubles and amplitude halves from octave to octave. Each octave uses its own
/// seed so that octaves do not share lattice corners at the origin.
pub fn fbm(x: f32, z: f32, frequency: f32, seed: u32) -> f32 {
    let mut sum = 0.0;
    let mut norm = 0.0;
    let mut amplitude = 0.5;
    let mut freq = frequency;

    for octave in 0..FBM_OCTAVES {
        sum += amplitude * value_noise(x * freq, z * freq, seed.wrapping_add(octave * 101));
        norm += amplitude;
        amplitude *= 0.5;
        freq *= 2.0;
    }

    sum / norm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_hits_endpoints_and_midpoint() {
        assert_eq!(fade(0.0), 0.0);
        assert!((fade(1.0) - 1.0).abs() < 1.0e-6);
        assert!((fade(0.5) - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn fade_is_monotonic_on_unit_interval() {
        let mut prev = fade(0.0);
        for i in 1..=100 {
            let next = fade(i as f32 / 100.0);
            assert!(next >= prev);
            prev = next;
        }
    }

    #[test]
    fn hash_is_stable_and_in_range() {
        for ix in -20..20 {
            for iz in -20..20 {
                let a = lattice_hash(ix, iz, 7);
                let b = lattice_hash(ix, iz, 7);
                assert_eq!(a.to_bits(), b.to_bits());
                assert!((0.0..1.0).contains(&a));
            }
        }
    }

    #[test]
    fn hash_depends_on_seed() {
        let differing = (0..64)
            .filter(|&i| lattice_hash(i, -i, 1) != lattice_hash(i, -i, 2))
            .count();
        assert!(differing > 56);
    }

    #[test]
    fn value_noise_matches_lattice_at_integer_points() {
        // At lattice corners the fade weights are exactly 0, so the corner value comes through.
        for (ix, iz) in [(0, 0), (3, -4), (-17, 9)] {
            let n = value_noise(ix as f32, iz as f32, 42);
            assert!((n - lattice_hash(ix, iz, 42)).abs() < 1.0e-6);
        }
    }

    #[test]
    fn value_noise_is_continuous_across_cell_edges() {
        let left = value_noise(2.0 - 1.0e-4, 0.37, 5);
        let right = value_noise(2.0 + 1.0e-4, 0.37, 5);
        assert!((left - right).abs() < 1.0e-3);
    }

    #[test]
    fn fbm_stays_in_unit_range() {
        for i in 0..200 {
            let x = i as f32 * 13.7 - 900.0;
            let z = i as f32 * -7.3 + 450.0;
            let v = fbm(x, z, 1.0 / 300.0, 9);
            assert!((0.0..1.0).contains(&v), "fbm out of range: {v}");
        }
    }
}

//! Elevation profile and height coloring.
//!
//! [`TerrainSampler`] composes fbm terms into the final height and shifts it so that the
//! lowest sampled point of the calibration area sits at exactly 0. The sampler is immutable:
//! changing any [`TerrainParams`] means building a new one.

use super::noise::fbm;
use crate::config::{ColorStyle, TerrainParams};

pub type Rgb = [f32; 3];

/// Which samples the sea-level pass looks at.
///
/// Both variants sample on a regular grid centered on the origin. Whichever policy a
/// terrain instance was calibrated with applies to its visual mesh and its collider alike,
/// since both read heights from the same sampler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NormalizationPolicy {
    /// Every vertex of one mesh of edge `size` with `resolution` cells per edge.
    FullResolution { size: f32, resolution: u32 },
    /// `samples` x `samples` points spread over an area of edge `extent`.
    CoarseGrid { extent: f32, samples: u32 },
}

impl NormalizationPolicy {
    fn grid(&self) -> (f32, u32) {
        match *self {
            NormalizationPolicy::FullResolution { size, resolution } => (size, resolution.max(1)),
            NormalizationPolicy::CoarseGrid { extent, samples } => (extent, samples.max(2) - 1),
        }
    }
}

/// Raw elevation range seen during calibration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightRange {
    pub min: f32,
    pub max: f32,
}

impl HeightRange {
    /// Span used to normalize heights for coloring; never zero.
    pub fn span(&self) -> f32 {
        let span = self.max - self.min;
        if span > 1.0e-6 { span } else { 1.0 }
    }
}

#[derive(Clone, Debug)]
pub struct TerrainSampler {
    params: TerrainParams,
    style: ColorStyle,
    range: HeightRange,
}

impl TerrainSampler {
    /// Build a sampler and run the sea-level pass over the area described by `policy`.
    pub fn calibrated(params: TerrainParams, style: ColorStyle, policy: NormalizationPolicy) -> Self {
        let (extent, cells) = policy.grid();
        let step = extent / cells as f32;
        let origin = -extent * 0.5;

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for j in 0..=cells {
            for i in 0..=cells {
                let h = raw_height(&params, origin + i as f32 * step, origin + j as f32 * step);
                min = min.min(h);
                max = max.max(h);
            }
        }
        if !min.is_finite() || !max.is_finite() {
            log::warn!("terrain calibration produced non-finite heights; using raw heights");
            min = 0.0;
            max = 1.0;
        }

        log::info!(
            "terrain calibrated over {extent} units ({} samples/edge): raw range [{min:.2}, {max:.2}]",
            cells + 1
        );

        Self {
            params,
            style,
            range: HeightRange { min, max },
        }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn style(&self) -> &ColorStyle {
        &self.style
    }

    /// Raw range found by the sea-level pass.
    pub fn range(&self) -> HeightRange {
        self.range
    }

    /// Sea-level normalized height at world `(x, z)`.
    #[inline]
    pub fn height(&self, x: f32, z: f32) -> f32 {
        raw_height(&self.params, x, z) - self.range.min
    }

    /// Map a normalized height to `[0, 1]` against the calibrated range.
    #[inline]
    pub fn normalized(&self, height: f32) -> f32 {
        (height / self.range.span()).clamp(0.0, 1.0)
    }

    /// Color of a terrain point with the given normalized height.
    pub fn color_for(&self, normalized_height: f32) -> Rgb {
        color_for(&self.style, normalized_height)
    }
}

/// Elevation before sea-level normalization.
pub fn raw_height(p: &TerrainParams, x: f32, z: f32) -> f32 {
    let seed = p.seed;

    // Broad rolling hills.
    let hills = fbm(x, z, p.hills_frequency, seed) * p.hills_amplitude;

    // Sparse peaks: only the part of the signal above the base level, sharpened.
    let m = fbm(x + 5_100.0, z - 2_300.0, p.mountain_frequency, seed.wrapping_add(1));
    let above = ((m - p.mountain_base) / (1.0 - p.mountain_base).max(1.0e-3)).max(0.0);
    let mountains = above.powf(p.mountain_exponent) * p.mountain_amplitude * p.mountain_scale;

    // Basins: inverted signal, only where it passes the threshold.
    let l = 1.0 - fbm(x - 7_700.0, z + 3_900.0, p.lake_frequency, seed.wrapping_add(2));
    let sink = ((l - p.lake_threshold) / (1.0 - p.lake_threshold).max(1.0e-3)).max(0.0);
    let basins = sink * p.lake_depth * p.lake_scale;

    let detail = (fbm(x, z, p.detail_frequency, seed.wrapping_add(3)) - 0.5) * p.detail_amplitude;

    let ripples =
        (x * p.ripple_frequency).sin() * (z * p.ripple_frequency * 0.83).cos() * p.ripple_amplitude;

    hills + mountains - basins + detail + ripples + p.uplift
}

#[inline]
fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn mix(a: Rgb, b: Rgb, t: f32) -> Rgb {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Ramp color for a height already normalized to `[0, 1]`.
pub fn color_for(style: &ColorStyle, normalized_height: f32) -> Rgb {
    let smooth = smoothstep(normalized_height);

    let t = if style.bands >= 2 {
        let bands = style.bands as f32;
        ((smooth * bands).floor() / (bands - 1.0)).min(1.0)
    } else {
        smooth
    };

    let mut color = match style.mid {
        Some(mid) if t < 0.5 => mix(style.low, mid, t * 2.0),
        Some(mid) => mix(mid, style.high, (t - 0.5) * 2.0),
        None => mix(style.low, style.high, t),
    };

    if style.contour_count > 0 {
        let phase = (smooth * style.contour_count as f32).fract();
        if phase < style.contour_width {
            for c in &mut color {
                *c *= style.contour_shade;
            }
        }
    }

    color
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler() -> TerrainSampler {
        TerrainSampler::calibrated(
            TerrainParams::default(),
            ColorStyle::default(),
            NormalizationPolicy::CoarseGrid {
                extent: 4000.0,
                samples: 33,
            },
        )
    }

    #[test]
    fn height_is_deterministic_across_calls_and_instances() {
        let a = sampler();
        let b = sampler();
        for (x, z) in [(0.0, 0.0), (137.5, -42.25), (1000.0, 1000.0)] {
            let h1 = a.height(x, z);
            let h2 = a.height(x, z);
            let h3 = b.height(x, z);
            assert_eq!(h1.to_bits(), h2.to_bits());
            assert_eq!(h1.to_bits(), h3.to_bits());
            assert!(h1.is_finite());
        }
    }

    // Recorded values for the default parameters (seed 1337). Any change to the hash, the
    // fbm or the composition shows up here.
    const GOLDEN: [(f32, f32, f32, f32); 3] = [
        (0.0, 0.0, 116.658_33, 133.773_54),
        (137.5, -42.25, 135.809_71, 152.924_93),
        (1000.0, 1000.0, 46.847_47, 63.962_685),
    ];
    const GOLDEN_SEA_LEVEL: f32 = -17.115_217;

    #[test]
    fn heights_match_recorded_values() {
        let params = TerrainParams::default();
        let s = sampler();
        assert!((s.range().min - GOLDEN_SEA_LEVEL).abs() < 1.0e-3);
        for (x, z, raw, calibrated) in GOLDEN {
            let r = raw_height(&params, x, z);
            assert!((r - raw).abs() < 1.0e-3, "raw height at ({x}, {z}) is {r}");
            let h = s.height(x, z);
            assert!((h - calibrated).abs() < 1.0e-3, "height at ({x}, {z}) is {h}");
        }
    }

    #[test]
    fn full_resolution_normalization_puts_lowest_vertex_at_zero() {
        let size = 1200.0;
        let resolution = 24;
        let s = TerrainSampler::calibrated(
            TerrainParams::default(),
            ColorStyle::default(),
            NormalizationPolicy::FullResolution { size, resolution },
        );

        let step = size / resolution as f32;
        let mut min = f32::INFINITY;
        for j in 0..=resolution {
            for i in 0..=resolution {
                let x = -size * 0.5 + i as f32 * step;
                let z = -size * 0.5 + j as f32 * step;
                min = min.min(s.height(x, z));
            }
        }
        assert!(min.abs() < 1.0e-3, "lowest vertex at {min}");
    }

    #[test]
    fn coarse_samples_are_never_below_sea_level() {
        let s = sampler();
        let step = 4000.0 / 32.0;
        for j in 0..=32 {
            for i in 0..=32 {
                let h = s.height(-2000.0 + i as f32 * step, -2000.0 + j as f32 * step);
                assert!(h >= -1.0e-3);
            }
        }
    }

    #[test]
    fn mountain_scale_only_raises_terrain() {
        // The mountain term is non-negative, so scaling it up never lowers a raw height.
        let flat = TerrainParams {
            mountain_scale: 0.0,
            ..TerrainParams::default()
        };
        let tall = TerrainParams {
            mountain_scale: 2.0,
            ..TerrainParams::default()
        };
        for i in 0..64 {
            let x = i as f32 * 91.0 - 3000.0;
            let z = i as f32 * -57.0 + 1500.0;
            assert!(raw_height(&tall, x, z) >= raw_height(&flat, x, z));
        }
    }

    #[test]
    fn lake_scale_only_lowers_terrain() {
        let dry = TerrainParams {
            lake_scale: 0.0,
            ..TerrainParams::default()
        };
        let deep = TerrainParams {
            lake_scale: 3.0,
            ..TerrainParams::default()
        };
        for i in 0..64 {
            let x = i as f32 * -73.0 + 2000.0;
            let z = i as f32 * 49.0 - 800.0;
            assert!(raw_height(&deep, x, z) <= raw_height(&dry, x, z));
        }
    }

    #[test]
    fn two_stop_ramp_hits_endpoints() {
        let style = ColorStyle {
            mid: None,
            bands: 0,
            contour_count: 0,
            ..ColorStyle::default()
        };
        assert_eq!(color_for(&style, 0.0), style.low);
        let top = color_for(&style, 1.0);
        for k in 0..3 {
            assert!((top[k] - style.high[k]).abs() < 1.0e-6);
        }
    }

    #[test]
    fn posterization_produces_at_most_band_count_colors() {
        let style = ColorStyle {
            bands: 5,
            contour_count: 0,
            ..ColorStyle::default()
        };
        let mut seen: Vec<[u32; 3]> = Vec::new();
        for i in 0..=400 {
            let c = color_for(&style, i as f32 / 400.0);
            let key = [c[0].to_bits(), c[1].to_bits(), c[2].to_bits()];
            if !seen.contains(&key) {
                seen.push(key);
            }
        }
        // `bands` levels plus the clamped top value.
        assert!(seen.len() <= 6, "saw {} distinct colors", seen.len());
    }

    #[test]
    fn contour_lines_darken_the_band_start() {
        let style = ColorStyle {
            mid: None,
            bands: 0,
            contour_count: 4,
            contour_width: 0.1,
            contour_shade: 0.5,
            ..ColorStyle::default()
        };
        let plain = ColorStyle {
            contour_count: 0,
            ..style
        };
        // smoothstep(0.5) == 0.5, and 0.5 * 4 has a zero fractional part: on a contour line.
        let on_line = color_for(&style, 0.5);
        let reference = color_for(&plain, 0.5);
        for k in 0..3 {
            assert!((on_line[k] - reference[k] * 0.5).abs() < 1.0e-6);
        }
    }

    #[test]
    fn normalized_height_is_clamped() {
        let s = sampler();
        assert_eq!(s.normalized(-10.0), 0.0);
        assert_eq!(s.normalized(s.range().span() * 2.0), 1.0);
    }
}

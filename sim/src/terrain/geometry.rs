//! Grid sampling for terrain tiles.
//!
//! A tile is a square of edge `size` centered on `(center_x, center_z)` and split into
//! `resolution` cells per edge, so it carries `(resolution + 1)^2` vertices. Vertex `(i, j)`
//! sits at `x = center_x - size/2 + i * step`, `z = center_z - size/2 + j * step`.
//!
//! The visual mesh and the collider height matrix are produced by two separate passes that
//! share [`grid_coord`], which is what keeps their heights bit-identical.

use nalgebra::{DMatrix, Vector3};

use super::sampler::{Rgb, TerrainSampler};

/// Square grid placement shared by mesh and collider passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSpec {
    pub center_x: f32,
    pub center_z: f32,
    pub size: f32,
    pub resolution: u32,
}

impl GridSpec {
    /// Vertices per edge.
    #[inline]
    pub fn side(&self) -> usize {
        self.resolution as usize + 1
    }

    /// Grid element spacing.
    #[inline]
    pub fn step(&self) -> f32 {
        self.size / self.resolution as f32
    }
}

/// World `(x, z)` of grid vertex `(i, j)`.
#[inline]
pub fn grid_coord(spec: &GridSpec, i: usize, j: usize) -> (f32, f32) {
    let step = spec.step();
    (
        spec.center_x - spec.size * 0.5 + i as f32 * step,
        spec.center_z - spec.size * 0.5 + j as f32 * step,
    )
}

/// One derived terrain point.
#[derive(Clone, Copy, Debug)]
pub struct HeightSample {
    pub x: f32,
    pub z: f32,
    pub height: f32,
    pub normal: Vector3<f32>,
    pub color: Rgb,
}

impl HeightSample {
    /// Sample `(x, z)` with normals from central differences at `±eps`.
    pub fn at(sampler: &TerrainSampler, x: f32, z: f32, eps: f32) -> Self {
        let height = sampler.height(x, z);

        let dx = sampler.height(x - eps, z) - sampler.height(x + eps, z);
        let dz = sampler.height(x, z - eps) - sampler.height(x, z + eps);
        let n = Vector3::new(dx, 2.0 * eps, dz);
        let normal = n.try_normalize(1.0e-12).unwrap_or_else(Vector3::y);

        Self {
            x,
            z,
            height,
            normal,
            color: sampler.color_for(sampler.normalized(height)),
        }
    }
}

/// Renderable triangle grid in world space.
#[derive(Clone, Debug, Default)]
pub struct GridGeometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<Rgb>,
    pub indices: Vec<u32>,
    /// Vertices per edge.
    pub side: usize,
}

impl GridGeometry {
    /// Height of vertex `(i, j)`.
    #[inline]
    pub fn height_at(&self, i: usize, j: usize) -> f32 {
        self.positions[j * self.side + i][1]
    }
}

/// Visual pass: positions, normals, colors and counter-clockwise (from +Y) triangles.
pub fn build_mesh(sampler: &TerrainSampler, spec: &GridSpec) -> GridGeometry {
    let side = spec.side();
    let eps = spec.step();
    let count = side * side;

    let mut positions = Vec::with_capacity(count);
    let mut normals = Vec::with_capacity(count);
    let mut colors = Vec::with_capacity(count);

    for j in 0..side {
        for i in 0..side {
            let (x, z) = grid_coord(spec, i, j);
            let s = HeightSample::at(sampler, x, z, eps);
            positions.push([s.x, s.height, s.z]);
            normals.push([s.normal.x, s.normal.y, s.normal.z]);
            colors.push(s.color);
        }
    }

    let cells = side - 1;
    let mut indices = Vec::with_capacity(cells * cells * 6);
    for j in 0..cells {
        for i in 0..cells {
            let a = (j * side + i) as u32;
            let b = a + 1;
            let c = a + side as u32;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    GridGeometry {
        positions,
        normals,
        colors,
        indices,
        side,
    }
}

/// Collider pass: height matrix with rows along Z and columns along X.
pub fn build_height_matrix(sampler: &TerrainSampler, spec: &GridSpec) -> DMatrix<f32> {
    let side = spec.side();
    DMatrix::from_fn(side, side, |row, col| {
        let (x, z) = grid_coord(spec, col, row);
        sampler.height(x, z)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColorStyle, TerrainParams};
    use crate::terrain::NormalizationPolicy;

    fn sampler() -> TerrainSampler {
        TerrainSampler::calibrated(
            TerrainParams::default(),
            ColorStyle::default(),
            NormalizationPolicy::CoarseGrid {
                extent: 2400.0,
                samples: 17,
            },
        )
    }

    fn spec() -> GridSpec {
        GridSpec {
            center_x: 800.0,
            center_z: -1600.0,
            size: 800.0,
            resolution: 16,
        }
    }

    #[test]
    fn mesh_and_height_matrix_agree_at_every_vertex() {
        let s = sampler();
        let spec = spec();
        let mesh = build_mesh(&s, &spec);
        let heights = build_height_matrix(&s, &spec);

        assert_eq!(heights.nrows(), spec.side());
        assert_eq!(heights.ncols(), spec.side());
        for j in 0..spec.side() {
            for i in 0..spec.side() {
                let visual = mesh.height_at(i, j);
                let collision = heights[(j, i)];
                assert!((visual - collision).abs() < 1.0e-6, "mismatch at ({i}, {j})");
            }
        }
    }

    #[test]
    fn mesh_has_expected_counts() {
        let mesh = build_mesh(&sampler(), &spec());
        assert_eq!(mesh.positions.len(), 17 * 17);
        assert_eq!(mesh.normals.len(), 17 * 17);
        assert_eq!(mesh.colors.len(), 17 * 17);
        assert_eq!(mesh.indices.len(), 16 * 16 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
    }

    #[test]
    fn grid_spans_the_tile_edges() {
        let spec = spec();
        let (x0, z0) = grid_coord(&spec, 0, 0);
        let (x1, z1) = grid_coord(&spec, spec.resolution as usize, spec.resolution as usize);
        assert!((x0 - 400.0).abs() < 1.0e-3);
        assert!((z0 + 2000.0).abs() < 1.0e-3);
        assert!((x1 - 1200.0).abs() < 1.0e-3);
        assert!((z1 + 1200.0).abs() < 1.0e-3);
    }

    #[test]
    fn normals_are_unit_and_point_up() {
        let mesh = build_mesh(&sampler(), &spec());
        for n in &mesh.normals {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1.0e-4);
            assert!(n[1] > 0.0);
        }
    }

    #[test]
    fn triangles_face_up() {
        let mesh = build_mesh(&sampler(), &spec());
        for tri in mesh.indices.chunks(3) {
            let p = |k: usize| Vector3::from(mesh.positions[tri[k] as usize]);
            let n = (p(1) - p(0)).cross(&(p(2) - p(0)));
            assert!(n.y > 0.0);
        }
    }
}

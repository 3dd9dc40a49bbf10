//! Procedural test meshes.
//!
//! These are owned vertex/index buffers used by tests, benchmarks and the CLI.
//! All shapes are wound counter-clockwise when viewed from outside.

use std::f32::consts::PI;

use nalgebra::Point3;

use super::trimesh::TriMesh;

/// An owned triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    /// Vertex positions.
    pub positions: Vec<Point3<f32>>,
    /// Triangle list.
    pub indices: Vec<u32>,
}

impl Shape {
    /// Borrow the buffers as a [`TriMesh`].
    pub fn mesh(&self) -> TriMesh<'_, u32> {
        TriMesh::new(&self.positions, &self.indices)
    }

    /// Number of triangles.
    pub fn num_faces(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Unit cube with every face carrying its own four vertices (24 vertices, 12 triangles).
///
/// Corners are duplicated per face, as an exporter does for flat normals, so
/// only welding connects the faces.
pub fn cube() -> Shape {
    let p = |x: f32, y: f32, z: f32| Point3::new(x, y, z);
    let positions = vec![
        p(0.5, -0.5, 0.5),
        p(-0.5, -0.5, 0.5),
        p(0.5, 0.5, 0.5),
        p(-0.5, 0.5, 0.5),
        p(0.5, 0.5, -0.5),
        p(-0.5, 0.5, -0.5),
        p(0.5, -0.5, -0.5),
        p(-0.5, -0.5, -0.5),
        p(0.5, 0.5, 0.5),
        p(-0.5, 0.5, 0.5),
        p(0.5, 0.5, -0.5),
        p(-0.5, 0.5, -0.5),
        p(0.5, -0.5, -0.5),
        p(0.5, -0.5, 0.5),
        p(-0.5, -0.5, 0.5),
        p(-0.5, -0.5, -0.5),
        p(-0.5, -0.5, 0.5),
        p(-0.5, 0.5, 0.5),
        p(-0.5, 0.5, -0.5),
        p(-0.5, -0.5, -0.5),
        p(0.5, -0.5, -0.5),
        p(0.5, 0.5, -0.5),
        p(0.5, 0.5, 0.5),
        p(0.5, -0.5, 0.5),
    ];
    let indices = vec![
        0, 2, 3, 0, 3, 1, // +z
        8, 4, 5, 8, 5, 9, // +y
        10, 6, 7, 10, 7, 11, // -z
        12, 13, 14, 12, 14, 15, // -y
        16, 17, 18, 16, 18, 19, // -x
        20, 21, 22, 20, 22, 23, // +x
    ];
    Shape { positions, indices }
}

/// Planar grid of `nx × ny` cells in the z = 0 plane, spanning `[0, size_x] × [0, size_y]`.
pub fn grid(nx: usize, ny: usize, size_x: f32, size_y: f32) -> Shape {
    let nx = nx.max(1);
    let ny = ny.max(1);
    let mut positions = Vec::with_capacity((nx + 1) * (ny + 1));
    let mut indices = Vec::with_capacity(nx * ny * 6);

    for j in 0..=ny {
        for i in 0..=nx {
            positions.push(Point3::new(
                size_x * i as f32 / nx as f32,
                size_y * j as f32 / ny as f32,
                0.0,
            ));
        }
    }

    for j in 0..ny {
        for i in 0..nx {
            let v00 = (j * (nx + 1) + i) as u32;
            let v10 = v00 + 1;
            let v01 = v00 + (nx + 1) as u32;
            let v11 = v01 + 1;
            indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
        }
    }

    Shape { positions, indices }
}

/// Open cylinder (a tube without caps) around the z axis.
///
/// The seam column is shared, so the surface is an annulus: not a disk.
pub fn cylinder(segments: usize, rings: usize, radius: f32, height: f32) -> Shape {
    let segments = segments.max(3);
    let rings = rings.max(1);
    let mut positions = Vec::with_capacity(segments * (rings + 1));
    let mut indices = Vec::with_capacity(segments * rings * 6);

    for j in 0..=rings {
        let z = height * j as f32 / rings as f32;
        for i in 0..segments {
            let theta = 2.0 * PI * i as f32 / segments as f32;
            positions.push(Point3::new(radius * theta.cos(), radius * theta.sin(), z));
        }
    }

    for j in 0..rings {
        for i in 0..segments {
            let i1 = (i + 1) % segments;
            let v00 = (j * segments + i) as u32;
            let v10 = (j * segments + i1) as u32;
            let v01 = ((j + 1) * segments + i) as u32;
            let v11 = ((j + 1) * segments + i1) as u32;
            indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
        }
    }

    Shape { positions, indices }
}

/// Closed UV sphere with single pole vertices.
pub fn uv_sphere(segments: usize, rings: usize, radius: f32) -> Shape {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut positions = Vec::with_capacity(segments * (rings - 1) + 2);
    let mut indices = Vec::new();

    positions.push(Point3::new(0.0, 0.0, -radius));
    for j in 1..rings {
        let phi = PI * j as f32 / rings as f32 - PI / 2.0;
        for i in 0..segments {
            let theta = 2.0 * PI * i as f32 / segments as f32;
            positions.push(Point3::new(
                radius * phi.cos() * theta.cos(),
                radius * phi.cos() * theta.sin(),
                radius * phi.sin(),
            ));
        }
    }
    positions.push(Point3::new(0.0, 0.0, radius));

    let south = 0u32;
    let north = (positions.len() - 1) as u32;
    let ring = |j: usize, i: usize| (1 + (j - 1) * segments + i % segments) as u32;

    for i in 0..segments {
        indices.extend_from_slice(&[south, ring(1, i + 1), ring(1, i)]);
    }
    for j in 1..rings - 1 {
        for i in 0..segments {
            let v00 = ring(j, i);
            let v10 = ring(j, i + 1);
            let v01 = ring(j + 1, i);
            let v11 = ring(j + 1, i + 1);
            indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
        }
    }
    for i in 0..segments {
        indices.extend_from_slice(&[north, ring(rings - 1, i), ring(rings - 1, i + 1)]);
    }

    Shape { positions, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_volume(shape: &Shape) -> f64 {
        shape
            .indices
            .chunks_exact(3)
            .map(|t| {
                let a = shape.positions[t[0] as usize].coords.cast::<f64>();
                let b = shape.positions[t[1] as usize].coords.cast::<f64>();
                let c = shape.positions[t[2] as usize].coords.cast::<f64>();
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }

    #[test]
    fn test_cube_counts() {
        let cube = cube();
        assert_eq!(cube.positions.len(), 24);
        assert_eq!(cube.num_faces(), 12);
        assert!(cube.mesh().check().is_ok());
        assert!((signed_volume(&cube) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_grid_counts() {
        let g = grid(3, 2, 3.0, 2.0);
        assert_eq!(g.positions.len(), 12);
        assert_eq!(g.num_faces(), 12);
        assert!(g.mesh().check().is_ok());
    }

    #[test]
    fn test_sphere_is_outward() {
        let s = uv_sphere(12, 8, 1.0);
        assert_eq!(s.positions.len(), 12 * 7 + 2);
        assert!(s.mesh().check().is_ok());
        assert!(signed_volume(&s) > 3.0);
    }

    #[test]
    fn test_cylinder_counts() {
        let c = cylinder(8, 2, 1.0, 2.0);
        assert_eq!(c.positions.len(), 24);
        assert_eq!(c.num_faces(), 32);
        assert!(c.mesh().check().is_ok());
    }
}

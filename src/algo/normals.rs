//! Per-vertex normal estimation.
//!
//! Each used triangle contributes its face normal to its three corners. The
//! contribution is weighted by the corner angle (default), by the triangle
//! area, or equally, depending on [`NormalFlags`].

use bitflags::bitflags;
use nalgebra::Vector3;

use crate::error::{AtlasError, Result};
use crate::mesh::{MeshIndex, TriMesh};

bitflags! {
    /// Weighting and winding options for [`compute_normals`].
    ///
    /// The empty set weights contributions by corner angle with
    /// counter-clockwise front faces.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NormalFlags: u32 {
        /// Weight each face normal by the triangle area.
        const WEIGHT_BY_AREA = 0x1;
        /// Weight every face normal equally.
        const WEIGHT_EQUAL = 0x2;
        /// Front faces are wound clockwise.
        const WIND_CW = 0x4;
    }
}

impl NormalFlags {
    /// Angle weighting, counter-clockwise winding.
    pub const DEFAULT: Self = Self::empty();
}

#[derive(Clone, Copy)]
enum Weighting {
    Angle,
    Area,
    Equal,
}

/// Compute one normal per vertex.
///
/// # Arguments
///
/// * `mesh` - Triangle list; unused triangles are skipped
/// * `flags` - Weighting and winding
///
/// # Returns
///
/// A unit normal per vertex. A vertex whose weighted sum cancels out falls
/// back to the plain sum of its incident unit face normals; a vertex with no
/// non-degenerate incident triangle gets the zero vector.
///
/// # Errors
///
/// Returns [`AtlasError::InvalidParameter`] if both weighting flags are set,
/// or a structural error for malformed buffers.
///
/// # Example
///
/// ```
/// use isochart::algo::normals::{compute_normals, NormalFlags};
/// use isochart::mesh::shapes;
///
/// let grid = shapes::grid(2, 2, 1.0, 1.0);
/// let normals = compute_normals(&grid.mesh(), NormalFlags::DEFAULT).unwrap();
/// assert!(normals.iter().all(|n| (n.z - 1.0).abs() < 1e-6));
/// ```
pub fn compute_normals<I: MeshIndex>(mesh: &TriMesh<'_, I>, flags: NormalFlags) -> Result<Vec<Vector3<f32>>> {
    if flags.contains(NormalFlags::WEIGHT_BY_AREA | NormalFlags::WEIGHT_EQUAL) {
        return Err(AtlasError::invalid_param(
            "flags",
            format!("{:?}", flags),
            "WEIGHT_BY_AREA and WEIGHT_EQUAL are mutually exclusive",
        ));
    }
    mesh.check()?;

    let weighting = if flags.contains(NormalFlags::WEIGHT_BY_AREA) {
        Weighting::Area
    } else if flags.contains(NormalFlags::WEIGHT_EQUAL) {
        Weighting::Equal
    } else {
        Weighting::Angle
    };
    let sign = if flags.contains(NormalFlags::WIND_CW) { -1.0 } else { 1.0 };

    let nv = mesh.num_vertices();
    let mut weighted = vec![Vector3::<f64>::zeros(); nv];
    let mut fallback = vec![Vector3::<f64>::zeros(); nv];

    for f in 0..mesh.num_faces() {
        let Some(face) = mesh.face(f) else {
            continue;
        };
        let cross = mesh.face_cross(face) * sign;
        let len = cross.norm();
        if len <= f64::EPSILON {
            continue;
        }
        let unit = cross / len;

        for corner in 0..3 {
            let v = face[corner];
            let contribution = match weighting {
                Weighting::Equal => unit,
                Weighting::Area => cross,
                Weighting::Angle => unit * corner_angle(mesh, face, corner),
            };
            weighted[v] += contribution;
            fallback[v] += unit;
        }
    }

    let normals = weighted
        .iter()
        .zip(&fallback)
        .map(|(w, u)| {
            w.try_normalize(1e-12)
                .or_else(|| u.try_normalize(1e-12))
                .map(|n| n.cast::<f32>())
                .unwrap_or_else(Vector3::zeros)
        })
        .collect();

    log::debug!("normals: {} vertices, weighting {:?}", nv, flags);
    Ok(normals)
}

/// Interior angle of a triangle at one corner, in radians.
fn corner_angle<I: MeshIndex>(mesh: &TriMesh<'_, I>, face: [usize; 3], corner: usize) -> f64 {
    let p = mesh.position(face[corner]);
    let e1 = mesh.position(face[(corner + 1) % 3]) - p;
    let e2 = mesh.position(face[(corner + 2) % 3]) - p;
    e1.cross(&e2).norm().atan2(e1.dot(&e2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;
    use nalgebra::Point3;

    #[test]
    fn test_flat_grid() {
        let grid = shapes::grid(3, 3, 2.0, 1.0);
        for flags in [NormalFlags::DEFAULT, NormalFlags::WEIGHT_BY_AREA, NormalFlags::WEIGHT_EQUAL] {
            let normals = compute_normals(&grid.mesh(), flags).unwrap();
            assert_eq!(normals.len(), grid.positions.len());
            for n in &normals {
                assert!((n - Vector3::z()).norm() < 1e-6);
            }
        }
    }

    #[test]
    fn test_clockwise_flips() {
        let grid = shapes::grid(1, 1, 1.0, 1.0);
        let normals = compute_normals(&grid.mesh(), NormalFlags::WIND_CW).unwrap();
        assert!(normals.iter().all(|n| (n.z + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_conflicting_flags() {
        let grid = shapes::grid(1, 1, 1.0, 1.0);
        let flags = NormalFlags::WEIGHT_BY_AREA | NormalFlags::WEIGHT_EQUAL;
        assert!(matches!(
            compute_normals(&grid.mesh(), flags),
            Err(AtlasError::InvalidParameter { name: "flags", .. })
        ));
    }

    #[test]
    fn test_sphere_normals_point_outward() {
        let sphere = shapes::uv_sphere(16, 8, 2.0);
        let normals = compute_normals(&sphere.mesh(), NormalFlags::DEFAULT).unwrap();
        for (p, n) in sphere.positions.iter().zip(&normals) {
            let radial = p.coords.normalize();
            assert!(radial.dot(n) > 0.95);
        }
    }

    #[test]
    fn test_weighting_differs() {
        // A large and a thin triangle folded along the shared edge 0-1.
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 4.0, 0.0),
            Point3::new(0.5, 0.0, 0.1),
        ];
        let indices = [0u32, 1, 2, 1, 0, 3];
        let mesh = TriMesh::new(&positions, &indices);
        let by_area = compute_normals(&mesh, NormalFlags::WEIGHT_BY_AREA).unwrap();
        let equal = compute_normals(&mesh, NormalFlags::WEIGHT_EQUAL).unwrap();
        assert!(by_area[0].z > equal[0].z);
    }

    #[test]
    fn test_unreferenced_vertex_is_zero() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
        ];
        let indices = [0u32, 1, 2];
        let normals = compute_normals(&TriMesh::new(&positions, &indices), NormalFlags::DEFAULT).unwrap();
        assert_eq!(normals[3], Vector3::zeros());
    }
}

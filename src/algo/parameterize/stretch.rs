//! L2 texture stretch metrics.
//!
//! For a triangle mapped from UV to 3D, let Γ ≥ γ be the singular values of
//! the Jacobian. The L2 stretch is `sqrt((Γ² + γ²) / 2)`; it is 1 for an
//! isometry. Over a chart whose UV area equals its 3D area, the area-weighted
//! mean of the squared face stretch is at least 1.
//!
//! Public values are normalized into `[0, 1)` by `1 - 1 / L2²`, so 0 means
//! no stretch and values approach 1 as stretch grows without bound.
//!
//! # References
//!
//! - Sander, P., Snyder, J., Gortler, S., & Hoppe, H. (2001). "Texture
//!   mapping progressive meshes." ACM SIGGRAPH.

use nalgebra::Point3;

use super::uv::UVMap;

/// Squared L2 stretch of one triangle.
///
/// Returns `f64::INFINITY` when the UV triangle is degenerate or flipped.
pub fn face_l2_squared(q: [Point3<f64>; 3], uv: &UVMap, face: [usize; 3]) -> f64 {
    let area_uv = uv.signed_triangle_area(face);
    if area_uv <= 1e-300 {
        return f64::INFINITY;
    }
    let [p1, p2, p3] = [uv.get(face[0]), uv.get(face[1]), uv.get(face[2])];
    let inv = 1.0 / (2.0 * area_uv);

    let ss = (q[0].coords * (p2.y - p3.y) + q[1].coords * (p3.y - p1.y) + q[2].coords * (p1.y - p2.y)) * inv;
    let st = (q[0].coords * (p3.x - p2.x) + q[1].coords * (p1.x - p3.x) + q[2].coords * (p2.x - p1.x)) * inv;

    0.5 * (ss.norm_squared() + st.norm_squared())
}

/// Map a squared L2 stretch into `[0, 1)`.
#[inline]
pub fn normalize(l2_squared: f64) -> f64 {
    if !l2_squared.is_finite() {
        return 1.0;
    }
    (1.0 - 1.0 / l2_squared.max(1.0)).clamp(0.0, 1.0)
}

/// Stretch summary of a parameterized chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartStretch {
    /// Area-weighted mean of the squared face stretch.
    pub l2_squared: f64,
    /// Largest normalized face stretch.
    pub max_face: f64,
    /// Total 3D area of the chart.
    pub area_3d: f64,
    /// Total signed UV area of the chart.
    pub area_uv: f64,
}

impl ChartStretch {
    /// Normalized chart stretch.
    #[inline]
    pub fn normalized(&self) -> f64 {
        normalize(self.l2_squared)
    }
}

/// Measure a chart's stretch, weighting each face by its 3D area.
///
/// The UV map should already be scaled so `area_uv == area_3d`; otherwise the
/// mean reflects the scale mismatch too. Faces with zero 3D area carry no
/// weight.
pub fn chart_stretch(positions: &[Point3<f64>], faces: &[[usize; 3]], uv: &UVMap) -> ChartStretch {
    let mut weighted = 0.0;
    let mut area_3d = 0.0;
    let mut max_face: f64 = 0.0;

    for &face in faces {
        let q = [positions[face[0]], positions[face[1]], positions[face[2]]];
        let a = 0.5 * (q[1] - q[0]).cross(&(q[2] - q[0])).norm();
        if a <= 1e-300 {
            continue;
        }
        let l2 = face_l2_squared(q, uv, face);
        weighted += l2 * a;
        area_3d += a;
        max_face = max_face.max(normalize(l2));
    }

    let l2_squared = if area_3d > 0.0 { weighted / area_3d } else { 1.0 };
    ChartStretch {
        l2_squared,
        max_face,
        area_3d,
        area_uv: uv.signed_area(faces),
    }
}

//! UV coordinate storage.
//!
//! This module provides the [`UVMap`] type for storing the 2D parameterization
//! of a chart, one coordinate per chart-local vertex, together with the rigid
//! and scaling transforms applied between flattening and packing.

use nalgebra::{Point2, Vector2};

/// UV coordinates for the vertices of a chart.
///
/// Index `i` holds the coordinate of chart-local vertex `i`. Coordinates are
/// in 3D units until packing maps them into texels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UVMap {
    /// UV coordinates indexed by local vertex.
    coords: Vec<Point2<f64>>,
}

impl UVMap {
    /// Create a new UV map with the given coordinates.
    pub fn new(coords: Vec<Point2<f64>>) -> Self {
        Self { coords }
    }

    /// Get the UV coordinates for a vertex.
    #[inline]
    pub fn get(&self, v: usize) -> Point2<f64> {
        self.coords[v]
    }

    /// Get the number of UV coordinates.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Compute the bounding box of the UV coordinates.
    ///
    /// Returns `None` if the UV map is empty.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = *self.coords.first()?;
        let mut min = first;
        let mut max = first;

        for uv in &self.coords {
            min.x = min.x.min(uv.x);
            min.y = min.y.min(uv.y);
            max.x = max.x.max(uv.x);
            max.y = max.y.max(uv.y);
        }

        Some((min, max))
    }

    /// Signed area of one triangle in UV space; positive when counter-clockwise.
    #[inline]
    pub fn signed_triangle_area(&self, face: [usize; 3]) -> f64 {
        let p0 = self.coords[face[0]];
        let p1 = self.coords[face[1]];
        let p2 = self.coords[face[2]];
        0.5 * ((p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y))
    }

    /// Sum of signed triangle areas.
    pub fn signed_area(&self, faces: &[[usize; 3]]) -> f64 {
        faces.iter().map(|&f| self.signed_triangle_area(f)).sum()
    }

    /// Reflect across the V axis (`u -> -u`), reversing orientation.
    pub fn mirror_u(&mut self) {
        for uv in &mut self.coords {
            uv.x = -uv.x;
        }
    }

    /// Scale uniformly about the origin.
    pub fn scale(&mut self, factor: f64) {
        for uv in &mut self.coords {
            uv.coords *= factor;
        }
    }

    /// Translate every coordinate.
    pub fn translate(&mut self, offset: Vector2<f64>) {
        for uv in &mut self.coords {
            *uv += offset;
        }
    }

    /// Rotate counter-clockwise about the origin.
    pub fn rotate(&mut self, angle: f64) {
        let (s, c) = angle.sin_cos();
        for uv in &mut self.coords {
            let (x, y) = (uv.x, uv.y);
            uv.x = c * x - s * y;
            uv.y = s * x + c * y;
        }
    }

    /// Rotate so the principal axis of the coordinates lies along U, then
    /// move the bounding box corner to the origin.
    pub fn align_principal_axis(&mut self) {
        let n = self.coords.len();
        if n == 0 {
            return;
        }
        let centroid = self.coords.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n as f64;
        let (mut cxx, mut cxy, mut cyy) = (0.0, 0.0, 0.0);
        for p in &self.coords {
            let d = p.coords - centroid;
            cxx += d.x * d.x;
            cxy += d.x * d.y;
            cyy += d.y * d.y;
        }
        let angle = 0.5 * (2.0 * cxy).atan2(cxx - cyy);
        self.rotate(-angle);

        if let Some((min, _)) = self.bounding_box() {
            self.translate(-min.coords);
        }
    }
}

//! Borrowed triangle-mesh view over flat buffers.

use nalgebra::{Point3, Vector3};

use super::index::{MeshIndex, UNUSED32};
use crate::error::{AtlasError, Result};

/// A triangle mesh as a vertex buffer plus a triangle-list index buffer.
///
/// The view borrows both buffers and never copies them. Construction does no
/// checking; [`TriMesh::check`] performs the structural validation that every
/// operation runs first.
#[derive(Debug, Clone, Copy)]
pub struct TriMesh<'a, I: MeshIndex = u32> {
    positions: &'a [Point3<f32>],
    indices: &'a [I],
}

impl<'a, I: MeshIndex> TriMesh<'a, I> {
    /// Wrap a vertex buffer and a triangle-list index buffer.
    pub fn new(positions: &'a [Point3<f32>], indices: &'a [I]) -> Self {
        Self { positions, indices }
    }

    /// Vertex positions.
    #[inline]
    pub fn positions(&self) -> &'a [Point3<f32>] {
        self.positions
    }

    /// Raw index buffer.
    #[inline]
    pub fn indices(&self) -> &'a [I] {
        self.indices
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles (complete triples only).
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.indices.len() / 3
    }

    /// The three raw indices of a face.
    #[inline]
    pub fn face_raw(&self, f: usize) -> [I; 3] {
        [self.indices[3 * f], self.indices[3 * f + 1], self.indices[3 * f + 2]]
    }

    /// The vertex indices of a face, or `None` if any corner is the unused sentinel.
    #[inline]
    pub fn face(&self, f: usize) -> Option<[usize; 3]> {
        let [a, b, c] = self.face_raw(f);
        if a.is_valid() && b.is_valid() && c.is_valid() {
            Some([a.to_usize(), b.to_usize(), c.to_usize()])
        } else {
            None
        }
    }

    /// Whether all three corners of a face carry the unused sentinel.
    #[inline]
    pub fn is_unused(&self, f: usize) -> bool {
        self.face_raw(f).iter().all(|i| !i.is_valid())
    }

    /// Position of a vertex in double precision.
    #[inline]
    pub fn position(&self, v: usize) -> Point3<f64> {
        self.positions[v].cast::<f64>()
    }

    /// Unnormalized face normal `(p1 - p0) x (p2 - p0)`; its length is twice the area.
    pub fn face_cross(&self, face: [usize; 3]) -> Vector3<f64> {
        let p0 = self.position(face[0]);
        let p1 = self.position(face[1]);
        let p2 = self.position(face[2]);
        (p1 - p0).cross(&(p2 - p0))
    }

    /// Structural checks shared by every operation.
    ///
    /// Requires at least one vertex and one face, an index count that is a
    /// multiple of three, and every non-sentinel index inside the vertex buffer.
    pub fn check(&self) -> Result<()> {
        if self.positions.is_empty() {
            return Err(AtlasError::invalid_input("vertex buffer is empty"));
        }
        if self.indices.is_empty() {
            return Err(AtlasError::invalid_input("index buffer is empty"));
        }
        if self.indices.len() % 3 != 0 {
            return Err(AtlasError::invalid_param(
                "indices.len()",
                self.indices.len(),
                "must be a multiple of 3",
            ));
        }
        if self.positions.len() >= u32::MAX as usize || self.num_faces() >= u32::MAX as usize {
            return Err(AtlasError::invalid_input("mesh exceeds 32-bit element counts"));
        }

        let n = self.positions.len();
        for (i, &index) in self.indices.iter().enumerate() {
            if index.is_valid() && index.to_usize() >= n {
                return Err(AtlasError::InvalidVertexIndex {
                    face: i / 3,
                    vertex: index.to_usize(),
                });
            }
        }
        Ok(())
    }

    /// Check that an adjacency table matches this mesh.
    pub fn check_adjacency(&self, adjacency: &[u32]) -> Result<()> {
        let nf = self.num_faces();
        if adjacency.len() != 3 * nf {
            return Err(AtlasError::invalid_param(
                "adjacency.len()",
                adjacency.len(),
                "must be three entries per face",
            ));
        }
        for (i, &g) in adjacency.iter().enumerate() {
            if g != UNUSED32 && g as usize >= nf {
                return Err(AtlasError::invalid_input(format!(
                    "adjacency entry {} of face {} references face {} (only {} faces)",
                    i % 3,
                    i / 3,
                    g,
                    nf
                )));
            }
        }
        Ok(())
    }
}

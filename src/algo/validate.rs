//! Mesh integrity checks.
//!
//! [`validate_mesh`] always performs structural checks (index counts, index
//! ranges, adjacency shape); those failures are returned as errors. The
//! optional checks selected by [`ValidateFlags`] never fail the call: each
//! problem found becomes a [`Diagnostic`] in the returned report.
//!
//! # Example
//!
//! ```
//! use isochart::algo::adjacency::build_adjacency;
//! use isochart::algo::validate::{validate_mesh, ValidateFlags};
//! use isochart::mesh::shapes;
//!
//! let cube = shapes::cube();
//! let adjacency = build_adjacency(&cube.mesh(), 0.0).unwrap().adjacency;
//!
//! let report = validate_mesh(&cube.mesh(), Some(&adjacency), ValidateFlags::all()).unwrap();
//! assert!(report.passed());
//! ```

use std::fmt;

use bitflags::bitflags;
use serde::Serialize;

use super::adjacency::DisjointSet;
use crate::error::{AtlasError, Result};
use crate::mesh::{FaceId, MeshIndex, TriMesh, VertexId, UNUSED32};

bitflags! {
    /// Optional checks run by [`validate_mesh`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ValidateFlags: u32 {
        /// Neighbouring triangles wound inconsistently, or stacked back to back.
        const BACKFACING = 0x1;
        /// Vertices shared by more than one fan of triangles.
        const BOWTIES = 0x2;
        /// Triangles with a repeated index or zero area.
        const DEGENERATE = 0x4;
        /// Misuse of the unused-triangle sentinel.
        const UNUSED = 0x8;
        /// Adjacency entries that are not reciprocated.
        const ASYMMETRIC_ADJ = 0x10;
    }
}

impl ValidateFlags {
    /// Structural checks only.
    pub const DEFAULT: Self = Self::empty();

    /// Checks that read the adjacency table.
    pub const NEEDS_ADJACENCY: Self = Self::BACKFACING.union(Self::BOWTIES).union(Self::ASYMMETRIC_ADJ);
}

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// Repeated index or zero-area triangle.
    Degenerate,
    /// Inconsistent use of the unused-triangle sentinel.
    Unused,
    /// Adjacency entry without a reciprocal entry.
    AsymmetricAdjacency,
    /// Inconsistent winding between neighbours.
    Backfacing,
    /// Vertex shared by disconnected triangle fans.
    Bowtie,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// What was found.
    pub kind: DiagnosticKind,
    /// Offending triangle.
    pub face: FaceId,
    /// Offending vertex, when the finding is about one.
    pub vertex: Option<VertexId>,
    /// Human-readable description naming the indices involved.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Findings of [`validate_mesh`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Every finding, grouped by check.
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// `true` if no check found anything.
    pub fn passed(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Messages of all findings, in order.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    /// Number of findings of one kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    fn push(&mut self, kind: DiagnosticKind, face: usize, vertex: Option<usize>, message: String) {
        self.diagnostics.push(Diagnostic {
            kind,
            face: FaceId::new(face),
            vertex: vertex.map(VertexId::new),
            message,
        });
    }
}

/// Validate a mesh and, optionally, its adjacency table.
///
/// # Arguments
///
/// * `mesh` - Triangle list
/// * `adjacency` - Adjacency table from [`build_adjacency`](super::adjacency::build_adjacency);
///   required by `BACKFACING`, `BOWTIES` and `ASYMMETRIC_ADJ`
/// * `flags` - Which optional checks to run
///
/// # Returns
///
/// A [`ValidationReport`]. The mesh and adjacency are never modified.
///
/// # Errors
///
/// Returns [`AtlasError::InvalidInput`] (or one of its structural variants) if
/// the buffers are malformed, or if a check that needs adjacency was requested
/// without it.
pub fn validate_mesh<I: MeshIndex>(
    mesh: &TriMesh<'_, I>,
    adjacency: Option<&[u32]>,
    flags: ValidateFlags,
) -> Result<ValidationReport> {
    mesh.check()?;
    if let Some(adj) = adjacency {
        mesh.check_adjacency(adj)?;
    }

    let mut report = ValidationReport::default();

    if flags.contains(ValidateFlags::DEGENERATE) {
        check_degenerate(mesh, &mut report);
    }
    if flags.contains(ValidateFlags::UNUSED) {
        check_unused(mesh, adjacency, &mut report);
    }

    if flags.intersects(ValidateFlags::NEEDS_ADJACENCY) {
        let Some(adj) = adjacency else {
            return Err(AtlasError::invalid_input(format!(
                "{:?} requires an adjacency table",
                flags & ValidateFlags::NEEDS_ADJACENCY
            )));
        };
        if flags.contains(ValidateFlags::ASYMMETRIC_ADJ) {
            check_asymmetric(mesh, adj, &mut report);
        }
        if flags.contains(ValidateFlags::BACKFACING) {
            check_backfacing(mesh, adj, &mut report);
        }
        if flags.contains(ValidateFlags::BOWTIES) {
            check_bowties(mesh, adj, &mut report);
        }
    }

    log::debug!(
        "validate: {} faces, flags {:?}, {} finding(s)",
        mesh.num_faces(),
        flags,
        report.diagnostics.len()
    );
    Ok(report)
}

fn check_degenerate<I: MeshIndex>(mesh: &TriMesh<'_, I>, report: &mut ValidationReport) {
    for f in 0..mesh.num_faces() {
        let Some([a, b, c]) = mesh.face(f) else {
            continue;
        };
        let repeated = if a == b || a == c {
            Some(a)
        } else if b == c {
            Some(b)
        } else {
            None
        };
        if let Some(v) = repeated {
            report.push(
                DiagnosticKind::Degenerate,
                f,
                Some(v),
                format!("face {} is degenerate: vertex {} is repeated", f, v),
            );
        } else if mesh.face_cross([a, b, c]).norm_squared() <= 1e-20 {
            report.push(
                DiagnosticKind::Degenerate,
                f,
                None,
                format!("face {} has zero area ({}, {}, {})", f, a, b, c),
            );
        }
    }
}

fn check_unused<I: MeshIndex>(mesh: &TriMesh<'_, I>, adjacency: Option<&[u32]>, report: &mut ValidationReport) {
    for f in 0..mesh.num_faces() {
        let unused = mesh.is_unused(f);
        if !unused && mesh.face(f).is_none() {
            report.push(
                DiagnosticKind::Unused,
                f,
                None,
                format!("face {} is only partially marked unused", f),
            );
            continue;
        }
        let Some(adj) = adjacency else {
            continue;
        };
        for e in 0..3 {
            let g = adj[3 * f + e];
            if g == UNUSED32 {
                continue;
            }
            if unused {
                report.push(
                    DiagnosticKind::Unused,
                    f,
                    None,
                    format!("unused face {} has neighbour {} across edge {}", f, g, e),
                );
            } else if mesh.is_unused(g as usize) {
                report.push(
                    DiagnosticKind::Unused,
                    f,
                    None,
                    format!("face {} references unused face {} across edge {}", f, g, e),
                );
            }
        }
    }
}

fn check_asymmetric<I: MeshIndex>(mesh: &TriMesh<'_, I>, adj: &[u32], report: &mut ValidationReport) {
    for f in 0..mesh.num_faces() {
        for e in 0..3 {
            let g = adj[3 * f + e];
            if g == UNUSED32 {
                continue;
            }
            let back = &adj[3 * g as usize..3 * g as usize + 3];
            if !back.contains(&(f as u32)) {
                report.push(
                    DiagnosticKind::AsymmetricAdjacency,
                    f,
                    None,
                    format!("face {} lists neighbour {} across edge {} but not vice versa", f, g, e),
                );
            }
        }
    }
}

fn check_backfacing<I: MeshIndex>(mesh: &TriMesh<'_, I>, adj: &[u32], report: &mut ValidationReport) {
    for f in 0..mesh.num_faces() {
        let Some(face) = mesh.face(f) else {
            continue;
        };
        let row = &adj[3 * f..3 * f + 3];

        for e in 0..3 {
            let g = row[e];
            if g == UNUSED32 {
                continue;
            }
            if row[..e].contains(&g) {
                report.push(
                    DiagnosticKind::Backfacing,
                    f,
                    None,
                    format!("face {} lists neighbour {} across more than one edge", f, g),
                );
                continue;
            }
            // Each adjacent pair is examined once, from the lower face.
            if (g as usize) < f {
                continue;
            }
            let Some(other) = mesh.face(g as usize) else {
                continue;
            };

            let mut same_set = face;
            let mut other_set = other;
            same_set.sort_unstable();
            other_set.sort_unstable();
            if same_set == other_set {
                report.push(
                    DiagnosticKind::Backfacing,
                    f,
                    None,
                    format!("faces {} and {} share all three vertices", f, g),
                );
                continue;
            }

            let (a, b) = (face[e], face[(e + 1) % 3]);
            let same_direction = (0..3).any(|k| other[k] == a && other[(k + 1) % 3] == b);
            if same_direction {
                report.push(
                    DiagnosticKind::Backfacing,
                    f,
                    Some(a),
                    format!(
                        "faces {} and {} traverse edge ({}, {}) in the same direction",
                        f, g, a, b
                    ),
                );
            }
        }
    }
}

fn check_bowties<I: MeshIndex>(mesh: &TriMesh<'_, I>, adj: &[u32], report: &mut ValidationReport) {
    let nv = mesh.num_vertices();
    let nf = mesh.num_faces();

    // Vertex -> incident faces, compressed.
    let mut offsets = vec![0u32; nv + 1];
    for f in 0..nf {
        if let Some(face) = mesh.face(f) {
            for v in face {
                offsets[v + 1] += 1;
            }
        }
    }
    for v in 0..nv {
        offsets[v + 1] += offsets[v];
    }
    let mut incident = vec![0u32; offsets[nv] as usize];
    let mut fill = offsets.clone();
    for f in 0..nf {
        if let Some(face) = mesh.face(f) {
            for v in face {
                incident[fill[v] as usize] = f as u32;
                fill[v] += 1;
            }
        }
    }

    for v in 0..nv {
        let fan = &incident[offsets[v] as usize..offsets[v + 1] as usize];
        if fan.len() < 2 {
            continue;
        }
        let mut sets = DisjointSet::new(fan.len());
        for (i, &f) in fan.iter().enumerate() {
            let Some(face) = mesh.face(f as usize) else {
                continue;
            };
            for e in 0..3 {
                if face[e] != v && face[(e + 1) % 3] != v {
                    continue;
                }
                let g = adj[3 * f as usize + e];
                if g == UNUSED32 {
                    continue;
                }
                if let Some(j) = fan.iter().position(|&h| h == g) {
                    sets.union(i as u32, j as u32);
                }
            }
        }
        let roots = sets.into_roots();
        let fans = roots.iter().enumerate().filter(|&(i, &r)| r as usize == i).count();
        if fans > 1 {
            report.push(
                DiagnosticKind::Bowtie,
                fan[0] as usize,
                Some(v),
                format!("vertex {} is a bowtie joining {} separate fans", v, fans),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::adjacency::build_adjacency;
    use crate::mesh::shapes;
    use nalgebra::Point3;

    #[test]
    fn test_clean_cube() {
        let cube = shapes::cube();
        let adjacency = build_adjacency(&cube.mesh(), 0.0).unwrap().adjacency;
        let report = validate_mesh(&cube.mesh(), Some(&adjacency), ValidateFlags::all()).unwrap();
        assert!(report.passed(), "{:?}", report.messages());
    }

    #[test]
    fn test_default_flags_only_structural() {
        let cube = shapes::cube();
        let report = validate_mesh(&cube.mesh(), None, ValidateFlags::DEFAULT).unwrap();
        assert!(report.passed());
    }

    #[test]
    fn test_adjacency_required() {
        let cube = shapes::cube();
        assert!(matches!(
            validate_mesh(&cube.mesh(), None, ValidateFlags::BOWTIES),
            Err(AtlasError::InvalidInput(_))
        ));
        assert!(validate_mesh(&cube.mesh(), Some(&[0, 1]), ValidateFlags::DEFAULT).is_err());
    }

    #[test]
    fn test_degenerate() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let indices = [0u32, 1, 3, 0, 0, 1, 0, 1, 2];
        let report =
            validate_mesh(&TriMesh::new(&positions, &indices), None, ValidateFlags::DEGENERATE).unwrap();
        assert_eq!(report.count(DiagnosticKind::Degenerate), 2);
        assert_eq!(report.diagnostics[0].face, FaceId::new(1));
        assert_eq!(report.diagnostics[0].vertex, Some(VertexId::new(0)));
        assert_eq!(report.diagnostics[1].face, FaceId::new(2));
    }

    #[test]
    fn test_non_manifold_is_asymmetric() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        let indices = [0u32, 1, 2, 1, 0, 3, 0, 1, 4];
        let mesh = TriMesh::new(&positions, &indices);
        let adjacency = build_adjacency(&mesh, 0.0).unwrap().adjacency;
        let report = validate_mesh(&mesh, Some(&adjacency), ValidateFlags::ASYMMETRIC_ADJ).unwrap();
        assert_eq!(report.count(DiagnosticKind::AsymmetricAdjacency), 1);
        assert_eq!(report.diagnostics[0].face, FaceId::new(2));
        assert!(report.messages()[0].contains("face 2"));
    }

    #[test]
    fn test_bowtie() {
        // Two triangles touching only at vertex 0.
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(-1.0, -1.0, 0.0),
        ];
        let indices = [0u32, 1, 2, 0, 3, 4];
        let mesh = TriMesh::new(&positions, &indices);
        let adjacency = build_adjacency(&mesh, 0.0).unwrap().adjacency;
        let report = validate_mesh(&mesh, Some(&adjacency), ValidateFlags::BOWTIES).unwrap();
        assert_eq!(report.count(DiagnosticKind::Bowtie), 1);
        assert_eq!(report.diagnostics[0].vertex, Some(VertexId::new(0)));
    }

    #[test]
    fn test_flipped_neighbour_is_backfacing() {
        let grid = shapes::grid(1, 1, 1.0, 1.0);
        let mut indices = grid.indices.clone();
        indices.swap(4, 5);
        let mesh = TriMesh::new(&grid.positions, &indices);
        let adjacency = build_adjacency(&mesh, 0.0).unwrap().adjacency;
        let report = validate_mesh(&mesh, Some(&adjacency), ValidateFlags::BACKFACING).unwrap();
        assert_eq!(report.count(DiagnosticKind::Backfacing), 1);
    }

    #[test]
    fn test_unused_sentinel_misuse() {
        let grid = shapes::grid(1, 1, 1.0, 1.0);
        let mut indices = grid.indices.clone();
        indices.extend_from_slice(&[0, u32::MAX, u32::MAX]);
        indices.extend_from_slice(&[u32::MAX; 3]);
        let mesh = TriMesh::new(&grid.positions, &indices);
        let mut adjacency = build_adjacency(&mesh, 0.0).unwrap().adjacency;
        adjacency[3 * 3] = 0;
        let report = validate_mesh(&mesh, Some(&adjacency), ValidateFlags::UNUSED).unwrap();
        assert_eq!(report.count(DiagnosticKind::Unused), 2);
    }
}

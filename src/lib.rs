//! # isochart
//!
//! UV texture atlas generation for triangle meshes.
//!
//! isochart works on borrowed, indexed triangle lists ([`TriMesh`]) with 16-
//! or 32-bit indices and provides:
//!
//! - **Adjacency**: vertex welding within an epsilon and per-edge face
//!   adjacency ([`build_adjacency`])
//! - **Normals**: per-vertex normals weighted by angle, area or equally
//!   ([`compute_normals`])
//! - **Validation**: degenerate, unused, asymmetric, backfacing and bowtie
//!   diagnostics ([`validate_mesh`])
//! - **Atlas generation**: isochart partitioning into low-stretch charts,
//!   packing and seam vertex duplication ([`build_atlas`])
//!
//! ## Quick Start
//!
//! ```
//! use isochart::prelude::*;
//! use isochart::mesh::shapes;
//!
//! let cube = shapes::cube();
//! let mesh = cube.mesh();
//!
//! // Weld the 24 exported corners and link faces across edges.
//! let adjacency = build_adjacency(&mesh, 0.0).unwrap();
//! assert_eq!(adjacency.adjacency.len(), 36);
//!
//! let report = validate_mesh(&mesh, Some(&adjacency.adjacency), ValidateFlags::DEFAULT).unwrap();
//! assert!(report.passed());
//!
//! let atlas = build_atlas(&mesh, &adjacency.adjacency, &AtlasOptions::default()).unwrap();
//! assert_eq!(atlas.face_partitioning.len(), 12);
//! for chart in &atlas.chart_stretch {
//!     assert!(*chart <= 0.16667 + 1e-4);
//! }
//! ```
//!
//! ## Cancellation
//!
//! ```
//! use isochart::prelude::*;
//! use isochart::mesh::shapes;
//!
//! let cube = shapes::cube();
//! let adjacency = build_adjacency(&cube.mesh(), 0.0).unwrap().adjacency;
//!
//! let progress = Progress::new(|_| ProgressStatus::Cancel);
//! let result = build_atlas_with_progress(&cube.mesh(), &adjacency, &AtlasOptions::default(), &progress);
//! assert_eq!(result.unwrap_err(), AtlasError::Cancelled);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

pub use algo::adjacency::{build_adjacency, generate_point_reps, AdjacencyResult};
pub use algo::atlas::{
    build_atlas, build_atlas_with_progress, partition, partition_with_progress, AtlasFlags, AtlasOptions, AtlasResult,
    AtlasVertex, ChartRect, PackOptions, Partition,
};
pub use algo::normals::{compute_normals, NormalFlags};
pub use algo::validate::{validate_mesh, Diagnostic, DiagnosticKind, ValidateFlags, ValidationReport};
pub use algo::{CancelToken, Progress, ProgressStatus};
pub use error::{AtlasError, ErrorKind, Result};
pub use mesh::{FaceId, MeshIndex, TriMesh, VertexId, UNUSED32};

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use isochart::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::adjacency::{build_adjacency, AdjacencyResult};
    pub use crate::algo::atlas::{
        build_atlas, build_atlas_with_progress, partition, AtlasFlags, AtlasOptions, AtlasResult, PackOptions,
    };
    pub use crate::algo::normals::{compute_normals, NormalFlags};
    pub use crate::algo::validate::{validate_mesh, DiagnosticKind, ValidateFlags, ValidationReport};
    pub use crate::algo::{CancelToken, Progress, ProgressStatus};
    pub use crate::error::{AtlasError, Result};
    pub use crate::mesh::{MeshIndex, TriMesh, UNUSED32};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

//! Core mesh data structures.
//!
//! Every operation in this crate works on a borrowed triangle list: a slice of
//! positions plus a flat index buffer grouped in triples. No connectivity
//! structure is built ahead of time; the algorithms derive what they need
//! (point representatives, edge adjacency, chart-local topology) on demand.
//!
//! # Index Types
//!
//! - [`MeshIndex`] abstracts over `u16` and `u32` index buffers. The all-ones
//!   value of each width marks an unused triangle.
//! - [`VertexId`] and [`FaceId`] are typed `u32` indices used in diagnostics.
//! - [`UNUSED32`] is the boundary sentinel of adjacency tables.
//!
//! # Example
//!
//! ```
//! use isochart::mesh::TriMesh;
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let indices = vec![0u16, 1, 2];
//!
//! let mesh = TriMesh::new(&positions, &indices);
//! assert_eq!(mesh.num_faces(), 1);
//! assert!(mesh.check().is_ok());
//! ```

mod index;
pub mod shapes;
mod trimesh;

pub use index::{FaceId, MeshIndex, VertexId, UNUSED32};
pub use trimesh::TriMesh;

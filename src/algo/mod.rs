//! Mesh processing algorithms.
//!
//! - **Adjacency**: point representatives and per-edge face adjacency
//! - **Normals**: weighted per-vertex normals
//! - **Validation**: structural and topological diagnostics
//! - **Atlas**: chart partitioning, packing and seam remapping
//! - **Parameterization**: LSCM and L2 stretch metrics
//! - **Geodesics**: Dijkstra on the face dual graph
//!
//! Long-running operations accept a [`Progress`] for reporting and
//! cancellation.

pub mod adjacency;
pub mod atlas;
pub mod geodesic;
pub mod normals;
pub mod parameterize;
pub mod progress;
pub mod validate;

pub use progress::{CancelToken, Progress, ProgressStatus};

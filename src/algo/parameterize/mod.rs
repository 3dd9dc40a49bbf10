//! UV parameterization of individual charts.
//!
//! Parameterization maps a chart of the 3D surface to the plane. Charts must
//! be topological disks; the atlas builder cuts the surface into such charts
//! before calling in here.
//!
//! # Available Algorithms
//!
//! - [`lscm`]: Least Squares Conformal Maps - minimizes angle distortion
//! - [`stretch`]: L2 stretch of a parameterization, used to accept or split charts
//!
//! # Example
//!
//! ```
//! use isochart::algo::parameterize::{lscm, stretch, LSCMOptions};
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2], [0, 2, 3]];
//!
//! let uv = lscm(&positions, &faces, &LSCMOptions::default()).unwrap();
//! let s = stretch::chart_stretch(&positions, &faces, &uv);
//! assert!(s.normalized() < 1e-6);
//! ```
//!
//! # References
//!
//! - Lévy, B., Petitjean, S., Ray, N., & Maillot, J. (2002). "Least squares
//!   conformal maps for automatic texture atlas generation." ACM SIGGRAPH.

mod lscm;
mod sparse;
pub mod stretch;
mod uv;

pub use lscm::{lscm, LSCMOptions, PinnedVertex};
pub use sparse::{conjugate_gradient, CsrMatrix};
pub use uv::UVMap;

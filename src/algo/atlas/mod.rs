//! Isochart texture atlas generation.
//!
//! The builder cuts a mesh into charts that each flatten to a disk with low
//! stretch, packs the charts into a texture and duplicates vertices along the
//! seams:
//!
//! 1. Validate the input and options.
//! 2. Partition: split charts until each one flattens within the stretch
//!    limit, then merge neighbours back where the result still qualifies.
//! 3. Pack the chart bounding boxes into `width × height` texels.
//! 4. Remap: one output vertex per chart-local vertex.
//!
//! Stretch is the Sander L2 stretch normalized to `[0, 1)`, where 0 means an
//! isometric flattening.
//!
//! # Example
//!
//! ```
//! use isochart::algo::adjacency::build_adjacency;
//! use isochart::algo::atlas::{build_atlas, AtlasOptions};
//! use isochart::mesh::shapes;
//!
//! let cube = shapes::cube();
//! let adjacency = build_adjacency(&cube.mesh(), 0.0).unwrap().adjacency;
//! let options = AtlasOptions::default().with_size(256, 256);
//! let atlas = build_atlas(&cube.mesh(), &adjacency, &options).unwrap();
//!
//! assert!(atlas.chart_count >= 1);
//! assert_eq!(atlas.indices.len(), 36);
//! ```

mod chart;
mod pack;
mod partition;
mod remap;

pub use pack::ChartRect;

use bitflags::bitflags;
use log::{debug, warn};
use nalgebra::{Point2, Point3};

use self::chart::{Criteria, MeshContext};
use self::partition::{partition_charts, Chart, PartitionSettings};
use self::remap::RemapTable;
use crate::algo::geodesic::GeodesicMode;
use crate::algo::parameterize::stretch;
use crate::algo::progress::{Progress, ProgressTracker};
use crate::algo::validate::{validate_mesh, DiagnosticKind, ValidateFlags};
use crate::error::{AtlasError, Result};
use crate::mesh::{MeshIndex, TriMesh};

bitflags! {
    /// Atlas generation options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AtlasFlags: u32 {
        /// Centroid-to-centroid geodesic estimate (the default).
        const GEODESIC_FAST = 0x1;
        /// Geodesics through shared-edge midpoints, with relaxed split seeds.
        const GEODESIC_QUALITY = 0x2;
        /// Forced merges must also respect `max_stretch`.
        const LIMIT_MERGE_STRETCH = 0x4;
        /// Every face of a chart must respect `max_stretch`, not just the mean.
        const LIMIT_FACE_STRETCH = 0x8;
        /// Reject meshes with bowtie vertices instead of splitting them.
        const STRICT_MANIFOLD = 0x100;
    }
}

impl AtlasFlags {
    /// No flags: fast geodesics, stretch limits on chart means only.
    pub const DEFAULT: Self = Self::empty();
}

impl Default for AtlasFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Options for atlas generation.
#[derive(Debug, Clone, Copy)]
pub struct AtlasOptions {
    /// Upper bound on the number of charts; 0 means no limit.
    pub max_chart_count: usize,
    /// Largest normalized stretch a chart may have, in `[0, 1]`.
    pub max_stretch: f32,
    /// Texture width in texels.
    pub width: u32,
    /// Texture height in texels.
    pub height: u32,
    /// Minimum distance between charts, in texels.
    pub gutter: f32,
    /// Fraction of work between progress callbacks, in `[0, 1]`.
    pub callback_frequency: f32,
    /// Algorithm flags.
    pub flags: AtlasFlags,
    /// Whether to use parallel execution.
    pub parallel: bool,
}

impl Default for AtlasOptions {
    fn default() -> Self {
        Self {
            max_chart_count: 0,
            max_stretch: 0.16667,
            width: 512,
            height: 512,
            gutter: 2.0,
            callback_frequency: 0.0001,
            flags: AtlasFlags::DEFAULT,
            parallel: true,
        }
    }
}

impl AtlasOptions {
    /// Set the chart budget (0 = unlimited).
    pub fn with_max_chart_count(mut self, count: usize) -> Self {
        self.max_chart_count = count;
        self
    }

    /// Set the stretch limit.
    pub fn with_max_stretch(mut self, stretch: f32) -> Self {
        self.max_stretch = stretch;
        self
    }

    /// Set the texture size in texels.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the gutter in texels.
    pub fn with_gutter(mut self, gutter: f32) -> Self {
        self.gutter = gutter;
        self
    }

    /// Set the progress callback frequency.
    pub fn with_callback_frequency(mut self, frequency: f32) -> Self {
        self.callback_frequency = frequency;
        self
    }

    /// Set the algorithm flags.
    pub fn with_flags(mut self, flags: AtlasFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Disable parallel execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    fn check(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_stretch) {
            return Err(AtlasError::invalid_param("max_stretch", self.max_stretch, "must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.callback_frequency) {
            return Err(AtlasError::invalid_param(
                "callback_frequency",
                self.callback_frequency,
                "must be in [0, 1]",
            ));
        }
        if self.flags.contains(AtlasFlags::GEODESIC_FAST | AtlasFlags::GEODESIC_QUALITY) {
            return Err(AtlasError::invalid_param(
                "flags",
                format!("{:?}", self.flags),
                "GEODESIC_FAST and GEODESIC_QUALITY are exclusive",
            ));
        }
        self.pack_options().check()
    }

    fn pack_options(&self) -> PackOptions {
        PackOptions {
            width: self.width,
            height: self.height,
            gutter: self.gutter,
        }
    }

    fn partition_settings(&self) -> PartitionSettings {
        PartitionSettings {
            criteria: Criteria {
                max_stretch: self.max_stretch as f64,
                limit_face_stretch: self.flags.contains(AtlasFlags::LIMIT_FACE_STRETCH),
            },
            mode: if self.flags.contains(AtlasFlags::GEODESIC_QUALITY) {
                GeodesicMode::Quality
            } else {
                GeodesicMode::Fast
            },
            max_chart_count: self.max_chart_count,
            limit_merge_stretch: self.flags.contains(AtlasFlags::LIMIT_MERGE_STRETCH),
            parallel: self.parallel,
        }
    }
}

/// Texture layout for [`Partition::pack`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackOptions {
    /// Texture width in texels.
    pub width: u32,
    /// Texture height in texels.
    pub height: u32,
    /// Minimum distance between charts, in texels.
    pub gutter: f32,
}

impl Default for PackOptions {
    fn default() -> Self {
        AtlasOptions::default().pack_options()
    }
}

impl From<&AtlasOptions> for PackOptions {
    fn from(options: &AtlasOptions) -> Self {
        options.pack_options()
    }
}

impl PackOptions {
    fn check(&self) -> Result<()> {
        if self.width == 0 {
            return Err(AtlasError::invalid_param("width", self.width, "must be positive"));
        }
        if self.height == 0 {
            return Err(AtlasError::invalid_param("height", self.height, "must be positive"));
        }
        if !(self.gutter >= 0.0 && self.gutter.is_finite()) {
            return Err(AtlasError::invalid_param("gutter", self.gutter, "must be finite and non-negative"));
        }
        Ok(())
    }
}

/// One output vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasVertex {
    /// Position of the original vertex.
    pub position: Point3<f32>,
    /// Texture coordinate in `[0, 1]²`.
    pub uv: Point2<f32>,
}

/// A generated atlas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtlasResult {
    /// Output vertices; seam vertices appear once per chart.
    pub vertices: Vec<AtlasVertex>,
    /// Triangles over `vertices`, in input face order.
    pub indices: Vec<u32>,
    /// Chart of each face.
    pub face_partitioning: Vec<u32>,
    /// Original vertex index of each output vertex.
    pub vertex_remap: Vec<u32>,
    /// Area-weighted stretch of the whole atlas.
    pub stretch: f32,
    /// Number of charts.
    pub chart_count: u32,
    /// Stretch of each chart.
    pub chart_stretch: Vec<f32>,
    /// Packed rectangle of each chart, in texels.
    pub chart_rects: Vec<ChartRect>,
    /// Texture width in texels.
    pub width: u32,
    /// Texture height in texels.
    pub height: u32,
}

/// Charts of a mesh, flattened but not yet packed.
///
/// Packing is cheap compared to partitioning, so one partition can be packed
/// at several texture sizes.
#[derive(Debug, Clone)]
pub struct Partition {
    positions: Vec<Point3<f32>>,
    charts: Vec<Chart>,
    remap: RemapTable,
    stretch: f32,
}

impl Partition {
    fn new(ctx: &MeshContext, positions: &[Point3<f32>], charts: Vec<Chart>) -> Self {
        let remap = remap::build_remap(&ctx.faces, &charts);
        let (weighted, area) = charts.iter().fold((0.0, 0.0), |(w, a), c| {
            (w + c.param.stretch.l2_squared * c.param.stretch.area_3d, a + c.param.stretch.area_3d)
        });
        let l2_squared = if area > 0.0 { weighted / area } else { 1.0 };
        Self {
            positions: positions.to_vec(),
            charts,
            remap,
            stretch: stretch::normalize(l2_squared) as f32,
        }
    }

    /// Number of charts.
    pub fn chart_count(&self) -> u32 {
        self.charts.len() as u32
    }

    /// Area-weighted stretch over all charts.
    pub fn stretch(&self) -> f32 {
        self.stretch
    }

    /// Stretch of each chart.
    pub fn chart_stretch(&self) -> Vec<f32> {
        self.charts.iter().map(|c| c.param.stretch() as f32).collect()
    }

    /// Chart of each face.
    pub fn face_partitioning(&self) -> &[u32] {
        &self.remap.face_partitioning
    }

    /// Original vertex index of each output vertex.
    pub fn vertex_remap(&self) -> &[u32] {
        &self.remap.vertex_remap
    }

    /// Pack the charts into a texture.
    pub fn pack(&self, options: &PackOptions) -> Result<AtlasResult> {
        options.check()?;
        self.pack_tracked(options, None)
    }

    fn pack_tracked(&self, options: &PackOptions, mut tracker: Option<&mut ProgressTracker<'_>>) -> Result<AtlasResult> {
        let extents: Vec<(f64, f64)> = self.charts.iter().map(|c| c.param.extent()).collect();
        let placements = pack::pack_charts(&extents, options, tracker.as_deref_mut())?;

        if let Some(t) = tracker.as_deref_mut() {
            t.update(0.95)?;
        }
        let vertices = remap::assemble_vertices(
            &self.positions,
            &self.charts,
            &self.remap,
            &placements,
            options.width,
            options.height,
        );

        Ok(AtlasResult {
            vertices,
            indices: self.remap.indices.clone(),
            face_partitioning: self.remap.face_partitioning.clone(),
            vertex_remap: self.remap.vertex_remap.clone(),
            stretch: self.stretch,
            chart_count: self.chart_count(),
            chart_stretch: self.chart_stretch(),
            chart_rects: placements.iter().map(|p| p.rect).collect(),
            width: options.width,
            height: options.height,
        })
    }
}

/// Generate a UV atlas.
///
/// `adjacency` is the table from [`build_adjacency`](crate::algo::adjacency::build_adjacency).
///
/// # Errors
///
/// - `InvalidInput` / `InvalidParameter` for malformed buffers, unused faces
///   or out-of-range options
/// - `NonManifoldMesh` for asymmetric adjacency, or bowties under
///   [`AtlasFlags::STRICT_MANIFOLD`]
/// - `UnsolvableParameterization` when a chart cannot be flattened
/// - `PackingOverflow` when the charts do not fit
pub fn build_atlas<I: MeshIndex>(mesh: &TriMesh<'_, I>, adjacency: &[u32], options: &AtlasOptions) -> Result<AtlasResult> {
    build_atlas_with_progress(mesh, adjacency, options, &Progress::none())
}

/// Generate a UV atlas, reporting progress and honouring cancellation.
///
/// Returns [`AtlasError::Cancelled`] if the callback answers
/// [`Cancel`](crate::algo::progress::ProgressStatus::Cancel) or the cancel
/// token fires.
pub fn build_atlas_with_progress<I: MeshIndex>(
    mesh: &TriMesh<'_, I>,
    adjacency: &[u32],
    options: &AtlasOptions,
    progress: &Progress,
) -> Result<AtlasResult> {
    let mut tracker = ProgressTracker::new(progress, options.callback_frequency);
    let partition = run_partition(mesh, adjacency, options, &mut tracker)?;
    let result = partition.pack_tracked(&options.pack_options(), Some(&mut tracker))?;
    tracker.update(1.0)?;
    debug!(
        "atlas: {} charts, {} vertices, stretch {:.4}",
        result.chart_count,
        result.vertices.len(),
        result.stretch
    );
    Ok(result)
}

/// Partition a mesh into flattened charts without packing them.
pub fn partition<I: MeshIndex>(mesh: &TriMesh<'_, I>, adjacency: &[u32], options: &AtlasOptions) -> Result<Partition> {
    partition_with_progress(mesh, adjacency, options, &Progress::none())
}

/// [`partition`] with progress reporting and cancellation.
pub fn partition_with_progress<I: MeshIndex>(
    mesh: &TriMesh<'_, I>,
    adjacency: &[u32],
    options: &AtlasOptions,
    progress: &Progress,
) -> Result<Partition> {
    let mut tracker = ProgressTracker::new(progress, options.callback_frequency);
    let partition = run_partition(mesh, adjacency, options, &mut tracker)?;
    tracker.update(1.0)?;
    Ok(partition)
}

fn run_partition<I: MeshIndex>(
    mesh: &TriMesh<'_, I>,
    adjacency: &[u32],
    options: &AtlasOptions,
    tracker: &mut ProgressTracker<'_>,
) -> Result<Partition> {
    tracker.update(0.0)?;
    check_input(mesh, adjacency, options)?;
    tracker.update(0.05)?;

    let ctx = MeshContext::new(mesh, adjacency);
    let charts = partition_charts(&ctx, &options.partition_settings(), tracker)?;
    Ok(Partition::new(&ctx, mesh.positions(), charts))
}

fn check_input<I: MeshIndex>(mesh: &TriMesh<'_, I>, adjacency: &[u32], options: &AtlasOptions) -> Result<()> {
    options.check()?;
    mesh.check()?;
    if mesh.num_faces() == 0 {
        return Err(AtlasError::invalid_input("mesh has no faces"));
    }
    mesh.check_adjacency(adjacency)?;
    if let Some(f) = (0..mesh.num_faces()).find(|&f| mesh.face(f).is_none()) {
        return Err(AtlasError::invalid_input(format!(
            "face {} is unused; atlas generation needs every face",
            f
        )));
    }

    let strict = options.flags.contains(AtlasFlags::STRICT_MANIFOLD);
    let report = validate_mesh(mesh, Some(adjacency), ValidateFlags::ASYMMETRIC_ADJ | ValidateFlags::BOWTIES)?;
    if let Some(d) = report
        .diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::AsymmetricAdjacency || (strict && d.kind == DiagnosticKind::Bowtie))
    {
        return Err(AtlasError::NonManifoldMesh {
            details: d.message.clone(),
        });
    }
    let bowties = report.count(DiagnosticKind::Bowtie);
    if bowties > 0 {
        warn!("{} bowtie vertices will be split between charts", bowties);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::adjacency::build_adjacency;
    use crate::algo::progress::ProgressStatus;
    use crate::mesh::shapes::{self, Shape};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn adjacency(shape: &Shape) -> Vec<u32> {
        build_adjacency(&shape.mesh(), 0.0).unwrap().adjacency
    }

    fn assert_well_formed(shape: &Shape, atlas: &AtlasResult, max_stretch: f32) {
        assert!(atlas.chart_count >= 1);
        assert_eq!(atlas.indices.len(), shape.indices.len());
        assert_eq!(atlas.face_partitioning.len(), shape.num_faces());
        assert_eq!(atlas.vertex_remap.len(), atlas.vertices.len());
        assert!(atlas.indices.iter().all(|&i| (i as usize) < atlas.vertices.len()));
        assert!(atlas.face_partitioning.iter().all(|&c| c < atlas.chart_count));
        for (k, &out) in atlas.indices.iter().enumerate() {
            let original = atlas.vertex_remap[out as usize];
            assert_eq!(shape.positions[original as usize], shape.positions[shape.indices[k] as usize]);
        }
        for s in &atlas.chart_stretch {
            assert!(*s <= max_stretch + 1e-4, "chart stretch {} > {}", s, max_stretch);
        }
        for v in &atlas.vertices {
            assert!((0.0..=1.0).contains(&v.uv.x) && (0.0..=1.0).contains(&v.uv.y));
        }
    }

    fn assert_gutters(atlas: &AtlasResult, gutter: f32) {
        for (i, a) in atlas.chart_rects.iter().enumerate() {
            assert!(a.x >= gutter - 1e-3 && a.y >= gutter - 1e-3);
            for b in &atlas.chart_rects[i + 1..] {
                assert!(a.gap(b) >= gutter - 1e-3);
            }
        }
    }

    #[test]
    fn test_cube_atlas() {
        let cube = shapes::cube();
        let options = AtlasOptions::default();
        let atlas = build_atlas(&cube.mesh(), &adjacency(&cube), &options).unwrap();

        assert_well_formed(&cube, &atlas, options.max_stretch);
        assert_gutters(&atlas, options.gutter);
        assert_eq!(atlas.chart_rects.len(), atlas.chart_count as usize);
        assert!(atlas.chart_count >= 2);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let cube = shapes::cube();
        let adj = adjacency(&cube);
        let parallel = build_atlas(&cube.mesh(), &adj, &AtlasOptions::default()).unwrap();
        let sequential = build_atlas(&cube.mesh(), &adj, &AtlasOptions::default().sequential()).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_flat_grid_single_chart() {
        let grid = shapes::grid(8, 4, 2.0, 1.0);
        let atlas = build_atlas(&grid.mesh(), &adjacency(&grid), &AtlasOptions::default()).unwrap();
        assert_eq!(atlas.chart_count, 1);
        assert_eq!(atlas.vertices.len(), grid.positions.len());
        assert!(atlas.stretch < 1e-4);
    }

    #[test]
    fn test_curved_shapes() {
        let options = AtlasOptions::default().with_flags(AtlasFlags::GEODESIC_QUALITY | AtlasFlags::LIMIT_FACE_STRETCH);
        for shape in [shapes::cylinder(16, 4, 1.0, 2.0), shapes::uv_sphere(16, 8, 1.0)] {
            let atlas = build_atlas(&shape.mesh(), &adjacency(&shape), &options).unwrap();
            assert_well_formed(&shape, &atlas, options.max_stretch);
            assert_gutters(&atlas, options.gutter);
        }
    }

    #[test]
    fn test_chart_budget() {
        let cube = shapes::cube();
        let adj = adjacency(&cube);
        let free = build_atlas(&cube.mesh(), &adj, &AtlasOptions::default().with_max_stretch(0.0)).unwrap();
        let limited = AtlasOptions::default().with_max_stretch(0.0).with_max_chart_count(3);
        let merged = build_atlas(&cube.mesh(), &adj, &limited).unwrap();
        assert!(merged.chart_count < free.chart_count);

        // Merges bounded by the stretch limit cannot go below the flat sides.
        let bounded = limited.with_flags(AtlasFlags::LIMIT_MERGE_STRETCH);
        let kept = build_atlas(&cube.mesh(), &adj, &bounded).unwrap();
        assert_eq!(kept.chart_count, free.chart_count);
    }

    #[test]
    fn test_cancel_on_first_callback() {
        let cube = shapes::cube();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let progress = Progress::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            ProgressStatus::Cancel
        });
        let err = build_atlas_with_progress(&cube.mesh(), &adjacency(&cube), &AtlasOptions::default(), &progress)
            .unwrap_err();
        assert_eq!(err, AtlasError::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let cube = shapes::cube();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = Progress::new(move |f| {
            sink.lock().unwrap().push(f);
            ProgressStatus::Continue
        });
        let options = AtlasOptions::default().with_callback_frequency(0.0);
        build_atlas_with_progress(&cube.mesh(), &adjacency(&cube), &options, &progress).unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[test]
    fn test_packing_overflow() {
        let cube = shapes::cube();
        let options = AtlasOptions::default().with_size(8, 8).with_gutter(4.0);
        let err = build_atlas(&cube.mesh(), &adjacency(&cube), &options).unwrap_err();
        assert!(matches!(err, AtlasError::PackingOverflow { width: 8, height: 8, .. }));
    }

    #[test]
    fn test_repack_too_small_is_overflow() {
        let cube = shapes::cube();
        let part = partition(&cube.mesh(), &adjacency(&cube), &AtlasOptions::default()).unwrap();
        for (width, height) in [(8, 6), (6, 8), (14, 4), (6, 6)] {
            let err = part.pack(&PackOptions { width, height, gutter: 2.0 }).unwrap_err();
            assert!(matches!(err, AtlasError::PackingOverflow { .. }), "{}x{}: {:?}", width, height, err);
        }
    }

    #[test]
    fn test_repack_partition() {
        let sphere = shapes::uv_sphere(12, 6, 1.0);
        let part = partition(&sphere.mesh(), &adjacency(&sphere), &AtlasOptions::default()).unwrap();
        let small = part.pack(&PackOptions { width: 64, height: 64, gutter: 1.0 }).unwrap();
        let large = part.pack(&PackOptions { width: 1024, height: 512, gutter: 4.0 }).unwrap();

        assert_eq!(small.chart_count, part.chart_count());
        assert_eq!(small.indices, large.indices);
        assert_eq!(small.face_partitioning, part.face_partitioning());
        assert_gutters(&large, 4.0);
        let area = |r: &ChartRect| r.width * r.height;
        assert!(area(&large.chart_rects[0]) > area(&small.chart_rects[0]));
    }

    #[test]
    fn test_invalid_options() {
        let cube = shapes::cube();
        let adj = adjacency(&cube);
        let bad = [
            AtlasOptions::default().with_max_stretch(1.5),
            AtlasOptions::default().with_size(0, 512),
            AtlasOptions::default().with_gutter(-1.0),
            AtlasOptions::default().with_callback_frequency(2.0),
            AtlasOptions::default().with_flags(AtlasFlags::GEODESIC_FAST | AtlasFlags::GEODESIC_QUALITY),
        ];
        for options in bad {
            let err = build_atlas(&cube.mesh(), &adj, &options).unwrap_err();
            assert!(matches!(err, AtlasError::InvalidParameter { .. }), "{:?}", err);
        }
        assert!(build_atlas(&cube.mesh(), &adj[..3], &AtlasOptions::default()).is_err());
    }

    #[test]
    fn test_unused_face_rejected() {
        let cube = shapes::cube();
        let mut indices = cube.indices.clone();
        indices[0..3].fill(u32::MAX);
        let mesh = TriMesh::new(&cube.positions, &indices);
        let adj = build_adjacency(&mesh, 0.0).unwrap().adjacency;
        let err = build_atlas(&mesh, &adj, &AtlasOptions::default()).unwrap_err();
        assert!(matches!(err, AtlasError::InvalidInput(_)));
    }

    #[test]
    fn test_non_manifold_edge_rejected() {
        // Three triangles on one edge.
        let positions = vec![
            Point3::new(0.0f32, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        let indices = [0u32, 1, 2, 1, 0, 3, 0, 1, 4];
        let mesh = TriMesh::new(&positions, &indices);
        let adj = build_adjacency(&mesh, 0.0).unwrap().adjacency;
        let err = build_atlas(&mesh, &adj, &AtlasOptions::default()).unwrap_err();
        assert!(matches!(err, AtlasError::NonManifoldMesh { .. }));
    }

    #[test]
    fn test_bowtie_policy() {
        let positions = vec![
            Point3::new(0.0f32, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(-1.0, -1.0, 0.0),
        ];
        let indices = [0u32, 1, 2, 0, 3, 4];
        let mesh = TriMesh::new(&positions, &indices);
        let adj = build_adjacency(&mesh, 0.0).unwrap().adjacency;

        let atlas = build_atlas(&mesh, &adj, &AtlasOptions::default()).unwrap();
        assert_eq!(atlas.chart_count, 2);
        assert_eq!(atlas.vertices.len(), 6);

        let strict = AtlasOptions::default().with_flags(AtlasFlags::STRICT_MANIFOLD);
        let err = build_atlas(&mesh, &adj, &strict).unwrap_err();
        assert!(matches!(err, AtlasError::NonManifoldMesh { .. }));
    }

    #[test]
    fn test_u16_indices() {
        let cube = shapes::cube();
        let indices: Vec<u16> = cube.indices.iter().map(|&i| i as u16).collect();
        let mesh = TriMesh::new(&cube.positions, &indices);
        let adj = build_adjacency(&mesh, 0.0).unwrap().adjacency;
        let atlas = build_atlas(&mesh, &adj, &AtlasOptions::default()).unwrap();
        assert_well_formed(&cube, &atlas, 0.16667);
    }
}

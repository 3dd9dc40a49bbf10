//! Chart topology and flattening.
//!
//! A chart is a set of triangles. Its local vertices are clusters of face
//! corners joined across adjacency edges inside the chart, so vertices welded
//! by the adjacency builder become one local vertex while a bowtie vertex, whose
//! fans share no edge, stays split.

use std::collections::HashMap;

use nalgebra::{Point2, Point3, Vector3};

use crate::algo::adjacency::DisjointSet;
use crate::algo::parameterize::stretch::{chart_stretch, ChartStretch};
use crate::algo::parameterize::{lscm, LSCMOptions, UVMap};
use crate::mesh::{MeshIndex, TriMesh, UNUSED32};

/// Geometry and adjacency of the whole mesh in double precision.
#[derive(Debug, Clone)]
pub(crate) struct MeshContext {
    pub positions: Vec<Point3<f64>>,
    pub faces: Vec<[u32; 3]>,
    pub adjacency: Vec<u32>,
    pub normals: Vec<Vector3<f64>>,
    pub areas: Vec<f64>,
    pub centroids: Vec<Point3<f64>>,
}

impl MeshContext {
    /// Copy a mesh whose faces are all in use.
    pub fn new<I: MeshIndex>(mesh: &TriMesh<'_, I>, adjacency: &[u32]) -> Self {
        let positions: Vec<Point3<f64>> = mesh.positions().iter().map(|p| p.cast::<f64>()).collect();
        let faces: Vec<[u32; 3]> = (0..mesh.num_faces())
            .map(|f| {
                mesh.face(f)
                    .map(|[a, b, c]| [a as u32, b as u32, c as u32])
                    .unwrap_or([0, 0, 0])
            })
            .collect();

        let mut normals = Vec::with_capacity(faces.len());
        let mut areas = Vec::with_capacity(faces.len());
        let mut centroids = Vec::with_capacity(faces.len());
        for face in &faces {
            let [p0, p1, p2] = face.map(|v| positions[v as usize]);
            let cross = (p1 - p0).cross(&(p2 - p0));
            let len = cross.norm();
            areas.push(0.5 * len);
            normals.push(if len > 1e-300 { cross / len } else { Vector3::zeros() });
            centroids.push(Point3::from((p0.coords + p1.coords + p2.coords) / 3.0));
        }

        Self {
            positions,
            faces,
            adjacency: adjacency.to_vec(),
            normals,
            areas,
            centroids,
        }
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn neighbor(&self, face: u32, edge: usize) -> Option<u32> {
        let g = self.adjacency[3 * face as usize + edge];
        (g != UNUSED32).then_some(g)
    }

    /// Endpoints of edge `edge` of `face`.
    #[inline]
    pub fn edge_points(&self, face: u32, edge: usize) -> (Point3<f64>, Point3<f64>) {
        let f = self.faces[face as usize];
        (
            self.positions[f[edge] as usize],
            self.positions[f[(edge + 1) % 3] as usize],
        )
    }

    /// Edge of `other` whose adjacency entry points back at `face`, matched by
    /// endpoint positions when several do.
    ///
    /// Returns the edge index and whether the endpoints pair up in the same
    /// direction (inconsistent winding).
    pub fn shared_edge(&self, face: u32, edge: usize, other: u32) -> Option<(usize, bool)> {
        let (p0, p1) = self.edge_points(face, edge);
        let mut best: Option<(f64, usize, bool)> = None;
        for k in 0..3 {
            if self.adjacency[3 * other as usize + k] != face {
                continue;
            }
            let (q0, q1) = self.edge_points(other, k);
            let opposite = (p0 - q1).norm() + (p1 - q0).norm();
            let same = (p0 - q0).norm() + (p1 - q1).norm();
            let candidate = if same < opposite {
                (same, k, true)
            } else {
                (opposite, k, false)
            };
            if best.map_or(true, |b| candidate.0 < b.0) {
                best = Some(candidate);
            }
        }
        best.map(|(_, k, same)| (k, same))
    }
}

/// Local mesh of one chart.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChartTopology {
    /// Triangles over local vertices, in chart face order.
    pub faces: Vec<[usize; 3]>,
    /// Original vertex index of each local vertex (first corner seen).
    pub sources: Vec<u32>,
}

impl ChartTopology {
    /// Cluster the corners of `chart` (sorted global face ids).
    pub fn build(ctx: &MeshContext, chart: &[u32]) -> Self {
        let k = chart.len();
        let mut corners = DisjointSet::new(3 * k);

        for (fi, &f) in chart.iter().enumerate() {
            for e in 0..3 {
                let Some(g) = ctx.neighbor(f, e) else {
                    continue;
                };
                let Ok(gi) = chart.binary_search(&g) else {
                    continue;
                };
                if gi == fi {
                    continue;
                }
                let Some((ke, same)) = ctx.shared_edge(f, e, g) else {
                    continue;
                };
                let (a0, a1) = (3 * fi + e, 3 * fi + (e + 1) % 3);
                let (b0, b1) = (3 * gi + ke, 3 * gi + (ke + 1) % 3);
                if same {
                    corners.union(a0 as u32, b0 as u32);
                    corners.union(a1 as u32, b1 as u32);
                } else {
                    corners.union(a0 as u32, b1 as u32);
                    corners.union(a1 as u32, b0 as u32);
                }
            }
        }

        let roots = corners.into_roots();
        let mut local_of_root: HashMap<u32, usize> = HashMap::new();
        let mut sources = Vec::new();
        let mut faces = Vec::with_capacity(k);
        for (fi, &f) in chart.iter().enumerate() {
            let mut local = [0usize; 3];
            for c in 0..3 {
                let root = roots[3 * fi + c];
                local[c] = *local_of_root.entry(root).or_insert_with(|| {
                    sources.push(ctx.faces[f as usize][c]);
                    sources.len() - 1
                });
            }
            faces.push(local);
        }

        Self { faces, sources }
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.sources.len()
    }

    /// Local edge multiplicities, keyed by sorted local vertex pair.
    fn edge_counts(&self) -> HashMap<(usize, usize), u32> {
        let mut counts: HashMap<(usize, usize), u32> = HashMap::new();
        for f in &self.faces {
            for e in 0..3 {
                let (a, b) = (f[e], f[(e + 1) % 3]);
                let key = if a < b { (a, b) } else { (b, a) };
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Boundary edges (used by exactly one face), sorted.
    pub fn boundary_edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .edge_counts()
            .into_iter()
            .filter(|(_, count)| *count == 1)
            .map(|(key, _)| key)
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Whether the chart is a topological disk: connected, edge-manifold,
    /// Euler characteristic 1, with a single simple boundary loop.
    pub fn is_disk(&self) -> bool {
        if self.faces.is_empty() {
            return false;
        }
        if self.faces.iter().any(|f| f[0] == f[1] || f[1] == f[2] || f[0] == f[2]) {
            return false;
        }

        let counts = self.edge_counts();
        if counts.values().any(|&count| count > 2) {
            return false;
        }

        let chi = self.num_vertices() as i64 - counts.len() as i64 + self.faces.len() as i64;
        if chi != 1 {
            return false;
        }

        // Connected across interior edges.
        let mut components = DisjointSet::new(self.faces.len());
        let mut first_face: HashMap<(usize, usize), usize> = HashMap::new();
        for (fi, f) in self.faces.iter().enumerate() {
            for e in 0..3 {
                let (a, b) = (f[e], f[(e + 1) % 3]);
                let key = if a < b { (a, b) } else { (b, a) };
                if let Some(&other) = first_face.get(&key) {
                    components.union(fi as u32, other as u32);
                } else {
                    first_face.insert(key, fi);
                }
            }
        }
        if components.into_roots().iter().any(|&r| r != 0) {
            return false;
        }

        let boundary = self.boundary_edges();
        if boundary.is_empty() {
            return false;
        }
        let mut ring: HashMap<usize, Vec<usize>> = HashMap::new();
        for &(a, b) in &boundary {
            ring.entry(a).or_default().push(b);
            ring.entry(b).or_default().push(a);
        }
        if ring.values().any(|n| n.len() != 2) {
            return false;
        }

        let start = boundary[0].0;
        let mut prev = start;
        let mut cur = boundary[0].1;
        let mut steps = 1;
        while cur != start {
            let next = match ring.get(&cur) {
                Some(n) if n[0] != prev => n[0],
                Some(n) => n[1],
                None => return false,
            };
            prev = cur;
            cur = next;
            steps += 1;
            if steps > boundary.len() {
                return false;
            }
        }
        steps == boundary.len()
    }
}

/// Why a chart could not be flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Defect {
    NotDisk,
    SolverFailed,
    Flipped,
    Overlapping,
}

/// A flattened chart: UVs in 3D units, principal axis along U, bounding box
/// at the origin.
#[derive(Debug, Clone)]
pub(crate) struct ChartParam {
    pub topology: ChartTopology,
    pub uv: UVMap,
    pub stretch: ChartStretch,
}

impl ChartParam {
    /// Normalized chart stretch.
    #[inline]
    pub fn stretch(&self) -> f64 {
        self.stretch.normalized()
    }

    /// Extent of the UV bounding box.
    pub fn extent(&self) -> (f64, f64) {
        self.uv
            .bounding_box()
            .map(|(min, max)| (max.x - min.x, max.y - min.y))
            .unwrap_or((0.0, 0.0))
    }
}

/// Stretch limits a chart must satisfy to be accepted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Criteria {
    pub max_stretch: f64,
    pub limit_face_stretch: bool,
}

impl Criteria {
    pub fn accepts(&self, param: &ChartParam) -> bool {
        // Solver noise on an isometric chart stays below this.
        let limit = self.max_stretch + 1e-7;
        param.stretch() <= limit && (!self.limit_face_stretch || param.stretch.max_face <= limit)
    }
}

/// Flatten a chart and check that the result is a valid embedding.
///
/// Single triangles are laid out exactly; larger charts must be disks and go
/// through LSCM. The UV map is scaled so its area matches the 3D area.
pub(crate) fn parameterize_chart(ctx: &MeshContext, chart: &[u32]) -> Result<ChartParam, Defect> {
    let topology = ChartTopology::build(ctx, chart);
    let positions: Vec<Point3<f64>> = topology
        .sources
        .iter()
        .map(|&v| ctx.positions[v as usize])
        .collect();

    let mut uv = if chart.len() == 1 {
        place_triangle(&positions, topology.faces[0])
    } else {
        if !topology.is_disk() {
            return Err(Defect::NotDisk);
        }
        lscm(&positions, &topology.faces, &LSCMOptions::default()).map_err(|_| Defect::SolverFailed)?
    };

    if chart.len() > 1 {
        if uv.signed_area(&topology.faces) < 0.0 {
            uv.mirror_u();
        }
        for (i, &face) in topology.faces.iter().enumerate() {
            if ctx.areas[chart[i] as usize] > 1e-20 && uv.signed_triangle_area(face) <= 0.0 {
                return Err(Defect::Flipped);
            }
        }

        let area_3d: f64 = chart.iter().map(|&f| ctx.areas[f as usize]).sum();
        let area_uv = uv.signed_area(&topology.faces);
        if area_uv <= 0.0 || !area_uv.is_finite() {
            return Err(Defect::Flipped);
        }
        if area_3d > 0.0 {
            uv.scale((area_3d / area_uv).sqrt());
        }

        if boundary_self_intersects(&uv, &topology.boundary_edges()) {
            return Err(Defect::Overlapping);
        }
    }

    uv.align_principal_axis();
    let stretch = chart_stretch(&positions, &topology.faces, &uv);
    Ok(ChartParam { topology, uv, stretch })
}

/// Lay one triangle out isometrically.
fn place_triangle(positions: &[Point3<f64>], face: [usize; 3]) -> UVMap {
    let mut coords = vec![Point2::origin(); positions.len()];
    let p0 = positions[face[0]];
    let e1 = positions[face[1]] - p0;
    let e2 = positions[face[2]] - p0;
    let len1 = e1.norm();

    coords[face[1]] = Point2::new(len1, 0.0);
    if len1 > 1e-300 {
        let x = e2.dot(&e1) / len1;
        let y = (e2.norm_squared() - x * x).max(0.0).sqrt();
        coords[face[2]] = Point2::new(x, y);
    } else {
        coords[face[2]] = Point2::new(0.0, e2.norm());
    }
    UVMap::new(coords)
}

/// Whether two boundary segments that share no endpoint cross.
///
/// Segments are bucketed on a uniform grid so only nearby pairs are tested.
pub(crate) fn boundary_self_intersects(uv: &UVMap, edges: &[(usize, usize)]) -> bool {
    let Some((min, max)) = uv.bounding_box() else {
        return false;
    };
    let extent = (max.x - min.x).max(max.y - min.y);
    if extent <= 0.0 {
        return false;
    }
    let eps = 1e-12 * extent * extent;

    let crosses = |i: usize, j: usize| {
        let (a, b) = edges[i];
        let (c, d) = edges[j];
        if a == c || a == d || b == c || b == d {
            return false;
        }
        let (p1, p2, q1, q2) = (uv.get(a), uv.get(b), uv.get(c), uv.get(d));
        let orient = |o: Point2<f64>, s: Point2<f64>, t: Point2<f64>| {
            (s.x - o.x) * (t.y - o.y) - (s.y - o.y) * (t.x - o.x)
        };
        let straddles = |u: f64, v: f64| (u > eps && v < -eps) || (u < -eps && v > eps);
        straddles(orient(p1, p2, q1), orient(p1, p2, q2)) && straddles(orient(q1, q2, p1), orient(q1, q2, p2))
    };

    let n = edges.len();
    if n < 32 {
        return (0..n).any(|i| (i + 1..n).any(|j| crosses(i, j)));
    }

    let cells = (n as f64).sqrt().ceil() as usize;
    let cell_size = extent / cells as f64;
    let cell_of = |x: f64, lo: f64| (((x - lo) / cell_size) as usize).min(cells - 1);
    let mut grid: Vec<Vec<usize>> = vec![Vec::new(); cells * cells];
    for (i, &(a, b)) in edges.iter().enumerate() {
        let (pa, pb) = (uv.get(a), uv.get(b));
        let (x0, x1) = (cell_of(pa.x.min(pb.x), min.x), cell_of(pa.x.max(pb.x), min.x));
        let (y0, y1) = (cell_of(pa.y.min(pb.y), min.y), cell_of(pa.y.max(pb.y), min.y));
        for y in y0..=y1 {
            for x in x0..=x1 {
                grid[y * cells + x].push(i);
            }
        }
    }

    grid.iter()
        .any(|bucket| (0..bucket.len()).any(|i| (i + 1..bucket.len()).any(|j| crosses(bucket[i], bucket[j]))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::adjacency::build_adjacency;
    use crate::mesh::shapes::{self, Shape};

    fn context(shape: &Shape) -> MeshContext {
        let adjacency = build_adjacency(&shape.mesh(), 0.0).unwrap().adjacency;
        MeshContext::new(&shape.mesh(), &adjacency)
    }

    fn all_faces(ctx: &MeshContext) -> Vec<u32> {
        (0..ctx.num_faces() as u32).collect()
    }

    #[test]
    fn test_cube_topology_welds_corners() {
        let cube = shapes::cube();
        let ctx = context(&cube);
        let topology = ChartTopology::build(&ctx, &all_faces(&ctx));

        // The 24 exported vertices collapse onto 8 corners; a closed cube is no disk.
        assert_eq!(topology.num_vertices(), 8);
        assert!(topology.boundary_edges().is_empty());
        assert!(!topology.is_disk());
    }

    #[test]
    fn test_open_box_is_disk() {
        let cube = shapes::cube();
        let ctx = context(&cube);
        // Drop the +z face (faces 0 and 1).
        let chart: Vec<u32> = (2..12).collect();
        let topology = ChartTopology::build(&ctx, &chart);
        assert!(topology.is_disk());
        assert_eq!(topology.boundary_edges().len(), 4);
    }

    #[test]
    fn test_cylinder_is_not_disk() {
        let cylinder = shapes::cylinder(8, 2, 1.0, 1.0);
        let ctx = context(&cylinder);
        let topology = ChartTopology::build(&ctx, &all_faces(&ctx));
        assert!(!topology.is_disk());
    }

    #[test]
    fn test_bowtie_vertex_splits() {
        let positions = vec![
            Point3::new(0.0f32, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(-1.0, -1.0, 0.0),
        ];
        let indices = [0u32, 1, 2, 0, 3, 4];
        let mesh = TriMesh::new(&positions, &indices);
        let adjacency = build_adjacency(&mesh, 0.0).unwrap().adjacency;
        let ctx = MeshContext::new(&mesh, &adjacency);

        let topology = ChartTopology::build(&ctx, &[0, 1]);
        assert_eq!(topology.num_vertices(), 6);
        assert_eq!(topology.sources.iter().filter(|&&v| v == 0).count(), 2);
        assert!(!topology.is_disk());
    }

    #[test]
    fn test_parameterize_flat_grid() {
        let grid = shapes::grid(4, 4, 2.0, 1.0);
        let ctx = context(&grid);
        let param = parameterize_chart(&ctx, &all_faces(&ctx)).unwrap();

        assert!(param.stretch() < 1e-6);
        assert!((param.stretch.area_uv - 2.0).abs() < 1e-6);
        let (w, h) = param.extent();
        assert!((w - 2.0).abs() < 1e-4 && (h - 1.0).abs() < 1e-4);
        let (min, _) = param.uv.bounding_box().unwrap();
        assert!(min.x.abs() < 1e-9 && min.y.abs() < 1e-9);
    }

    #[test]
    fn test_parameterize_single_face() {
        let cube = shapes::cube();
        let ctx = context(&cube);
        let param = parameterize_chart(&ctx, &[4]).unwrap();
        assert_eq!(param.topology.num_vertices(), 3);
        assert!(param.stretch() < 1e-9);
        assert!((param.stretch.area_uv - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_closed_chart_rejected() {
        let cube = shapes::cube();
        let ctx = context(&cube);
        assert_eq!(
            parameterize_chart(&ctx, &all_faces(&ctx)).err(),
            Some(Defect::NotDisk)
        );
    }

    #[test]
    fn test_open_box_stretch_is_bounded() {
        let cube = shapes::cube();
        let ctx = context(&cube);
        let chart: Vec<u32> = (2..12).collect();
        let param = parameterize_chart(&ctx, &chart).unwrap();
        assert!(param.stretch() > 0.0 && param.stretch() < 1.0);

        let strict = Criteria {
            max_stretch: 0.0,
            limit_face_stretch: false,
        };
        assert!(!strict.accepts(&param));
    }

    #[test]
    fn test_boundary_crossing() {
        let uv = UVMap::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 0.0),
        ]);
        assert!(boundary_self_intersects(&uv, &[(0, 1), (2, 3)]));
        assert!(!boundary_self_intersects(&uv, &[(0, 2), (1, 3)]));
        // Shared endpoints never count.
        assert!(!boundary_self_intersects(&uv, &[(0, 1), (1, 2)]));
    }
}

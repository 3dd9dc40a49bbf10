//! Chart partitioning.
//!
//! Starts from the connected components of the mesh, splits every chart that
//! cannot be flattened within the stretch limit, then merges neighbours back
//! together while the merged chart still qualifies.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use super::chart::{parameterize_chart, ChartParam, Criteria, Defect, MeshContext};
use crate::algo::geodesic::{dijkstra, dijkstra_multiple, DualGraph, GeodesicMode, GeodesicResult};
use crate::algo::progress::{CancelProbe, ProgressTracker};
use crate::error::{AtlasError, Result};

/// Split rounds a chart may go through before the build gives up.
pub(crate) const MAX_SPLIT_ROUNDS: usize = 64;

/// Lloyd relaxations of the split seeds in quality mode.
const LLOYD_ITERATIONS: usize = 2;

/// Extra weight of a dual edge crossing a crease, per unit of `1 - cos`.
const CREASE_PENALTY: f64 = 2.0;

/// Parameters of one partitioning run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PartitionSettings {
    pub criteria: Criteria,
    pub mode: GeodesicMode,
    pub max_chart_count: usize,
    pub limit_merge_stretch: bool,
    pub parallel: bool,
}

/// An accepted chart: sorted face ids and their flattening.
#[derive(Debug, Clone)]
pub(crate) struct Chart {
    pub faces: Vec<u32>,
    pub param: ChartParam,
}

enum Outcome {
    Accepted(ChartParam),
    Split(Vec<u32>, Vec<u32>),
    Failed,
}

/// Cut the mesh into accepted charts, ordered by their smallest face id.
pub(crate) fn partition_charts(
    ctx: &MeshContext,
    settings: &PartitionSettings,
    tracker: &mut ProgressTracker<'_>,
) -> Result<Vec<Chart>> {
    let num_faces = ctx.num_faces();
    let components = connected_components(ctx);
    debug!("partition: {} faces in {} components", num_faces, components.len());

    let mut pending: Vec<(Vec<u32>, usize)> = components.into_iter().map(|c| (c, 0)).collect();
    let mut charts = Vec::new();
    let mut accepted_faces = 0;
    tracker.update_stage(0.05, 0.7, 0, num_faces)?;

    let mut round = 0;
    while !pending.is_empty() {
        let probe = tracker.probe();
        let outcomes: Vec<Result<Outcome>> = if settings.parallel {
            pending
                .par_iter()
                .map(|(faces, _)| evaluate(ctx, faces, settings, &probe))
                .collect()
        } else {
            pending
                .iter()
                .map(|(faces, _)| evaluate(ctx, faces, settings, &probe))
                .collect()
        };

        let mut next = Vec::new();
        for ((faces, depth), outcome) in pending.into_iter().zip(outcomes) {
            match outcome? {
                Outcome::Accepted(param) => {
                    accepted_faces += faces.len();
                    charts.push(Chart { faces, param });
                }
                Outcome::Split(a, b) => {
                    if depth + 1 > MAX_SPLIT_ROUNDS {
                        return Err(AtlasError::UnsolvableParameterization {
                            faces: faces.len(),
                            attempts: depth,
                        });
                    }
                    next.push((a, depth + 1));
                    next.push((b, depth + 1));
                }
                Outcome::Failed => {
                    return Err(AtlasError::UnsolvableParameterization {
                        faces: faces.len(),
                        attempts: depth,
                    });
                }
            }
        }

        round += 1;
        debug!(
            "partition round {}: {} charts accepted, {} pending",
            round,
            charts.len(),
            next.len()
        );
        tracker.update_stage(0.05, 0.7, accepted_faces, num_faces)?;
        pending = next;
    }

    let mut charts = merge_charts(ctx, charts, settings, tracker)?;
    charts.sort_by_key(|c| c.faces[0]);
    Ok(charts)
}

fn evaluate(ctx: &MeshContext, faces: &[u32], settings: &PartitionSettings, probe: &CancelProbe) -> Result<Outcome> {
    probe.check()?;
    match parameterize_chart(ctx, faces) {
        Ok(param) if settings.criteria.accepts(&param) => Ok(Outcome::Accepted(param)),
        _ if faces.len() < 2 => Ok(Outcome::Failed),
        _ => {
            let (a, b) = split_chart(ctx, faces, settings.mode);
            Ok(Outcome::Split(a, b))
        }
    }
}

/// Connected components of the face adjacency graph, in face order.
pub(crate) fn connected_components(ctx: &MeshContext) -> Vec<Vec<u32>> {
    let n = ctx.num_faces();
    let mut seen = vec![false; n];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in 0..n {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        stack.push(start as u32);
        let mut component = Vec::new();
        while let Some(f) = stack.pop() {
            component.push(f);
            for e in 0..3 {
                if let Some(g) = ctx.neighbor(f, e) {
                    if !seen[g as usize] {
                        seen[g as usize] = true;
                        stack.push(g);
                    }
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

/// Crease factor of the dual edge between two faces.
#[inline]
fn crease(n0: &Vector3<f64>, n1: &Vector3<f64>) -> f64 {
    (1.0 - n0.dot(n1)).clamp(0.0, 2.0)
}

fn midpoint(a: Point3<f64>, b: Point3<f64>) -> Point3<f64> {
    Point3::from((a.coords + b.coords) * 0.5)
}

/// Dual graph over a chart's faces (node `i` is `faces[i]`).
fn chart_dual_graph(ctx: &MeshContext, faces: &[u32], mode: GeodesicMode) -> DualGraph {
    let mut edges = Vec::with_capacity(faces.len() * 3 / 2);
    for (i, &f) in faces.iter().enumerate() {
        for e in 0..3 {
            let Some(g) = ctx.neighbor(f, e) else {
                continue;
            };
            let Ok(j) = faces.binary_search(&g) else {
                continue;
            };
            if i == j {
                continue;
            }
            let (p0, p1) = ctx.edge_points(f, e);
            let length = mode.dual_length(
                &ctx.centroids[f as usize],
                &ctx.centroids[g as usize],
                &midpoint(p0, p1),
            );
            let weight = length * (1.0 + CREASE_PENALTY * crease(&ctx.normals[f as usize], &ctx.normals[g as usize]));
            let (a, b) = if i < j { (i, j) } else { (j, i) };
            edges.push((a as u32, b as u32, weight));
        }
    }
    edges.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
    edges.dedup_by(|x, y| x.0 == y.0 && x.1 == y.1);
    DualGraph::from_edges(faces.len(), &edges)
}

/// Split a chart of at least two faces into two non-empty, sorted halves.
///
/// A disconnected chart is split into its first component and the rest.
/// Otherwise two mutually distant seed faces grow regions by multi-source
/// Dijkstra over the crease-weighted dual graph.
pub(crate) fn split_chart(ctx: &MeshContext, faces: &[u32], mode: GeodesicMode) -> (Vec<u32>, Vec<u32>) {
    let n = faces.len();
    let graph = chart_dual_graph(ctx, faces, mode);

    let from_first = dijkstra(&graph, 0);
    let halves = if from_first.reachable_count() < n {
        split_by(faces, |i| from_first.distance(i).is_finite())
    } else {
        let a = from_first.farthest_node().map_or(0, |(i, _)| i);
        let mut b = dijkstra(&graph, a).farthest_node().map_or(a, |(i, _)| i);
        if b == a {
            b = (a + 1) % n;
        }

        let mut seeds = [a, b];
        let mut regions = dijkstra_multiple(&graph, &seeds);
        if mode == GeodesicMode::Quality {
            for _ in 0..LLOYD_ITERATIONS {
                let relaxed = relax_seeds(ctx, faces, &regions, seeds);
                if relaxed == seeds || relaxed[0] == relaxed[1] {
                    break;
                }
                seeds = relaxed;
                regions = dijkstra_multiple(&graph, &seeds);
            }
        }
        split_by(faces, |i| regions.label(i) == Some(0))
    };

    if halves.0.is_empty() || halves.1.is_empty() {
        let mid = n / 2;
        return (faces[..mid].to_vec(), faces[mid..].to_vec());
    }
    halves
}

fn split_by(faces: &[u32], left: impl Fn(usize) -> bool) -> (Vec<u32>, Vec<u32>) {
    let mut a = Vec::new();
    let mut b = Vec::new();
    for (i, &f) in faces.iter().enumerate() {
        if left(i) {
            a.push(f);
        } else {
            b.push(f);
        }
    }
    (a, b)
}

/// Move each seed to the face of its region nearest the region's
/// area-weighted centroid.
fn relax_seeds(
    ctx: &MeshContext,
    faces: &[u32],
    regions: &GeodesicResult,
    seeds: [usize; 2],
) -> [usize; 2] {
    let mut sums = [Vector3::<f64>::zeros(); 2];
    let mut weights = [0.0f64; 2];
    for (i, &f) in faces.iter().enumerate() {
        if let Some(l) = regions.label(i) {
            let a = ctx.areas[f as usize].max(1e-300);
            sums[l] += ctx.centroids[f as usize].coords * a;
            weights[l] += a;
        }
    }

    let mut relaxed = seeds;
    for l in 0..2 {
        if weights[l] <= 0.0 {
            continue;
        }
        let target = sums[l] / weights[l];
        let mut best = f64::INFINITY;
        for (i, &f) in faces.iter().enumerate() {
            if regions.label(i) != Some(l) {
                continue;
            }
            let d = (ctx.centroids[f as usize].coords - target).norm_squared();
            if d < best {
                best = d;
                relaxed[l] = i;
            }
        }
    }
    relaxed
}

/// Adjacent chart pairs with the length-weighted mean crease of their shared
/// boundary, smoothest first.
fn adjacent_pairs(ctx: &MeshContext, owner: &[u32]) -> Vec<((usize, usize), f64)> {
    let mut shared: HashMap<(usize, usize), (f64, f64)> = HashMap::new();
    for f in 0..ctx.num_faces() as u32 {
        for e in 0..3 {
            let Some(g) = ctx.neighbor(f, e) else {
                continue;
            };
            let (a, b) = (owner[f as usize] as usize, owner[g as usize] as usize);
            if a == b {
                continue;
            }
            let (p0, p1) = ctx.edge_points(f, e);
            let length = (p1 - p0).norm().max(1e-300);
            let key = if a < b { (a, b) } else { (b, a) };
            let entry = shared.entry(key).or_insert((0.0, 0.0));
            entry.0 += length;
            entry.1 += length * crease(&ctx.normals[f as usize], &ctx.normals[g as usize]);
        }
    }

    let mut pairs: Vec<((usize, usize), f64)> = shared
        .into_iter()
        .map(|(key, (length, creased))| (key, creased / length))
        .collect();
    pairs.sort_by(|x, y| x.1.total_cmp(&y.1).then(x.0.cmp(&y.0)));
    pairs
}

/// Identity of a merge candidate; versions change whenever a chart grows.
type PairKey = (usize, u32, usize, u32);

type Evaluated = (Vec<u32>, std::result::Result<ChartParam, Defect>);

fn merged_faces(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut faces = Vec::with_capacity(a.len() + b.len());
    faces.extend_from_slice(a);
    faces.extend_from_slice(b);
    faces.sort_unstable();
    faces
}

/// Flatten the union of each pair of live charts. Pairs naming a dissolved
/// slot are dropped.
fn evaluate_pairs(
    ctx: &MeshContext,
    slots: &[Option<Chart>],
    pairs: &[(usize, usize)],
    parallel: bool,
    probe: &CancelProbe,
) -> Result<Vec<((usize, usize), Evaluated)>> {
    let jobs: Vec<((usize, usize), &[u32], &[u32])> = pairs
        .iter()
        .filter_map(|&(i, j)| match (&slots[i], &slots[j]) {
            (Some(a), Some(b)) => Some(((i, j), a.faces.as_slice(), b.faces.as_slice())),
            _ => None,
        })
        .collect();
    let run = |&(pair, a, b): &((usize, usize), &[u32], &[u32])| -> Result<((usize, usize), Evaluated)> {
        probe.check()?;
        let faces = merged_faces(a, b);
        let param = parameterize_chart(ctx, &faces);
        Ok((pair, (faces, param)))
    };
    if parallel {
        jobs.par_iter().map(run).collect()
    } else {
        jobs.iter().map(run).collect()
    }
}

/// Replace chart `i` by `merged`, dissolving chart `j` into it.
fn absorb(slots: &mut [Option<Chart>], owner: &mut [u32], versions: &mut [u32], i: usize, j: usize, merged: Chart) {
    if let Some(old) = slots[j].take() {
        for f in old.faces {
            owner[f as usize] = i as u32;
        }
    }
    slots[i] = Some(merged);
    versions[i] += 1;
    versions[j] += 1;
}

/// Merge adjacent charts: first every merge that keeps the chart acceptable,
/// then, if a chart budget is set, forced merges by lowest merged stretch.
fn merge_charts(
    ctx: &MeshContext,
    charts: Vec<Chart>,
    settings: &PartitionSettings,
    tracker: &mut ProgressTracker<'_>,
) -> Result<Vec<Chart>> {
    let initial = charts.len();
    let mut owner = vec![0u32; ctx.num_faces()];
    for (id, chart) in charts.iter().enumerate() {
        for &f in &chart.faces {
            owner[f as usize] = id as u32;
        }
    }
    let mut slots: Vec<Option<Chart>> = charts.into_iter().map(Some).collect();
    let mut versions = vec![0u32; slots.len()];
    let mut alive = initial;

    // Merges that keep every criterion.
    let mut rejected: HashSet<PairKey> = HashSet::new();
    loop {
        let candidates: Vec<(usize, usize)> = adjacent_pairs(ctx, &owner)
            .into_iter()
            .map(|(key, _)| key)
            .filter(|&(i, j)| !rejected.contains(&(i, versions[i], j, versions[j])))
            .collect();
        if candidates.is_empty() {
            break;
        }

        let evaluated = evaluate_pairs(ctx, &slots, &candidates, settings.parallel, &tracker.probe())?;
        let mut touched = vec![false; slots.len()];
        let mut changed = false;
        for ((i, j), (faces, outcome)) in evaluated {
            if touched[i] || touched[j] {
                continue;
            }
            match outcome {
                Ok(param) if settings.criteria.accepts(&param) => {
                    absorb(&mut slots, &mut owner, &mut versions, i, j, Chart { faces, param });
                    touched[i] = true;
                    touched[j] = true;
                    alive -= 1;
                    changed = true;
                }
                _ => {
                    rejected.insert((i, versions[i], j, versions[j]));
                }
            }
        }
        tracker.update_stage(0.7, 0.8, initial - alive, initial.max(1))?;
        if !changed {
            break;
        }
    }
    debug!("merge: {} charts after optimizing merges", alive);

    // Forced merges down to the chart budget.
    let mut cache: HashMap<PairKey, Evaluated> = HashMap::new();
    while settings.max_chart_count > 0 && alive > settings.max_chart_count {
        let pairs: Vec<(usize, usize)> = adjacent_pairs(ctx, &owner).into_iter().map(|(key, _)| key).collect();
        cache.retain(|&(i, vi, j, vj), _| versions[i] == vi && versions[j] == vj);
        let missing: Vec<(usize, usize)> = pairs
            .iter()
            .copied()
            .filter(|&(i, j)| !cache.contains_key(&(i, versions[i], j, versions[j])))
            .collect();
        let evaluated = evaluate_pairs(ctx, &slots, &missing, settings.parallel, &tracker.probe())?;
        for ((i, j), result) in evaluated {
            cache.insert((i, versions[i], j, versions[j]), result);
        }

        let best = pairs
            .iter()
            .filter_map(|&(i, j)| {
                let key = (i, versions[i], j, versions[j]);
                match cache.get(&key) {
                    Some((_, Ok(param))) if !settings.limit_merge_stretch || settings.criteria.accepts(param) => {
                        Some((param.stretch(), key))
                    }
                    _ => None,
                }
            })
            .min_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

        let Some((stretch, key)) = best else {
            warn!(
                "could not reduce to {} charts; keeping {}",
                settings.max_chart_count, alive
            );
            break;
        };
        let Some((faces, Ok(param))) = cache.remove(&key) else {
            break;
        };
        debug!("forced merge of charts {} and {} (stretch {:.4})", key.0, key.2, stretch);
        absorb(&mut slots, &mut owner, &mut versions, key.0, key.2, Chart { faces, param });
        alive -= 1;
        tracker.update_stage(0.7, 0.8, initial - alive, initial.max(1))?;
    }

    debug!("merge: {} -> {} charts", initial, alive);
    Ok(slots.into_iter().flatten().collect())
}

//! Seam duplication and vertex remapping.
//!
//! A vertex on a chart boundary appears once per chart that contains it, so
//! the output has one vertex per (chart, chart-local vertex, original vertex).

use std::collections::HashMap;

use nalgebra::{Point2, Point3};

use super::pack::Placement;
use super::partition::Chart;
use super::{AtlasResult, AtlasVertex};
use crate::error::{AtlasError, Result};

/// Output vertex layout shared by every packing of one partition.
#[derive(Debug, Clone, Default)]
pub(crate) struct RemapTable {
    /// Output index buffer, in input face order.
    pub indices: Vec<u32>,
    /// Original vertex of each output vertex.
    pub vertex_remap: Vec<u32>,
    /// Chart and chart-local vertex of each output vertex.
    pub sources: Vec<(u32, u32)>,
    /// Chart of each face.
    pub face_partitioning: Vec<u32>,
}

/// Assign output vertices in order of first use by the input faces.
pub(crate) fn build_remap(faces: &[[u32; 3]], charts: &[Chart]) -> RemapTable {
    let mut slot = vec![(0u32, 0u32); faces.len()];
    for (id, chart) in charts.iter().enumerate() {
        for (local, &f) in chart.faces.iter().enumerate() {
            slot[f as usize] = (id as u32, local as u32);
        }
    }

    let mut table = RemapTable {
        indices: Vec::with_capacity(faces.len() * 3),
        face_partitioning: Vec::with_capacity(faces.len()),
        ..Default::default()
    };
    let mut output: HashMap<(u32, u32, u32), u32> = HashMap::new();
    for (f, face) in faces.iter().enumerate() {
        let (chart, local_face) = slot[f];
        let corners = charts[chart as usize].param.topology.faces[local_face as usize];
        table.face_partitioning.push(chart);
        for c in 0..3 {
            let key = (chart, corners[c] as u32, face[c]);
            let index = *output.entry(key).or_insert_with(|| {
                table.vertex_remap.push(face[c]);
                table.sources.push((chart, corners[c] as u32));
                (table.vertex_remap.len() - 1) as u32
            });
            table.indices.push(index);
        }
    }
    table
}

/// Output vertices for a packing: original positions, UVs normalized to the
/// texture.
pub(crate) fn assemble_vertices(
    positions: &[Point3<f32>],
    charts: &[Chart],
    table: &RemapTable,
    placements: &[Placement],
    width: u32,
    height: u32,
) -> Vec<AtlasVertex> {
    let (w, h) = (width as f64, height as f64);
    table
        .vertex_remap
        .iter()
        .zip(&table.sources)
        .map(|(&original, &(chart, local))| {
            let uv = charts[chart as usize].param.uv.get(local as usize);
            let texel = placements[chart as usize].to_texels(uv);
            AtlasVertex {
                position: positions[original as usize],
                uv: Point2::new((texel.x / w) as f32, (texel.y / h) as f32),
            }
        })
        .collect()
}

impl AtlasResult {
    /// Expand a per-vertex attribute of the input mesh to the output vertices.
    ///
    /// `attribute` must have one entry per input vertex, i.e. more entries
    /// than the largest value in `vertex_remap`.
    ///
    /// # Example
    ///
    /// ```
    /// use isochart::prelude::*;
    /// use isochart::mesh::shapes;
    ///
    /// let cube = shapes::cube();
    /// let adjacency = build_adjacency(&cube.mesh(), 0.0).unwrap().adjacency;
    /// let atlas = build_atlas(&cube.mesh(), &adjacency, &AtlasOptions::default()).unwrap();
    ///
    /// let normals = compute_normals(&cube.mesh(), NormalFlags::DEFAULT).unwrap();
    /// let remapped = atlas.remap_vertex_attribute(&normals).unwrap();
    /// assert_eq!(remapped.len(), atlas.vertices.len());
    /// ```
    pub fn remap_vertex_attribute<T: Clone>(&self, attribute: &[T]) -> Result<Vec<T>> {
        self.vertex_remap
            .iter()
            .map(|&v| {
                attribute.get(v as usize).cloned().ok_or_else(|| {
                    AtlasError::invalid_input(format!(
                        "attribute has {} entries but output vertex maps to {}",
                        attribute.len(),
                        v
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::adjacency::build_adjacency;
    use crate::algo::atlas::chart::{parameterize_chart, MeshContext};
    use crate::mesh::shapes;

    fn charts_of(ctx: &MeshContext, groups: &[&[u32]]) -> Vec<Chart> {
        groups
            .iter()
            .map(|faces| Chart {
                faces: faces.to_vec(),
                param: parameterize_chart(ctx, faces).unwrap(),
            })
            .collect()
    }

    #[test]
    fn test_seam_vertices_are_duplicated() {
        let grid = shapes::grid(2, 1, 2.0, 1.0);
        let adjacency = build_adjacency(&grid.mesh(), 0.0).unwrap().adjacency;
        let ctx = MeshContext::new(&grid.mesh(), &adjacency);

        // Left and right cell as separate charts: the middle column is shared.
        let charts = charts_of(&ctx, &[&[0, 1], &[2, 3]]);
        let table = build_remap(&ctx.faces, &charts);

        assert_eq!(table.face_partitioning, vec![0, 0, 1, 1]);
        assert_eq!(table.vertex_remap.len(), 8);
        assert_eq!(table.indices.len(), 12);
        let mut originals = table.vertex_remap.clone();
        originals.sort_unstable();
        originals.dedup();
        assert_eq!(originals.len(), 6);
        for (k, &out) in table.indices.iter().enumerate() {
            assert_eq!(table.vertex_remap[out as usize], ctx.faces[k / 3][k % 3]);
        }
    }

    #[test]
    fn test_single_chart_keeps_vertex_count() {
        let grid = shapes::grid(3, 3, 1.0, 1.0);
        let adjacency = build_adjacency(&grid.mesh(), 0.0).unwrap().adjacency;
        let ctx = MeshContext::new(&grid.mesh(), &adjacency);
        let all: Vec<u32> = (0..ctx.num_faces() as u32).collect();
        let charts = charts_of(&ctx, &[&all]);
        let table = build_remap(&ctx.faces, &charts);
        assert_eq!(table.vertex_remap.len(), 16);
        assert!(table.sources.iter().all(|&(chart, _)| chart == 0));
    }

    #[test]
    fn test_remap_attribute_bounds() {
        let result = AtlasResult {
            vertex_remap: vec![0, 2, 2],
            ..Default::default()
        };
        assert_eq!(result.remap_vertex_attribute(&['a', 'b', 'c']).unwrap(), vec!['a', 'c', 'c']);
        assert!(result.remap_vertex_attribute(&['a']).is_err());
    }
}

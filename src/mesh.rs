//! Terraced terrain mesh built from the aggregation grid.
//!
//! Every cell becomes a flat quad at its own height; neighbouring cells at
//! different heights are joined by vertical step walls, so rows of unrelated
//! genres never blend into each other. The mesh is plain data: positions,
//! normals and colors in a `Pod` vertex buffer plus `u32` triangle indices.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::Serialize;

use crate::aggregate::Aggregation;
use crate::config::{Rgb, TerrainConfig};
use crate::encoding::{CellEncoder, HeightScale, VisualEncoding};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable, Serialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }
}

/// Axis-aligned bounding box for a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        if vertices.is_empty() {
            return Self::default();
        }

        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for v in vertices {
            let p = Vec3::from_array(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        Self {
            min: min.to_array(),
            max: max.to_array(),
        }
    }

    pub fn center(&self) -> [f32; 3] {
        ((Vec3::from_array(self.min) + Vec3::from_array(self.max)) / 2.0).to_array()
    }

    pub fn size(&self) -> [f32; 3] {
        (Vec3::from_array(self.max) - Vec3::from_array(self.min)).to_array()
    }
}

/// Grid (row, col) to world XZ mapping over a centered footprint.
///
/// Columns run along X (time), rows along Z (genre). The center of cell
/// (0, 0) sits at `(-width/2, -depth/2)` and the last cell's center at
/// `(width/2, depth/2)`. A lone row or column is centered on its axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AxisMapping {
    pub width: f32,
    pub depth: f32,
    pub rows: usize,
    pub cols: usize,
}

impl AxisMapping {
    pub fn new(width: f32, depth: f32, rows: usize, cols: usize) -> Self {
        Self {
            width,
            depth,
            rows,
            cols,
        }
    }

    pub fn x(&self, col: usize) -> f32 {
        axis_center(self.width, self.cols, col)
    }

    pub fn z(&self, row: usize) -> f32 {
        axis_center(self.depth, self.rows, row)
    }

    /// X extent of a column's patch.
    pub fn x_span(&self, col: usize) -> (f32, f32) {
        axis_span(self.width, self.cols, col)
    }

    /// Z extent of a row's patch.
    pub fn z_span(&self, row: usize) -> (f32, f32) {
        axis_span(self.depth, self.rows, row)
    }

    pub fn world_position(&self, row: usize, col: usize, height: f32) -> Vec3 {
        Vec3::new(self.x(col), height, self.z(row))
    }
}

fn axis_center(extent: f32, count: usize, index: usize) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    let half = extent / 2.0;
    -half + extent * index as f32 / (count - 1) as f32
}

fn axis_span(extent: f32, count: usize, index: usize) -> (f32, f32) {
    let half = extent / 2.0;
    if count <= 1 {
        return (-half, half);
    }
    let step = extent / (count - 1) as f32;
    let center = axis_center(extent, count, index);
    (
        (center - step / 2.0).max(-half),
        (center + step / 2.0).min(half),
    )
}

/// Built terrain surface plus the per-cell heights it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct TerrainMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounds: BoundingBox,
    pub axes: AxisMapping,
    pub scale: HeightScale,
    /// Row-major cell heights, exactly as written into the vertices.
    heights: Vec<f32>,
}

impl TerrainMesh {
    pub fn build(aggregation: &Aggregation, config: &TerrainConfig) -> Self {
        let grid = &aggregation.grid;
        let (rows, cols) = (grid.rows(), grid.cols());
        let encoder = CellEncoder::new(grid, config);
        let axes = AxisMapping::new(config.footprint_width, config.footprint_depth, rows, cols);

        let encodings: Vec<VisualEncoding> = grid
            .iter()
            .map(|(row, _, cell)| {
                let genre = aggregation.genres.genre_at(row).unwrap_or_default();
                encoder.encode(genre, cell.sum)
            })
            .collect();

        let mut builder = QuadBuilder::default();
        for row in 0..rows {
            for col in 0..cols {
                let here = encodings[row * cols + col];
                let (x0, x1) = axes.x_span(col);
                let (z0, z1) = axes.z_span(row);
                let h = here.height;

                builder.push_quad(
                    [
                        Vec3::new(x0, h, z0),
                        Vec3::new(x0, h, z1),
                        Vec3::new(x1, h, z1),
                        Vec3::new(x1, h, z0),
                    ],
                    Vec3::Y,
                    here.tint,
                );

                // Step wall toward the next column.
                if col + 1 < cols {
                    let there = encodings[row * cols + col + 1];
                    if let Some((lo, hi, tint, facing)) = step(here, there, Vec3::X) {
                        builder.push_quad(
                            [
                                Vec3::new(x1, lo, z0),
                                Vec3::new(x1, lo, z1),
                                Vec3::new(x1, hi, z1),
                                Vec3::new(x1, hi, z0),
                            ],
                            facing,
                            tint,
                        );
                    }
                }

                // Step wall toward the next row.
                if row + 1 < rows {
                    let there = encodings[(row + 1) * cols + col];
                    if let Some((lo, hi, tint, facing)) = step(here, there, Vec3::Z) {
                        builder.push_quad(
                            [
                                Vec3::new(x0, lo, z1),
                                Vec3::new(x1, lo, z1),
                                Vec3::new(x1, hi, z1),
                                Vec3::new(x0, hi, z1),
                            ],
                            facing,
                            tint,
                        );
                    }
                }
            }
        }

        let QuadBuilder { vertices, indices } = builder;
        let bounds = BoundingBox::from_vertices(&vertices);
        log::debug!(
            "Built terrain mesh: {} vertices, {} triangles",
            vertices.len(),
            indices.len() / 3
        );

        Self {
            vertices,
            indices,
            bounds,
            axes,
            scale: *encoder.scale(),
            heights: encodings.iter().map(|e| e.height).collect(),
        }
    }

    /// Height of a cell's top face.
    pub fn height_at(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.axes.rows && col < self.axes.cols {
            self.heights.get(row * self.axes.cols + col).copied()
        } else {
            None
        }
    }

    /// Center of a cell's top face in world space.
    pub fn top_center(&self, row: usize, col: usize) -> Option<Vec3> {
        self.height_at(row, col)
            .map(|h| self.axes.world_position(row, col, h))
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw vertex buffer bytes, ready for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Flat `[r, g, b, r, g, b, ...]` per-vertex color buffer.
    pub fn color_buffer(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.color).collect()
    }

    /// Flat `[x, y, z, ...]` per-vertex position buffer.
    pub fn position_buffer(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.position).collect()
    }
}

/// Wall between two neighbouring cells along `axis`, if their heights differ.
///
/// Returns `(low, high, tint of the taller cell, outward normal)`.
fn step(
    here: VisualEncoding,
    there: VisualEncoding,
    axis: Vec3,
) -> Option<(f32, f32, Rgb, Vec3)> {
    if here.height == there.height {
        return None;
    }
    if here.height > there.height {
        Some((there.height, here.height, here.tint, axis))
    } else {
        Some((here.height, there.height, there.tint, -axis))
    }
}

#[derive(Default)]
struct QuadBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl QuadBuilder {
    /// Append a planar quad, winding it so its face normal points along `normal`.
    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3, color: Rgb) {
        let face = (corners[1] - corners[0]).cross(corners[2] - corners[0]);
        let corners = if face.dot(normal) < 0.0 {
            [corners[0], corners[3], corners[2], corners[1]]
        } else {
            corners
        };

        let base = self.vertices.len() as u32;
        let n = normal.normalize_or_zero().to_array();
        for c in corners {
            self.vertices.push(Vertex::new(c.to_array(), n, color.0));
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::record::NormalizedRecord;

    fn rec(genre: &str, year: i32, rating: f64) -> NormalizedRecord {
        NormalizedRecord::new("film", 1_000_000.0, 100.0, rating, year, genre)
    }

    fn face_normal(mesh: &TerrainMesh, tri: usize) -> Vec3 {
        let p = |i: usize| Vec3::from_array(mesh.vertices[mesh.indices[tri * 3 + i] as usize].position);
        (p(1) - p(0)).cross(p(2) - p(0))
    }

    #[test]
    fn test_axis_mapping_corners() {
        let axes = AxisMapping::new(720.0, 420.0, 3, 5);
        assert_eq!(axes.x(0), -360.0);
        assert_eq!(axes.x(4), 360.0);
        assert_eq!(axes.z(0), -210.0);
        assert_eq!(axes.z(2), 210.0);
        assert_eq!(axes.x_span(0), (-360.0, -270.0));
        assert_eq!(axes.x_span(1), (-270.0, -90.0));
        assert_eq!(axes.x_span(4), (270.0, 360.0));
    }

    #[test]
    fn test_single_column_spans_footprint() {
        let axes = AxisMapping::new(720.0, 420.0, 1, 1);
        assert_eq!(axes.x(0), 0.0);
        assert_eq!(axes.x_span(0), (-360.0, 360.0));
        assert_eq!(axes.z_span(0), (-210.0, 210.0));
    }

    #[test]
    fn test_cells_are_flat_at_their_height() {
        let records = vec![rec("Action", 2000, 9.0), rec("Drama", 2007, 2.0)];
        let agg = aggregate(&records, 5).unwrap();
        let mesh = TerrainMesh::build(&agg, &TerrainConfig::default());

        // 2 rows x 2 cols, each top quad has 4 vertices at the cell height
        for row in 0..2 {
            for col in 0..2 {
                let h = mesh.height_at(row, col).unwrap();
                let (x0, x1) = mesh.axes.x_span(col);
                let (z0, z1) = mesh.axes.z_span(row);
                let corners = mesh
                    .vertices
                    .iter()
                    .filter(|v| v.normal == [0.0, 1.0, 0.0])
                    .filter(|v| {
                        let [x, _, z] = v.position;
                        (x == x0 || x == x1) && (z == z0 || z == z1)
                    })
                    .filter(|v| v.position[1] == h)
                    .count();
                assert!(corners >= 4, "cell ({}, {}) top is not flat", row, col);
            }
        }
        assert_eq!(mesh.height_at(2, 0), None);
    }

    #[test]
    fn test_heights_and_bounds() {
        let records = vec![rec("Action", 2000, 9.0), rec("Drama", 2007, 2.0)];
        let agg = aggregate(&records, 5).unwrap();
        let config = TerrainConfig::default();
        let mesh = TerrainMesh::build(&agg, &config);

        let tallest = mesh.height_at(0, 0).unwrap();
        assert_eq!(tallest, config.height_ceiling);
        assert_eq!(mesh.height_at(0, 1).unwrap(), config.height_floor);
        assert_eq!(mesh.bounds.min[0], -360.0);
        assert_eq!(mesh.bounds.max[2], 210.0);
        assert_eq!(mesh.bounds.max[1], config.height_ceiling);

        let top = mesh.top_center(0, 0).unwrap();
        assert_eq!(top, Vec3::new(-360.0, tallest, -210.0));
    }

    #[test]
    fn test_winding_matches_normals() {
        let records = vec![
            rec("Action", 2000, 9.0),
            rec("Action", 2012, 4.0),
            rec("Drama", 2007, 2.0),
        ];
        let agg = aggregate(&records, 5).unwrap();
        let mesh = TerrainMesh::build(&agg, &TerrainConfig::default());

        for tri in 0..mesh.triangle_count() {
            let n = Vec3::from_array(mesh.vertices[mesh.indices[tri * 3] as usize].normal);
            assert!(face_normal(&mesh, tri).dot(n) > 0.0, "triangle {} is flipped", tri);
        }
    }

    #[test]
    fn test_flat_grid_has_no_walls() {
        let records = vec![rec("Action", 2000, 5.0), rec("Action", 2006, 5.0)];
        let agg = aggregate(&records, 5).unwrap();
        let mesh = TerrainMesh::build(&agg, &TerrainConfig::default());
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.vertex_bytes().len(), 8 * std::mem::size_of::<Vertex>());
        assert_eq!(mesh.color_buffer().len(), 24);
        assert_eq!(mesh.position_buffer().len(), 24);
    }
}

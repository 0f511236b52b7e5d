//! Height and color encoding of cell sums.
//!
//! Heights come from a min-max normalization over the whole grid, eased with a
//! square root so sparse cells stay visibly above the floor. The color tint is
//! purely cosmetic: taller cells are lifted slightly toward white.

use serde::Serialize;

use crate::aggregate::Grid;
use crate::config::{Rgb, TerrainConfig};

/// Visual encoding of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VisualEncoding {
    pub height: f32,
    pub tint: Rgb,
}

/// Grid-wide scale mapping cell sums to heights.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HeightScale {
    pub min_sum: f64,
    pub max_sum: f64,
    pub floor: f32,
    pub ceiling: f32,
}

impl HeightScale {
    pub fn new(min_sum: f64, max_sum: f64, floor: f32, ceiling: f32) -> Self {
        Self {
            min_sum,
            max_sum,
            floor,
            ceiling,
        }
    }

    /// Scan `grid` once for its sum range (empty cells count as 0).
    pub fn from_grid(grid: &Grid, config: &TerrainConfig) -> Self {
        let (min_sum, max_sum) = grid.sum_range().unwrap_or((0.0, 0.0));
        Self::new(min_sum, max_sum, config.height_floor, config.height_ceiling)
    }

    /// Position of `sum` within the grid range, in `[0, 1]`.
    ///
    /// A grid where every cell has the same sum maps to the midpoint.
    pub fn normalize(&self, sum: f64) -> f64 {
        let range = self.max_sum - self.min_sum;
        if range == 0.0 {
            0.5
        } else {
            ((sum - self.min_sum) / range).clamp(0.0, 1.0)
        }
    }

    pub fn height(&self, sum: f64) -> f32 {
        let t = self.normalize(sum).sqrt() as f32;
        lerp(self.floor, self.ceiling, t)
    }

    /// Position of a height within the configured floor..ceiling range.
    pub fn height_fraction(&self, height: f32) -> f32 {
        let range = self.ceiling - self.floor;
        if range == 0.0 {
            0.5
        } else {
            ((height - self.floor) / range).clamp(0.0, 1.0)
        }
    }
}

/// Maps cells of one grid to heights and tinted genre colors.
#[derive(Clone, Copy, Debug)]
pub struct CellEncoder<'a> {
    scale: HeightScale,
    config: &'a TerrainConfig,
}

impl<'a> CellEncoder<'a> {
    pub fn new(grid: &Grid, config: &'a TerrainConfig) -> Self {
        Self {
            scale: HeightScale::from_grid(grid, config),
            config,
        }
    }

    pub fn scale(&self) -> &HeightScale {
        &self.scale
    }

    pub fn encode(&self, genre: &str, sum: f64) -> VisualEncoding {
        let height = self.scale.height(sum);
        VisualEncoding {
            height,
            tint: self.tint(genre, height),
        }
    }

    /// Genre base color blended toward white in proportion to `height`.
    pub fn tint(&self, genre: &str, height: f32) -> Rgb {
        let base = self.config.genre_color(genre);
        let t = self.scale.height_fraction(height);
        base.lerp(Rgb::WHITE, self.config.tint_strength * t)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

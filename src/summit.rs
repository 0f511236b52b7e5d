//! Summit selection and annotation.
//!
//! Summits are the highest-impact cells of the grid. Each one is turned into
//! an [`Annotation`]: a world position on top of the terrain plus the label
//! text a renderer needs to draw a flag. Drawing the flag is not done here.

use serde::Serialize;

use crate::aggregate::Aggregation;
use crate::mesh::TerrainMesh;
use crate::record::NormalizedRecord;

/// Label used for a summit cell that has no best record.
pub const PLACEHOLDER_LABEL: &str = "Peak";

/// A selected top cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summit {
    pub row: usize,
    pub col: usize,
    pub sum: f64,
    pub best: Option<NormalizedRecord>,
}

/// Everything the decoration layer needs to place one summit marker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Annotation {
    pub row: usize,
    pub col: usize,
    pub genre: String,
    pub time_bin: String,
    /// Top of the terrain at the cell center.
    pub position: [f32; 3],
    pub label: String,
    /// Rating / ROI / gross summary, empty when there is no best record.
    pub metadata: String,
    pub highlight: bool,
}

/// Top `peak_count` cells by sum, dropping empty ones.
///
/// The sort is stable over row-major order, so equal sums keep grid order.
pub fn select_summits(aggregation: &Aggregation, peak_count: usize) -> Vec<Summit> {
    let mut cells: Vec<Summit> = aggregation
        .grid
        .iter()
        .map(|(row, col, cell)| Summit {
            row,
            col,
            sum: cell.sum,
            best: cell.best.clone(),
        })
        .collect();

    cells.sort_by(|a, b| b.sum.partial_cmp(&a.sum).unwrap_or(std::cmp::Ordering::Equal));
    cells.truncate(peak_count);
    cells.retain(|s| s.sum > 0.0);
    cells
}

/// Build annotations for `summits`, reading heights from the built mesh.
pub fn annotate(
    summits: &[Summit],
    aggregation: &Aggregation,
    mesh: &TerrainMesh,
) -> Vec<Annotation> {
    summits
        .iter()
        .filter_map(|summit| {
            let position = mesh.top_center(summit.row, summit.col)?;
            let (label, metadata) = match &summit.best {
                Some(best) => (best.title.clone(), describe(best)),
                None => (PLACEHOLDER_LABEL.to_string(), String::new()),
            };
            Some(Annotation {
                row: summit.row,
                col: summit.col,
                genre: aggregation
                    .genres
                    .genre_at(summit.row)
                    .unwrap_or_default()
                    .to_string(),
                time_bin: aggregation.bins.label(summit.col),
                position: position.to_array(),
                label,
                metadata,
                highlight: true,
            })
        })
        .collect()
}

/// `IMDb 8.0 · ROI 160% · $1.00B`
pub fn describe(record: &NormalizedRecord) -> String {
    format!(
        "IMDb {:.1} · ROI {:.0}% · {}",
        record.rating,
        record.roi,
        format_usd(record.gross)
    )
}

/// Compact dollar amount: `$2.85B`, `$380.0M`, `$12,345`, or `-` for zero.
pub fn format_usd(value: f64) -> String {
    if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.1}M", value / 1e6)
    } else if value == 0.0 || !value.is_finite() {
        "-".to_string()
    } else {
        let rounded = value.round() as i64;
        let digits = rounded.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if rounded < 0 {
            format!("-${}", grouped)
        } else {
            format!("${}", grouped)
        }
    }
}

//! One-shot pipeline from raw records to everything a renderer needs.

use serde::Serialize;

use crate::aggregate::{aggregate, Aggregation, TimeBins};
use crate::config::{Rgb, TerrainConfig};
use crate::error::PipelineError;
use crate::mesh::TerrainMesh;
use crate::record::{normalize_records, NormalizedRecord, RawRecord};
use crate::summit::{annotate, select_summits, Annotation, Summit};

pub const SUMMIT_LEGEND_LABEL: &str = "Glowing summits (top peaks)";

/// Labels for the two ground axes, in grid order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AxisLabels {
    /// One per grid row.
    pub genres: Vec<String>,
    /// One per grid column, e.g. `2010–2014`.
    pub time_bins: Vec<String>,
    /// Bin boundaries, one more than the number of columns.
    pub boundaries: Vec<i64>,
}

impl AxisLabels {
    fn from_aggregation(aggregation: &Aggregation) -> Self {
        Self {
            genres: aggregation.genres.names().to_vec(),
            time_bins: aggregation.bins.labels(),
            boundaries: aggregation.bins.boundaries(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegendEntry {
    Summit { label: String },
    Genre { label: String, color: Rgb },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SceneStats {
    pub records_read: usize,
    pub records_used: usize,
    pub populated_cells: usize,
    pub total_impact: f64,
}

/// Result of one pipeline run. Immutable once built.
#[derive(Clone, Debug, Serialize)]
pub struct TerrainScene {
    pub mesh: TerrainMesh,
    pub axes: AxisLabels,
    pub bins: TimeBins,
    pub summits: Vec<Summit>,
    pub annotations: Vec<Annotation>,
    pub legend: Vec<LegendEntry>,
    pub stats: SceneStats,
}

impl TerrainScene {
    /// Normalize, aggregate, mesh and annotate `raw`.
    ///
    /// Fails with [`PipelineError::EmptyDataset`] when no record survives
    /// normalization; no geometry is built in that case.
    pub fn build(raw: &[RawRecord], config: &TerrainConfig) -> Result<Self, PipelineError> {
        let records = normalize_records(raw);
        if records.is_empty() {
            log::warn!("None of the {} input records are usable", raw.len());
            return Err(PipelineError::EmptyDataset { total: raw.len() });
        }
        Self::from_records(&records, raw.len(), config)
    }

    /// Run the pipeline on already-normalized records.
    ///
    /// Fails with [`PipelineError::TimeSpanTooLarge`] when the years span
    /// more columns than the grid allows.
    pub fn from_records(
        records: &[NormalizedRecord],
        records_read: usize,
        config: &TerrainConfig,
    ) -> Result<Self, PipelineError> {
        let aggregation = aggregate(records, config.bucket_years).map_err(|e| match e {
            PipelineError::EmptyDataset { .. } => PipelineError::EmptyDataset {
                total: records_read,
            },
            other => other,
        })?;

        let mesh = TerrainMesh::build(&aggregation, config);
        let summits = select_summits(&aggregation, config.peak_count);
        let annotations = annotate(&summits, &aggregation, &mesh);

        let stats = SceneStats {
            records_read,
            records_used: records.len(),
            populated_cells: aggregation.grid.populated_cells(),
            total_impact: aggregation.grid.total_sum(),
        };

        log::info!(
            "Terrain scene: {} genres x {} time bins, {} summits from {} records",
            aggregation.genres.len(),
            aggregation.bins.count,
            annotations.len(),
            records.len()
        );

        Ok(Self {
            axes: AxisLabels::from_aggregation(&aggregation),
            bins: aggregation.bins,
            legend: legend(config),
            mesh,
            summits,
            annotations,
            stats,
        })
    }
}

/// Summit marker entry followed by every configured genre color.
pub fn legend(config: &TerrainConfig) -> Vec<LegendEntry> {
    std::iter::once(LegendEntry::Summit {
        label: SUMMIT_LEGEND_LABEL.to_string(),
    })
    .chain(config.genre_colors.iter().map(|entry| LegendEntry::Genre {
        label: entry.genre.clone(),
        color: entry.color,
    }))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film(title: &str, rating: &str, year: &str, genre: &str) -> RawRecord {
        RawRecord::from_pairs([
            ("Title", title),
            ("Worldwide_Gross", "100000000"),
            ("Profit_Margin_Pct", "250"),
            ("IMDb_Rating", rating),
            ("Year", year),
            ("Main_Genre", genre),
        ])
    }

    #[test]
    fn test_all_invalid_is_empty_dataset() {
        let raw = vec![film("a", "0", "2000", "Drama"), film("b", "0", "2001", "Action")];
        let err = TerrainScene::build(&raw, &TerrainConfig::default()).unwrap_err();
        assert_eq!(err, PipelineError::EmptyDataset { total: 2 });

        let err = TerrainScene::build(&[], &TerrainConfig::default()).unwrap_err();
        assert_eq!(err, PipelineError::EmptyDataset { total: 0 });
    }

    #[test]
    fn test_scene_contents() {
        let raw = vec![
            film("a", "7.0", "2001", "Drama"),
            film("b", "8.0", "2013", "Action/Adventure"),
            film("c", "0", "2013", "Horror"),
        ];
        let scene = TerrainScene::build(&raw, &TerrainConfig::default()).unwrap();

        assert_eq!(scene.axes.genres, vec!["Action".to_string(), "Drama".to_string()]);
        assert_eq!(scene.axes.time_bins, vec!["2000–2004", "2005–2009", "2010–2014"]);
        assert_eq!(scene.axes.boundaries, vec![2000, 2005, 2010, 2015]);
        assert_eq!(scene.stats.records_read, 3);
        assert_eq!(scene.stats.records_used, 2);
        assert_eq!(scene.stats.populated_cells, 2);
        assert_eq!(scene.annotations.len(), 2);
        assert_eq!(scene.annotations[0].label, "b");
    }

    #[test]
    fn test_legend_starts_with_summit_marker() {
        let config = TerrainConfig::default();
        let entries = legend(&config);
        assert_eq!(entries.len(), config.genre_colors.len() + 1);
        assert!(matches!(entries[0], LegendEntry::Summit { .. }));
        assert!(matches!(&entries[1], LegendEntry::Genre { label, .. } if label == "Action"));
    }

    #[test]
    fn test_scene_serializes() {
        let raw = vec![film("a", "7.0", "2001", "Drama")];
        let scene = TerrainScene::build(&raw, &TerrainConfig::default()).unwrap();
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["axes"]["genres"][0], "Drama");
        assert_eq!(json["annotations"][0]["highlight"], true);
        assert_eq!(json["legend"][0]["kind"], "summit");
        assert_eq!(json["legend"][1]["color"], "#ff6b6b");
    }
}
